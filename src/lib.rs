//! parley: a tool-call orchestration engine for conversational AI agents.
//!
//! A chat turn asks a model for a completion, runs the tools it requests one
//! at a time (pausing for a user confirmation where a tool asks for one),
//! folds each result back into the conversation and streams output to a
//! [`response::ChatResponse`] as it goes. See [`orchestrator`] for the loop
//! itself and [`host`] for how participants and tools are wired together.

pub mod cli;
pub mod config;
pub mod confirm;
pub mod constants;
pub mod diff;
pub mod error;
pub mod host;
pub mod message;
pub mod model;
pub mod orchestrator;
pub mod output;
pub mod participant;
pub mod permissions;
pub mod response;
pub mod stream;
pub mod tools;
