//! Permission configuration for tool execution.
//!
//! [`PermissionPolicy`] decides, per tool, whether calls run freely, need a
//! user confirmation first, or are not offered to the model at all.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Permission level for a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Allow,
    Ask,
    Deny,
}

/// `[permissions]` section of the config file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PermissionConfig {
    /// Per-tool permissions: tool_name -> Permission
    #[serde(default)]
    pub tools: HashMap<String, Permission>,
}

/// Resolves the effective permission of a tool.
pub struct PermissionPolicy {
    config: PermissionConfig,
}

impl PermissionPolicy {
    pub fn new(config: PermissionConfig) -> Self {
        Self { config }
    }

    /// Configured value first, then the built-in default for the tool.
    pub fn check(&self, tool_name: &str) -> Permission {
        self.config
            .tools
            .get(tool_name)
            .copied()
            .unwrap_or_else(|| Self::default_for(tool_name))
    }

    /// Read-only built-ins are allowed; everything else asks.
    fn default_for(tool_name: &str) -> Permission {
        match tool_name {
            crate::tools::read_file::NAME | crate::tools::list_files::NAME => Permission::Allow,
            _ => Permission::Ask,
        }
    }
}

impl Default for PermissionPolicy {
    fn default() -> Self {
        Self::new(PermissionConfig::default())
    }
}
