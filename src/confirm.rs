//! Waiting for a correlated user decision without blocking the runtime.
//!
//! A [`PendingUserInput`] registers a listener on a [`ChatResponse`] that
//! forwards the first input whose `callback_id` matches into a oneshot
//! channel. The waiter is woken directly by `deliver_user_input`; there is no
//! polling. The listener is removed when the guard drops, whichever way the
//! wait ends.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::TurnError;
use crate::response::{ChatResponse, ListenerId};
use crate::stream::UserInput;

/// A registered, not yet resolved wait for one user decision.
pub struct PendingUserInput<'a> {
    response: &'a dyn ChatResponse,
    callback_id: String,
    listener: Option<ListenerId>,
    rx: oneshot::Receiver<Value>,
}

impl<'a> PendingUserInput<'a> {
    /// Registers the listener. Call this before emitting the prompt so a
    /// fast answer cannot slip past.
    pub fn register(response: &'a dyn ChatResponse, callback_id: impl Into<String>) -> Self {
        let callback_id = callback_id.into();
        let (tx, rx) = oneshot::channel();
        let slot = Mutex::new(Some(tx));
        let expected = callback_id.clone();

        let listener = response.add_user_input_listener(Arc::new(move |input: &UserInput| {
            if input.callback_id != expected {
                return;
            }
            let sender = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
            if let Some(sender) = sender {
                let _ = sender.send(input.data.clone());
            }
        }));

        Self {
            response,
            callback_id,
            listener: Some(listener),
            rx,
        }
    }

    pub fn callback_id(&self) -> &str {
        &self.callback_id
    }

    /// Suspends until the decision arrives, or until `timeout` elapses when
    /// one is given.
    pub async fn wait(mut self, timeout: Option<Duration>) -> Result<Value, TurnError> {
        let rx = &mut self.rx;
        let received = match timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(received) => received,
                Err(_) => {
                    return Err(TurnError::ConfirmationTimedOut {
                        callback_id: self.callback_id.clone(),
                        timeout: limit,
                    })
                }
            },
            None => rx.await,
        };
        self.deregister();
        received.map_err(|_| TurnError::ConfirmationAbandoned {
            callback_id: self.callback_id.clone(),
        })
    }

    fn deregister(&mut self) {
        if let Some(id) = self.listener.take() {
            self.response.remove_user_input_listener(id);
        }
    }
}

impl Drop for PendingUserInput<'_> {
    fn drop(&mut self) {
        self.deregister();
    }
}

/// Registers a listener for `callback_id` and waits for its decision.
///
/// Prefer [`PendingUserInput::register`] when a prompt still has to be
/// emitted after registration.
pub async fn wait_for_user_input(
    response: &dyn ChatResponse,
    callback_id: &str,
    timeout: Option<Duration>,
) -> Result<Value, TurnError> {
    PendingUserInput::register(response, callback_id)
        .wait(timeout)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::ChannelResponse;
    use serde_json::json;

    fn answer(callback_id: &str, confirmed: bool) -> UserInput {
        UserInput {
            callback_id: callback_id.into(),
            data: json!({ "confirmed": confirmed }),
        }
    }

    #[tokio::test]
    async fn test_resolves_on_matching_callback_only() {
        let (response, _rx) = ChannelResponse::channel();
        let pending = PendingUserInput::register(&response, "call_1");

        response.deliver_user_input(&answer("call_other", true));
        response.deliver_user_input(&answer("call_1", false));
        response.deliver_user_input(&answer("call_1", true));

        let value = pending.wait(None).await.unwrap();
        assert_eq!(value, json!({"confirmed": false}));
        assert!(response.listeners().is_empty());
        assert_eq!(response.listeners().deregistrations(), 1);
    }

    #[tokio::test]
    async fn test_wakes_on_delivery_from_another_task() {
        let response = Arc::new(ChannelResponse::channel().0);
        let delivering = Arc::clone(&response);

        let deliver = async move {
            tokio::task::yield_now().await;
            delivering.deliver_user_input(&answer("call_2", true));
        };
        let (value, ()) = tokio::join!(
            wait_for_user_input(response.as_ref(), "call_2", None),
            deliver
        );

        assert_eq!(value.unwrap(), json!({"confirmed": true}));
        assert_eq!(response.listeners().registrations(), 1);
        assert_eq!(response.listeners().deregistrations(), 1);
    }

    #[tokio::test]
    async fn test_timeout_deregisters_listener() {
        let (response, _rx) = ChannelResponse::channel();
        let result = wait_for_user_input(&response, "call_3", Some(Duration::from_millis(10))).await;

        assert!(matches!(
            result,
            Err(TurnError::ConfirmationTimedOut { ref callback_id, .. }) if callback_id == "call_3"
        ));
        assert!(response.listeners().is_empty());
    }

    #[test]
    fn test_dropping_unresolved_wait_deregisters() {
        let (response, _rx) = ChannelResponse::channel();
        {
            let pending = PendingUserInput::register(&response, "call_4");
            assert_eq!(pending.callback_id(), "call_4");
            assert_eq!(response.listeners().len(), 1);
        }
        assert!(response.listeners().is_empty());
        assert_eq!(response.listeners().deregistrations(), 1);
    }
}
