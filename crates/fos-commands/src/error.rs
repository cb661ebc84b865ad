//! Command registry errors

use fos_css::CssError;
use serde_json::Value;

/// Which listener shape check failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidListenerReason {
    #[error("Cannot register a command with a null listener.")]
    NullListener,
    #[error("Listener must be a callback function or an object with a didDispatch method.")]
    MissingDidDispatch,
}

/// Registration-time failures. Nothing is registered when `add` fails.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    InvalidListener(#[from] InvalidListenerReason),
    #[error("'{selector}' is not a valid selector")]
    InvalidSelector {
        selector: String,
        #[source]
        source: CssError,
    },
}

/// A listener failed, either synchronously or through its pending
/// completion. Surfaces as the error of the dispatch future.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ListenerError {
    pub message: String,
    /// Value the listener rejected with, if any
    pub payload: Option<Value>,
}

impl ListenerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            payload: None,
        }
    }

    /// Reject with an arbitrary value
    pub fn with_payload(payload: Value) -> Self {
        let message = match &payload {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Self {
            message,
            payload: Some(payload),
        }
    }
}

impl From<&str> for ListenerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for ListenerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_invalid_listener_messages() {
        let null = CommandError::from(InvalidListenerReason::NullListener);
        assert_eq!(null.to_string(), "Cannot register a command with a null listener.");

        let shape = CommandError::from(InvalidListenerReason::MissingDidDispatch);
        assert!(shape.to_string().contains("didDispatch"));
    }

    #[test]
    fn test_invalid_selector_names_selector() {
        let source = fos_css::validate_selector("<>").unwrap_err();
        let err = CommandError::InvalidSelector {
            selector: "<>".to_string(),
            source,
        };
        assert_eq!(err.to_string(), "'<>' is not a valid selector");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_listener_error_payload() {
        let err = ListenerError::with_payload(json!("bogus"));
        assert_eq!(err.message, "bogus");
        assert_eq!(err.payload, Some(json!("bogus")));

        let err = ListenerError::with_payload(json!({"code": 3}));
        assert_eq!(err.to_string(), r#"{"code":3}"#);
    }
}
