//! DOM Events
//!
//! Native events dispatched through a `Document`. Command events are plain
//! custom events whose type is the command name.

use serde_json::{Map, Value};

use crate::EventTarget;

/// Dispatch phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventPhase {
    /// Not being dispatched
    #[default]
    None,
    Capturing,
    AtTarget,
    Bubbling,
}

/// DOM event
#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: String,
    pub detail: Option<Value>,
    pub target: EventTarget,
    pub current_target: Option<EventTarget>,
    pub phase: EventPhase,
    pub bubbles: bool,
    pub cancelable: bool,
    /// Ad hoc properties attached by whoever created the event
    pub extras: Map<String, Value>,
    default_prevented: bool,
    propagation_stopped: bool,
    immediate_propagation_stopped: bool,
    /// `Some` only for events raised by a key binding
    key_binding_aborted: Option<bool>,
}

impl Event {
    /// Create a non-bubbling, non-cancelable event
    pub fn new(event_type: &str, target: EventTarget) -> Self {
        Self {
            event_type: event_type.to_string(),
            detail: None,
            target,
            current_target: None,
            phase: EventPhase::None,
            bubbles: false,
            cancelable: false,
            extras: Map::new(),
            default_prevented: false,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
            key_binding_aborted: None,
        }
    }

    /// Create a bubbling custom event carrying `detail`
    pub fn custom(event_type: &str, target: EventTarget, detail: Option<Value>) -> Self {
        Self {
            detail,
            bubbles: true,
            ..Self::new(event_type, target)
        }
    }

    /// Create the cancelable event a key binding raises for a command
    pub fn key_binding(event_type: &str, target: EventTarget) -> Self {
        Self {
            cancelable: true,
            key_binding_aborted: Some(false),
            ..Self::custom(event_type, target, None)
        }
    }

    /// Attach an ad hoc property
    pub fn with_extra(mut self, key: &str, value: Value) -> Self {
        self.extras.insert(key.to_string(), value);
        self
    }

    /// Prevent default action
    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    /// Stop propagation after the current target's listeners
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Stop propagation and skip remaining listeners on the current target
    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_propagation_stopped = true;
    }

    /// Ask the key binding resolver to try the next binding.
    ///
    /// Returns false if this event did not come from a key binding.
    pub fn abort_key_binding(&mut self) -> bool {
        match self.key_binding_aborted.as_mut() {
            Some(aborted) => {
                *aborted = true;
                true
            }
            None => false,
        }
    }

    /// Check if default was prevented
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub fn is_immediate_propagation_stopped(&self) -> bool {
        self.immediate_propagation_stopped
    }

    pub fn is_key_binding_aborted(&self) -> bool {
        self.key_binding_aborted.unwrap_or(false)
    }
}
