//! Command Events
//!
//! The synthetic event listeners receive. It pins `target` to where the
//! dispatch started, reports the bubbling phase, tracks the node currently
//! being visited, and forwards cancellation calls to the original event.

use fos_dom::{Event, EventPhase, EventTarget};
use serde_json::{Map, Value};

/// Names the synthetic event defines itself; original extras with these
/// keys are not copied
const DEFINED_PROPERTIES: &[&str] = &[
    "type",
    "detail",
    "target",
    "currentTarget",
    "eventPhase",
    "bubbles",
    "cancelable",
    "defaultPrevented",
    "preventDefault",
    "stopPropagation",
    "stopImmediatePropagation",
    "abortKeyBinding",
];

/// Synthetic command event wrapping an original `Event`
pub struct CommandEvent<'a> {
    original: &'a mut Event,
    command_name: String,
    detail: Option<Value>,
    target: EventTarget,
    current_target: EventTarget,
    extras: Map<String, Value>,
    propagation_stopped: bool,
    immediate_propagation_stopped: bool,
}

impl<'a> CommandEvent<'a> {
    pub(crate) fn wrap(original: &'a mut Event) -> Self {
        let extras = original
            .extras
            .iter()
            .filter(|(key, _)| !DEFINED_PROPERTIES.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            command_name: original.event_type.clone(),
            detail: original.detail.clone(),
            target: original.target,
            current_target: original.target,
            extras,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
            original,
        }
    }

    /// Command name (the event type)
    pub fn command_name(&self) -> &str {
        &self.command_name
    }

    pub fn detail(&self) -> Option<&Value> {
        self.detail.as_ref()
    }

    /// Where the dispatch started
    pub fn target(&self) -> EventTarget {
        self.target
    }

    /// The node whose listeners are currently running
    pub fn current_target(&self) -> EventTarget {
        self.current_target
    }

    pub(crate) fn set_current_target(&mut self, target: EventTarget) {
        self.current_target = target;
    }

    /// Always `Bubbling`, however the original event was delivered
    pub fn event_phase(&self) -> EventPhase {
        EventPhase::Bubbling
    }

    pub fn bubbles(&self) -> bool {
        true
    }

    /// Ad hoc property copied from the original event
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extras.get(key)
    }

    pub fn extras(&self) -> &Map<String, Value> {
        &self.extras
    }

    pub fn prevent_default(&mut self) {
        self.original.prevent_default();
    }

    pub fn is_default_prevented(&self) -> bool {
        self.original.is_default_prevented()
    }

    /// Finish the current node, then stop bubbling
    pub fn stop_propagation(&mut self) {
        self.original.stop_propagation();
        self.propagation_stopped = true;
    }

    /// Skip the remaining listeners on this node and stop bubbling
    pub fn stop_immediate_propagation(&mut self) {
        self.original.stop_immediate_propagation();
        self.propagation_stopped = true;
        self.immediate_propagation_stopped = true;
    }

    /// Let the key binding resolver fall through to the next binding.
    /// No-op when the command did not come from a key binding.
    pub fn abort_key_binding(&mut self) {
        self.original.abort_key_binding();
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub fn is_immediate_propagation_stopped(&self) -> bool {
        self.immediate_propagation_stopped
    }
}

impl std::fmt::Debug for CommandEvent<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandEvent")
            .field("command_name", &self.command_name)
            .field("target", &self.target)
            .field("current_target", &self.current_target)
            .field("propagation_stopped", &self.propagation_stopped)
            .finish()
    }
}
