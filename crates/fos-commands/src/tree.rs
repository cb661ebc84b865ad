//! Element tree seam
//!
//! What the registry needs from the host: selector matching, the bubbling
//! path, and native listener installation on the attached root.

use fos_css::Selector;
use fos_dom::{Document, EventHandler, EventTarget, ListenerOptions, NodeId};

/// Native handler the registry installs on its root
pub type NativeListener = EventHandler;

/// A tree of addressable nodes the registry dispatches through
pub trait ElementTree {
    /// Check if `node` matches `selector`
    fn matches(&self, node: NodeId, selector: &Selector) -> bool;

    /// Whether selector-based registrations apply to `target` at all
    fn supports_selectors(&self, target: EventTarget) -> bool;

    /// Next step up the bubbling path. Nodes without a parent bubble to
    /// `Window`; `Window` is its own parent.
    fn parent_of(&self, target: EventTarget) -> EventTarget;

    /// Whether `target` is still alive
    fn contains(&self, target: EventTarget) -> bool;

    /// Install a capturing listener for `command_name` on `root`
    fn add_native_listener(&self, root: EventTarget, command_name: &str, listener: NativeListener);

    fn remove_native_listener(
        &self,
        root: EventTarget,
        command_name: &str,
        listener: &NativeListener,
    );
}

impl ElementTree for Document {
    fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        selector.matches(&self.tree(), node)
    }

    fn supports_selectors(&self, target: EventTarget) -> bool {
        match target {
            EventTarget::Node(node) => self.tree().element(node).is_some(),
            EventTarget::Window => false,
        }
    }

    fn parent_of(&self, target: EventTarget) -> EventTarget {
        match target {
            EventTarget::Node(node) => self
                .tree()
                .parent(node)
                .map_or(EventTarget::Window, EventTarget::Node),
            EventTarget::Window => EventTarget::Window,
        }
    }

    fn contains(&self, target: EventTarget) -> bool {
        match target {
            EventTarget::Node(node) => self.tree().contains(node),
            EventTarget::Window => true,
        }
    }

    fn add_native_listener(&self, root: EventTarget, command_name: &str, listener: NativeListener) {
        let options = ListenerOptions {
            capture: true,
            once: false,
        };
        self.add_event_listener(root, command_name, listener, options);
    }

    fn remove_native_listener(
        &self,
        root: EventTarget,
        command_name: &str,
        listener: &NativeListener,
    ) {
        self.remove_event_listener(root, command_name, listener, true);
    }
}
