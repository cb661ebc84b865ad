//! Document - High-level document API
//!
//! Owns the tree behind a `RefCell` and the native listener table, so
//! listeners can observe and mutate the document while an event is being
//! dispatched through it.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::Rc;

use crate::{DomResult, DomTree, Event, EventPhase, EventTarget, NodeId};

/// Native event listener
pub type EventHandler = Rc<dyn Fn(&mut Event)>;

/// Listener options
#[derive(Debug, Clone, Copy, Default)]
pub struct ListenerOptions {
    pub capture: bool,
    pub once: bool,
}

struct RegisteredHandler {
    handler: EventHandler,
    capture: bool,
    once: bool,
}

/// HTML Document
pub struct Document {
    tree: RefCell<DomTree>,
    /// Handlers by target and event type, in registration order
    handlers: RefCell<HashMap<(EventTarget, String), Vec<RegisteredHandler>>>,
    url: String,
    html_element: NodeId,
    body_element: NodeId,
}

impl Document {
    /// Create a document with `<html>`, `<head>` and `<body>`
    pub fn new(url: &str) -> Self {
        let mut tree = DomTree::new();

        let html = tree.create_element("html");
        let head = tree.create_element("head");
        let body = tree.create_element("body");

        let root = tree.root();
        // Fresh detached nodes always attach cleanly
        let _ = tree.append_child(root, html);
        let _ = tree.append_child(html, head);
        let _ = tree.append_child(html, body);

        Self {
            tree: RefCell::new(tree),
            handlers: RefCell::new(HashMap::new()),
            url: url.to_string(),
            html_element: html,
            body_element: body,
        }
    }

    /// Get document URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get `<html>` element
    pub fn document_element(&self) -> NodeId {
        self.html_element
    }

    /// Get `<body>` element
    pub fn body(&self) -> NodeId {
        self.body_element
    }

    /// Access the DOM tree
    pub fn tree(&self) -> Ref<'_, DomTree> {
        self.tree.borrow()
    }

    /// Access the DOM tree mutably
    pub fn tree_mut(&self) -> RefMut<'_, DomTree> {
        self.tree.borrow_mut()
    }

    /// Create a detached element with the given classes
    pub fn create_element(&self, tag_name: &str, classes: &[&str]) -> NodeId {
        let mut tree = self.tree.borrow_mut();
        let id = tree.create_element(tag_name);
        if let Some(elem) = tree.element_mut(id) {
            for class in classes {
                elem.add_class(class);
            }
        }
        id
    }

    pub fn append_child(&self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        self.tree.borrow_mut().append_child(parent, child)
    }

    /// Tear down a subtree and drop every listener bound to it
    pub fn remove(&self, id: NodeId) -> Vec<NodeId> {
        let removed = self.tree.borrow_mut().remove(id);
        if !removed.is_empty() {
            self.handlers.borrow_mut().retain(|(target, _), _| match target {
                EventTarget::Node(n) => !removed.contains(n),
                EventTarget::Window => true,
            });
        }
        removed
    }

    /// Register a listener. Returns false if the same handler is already
    /// registered for this target, type and phase.
    pub fn add_event_listener(
        &self,
        target: EventTarget,
        event_type: &str,
        handler: EventHandler,
        options: ListenerOptions,
    ) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let list = handlers.entry((target, event_type.to_string())).or_default();
        if list
            .iter()
            .any(|h| h.capture == options.capture && Rc::ptr_eq(&h.handler, &handler))
        {
            return false;
        }
        list.push(RegisteredHandler {
            handler,
            capture: options.capture,
            once: options.once,
        });
        true
    }

    /// Remove a listener previously added with the same handler and phase
    pub fn remove_event_listener(
        &self,
        target: EventTarget,
        event_type: &str,
        handler: &EventHandler,
        capture: bool,
    ) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let key = (target, event_type.to_string());
        let Some(list) = handlers.get_mut(&key) else {
            return false;
        };
        let initial_len = list.len();
        list.retain(|h| !(h.capture == capture && Rc::ptr_eq(&h.handler, handler)));
        let removed = list.len() < initial_len;
        if list.is_empty() {
            handlers.remove(&key);
        }
        removed
    }

    /// Number of listeners registered on a target for a type
    pub fn listener_count(&self, target: EventTarget, event_type: &str) -> usize {
        self.handlers
            .borrow()
            .get(&(target, event_type.to_string()))
            .map_or(0, Vec::len)
    }

    /// Propagation path, target first. Ends at `Window` only when the
    /// target is connected to the document root.
    pub fn event_path(&self, target: EventTarget) -> Vec<EventTarget> {
        let EventTarget::Node(node) = target else {
            return vec![EventTarget::Window];
        };
        let tree = self.tree.borrow();
        if !tree.contains(node) {
            return vec![target];
        }
        let mut path = vec![target];
        let mut top = node;
        for ancestor in tree.ancestors(node) {
            path.push(EventTarget::Node(ancestor));
            top = ancestor;
        }
        if top == tree.root() {
            path.push(EventTarget::Window);
        }
        path
    }

    /// Dispatch an event: capture from the top down to the target, then
    /// bubble back up if the event bubbles.
    ///
    /// Returns false if a listener prevented the default action.
    pub fn dispatch_event(&self, event: &mut Event) -> bool {
        let path = self.event_path(event.target);
        tracing::trace!("Dispatching {} along {} targets", event.event_type, path.len());

        let mut stopped = false;
        for &current in path.iter().skip(1).rev() {
            event.phase = EventPhase::Capturing;
            self.invoke(current, event, true);
            if event.is_propagation_stopped() {
                stopped = true;
                break;
            }
        }

        if !stopped {
            event.phase = EventPhase::AtTarget;
            self.invoke(path[0], event, true);
            if !event.is_immediate_propagation_stopped() {
                self.invoke(path[0], event, false);
            }
            stopped = event.is_propagation_stopped();
        }

        if !stopped && event.bubbles {
            for &current in path.iter().skip(1) {
                event.phase = EventPhase::Bubbling;
                self.invoke(current, event, false);
                if event.is_propagation_stopped() {
                    break;
                }
            }
        }

        event.phase = EventPhase::None;
        event.current_target = None;
        !event.is_default_prevented()
    }

    fn invoke(&self, current: EventTarget, event: &mut Event, capture: bool) {
        // Copy out so handlers may add or remove listeners while running
        let to_run: Vec<EventHandler> = {
            let mut handlers = self.handlers.borrow_mut();
            let Some(list) = handlers.get_mut(&(current, event.event_type.clone())) else {
                return;
            };
            let selected = list
                .iter()
                .filter(|h| h.capture == capture)
                .map(|h| h.handler.clone())
                .collect();
            list.retain(|h| !(h.capture == capture && h.once));
            selected
        };

        event.current_target = Some(current);
        for handler in to_run {
            if event.is_immediate_propagation_stopped() {
                break;
            }
            handler(event);
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("about:blank")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn recorder(log: &Rc<RefCell<Vec<String>>>, label: &str) -> EventHandler {
        let log = log.clone();
        let label = label.to_string();
        Rc::new(move |event: &mut Event| {
            log.borrow_mut().push(format!("{}:{:?}", label, event.phase));
        })
    }

    #[test]
    fn test_document_structure() {
        let doc = Document::new("atom://workspace");
        let tree = doc.tree();
        assert_eq!(doc.url(), "atom://workspace");
        assert_eq!(tree.parent(doc.body()), Some(doc.document_element()));
        assert_eq!(tree.parent(doc.document_element()), Some(tree.root()));
    }

    #[test]
    fn test_event_path_reaches_window() {
        let doc = Document::default();
        let div = doc.create_element("div", &[]);
        doc.append_child(doc.body(), div).unwrap();

        let path = doc.event_path(div.into());
        assert_eq!(path.first(), Some(&EventTarget::Node(div)));
        assert_eq!(path.last(), Some(&EventTarget::Window));
        assert_eq!(path.len(), 5);
    }

    #[test]
    fn test_detached_path_stops_at_subtree_root() {
        let doc = Document::default();
        let outer = doc.create_element("div", &[]);
        let inner = doc.create_element("div", &[]);
        doc.append_child(outer, inner).unwrap();

        let path = doc.event_path(inner.into());
        assert_eq!(path, vec![EventTarget::Node(inner), EventTarget::Node(outer)]);
    }

    #[test]
    fn test_capture_then_bubble() {
        let doc = Document::default();
        let div = doc.create_element("div", &[]);
        doc.append_child(doc.body(), div).unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));

        let capture = ListenerOptions { capture: true, ..Default::default() };
        doc.add_event_listener(EventTarget::Window, "x:y", recorder(&log, "window-capture"), capture);
        doc.add_event_listener(div.into(), "x:y", recorder(&log, "div"), ListenerOptions::default());
        doc.add_event_listener(doc.body().into(), "x:y", recorder(&log, "body"), ListenerOptions::default());

        let mut event = Event::custom("x:y", div.into(), None);
        assert!(doc.dispatch_event(&mut event));

        assert_eq!(
            *log.borrow(),
            vec!["window-capture:Capturing", "div:AtTarget", "body:Bubbling"]
        );
        assert_eq!(event.phase, EventPhase::None);
    }

    #[test]
    fn test_stop_propagation_in_capture() {
        let doc = Document::default();
        let log = Rc::new(RefCell::new(Vec::new()));
        let stopper: EventHandler = Rc::new(|event: &mut Event| event.stop_propagation());

        let capture = ListenerOptions { capture: true, ..Default::default() };
        doc.add_event_listener(EventTarget::Window, "x:y", stopper, capture);
        doc.add_event_listener(doc.body().into(), "x:y", recorder(&log, "body"), ListenerOptions::default());

        let mut event = Event::custom("x:y", doc.body().into(), None);
        doc.dispatch_event(&mut event);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_duplicate_listener_ignored() {
        let doc = Document::default();
        let log = Rc::new(RefCell::new(Vec::new()));
        let handler = recorder(&log, "h");

        assert!(doc.add_event_listener(EventTarget::Window, "x:y", handler.clone(), ListenerOptions::default()));
        assert!(!doc.add_event_listener(EventTarget::Window, "x:y", handler.clone(), ListenerOptions::default()));
        assert_eq!(doc.listener_count(EventTarget::Window, "x:y"), 1);

        assert!(doc.remove_event_listener(EventTarget::Window, "x:y", &handler, false));
        assert!(!doc.remove_event_listener(EventTarget::Window, "x:y", &handler, false));
        assert_eq!(doc.listener_count(EventTarget::Window, "x:y"), 0);
    }

    #[test]
    fn test_once_listener() {
        let doc = Document::default();
        let log = Rc::new(RefCell::new(Vec::new()));
        let once = ListenerOptions { once: true, ..Default::default() };
        doc.add_event_listener(doc.body().into(), "x:y", recorder(&log, "once"), once);

        doc.dispatch_event(&mut Event::custom("x:y", doc.body().into(), None));
        doc.dispatch_event(&mut Event::custom("x:y", doc.body().into(), None));
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_remove_drops_listeners() {
        let doc = Document::default();
        let div = doc.create_element("div", &["pane"]);
        doc.append_child(doc.body(), div).unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        doc.add_event_listener(div.into(), "x:y", recorder(&log, "div"), ListenerOptions::default());

        assert_eq!(doc.remove(div), vec![div]);
        assert_eq!(doc.listener_count(div.into(), "x:y"), 0);
    }
}
