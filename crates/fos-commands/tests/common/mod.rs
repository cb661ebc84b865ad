//! Shared fixture: `body > .parent > .child > .grandchild`, with a registry
//! attached to `.parent`.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use fos_commands::{CommandRegistry, Completion, Listener};
use fos_dom::{Document, NodeId};

pub struct Fixture {
    pub doc: Rc<Document>,
    pub registry: CommandRegistry,
    pub parent: NodeId,
    pub child: NodeId,
    pub grandchild: NodeId,
}

pub fn fixture() -> Fixture {
    init_tracing();

    let doc = Rc::new(Document::new("atom://workspace"));
    let parent = doc.create_element("div", &["parent"]);
    let child = doc.create_element("div", &["child"]);
    let grandchild = doc.create_element("div", &["grandchild"]);
    doc.append_child(doc.body(), parent).unwrap();
    doc.append_child(parent, child).unwrap();
    doc.append_child(child, grandchild).unwrap();

    let registry = CommandRegistry::new(doc.clone());
    registry.attach(parent);

    Fixture {
        doc,
        registry,
        parent,
        child,
        grandchild,
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub type Calls = Rc<RefCell<Vec<&'static str>>>;

pub fn calls() -> Calls {
    Rc::new(RefCell::new(Vec::new()))
}

/// Listener that records `label` and settles with it
pub fn recorder(calls: &Calls, label: &'static str) -> Listener {
    let calls = calls.clone();
    Listener::callback(move |_event| {
        calls.borrow_mut().push(label);
        Completion::value(label)
    })
}
