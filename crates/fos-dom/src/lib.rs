//! fOS DOM - Document Object Model
//!
//! Arena-backed element tree with generational node ids, plus a document
//! host that owns native event listeners and runs capture/bubble dispatch.

mod attributes;
mod document;
mod dom_events;
mod generation;
mod node;
mod operations;
mod tree;

pub use attributes::{Attr, NamedNodeMap};
pub use document::{Document, EventHandler, ListenerOptions};
pub use dom_events::{Event, EventPhase};
pub use generation::Generation;
pub use node::{ElementData, Node, NodeData, TextData};
pub use operations::{DomError, DomResult};
pub use tree::DomTree;

/// Node identifier (index into arena plus slot generation)
///
/// A removed node's slot is recycled with a bumped generation, so a stale id
/// never resolves to the node that later reuses the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: Generation,
}

impl NodeId {
    /// Root (document) node ID
    pub const ROOT: NodeId = NodeId::new(0, Generation::INITIAL);

    pub(crate) const fn new(index: u32, generation: Generation) -> Self {
        Self { index, generation }
    }

    /// Arena slot index
    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }

    /// Slot generation this id was issued for
    #[inline]
    pub fn generation(self) -> Generation {
        self.generation
    }
}

/// Anything an event can be dispatched at or listened on.
///
/// `Window` sits above the document root and is the last stop of every
/// bubbling path that reaches the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTarget {
    Node(NodeId),
    Window,
}

impl EventTarget {
    /// The node behind this target, if it is not the window
    pub fn node(self) -> Option<NodeId> {
        match self {
            EventTarget::Node(id) => Some(id),
            EventTarget::Window => None,
        }
    }

    pub fn is_window(self) -> bool {
        matches!(self, EventTarget::Window)
    }
}

impl From<NodeId> for EventTarget {
    fn from(id: NodeId) -> Self {
        EventTarget::Node(id)
    }
}
