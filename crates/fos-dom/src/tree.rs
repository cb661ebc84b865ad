//! DOM Tree (arena-based allocation)
//!
//! Slots are recycled after a node is torn down; the slot generation is
//! bumped at that point so outstanding ids go stale instead of aliasing.

use crate::{DomError, DomResult, ElementData, Generation, Node, NodeId};

#[derive(Debug)]
struct Slot {
    generation: Generation,
    node: Option<Node>,
}

/// Arena-based DOM tree
#[derive(Debug)]
pub struct DomTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    focused: Option<NodeId>,
}

impl DomTree {
    /// Create a tree holding only the document root
    pub fn new() -> Self {
        Self {
            slots: vec![Slot {
                generation: Generation::INITIAL,
                node: Some(Node::document()),
            }],
            free: Vec::new(),
            live: 1,
            focused: None,
        }
    }

    /// The document root
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index())?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.node.as_ref()
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.node.as_mut()
    }

    /// Whether `id` still refers to a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes in the tree (including the root)
    pub fn len(&self) -> usize {
        self.live
    }

    /// Check if tree holds nothing but the root
    pub fn is_empty(&self) -> bool {
        self.live <= 1
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.alloc(Node::element(tag_name))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.alloc(Node::text(content.to_string()))
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: Generation::INITIAL,
            node: Some(node),
        });
        NodeId::new(index, Generation::INITIAL)
    }

    /// Parent of a node
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent
    }

    /// Children of a node, in document order
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Ancestors of a node, nearest first
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    /// Element data for an element node
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id)?.as_element()
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.get_mut(id)?.as_element_mut()
    }

    /// Append `child` as the last child of `parent`, moving it if attached
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        let parent_node = self.get(parent).ok_or(DomError::NotFound)?;
        if parent_node.is_text() {
            return Err(DomError::HierarchyRequest);
        }
        if !self.contains(child) {
            return Err(DomError::NotFound);
        }
        if child == self.root() || child == parent || self.ancestors(parent).any(|a| a == child) {
            return Err(DomError::HierarchyRequest);
        }

        self.detach(child);
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.get_mut(parent) {
            node.children.push(child);
        }
        Ok(child)
    }

    /// Detach `child` from `parent`; the node stays alive
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        let node = self.get(child).ok_or(DomError::NotFound)?;
        if node.parent != Some(parent) {
            return Err(DomError::NotAChild);
        }
        self.detach(child);
        Ok(child)
    }

    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.parent(child) else {
            return;
        };
        if let Some(node) = self.get_mut(parent) {
            node.children.retain(|&c| c != child);
        }
        if let Some(node) = self.get_mut(child) {
            node.parent = None;
        }
    }

    /// Tear down a node and its subtree, returning the ids that went stale.
    ///
    /// The root cannot be removed.
    pub fn remove(&mut self, id: NodeId) -> Vec<NodeId> {
        if id == self.root() || !self.contains(id) {
            return Vec::new();
        }
        self.detach(id);

        let mut removed = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            stack.extend_from_slice(self.children(current));
            removed.push(current);
        }

        for &dead in &removed {
            let slot = &mut self.slots[dead.index()];
            slot.node = None;
            slot.generation = slot.generation.next();
            self.free.push(dead.index() as u32);
            self.live -= 1;
        }
        if self.focused.is_some_and(|f| removed.contains(&f)) {
            self.focused = None;
        }
        tracing::trace!("Removed {} nodes", removed.len());
        removed
    }

    /// Focus an element (or clear focus)
    pub fn set_focus(&mut self, id: Option<NodeId>) {
        self.focused = id.filter(|&n| self.contains(n));
    }

    /// Currently focused element
    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}
