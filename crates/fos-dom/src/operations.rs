//! DOM Node Operations
//!
//! Error type shared by tree mutations (appendChild, removeChild, remove).

/// Result type for DOM operations
pub type DomResult<T> = Result<T, DomError>;

/// DOM operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// Node not found (never existed, or already torn down)
    #[error("Node not found")]
    NotFound,
    /// Hierarchy error (e.g., inserting an ancestor into its descendant)
    #[error("Hierarchy request error")]
    HierarchyRequest,
    /// Node is not a child of the given parent
    #[error("Node is not a child")]
    NotAChild,
}
