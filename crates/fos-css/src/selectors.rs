//! Selector model and matching
//!
//! A `Selector` is a chain of compound selectors joined by descendant or
//! child combinators. Matching runs right to left against a `DomTree`.
//! Specificity is taken from the validating parse, so it also covers
//! selectors that are valid but cannot be evaluated here.

use fos_dom::{DomTree, ElementData, NodeId};

use crate::{CssError, Specificity};

/// A component of a compound selector
#[derive(Debug, Clone, PartialEq)]
pub enum SelectorComponent {
    /// Universal selector *
    Universal,
    /// Type selector (tag name)
    Type(String),
    /// ID selector #id
    Id(String),
    /// Class selector .class
    Class(String),
    /// Attribute selector [attr], [attr=value], etc.
    Attribute(AttributeSelector),
    /// Pseudo-class :not(), :first-child, etc.
    PseudoClass(PseudoClass),
}

/// Pseudo-class type
#[derive(Debug, Clone, PartialEq)]
pub enum PseudoClass {
    // Logical pseudo-classes
    Not(Vec<CompoundSelector>),
    Is(Vec<CompoundSelector>),
    Where(Vec<CompoundSelector>),

    // Tree-structural pseudo-classes
    Root,
    Empty,
    FirstChild,
    LastChild,
    OnlyChild,
    FirstOfType,
    LastOfType,
    OnlyOfType,
    NthChild(Nth),
    NthLastChild(Nth),
    NthOfType(Nth),
    NthLastOfType(Nth),

    // Input pseudo-classes
    Enabled,
    Disabled,
    Checked,

    // User action pseudo-classes
    Focus,
    FocusWithin,

    /// Valid pseudo-class or pseudo-element with no state in the tree
    /// (`:hover`, `:visited`, `::before`). Never matches.
    Unsupported(String),
}

/// `An+B` argument of the `:nth-*` pseudo-classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nth {
    pub a: i32,
    pub b: i32,
}

impl Nth {
    /// Check a 1-based position
    pub fn matches(self, position: i32) -> bool {
        let offset = position - self.b;
        match self.a {
            0 => offset == 0,
            a => offset % a == 0 && offset / a >= 0,
        }
    }
}

/// Attribute selector
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSelector {
    pub name: String,
    pub matcher: Option<AttributeMatcher>,
    pub case_insensitive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeMatcher {
    /// [attr=value] - exact match
    Exact(String),
    /// [attr~=value] - whitespace-separated list contains
    Contains(String),
    /// [attr|=value] - exact or prefix with hyphen
    DashMatch(String),
    /// [attr^=value] - starts with
    Prefix(String),
    /// [attr$=value] - ends with
    Suffix(String),
    /// [attr*=value] - contains substring
    Substring(String),
}

impl AttributeSelector {
    /// Check if an attribute value matches
    pub fn matches(&self, value: Option<&str>) -> bool {
        let (Some(matcher), Some(val)) = (&self.matcher, value) else {
            // [attr] - just check existence
            return self.matcher.is_none() && value.is_some();
        };

        let fold = |s: &str| {
            if self.case_insensitive {
                s.to_lowercase()
            } else {
                s.to_string()
            }
        };
        let val = fold(val);

        match matcher {
            AttributeMatcher::Exact(expected) => val == fold(expected.as_str()),
            AttributeMatcher::Contains(expected) => {
                let expected = fold(expected.as_str());
                val.split_whitespace().any(|w| w == expected)
            }
            AttributeMatcher::DashMatch(expected) => {
                let expected = fold(expected.as_str());
                val == expected || val.starts_with(&format!("{}-", expected))
            }
            AttributeMatcher::Prefix(expected) => !expected.is_empty() && val.starts_with(&fold(expected.as_str())),
            AttributeMatcher::Suffix(expected) => !expected.is_empty() && val.ends_with(&fold(expected.as_str())),
            AttributeMatcher::Substring(expected) => !expected.is_empty() && val.contains(&fold(expected.as_str())),
        }
    }
}

/// Sequence of simple selectors with no combinator between them
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundSelector {
    pub components: Vec<SelectorComponent>,
}

impl CompoundSelector {
    /// Check every component against an element node
    pub fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        let Some(element) = tree.element(node) else {
            return false;
        };
        self.components
            .iter()
            .all(|c| match_component(c, tree, node, element))
    }
}

/// Combinator between two compound selectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// `a b`
    Descendant,
    /// `a > b`
    Child,
}

/// Parsed selector
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    /// Source text, trimmed
    pub text: String,
    pub specificity: Specificity,
    /// Left to right; empty when the selector cannot be evaluated
    compounds: Vec<CompoundSelector>,
    /// `combinators[i]` sits between `compounds[i]` and `compounds[i + 1]`
    combinators: Vec<Combinator>,
}

impl Selector {
    pub(crate) fn new(
        text: &str,
        specificity: Specificity,
        compounds: Vec<CompoundSelector>,
        combinators: Vec<Combinator>,
    ) -> Self {
        debug_assert_eq!(compounds.len(), combinators.len() + 1);
        Self {
            text: text.to_string(),
            specificity,
            compounds,
            combinators,
        }
    }

    /// A valid selector using syntax the matcher does not evaluate
    pub(crate) fn unevaluable(text: &str, specificity: Specificity) -> Self {
        Self {
            text: text.to_string(),
            specificity,
            compounds: Vec::new(),
            combinators: Vec::new(),
        }
    }

    /// Parse a selector
    pub fn parse(text: &str) -> Result<Selector, CssError> {
        crate::parse_selector(text)
    }

    /// False when matching always fails because part of the selector
    /// cannot be evaluated against a `DomTree`
    pub fn is_evaluable(&self) -> bool {
        !self.compounds.is_empty()
    }

    pub fn compounds(&self) -> &[CompoundSelector] {
        &self.compounds
    }

    pub fn combinators(&self) -> &[Combinator] {
        &self.combinators
    }

    /// Check if `node` matches this selector
    pub fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        match self.compounds.len() {
            0 => false,
            n => self.matches_from(tree, node, n - 1),
        }
    }

    fn matches_from(&self, tree: &DomTree, node: NodeId, index: usize) -> bool {
        if !self.compounds[index].matches(tree, node) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match self.combinators[index - 1] {
            Combinator::Child => tree
                .parent(node)
                .is_some_and(|parent| self.matches_from(tree, parent, index - 1)),
            Combinator::Descendant => tree
                .ancestors(node)
                .any(|ancestor| self.matches_from(tree, ancestor, index - 1)),
        }
    }
}

/// Match a selector component against an element
fn match_component(
    component: &SelectorComponent,
    tree: &DomTree,
    node: NodeId,
    element: &ElementData,
) -> bool {
    match component {
        SelectorComponent::Universal => true,
        SelectorComponent::Type(tag) => element.tag_name.eq_ignore_ascii_case(tag),
        SelectorComponent::Id(id) => element.id() == Some(id.as_str()),
        SelectorComponent::Class(class) => element.has_class(class),
        SelectorComponent::Attribute(attr) => attr.matches(element.get_attribute(&attr.name)),
        SelectorComponent::PseudoClass(pseudo) => match_pseudo_class(pseudo, tree, node, element),
    }
}

const FORM_CONTROLS: &[&str] = &[
    "button", "fieldset", "input", "optgroup", "option", "select", "textarea",
];

/// Match a pseudo-class against an element
fn match_pseudo_class(
    pseudo: &PseudoClass,
    tree: &DomTree,
    node: NodeId,
    element: &ElementData,
) -> bool {
    let tag = element.tag_name.as_str();
    match pseudo {
        PseudoClass::Not(list) => !list.iter().any(|c| c.matches(tree, node)),
        PseudoClass::Is(list) | PseudoClass::Where(list) => {
            list.iter().any(|c| c.matches(tree, node))
        }
        PseudoClass::Root => tree.parent(node) == Some(tree.root()),
        PseudoClass::Empty => tree.children(node).is_empty(),
        PseudoClass::FirstChild => element_siblings(tree, node, None).first() == Some(&node),
        PseudoClass::LastChild => element_siblings(tree, node, None).last() == Some(&node),
        PseudoClass::OnlyChild => element_siblings(tree, node, None) == [node],
        PseudoClass::FirstOfType => element_siblings(tree, node, Some(tag)).first() == Some(&node),
        PseudoClass::LastOfType => element_siblings(tree, node, Some(tag)).last() == Some(&node),
        PseudoClass::OnlyOfType => element_siblings(tree, node, Some(tag)) == [node],
        PseudoClass::NthChild(nth) => nth_position(tree, node, None, false)
            .is_some_and(|p| nth.matches(p)),
        PseudoClass::NthLastChild(nth) => nth_position(tree, node, None, true)
            .is_some_and(|p| nth.matches(p)),
        PseudoClass::NthOfType(nth) => nth_position(tree, node, Some(tag), false)
            .is_some_and(|p| nth.matches(p)),
        PseudoClass::NthLastOfType(nth) => nth_position(tree, node, Some(tag), true)
            .is_some_and(|p| nth.matches(p)),
        PseudoClass::Enabled => FORM_CONTROLS.contains(&tag) && !element.has_attribute("disabled"),
        PseudoClass::Disabled => FORM_CONTROLS.contains(&tag) && element.has_attribute("disabled"),
        PseudoClass::Checked => match tag {
            "input" => element.has_attribute("checked"),
            "option" => element.has_attribute("selected"),
            _ => false,
        },
        PseudoClass::Focus => tree.focused() == Some(node),
        PseudoClass::FocusWithin => tree
            .focused()
            .is_some_and(|f| f == node || tree.ancestors(f).any(|a| a == node)),
        PseudoClass::Unsupported(_) => false,
    }
}

/// Element children of `node`'s parent, optionally only those named
/// `tag_name` (empty for a detached node)
fn element_siblings(tree: &DomTree, node: NodeId, tag_name: Option<&str>) -> Vec<NodeId> {
    let Some(parent) = tree.parent(node) else {
        return Vec::new();
    };
    tree.children(parent)
        .iter()
        .copied()
        .filter(|&c| {
            tree.element(c)
                .is_some_and(|e| tag_name.is_none_or(|tag| e.tag_name == tag))
        })
        .collect()
}

/// 1-based position of `node` among its element siblings
fn nth_position(tree: &DomTree, node: NodeId, tag_name: Option<&str>, from_end: bool) -> Option<i32> {
    let siblings = element_siblings(tree, node, tag_name);
    let index = siblings.iter().position(|&s| s == node)?;
    let position = if from_end { siblings.len() - index } else { index + 1 };
    i32::try_from(position).ok()
}
