//! fOS CSS Selectors
//!
//! Parsing, validation, specificity and matching of the selectors commands
//! are registered against. Validation and specificity come from lightningcss.

mod parser;
mod selectors;

pub use parser::parse_selector;
pub use selectors::{
    AttributeMatcher, AttributeSelector, Combinator, CompoundSelector, Nth, PseudoClass, Selector,
    SelectorComponent,
};

/// Validate a selector without keeping the parse
pub fn validate_selector(text: &str) -> Result<(), CssError> {
    parse_selector(text).map(|_| ())
}

/// Compute the specificity of a selector
pub fn calculate_specificity(text: &str) -> Result<Specificity, CssError> {
    parse_selector(text).map(|s| s.specificity)
}

/// Selector specificity (ids, classes, types)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Specificity(pub u32, pub u32, pub u32);

impl Specificity {
    pub const ZERO: Specificity = Specificity(0, 0, 0);

    /// Unpack the 10-bit-per-component value selectors report
    pub fn from_packed(packed: u32) -> Specificity {
        const MASK: u32 = (1 << 10) - 1;
        Specificity(packed >> 20 & MASK, packed >> 10 & MASK, packed & MASK)
    }
}

/// CSS parsing error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CssError {
    #[error("'{selector}' is not a valid selector: {message}")]
    InvalidSelector { selector: String, message: String },
}
