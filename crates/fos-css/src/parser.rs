//! Selector Parser
//!
//! Selectors are validated by parsing them as the prelude of an empty style
//! rule with lightningcss, which also supplies specificity. Accepted
//! selectors are then lowered into compound selectors joined by descendant
//! (whitespace) or child (`>`) combinators for matching. Selector lists and
//! sibling combinators are rejected. Valid selectors the matcher cannot
//! evaluate are kept, but never match.

use std::sync::{Arc, RwLock};

use lightningcss::rules::CssRule;
use lightningcss::stylesheet::{ParserOptions, StyleSheet};

use crate::selectors::{
    AttributeMatcher, AttributeSelector, Combinator, CompoundSelector, Nth, PseudoClass, Selector,
    SelectorComponent,
};
use crate::{CssError, Specificity};

type ParseResult<T> = Result<T, String>;

/// Parse and validate a selector
pub fn parse_selector(input: &str) -> Result<Selector, CssError> {
    let fail = |message: String| {
        tracing::debug!("Rejected selector '{}': {}", input, message);
        CssError::InvalidSelector {
            selector: input.to_string(),
            message,
        }
    };

    let text = input.trim();
    if text.is_empty() {
        return Err(fail("empty selector".to_string()));
    }

    let specificity = validate(text).map_err(fail)?;
    let (parts, combinators) = split_complex(text).map_err(fail)?;

    let compounds = parts
        .into_iter()
        .map(parse_compound)
        .collect::<ParseResult<Vec<_>>>();
    match compounds {
        Ok(compounds) => Ok(Selector::new(text, specificity, compounds, combinators)),
        Err(message) => {
            tracing::debug!("Selector '{}' cannot be evaluated: {}", text, message);
            Ok(Selector::unevaluable(text, specificity))
        }
    }
}

/// Check `text` is exactly one valid selector and return its specificity
fn validate(text: &str) -> ParseResult<Specificity> {
    let css = format!("{} {{}}", text);
    let warnings = Arc::new(RwLock::new(Vec::new()));
    let options = ParserOptions {
        warnings: Some(warnings.clone()),
        ..ParserOptions::default()
    };

    let stylesheet = StyleSheet::parse(&css, options).map_err(|e| e.kind.to_string())?;

    // Unknown pseudo-classes and pseudo-elements parse, with a warning
    let warning = warnings
        .read()
        .ok()
        .and_then(|w| w.first().map(|e| e.kind.to_string()));
    if let Some(warning) = warning {
        return Err(warning);
    }

    let [CssRule::Style(rule)] = stylesheet.rules.0.as_slice() else {
        return Err("expected a single style rule prelude".to_string());
    };
    match rule.selectors.0.as_slice() {
        [selector] => Ok(Specificity::from_packed(selector.specificity())),
        _ => Err("selector lists are not supported".to_string()),
    }
}

/// Split a complex selector into compound parts and the combinators
/// between them
fn split_complex(text: &str) -> ParseResult<(Vec<&str>, Vec<Combinator>)> {
    let mut compounds = Vec::new();
    let mut combinators = Vec::new();
    let mut pending: Option<Combinator> = None;
    let mut start: Option<usize> = None;
    let mut parens = 0usize;
    let mut in_brackets = false;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
            if start.is_none() {
                if !compounds.is_empty() {
                    let combinator = pending.take().ok_or("missing combinator")?;
                    combinators.push(combinator);
                }
                start = Some(i);
            }
            continue;
        }
        // Inside [...], (...) or a quoted string nothing separates compounds
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        if in_brackets {
            match c {
                '"' | '\'' => quote = Some(c),
                ']' => in_brackets = false,
                _ => {}
            }
            continue;
        }
        if parens > 0 {
            match c {
                '(' => parens += 1,
                ')' => parens -= 1,
                '[' => in_brackets = true,
                '"' | '\'' => quote = Some(c),
                _ => {}
            }
            continue;
        }

        match c {
            ',' => return Err("selector lists are not supported".to_string()),
            '+' | '~' => return Err(format!("sibling combinator '{}' is not supported", c)),
            '>' => {
                if let Some(s) = start.take() {
                    compounds.push(&text[s..i]);
                }
                if compounds.is_empty() || pending == Some(Combinator::Child) {
                    return Err("dangling '>' combinator".to_string());
                }
                pending = Some(Combinator::Child);
            }
            c if c.is_whitespace() => {
                if let Some(s) = start.take() {
                    compounds.push(&text[s..i]);
                }
                if pending.is_none() && !compounds.is_empty() {
                    pending = Some(Combinator::Descendant);
                }
            }
            _ => {
                if start.is_none() {
                    if !compounds.is_empty() {
                        let combinator = pending.take().ok_or("missing combinator")?;
                        combinators.push(combinator);
                    }
                    start = Some(i);
                }
                match c {
                    '[' => in_brackets = true,
                    '(' => parens += 1,
                    ')' | ']' => return Err(format!("unbalanced '{}'", c)),
                    _ => {}
                }
            }
        }
    }

    if quote.is_some() {
        return Err("unterminated string".to_string());
    }
    if in_brackets || parens > 0 {
        return Err("unterminated bracket or parenthesis".to_string());
    }
    match start {
        Some(s) => compounds.push(&text[s..]),
        None if pending.is_some() => return Err("dangling combinator".to_string()),
        None => {}
    }

    Ok((compounds, combinators))
}

/// Parse a compound selector: optional type or `*`, then any number of
/// id, class, attribute and pseudo-class selectors
fn parse_compound(input: &str) -> ParseResult<CompoundSelector> {
    let mut components = Vec::new();
    let mut rest = input;

    if let Some(r) = rest.strip_prefix('*') {
        components.push(SelectorComponent::Universal);
        rest = r;
    } else if rest.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_' || c == '-') {
        let (name, r) = take_ident(rest);
        if !is_valid_ident(name) {
            return Err(format!("invalid type selector '{}'", name));
        }
        components.push(SelectorComponent::Type(name.to_ascii_lowercase()));
        rest = r;
    }

    while let Some(c) = rest.chars().next() {
        rest = match c {
            '#' => {
                let (name, r) = take_ident(&rest[1..]);
                if !is_valid_ident(name) {
                    return Err(format!("invalid id selector '#{}'", name));
                }
                components.push(SelectorComponent::Id(name.to_string()));
                r
            }
            '.' => {
                let (name, r) = take_ident(&rest[1..]);
                if !is_valid_ident(name) {
                    return Err(format!("invalid class selector '.{}'", name));
                }
                components.push(SelectorComponent::Class(name.to_string()));
                r
            }
            '[' => {
                let end = find_close(rest, '[', ']')?;
                components.push(parse_attribute_selector(&rest[1..end])?);
                &rest[end + 1..]
            }
            ':' => {
                let (element, after) = match rest[1..].strip_prefix(':') {
                    Some(r) => (true, r),
                    None => (false, &rest[1..]),
                };
                let (name, r) = take_ident(after);
                if name.is_empty() {
                    return Err("missing pseudo-class name".to_string());
                }
                let (arg, r) = if r.starts_with('(') {
                    let end = find_close(r, '(', ')')?;
                    (Some(&r[1..end]), &r[end + 1..])
                } else {
                    (None, r)
                };
                let pseudo = match (element, arg) {
                    (true, _) => PseudoClass::Unsupported(format!("::{}", name)),
                    (false, Some(arg)) => parse_functional_pseudo_class(name, arg)?,
                    (false, None) => parse_pseudo_class(name),
                };
                components.push(SelectorComponent::PseudoClass(pseudo));
                r
            }
            other => return Err(format!("unexpected '{}'", other)),
        };
    }

    if components.is_empty() {
        return Err("empty compound selector".to_string());
    }
    Ok(CompoundSelector { components })
}

/// Parse the comma-separated argument of `:is()`, `:where()` and `:not()`
fn parse_compound_list(input: &str) -> ParseResult<Vec<CompoundSelector>> {
    split_top_level_commas(input)
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_compound)
        .collect()
}

/// Split on commas outside brackets, parentheses and quoted strings
fn split_top_level_commas(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (_, '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || !c.is_ascii()
}

/// Split off the leading identifier characters
fn take_ident(input: &str) -> (&str, &str) {
    let end = input
        .char_indices()
        .find(|&(_, c)| !is_ident_char(c))
        .map_or(input.len(), |(i, _)| i);
    input.split_at(end)
}

/// Check if string is a valid CSS identifier
fn is_valid_ident(s: &str) -> bool {
    let mut chars = s.chars();

    // First character must be a letter, underscore, or hyphen followed by non-digit
    match chars.next() {
        Some('-') => matches!(chars.next(), Some(c) if !c.is_ascii_digit()),
        Some(c) => c.is_ascii_alphabetic() || c == '_' || !c.is_ascii(),
        None => false,
    }
}

/// Index of the bracket closing the one `input` starts with
fn find_close(input: &str, open: char, close: char) -> ParseResult<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, c) in input.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
    }
    Err(format!("missing '{}'", close))
}

/// Parse an attribute selector content (without brackets)
fn parse_attribute_selector(content: &str) -> ParseResult<SelectorComponent> {
    let content = content.trim();

    // Case-insensitive flag
    let (content, case_insensitive) = if content.ends_with(" i") || content.ends_with(" I") {
        (content[..content.len() - 2].trim_end(), true)
    } else {
        (content, false)
    };

    // Check for different matchers
    for (op, matcher_fn) in [
        ("~=", AttributeMatcher::Contains as fn(String) -> AttributeMatcher),
        ("|=", AttributeMatcher::DashMatch as fn(String) -> AttributeMatcher),
        ("^=", AttributeMatcher::Prefix as fn(String) -> AttributeMatcher),
        ("$=", AttributeMatcher::Suffix as fn(String) -> AttributeMatcher),
        ("*=", AttributeMatcher::Substring as fn(String) -> AttributeMatcher),
        ("=", AttributeMatcher::Exact as fn(String) -> AttributeMatcher),
    ] {
        // The operator always precedes the value, so never look inside quotes
        let unquoted_end = content.find(['"', '\'']).unwrap_or(content.len());
        if let Some(pos) = content[..unquoted_end].find(op) {
            let name = content[..pos].trim();
            if !is_valid_ident(name) {
                return Err(format!("invalid attribute name '{}'", name));
            }

            let raw = content[pos + op.len()..].trim();
            let value = match unquote(raw) {
                Some(unquoted) => unquoted,
                None if raw.is_empty() => return Err(format!("missing value for [{}]", name)),
                None if raw.chars().all(is_ident_char) => raw,
                None => return Err(format!("invalid attribute value '{}'", raw)),
            };

            return Ok(SelectorComponent::Attribute(AttributeSelector {
                name: name.to_string(),
                matcher: Some(matcher_fn(value.to_string())),
                case_insensitive,
            }));
        }
    }

    // Just attribute presence [attr]
    if !is_valid_ident(content) {
        return Err(format!("invalid attribute name '{}'", content));
    }
    Ok(SelectorComponent::Attribute(AttributeSelector {
        name: content.to_string(),
        matcher: None,
        case_insensitive,
    }))
}

fn unquote(raw: &str) -> Option<&str> {
    ['"', '\''].into_iter().find_map(|q| {
        raw.strip_prefix(q)
            .and_then(|r| r.strip_suffix(q))
    })
}

/// Parse a functional pseudo-class
fn parse_functional_pseudo_class(name: &str, arg: &str) -> ParseResult<PseudoClass> {
    let pseudo = match name.to_ascii_lowercase().as_str() {
        "not" => PseudoClass::Not(parse_compound_list(arg)?),
        "is" => PseudoClass::Is(parse_compound_list(arg)?),
        "where" => PseudoClass::Where(parse_compound_list(arg)?),
        "nth-child" => PseudoClass::NthChild(parse_nth(arg)?),
        "nth-last-child" => PseudoClass::NthLastChild(parse_nth(arg)?),
        "nth-of-type" => PseudoClass::NthOfType(parse_nth(arg)?),
        "nth-last-of-type" => PseudoClass::NthLastOfType(parse_nth(arg)?),
        other => PseudoClass::Unsupported(format!("{}()", other)),
    };
    Ok(pseudo)
}

/// Parse a pseudo-class name
fn parse_pseudo_class(name: &str) -> PseudoClass {
    match name.to_ascii_lowercase().as_str() {
        "root" => PseudoClass::Root,
        "empty" => PseudoClass::Empty,
        "first-child" => PseudoClass::FirstChild,
        "last-child" => PseudoClass::LastChild,
        "only-child" => PseudoClass::OnlyChild,
        "first-of-type" => PseudoClass::FirstOfType,
        "last-of-type" => PseudoClass::LastOfType,
        "only-of-type" => PseudoClass::OnlyOfType,
        "enabled" => PseudoClass::Enabled,
        "disabled" => PseudoClass::Disabled,
        "checked" => PseudoClass::Checked,
        "focus" => PseudoClass::Focus,
        "focus-within" => PseudoClass::FocusWithin,
        other => PseudoClass::Unsupported(other.to_string()),
    }
}

/// Parse an `An+B` argument (`odd`, `even`, `3`, `-n+3`, `2n + 1`)
fn parse_nth(arg: &str) -> ParseResult<Nth> {
    let arg: String = arg
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    let invalid = || format!("invalid An+B '{}'", arg);

    match arg.as_str() {
        "odd" => return Ok(Nth { a: 2, b: 1 }),
        "even" => return Ok(Nth { a: 2, b: 0 }),
        _ => {}
    }

    let Some(n) = arg.find('n') else {
        let b = arg.parse().map_err(|_| invalid())?;
        return Ok(Nth { a: 0, b });
    };
    let a = match &arg[..n] {
        "" | "+" => 1,
        "-" => -1,
        a => a.parse().map_err(|_| invalid())?,
    };
    let b = match &arg[n + 1..] {
        "" => 0,
        b => b.strip_prefix('+').unwrap_or(b).parse().map_err(|_| invalid())?,
    };
    Ok(Nth { a, b })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specificity_of(text: &str) -> Specificity {
        parse_selector(text).unwrap().specificity
    }

    #[test]
    fn test_simple_selectors() {
        assert_eq!(specificity_of("*"), Specificity(0, 0, 0));
        assert_eq!(specificity_of("div"), Specificity(0, 0, 1));
        assert_eq!(specificity_of(".foo"), Specificity(0, 1, 0));
        assert_eq!(specificity_of("#main"), Specificity(1, 0, 0));
        assert_eq!(specificity_of("[mini]"), Specificity(0, 1, 0));
    }

    #[test]
    fn test_compound_specificity() {
        assert_eq!(specificity_of(".foo.bar"), Specificity(0, 2, 0));
        assert_eq!(specificity_of("atom-text-editor:not([mini])"), Specificity(0, 1, 1));
        assert_eq!(specificity_of("div#main.pane[data-x=\"1\"]:first-child"), Specificity(1, 3, 1));
        assert_eq!(specificity_of(":where(.a, #b)"), Specificity(0, 0, 0));
    }

    #[test]
    fn test_complex_specificity() {
        assert_eq!(specificity_of("atom-workspace atom-text-editor"), Specificity(0, 0, 2));
        assert_eq!(specificity_of(".platform-darwin > .editor.is-focused"), Specificity(0, 3, 0));
    }

    #[test]
    fn test_combinators() {
        let sel = parse_selector("a  >  b c").unwrap();
        assert_eq!(sel.compounds().len(), 3);
        assert_eq!(sel.combinators(), &[Combinator::Child, Combinator::Descendant]);

        let sel = parse_selector("a>b").unwrap();
        assert_eq!(sel.combinators(), &[Combinator::Child]);
        assert_eq!(sel.text, "a>b");
    }

    #[test]
    fn test_brackets_hide_separators() {
        let sel = parse_selector("[title=\"a, b > c\"]").unwrap();
        assert_eq!(sel.compounds().len(), 1);

        let sel = parse_selector(":not([data-x='y z'])").unwrap();
        assert_eq!(sel.compounds().len(), 1);
    }

    #[test]
    fn test_invalid_selectors() {
        for bad in [
            "",
            "   ",
            "a, b",
            "a + b",
            "a ~ b",
            "> a",
            "a >",
            "a > > b",
            ":hover-ish",
            "div::bogus",
            "a {} b",
            ".",
            "#1abc",
            ".-1x",
            "[=x]",
            "[a=]",
            "[a",
            "a)",
            "<>",
            "div$",
            ":not(",
        ] {
            assert!(parse_selector(bad).is_err(), "expected '{}' to be rejected", bad);
        }
    }

    #[test]
    fn test_error_message() {
        let err = parse_selector("a, b").unwrap_err();
        assert_eq!(
            err,
            CssError::InvalidSelector {
                selector: "a, b".to_string(),
                message: "selector lists are not supported".to_string(),
            }
        );
    }

    #[test]
    fn test_is_list_respects_quotes() {
        let sel = parse_selector(":is(.a, [title=\"x,y\"], #b)").unwrap();
        match &sel.compounds()[0].components[0] {
            SelectorComponent::PseudoClass(PseudoClass::Is(list)) => assert_eq!(list.len(), 3),
            other => panic!("unexpected component {:?}", other),
        }
    }

    #[test]
    fn test_split_top_level_commas() {
        assert_eq!(split_top_level_commas(".a, .b"), vec![".a", " .b"]);
        assert_eq!(split_top_level_commas("[t='a,b'],:not(x, y)"), vec!["[t='a,b']", ":not(x, y)"]);
        assert_eq!(split_top_level_commas(".a\\,b"), vec![".a\\,b"]);
    }

    #[test]
    fn test_attribute_operator_outside_quotes() {
        let sel = parse_selector("[title=\"a~=b\"]").unwrap();
        assert_eq!(
            sel.compounds()[0].components,
            vec![SelectorComponent::Attribute(AttributeSelector {
                name: "title".to_string(),
                matcher: Some(AttributeMatcher::Exact("a~=b".to_string())),
                case_insensitive: false,
            })]
        );
    }

    #[test]
    fn test_valid_pseudo_classes_accepted() {
        for text in [
            "button:hover",
            "a:active",
            "input:disabled",
            "p:first-of-type",
            "li:nth-child(2)",
            "li:nth-last-of-type(odd)",
            "div::before",
            "a:visited",
        ] {
            assert!(parse_selector(text).is_ok(), "expected '{}' to be accepted", text);
        }
    }

    #[test]
    fn test_unsupported_state_is_kept_in_model() {
        let sel = parse_selector("button:hover").unwrap();
        assert!(sel.is_evaluable());
        assert_eq!(
            sel.compounds()[0].components[1],
            SelectorComponent::PseudoClass(PseudoClass::Unsupported("hover".to_string()))
        );
    }

    #[test]
    fn test_lowering_failure_is_unevaluable() {
        let sel = parse_selector("li:nth-child(2 of .a)").unwrap();
        assert!(!sel.is_evaluable());
        assert!(sel.specificity >= Specificity(0, 1, 1));
    }

    #[test]
    fn test_nth_arguments() {
        assert_eq!(parse_nth("odd"), Ok(Nth { a: 2, b: 1 }));
        assert_eq!(parse_nth("even"), Ok(Nth { a: 2, b: 0 }));
        assert_eq!(parse_nth("3"), Ok(Nth { a: 0, b: 3 }));
        assert_eq!(parse_nth("-n+3"), Ok(Nth { a: -1, b: 3 }));
        assert_eq!(parse_nth(" 2n + 1 "), Ok(Nth { a: 2, b: 1 }));
        assert_eq!(parse_nth("n"), Ok(Nth { a: 1, b: 0 }));
        assert_eq!(parse_nth("3n-2"), Ok(Nth { a: 3, b: -2 }));
        assert!(parse_nth("2n+1 of .a").is_err());
    }

    #[test]
    fn test_type_lowercased() {
        let sel = parse_selector("ATOM-Workspace").unwrap();
        assert_eq!(
            sel.compounds()[0].components,
            vec![SelectorComponent::Type("atom-workspace".to_string())]
        );
    }
}
