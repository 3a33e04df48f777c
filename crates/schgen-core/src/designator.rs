//! Reference designator parsing (`R12`, `U?`, `#PWR03`).

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Designator {
    /// Prefix plus a positive number, e.g. `R12`.
    Resolved { prefix: String, number: u32 },
    /// Prefix only (`R`, `R?`); still waiting for a number.
    Unresolved { prefix: String },
    /// `#`-prefixed power and flag symbols; never annotated.
    Reserved(String),
}

impl Designator {
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.starts_with('#') {
            return Designator::Reserved(s.to_string());
        }
        let s = s.trim_end_matches('?');
        let split = s
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_ascii_digit())
            .last()
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        let (prefix, digits) = s.split_at(split);
        match digits.parse::<u32>() {
            Ok(number) if number > 0 && !prefix.is_empty() => Designator::Resolved {
                prefix: prefix.to_string(),
                number,
            },
            // `R0` or a bare number: treat the whole thing as a prefix awaiting a number.
            _ if prefix.is_empty() => Designator::Unresolved {
                prefix: s.to_string(),
            },
            _ => Designator::Unresolved {
                prefix: prefix.to_string(),
            },
        }
    }

    pub fn prefix(&self) -> &str {
        match self {
            Designator::Resolved { prefix, .. } | Designator::Unresolved { prefix } => prefix,
            Designator::Reserved(text) => text,
        }
    }

    pub fn number(&self) -> Option<u32> {
        match self {
            Designator::Resolved { number, .. } => Some(*number),
            _ => None,
        }
    }

    pub fn is_reserved(&self) -> bool {
        matches!(self, Designator::Reserved(_))
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Designator::Resolved { .. })
    }
}

impl fmt::Display for Designator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Designator::Resolved { prefix, number } => write!(f, "{prefix}{number}"),
            Designator::Unresolved { prefix } => write!(f, "{prefix}?"),
            Designator::Reserved(text) => f.write_str(text),
        }
    }
}

/// Designator for the n-th reserved symbol of `prefix` on a sheet (1-based), e.g. `#PWR03`.
pub fn reserved_designator(prefix: &str, n: u32) -> String {
    format!("{prefix}{n:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_class() {
        assert_eq!(
            Designator::parse("R12"),
            Designator::Resolved {
                prefix: "R".into(),
                number: 12
            }
        );
        assert_eq!(
            Designator::parse("LED3").prefix(),
            "LED"
        );
        assert_eq!(
            Designator::parse("U?"),
            Designator::Unresolved { prefix: "U".into() }
        );
        assert_eq!(
            Designator::parse("J"),
            Designator::Unresolved { prefix: "J".into() }
        );
        assert_eq!(
            Designator::parse("C0"),
            Designator::Unresolved { prefix: "C".into() }
        );
        assert!(Designator::parse("#PWR01").is_reserved());
        assert!(Designator::parse("#FLG1").is_reserved());
    }

    #[test]
    fn displays_placeholders_with_question_mark() {
        assert_eq!(Designator::parse("R").to_string(), "R?");
        assert_eq!(Designator::parse("R7").to_string(), "R7");
        assert_eq!(reserved_designator("#PWR", 3), "#PWR03");
    }
}
