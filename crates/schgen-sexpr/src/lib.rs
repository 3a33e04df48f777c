//! S-expression tree used for schematic documents.
//!
//! Nodes keep the byte span they were parsed from so that readers can point at
//! the offending text when a document does not have the expected shape.
//! Constructed nodes carry a synthetic span.
//!
//! - [`parse`] / [`parse_all`] - text to tree
//! - [`writer::write_document`] - tree to deterministic, tab-indented text
//! - [`query`] - small helpers for `(tag value ...)` property lists

pub mod query;
pub mod writer;

use std::fmt;

pub use query::{child_list, child_lists, number_as_f64};

/// Byte span in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Span used for nodes that were built in memory rather than parsed.
    pub fn synthetic() -> Self {
        Self::default()
    }
}

/// The value held by a node.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SexprKind {
    /// Unquoted identifier, e.g. `wire` or `yes`
    Symbol(String),
    /// Quoted text
    String(String),
    Int(i64),
    F64(f64),
    List(Vec<Sexpr>),
}

/// An S-expression node together with its source span.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sexpr {
    pub kind: SexprKind,
    pub span: Span,
}

impl PartialEq for SexprKind {
    fn eq(&self, other: &Self) -> bool {
        use SexprKind::*;
        match (self, other) {
            (Symbol(a), Symbol(b)) | (String(a), String(b)) => a == b,
            (List(a), List(b)) => a == b,
            // Whole numbers are written without a fractional part and come
            // back as ints, so numbers compare by value.
            (Int(a), Int(b)) => a == b,
            (F64(a), F64(b)) => a == b,
            (Int(a), F64(b)) | (F64(b), Int(a)) => *a as f64 == *b,
            _ => false,
        }
    }
}

impl PartialEq for Sexpr {
    fn eq(&self, other: &Self) -> bool {
        // Spans are bookkeeping only.
        self.kind == other.kind
    }
}

impl Sexpr {
    pub fn with_span(kind: SexprKind, span: Span) -> Self {
        Self { kind, span }
    }

    fn synthetic(kind: SexprKind) -> Self {
        Self {
            kind,
            span: Span::synthetic(),
        }
    }

    pub fn symbol(s: impl Into<String>) -> Self {
        Self::synthetic(SexprKind::Symbol(s.into()))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::synthetic(SexprKind::String(s.into()))
    }

    pub fn int(n: i64) -> Self {
        Self::synthetic(SexprKind::Int(n))
    }

    pub fn float(f: f64) -> Self {
        Self::synthetic(SexprKind::F64(f))
    }

    pub fn list(items: Vec<Sexpr>) -> Self {
        Self::synthetic(SexprKind::List(items))
    }

    pub fn is_list(&self) -> bool {
        matches!(self.kind, SexprKind::List(_))
    }

    pub fn as_sym(&self) -> Option<&str> {
        match &self.kind {
            SexprKind::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            SexprKind::String(s) => Some(s),
            _ => None,
        }
    }

    /// Text of a symbol or string atom.
    pub fn as_text(&self) -> Option<&str> {
        match &self.kind {
            SexprKind::Symbol(s) | SexprKind::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match &self.kind {
            SexprKind::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match &self.kind {
            SexprKind::F64(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Sexpr]> {
        match &self.kind {
            SexprKind::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Sexpr>> {
        match &mut self.kind {
            SexprKind::List(items) => Some(items),
            _ => None,
        }
    }

    /// Leading symbol of a list node, e.g. `wire` for `(wire (pts ...))`.
    pub fn tag(&self) -> Option<&str> {
        self.as_list()?.first()?.as_sym()
    }

    pub fn find_list(&self, name: &str) -> Option<&[Sexpr]> {
        child_list(self.as_list()?, name)
    }
}

/// Create a `(key value)` pair list.
pub fn kv<K: Into<String>, V: Into<Sexpr>>(k: K, v: V) -> Sexpr {
    Sexpr::list(vec![Sexpr::symbol(k), v.into()])
}

/// Builder for lists that are assembled field by field.
#[derive(Debug, Default)]
pub struct ListBuilder {
    items: Vec<Sexpr>,
}

impl ListBuilder {
    /// Start a list whose first element is the symbol `name`.
    pub fn node(name: &str) -> Self {
        Self {
            items: vec![Sexpr::symbol(name)],
        }
    }

    pub fn push<V: Into<Sexpr>>(&mut self, v: V) -> &mut Self {
        self.items.push(v.into());
        self
    }

    pub fn push_if<V: Into<Sexpr>>(&mut self, cond: bool, v: V) -> &mut Self {
        if cond {
            self.items.push(v.into());
        }
        self
    }

    pub fn extend<I, V>(&mut self, iter: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Sexpr>,
    {
        self.items.extend(iter.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Sexpr {
        Sexpr::list(self.items)
    }
}

impl From<&str> for Sexpr {
    fn from(s: &str) -> Self {
        Self::symbol(s)
    }
}

impl From<i64> for Sexpr {
    fn from(n: i64) -> Self {
        Sexpr::int(n)
    }
}

impl From<u32> for Sexpr {
    fn from(n: u32) -> Self {
        Sexpr::int(n as i64)
    }
}

impl From<f64> for Sexpr {
    fn from(n: f64) -> Self {
        Sexpr::float(n)
    }
}

impl From<bool> for Sexpr {
    fn from(b: bool) -> Self {
        Self::symbol(if b { "yes" } else { "no" })
    }
}

/// Errors produced while reading S-expression text. Offsets are byte offsets.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    UnexpectedEof,
    UnexpectedChar { found: char, offset: usize },
    UnclosedList { opened_at: usize },
    UnterminatedString { opened_at: usize },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnexpectedEof => write!(f, "unexpected end of input"),
            ParseError::UnexpectedChar { found, offset } => {
                write!(f, "unexpected '{found}' at byte {offset}")
            }
            ParseError::UnclosedList { opened_at } => {
                write!(f, "list opened at byte {opened_at} is never closed")
            }
            ParseError::UnterminatedString { opened_at } => {
                write!(f, "string opened at byte {opened_at} is never terminated")
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Recursive-descent reader over the input bytes.
///
/// Delimiters and quotes are ASCII, so scanning bytes is safe for UTF-8 input:
/// multi-byte sequences never contain those values.
struct Reader<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn at_end(&mut self) -> bool {
        self.skip_trivia();
        self.pos >= self.input.len()
    }

    fn skip_trivia(&mut self) {
        while let Some(b) = self.peek() {
            match b {
                b' ' | b'\t' | b'\n' | b'\r' => self.pos += 1,
                b';' => {
                    // Comment runs to end of line.
                    while let Some(b) = self.peek() {
                        self.pos += 1;
                        if b == b'\n' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn node(&mut self) -> Result<Sexpr, ParseError> {
        self.skip_trivia();
        match self.peek() {
            None => Err(ParseError::UnexpectedEof),
            Some(b'(') => self.list(),
            Some(b'"') => self.string(),
            Some(b')') => Err(ParseError::UnexpectedChar {
                found: ')',
                offset: self.pos,
            }),
            Some(_) => Ok(self.atom()),
        }
    }

    fn list(&mut self) -> Result<Sexpr, ParseError> {
        let start = self.pos;
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            match self.peek() {
                None => return Err(ParseError::UnclosedList { opened_at: start }),
                Some(b')') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => items.push(self.node()?),
            }
        }
        if items.len() >= 1000 {
            log::trace!("Parsed list of {} items at byte {start}", items.len());
        }
        Ok(Sexpr::with_span(
            SexprKind::List(items),
            Span::new(start, self.pos),
        ))
    }

    fn string(&mut self) -> Result<Sexpr, ParseError> {
        let start = self.pos;
        self.pos += 1;
        let mut value = String::new();
        let mut chars = self.input[self.pos..].char_indices();
        loop {
            let Some((offset, ch)) = chars.next() else {
                return Err(ParseError::UnterminatedString { opened_at: start });
            };
            match ch {
                '"' => {
                    self.pos += offset + 1;
                    break;
                }
                '\\' => {
                    let Some((_, escaped)) = chars.next() else {
                        return Err(ParseError::UnterminatedString { opened_at: start });
                    };
                    value.push(match escaped {
                        'n' => '\n',
                        'r' => '\r',
                        't' => '\t',
                        other => other,
                    });
                }
                other => value.push(other),
            }
        }
        Ok(Sexpr::with_span(
            SexprKind::String(value),
            Span::new(start, self.pos),
        ))
    }

    fn atom(&mut self) -> Sexpr {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'(' | b')' | b'"') {
                break;
            }
            self.pos += 1;
        }
        let text = &self.input[start..self.pos];
        let span = Span::new(start, self.pos);
        let kind = if let Ok(n) = text.parse::<i64>() {
            SexprKind::Int(n)
        } else if let Some(f) = parse_float(text) {
            SexprKind::F64(f)
        } else {
            SexprKind::Symbol(text.to_string())
        };
        Sexpr::with_span(kind, span)
    }
}

/// Only plain decimal numbers count as floats; `inf`, `NaN` and friends stay symbols.
fn parse_float(text: &str) -> Option<f64> {
    let looks_numeric = text
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'))
        && text.bytes().any(|b| b.is_ascii_digit());
    if !looks_numeric {
        return None;
    }
    text.parse::<f64>().ok()
}

/// Parse a single S-expression. Trailing content after the first node is an error.
pub fn parse(input: &str) -> Result<Sexpr, ParseError> {
    log::trace!("Parsing S-expression from {} bytes of input", input.len());
    let mut reader = Reader::new(input);
    let node = reader.node()?;
    if !reader.at_end() {
        let offset = reader.pos;
        let found = input[offset..].chars().next().unwrap_or(' ');
        return Err(ParseError::UnexpectedChar { found, offset });
    }
    Ok(node)
}

/// Parse a sequence of top-level S-expressions.
pub fn parse_all(input: &str) -> Result<Vec<Sexpr>, ParseError> {
    let mut reader = Reader::new(input);
    let mut nodes = Vec::new();
    while !reader.at_end() {
        nodes.push(reader.node()?);
    }
    log::trace!("Parsed {} top-level S-expressions", nodes.len());
    Ok(nodes)
}

impl fmt::Display for Sexpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = writer::write_document(self);
        f.write_str(text.trim_end_matches('\n'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_atoms() {
        assert_eq!(parse("wire").unwrap().kind, SexprKind::Symbol("wire".into()));
        assert_eq!(parse("42").unwrap().kind, SexprKind::Int(42));
        assert_eq!(parse("-2.54").unwrap().kind, SexprKind::F64(-2.54));
        assert_eq!(
            parse("Device:R").unwrap().kind,
            SexprKind::Symbol("Device:R".into())
        );
        assert_eq!(parse("inf").unwrap().kind, SexprKind::Symbol("inf".into()));
    }

    #[test]
    fn parses_strings_with_escapes() {
        assert_eq!(
            parse(r#""a \"b\" c""#).unwrap().kind,
            SexprKind::String("a \"b\" c".into())
        );
        assert_eq!(
            parse(r#""line\nbreak""#).unwrap().kind,
            SexprKind::String("line\nbreak".into())
        );
        assert_eq!(
            parse(r#""résistance Ω""#).unwrap().kind,
            SexprKind::String("résistance Ω".into())
        );
    }

    #[test]
    fn parses_nested_lists_and_comments() {
        let parsed = parse(
            r#"
            ; leading comment
            (wire (pts (xy 1 2) (xy 3 4)) ; trailing
              (uuid "abc"))
            "#,
        )
        .unwrap();
        assert_eq!(parsed.tag(), Some("wire"));
        let pts = parsed.find_list("pts").unwrap();
        assert_eq!(pts.len(), 3);
        assert_eq!(
            parsed.find_list("uuid").unwrap()[1].as_str(),
            Some("abc")
        );
    }

    #[test]
    fn tracks_spans() {
        let input = r#"(label "CLK" (at 1 2 0))"#;
        let parsed = parse(input).unwrap();
        assert_eq!(parsed.span, Span::new(0, input.len()));
        let items = parsed.as_list().unwrap();
        assert_eq!(&input[items[1].span.start..items[1].span.end], "\"CLK\"");
    }

    #[test]
    fn reports_structural_errors() {
        assert_eq!(
            parse("(a (b c)"),
            Err(ParseError::UnclosedList { opened_at: 0 })
        );
        assert_eq!(
            parse("(a \"b)"),
            Err(ParseError::UnterminatedString { opened_at: 3 })
        );
        assert_eq!(
            parse("(a) )"),
            Err(ParseError::UnexpectedChar {
                found: ')',
                offset: 4
            })
        );
        assert_eq!(parse("   "), Err(ParseError::UnexpectedEof));
    }

    #[test]
    fn parse_all_reads_fragments() {
        let nodes = parse_all("(wire) (label \"A\")\n(global_label \"B\")").unwrap();
        let tags: Vec<_> = nodes.iter().filter_map(Sexpr::tag).collect();
        assert_eq!(tags, vec!["wire", "label", "global_label"]);
        assert!(parse_all("").unwrap().is_empty());
    }

    #[test]
    fn numbers_compare_by_value() {
        assert_eq!(Sexpr::float(0.0), parse("0").unwrap());
        assert_eq!(Sexpr::float(90.0), Sexpr::int(90));
        assert_ne!(Sexpr::float(1.5), Sexpr::int(1));
        assert_ne!(Sexpr::symbol("a"), Sexpr::string("a"));
    }

    #[test]
    fn list_builder_skips_conditional_items() {
        let mut b = ListBuilder::node("symbol");
        b.push(kv("unit", 1i64))
            .push_if(false, kv("mirror", "x"))
            .extend([kv("in_bom", true)]);
        let built = b.build();
        assert_eq!(built, parse("(symbol (unit 1) (in_bom yes))").unwrap());
    }
}
