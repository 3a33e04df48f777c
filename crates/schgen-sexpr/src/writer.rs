//! Deterministic text output for S-expression trees.
//!
//! The layout follows the look of KiCad's own files (tab indentation, one child
//! list per line, short coordinate/style lists kept on a single line) but is
//! computed from the tree rather than from a character stream. The same tree
//! always produces the same bytes, which is what lets a document be read back
//! and re-written without churn.

use crate::{Sexpr, SexprKind};

/// Lists with these tags stay on one line when all their children do and the
/// rendered text is short enough.
const INLINE_TAGS: &[&str] = &[
    "at", "xy", "pts", "font", "size", "stroke", "fill", "justify", "effects", "offset",
    "pin_names", "pin_numbers", "name", "number", "color",
];

const INLINE_WIDTH_LIMIT: usize = 100;

/// Render a tree as a document. The result ends with a newline.
pub fn write_document(node: &Sexpr) -> String {
    let mut out = String::new();
    write_node(node, 0, &mut out);
    out.push('\n');
    out
}

/// Render a tree on a single line.
pub fn write_compact(node: &Sexpr) -> String {
    let mut out = String::new();
    compact(node, &mut out);
    out
}

fn write_node(node: &Sexpr, depth: usize, out: &mut String) {
    let Some(items) = node.as_list() else {
        write_atom(node, out);
        return;
    };

    if stays_inline(node) {
        compact(node, out);
        return;
    }

    out.push('(');
    let mut broken = false;
    for (idx, item) in items.iter().enumerate() {
        if !broken && !item.is_list() {
            if idx > 0 {
                out.push(' ');
            }
            write_atom(item, out);
            continue;
        }
        broken = true;
        out.push('\n');
        indent(depth + 1, out);
        write_node(item, depth + 1, out);
    }
    out.push('\n');
    indent(depth, out);
    out.push(')');
}

fn stays_inline(node: &Sexpr) -> bool {
    let Some(items) = node.as_list() else {
        return true;
    };
    if !items.iter().any(Sexpr::is_list) {
        return true;
    }
    let tagged_inline = node.tag().is_some_and(|tag| INLINE_TAGS.contains(&tag));
    tagged_inline
        && items.iter().all(stays_inline)
        && write_compact(node).len() <= INLINE_WIDTH_LIMIT
}

fn compact(node: &Sexpr, out: &mut String) {
    match &node.kind {
        SexprKind::List(items) => {
            out.push('(');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(' ');
                }
                compact(item, out);
            }
            out.push(')');
        }
        _ => write_atom(node, out),
    }
}

fn write_atom(node: &Sexpr, out: &mut String) {
    match &node.kind {
        SexprKind::Symbol(s) => out.push_str(s),
        SexprKind::String(s) => out.push_str(&quote_string(s)),
        SexprKind::Int(n) => out.push_str(&n.to_string()),
        SexprKind::F64(f) => out.push_str(&format_float(*f)),
        SexprKind::List(_) => compact(node, out),
    }
}

/// Shortest decimal text for a float; `-0` prints as `0`.
pub fn format_float(f: f64) -> String {
    if f == 0.0 {
        return "0".to_string();
    }
    format!("{f}")
}

/// Quote a string value, escaping quotes, backslashes and control characters.
pub fn quote_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for ch in value.chars() {
        match ch {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            _ => quoted.push(ch),
        }
    }
    quoted.push('"');
    quoted
}

fn indent(depth: usize, out: &mut String) {
    out.extend(std::iter::repeat_n('\t', depth));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{kv, parse};

    #[test]
    fn breaks_structural_lists_and_keeps_short_ones_inline() {
        let tree = parse(
            r#"(kicad_sch (version 20231120)
                 (wire (pts (xy 1 2) (xy 3.5 4)) (stroke (width 0) (type default)) (uuid "u1")))"#,
        )
        .unwrap();
        let expected = "(kicad_sch\n\t(version 20231120)\n\t(wire\n\t\t(pts (xy 1 2) (xy 3.5 4))\n\t\t(stroke (width 0) (type default))\n\t\t(uuid \"u1\")\n\t)\n)\n";
        assert_eq!(write_document(&tree), expected);
    }

    #[test]
    fn head_atoms_share_the_opening_line() {
        let tree = parse(r#"(label "CLK" (at 10 20 0) (uuid "x"))"#).unwrap();
        assert_eq!(
            write_document(&tree),
            "(label \"CLK\"\n\t(at 10 20 0)\n\t(uuid \"x\")\n)\n"
        );
    }

    #[test]
    fn long_inline_candidates_are_broken() {
        let xy: Vec<Sexpr> = (0..12)
            .map(|i| {
                Sexpr::list(vec![Sexpr::symbol("xy"), Sexpr::int(i * 100), Sexpr::int(i * 100)])
            })
            .collect();
        let mut items = vec![Sexpr::symbol("pts")];
        items.extend(xy);
        let out = write_document(&Sexpr::list(items));
        assert!(out.starts_with("(pts\n\t(xy 0 0)\n"));
    }

    #[test]
    fn floats_print_shortest_form() {
        insta::assert_snapshot!(write_compact(&kv("at", 50.8)), @"(at 50.8)");
        assert_eq!(format_float(50.0), "50");
        assert_eq!(format_float(-0.0), "0");
        assert_eq!(format_float(-2.54), "-2.54");
    }

    #[test]
    fn output_is_stable_through_reparse() {
        let source = r#"(kicad_sch (lib_symbols (symbol "Device:R" (pin passive line (at 0 3.81 270) (length 1.27) (name "~" (effects (font (size 1.27 1.27)))) (number "1" (effects (font (size 1.27 1.27))))))) (sheet_instances (path "/" (page "1"))))"#;
        let first = write_document(&parse(source).unwrap());
        let second = write_document(&parse(&first).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn strings_are_escaped() {
        assert_eq!(quote_string("a\"b\\c\nd"), r#""a\"b\\c\nd""#);
        let tree = Sexpr::list(vec![Sexpr::symbol("title"), Sexpr::string("say \"hi\"")]);
        assert_eq!(parse(&write_document(&tree)).unwrap(), tree);
    }
}
