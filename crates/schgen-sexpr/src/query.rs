//! Property-style queries.
//!
//! Schematic documents are built from small lists that behave like key/value
//! properties: `(uuid "...")`, `(at 10 20 90)`, `(in_bom yes)`. These helpers
//! look such lists up among the direct children of a node.

use crate::Sexpr;

/// Find a direct child list `(tag ...)` within `items`.
pub fn child_list<'a>(items: &'a [Sexpr], tag: &str) -> Option<&'a [Sexpr]> {
    items.iter().find_map(|item| {
        let list = item.as_list()?;
        (list.first().and_then(Sexpr::as_sym) == Some(tag)).then_some(list)
    })
}

/// Find all direct child lists `(tag ...)` within `items`.
pub fn child_lists<'a>(items: &'a [Sexpr], tag: &str) -> Vec<&'a [Sexpr]> {
    items
        .iter()
        .filter_map(Sexpr::as_list)
        .filter(|list| list.first().and_then(Sexpr::as_sym) == Some(tag))
        .collect()
}

/// Coerce a number atom into f64.
///
/// Whole numbers are written without a fractional part, so they come back as ints.
pub fn number_as_f64(node: &Sexpr) -> Option<f64> {
    node.as_float().or_else(|| node.as_int().map(|v| v as f64))
}

/// `(tag "VALUE")`
pub fn string_prop(items: &[Sexpr], tag: &str) -> Option<String> {
    child_list(items, tag)?.get(1)?.as_str().map(str::to_string)
}

/// `(tag VALUE)` where VALUE is an unquoted symbol.
pub fn sym_prop(items: &[Sexpr], tag: &str) -> Option<String> {
    child_list(items, tag)?.get(1)?.as_sym().map(str::to_string)
}

/// `(tag 12)` or `(tag 12.5)`
pub fn number_prop(items: &[Sexpr], tag: &str) -> Option<f64> {
    number_as_f64(child_list(items, tag)?.get(1)?)
}

/// All numeric values of `(tag n1 n2 ...)`. Returns `None` if any value is not a number.
pub fn numbers_prop(items: &[Sexpr], tag: &str) -> Option<Vec<f64>> {
    child_list(items, tag)?
        .iter()
        .skip(1)
        .map(number_as_f64)
        .collect()
}

/// Placement `(at x y [rot])` among `items`.
pub fn at_prop(items: &[Sexpr]) -> Option<(f64, f64, Option<f64>)> {
    let values = numbers_prop(items, "at")?;
    match values.as_slice() {
        [x, y] => Some((*x, *y, None)),
        [x, y, rot] => Some((*x, *y, Some(*rot))),
        _ => None,
    }
}

/// `(property "NAME" "VALUE" ...)` with the given name.
pub fn property_value<'a>(items: &'a [Sexpr], name: &str) -> Option<&'a str> {
    child_lists(items, "property").into_iter().find_map(|prop| {
        (prop.get(1)?.as_str()? == name)
            .then(|| prop.get(2).and_then(Sexpr::as_str))
            .flatten()
    })
}
