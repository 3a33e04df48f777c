//! Deterministic identifiers for documents and sheets.
//!
//! Every placed symbol records the path of the sheet that owns it
//! (`/<document>/<sheet>`). Those two identifiers are derived from names so a
//! regenerated sheet keeps the paths already written into other documents.
//! Everything else (instances, pins, wires, labels) gets a random identifier.

use uuid::Uuid;

// RFC 4122 URL namespace
const UUID_NAMESPACE_URL: Uuid = Uuid::from_u128(0x6ba7b811_9dad_11d1_80b4_00c04fd430c8);

pub fn document_uuid(project: &str) -> Uuid {
    Uuid::new_v5(&UUID_NAMESPACE_URL, project.as_bytes())
}

pub fn sheet_uuid(project: &str, sheet: &str) -> Uuid {
    Uuid::new_v5(&UUID_NAMESPACE_URL, format!("{project}/{sheet}").as_bytes())
}

/// Stable identifier for an item the root sheet derives from a child sheet,
/// such as a sheet pin.
pub fn derived_uuid(project: &str, sheet: &str, item: &str) -> Uuid {
    Uuid::new_v5(
        &UUID_NAMESPACE_URL,
        format!("{project}/{sheet}#{item}").as_bytes(),
    )
}

pub fn random_uuid() -> Uuid {
    Uuid::new_v4()
}

/// Ownership path written into a symbol's `(instances ...)` block.
pub fn instance_path(document: Uuid, sheet: Uuid) -> String {
    format!("/{document}/{sheet}")
}

/// Split an ownership path back into `(document, sheet)`.
pub fn parse_instance_path(path: &str) -> Option<(Uuid, Uuid)> {
    let mut parts = path.strip_prefix('/')?.split('/');
    let document = Uuid::parse_str(parts.next()?).ok()?;
    let sheet = Uuid::parse_str(parts.next()?).ok()?;
    parts.next().is_none().then_some((document, sheet))
}
