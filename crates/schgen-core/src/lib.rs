//! Document model and consistency engine for hierarchical schematics.
//!
//! A [`Design`] is an ordered set of [`Sheet`]s belonging to one project. Sheets
//! are assembled with a [`SheetBuilder`] from symbol definitions held in a
//! [`SymbolCatalog`], annotated across the whole design by [`annotate`], and
//! checked for cross-sheet consistency by [`verify`]. [`document`] turns sheets
//! into `.kicad_sch` text and back; [`merge`] applies hand-made fragments to an
//! existing document.
//!
//! Sheet and document identifiers are deterministic functions of the project
//! and sheet names (see [`identity`]), so regenerating a sheet keeps every
//! per-instance ownership path valid.

pub mod annotate;
pub mod builder;
pub mod catalog;
pub mod config;
pub mod convert;
pub mod designator;
pub mod document;
pub mod geometry;
pub mod identity;
pub mod library;
pub mod merge;
pub mod placement;
pub mod sheet;
pub mod symbol;
pub mod verify;

pub use annotate::{Annotation, AnnotationState, ReferenceAssignment};
pub use builder::SheetBuilder;
pub use catalog::{PartEntry, PartsCatalog, SymbolCatalog};
pub use config::DesignConfig;
pub use convert::{ConversionResult, ConversionStatus, ConversionSummary, PartConverter};
pub use designator::Designator;
pub use document::ParsedSheet;
pub use geometry::{MirrorAxis, Point, Rotation};
pub use merge::MergeOutcome;
pub use placement::{PlacementEntry, PlacementOutcome, PlacementPlan};
pub use sheet::{
    ComponentInstance, Design, Label, LabelKind, LabelShape, PowerSymbolInstance, Sheet, Wire,
};
pub use symbol::{PinDefinition, PinType, SymbolDefinition};
pub use verify::{Finding, FindingKind, LabelIndex, Report};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown symbol '{0}'")]
    UnknownSymbol(String),

    #[error("unknown part '{0}' (not present in the parts catalog)")]
    UnknownPart(String),

    #[error("rotation {0} is not one of 0, 90, 180 or 270 degrees")]
    NonCardinalRotation(f64),

    #[error("no instance with designator '{designator}' on sheet '{sheet}'")]
    UnknownDesignator { sheet: String, designator: String },

    #[error(
        "designator '{designator}' is shared by several instances on sheet '{sheet}'; \
         give each one a distinct designator"
    )]
    AmbiguousDesignator { sheet: String, designator: String },

    #[error("symbol '{symbol}' has no pin '{pin}'")]
    UnknownPin { symbol: String, pin: String },

    #[error("symbol '{0}' is not a power symbol")]
    NotPowerSymbol(String),

    #[error("symbol '{0}' is a power symbol; place it with place_power")]
    PowerSymbolInBuilder(String),

    #[error("malformed document: {0}")]
    MalformedDocument(String),

    #[error("S-expression parse error: {0}")]
    Parse(#[from] schgen_sexpr::ParseError),

    #[error("fragment element {kind} reuses identifier {uuid} already present in the document")]
    DuplicateIdentity { kind: &'static str, uuid: String },

    #[error("fragment item '{0}' cannot be merged (only wires and labels are supported)")]
    UnsupportedFragmentItem(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
