pub mod annotate;
pub mod convert;
pub mod generate;
pub mod merge;
pub mod place;
pub mod verify;
