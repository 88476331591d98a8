//! # Header Codec
//!
//! The two headers of a container: the [`plain`] prefix every reader can see,
//! and the [`manifest`] that is only readable with the right key.

pub mod manifest;
pub mod plain;

pub use manifest::{build_manifest, format_last_date_time, parse_manifest, Manifest};
pub use plain::{classify_token, probe, ArchiveLocation, PlainHeader, PlainPrefix, TokenKind};
