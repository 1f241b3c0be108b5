#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::uninlined_format_args
)]

//! # Waymark
//!
//! A navigable markdown session for terminal UIs.
//!
//! Waymark loads markdown, renders it into a decorated line buffer, and
//! keeps every heading and link correlated to its exact visual position so
//! a host UI can:
//! - scroll the viewport and jump to in-document anchors,
//! - traverse links with Tab-like semantics and activate them,
//! - walk browser-style back/forward history across documents.
//!
//! Position correlation uses invisible zero-width markers injected during
//! rendering; a scoring fallback handles marker-free renderers. Columns are
//! always rune indices in the cleaned (decoration-free) line.
//!
//! ## Modules
//!
//! - [`session`]: The state machine a host drives
//! - [`document`]: Element extraction and slugs
//! - [`render`]: Renderer contract, line cleaning, the styled ANSI renderer
//! - [`correlate`]: Marker extraction and position correlation
//! - [`fetch`]: Link activation, path resolution, content providers
//! - [`ui`]: The reference ratatui host
//! - [`config`]: Flag-file and CLI configuration

pub mod config;
pub mod correlate;
pub mod document;
pub mod fetch;
pub mod render;
pub mod session;
pub mod ui;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::correlate::{Correlator, ElementPosition, MarkerCorrelator, ScoringCorrelator};
    pub use crate::document::{ElementKind, NavElement, PageState};
    pub use crate::fetch::{ContentFetcher, ContentProvider, FileHttpProvider};
    pub use crate::render::{LineCleaner, RenderResult, Renderer, StyledRenderer};
    pub use crate::session::Session;
}
