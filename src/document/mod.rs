//! Markdown element model and parsing.

mod parser;
mod types;

pub use parser::{generate_slug, parse_elements};
pub use types::{ElementKind, NavElement, PageState};
