//! Rendering contract between the session and any rendering engine.
//!
//! A renderer turns markdown source into decorated lines plus a
//! [`LineCleaner`] that strips the decoration back off. The session never
//! looks inside a decorated line; all element positions are rune columns in
//! the cleaned form, so the cleaner is the contract that binds rendering
//! decisions to position correlation.

pub mod markers;
pub mod styled;

use std::sync::{Arc, LazyLock};

use anyhow::Result;
use regex::Regex;

pub use styled::StyledRenderer;

static ANSI_SGR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("valid SGR pattern"));

/// Strips non-visible decoration from a rendered line.
///
/// Cloned into every history snapshot, so the custom variant is Arc-backed.
#[derive(Clone, Default)]
pub enum LineCleaner {
    /// Pass the line through unchanged (plain-text renderers, tests).
    #[default]
    Identity,
    /// Strip ANSI SGR escape sequences, then marker runes.
    AnsiAndMarkers,
    /// Host-supplied cleaning function.
    Func(Arc<dyn Fn(&str) -> String + Send + Sync>),
}

impl LineCleaner {
    /// Returns the visual-text form of a decorated line.
    pub fn clean(&self, line: &str) -> String {
        match self {
            Self::Identity => line.to_string(),
            Self::AnsiAndMarkers => {
                let stripped = ANSI_SGR.replace_all(line, "");
                markers::strip_markers(&stripped)
            }
            Self::Func(f) => f(line),
        }
    }
}

impl std::fmt::Debug for LineCleaner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Identity => write!(f, "LineCleaner::Identity"),
            Self::AnsiAndMarkers => write!(f, "LineCleaner::AnsiAndMarkers"),
            Self::Func(_) => write!(f, "LineCleaner::Func(..)"),
        }
    }
}

/// A renderer's output: one string per display row plus the matching cleaner.
#[derive(Debug, Clone, Default)]
pub struct RenderResult {
    /// Decorated lines; none contains an embedded newline.
    pub lines: Vec<String>,
    /// Cleaner that recovers the visible text of any of `lines`.
    pub cleaner: LineCleaner,
}

/// Turns markdown source into decorated lines.
///
/// `width` is the word-wrap column count; 0 disables wrapping. Wrapping must
/// never split a marked span across lines. On error the session guarantees
/// its state is unchanged.
pub trait Renderer {
    fn render(&self, markdown: &str, width: u16) -> Result<RenderResult>;
}

/// Renders the source verbatim, split on newlines, with an identity cleaner.
///
/// Useful as a test double and for hosts that do their own styling.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainRenderer;

impl Renderer for PlainRenderer {
    fn render(&self, markdown: &str, _width: u16) -> Result<RenderResult> {
        Ok(RenderResult {
            lines: markdown.split('\n').map(ToString::to_string).collect(),
            cleaner: LineCleaner::Identity,
        })
    }
}
