//! Core navigation types.

use crate::render::LineCleaner;

/// Distinguishes the navigable element kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Heading,
    Link,
}

/// A navigable item (heading or link).
///
/// Positions are rendered-output coordinates: `start_line`/`end_line` are
/// 0-indexed line numbers, `start_col`/`end_col` are 0-indexed rune columns
/// in the cleaned (decoration-free) line. `end_col == start_col` means the
/// element has not been correlated (or its span is zero-width); navigation
/// skips such elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavElement {
    pub kind: ElementKind,
    /// Visible text (heading text or link text).
    pub text: String,
    /// Link destination URL; empty for headings.
    pub destination: String,
    /// Heading level 1-6; 0 for links.
    pub level: u8,
    /// URL-safe anchor id for headings (e.g. "my-heading"); empty for links.
    pub slug: String,
    /// Path of the document this element belongs to.
    pub source_path: String,

    pub start_line: usize,
    pub end_line: usize,
    pub start_col: usize,
    pub end_col: usize,
}

impl NavElement {
    pub fn heading(text: &str, level: u8, slug: &str, source_path: &str) -> Self {
        Self {
            kind: ElementKind::Heading,
            text: text.to_string(),
            destination: String::new(),
            level,
            slug: slug.to_string(),
            source_path: source_path.to_string(),
            start_line: 0,
            end_line: 0,
            start_col: 0,
            end_col: 0,
        }
    }

    pub fn link(text: &str, destination: &str, source_path: &str) -> Self {
        Self {
            kind: ElementKind::Link,
            text: text.to_string(),
            destination: destination.to_string(),
            level: 0,
            slug: String::new(),
            source_path: source_path.to_string(),
            start_line: 0,
            end_line: 0,
            start_col: 0,
            end_col: 0,
        }
    }

    /// True when the correlator produced a non-empty span for this element.
    pub const fn is_correlated(&self) -> bool {
        self.end_col > self.start_col
    }

    /// True for links targeting an anchor within the same document.
    pub fn is_internal_link(&self) -> bool {
        self.kind == ElementKind::Link && self.destination.starts_with('#')
    }

    /// The anchor slug of an internal link, without the leading `#`.
    pub fn anchor_target(&self) -> Option<&str> {
        if self.is_internal_link() {
            Some(&self.destination[1..])
        } else {
            None
        }
    }
}

/// Immutable snapshot of a page for navigation history.
///
/// Element and line vectors are owned deep copies, never aliased by live
/// session state.
#[derive(Debug, Clone)]
pub struct PageState {
    pub markdown: String,
    pub source_path: String,
    pub selected: Option<usize>,
    pub scroll_offset: usize,
    pub elements: Vec<NavElement>,
    pub rendered_lines: Vec<String>,
    pub cleaner: LineCleaner,
    /// Render width at capture time.
    pub width: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_link_detection() {
        let internal = NavElement::link("jump", "#section", "doc.md");
        assert!(internal.is_internal_link());
        assert_eq!(internal.anchor_target(), Some("section"));

        let external = NavElement::link("out", "https://example.com", "doc.md");
        assert!(!external.is_internal_link());
        assert_eq!(external.anchor_target(), None);

        let heading = NavElement::heading("#weird", 1, "weird", "doc.md");
        assert!(!heading.is_internal_link());
    }

    #[test]
    fn test_is_correlated() {
        let mut elem = NavElement::link("x", "x.md", "");
        assert!(!elem.is_correlated());
        elem.end_col = 1;
        assert!(elem.is_correlated());
    }
}
