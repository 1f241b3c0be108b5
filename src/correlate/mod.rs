//! Position correlation strategies.
//!
//! A correlator maps a parsed element to its `(line, start_col, end_col)`
//! position in rendered output, where columns are rune indices in the
//! cleaned line. The marker correlator is the exact primary path; the
//! scoring correlator is the fallback for marker-free output; the substring
//! correlator is the cheapest strategy for plain text.

pub mod extractor;
pub mod marker;
pub mod scoring;

use crate::document::NavElement;
use crate::render::LineCleaner;

pub use marker::MarkerCorrelator;
pub use scoring::ScoringCorrelator;

/// Position of an element in rendered output, in cleaned-line coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementPosition {
    pub line: usize,
    pub start_col: usize,
    pub end_col: usize,
}

/// Maps parsed elements to positions in rendered lines.
///
/// Implementations may keep per-document state (the marker correlator keeps
/// occurrence counters); [`Correlator::reset`] is called at the start of
/// every document load.
pub trait Correlator {
    fn correlate(
        &mut self,
        elem: &NavElement,
        lines: &[String],
        cleaner: &LineCleaner,
    ) -> Option<ElementPosition>;

    fn reset(&mut self) {}
}

impl Correlator for MarkerCorrelator {
    fn correlate(
        &mut self,
        elem: &NavElement,
        lines: &[String],
        cleaner: &LineCleaner,
    ) -> Option<ElementPosition> {
        Self::correlate(self, elem, lines, cleaner)
    }

    fn reset(&mut self) {
        Self::reset(self);
    }
}

impl Correlator for ScoringCorrelator {
    fn correlate(
        &mut self,
        elem: &NavElement,
        lines: &[String],
        cleaner: &LineCleaner,
    ) -> Option<ElementPosition> {
        Self::correlate(self, elem, lines, cleaner)
    }
}

/// Correlates by first plain substring occurrence, nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringCorrelator;

impl Correlator for SubstringCorrelator {
    fn correlate(
        &mut self,
        elem: &NavElement,
        lines: &[String],
        cleaner: &LineCleaner,
    ) -> Option<ElementPosition> {
        let elem_text = elem.text.trim();
        if elem_text.is_empty() {
            return None;
        }
        let elem_rune_len = elem_text.chars().count();

        for (line_idx, line) in lines.iter().enumerate() {
            let clean_line = cleaner.clean(line);
            if let Some(byte_idx) = clean_line.find(elem_text) {
                let rune_idx = clean_line[..byte_idx].chars().count();
                return Some(ElementPosition {
                    line: line_idx,
                    start_col: rune_idx,
                    end_col: rune_idx + elem_rune_len,
                });
            }
        }
        None
    }
}
