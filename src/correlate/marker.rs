//! Marker-based correlator.
//!
//! Matches parsed elements to extracted marker positions by document-order
//! counters: the parser walks the source in the same order the renderer
//! emits markers, so the N-th link element pairs with the N-th link marker
//! and the N-th level-L heading with the N-th level-L heading marker. This
//! stays exact even when the same text appears many times.
//!
//! When no markers are present at all (plain renderers, mocked lines in
//! tests), or when the counters run past the extracted list, the scoring
//! correlator takes over.

use std::collections::HashMap;

use crate::document::{ElementKind, NavElement};
use crate::render::LineCleaner;

use super::extractor::{extract_all_markers, MarkerKind, MarkerPosition};
use super::scoring::ScoringCorrelator;
use super::ElementPosition;

/// Correlates elements via invisible markers, with scoring fallback.
#[derive(Debug, Clone, Default)]
pub struct MarkerCorrelator {
    cached_positions: Option<Vec<MarkerPosition>>,
    cached_line_count: usize,
    cached_first_line: String,

    link_counter: usize,
    heading_counters: HashMap<u8, usize>,

    fallback: ScoringCorrelator,
}

impl MarkerCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears cache and counters for a new document.
    pub fn reset(&mut self) {
        self.cached_positions = None;
        self.cached_line_count = 0;
        self.cached_first_line.clear();
        self.link_counter = 0;
        self.heading_counters.clear();
    }

    pub fn correlate(
        &mut self,
        elem: &NavElement,
        lines: &[String],
        cleaner: &LineCleaner,
    ) -> Option<ElementPosition> {
        if !self.is_cache_valid(lines) {
            self.cached_positions = Some(extract_all_markers(lines, cleaner));
            self.cached_line_count = lines.len();
            self.cached_first_line = lines.first().cloned().unwrap_or_default();
        }

        let positions = self.cached_positions.as_ref().expect("cache populated");
        if positions.is_empty() {
            return self.fallback.correlate(elem, lines, cleaner);
        }

        let matched = match elem.kind {
            ElementKind::Link => self.next_link_position(),
            ElementKind::Heading => self.next_heading_position(elem.level),
        };
        match matched {
            Some(pos) => Some(pos),
            // No marker left for this element; fall back for it alone.
            None => self.fallback.correlate(elem, lines, cleaner),
        }
    }

    /// Line count plus first-line content catches document changes cheaply,
    /// including same-length replacements.
    fn is_cache_valid(&self, lines: &[String]) -> bool {
        if self.cached_positions.is_none() || lines.len() != self.cached_line_count {
            return false;
        }
        match lines.first() {
            Some(first) => *first == self.cached_first_line,
            None => self.cached_first_line.is_empty(),
        }
    }

    fn next_link_position(&mut self) -> Option<ElementPosition> {
        let target = self.link_counter;
        let pos = self
            .cached_positions
            .as_ref()?
            .iter()
            .filter(|p| p.kind == MarkerKind::Link)
            .nth(target)
            .copied()?;
        self.link_counter += 1;
        Some(ElementPosition {
            line: pos.line_idx,
            start_col: pos.start_col,
            end_col: pos.end_col,
        })
    }

    fn next_heading_position(&mut self, level: u8) -> Option<ElementPosition> {
        let target = *self.heading_counters.get(&level).unwrap_or(&0);
        let pos = self
            .cached_positions
            .as_ref()?
            .iter()
            .filter(|p| p.kind == MarkerKind::Heading && p.level == level)
            .nth(target)
            .copied()?;
        *self.heading_counters.entry(level).or_insert(0) += 1;
        Some(ElementPosition {
            line: pos.line_idx,
            start_col: pos.start_col,
            end_col: pos.end_col,
        })
    }
}
