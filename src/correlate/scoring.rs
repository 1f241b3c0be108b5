//! Scoring fallback correlator.
//!
//! Used when rendered output carries no markers (plain renderers, test
//! doubles). Every occurrence of the element text is scored on word
//! boundaries, line position, and match length; the best candidate wins.
//! The numeric constants are load-bearing and deliberately unchanged.

use crate::document::{ElementKind, NavElement};
use crate::render::LineCleaner;

use super::ElementPosition;

#[derive(Debug, Clone, Copy)]
struct MatchCandidate {
    line_idx: usize,
    score: i32,
    start_col: usize,
    end_col: usize,
}

/// Correlates elements by scored substring search over cleaned lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringCorrelator;

impl ScoringCorrelator {
    pub fn correlate(
        &self,
        elem: &NavElement,
        lines: &[String],
        cleaner: &LineCleaner,
    ) -> Option<ElementPosition> {
        let elem_text = elem.text.trim();
        if elem_text.is_empty() {
            return None;
        }

        let mut best: Option<MatchCandidate> = None;
        for (line_idx, line) in lines.iter().enumerate() {
            let clean_line = cleaner.clean(line);
            for candidate in find_candidate_matches(elem_text, &clean_line, line_idx, elem) {
                best = Some(match best {
                    None => candidate,
                    Some(current)
                        if candidate.score > current.score
                            || (candidate.score == current.score
                                && candidate.line_idx < current.line_idx) =>
                    {
                        candidate
                    }
                    Some(current) => current,
                });
            }
        }

        best.map(|c| ElementPosition {
            line: c.line_idx,
            start_col: c.start_col,
            end_col: c.end_col,
        })
    }
}

fn find_candidate_matches(
    elem_text: &str,
    clean_line: &str,
    line_idx: usize,
    elem: &NavElement,
) -> Vec<MatchCandidate> {
    let mut candidates = Vec::new();
    let clean_runes: Vec<char> = clean_line.chars().collect();
    let elem_rune_len = elem_text.chars().count();

    let mut search_offset = 0usize;
    while let Some(byte_idx) = clean_line[search_offset..].find(elem_text) {
        let actual_byte_idx = search_offset + byte_idx;
        let rune_idx = clean_line[..actual_byte_idx].chars().count();
        let end_rune_idx = rune_idx + elem_rune_len;

        let score = score_match(&clean_runes, rune_idx, end_rune_idx, elem, clean_line);
        if score > 0 {
            candidates.push(MatchCandidate {
                line_idx,
                score,
                start_col: rune_idx,
                end_col: end_rune_idx,
            });
        }

        search_offset = actual_byte_idx + elem_text.len();
        if search_offset >= clean_line.len() {
            break;
        }
    }

    candidates
}

fn score_match(
    runes: &[char],
    start_col: usize,
    end_col: usize,
    elem: &NavElement,
    clean_line: &str,
) -> i32 {
    let mut score = 0;

    let start_boundary = is_word_boundary(runes, start_col);
    let end_boundary = is_word_boundary(runes, end_col);

    if start_boundary && end_boundary {
        score += 100;
    } else if start_boundary || end_boundary {
        score += 50;
    } else {
        let in_word = start_col > 0
            && start_col < runes.len()
            && runes[start_col - 1].is_alphanumeric();
        if in_word && end_col > 0 && end_col < runes.len() && runes[end_col].is_alphanumeric() {
            // Buried inside a word on both sides: not a real occurrence.
            return 0;
        }
        score += 25;
    }

    if elem.kind == ElementKind::Heading && clean_line.contains("##") {
        score += 50;
        let heading_prefix = "#".repeat(elem.level as usize);
        if clean_line.contains(&heading_prefix) {
            score += 10;
        }
    }

    if start_col == 0 {
        score += 30;
    } else if start_col < 15 {
        score += 10;
    } else if start_col < 30 {
        score += 5;
    }

    let match_len = end_col - start_col;
    if match_len >= 15 {
        score += 50;
    } else if match_len >= 10 {
        score += 30;
    } else if match_len >= 5 {
        score += 10;
    }

    score
}

fn is_word_boundary(runes: &[char], pos: usize) -> bool {
    if pos == 0 || pos >= runes.len() {
        return true;
    }
    let r = runes[pos];
    r.is_whitespace() || matches!(r, '•' | '.' | ',' | ':' | ';' | '!' | '?' | '#')
}
