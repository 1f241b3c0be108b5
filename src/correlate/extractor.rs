//! Marker extraction from rendered output.
//!
//! Scans decorated lines for the marker pairs injected during rendering and
//! reports each marked span as cleaned-line rune columns.

use crate::render::markers::{is_marker_char, ZWJ, ZWNJ, ZWS, WJ};
use crate::render::LineCleaner;

/// The kind of element a marker pair denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Link,
    Heading,
}

/// Position of one marked span in rendered output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerPosition {
    pub kind: MarkerKind,
    /// Heading level 1-6; 0 for links.
    pub level: u8,
    pub line_idx: usize,
    /// Rune column in the cleaned line, markers and ANSI excluded.
    pub start_col: usize,
    pub end_col: usize,
}

/// Finds all marker pairs in rendered output.
///
/// Positions come back in document order: top to bottom, left to right.
/// Unbalanced markers are skipped and never produce a span.
pub fn extract_all_markers(lines: &[String], cleaner: &LineCleaner) -> Vec<MarkerPosition> {
    let mut positions = Vec::new();
    for (line_idx, line) in lines.iter().enumerate() {
        extract_markers_from_line(line, line_idx, cleaner, &mut positions);
    }
    positions
}

fn extract_markers_from_line(
    line: &str,
    line_idx: usize,
    cleaner: &LineCleaner,
    positions: &mut Vec<MarkerPosition>,
) {
    let runes: Vec<char> = line.chars().collect();
    let mut i = 0;
    while i < runes.len() {
        if i + 1 < runes.len() && runes[i] == ZWS && runes[i + 1] == ZWNJ {
            if let Some((pos, next)) = extract_link_marker(&runes, i, line_idx, cleaner) {
                positions.push(pos);
                i = next;
                continue;
            }
        }

        if runes[i] == ZWJ {
            if let Some((pos, next)) = extract_heading_marker(&runes, i, line_idx, cleaner) {
                positions.push(pos);
                i = next;
                continue;
            }
        }

        i += 1;
    }
}

/// Extracts a link span starting at the ZWS ZWNJ opener at `start`.
///
/// Returns the position and the rune index just past the end marker.
fn extract_link_marker(
    runes: &[char],
    start: usize,
    line_idx: usize,
    cleaner: &LineCleaner,
) -> Option<(MarkerPosition, usize)> {
    let content_start = start + 2;
    let end_idx = find_marker_sequence(runes, content_start, &[ZWNJ, ZWS])?;

    let start_col = visual_column(runes, content_start, cleaner);
    let end_col = visual_column(runes, end_idx, cleaner);

    Some((
        MarkerPosition {
            kind: MarkerKind::Link,
            level: 0,
            line_idx,
            start_col,
            end_col,
        },
        end_idx + 2,
    ))
}

/// Extracts a heading span starting at the ZWJ at `start`.
///
/// The opener is ZWJ + (WJ × level) + ZWJ; the run length is the level and
/// must be 1..=6.
fn extract_heading_marker(
    runes: &[char],
    start: usize,
    line_idx: usize,
    cleaner: &LineCleaner,
) -> Option<(MarkerPosition, usize)> {
    let mut i = start + 1;
    let mut level = 0usize;
    while i < runes.len() && runes[i] == WJ {
        level += 1;
        i += 1;
    }
    if !(1..=6).contains(&level) || i >= runes.len() || runes[i] != ZWJ {
        return None;
    }

    let content_start = i + 1;
    let end_idx = find_marker_sequence(runes, content_start, &[ZWJ, ZWNJ])?;

    let start_col = visual_column(runes, content_start, cleaner);
    let end_col = visual_column(runes, end_idx, cleaner);

    Some((
        MarkerPosition {
            kind: MarkerKind::Heading,
            level: level as u8,
            line_idx,
            start_col,
            end_col,
        },
        end_idx + 2,
    ))
}

fn find_marker_sequence(runes: &[char], from: usize, marker: &[char]) -> Option<usize> {
    if runes.len() < marker.len() {
        return None;
    }
    (from..=runes.len() - marker.len()).find(|&i| runes[i..i + marker.len()] == *marker)
}

/// Computes the visual column at a rune index: clean the prefix, then count
/// the runes that are not markers. Deliberately O(i); byte offsets do not
/// survive the cleaner.
fn visual_column(runes: &[char], target_idx: usize, cleaner: &LineCleaner) -> usize {
    let prefix: String = runes[..target_idx.min(runes.len())].iter().collect();
    cleaner
        .clean(&prefix)
        .chars()
        .filter(|&c| !is_marker_char(c))
        .count()
}
