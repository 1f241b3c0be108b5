//! The navigable markdown session.
//!
//! A [`Session`] is a UI-agnostic state machine: it owns the markdown
//! source, the rendered line buffer, the navigable element table with
//! correlated positions, the selection, the scroll offset, and browser-style
//! back/forward history. A host UI calls navigation methods in response to
//! input and redraws from [`Session::visible_lines`] and
//! [`Session::selected`].
//!
//! All operations are synchronous and run to completion; the session is
//! single-threaded cooperative. `load` is atomic: when rendering fails, no
//! state changes.

pub mod history;

use std::collections::HashMap;

use anyhow::Result;

use crate::correlate::{Correlator, ElementPosition, MarkerCorrelator};
use crate::document::{parse_elements, ElementKind, NavElement, PageState};
use crate::render::{LineCleaner, Renderer, StyledRenderer};

use self::history::NavigationHistory;

const DEFAULT_HISTORY_MAX: usize = 50;

/// Identity of an element captured across a re-render.
enum AnchorKey {
    Heading(String),
    Link { destination: String, text: String },
}

/// A navigable markdown session.
pub struct Session {
    // content
    markdown: String,
    source_path: String,
    rendered_lines: Vec<String>,
    cleaner: LineCleaner,
    elements: Vec<NavElement>,

    // navigation
    selected: Option<usize>,
    scroll_offset: usize,
    /// Word-wrap width for rendering; 0 disables wrapping.
    width: u16,

    // history
    history: NavigationHistory<PageState>,

    // strategies
    renderer: Box<dyn Renderer>,
    correlator: Box<dyn Correlator>,

    // config
    always_scroll_to_anchor: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Creates a session with the styled ANSI renderer and the marker
    /// correlator.
    pub fn new() -> Self {
        Self {
            markdown: String::new(),
            source_path: String::new(),
            rendered_lines: Vec::new(),
            cleaner: LineCleaner::default(),
            elements: Vec::new(),
            selected: None,
            scroll_offset: 0,
            width: 0,
            history: NavigationHistory::new(DEFAULT_HISTORY_MAX),
            renderer: Box::new(StyledRenderer::default()),
            correlator: Box::new(MarkerCorrelator::new()),
            always_scroll_to_anchor: false,
        }
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    #[must_use]
    pub fn with_correlator(mut self, correlator: Box<dyn Correlator>) -> Self {
        self.correlator = correlator;
        self
    }

    #[must_use]
    pub fn with_history_max(mut self, max: usize) -> Self {
        self.history = NavigationHistory::new(max.max(1));
        self
    }

    #[must_use]
    pub fn with_always_scroll_to_anchor(mut self, always: bool) -> Self {
        self.always_scroll_to_anchor = always;
        self
    }

    /// Replaces the renderer used for subsequent loads.
    pub fn set_renderer(&mut self, renderer: Box<dyn Renderer>) {
        self.renderer = renderer;
    }

    /// Replaces the correlation strategy.
    pub fn set_correlator(&mut self, correlator: Box<dyn Correlator>) {
        self.correlator = correlator;
    }

    pub fn markdown(&self) -> &str {
        &self.markdown
    }

    pub fn source_path(&self) -> &str {
        &self.source_path
    }

    pub fn rendered_lines(&self) -> &[String] {
        &self.rendered_lines
    }

    pub fn elements(&self) -> &[NavElement] {
        &self.elements
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    /// Returns an owned copy of the selected element, if any.
    pub fn selected(&self) -> Option<NavElement> {
        self.selected
            .and_then(|i| self.elements.get(i))
            .cloned()
    }

    /// The rendered lines visible for the given viewport height.
    ///
    /// Empty for a zero viewport or a scroll offset past the end; the host
    /// may over-scroll without harm.
    pub fn visible_lines(&self, viewport_height: usize) -> &[String] {
        if viewport_height == 0 || self.scroll_offset >= self.rendered_lines.len() {
            return &[];
        }
        let end = (self.scroll_offset + viewport_height).min(self.rendered_lines.len());
        &self.rendered_lines[self.scroll_offset..end]
    }

    /// Returns a copy of the first heading with the given slug.
    pub fn find_heading_by_slug(&self, slug: &str) -> Option<NavElement> {
        self.elements
            .iter()
            .find(|e| e.kind == ElementKind::Heading && e.slug == slug)
            .cloned()
    }

    /// Loads markdown with no source path and no history push.
    pub fn load(&mut self, content: &str) -> Result<()> {
        self.load_with_source(content, "", false)
    }

    /// Loads markdown with source file context.
    ///
    /// Parses and renders before touching any state, so a renderer error
    /// leaves the session exactly as it was. With `push_history` the
    /// previous page goes onto the back stack (clearing forward history,
    /// browser-style); an empty session is never pushed.
    pub fn load_with_source(
        &mut self,
        content: &str,
        source_path: &str,
        push_history: bool,
    ) -> Result<()> {
        let elements = parse_elements(content, source_path);
        let rendered = self.renderer.render(content, self.width)?;

        if push_history && !self.markdown.is_empty() {
            let snapshot = self.snapshot();
            self.history.push(snapshot);
        }

        self.markdown = content.to_string();
        self.source_path = source_path.to_string();
        self.elements = elements;
        self.rendered_lines = rendered.lines;
        self.cleaner = rendered.cleaner;

        self.correlate_positions();

        self.selected = None;
        self.scroll_offset = 0;
        Ok(())
    }

    /// Annotates every element with its rendered position.
    ///
    /// When several elements correlate to the same `(line, start_col)`, the
    /// longest span wins and shorter competitors keep their previous
    /// (uncorrelated) positions.
    fn correlate_positions(&mut self) {
        if self.elements.is_empty() || self.rendered_lines.is_empty() {
            return;
        }

        self.correlator.reset();

        let mut correlations: Vec<Option<ElementPosition>> =
            Vec::with_capacity(self.elements.len());
        for elem in &self.elements {
            correlations.push(
                self.correlator
                    .correlate(elem, &self.rendered_lines, &self.cleaner),
            );
        }

        let mut winners: HashMap<(usize, usize), usize> = HashMap::new();
        for pos in correlations.iter().flatten() {
            let len = pos.end_col - pos.start_col;
            winners
                .entry((pos.line, pos.start_col))
                .and_modify(|w| *w = (*w).max(len))
                .or_insert(len);
        }

        for (elem, pos) in self.elements.iter_mut().zip(&correlations) {
            let Some(pos) = pos else { continue };
            let len = pos.end_col - pos.start_col;
            if winners.get(&(pos.line, pos.start_col)) == Some(&len) {
                elem.start_line = pos.line;
                elem.end_line = pos.line;
                elem.start_col = pos.start_col;
                elem.end_col = pos.end_col;
            }
        }
    }

    /// Changes the word-wrap width and re-renders the current document.
    ///
    /// Returns false when nothing changed (same width, empty session, or
    /// renderer error, in which case the width reverts). Scroll position is
    /// restored to the element nearest the old offset, matched by slug for
    /// headings and by `(destination, text)` for links; the selection is
    /// restored the same way.
    pub fn set_width(&mut self, cols: u16) -> bool {
        if cols == self.width {
            return false;
        }
        if self.markdown.is_empty() {
            self.width = cols;
            return false;
        }

        let selected_key = self
            .selected
            .and_then(|i| self.elements.get(i))
            .map(|e| (e.destination.clone(), e.text.clone()));
        let anchor = self.scroll_anchor_key();

        let prev_width = self.width;
        self.width = cols;
        let rendered = match self.renderer.render(&self.markdown, cols) {
            Ok(rendered) => rendered,
            Err(_) => {
                self.width = prev_width;
                return false;
            }
        };
        self.rendered_lines = rendered.lines;
        self.cleaner = rendered.cleaner;

        for elem in &mut self.elements {
            elem.start_line = 0;
            elem.end_line = 0;
            elem.start_col = 0;
            elem.end_col = 0;
        }
        self.correlate_positions();

        if let Some(anchor) = anchor {
            if let Some(elem) = self.find_by_anchor_key(&anchor) {
                self.scroll_offset = elem.start_line;
            }
        }

        self.selected = selected_key.and_then(|(destination, text)| {
            self.elements.iter().position(|e| {
                e.kind == ElementKind::Link
                    && e.is_correlated()
                    && e.destination == destination
                    && e.text == text
            })
        });

        let max = self.rendered_lines.len().saturating_sub(1);
        self.scroll_offset = self.scroll_offset.min(max);
        true
    }

    /// Identity of the correlated element closest to the scroll offset.
    fn scroll_anchor_key(&self) -> Option<AnchorKey> {
        let nearest = self
            .elements
            .iter()
            .min_by_key(|e| e.start_line.abs_diff(self.scroll_offset))?;
        if !nearest.is_correlated() {
            return None;
        }
        Some(match nearest.kind {
            ElementKind::Heading => AnchorKey::Heading(nearest.slug.clone()),
            ElementKind::Link => AnchorKey::Link {
                destination: nearest.destination.clone(),
                text: nearest.text.clone(),
            },
        })
    }

    fn find_by_anchor_key(&self, key: &AnchorKey) -> Option<&NavElement> {
        self.elements.iter().find(|e| match key {
            AnchorKey::Heading(slug) => e.kind == ElementKind::Heading && e.slug == *slug,
            AnchorKey::Link { destination, text } => {
                e.kind == ElementKind::Link && e.destination == *destination && e.text == *text
            }
        })
    }

    fn snapshot(&self) -> PageState {
        PageState {
            markdown: self.markdown.clone(),
            source_path: self.source_path.clone(),
            selected: self.selected,
            scroll_offset: self.scroll_offset,
            elements: self.elements.clone(),
            rendered_lines: self.rendered_lines.clone(),
            cleaner: self.cleaner.clone(),
            width: self.width,
        }
    }

    fn restore(&mut self, state: PageState) {
        self.markdown = state.markdown;
        self.source_path = state.source_path;
        self.scroll_offset = state.scroll_offset;
        self.elements = state.elements;
        self.rendered_lines = state.rendered_lines;
        self.cleaner = state.cleaner;
        self.width = state.width;

        // Headings are not selectable and stale indices are meaningless.
        self.selected = state.selected.filter(|&i| {
            self.elements
                .get(i)
                .is_some_and(|e| e.kind == ElementKind::Link)
        });
    }

    pub fn can_go_back(&self) -> bool {
        self.history.can_go_back()
    }

    pub fn can_go_forward(&self) -> bool {
        self.history.can_go_forward()
    }

    /// Navigates to the previous page in history.
    ///
    /// Pops first, then pushes the current page onto the forward stack, so a
    /// failed pop mutates nothing.
    pub fn go_back(&mut self) -> bool {
        let Some(prev) = self.history.back() else {
            return false;
        };
        let current = self.snapshot();
        self.history.push_to_forward(current);
        self.restore(prev);
        true
    }

    /// Navigates to the next page in forward history.
    pub fn go_forward(&mut self) -> bool {
        let Some(next) = self.history.forward() else {
            return false;
        };
        let current = self.snapshot();
        self.history.push_to_back(current);
        self.restore(next);
        true
    }

    fn max_offset(&self, viewport_height: usize) -> usize {
        self.rendered_lines.len().saturating_sub(viewport_height)
    }

    fn clear_selection_if_off_screen(&mut self, viewport_height: usize) {
        if viewport_height == 0 {
            return;
        }
        let Some(elem) = self.selected.and_then(|i| self.elements.get(i)) else {
            return;
        };
        if elem.end_line < self.scroll_offset
            || elem.start_line >= self.scroll_offset + viewport_height
        {
            self.selected = None;
        }
    }

    /// Scrolls the viewport up by one line.
    pub fn scroll_up(&mut self, viewport_height: usize) -> bool {
        if self.scroll_offset == 0 {
            return false;
        }
        self.scroll_offset -= 1;
        self.clear_selection_if_off_screen(viewport_height);
        true
    }

    /// Scrolls the viewport down by one line.
    pub fn scroll_down(&mut self, viewport_height: usize) -> bool {
        if self.scroll_offset >= self.max_offset(viewport_height) {
            return false;
        }
        self.scroll_offset += 1;
        self.clear_selection_if_off_screen(viewport_height);
        true
    }

    /// Scrolls up by one viewport. True if the offset moved at all.
    pub fn page_up(&mut self, viewport_height: usize) -> bool {
        let mut moved = false;
        for _ in 0..viewport_height {
            if !self.scroll_up(viewport_height) {
                break;
            }
            moved = true;
        }
        moved
    }

    /// Scrolls down by one viewport. True if the offset moved at all.
    pub fn page_down(&mut self, viewport_height: usize) -> bool {
        let mut moved = false;
        for _ in 0..viewport_height {
            if !self.scroll_down(viewport_height) {
                break;
            }
            moved = true;
        }
        moved
    }

    /// Moves the viewport to the top.
    pub fn home(&mut self, viewport_height: usize) {
        self.scroll_offset = 0;
        self.clear_selection_if_off_screen(viewport_height);
    }

    /// Moves the viewport to the bottom.
    pub fn end(&mut self, viewport_height: usize) {
        self.scroll_offset = self.max_offset(viewport_height);
        self.clear_selection_if_off_screen(viewport_height);
    }

    /// Adjusts the scroll offset so the selected element is in view.
    fn ensure_visible(&mut self, viewport_height: usize) {
        if viewport_height == 0 {
            return;
        }
        let Some(elem) = self.selected.and_then(|i| self.elements.get(i)) else {
            return;
        };
        if elem.start_line < self.scroll_offset {
            self.scroll_offset = elem.start_line;
        } else if elem.end_line >= self.scroll_offset + viewport_height {
            self.scroll_offset = elem.end_line + 1 - viewport_height;
        }
    }

    fn is_valid_link(&self, idx: usize) -> bool {
        self.elements
            .get(idx)
            .is_some_and(|e| e.kind == ElementKind::Link && e.is_correlated())
    }

    fn is_visible_line(&self, line: usize, viewport_height: usize) -> bool {
        line >= self.scroll_offset && line < self.scroll_offset + viewport_height
    }

    /// Selects the next link in document order.
    ///
    /// With no current selection, only links visible in the viewport are
    /// candidates; an off-screen document is left alone.
    pub fn move_to_next_link(&mut self, viewport_height: usize) -> bool {
        if self.elements.is_empty() {
            return false;
        }

        if let Some(sel) = self.selected {
            for i in sel + 1..self.elements.len() {
                if self.is_valid_link(i) {
                    self.selected = Some(i);
                    self.ensure_visible(viewport_height);
                    return true;
                }
            }
            return false;
        }

        for i in 0..self.elements.len() {
            if self.is_valid_link(i)
                && self.is_visible_line(self.elements[i].start_line, viewport_height)
            {
                self.selected = Some(i);
                self.ensure_visible(viewport_height);
                return true;
            }
        }
        false
    }

    /// Selects the previous link in document order.
    pub fn move_to_previous_link(&mut self, viewport_height: usize) -> bool {
        if self.elements.is_empty() {
            return false;
        }

        if let Some(sel) = self.selected {
            for i in (0..sel).rev() {
                if self.is_valid_link(i) {
                    self.selected = Some(i);
                    self.ensure_visible(viewport_height);
                    return true;
                }
            }
            return false;
        }

        for i in (0..self.elements.len()).rev() {
            if self.is_valid_link(i)
                && self.is_visible_line(self.elements[i].start_line, viewport_height)
            {
                self.selected = Some(i);
                self.ensure_visible(viewport_height);
                return true;
            }
        }
        false
    }

    /// Selects the first valid link, ignoring the viewport.
    pub fn move_to_first(&mut self, viewport_height: usize) -> bool {
        let first = (0..self.elements.len()).find(|&i| self.is_valid_link(i));
        self.jump_selection(first, viewport_height)
    }

    /// Selects the last valid link, ignoring the viewport.
    pub fn move_to_last(&mut self, viewport_height: usize) -> bool {
        let last = (0..self.elements.len()).rev().find(|&i| self.is_valid_link(i));
        self.jump_selection(last, viewport_height)
    }

    fn jump_selection(&mut self, target: Option<usize>, viewport_height: usize) -> bool {
        let Some(target) = target else {
            return false;
        };
        if self.selected == Some(target) {
            return false;
        }
        self.selected = Some(target);
        self.ensure_visible(viewport_height);
        true
    }

    /// Scrolls to the heading with the given slug.
    ///
    /// When the heading is already visible and `always_scroll_to_anchor` is
    /// off this is a successful no-op: nothing scrolls and nothing is pushed
    /// onto history. The selection is never touched.
    pub fn scroll_to_anchor(
        &mut self,
        slug: &str,
        viewport_height: usize,
        push_history: bool,
    ) -> bool {
        let Some(target_line) = self
            .elements
            .iter()
            .find(|e| e.kind == ElementKind::Heading && e.slug == slug)
            .map(|e| e.start_line)
        else {
            return false;
        };

        if !self.always_scroll_to_anchor && self.is_visible_line(target_line, viewport_height) {
            return true;
        }

        if push_history {
            let snapshot = self.snapshot();
            self.history.push(snapshot);
        }

        self.scroll_offset = target_line.min(self.max_offset(viewport_height));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{PlainRenderer, RenderResult};

    /// Renderer returning a fixed line set regardless of input.
    struct StaticRenderer {
        lines: Vec<String>,
    }

    impl StaticRenderer {
        fn new(lines: &[&str]) -> Box<Self> {
            Box::new(Self {
                lines: lines.iter().map(ToString::to_string).collect(),
            })
        }
    }

    impl Renderer for StaticRenderer {
        fn render(&self, _markdown: &str, _width: u16) -> Result<RenderResult> {
            Ok(RenderResult {
                lines: self.lines.clone(),
                cleaner: LineCleaner::Identity,
            })
        }
    }

    /// Renderer that always fails.
    struct ErrorRenderer;

    impl Renderer for ErrorRenderer {
        fn render(&self, _markdown: &str, _width: u16) -> Result<RenderResult> {
            anyhow::bail!("render failed")
        }
    }

    /// Correlator pinned to one position, for exercising the session's
    /// bookkeeping in isolation.
    struct FixedCorrelator(Option<ElementPosition>);

    impl Correlator for FixedCorrelator {
        fn correlate(
            &mut self,
            _elem: &NavElement,
            _lines: &[String],
            _cleaner: &LineCleaner,
        ) -> Option<ElementPosition> {
            self.0
        }
    }

    fn session_with_lines(lines: &[&str]) -> Session {
        Session::new().with_renderer(StaticRenderer::new(lines))
    }

    fn link_at(text: &str, url: &str, line: usize, end_col: usize) -> NavElement {
        let mut elem = NavElement::link(text, url, "");
        elem.start_line = line;
        elem.end_line = line;
        elem.end_col = end_col;
        elem
    }

    #[test]
    fn test_load_parses_headings() {
        let mut s = session_with_lines(&["# Heading 1", "## Heading 2"]);
        s.load("# Heading 1\nSome text\n## Heading 2").unwrap();

        let elements = s.elements();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].kind, ElementKind::Heading);
        assert_eq!(elements[0].text, "Heading 1");
        assert_eq!(elements[1].level, 2);
    }

    #[test]
    fn test_tab_traverses_links_only() {
        let mut s = session_with_lines(&["# Heading 1", "Link 1", "## Heading 2", "Link 2"]);
        s.load("# Heading 1\n[Link 1](https://example1.com)\n## Heading 2\n[Link 2](https://example2.com)")
            .unwrap();

        assert_eq!(s.selected_index(), None);

        assert!(s.move_to_next_link(10));
        assert_eq!(s.selected().unwrap().text, "Link 1");

        assert!(s.move_to_next_link(10));
        assert_eq!(s.selected().unwrap().text, "Link 2");

        assert!(!s.move_to_next_link(10));
    }

    #[test]
    fn test_history_preserves_selection() {
        let mut s = session_with_lines(&["Link A", "Link B", "Link C"]);
        s.load_with_source(
            "# Page 1\n[Link A](a.md)\n[Link B](b.md)\n[Link C](c.md)",
            "page1.md",
            false,
        )
        .unwrap();
        s.move_to_next_link(10);
        s.move_to_next_link(10);
        s.move_to_next_link(10);
        assert_eq!(s.selected().unwrap().text, "Link C");

        s.set_renderer(StaticRenderer::new(&["Link X"]));
        s.load_with_source("# Page 2\n[Link X](x.md)", "page2.md", true)
            .unwrap();
        assert!(s.go_back());

        assert_eq!(s.selected().unwrap().text, "Link C");
    }

    #[test]
    fn test_skips_uncorrelated_links_in_jump_navigation() {
        let mut s = session_with_lines(&["x"]);
        s.elements = vec![
            link_at("good", "good.md", 0, 4),
            link_at("bad", "bad.md", 0, 0),
        ];

        assert!(s.move_to_first(10));
        assert_eq!(s.selected().unwrap().text, "good");

        s.selected = None;
        assert!(s.move_to_last(10));
        assert_eq!(s.selected().unwrap().text, "good");

        s.selected = Some(1);
        assert!(s.move_to_previous_link(10));
        assert_eq!(s.selected().unwrap().text, "good");
    }

    #[test]
    fn test_correlate_keeps_line0_col0_matches() {
        let mut s = session_with_lines(&["x"]);
        s.set_correlator(Box::new(FixedCorrelator(Some(ElementPosition {
            line: 0,
            start_col: 0,
            end_col: 0,
        }))));
        s.rendered_lines = vec!["anything".to_string()];
        s.elements = vec![link_at("x", "x.md", 7, 9)];

        s.correlate_positions();

        let elem = &s.elements()[0];
        assert_eq!((elem.start_line, elem.start_col, elem.end_col), (0, 0, 0));
    }

    #[test]
    fn test_selected_returns_owned_copy() {
        let mut s = session_with_lines(&["x"]);
        s.elements = vec![link_at("original", "o.md", 0, 8)];
        s.selected = Some(0);

        let mut copy = s.selected().unwrap();
        copy.text = "modified".to_string();
        assert_eq!(s.elements()[0].text, "original");
    }

    #[test]
    fn test_load_error_does_not_corrupt_state() {
        let mut s = session_with_lines(&["initial content"]);
        s.load("# Initial").unwrap();
        let markdown_before = s.markdown().to_string();
        let line_count_before = s.rendered_lines().len();

        s.set_renderer(Box::new(ErrorRenderer));
        let err = s.load_with_source("# New Content", "new.md", false);

        assert!(err.is_err());
        assert_eq!(s.markdown(), markdown_before);
        assert_eq!(s.rendered_lines().len(), line_count_before);
    }

    #[test]
    fn test_go_back_without_history_mutates_nothing() {
        let mut s = session_with_lines(&["x"]);
        assert!(!s.go_back());
        assert_eq!(s.history.forward_len(), 0);
        assert_eq!(s.history.back_len(), 0);
    }

    #[test]
    fn test_go_forward_without_history_mutates_nothing() {
        let mut s = session_with_lines(&["x"]);
        assert!(!s.go_forward());
        assert_eq!(s.history.back_len(), 0);
        assert_eq!(s.history.forward_len(), 0);
    }

    #[test]
    fn test_go_back_then_forward_is_identity() {
        let mut s = session_with_lines(&["one"]);
        s.load_with_source("# one", "one.md", false).unwrap();
        s.set_renderer(StaticRenderer::new(&["two"]));
        s.load_with_source("# two", "two.md", true).unwrap();

        assert!(s.go_back());
        assert!(s.go_forward());
        assert_eq!(s.markdown(), "# two");
        assert_eq!(s.source_path(), "two.md");
        assert!(s.can_go_back());
        assert!(!s.can_go_forward());
    }

    #[test]
    fn test_ensure_visible_with_huge_viewport_keeps_offset_at_top() {
        let mut s = session_with_lines(&["x"]);
        s.elements = vec![link_at("x", "x.md", 0, 1)];
        s.selected = Some(0);

        s.ensure_visible(100);
        assert_eq!(s.scroll_offset(), 0);
    }

    #[test]
    fn test_move_to_next_link_ignores_links_outside_viewport() {
        let mut s = session_with_lines(&["x"]);
        s.scroll_offset = 5;
        s.elements = vec![
            link_at("above", "a.md", 4, 4),
            link_at("below", "b.md", 99, 5),
        ];

        assert!(!s.move_to_next_link(3));
        assert_eq!(s.selected_index(), None);
    }

    #[test]
    fn test_move_to_previous_link_ignores_links_outside_viewport() {
        let mut s = session_with_lines(&["x"]);
        s.scroll_offset = 5;
        s.elements = vec![
            link_at("above", "a.md", 4, 4),
            link_at("below", "b.md", 99, 5),
        ];

        assert!(!s.move_to_previous_link(3));
        assert_eq!(s.selected_index(), None);
    }

    #[test]
    fn test_restore_clears_out_of_bounds_selection() {
        let mut s = session_with_lines(&["x"]);
        s.elements = vec![link_at("x", "x.md", 0, 1)];
        s.selected = Some(0);

        let mut state = s.snapshot();
        state.selected = Some(12345);
        s.restore(state);
        assert_eq!(s.selected_index(), None);
    }

    #[test]
    fn test_restore_clears_heading_selection() {
        let mut s = session_with_lines(&["x"]);
        s.elements = vec![NavElement::heading("H", 1, "h", "")];

        let mut state = s.snapshot();
        state.selected = Some(0);
        s.restore(state);
        assert_eq!(s.selected_index(), None);
    }

    #[test]
    fn test_visible_lines_clamps_and_handles_empty() {
        let mut s = session_with_lines(&["a", "b", "c"]);
        s.load("a\nb\nc").unwrap();

        assert!(s.visible_lines(0).is_empty());

        assert_eq!(s.visible_lines(2), ["a", "b"]);

        s.scroll_offset = 99;
        assert!(s.visible_lines(2).is_empty());
    }

    #[test]
    fn test_scrolling_clears_offscreen_selection() {
        let mut s = session_with_lines(&["0", "1", "2", "3", "4"]);
        s.load("0\n1\n2\n3\n4").unwrap();
        s.elements = vec![link_at("x", "x.md", 4, 1)];
        s.elements[0].start_line = 4;
        s.selected = Some(0);

        assert!(!s.scroll_up(1));

        // Selection on line 4 leaves the 1-line viewport as soon as nothing
        // else is visible.
        s.elements[0].start_line = 0;
        s.elements[0].end_line = 0;
        assert!(s.scroll_down(1));
        assert_eq!(s.selected_index(), None);
    }

    #[test]
    fn test_page_home_end_offsets() {
        let mut s = session_with_lines(&["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"]);
        s.load("0\n1\n2\n3\n4\n5\n6\n7\n8\n9").unwrap();

        assert!(s.page_down(3));
        assert_eq!(s.scroll_offset(), 3);

        assert!(s.page_up(3));
        assert_eq!(s.scroll_offset(), 0);

        s.end(3);
        assert_eq!(s.scroll_offset(), 7);

        s.home(3);
        assert_eq!(s.scroll_offset(), 0);
    }

    #[test]
    fn test_history_max_evicts_oldest() {
        let mut s = session_with_lines(&["x"]).with_history_max(1);
        s.load_with_source("# page1", "page1.md", false).unwrap();
        s.load_with_source("# page2", "page2.md", true).unwrap();
        s.load_with_source("# page3", "page3.md", true).unwrap();

        assert!(s.go_back());
        assert_eq!(s.source_path(), "page2.md");
        assert!(!s.go_back());
    }

    #[test]
    fn test_history_push_bounded_after_many_loads() {
        let mut s = session_with_lines(&["x"]).with_history_max(5);
        s.load_with_source("# p0", "p0.md", false).unwrap();
        for i in 1..=9 {
            s.load_with_source(&format!("# p{i}"), &format!("p{i}.md"), true)
                .unwrap();
        }
        assert_eq!(s.history.back_len(), 5);
        assert!(s.go_back());
        assert_eq!(s.source_path(), "p8.md");
    }

    #[test]
    fn test_scroll_to_anchor_unknown_slug() {
        let mut s = session_with_lines(&["# A"]);
        s.load("# A").unwrap();
        assert!(!s.scroll_to_anchor("missing", 5, true));
        assert!(!s.can_go_back());
    }

    #[test]
    fn test_scroll_to_anchor_visible_target_is_noop() {
        let mut s = session_with_lines(&["[X](#target)", "", "## target", "tail"]);
        s.load("[X](#target)\n\n## target\n\ntail").unwrap();
        // "## target" correlates onto line 2, inside a 5-line viewport.

        assert!(s.scroll_to_anchor("target", 5, true));
        assert_eq!(s.scroll_offset(), 0);
        assert!(!s.can_go_back());
    }

    #[test]
    fn test_scroll_to_anchor_scrolls_and_pushes_history() {
        let lines: Vec<String> = (0..20)
            .map(|i| if i == 15 { "## deep".to_string() } else { format!("line {i}") })
            .collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let mut s = session_with_lines(&refs);
        let mut md = String::new();
        for i in 0..15 {
            md.push_str(&format!("line {i}\n\n"));
        }
        md.push_str("## deep\n");
        s.load(&md).unwrap();

        let heading = s.find_heading_by_slug("deep").unwrap();
        assert_eq!(heading.start_line, 15);

        s.selected = None;
        assert!(s.scroll_to_anchor("deep", 5, true));
        assert_eq!(s.scroll_offset(), 15);
        assert!(s.can_go_back());
    }

    #[test]
    fn test_scroll_to_anchor_always_scroll_overrides_visibility() {
        let mut s = Session::new()
            .with_renderer(StaticRenderer::new(&["## target", "a", "b", "c"]))
            .with_always_scroll_to_anchor(true);
        s.load("## target\n\na\n\nb\n\nc").unwrap();
        s.scroll_offset = 0;

        assert!(s.scroll_to_anchor("target", 10, true));
        // Pushed history even though the target was already visible.
        assert!(s.can_go_back());
    }

    #[test]
    fn test_scroll_to_anchor_leaves_selection_alone() {
        let mut s = session_with_lines(&["[go](x.md)", "1", "2", "3", "4", "5", "## far"]);
        s.load("[go](x.md)\n\n1\n\n2\n\n3\n\n4\n\n5\n\n## far").unwrap();
        s.move_to_next_link(10);
        let before = s.selected_index();
        assert!(before.is_some());

        assert!(s.scroll_to_anchor("far", 3, false));
        assert_eq!(s.selected_index(), before);
    }

    #[test]
    fn test_set_width_same_width_is_noop() {
        let mut s = session_with_lines(&["x"]);
        s.load("x").unwrap();
        assert!(!s.set_width(0));
    }

    #[test]
    fn test_set_width_error_reverts_width() {
        let mut s = session_with_lines(&["x"]);
        s.load("x").unwrap();
        s.set_renderer(Box::new(ErrorRenderer));

        assert!(!s.set_width(40));
        assert_eq!(s.width(), 0);
        assert_eq!(s.rendered_lines(), ["x"]);
    }

    #[test]
    fn test_set_width_rerenders_and_restores_scroll_anchor() {
        // Real styled renderer: narrow width moves the deep heading to a
        // different line; the scroll offset must follow it.
        let mut md = String::new();
        for i in 0..12 {
            md.push_str(&format!("paragraph {i} with a number of words in it\n\n"));
        }
        md.push_str("## landmark\n\ntail text\n");

        let mut s = Session::new();
        s.load(&md).unwrap();
        let old_line = s.find_heading_by_slug("landmark").unwrap().start_line;
        s.scroll_offset = old_line;

        assert!(s.set_width(24));
        let new_line = s.find_heading_by_slug("landmark").unwrap().start_line;
        assert_ne!(old_line, new_line);
        assert_eq!(s.scroll_offset(), new_line);
    }

    #[test]
    fn test_set_width_restores_selected_link() {
        let mut s = Session::new();
        let md = "intro words before anything else\n\n[target link](t.md) trailing\n";
        s.load(md).unwrap();
        s.move_to_next_link(50);
        assert_eq!(s.selected().unwrap().text, "target link");

        assert!(s.set_width(18));
        let selected = s.selected().expect("selection restored");
        assert_eq!(selected.text, "target link");
        assert_eq!(selected.destination, "t.md");
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            ScrollUp,
            ScrollDown,
            PageUp,
            PageDown,
            Home,
            End,
            NextLink,
            PrevLink,
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            prop_oneof![
                Just(Op::ScrollUp),
                Just(Op::ScrollDown),
                Just(Op::PageUp),
                Just(Op::PageDown),
                Just(Op::Home),
                Just(Op::End),
                Just(Op::NextLink),
                Just(Op::PrevLink),
            ]
        }

        proptest! {
            #[test]
            fn scroll_offset_stays_in_bounds(
                ops in proptest::collection::vec(op_strategy(), 1..50),
                viewport in 1..40usize,
            ) {
                let mut md = String::new();
                for i in 0..30 {
                    md.push_str(&format!("line {i} with [l{i}](l{i}.md)\n\n"));
                }
                let mut s = Session::new().with_renderer(Box::new(PlainRenderer));
                s.load(&md).unwrap();
                let total = s.rendered_lines().len();

                for op in ops {
                    match op {
                        Op::ScrollUp => { s.scroll_up(viewport); }
                        Op::ScrollDown => { s.scroll_down(viewport); }
                        Op::PageUp => { s.page_up(viewport); }
                        Op::PageDown => { s.page_down(viewport); }
                        Op::Home => s.home(viewport),
                        Op::End => s.end(viewport),
                        Op::NextLink => { s.move_to_next_link(viewport); }
                        Op::PrevLink => { s.move_to_previous_link(viewport); }
                    }
                    prop_assert!(s.scroll_offset() < total);
                }

                // Terminal ops land inside the hard bound.
                s.end(viewport);
                prop_assert!(s.scroll_offset() <= total.saturating_sub(viewport));
            }

            #[test]
            fn selection_is_always_a_correlated_link(
                ops in proptest::collection::vec(op_strategy(), 1..40),
            ) {
                let mut s = Session::new();
                s.load("# H\n\n[a](a.md) then [b](b.md)\n\ntext\n\n[c](c.md)\n").unwrap();

                for op in ops {
                    match op {
                        Op::ScrollUp => { s.scroll_up(4); }
                        Op::ScrollDown => { s.scroll_down(4); }
                        Op::PageUp => { s.page_up(4); }
                        Op::PageDown => { s.page_down(4); }
                        Op::Home => s.home(4),
                        Op::End => s.end(4),
                        Op::NextLink => { s.move_to_next_link(4); }
                        Op::PrevLink => { s.move_to_previous_link(4); }
                    }
                    if let Some(sel) = s.selected() {
                        prop_assert_eq!(sel.kind, ElementKind::Link);
                        prop_assert!(sel.end_col > sel.start_col);
                    }
                }
            }
        }
    }
}
