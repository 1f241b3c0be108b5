//! Reference terminal host.
//!
//! Drives a [`Session`] from keyboard input and paints it with ratatui. The
//! session's decorated ANSI lines are converted to styled text for display
//! (markers stripped first; they exist only for position extraction), and
//! the selected link is shown in reverse video using its cleaned-column
//! span.

use std::io;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Stylize};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::Paragraph;
use ratatui::{Frame, Terminal};

use ansi_to_tui::IntoText;

use crate::fetch::{split_fragment, ContentFetcher};
use crate::render::markers::strip_markers;
use crate::session::Session;

/// The interactive application: a session plus a fetcher for link
/// activation.
pub struct App {
    session: Session,
    fetcher: ContentFetcher,
    /// When set, the wrap width never follows terminal resizes.
    fixed_width: bool,
    should_quit: bool,
}

impl App {
    pub fn new(session: Session, fetcher: ContentFetcher) -> Self {
        Self {
            session,
            fetcher,
            fixed_width: false,
            should_quit: false,
        }
    }

    /// Keeps the wrap width pinned to its current value across resizes.
    #[must_use]
    pub fn with_fixed_width(mut self, fixed: bool) -> Self {
        self.fixed_width = fixed;
        self
    }

    /// Runs the event loop until quit.
    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        io::stdout().execute(EnterAlternateScreen)?;
        let result = self.event_loop();
        io::stdout().execute(LeaveAlternateScreen)?;
        disable_raw_mode()?;
        result
    }

    fn event_loop(&mut self) -> Result<()> {
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;

        if !self.fixed_width {
            let size = terminal.size()?;
            self.session.set_width(size.width);
        }

        while !self.should_quit {
            terminal.draw(|frame| draw(frame, &self.session))?;
            self.handle_event(&terminal)?;
        }
        Ok(())
    }

    fn handle_event(&mut self, terminal: &Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        let viewport = viewport_height(terminal.size()?.height);
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                self.handle_key(key.code, key.modifiers, viewport);
            }
            Event::Resize(width, _) => {
                if !self.fixed_width {
                    self.session.set_width(width);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers, viewport: usize) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,

            KeyCode::Char('j') | KeyCode::Down => {
                self.session.scroll_down(viewport);
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.session.scroll_up(viewport);
            }
            KeyCode::PageDown => {
                self.session.page_down(viewport);
            }
            KeyCode::PageUp => {
                self.session.page_up(viewport);
            }
            KeyCode::Char('d') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.session.page_down(viewport);
            }
            KeyCode::Char('u') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.session.page_up(viewport);
            }
            KeyCode::Char('g') => self.session.home(viewport),
            KeyCode::Char('G') => self.session.end(viewport),

            KeyCode::Tab => {
                self.session.move_to_next_link(viewport);
            }
            KeyCode::BackTab => {
                self.session.move_to_previous_link(viewport);
            }
            KeyCode::Home => {
                self.session.move_to_first(viewport);
            }
            KeyCode::End => {
                self.session.move_to_last(viewport);
            }

            KeyCode::Enter => self.activate_selection(viewport),

            KeyCode::Left | KeyCode::Backspace => {
                self.session.go_back();
            }
            KeyCode::Right => {
                self.session.go_forward();
            }

            _ => {}
        }
    }

    /// Follows the selected link: internal anchors jump in-document, all
    /// other targets go through the content fetcher. A fragment on an
    /// external target is honored after the load.
    fn activate_selection(&mut self, viewport: usize) {
        let Some(elem) = self.session.selected() else {
            return;
        };

        if let Some(target) = elem.anchor_target() {
            let target = target.to_string();
            self.session.scroll_to_anchor(&target, viewport, true);
            return;
        }

        let (path, fragment) = split_fragment(&elem.destination);
        let fragment = fragment.map(ToString::to_string);
        let mut to_fetch = elem.clone();
        to_fetch.destination = path.to_string();

        self.fetcher
            .on_select_or_show_error(&mut self.session, &to_fetch);

        if let Some(fragment) = fragment.filter(|f| !f.is_empty()) {
            self.session.scroll_to_anchor(&fragment, viewport, false);
        }
    }
}

fn viewport_height(terminal_height: u16) -> usize {
    // One row is reserved for the status bar.
    terminal_height.saturating_sub(1) as usize
}

fn draw(frame: &mut Frame, session: &Session) {
    let [doc_area, status_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(frame.area());

    draw_document(frame, doc_area, session);
    frame.render_widget(status_line(session), status_area);
}

fn draw_document(frame: &mut Frame, area: Rect, session: &Session) {
    let viewport = area.height as usize;
    let selected = session.selected();

    let mut lines: Vec<Line> = Vec::with_capacity(viewport);
    for (row, raw) in session.visible_lines(viewport).iter().enumerate() {
        let display = strip_markers(raw);
        let mut line = ansi_line(&display);
        if let Some(sel) = &selected {
            if sel.start_line == session.scroll_offset() + row {
                line = highlight_columns(line, sel.start_col, sel.end_col);
            }
        }
        lines.push(line);
    }

    frame.render_widget(Paragraph::new(Text::from(lines)), area);
}

/// Converts one ANSI-decorated line into a styled ratatui line.
fn ansi_line(display: &str) -> Line<'static> {
    display
        .into_text()
        .ok()
        .and_then(|text| text.lines.into_iter().next())
        .unwrap_or_else(|| Line::from(display.to_string()))
}

/// Applies reverse video to a column range of a styled line.
///
/// Columns are character indices into the visible text, the same coordinate
/// space the correlators produce.
fn highlight_columns(line: Line<'static>, start_col: usize, end_col: usize) -> Line<'static> {
    if end_col <= start_col {
        return line;
    }

    let mut spans: Vec<Span> = Vec::with_capacity(line.spans.len() + 2);
    let mut col = 0usize;
    for span in line.spans {
        let chars: Vec<char> = span.content.chars().collect();
        let span_start = col;
        let span_end = col + chars.len();
        col = span_end;

        if span_end <= start_col || span_start >= end_col {
            spans.push(span);
            continue;
        }

        let split_at = |from: usize, to: usize| -> String {
            chars[from.saturating_sub(span_start).min(chars.len())
                ..to.saturating_sub(span_start).min(chars.len())]
                .iter()
                .collect()
        };

        if span_start < start_col {
            spans.push(Span::styled(split_at(span_start, start_col), span.style));
        }
        let hi_from = span_start.max(start_col);
        let hi_to = span_end.min(end_col);
        spans.push(Span::styled(
            split_at(hi_from, hi_to),
            span.style.add_modifier(Modifier::REVERSED),
        ));
        if span_end > end_col {
            spans.push(Span::styled(split_at(end_col, span_end), span.style));
        }
    }
    Line::from(spans)
}

/// Builds the one-row status bar: file name, history availability, key
/// hints.
fn status_line(session: &Session) -> Line<'static> {
    let name = std::path::Path::new(session.source_path())
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "waymark".to_string());

    let arrow = |available: bool, glyph: &'static str| -> Span<'static> {
        if available {
            Span::raw(glyph).bold()
        } else {
            Span::raw(glyph).dim()
        }
    };

    Line::from(vec![
        Span::raw(format!(" {name} ")).yellow(),
        Span::raw("| Link:").dim(),
        Span::raw("Tab/Shift-Tab"),
        Span::raw(" | Back:").dim(),
        arrow(session.can_go_back(), "◀"),
        Span::raw(" Fwd:").dim(),
        arrow(session.can_go_forward(), "▶"),
        Span::raw(" | Scroll:").dim(),
        Span::raw("j/k"),
        Span::raw(" Top/End:").dim(),
        Span::raw("g/G"),
        Span::raw(" Quit:").dim(),
        Span::raw("q"),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(text: &str) -> Line<'static> {
        Line::from(text.to_string())
    }

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_highlight_columns_splits_span() {
        let line = highlight_columns(plain("hello world"), 6, 11);
        assert_eq!(line_text(&line), "hello world");

        let reversed: Vec<&Span> = line
            .spans
            .iter()
            .filter(|s| s.style.add_modifier.contains(Modifier::REVERSED))
            .collect();
        assert_eq!(reversed.len(), 1);
        assert_eq!(reversed[0].content.as_ref(), "world");
    }

    #[test]
    fn test_highlight_columns_spanning_multiple_spans() {
        let line = Line::from(vec![
            Span::raw("ab".to_string()),
            Span::raw("cdef".to_string()),
        ]);
        let highlighted = highlight_columns(line, 1, 4);
        assert_eq!(line_text(&highlighted), "abcdef");

        let reversed: String = highlighted
            .spans
            .iter()
            .filter(|s| s.style.add_modifier.contains(Modifier::REVERSED))
            .map(|s| s.content.as_ref())
            .collect();
        assert_eq!(reversed, "bcd");
    }

    #[test]
    fn test_highlight_columns_empty_range_is_noop() {
        let line = highlight_columns(plain("text"), 2, 2);
        assert!(line
            .spans
            .iter()
            .all(|s| !s.style.add_modifier.contains(Modifier::REVERSED)));
    }

    #[test]
    fn test_ansi_line_parses_colors() {
        let line = ansi_line("\x1b[31mred\x1b[0m plain");
        assert_eq!(line_text(&line), "red plain");
    }

    #[test]
    fn test_status_line_defaults_name() {
        let session = Session::new();
        let line = status_line(&session);
        assert!(line_text(&line).contains("waymark"));
    }

    #[test]
    fn test_viewport_height_reserves_status_row() {
        assert_eq!(viewport_height(24), 23);
        assert_eq!(viewport_height(0), 0);
    }
}
