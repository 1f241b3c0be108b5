//! Marker-injecting ANSI renderer.
//!
//! Walks the comrak AST and emits ANSI-styled lines with invisible position
//! markers around heading and link text. Word wrap treats a marked span as a
//! single token, so a span never straddles a line break and the extractor can
//! always pair its markers within one line.

use anyhow::Result;
use comrak::nodes::{AstNode, ListType, NodeValue};
use comrak::{parse_document, Arena, Options};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::markers::{
    heading_start_marker, HEADING_END_MARKER, LINK_END_MARKER, LINK_START_MARKER,
};
use super::{LineCleaner, RenderResult, Renderer};

const RESET: &str = "\x1b[0m";

/// ANSI style palette for rendered elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    heading: [&'static str; 6],
    link: &'static str,
    emphasis: &'static str,
    strong: &'static str,
    code: &'static str,
    code_block: &'static str,
    quote: &'static str,
    rule: &'static str,
}

impl Theme {
    /// Palette for dark terminal backgrounds.
    pub const fn dark() -> Self {
        Self {
            heading: [
                "\x1b[1;35m",
                "\x1b[1;95m",
                "\x1b[1;36m",
                "\x1b[1;96m",
                "\x1b[1;34m",
                "\x1b[1;94m",
            ],
            link: "\x1b[4;34m",
            emphasis: "\x1b[3m",
            strong: "\x1b[1m",
            code: "\x1b[93m",
            code_block: "\x1b[90m",
            quote: "\x1b[32m",
            rule: "\x1b[90m",
        }
    }

    /// Palette for light terminal backgrounds.
    pub const fn light() -> Self {
        Self {
            heading: [
                "\x1b[1;35m",
                "\x1b[1;35m",
                "\x1b[1;34m",
                "\x1b[1;34m",
                "\x1b[1;30m",
                "\x1b[1;30m",
            ],
            link: "\x1b[4;34m",
            emphasis: "\x1b[3m",
            strong: "\x1b[1m",
            code: "\x1b[31m",
            code_block: "\x1b[37m",
            quote: "\x1b[32m",
            rule: "\x1b[37m",
        }
    }

    /// Picks a palette from the `COLORFGBG` environment variable.
    ///
    /// Format is "foreground;background"; a background of 8 or above means a
    /// light terminal. Defaults to dark on parse errors or a missing variable.
    pub fn detect() -> Self {
        let Ok(colorfgbg) = std::env::var("COLORFGBG") else {
            return Self::dark();
        };
        let Some(bg) = colorfgbg.split(';').next_back() else {
            return Self::dark();
        };
        match bg.trim().parse::<u8>() {
            Ok(bg) if bg >= 8 => Self::light(),
            _ => Self::dark(),
        }
    }
}

/// Renders markdown to ANSI-decorated lines with position markers.
#[derive(Debug, Clone)]
pub struct StyledRenderer {
    theme: Theme,
}

impl Default for StyledRenderer {
    fn default() -> Self {
        Self::new(Theme::dark())
    }
}

impl StyledRenderer {
    pub const fn new(theme: Theme) -> Self {
        Self { theme }
    }
}

impl Renderer for StyledRenderer {
    fn render(&self, markdown: &str, width: u16) -> Result<RenderResult> {
        let arena = Arena::new();
        let options = create_options();
        let root = parse_document(&arena, markdown, &options);

        let mut ctx = RenderContext {
            lines: Vec::new(),
            width: width as usize,
            theme: self.theme,
        };
        for child in root.children() {
            render_block(child, &mut ctx, 0);
        }
        // Drop the separator after the final block.
        if ctx.lines.last().is_some_and(String::is_empty) {
            ctx.lines.pop();
        }

        Ok(RenderResult {
            lines: ctx.lines,
            cleaner: LineCleaner::AnsiAndMarkers,
        })
    }
}

fn create_options() -> Options<'static> {
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options
}

struct RenderContext {
    lines: Vec<String>,
    /// Wrap column count; 0 disables wrapping.
    width: usize,
    theme: Theme,
}

/// One wrap unit: the decorated output and its visible form.
///
/// A whole link span is a single token so wrapping cannot separate its
/// markers.
struct Token {
    out: String,
    vis: String,
}

impl Token {
    fn styled(text: &str, sgr: &str) -> Self {
        let out = if sgr.is_empty() {
            text.to_string()
        } else {
            format!("{sgr}{text}{RESET}")
        };
        Self {
            out,
            vis: text.to_string(),
        }
    }

    fn is_whitespace(&self) -> bool {
        !self.vis.is_empty() && self.vis.chars().all(char::is_whitespace)
    }
}

fn render_block<'a>(node: &'a AstNode<'a>, ctx: &mut RenderContext, depth: usize) {
    let indent = "  ".repeat(depth);
    match &node.data.borrow().value {
        NodeValue::Heading(heading) => {
            let text = extract_text(node);
            let level = heading.level.clamp(1, 6);
            let style = ctx.theme.heading[level as usize - 1];
            let prefix = "#".repeat(level as usize);
            ctx.lines.push(format!(
                "{style}{prefix} {}{}{HEADING_END_MARKER}{RESET}",
                heading_start_marker(level),
                text
            ));
            ctx.lines.push(String::new());
        }

        NodeValue::Paragraph => {
            let tokens = collect_inline_tokens(node, ctx.theme, "");
            for line in wrap_tokens(&tokens, ctx.width, &indent, &indent) {
                ctx.lines.push(line);
            }
            ctx.lines.push(String::new());
        }

        NodeValue::List(list) => {
            let mut ordinal = list.start;
            for item in node.children() {
                let bullet = match list.list_type {
                    ListType::Bullet => "• ".to_string(),
                    ListType::Ordered => {
                        let b = format!("{ordinal}. ");
                        ordinal += 1;
                        b
                    }
                };
                render_list_item(item, ctx, depth, &bullet);
            }
            if depth == 0 {
                ctx.lines.push(String::new());
            }
        }

        NodeValue::CodeBlock(code_block) => {
            let style = ctx.theme.code_block;
            for line in code_block.literal.trim_end_matches('\n').split('\n') {
                ctx.lines.push(format!("{indent}    {style}{line}{RESET}"));
            }
            ctx.lines.push(String::new());
        }

        NodeValue::BlockQuote => {
            let quote = ctx.theme.quote;
            let first = format!("{indent}{quote}│{RESET} ");
            for child in node.children() {
                match &child.data.borrow().value {
                    NodeValue::Paragraph => {
                        let tokens = collect_inline_tokens(child, ctx.theme, "");
                        for line in wrap_tokens(&tokens, ctx.width, &first, &first) {
                            ctx.lines.push(line);
                        }
                    }
                    _ => render_block(child, ctx, depth + 1),
                }
            }
            ctx.lines.push(String::new());
        }

        NodeValue::ThematicBreak => {
            let cols = if ctx.width > 0 { ctx.width.min(80) } else { 40 };
            let rule = ctx.theme.rule;
            ctx.lines
                .push(format!("{indent}{rule}{}{RESET}", "─".repeat(cols)));
            ctx.lines.push(String::new());
        }

        NodeValue::Table(_) => {
            for row in node.children() {
                let mut cells = Vec::new();
                for cell in row.children() {
                    cells.push(extract_text(cell));
                }
                ctx.lines.push(format!("{indent}{}", cells.join(" │ ")));
            }
            ctx.lines.push(String::new());
        }

        NodeValue::HtmlBlock(_) | NodeValue::FrontMatter(_) => {}

        _ => {
            for child in node.children() {
                render_block(child, ctx, depth);
            }
        }
    }
}

fn render_list_item<'a>(item: &'a AstNode<'a>, ctx: &mut RenderContext, depth: usize, bullet: &str) {
    let indent = "  ".repeat(depth);
    let hang = " ".repeat(bullet.chars().count());
    let mut first = true;
    for child in item.children() {
        match &child.data.borrow().value {
            NodeValue::Paragraph => {
                let tokens = collect_inline_tokens(child, ctx.theme, "");
                let prefix_first = if first {
                    format!("{indent}{bullet}")
                } else {
                    format!("{indent}{hang}")
                };
                let prefix_next = format!("{indent}{hang}");
                for line in wrap_tokens(&tokens, ctx.width, &prefix_first, &prefix_next) {
                    ctx.lines.push(line);
                }
                first = false;
            }
            _ => render_block(child, ctx, depth + 1),
        }
    }
    if first {
        // Item with no paragraph content (e.g. an empty task item).
        ctx.lines.push(format!("{indent}{bullet}"));
    }
}

/// Collects the inline content of a block as wrap tokens, splitting text on
/// whitespace boundaries and keeping each link span atomic.
fn collect_inline_tokens<'a>(node: &'a AstNode<'a>, theme: Theme, sgr: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    for child in node.children() {
        collect_inline_tokens_recursive(child, theme, sgr, &mut tokens);
    }
    tokens
}

fn collect_inline_tokens_recursive<'a>(
    node: &'a AstNode<'a>,
    theme: Theme,
    sgr: &str,
    tokens: &mut Vec<Token>,
) {
    match &node.data.borrow().value {
        NodeValue::Text(t) => {
            for piece in split_whitespace_runs(t) {
                tokens.push(Token::styled(&piece, sgr));
            }
        }
        NodeValue::Code(code) => {
            tokens.push(Token::styled(&code.literal, theme.code));
        }
        NodeValue::Emph => {
            let next = combine_sgr(sgr, theme.emphasis);
            for child in node.children() {
                collect_inline_tokens_recursive(child, theme, &next, tokens);
            }
        }
        NodeValue::Strong => {
            let next = combine_sgr(sgr, theme.strong);
            for child in node.children() {
                collect_inline_tokens_recursive(child, theme, &next, tokens);
            }
        }
        NodeValue::Strikethrough => {
            let next = combine_sgr(sgr, "\x1b[9m");
            for child in node.children() {
                collect_inline_tokens_recursive(child, theme, &next, tokens);
            }
        }
        NodeValue::Link(_) => {
            let text = extract_text(node);
            let style = theme.link;
            tokens.push(Token {
                out: format!("{style}{LINK_START_MARKER}{text}{LINK_END_MARKER}{RESET}"),
                vis: text,
            });
        }
        NodeValue::Image(_) => {
            let alt = extract_text(node);
            tokens.push(Token::styled(&format!("[Image: {alt}]"), theme.code_block));
        }
        NodeValue::SoftBreak | NodeValue::LineBreak => {
            tokens.push(Token::styled(" ", ""));
        }
        _ => {
            for child in node.children() {
                collect_inline_tokens_recursive(child, theme, sgr, tokens);
            }
        }
    }
}

fn combine_sgr(outer: &str, inner: &str) -> String {
    format!("{outer}{inner}")
}

fn split_whitespace_runs(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut ws_state: Option<bool> = None;
    for ch in text.chars() {
        let is_ws = ch.is_whitespace();
        match ws_state {
            Some(state) if state == is_ws => buf.push(ch),
            Some(_) => {
                out.push(std::mem::take(&mut buf));
                buf.push(ch);
                ws_state = Some(is_ws);
            }
            None => {
                buf.push(ch);
                ws_state = Some(is_ws);
            }
        }
    }
    if !buf.is_empty() {
        out.push(buf);
    }
    out
}

/// Display width of a decorated string; SGR sequences contribute nothing.
fn visible_width(s: &str) -> usize {
    let mut width = 0;
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            for c in chars.by_ref() {
                if c == 'm' {
                    break;
                }
            }
            continue;
        }
        width += UnicodeWidthChar::width(c).unwrap_or(0);
    }
    width
}

/// Greedy word wrap over tokens. A token is never split, so marker pairs
/// stay on one line. `width` 0 emits a single unwrapped line.
fn wrap_tokens(tokens: &[Token], width: usize, prefix_first: &str, prefix_next: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = prefix_first.to_string();
    let mut current_width = visible_width(prefix_first);
    let mut has_word = false;

    for token in tokens {
        let token_width = UnicodeWidthStr::width(token.vis.as_str());
        if width > 0 && has_word && current_width + token_width > width {
            lines.push(std::mem::take(&mut current));
            current.push_str(prefix_next);
            current_width = visible_width(prefix_next);
            has_word = false;
        }
        if token.is_whitespace() && !has_word {
            // Drop leading whitespace at wrapped line starts.
            continue;
        }
        current.push_str(&token.out);
        current_width += token_width;
        if !token.is_whitespace() {
            has_word = true;
        }
    }

    lines.push(current);
    lines
}

fn extract_text<'a>(node: &'a AstNode<'a>) -> String {
    let mut text = String::new();
    extract_text_recursive(node, &mut text);
    text
}

fn extract_text_recursive<'a>(node: &'a AstNode<'a>, text: &mut String) {
    match &node.data.borrow().value {
        NodeValue::Text(t) => text.push_str(t),
        NodeValue::Code(c) => text.push_str(&c.literal),
        NodeValue::SoftBreak | NodeValue::LineBreak => text.push(' '),
        _ => {
            for child in node.children() {
                extract_text_recursive(child, text);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlate::extractor::{extract_all_markers, MarkerKind};

    fn render(markdown: &str, width: u16) -> RenderResult {
        StyledRenderer::default().render(markdown, width).unwrap()
    }

    #[test]
    fn test_heading_carries_level_marker() {
        let result = render("## Section", 0);
        let positions = extract_all_markers(&result.lines, &result.cleaner);
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].kind, MarkerKind::Heading);
        assert_eq!(positions[0].level, 2);
    }

    #[test]
    fn test_link_markers_surround_link_text() {
        let result = render("Check [Google](https://google.com).", 0);
        let positions = extract_all_markers(&result.lines, &result.cleaner);
        assert_eq!(positions.len(), 1);
        let pos = &positions[0];
        assert_eq!(pos.kind, MarkerKind::Link);
        let clean = result.cleaner.clean(&result.lines[pos.line_idx]);
        let span: String = clean
            .chars()
            .skip(pos.start_col)
            .take(pos.end_col - pos.start_col)
            .collect();
        assert_eq!(span, "Google");
    }

    #[test]
    fn test_cleaner_strips_all_decoration() {
        let result = render("# Title\n\nSome *styled* text.", 0);
        for line in &result.lines {
            let clean = result.cleaner.clean(line);
            assert!(!clean.contains('\x1b'), "ANSI left in {clean:?}");
            assert!(
                !clean.chars().any(crate::render::markers::is_marker_char),
                "marker left in {clean:?}"
            );
        }
    }

    #[test]
    fn test_wrap_respects_width() {
        let md = "word ".repeat(30);
        let result = render(&md, 24);
        for line in &result.lines {
            let clean = result.cleaner.clean(line);
            assert!(
                UnicodeWidthStr::width(clean.as_str()) <= 24,
                "line too wide: {clean:?}"
            );
        }
    }

    #[test]
    fn test_wrap_never_splits_a_link_span() {
        let md = format!("{} [a very long link label](x.md) tail", "pad ".repeat(6));
        let result = render(&md, 20);
        let positions = extract_all_markers(&result.lines, &result.cleaner);
        // The span survived wrapping intact on a single line.
        assert_eq!(positions.len(), 1);
        assert_eq!(
            positions[0].end_col - positions[0].start_col,
            "a very long link label".chars().count()
        );
    }

    #[test]
    fn test_no_line_contains_embedded_newline() {
        let result = render("a\n\nb\n\n```\ncode\nmore\n```\n", 0);
        assert!(result.lines.iter().all(|l| !l.contains('\n')));
    }

    #[test]
    fn test_list_items_render_with_bullets() {
        let result = render("- one\n- two", 0);
        let clean: Vec<String> = result
            .lines
            .iter()
            .map(|l| result.cleaner.clean(l))
            .collect();
        assert!(clean.iter().any(|l| l.starts_with("• one")));
        assert!(clean.iter().any(|l| l.starts_with("• two")));
    }

    #[test]
    fn test_theme_detect_defaults_to_dark() {
        // COLORFGBG unset in test environments more often than not; both
        // palettes must at least be constructible.
        let _ = Theme::detect();
        assert_ne!(Theme::dark(), Theme::light());
    }
}
