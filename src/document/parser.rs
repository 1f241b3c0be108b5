//! Element extraction from markdown source.
//!
//! Walks the comrak AST in document order and collects the navigable
//! elements (headings and links). Order matters: the marker correlator
//! pairs the N-th parsed element with the N-th rendered marker, so this walk
//! must mirror the order the renderer emits output.

use std::collections::HashMap;

use comrak::nodes::{AstNode, NodeValue};
use comrak::{parse_document, Arena, Options};

use super::types::NavElement;

/// Parses markdown and returns headings and links in document order.
///
/// Heading slugs are assigned here; the K-th duplicate of a base slug gets a
/// `-K` suffix. Malformed markdown never fails: comrak is lossy and simply
/// yields whatever elements it recognizes.
pub fn parse_elements(source: &str, source_path: &str) -> Vec<NavElement> {
    let arena = Arena::new();
    let options = create_options();
    let root = parse_document(&arena, source, &options);

    let mut walk = ElementWalk {
        elements: Vec::new(),
        slug_counts: HashMap::new(),
        source_path,
    };
    walk.visit(root);
    walk.elements
}

fn create_options() -> Options<'static> {
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options
}

struct ElementWalk<'s> {
    elements: Vec<NavElement>,
    slug_counts: HashMap<String, usize>,
    source_path: &'s str,
}

impl ElementWalk<'_> {
    fn visit<'a>(&mut self, node: &'a AstNode<'a>) {
        match &node.data.borrow().value {
            NodeValue::Heading(heading) => {
                let text = extract_text(node);
                let slug = self.assign_slug(&text);
                self.elements.push(NavElement::heading(
                    &text,
                    heading.level,
                    &slug,
                    self.source_path,
                ));
                // Links inside heading text are still navigable.
                for child in node.children() {
                    self.visit(child);
                }
            }
            NodeValue::Link(link) => {
                let text = extract_text(node);
                self.elements
                    .push(NavElement::link(&text, &link.url, self.source_path));
            }
            _ => {
                for child in node.children() {
                    self.visit(child);
                }
            }
        }
    }

    fn assign_slug(&mut self, text: &str) -> String {
        let base = generate_slug(text);
        let count = self.slug_counts.entry(base.clone()).or_insert(0);
        let slug = if *count > 0 {
            format!("{base}-{count}")
        } else {
            base.clone()
        };
        *count += 1;
        slug
    }
}

/// Derives a URL-safe anchor slug from heading text.
///
/// Lower-cases letters and digits, maps each whitespace rune to a hyphen,
/// preserves existing hyphens and underscores, and drops everything else.
pub fn generate_slug(text: &str) -> String {
    let mut slug = String::new();
    for ch in text.trim().chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
        } else if ch.is_whitespace() {
            slug.push('-');
        } else if ch == '-' || ch == '_' {
            slug.push(ch);
        }
    }
    slug
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
    use crate::document::ElementKind;

    #[test]
    fn test_parses_headings() {
        let elements = parse_elements("# Heading 1\nSome text\n## Heading 2", "");
        assert_eq!(elements.len(), 2);

        assert_eq!(elements[0].kind, ElementKind::Heading);
        assert_eq!(elements[0].text, "Heading 1");
        assert_eq!(elements[0].level, 1);
        assert_eq!(elements[1].text, "Heading 2");
        assert_eq!(elements[1].level, 2);
    }

    #[test]
    fn test_parses_links() {
        let elements = parse_elements(
            "# Title\nCheck out [Google](https://google.com) and [GitHub](https://github.com).",
            "",
        );
        assert_eq!(elements.len(), 3);

        assert_eq!(elements[1].kind, ElementKind::Link);
        assert_eq!(elements[1].text, "Google");
        assert_eq!(elements[1].destination, "https://google.com");
        assert_eq!(elements[2].text, "GitHub");
        assert_eq!(elements[2].destination, "https://github.com");
    }

    #[test]
    fn test_parses_autolink() {
        let elements = parse_elements("See <https://example.com> for details.", "");
        assert!(elements.iter().any(|e| e.kind == ElementKind::Link
            && e.destination == "https://example.com"
            && e.text == "https://example.com"));
    }

    #[test]
    fn test_preserves_document_order() {
        let elements = parse_elements(
            "# First\n[a](a.md)\n## Second\n[b](b.md)",
            "",
        );
        let kinds: Vec<ElementKind> = elements.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ElementKind::Heading,
                ElementKind::Link,
                ElementKind::Heading,
                ElementKind::Link
            ]
        );
    }

    #[test]
    fn test_elements_carry_source_path() {
        let elements = parse_elements("[x](x.md)", "docs/readme.md");
        assert_eq!(elements[0].source_path, "docs/readme.md");
    }

    #[test]
    fn test_duplicate_headings_get_suffixed_slugs() {
        let elements = parse_elements("# A\n\n## B\n\n## B\n\n## B", "");
        let slugs: Vec<&str> = elements.iter().map(|e| e.slug.as_str()).collect();
        assert_eq!(slugs, vec!["a", "b", "b-1", "b-2"]);
    }

    #[test]
    fn test_generate_slug_basic() {
        assert_eq!(generate_slug("Hello World"), "hello-world");
        assert_eq!(generate_slug("What's New?"), "whats-new");
        assert_eq!(generate_slug("  Trimmed  Heading  "), "trimmed--heading");
    }

    #[test]
    fn test_generate_slug_preserves_hyphens_and_underscores() {
        assert_eq!(generate_slug("multiple---hyphens"), "multiple---hyphens");
        assert_eq!(generate_slug("under_scores_work"), "under_scores_work");
    }

    #[test]
    fn test_generate_slug_unicode() {
        assert_eq!(generate_slug("Überblick 2024"), "überblick-2024");
    }

    #[test]
    fn test_malformed_markdown_yields_empty_or_partial_list() {
        // comrak is lossy; this must never panic.
        let elements = parse_elements("[unclosed](", "");
        assert!(elements.iter().all(|e| !e.text.is_empty() || e.kind == ElementKind::Heading));
    }
}
