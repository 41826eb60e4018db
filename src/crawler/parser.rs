//! HTML parser for extracting indexable page content
//!
//! This module handles parsing HTML content to extract:
//! - Page title
//! - Meta description
//! - Visible text, with whitespace collapsed and length bounded

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

/// Marker appended to truncated page text
const TRUNCATION_MARKER: &str = "...";

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    /// The page title (from <title> tag), or empty
    pub title: String,

    /// The `<meta name="description">` content, or empty
    pub description: String,

    /// Visible text
    pub content: String,
}

/// Parses HTML content and extracts indexable text
///
/// # Extraction Rules
///
/// - Text inside `<script>` and `<style>` is dropped
/// - Whitespace runs collapse to a single space
/// - Text longer than `max_content_length` characters is cut at that many
///   characters and `...` is appended
///
/// # Example
///
/// ```
/// use resource_indexer::crawler::parse_html;
///
/// let html = r#"<html><head><title>Test</title></head><body><p>Hi</p></body></html>"#;
/// let parsed = parse_html(html, 5000);
/// assert_eq!(parsed.title, "Test");
/// ```
pub fn parse_html(html: &str, max_content_length: usize) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document).unwrap_or_default(),
        description: extract_description(&document).unwrap_or_default(),
        content: truncate_chars(&visible_text(&document), max_content_length),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_description(document: &Html) -> Option<String> {
    let selector = Selector::parse(r#"meta[name="description"]"#).ok()?;

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string())
        .find(|s| !s.is_empty())
}

/// Concatenates every text node outside `<script>` and `<style>`
fn visible_text(document: &Html) -> String {
    let mut text = String::new();
    collect_text(document.root_element(), &mut text);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    if matches!(element.value().name(), "script" | "style" | "noscript") {
        return;
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_text(child_element, out);
                }
            }
            _ => {}
        }
    }
}

/// Cuts `text` to `max_chars` characters, appending the truncation marker
fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}
