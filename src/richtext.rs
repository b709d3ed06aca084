//! Renders the structured rich-text bodies returned by the content API into
//! HTML. The API delivers each post body as a flat sequence of typed blocks
//! (paragraphs, headings, list items, images, preformatted text) where inline
//! formatting is expressed as byte-offset spans over the block's text rather
//! than as nested markup.

use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::Deserialize;
use std::fmt::Write;

/// A single rich-text block. Blocks that carry no text (images) leave `text`
/// empty and use `url`/`alt` instead.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Block {
    #[serde(rename = "type")]
    pub kind: BlockKind,

    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub spans: Vec<Span>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub alt: Option<String>,
}

/// The block types the API emits for post bodies.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum BlockKind {
    Paragraph,
    Heading1,
    Heading2,
    Heading3,
    ListItem,
    OListItem,
    Image,
    Preformatted,
}

/// An inline formatting range over a block's `text`, expressed in byte
/// offsets. Spans within a block are non-overlapping.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Span {
    pub start: usize,
    pub end: usize,

    #[serde(rename = "type")]
    pub kind: SpanKind,

    #[serde(default)]
    pub data: Option<SpanData>,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum SpanKind {
    Strong,
    Em,
    Hyperlink,
}

/// Extra payload for spans that need one (the hyperlink target).
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SpanData {
    pub url: String,
}

/// Tracks whether the renderer is currently inside a list, so that runs of
/// consecutive list-item blocks share a single `<ul>`/`<ol>` wrapper.
enum ListState {
    Outside,
    Unordered,
    Ordered,
}

/// Renders a sequence of [`Block`]s to an HTML string. All text and attribute
/// content is escaped; span ranges that fall outside the block text or do not
/// sit on character boundaries are skipped rather than panicking on malformed
/// API data.
pub fn render_html(blocks: &[Block]) -> String {
    let mut out = String::new();
    let mut list = ListState::Outside;

    for block in blocks {
        list = transition_list(&mut out, list, block.kind);
        match block.kind {
            BlockKind::Paragraph => {
                out.push_str("<p>");
                render_spans(&mut out, &block.text, &block.spans);
                out.push_str("</p>");
            }
            BlockKind::Heading1 | BlockKind::Heading2 | BlockKind::Heading3 => {
                let level = heading_level(block.kind);
                let _ = write!(out, "<h{}>", level);
                render_spans(&mut out, &block.text, &block.spans);
                let _ = write!(out, "</h{}>", level);
            }
            BlockKind::ListItem | BlockKind::OListItem => {
                out.push_str("<li>");
                render_spans(&mut out, &block.text, &block.spans);
                out.push_str("</li>");
            }
            BlockKind::Image => {
                let _ = write!(
                    out,
                    r#"<img src="{}" alt="{}">"#,
                    encode_double_quoted_attribute(block.url.as_deref().unwrap_or("")),
                    encode_double_quoted_attribute(block.alt.as_deref().unwrap_or("")),
                );
            }
            BlockKind::Preformatted => {
                let _ = write!(out, "<pre>{}</pre>", encode_text(&block.text));
            }
        }
    }
    close_list(&mut out, &list);
    out
}

/// Joins the text of every block into one string for word counting. Image
/// blocks contribute nothing.
pub fn plain_text(blocks: &[Block]) -> String {
    let texts: Vec<&str> = blocks
        .iter()
        .filter(|b| !b.text.is_empty())
        .map(|b| b.text.as_str())
        .collect();
    texts.join(" ")
}

fn heading_level(kind: BlockKind) -> u8 {
    match kind {
        BlockKind::Heading1 => 1,
        BlockKind::Heading2 => 2,
        _ => 3,
    }
}

fn transition_list(out: &mut String, state: ListState, next: BlockKind) -> ListState {
    let wanted = match next {
        BlockKind::ListItem => ListState::Unordered,
        BlockKind::OListItem => ListState::Ordered,
        _ => ListState::Outside,
    };
    match (&state, &wanted) {
        (ListState::Unordered, ListState::Unordered) => return state,
        (ListState::Ordered, ListState::Ordered) => return state,
        _ => {}
    }
    close_list(out, &state);
    match wanted {
        ListState::Unordered => out.push_str("<ul>"),
        ListState::Ordered => out.push_str("<ol>"),
        ListState::Outside => {}
    }
    wanted
}

fn close_list(out: &mut String, state: &ListState) {
    match state {
        ListState::Unordered => out.push_str("</ul>"),
        ListState::Ordered => out.push_str("</ol>"),
        ListState::Outside => {}
    }
}

fn render_spans(out: &mut String, text: &str, spans: &[Span]) {
    let mut ordered: Vec<&Span> = spans.iter().collect();
    ordered.sort_by_key(|s| s.start);

    let mut pos = 0;
    for span in ordered {
        if span.start < pos
            || span.end < span.start
            || span.end > text.len()
            || !text.is_char_boundary(span.start)
            || !text.is_char_boundary(span.end)
        {
            continue;
        }
        out.push_str(&encode_text(&text[pos..span.start]));
        let inner = encode_text(&text[span.start..span.end]);
        match span.kind {
            SpanKind::Strong => {
                let _ = write!(out, "<strong>{}</strong>", inner);
            }
            SpanKind::Em => {
                let _ = write!(out, "<em>{}</em>", inner);
            }
            SpanKind::Hyperlink => match &span.data {
                Some(data) => {
                    let _ = write!(
                        out,
                        r#"<a href="{}">{}</a>"#,
                        encode_double_quoted_attribute(&data.url),
                        inner,
                    );
                }
                // A hyperlink span with no target degrades to plain text.
                None => out.push_str(&inner),
            },
        }
        pos = span.end;
    }
    out.push_str(&encode_text(&text[pos..]));
}
