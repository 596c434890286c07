//! Markdown to HTML, with fenced code blocks kept as atomic units.
//!
//! [`prepare`] parses the response once and records the source span of
//! every fenced code block, at any nesting depth (list items, blockquotes).
//! [`PreparedText::render_prefix`] renders any prefix of the source and,
//! for each block whose span is complete, emits the styled block HTML at the
//! parser's position for it. Substitution is by offset, so nothing in the
//! model's own text can be mistaken for a block. Raw HTML is dropped.

use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd, html};

fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// Render markdown to HTML with inline and block raw HTML removed.
#[must_use]
pub fn render_markdown_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, markdown_options()).filter_map(|event| match event {
        Event::Html(_) | Event::InlineHtml(_) => None,
        other => Some(other),
    });

    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

// =============================================================================
// CODE BLOCKS
// =============================================================================

/// A fenced code block found in the response text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// First word of the fence info string, or `"text"`.
    pub language: String,
    /// Raw code, exactly what the copy button puts on the clipboard.
    pub code: String,
    /// Rendered `<pre><code>` element, already escaped.
    pre_html: String,
}

impl CodeBlock {
    /// Styled block: header with language label and copy button, then the code.
    #[must_use]
    pub fn to_html(&self, index: usize) -> String {
        format!(
            "<div class=\"code-block\" data-block=\"{index}\">\
             <div class=\"code-header\"><span class=\"code-language\">{lang}</span>\
             <button class=\"copy-button\" data-copy-target=\"{index}\">Copy</button></div>\
             {pre}</div>\n",
            lang = self.language,
            pre = self.pre_html.trim_end(),
        )
    }
}

/// Language label safe to drop into HTML without escaping.
fn language_label(info: &str) -> String {
    let word = info.split_whitespace().next().unwrap_or_default();
    if !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '#' | '.'))
    {
        word.to_string()
    } else {
        "text".to_string()
    }
}

// =============================================================================
// PREPARED TEXT
// =============================================================================

/// Response text plus the code blocks the reveal must treat as atomic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedText {
    text: String,
    blocks: Vec<CodeBlock>,
    /// Byte span of each block in `text`, in order.
    spans: Vec<Range<usize>>,
}

/// Locate every fenced code block in `source`.
#[must_use]
pub fn prepare(source: &str) -> PreparedText {
    let mut blocks = Vec::new();
    let mut spans = Vec::new();
    let mut current: Option<(Range<usize>, String, String, Vec<Event<'_>>)> = None;

    for (event, range) in Parser::new_ext(source, markdown_options()).into_offset_iter() {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(ref info))) if current.is_none() => {
                let language = language_label(info);
                current = Some((range, language, String::new(), vec![event]));
            }
            Event::End(TagEnd::CodeBlock) if current.is_some() => {
                if let Some((span, language, code, mut events)) = current.take() {
                    events.push(event);
                    let mut pre_html = String::new();
                    html::push_html(&mut pre_html, events.into_iter());
                    spans.push(span);
                    blocks.push(CodeBlock { language, code, pre_html });
                }
            }
            other => {
                if let Some((_, _, code, events)) = current.as_mut() {
                    if let Event::Text(text) = &other {
                        code.push_str(text);
                    }
                    events.push(other);
                }
            }
        }
    }

    PreparedText { text: source.to_owned(), blocks, spans }
}

impl PreparedText {
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn blocks(&self) -> &[CodeBlock] {
        &self.blocks
    }

    /// Source span of each code block, parallel to [`Self::blocks`].
    #[must_use]
    pub fn spans(&self) -> &[Range<usize>] {
        &self.spans
    }

    /// Length of the text in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// End of the code block span that strictly contains `offset`, if any.
    #[must_use]
    pub fn span_end_containing(&self, offset: usize) -> Option<usize> {
        self.spans
            .iter()
            .find(|s| s.start < offset && offset < s.end)
            .map(|s| s.end)
    }

    /// HTML for the first `end` bytes. `end` must sit on a char boundary.
    ///
    /// A block is styled only once its whole span is inside the prefix.
    #[must_use]
    pub fn render_prefix(&self, end: usize) -> String {
        let end = end.min(self.text.len());
        let mut in_block = false;
        let events = Parser::new_ext(&self.text[..end], markdown_options())
            .into_offset_iter()
            .filter_map(|(event, range)| match event {
                Event::Html(_) | Event::InlineHtml(_) => None,
                Event::End(TagEnd::CodeBlock) if in_block => {
                    in_block = false;
                    None
                }
                _ if in_block => None,
                Event::Start(Tag::CodeBlock(_)) => {
                    let index = self
                        .spans
                        .iter()
                        .position(|s| s.start == range.start && s.end <= end);
                    match index {
                        Some(index) => {
                            in_block = true;
                            Some(Event::Html(self.blocks[index].to_html(index).into()))
                        }
                        None => Some(event),
                    }
                }
                other => Some(other),
            });

        let mut out = String::new();
        html::push_html(&mut out, events);
        out
    }

    /// HTML for the whole text.
    #[must_use]
    pub fn render(&self) -> String {
        self.render_prefix(self.text.len())
    }
}

#[cfg(test)]
#[path = "markdown_test.rs"]
mod tests;
