use scraper::{ElementRef, Html, Node};

/// Elements that start a new line in the text rendering
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "tbody", "td", "tfoot",
    "th", "thead", "tr", "ul",
];

/// Elements whose content never reaches the text rendering
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Converts an HTML fragment to plain text
///
/// Block elements become line breaks, `<br>` becomes a newline, scripts and
/// styles are dropped and whitespace runs collapse to a single space.
/// Entities are decoded by the HTML parser.
///
/// # Examples
///
/// ```
/// use site_sync::extract::html_to_text;
///
/// let text = html_to_text("<p>Hello   <b>world</b></p><p>Fish &amp; chips</p>");
/// assert_eq!(text, "Hello world\nFish & chips");
/// ```
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut buffer = TextBuffer::default();
    walk(fragment.root_element(), &mut buffer);
    buffer.finish()
}

/// Truncates `text` to at most `max_chars` characters without splitting one
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

fn walk(element: ElementRef<'_>, buffer: &mut TextBuffer) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => buffer.push_text(text),
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_ELEMENTS.contains(&name) {
                    continue;
                }
                if name == "br" {
                    buffer.push_newline();
                    continue;
                }

                let is_block = BLOCK_ELEMENTS.contains(&name);
                if is_block {
                    buffer.break_line();
                }
                if let Some(child_element) = ElementRef::wrap(child) {
                    walk(child_element, buffer);
                }
                if is_block {
                    buffer.break_line();
                }
            }
            _ => {}
        }
    }
}

#[derive(Default)]
struct TextBuffer {
    out: String,
    pending_space: bool,
}

impl TextBuffer {
    fn push_text(&mut self, text: &str) {
        for c in text.chars() {
            if c.is_whitespace() {
                self.pending_space = true;
                continue;
            }
            if self.pending_space && !self.out.is_empty() && !self.out.ends_with('\n') {
                self.out.push(' ');
            }
            self.pending_space = false;
            self.out.push(c);
        }
    }

    /// Unconditional newline (`<br>`)
    fn push_newline(&mut self) {
        self.trim_trailing_spaces();
        self.out.push('\n');
        self.pending_space = false;
    }

    /// Newline unless the buffer already ends a line
    fn break_line(&mut self) {
        self.trim_trailing_spaces();
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
        self.pending_space = false;
    }

    fn trim_trailing_spaces(&mut self) {
        let trimmed = self.out.trim_end_matches(' ').len();
        self.out.truncate(trimmed);
    }

    fn finish(self) -> String {
        self.out.trim().to_string()
    }
}
