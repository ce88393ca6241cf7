use crate::ConfigError;
use regex::{Regex, RegexBuilder};

/// A link allow-rule written as a pseudo-URL
///
/// A pseudo-URL is literal URL text with regular-expression sections in square
/// brackets, e.g. `https://example.com/docs/[.*]` or
/// `https://example.com/item/[\d+]`. Brackets may nest inside a section; `\[`
/// in literal text stands for a literal bracket. The whole pattern must match
/// the whole URL, case-insensitively.
#[derive(Debug, Clone)]
pub struct PseudoUrl {
    source: String,
    regex: Regex,
}

impl PseudoUrl {
    /// Compiles a pseudo-URL
    ///
    /// # Examples
    ///
    /// ```
    /// use site_sync::url::PseudoUrl;
    ///
    /// let purl = PseudoUrl::new("https://example.com/docs/[.*]").unwrap();
    /// assert!(purl.matches("https://example.com/docs/intro"));
    /// assert!(purl.matches("HTTPS://EXAMPLE.COM/docs/"));
    /// assert!(!purl.matches("https://example.com/blog/post"));
    /// ```
    pub fn new(source: &str) -> Result<Self, ConfigError> {
        let pattern = to_regex_pattern(source)?;
        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", source, e)))?;

        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    /// Returns true if the URL matches this rule
    pub fn matches(&self, url: &str) -> bool {
        self.regex.is_match(url)
    }

    /// Returns the pattern as written
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// Translates pseudo-URL syntax into an anchored regex pattern
fn to_regex_pattern(source: &str) -> Result<String, ConfigError> {
    let mut pattern = String::from("^");
    let mut literal = String::new();
    let mut section = String::new();
    let mut depth = 0usize;
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        if depth == 0 {
            match c {
                '\\' if chars.peek() == Some(&'[') => {
                    literal.push('[');
                    chars.next();
                }
                '[' => {
                    pattern.push_str(&regex::escape(&literal));
                    literal.clear();
                    depth = 1;
                }
                _ => literal.push(c),
            }
        } else {
            match c {
                '[' => {
                    depth += 1;
                    section.push(c);
                }
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        pattern.push('(');
                        pattern.push_str(&section);
                        pattern.push(')');
                        section.clear();
                    } else {
                        section.push(c);
                    }
                }
                '\\' => {
                    // Keep regex escapes intact so `\]` does not close the section
                    section.push(c);
                    if let Some(next) = chars.next() {
                        section.push(next);
                    }
                }
                _ => section.push(c),
            }
        }
    }

    if depth > 0 {
        return Err(ConfigError::InvalidPattern(format!(
            "'{}': unclosed '[' section",
            source
        )));
    }

    pattern.push_str(&regex::escape(&literal));
    pattern.push('$');
    Ok(pattern)
}
