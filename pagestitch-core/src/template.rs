//! URL templates with a page counter placeholder
//!
//! A template is an ordinary URL containing one or more `{counter}`
//! placeholders, for example
//! `https://viewer.example/view.php?doc=42&format=jpg&page={counter}`.
//! Literal braces are written `{{` and `}}`.

use crate::error::{Result, StitchError};
use std::fmt;
use std::str::FromStr;

/// Name of the only placeholder a template may contain
pub const COUNTER_PLACEHOLDER: &str = "counter";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Counter,
}

/// A parsed URL template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl UrlTemplate {
    /// Parse a template, rejecting unknown placeholders, unbalanced braces
    /// and templates that never mention `{counter}`.
    pub fn parse(template: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for n in chars.by_ref() {
                        if n == '}' {
                            closed = true;
                            break;
                        }
                        name.push(n);
                    }
                    if !closed {
                        return Err(StitchError::InvalidTemplate(format!(
                            "unclosed placeholder in '{template}'"
                        )));
                    }
                    if name != COUNTER_PLACEHOLDER {
                        return Err(StitchError::InvalidTemplate(format!(
                            "unknown placeholder '{{{name}}}'"
                        )));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Counter);
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '}' => {
                    return Err(StitchError::InvalidTemplate(format!(
                        "single '}}' in '{template}'"
                    )));
                }
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        if !segments.contains(&Segment::Counter) {
            return Err(StitchError::InvalidTemplate(format!(
                "'{template}' has no {{{COUNTER_PLACEHOLDER}}} placeholder"
            )));
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    /// Substitute `counter` into every placeholder
    pub fn render(&self, counter: u64) -> String {
        let number = counter.to_string();
        let mut url = String::with_capacity(self.source.len() + number.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => url.push_str(text),
                Segment::Counter => url.push_str(&number),
            }
        }
        url
    }

    /// The template as originally supplied
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl FromStr for UrlTemplate {
    type Err = StitchError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
