//! The `#tag:value;` item format underlying the SM/SSC dialects.

use std::fmt;
use std::str::SplitInclusive;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MsdError {
    #[error("tag '{0}' contains the end-tag delimiter ':'")]
    InvalidTag(String),

    #[error("value '{0}' contains the end-value delimiter ';'")]
    InvalidValue(String),

    #[error("line {line}: expected '#' to start a new item, but got '{found}' instead")]
    ExpectedBegin { line: usize, found: String },

    #[error("line {line}: expected a ':' to end the item tag, but got '{found}' instead")]
    ExpectedTagEnd { line: usize, found: String },

    #[error("line {line}: unexpected content after item end: '{found}'")]
    TrailingContent { line: usize, found: String },
}

/// Immutable tag/value pair.
///
/// 'tag' rather than 'key' is the name used on the StepMania wiki.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsdItem {
    tag: String,
    value: String,
}

impl MsdItem {
    pub const BEGIN: char = '#';
    pub const END_TAG: char = ':';
    pub const END_VALUE: char = ';';
    pub const COMMENT: &'static str = "//";

    /// Fails when the tag contains `:` or the value contains `;`, either of
    /// which would make the item unparseable.
    pub fn new(tag: impl Into<String>, value: impl Into<String>) -> Result<Self, MsdError> {
        let tag = tag.into();
        let value = value.into();
        if tag.contains(Self::END_TAG) {
            return Err(MsdError::InvalidTag(tag));
        }
        if value.contains(Self::END_VALUE) {
            return Err(MsdError::InvalidValue(value));
        }
        Ok(Self { tag, value })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for MsdItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}{}{}{}{}",
            Self::BEGIN,
            self.tag,
            Self::END_TAG,
            self.value,
            Self::END_VALUE
        )
    }
}

/// Streaming MSD lexer; yields items lazily so very large files can be
/// consumed incrementally.
pub fn parse_msd(text: &str) -> MsdParser<'_> {
    MsdParser {
        lines: text.split_inclusive('\n'),
        line_no: 0,
        tag: String::new(),
        content: String::new(),
        in_item: false,
        done: false,
    }
}

/// Iterator behind [`parse_msd`]. Stops after the first error.
#[derive(Debug, Clone)]
pub struct MsdParser<'a> {
    lines: SplitInclusive<'a, char>,
    line_no: usize,
    tag: String,
    content: String,
    in_item: bool,
    done: bool,
}

impl MsdParser<'_> {
    fn fail(&mut self, error: MsdError) -> Option<Result<MsdItem, MsdError>> {
        self.done = true;
        Some(Err(error))
    }
}

impl Iterator for MsdParser<'_> {
    type Item = Result<MsdItem, MsdError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        while let Some(raw) = self.lines.next() {
            self.line_no += 1;

            // trim comments first, just as in SM
            let line = match raw.find(MsdItem::COMMENT) {
                Some(at) => &raw[..at],
                None => raw,
            };

            let mut rest = line;
            if !self.in_item {
                if line.trim().is_empty() {
                    continue;
                }
                if !rest.starts_with(MsdItem::BEGIN) {
                    let found: String = rest.trim_end().chars().take(1).collect();
                    return self.fail(MsdError::ExpectedBegin {
                        line: self.line_no,
                        found,
                    });
                }
                rest = &rest[MsdItem::BEGIN.len_utf8()..];
                let Some(colon) = rest.find(MsdItem::END_TAG) else {
                    return self.fail(MsdError::ExpectedTagEnd {
                        line: self.line_no,
                        found: rest.trim_end().to_string(),
                    });
                };
                self.tag = rest[..colon].to_string();
                rest = &rest[colon + MsdItem::END_TAG.len_utf8()..];
                self.in_item = true;
            }

            match rest.find(MsdItem::END_VALUE) {
                Some(semi) => {
                    let after = &rest[semi + MsdItem::END_VALUE.len_utf8()..];
                    if !after.trim().is_empty() {
                        return self.fail(MsdError::TrailingContent {
                            line: self.line_no,
                            found: after.trim_end().to_string(),
                        });
                    }
                    self.content.push_str(&rest[..semi]);
                    self.in_item = false;
                    return Some(Ok(MsdItem {
                        tag: std::mem::take(&mut self.tag),
                        value: std::mem::take(&mut self.content),
                    }));
                }
                None => self.content.push_str(rest),
            }
        }

        if self.in_item {
            // Tolerate a truncated trailing item; real-world simfiles are
            // often cut short.
            self.in_item = false;
            log::warn!(
                "unexpected end of input while reading item '{}'",
                self.tag
            );
            return Some(Ok(MsdItem {
                tag: std::mem::take(&mut self.tag),
                value: std::mem::take(&mut self.content),
            }));
        }
        None
    }
}

/// Render items back to text, one `#tag:value;` line apiece.
pub fn msd_to_text<'a>(items: impl IntoIterator<Item = &'a MsdItem>) -> String {
    let mut out = String::new();
    for item in items {
        out.push_str(&item.to_string());
    }
    out
}
