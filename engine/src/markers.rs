//! Position markers embedded in fixture comments.
//!
//! A fixture names the ranges a test cares about with annotations inside
//! `//` comments. An annotation always describes the line directly above the
//! comment line that carries it:
//!
//! ```text
//!     uint unusedVariable;
//!     //   ^^^^^^^^^^^^^^ @unusedVariable
//! ```
//!
//! Two grammars exist. A caret run followed by a space and `@tag` spans the
//! caret columns. `^( @tag` and `^) @tag` at the end of a comment open and
//! close a range at column 0 of the line above each of them.
//!
//! Only the text right of the first `//` is scanned. Carets line up with the
//! annotated line character by character; the reported columns are UTF-16
//! code units of the annotated line.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use lspcheck_types::{Position, Range};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkerError {
    #[error("unknown marker `@{0}`")]
    UnknownTag(String),
    #[error("marker `@{tag}` defined twice (again on line {line})")]
    DuplicateTag { tag: String, line: u32 },
    #[error("marker `@{tag}` closed on line {line} but never opened")]
    UnopenedClose { tag: String, line: u32 },
    #[error("marker `@{tag}` opened on line {line} but never closed")]
    Unclosed { tag: String, line: u32 },
    #[error("marker `@{tag}` on the first line has no line above to annotate")]
    NoLineAbove { tag: String },
}

/// Tag to range mapping extracted from one fixture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerTable {
    markers: BTreeMap<String, Range>,
}

fn single_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\^+) @(\w+)").expect("valid single-line marker regex"))
}

fn multi_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\^([()]) @(\w+)$").expect("valid multi-line marker regex"))
}

impl MarkerTable {
    /// Scan `text` for annotations.
    pub fn extract(text: &str) -> Result<Self, MarkerError> {
        let mut markers = BTreeMap::new();
        // Open multi-line ranges, with the line that opened them.
        let mut open: HashMap<String, (Position, u32)> = HashMap::new();

        let lines: Vec<&str> = text.lines().collect();
        for (index, line) in lines.iter().enumerate() {
            let Some(comment_start) = line.find("//") else {
                continue;
            };
            let comment = &line[comment_start..];
            let line_no = index as u32;

            for caps in single_line_regex().captures_iter(comment) {
                let (Some(carets), Some(tag)) = (caps.get(1), caps.get(2)) else {
                    continue;
                };
                let target = annotated_line(line_no, tag.as_str())?;
                let above = lines[target as usize];
                let start = utf16_column(above, &line[..comment_start + carets.start()]);
                let end = utf16_column(above, &line[..comment_start + carets.end()]);
                insert_unique(
                    &mut markers,
                    &open,
                    tag.as_str(),
                    Range::on_line(target, start, end),
                    line_no,
                )?;
            }

            if let Some(caps) = multi_line_regex().captures(comment) {
                let (Some(delimiter), Some(tag)) = (caps.get(1), caps.get(2)) else {
                    continue;
                };
                let tag = tag.as_str();
                let target = annotated_line(line_no, tag)?;
                if delimiter.as_str() == "(" {
                    if markers.contains_key(tag) || open.contains_key(tag) {
                        return Err(MarkerError::DuplicateTag {
                            tag: tag.to_string(),
                            line: line_no,
                        });
                    }
                    open.insert(tag.to_string(), (Position::new(target, 0), line_no));
                } else {
                    let Some((start, _)) = open.remove(tag) else {
                        return Err(MarkerError::UnopenedClose {
                            tag: tag.to_string(),
                            line: line_no,
                        });
                    };
                    markers.insert(
                        tag.to_string(),
                        Range::new(start, Position::new(target, 0)),
                    );
                }
            }
        }

        if let Some((tag, (_, line))) = open.into_iter().min_by_key(|(_, (_, line))| *line) {
            return Err(MarkerError::Unclosed { tag, line });
        }

        Ok(Self { markers })
    }

    /// The range tagged `tag`. A leading `@` is optional.
    pub fn get(&self, tag: &str) -> Result<Range, MarkerError> {
        let tag = tag.strip_prefix('@').unwrap_or(tag);
        self.markers
            .get(tag)
            .copied()
            .ok_or_else(|| MarkerError::UnknownTag(tag.to_string()))
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Tags (without `@`) and ranges in tag order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Range)> {
        self.markers.iter().map(|(tag, range)| (tag.as_str(), *range))
    }
}

fn annotated_line(comment_line: u32, tag: &str) -> Result<u32, MarkerError> {
    comment_line
        .checked_sub(1)
        .ok_or_else(|| MarkerError::NoLineAbove {
            tag: tag.to_string(),
        })
}

fn insert_unique(
    markers: &mut BTreeMap<String, Range>,
    open: &HashMap<String, (Position, u32)>,
    tag: &str,
    range: Range,
    line: u32,
) -> Result<(), MarkerError> {
    let duplicate = || MarkerError::DuplicateTag {
        tag: tag.to_string(),
        line,
    };
    if open.contains_key(tag) {
        return Err(duplicate());
    }
    match markers.entry(tag.to_string()) {
        Entry::Occupied(_) => Err(duplicate()),
        Entry::Vacant(slot) => {
            slot.insert(range);
            Ok(())
        }
    }
}

/// UTF-16 column in `annotated` of the character under the end of `prefix`.
///
/// Characters past the end of `annotated` count as one unit each.
fn utf16_column(annotated: &str, prefix: &str) -> u32 {
    let chars = prefix.chars().count();
    let mut units = 0;
    let mut seen = 0;
    for ch in annotated.chars().take(chars) {
        units += ch.len_utf16();
        seen += 1;
    }
    (units + (chars - seen)) as u32
}
