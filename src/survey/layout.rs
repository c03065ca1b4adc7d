//! Section grammar of a survey message.
//!
//! A submission is laid out as two parts, each holding two numbered lists:
//!
//! ```text
//! ЧАСТЬ 1: РЕПУТАЦИЯ
//!   Список 1 (до 400 млн руб.):     -> reputation, under threshold
//!   Список 2 (свыше 400 млн руб.):  -> reputation, over threshold
//! ЧАСТЬ 2: МАРКЕТИНГ
//!   Список 1 (до 400 млн руб.):     -> marketing, under threshold
//!   Список 2 (свыше 400 млн руб.):  -> marketing, over threshold
//! ```
//!
//! The text is scanned once for headings. A list region runs from the end of
//! its heading to the start of the next heading (of any kind) or to the end
//! of the text.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use thiserror::Error;
use tracing::trace;

static HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        (?P<part> ЧАСТЬ \s* [12] \s* : \s* (?P<part_name> РЕПУТАЦИЯ | МАРКЕТИНГ ) )
        |
        (?P<list> Список \s* [12] \s* \( \s* (?P<bound> до | свыше ) \s+ 400 \s+ млн \s+ руб\.? \s* \) \s* : )
        ",
    )
    .expect("heading pattern should compile")
});

/// Top-level part of the questionnaire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Part {
    Reputation,
    Marketing,
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Part::Reputation => f.write_str("ЧАСТЬ 1: РЕПУТАЦИЯ"),
            Part::Marketing => f.write_str("ЧАСТЬ 2: МАРКЕТИНГ"),
        }
    }
}

/// Revenue bracket of a list (400 million roubles).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Threshold {
    Under,
    Over,
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Threshold::Under => f.write_str("Список 1 (до 400 млн руб.)"),
            Threshold::Over => f.write_str("Список 2 (свыше 400 млн руб.)"),
        }
    }
}

/// One of the four itemized lists. Ordering follows the document grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Section {
    pub part: Part,
    pub threshold: Threshold,
}

impl Section {
    /// All sections in document order.
    pub const ALL: [Section; 4] = [
        Section::new(Part::Reputation, Threshold::Under),
        Section::new(Part::Reputation, Threshold::Over),
        Section::new(Part::Marketing, Threshold::Under),
        Section::new(Part::Marketing, Threshold::Over),
    ];

    pub const fn new(part: Part, threshold: Threshold) -> Self {
        Self { part, threshold }
    }

    /// Position of this section in [`Section::ALL`].
    pub fn ordinal(self) -> usize {
        let part = match self.part {
            Part::Reputation => 0,
            Part::Marketing => 2,
        };
        let threshold = match self.threshold {
            Threshold::Under => 0,
            Threshold::Over => 1,
        };
        part + threshold
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.part, self.threshold)
    }
}

/// Violations of the section grammar reported by [`check_layout`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("part `{part}` appears after `{after}`")]
    PartOutOfOrder { part: Part, after: Part },

    #[error("part `{0}` appears more than once")]
    DuplicatePart(Part),

    #[error("list `{section}` appears after `{after}`")]
    SectionOutOfOrder { section: Section, after: Section },

    #[error("list `{0}` appears more than once")]
    DuplicateSection(Section),

    #[error("list `{threshold}` at byte {offset} is not inside any part")]
    ListOutsidePart { threshold: Threshold, offset: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Heading {
    Part(Part),
    List(Threshold),
}

#[derive(Debug, Clone, Copy)]
struct Token {
    heading: Heading,
    start: usize,
    end: usize,
}

/// Single pass over `text`, returning every heading in document order.
fn scan(text: &str) -> Vec<Token> {
    HEADING
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let heading = if let Some(name) = caps.name("part_name") {
                match name.as_str() {
                    "РЕПУТАЦИЯ" => Heading::Part(Part::Reputation),
                    _ => Heading::Part(Part::Marketing),
                }
            } else {
                match caps.name("bound")?.as_str() {
                    "до" => Heading::List(Threshold::Under),
                    _ => Heading::List(Threshold::Over),
                }
            };
            Some(Token {
                heading,
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect()
}

/// Body text of one list section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region<'a> {
    pub section: Section,
    pub body: &'a str,
}

/// Locate the body of every list section present in `text`.
///
/// Lenient: a list heading before any part heading is skipped, and when a
/// section repeats only its first occurrence is kept.
pub fn regions(text: &str) -> Vec<Region<'_>> {
    let tokens = scan(text);
    let mut current: Option<Part> = None;
    let mut taken = [false; 4];
    let mut out = Vec::with_capacity(4);

    for (i, token) in tokens.iter().enumerate() {
        match token.heading {
            Heading::Part(part) => current = Some(part),
            Heading::List(threshold) => {
                let Some(part) = current else {
                    trace!(offset = token.start, "list heading outside any part, skipped");
                    continue;
                };
                let section = Section::new(part, threshold);
                if std::mem::replace(&mut taken[section.ordinal()], true) {
                    trace!(%section, "duplicate list heading, skipped");
                    continue;
                }
                let end = tokens.get(i + 1).map_or(text.len(), |next| next.start);
                out.push(Region {
                    section,
                    body: &text[token.end..end],
                });
            }
        }
    }

    out
}

/// Validate that the headings in `text` follow the documented order.
///
/// Missing parts or lists are fine; only reordering, repetition and stray
/// list headings are rejected.
pub fn check_layout(text: &str) -> Result<(), LayoutError> {
    let mut current: Option<Part> = None;
    let mut last: Option<Section> = None;

    for token in scan(text) {
        match token.heading {
            Heading::Part(part) => {
                if let Some(prev) = current {
                    if part == prev {
                        return Err(LayoutError::DuplicatePart(part));
                    }
                    if part < prev {
                        return Err(LayoutError::PartOutOfOrder { part, after: prev });
                    }
                }
                current = Some(part);
            }
            Heading::List(threshold) => {
                let part = current.ok_or(LayoutError::ListOutsidePart {
                    threshold,
                    offset: token.start,
                })?;
                let section = Section::new(part, threshold);
                if let Some(prev) = last {
                    if section == prev {
                        return Err(LayoutError::DuplicateSection(section));
                    }
                    if section < prev {
                        return Err(LayoutError::SectionOutOfOrder {
                            section,
                            after: prev,
                        });
                    }
                }
                last = Some(section);
            }
        }
    }

    Ok(())
}
