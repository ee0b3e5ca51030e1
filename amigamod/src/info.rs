//! Parsing of `uade123 --get-info` output

use std::{fmt, ops::RangeInclusive};
use thiserror::Error;

/// What UADE reports about a single module file
///
/// Only the fields the pipelines care about are kept: the module name (used for naming
/// output files) and the range of subsongs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleInfo {
    /// The name stored inside the module, if UADE found one
    pub name: Option<String>,

    /// The range of subsongs, or `None` if UADE could not play the file
    pub subsongs: Option<Subsongs>,
}

impl ModuleInfo {
    const NAME_PREFIX: &'static str = "modulename:";
    const SUBSONGS_PREFIX: &'static str = "subsongs:";

    /// Parse the free-text output of `uade123 --get-info`
    ///
    /// The relevant lines look like this:
    ///
    /// ```text
    /// modulename: Turrican II
    /// subsongs: cur 1 min 1 max 12
    /// ```
    ///
    /// When a key occurs more than once, the last line wins.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut info = Self::default();

        for line in text.lines() {
            if let Some(name) = line.strip_prefix(Self::NAME_PREFIX) {
                let name = name.trim();
                info.name = (!name.is_empty()).then(|| name.to_owned());
            }

            if line.starts_with(Self::SUBSONGS_PREFIX) {
                info.subsongs = Some(Subsongs::from_line(line)?);
            }
        }

        Ok(info)
    }

    /// Can this module be played at all?
    pub fn is_playable(&self) -> bool {
        self.subsongs.is_some()
    }
}

/// An inclusive range of subsong numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subsongs {
    /// The first subsong to play
    pub first: u32,

    /// The last subsong to play
    pub last: u32,
}

impl Subsongs {
    /// Create a new subsong range
    pub fn new(first: u32, last: u32) -> Self {
        Self { first, last }
    }

    // Positional: "subsongs: cur C min M max X" puts the bounds at tokens 2 and 6
    fn from_line(line: &str) -> Result<Self, ParseError> {
        let tokens: Vec<_> = line.split_whitespace().collect();
        let number = |index: usize| -> Result<u32, ParseError> {
            tokens
                .get(index)
                .and_then(|token| token.parse().ok())
                .ok_or_else(|| ParseError::Subsongs {
                    line: line.to_owned(),
                })
        };

        Ok(Self::new(number(2)?, number(6)?))
    }

    /// The number of subsongs in the range
    pub fn len(&self) -> usize {
        if self.last < self.first {
            0
        } else {
            (self.last - self.first) as usize + 1
        }
    }

    /// Does the range contain no subsongs at all?
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over the subsong numbers in the range
    pub fn iter(&self) -> RangeInclusive<u32> {
        self.first..=self.last
    }
}

impl IntoIterator for Subsongs {
    type Item = u32;
    type IntoIter = RangeInclusive<u32>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for Subsongs {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}..={}", self.first, self.last)
    }
}

/// Errors that can result from parsing UADE's info output
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The `subsongs:` line did not have the expected layout
    #[error("Malformed subsongs line: {line:?}")]
    Subsongs { line: String },
}
