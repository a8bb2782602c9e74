//! Text formats for meshes and computed results.
pub mod mesh_file;
pub mod results;

use crate::error::FemError;
use log::debug;
use std::str::FromStr;

/// Whitespace-separated tokens of a text file.
struct Tokens<'a> {
    inner: std::str::SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            inner: text.split_whitespace(),
        }
    }

    /// Next token. Running out of tokens is [`FemError::ReadFile`].
    fn word(&mut self) -> Result<&'a str, FemError> {
        self.inner.next().ok_or_else(|| {
            debug!("Unexpected end of file");
            FemError::ReadFile
        })
    }

    /// Next token parsed as `T`. Malformed numbers are [`FemError::ReadFile`].
    fn parse<T: FromStr>(&mut self) -> Result<T, FemError> {
        let word = self.word()?;
        word.parse().map_err(|_| {
            debug!("Failed to parse token {:?}", word);
            FemError::ReadFile
        })
    }
}

fn read_file(path: &std::path::Path) -> Result<String, FemError> {
    std::fs::read_to_string(path).map_err(|err| {
        debug!("Failed to read {}: {}", path.display(), err);
        FemError::ReadFile
    })
}
