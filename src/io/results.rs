//! Nodal result series and their text format.
//!
//! ```text
//! Results
//! <solution time, seconds since the Unix epoch>
//! <series count>
//! <name>
//! <time>
//! <value count>
//! <values, one per line>
//! ...
//! ```
use crate::error::FemError;
use crate::io::{read_file, Tokens};
use eyre::Context;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

const HEADER: &str = "Results";

/// Named series of nodal values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSeries {
    pub name: String,
    /// Time at which the values were computed, zero for static analyses.
    pub time: f64,
    pub values: Vec<f64>,
}

impl ResultSeries {
    pub fn min(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::max)
    }
}

/// Result series of one solution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultList {
    /// Seconds since the Unix epoch at which the solution was computed.
    pub solution_time: i64,
    pub series: Vec<ResultSeries>,
}

impl ResultList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the solution time to the current system time.
    pub fn stamp_current_time(&mut self) {
        self.solution_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
    }

    /// Adds a series, replacing any series of the same name.
    pub fn set_series(&mut self, name: &str, values: Vec<f64>, time: f64) {
        let series = ResultSeries {
            name: name.to_string(),
            time,
            values,
        };
        match self.series.iter_mut().find(|s| s.name == name) {
            Some(existing) => *existing = series,
            None => self.series.push(series),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ResultSeries> {
        self.series.iter().find(|s| s.name == name)
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = writeln!(out, "{}", HEADER);
        let _ = writeln!(out, "{}", self.solution_time);
        let _ = writeln!(out, "{}", self.series.len());
        for series in &self.series {
            let _ = writeln!(out, "{}", series.name);
            let _ = writeln!(out, "{:?}", series.time);
            let _ = writeln!(out, "{}", series.values.len());
            for value in &series.values {
                let _ = writeln!(out, "{:?}", value);
            }
        }
        out
    }

    /// Parses a result list from its text format.
    ///
    /// Fails with [`FemError::ReadFile`] for a wrong header, truncated or malformed data.
    pub fn from_text(text: &str) -> Result<Self, FemError> {
        let mut tokens = Tokens::new(text);
        if tokens.word()? != HEADER {
            return Err(FemError::ReadFile);
        }
        let solution_time = tokens.parse()?;
        let count: usize = tokens.parse()?;
        let series = (0..count)
            .map(|_| {
                let name = tokens.word()?.to_string();
                let time = tokens.parse()?;
                let len: usize = tokens.parse()?;
                let values = (0..len)
                    .map(|_| tokens.parse())
                    .collect::<Result<_, _>>()?;
                Ok(ResultSeries { name, time, values })
            })
            .collect::<Result<_, FemError>>()?;
        Ok(Self {
            solution_time,
            series,
        })
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, file_path: P) -> eyre::Result<()> {
        let file_path = file_path.as_ref();
        std::fs::write(file_path, self.to_text())
            .wrap_err_with(|| format!("failed to write results to {}", file_path.display()))
    }

    pub fn load_from_file<P: AsRef<Path>>(file_path: P) -> Result<Self, FemError> {
        Self::from_text(&read_file(file_path.as_ref())?)
    }
}
