use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::ComplianceError;
use crate::timepoint::SimulationTimepoint;

/// Simulated illuminance in lux, one value per sensor point, per timepoint and space.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IlluminanceResults {
    samples: BTreeMap<SimulationTimepoint, BTreeMap<String, Vec<f64>>>,
}

impl IlluminanceResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, timepoint: SimulationTimepoint, space: &str, samples: Vec<f64>) {
        self.samples
            .entry(timepoint)
            .or_default()
            .insert(space.to_string(), samples);
    }

    /// Samples of one space at one timepoint. Absent results are an error.
    pub fn get(
        &self,
        space: &str,
        timepoint: SimulationTimepoint,
    ) -> Result<&[f64], ComplianceError> {
        self.samples
            .get(&timepoint)
            .and_then(|spaces| spaces.get(space))
            .map(Vec::as_slice)
            .ok_or_else(|| ComplianceError::MissingResult {
                space: space.to_string(),
                timepoint: timepoint.key(),
            })
    }

    /// Verify that every space has results for all six timepoints.
    pub fn check_complete<'a, I>(&self, spaces: I) -> Result<(), ComplianceError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for space in spaces {
            for timepoint in SimulationTimepoint::ALL {
                self.get(space, timepoint)?;
            }
        }
        Ok(())
    }

    /// Read downloaded results for the given spaces.
    ///
    /// The directory holds one folder per timepoint key (`9_21_10`, ...), each with one
    /// `grid_{space name}.res` file per space.
    pub fn load_dir<'a, P, I>(dir: P, spaces: I) -> Result<Self, ComplianceError>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = &'a str>,
    {
        let dir = dir.as_ref();
        let spaces: Vec<_> = spaces.into_iter().collect();
        let mut results = Self::new();

        for timepoint in SimulationTimepoint::ALL {
            for &space in &spaces {
                let path = result_path(dir, space, timepoint);
                debug!("Reading {}", path.display());

                let malformed = |reason: String| ComplianceError::MalformedResult {
                    space: space.to_string(),
                    timepoint: timepoint.key(),
                    reason,
                };
                let content = match fs::read_to_string(&path) {
                    Ok(content) => content,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        return Err(ComplianceError::MissingResult {
                            space: space.to_string(),
                            timepoint: timepoint.key(),
                        })
                    }
                    Err(e) => return Err(malformed(format!("{}: {}", path.display(), e))),
                };
                let samples = parse_samples(&content)
                    .map_err(|reason| malformed(format!("{}: {}", path.display(), reason)))?;
                results.insert(timepoint, space, samples);
            }
        }

        Ok(results)
    }
}

/// Location of the result file of a space for a timepoint.
pub fn result_path(dir: &Path, space: &str, timepoint: SimulationTimepoint) -> PathBuf {
    dir.join(timepoint.key()).join(format!("grid_{}.res", space))
}

/// Parse a result file: one lux value per line. Blank lines are skipped.
pub fn parse_samples(content: &str) -> Result<Vec<f64>, String> {
    content
        .lines()
        .enumerate()
        .map(|(number, line)| (number, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .map(|(number, line)| match line.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(format!("line {} is not a number: {:?}", number + 1, line)),
        })
        .collect()
}
