/*
Copyright 2022 - 2023 PVDS developers

This file is part of Potential Vorticity Diagnostics Suite (PVDS).

Potential Vorticity Diagnostics Suite (PVDS) is a free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation; either version 3 of the License, or
(at your option) any later version.

Potential Vorticity Diagnostics Suite (PVDS) is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with Potential Vorticity Diagnostics Suite (PVDS). If not, see https://www.gnu.org/licenses/.
*/

//! Module responsible for parsing and checking the configuration file.
//!
//! The configuration file uses [YAML](https://en.wikipedia.org/wiki/YAML)
//! and `serde` to enforce strong typing and automatic type checking.
//!
//! The structures and their fields in this module directly correspond to
//! the fields inside `config.yaml` so you can check this documentation
//! for more details how to set the config file. Diagnostic sections are
//! optional; a section that is present in the file will be run.

use crate::analysis::trajectory::Comparison;
use crate::errors::ConfigError;
use crate::Float;
use chrono::NaiveDateTime;
use ndarray::Array1;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Fields identifying the forecast job the diagnostics run on.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct Job {
    /// Name of the model job, used to label outputs.
    pub name: String,

    /// Directory containing the job's output files.
    pub data_dir: PathBuf,

    /// _(Optional)_ Directory the diagnostics write into.
    ///
    /// Defaults to `./output/`. Must be empty or absent when
    /// the suite starts.
    #[serde(default = "Job::default_output_dir")]
    pub output_dir: PathBuf,
}

impl Job {
    /// Checks if job specification follows conventions
    /// and limits.
    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::OutOfBounds("Job name cannot be empty"));
        }

        Ok(())
    }

    fn default_output_dir() -> PathBuf {
        PathBuf::from("./output/")
    }
}

/// Fields describing where the forecast files are found.
///
/// For every lead time in the inclusive `lead_hours` range one file
/// per stem is registered, named `<stem><lead>.nc` with the lead hour
/// zero-padded to three digits.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct ForecastFiles {
    /// Start (initialization) datetime of the forecast.
    pub start: NaiveDateTime,

    /// Inclusive range of hourly lead times with stored output.
    pub lead_hours: (i64, i64),

    /// Filename stems of the per-lead-time files, relative
    /// to the job data directory.
    pub file_stems: Vec<String>,
}

impl ForecastFiles {
    /// Checks if the lead time range and file stems are usable.
    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if self.lead_hours.0 < 0 {
            return Err(ConfigError::OutOfBounds("Lead times cannot be negative"));
        }

        if self.lead_hours.0 > self.lead_hours.1 {
            return Err(ConfigError::OutOfBounds(
                "First lead time cannot be past the last lead time",
            ));
        }

        if self.file_stems.is_empty() {
            return Err(ConfigError::OutOfBounds(
                "At least one forecast file stem is required",
            ));
        }

        Ok(())
    }
}

/// _(Optional)_ Fields locating the rotated pole of the model grid.
///
/// When present, fields on `grid_longitude`/`grid_latitude`
/// coordinates get true geographic coordinates attached to
/// NetCDF output.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Deserialize)]
pub struct Grid {
    /// Longitude (in degrees) of the rotated pole.
    ///
    /// Must meet the condition: `-180 <= pole_lon < 360`
    pub pole_lon: Float,

    /// Latitude (in degrees) of the rotated pole.
    ///
    /// Must meet the condition: `-90 <= pole_lat <= 90`
    pub pole_lat: Float,
}

impl Grid {
    /// Checks if the pole location follows conventions
    /// and limits.
    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if !(-90.0..=90.0).contains(&self.pole_lat) {
            return Err(ConfigError::OutOfBounds(
                "Pole latitude is too low or too high",
            ));
        }

        if !(-180.0..360.0).contains(&self.pole_lon) {
            return Err(ConfigError::OutOfBounds(
                "Pole longitude is too low or too high",
            ));
        }

        if !self.pole_lon.is_finite() || !self.pole_lat.is_finite() {
            return Err(ConfigError::OutOfBounds("Pole location is not finite"));
        }

        Ok(())
    }
}

/// _(Optional)_ Fields with information about
/// resources available for the diagnostics.
#[derive(Clone, PartialEq, PartialOrd, Debug, Deserialize)]
pub struct Resources {
    /// _(Optional)_ Heap memory limit for the suite in MB.
    /// Useful for enabling meaningful Out-of-memory error messages.
    ///
    /// Cannot be less than `128`. Defaults to whole addressable-space
    /// (`2^32` or `2^64` bytes).
    #[serde(default = "Resources::default_memory")]
    pub memory: usize,
}

impl Resources {
    fn default_memory() -> usize {
        usize::MAX / (1024 * 1024)
    }

    /// Checks if the memory limit is above the minimum.
    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if self.memory < 128 {
            return Err(ConfigError::OutOfBounds(
                "Available memory cannot be less than 128 MB",
            ));
        }

        Ok(())
    }
}

impl Default for Resources {
    fn default() -> Self {
        Resources {
            memory: Resources::default_memory(),
        }
    }
}

/// Predicate retaining only the trajectories whose named variable
/// satisfies the comparison at every time step.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct TrajectoryFilter {
    /// Variable the predicate is evaluated on.
    pub variable: String,

    /// Comparison operator, one of `">"`, `">="`, `"<"`, `"<="`.
    pub comparison: Comparison,

    /// Threshold the variable is compared against.
    pub threshold: Float,
}

impl TrajectoryFilter {
    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if !self.threshold.is_finite() {
            return Err(ConfigError::OutOfBounds(
                "Trajectory filter threshold is not finite",
            ));
        }

        Ok(())
    }
}

impl Default for TrajectoryFilter {
    /// Trajectories leaving the model domain get zero pressure
    /// filled in, so the default keeps only those that stay inside.
    fn default() -> Self {
        TrajectoryFilter {
            variable: "air_pressure".to_string(),
            comparison: Comparison::Greater,
            threshold: 0.0,
        }
    }
}

/// Fields of the trajectory spread diagnostic.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct TrajectorySpread {
    /// Trajectory file, relative to the job data directory.
    pub file: PathBuf,

    /// Variable the spread statistics are computed on.
    pub variable: String,

    /// _(Optional)_ Filter applied before computing statistics.
    ///
    /// Defaults to `air_pressure > 0`.
    #[serde(default)]
    pub filter: TrajectoryFilter,
}

impl TrajectorySpread {
    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if self.variable.is_empty() {
            return Err(ConfigError::OutOfBounds(
                "Trajectory spread variable cannot be empty",
            ));
        }

        self.filter.check_bounds()?;

        Ok(())
    }
}

/// Fields of the forecast-error diagnostic comparing a test
/// forecast against a reference run, lead time by lead time.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct ForecastErrors {
    /// Filename stem of the reference forecast files.
    pub reference_stem: String,

    /// Filename stem of the test forecast files.
    pub test_stem: String,

    /// Variable the errors are computed on.
    pub variable: String,

    /// _(Optional)_ Pressure level (Pa) to select before comparing.
    /// The whole field is compared when absent.
    #[serde(default)]
    pub pressure: Option<Float>,

    /// _(Optional)_ Whether to save the difference field at the
    /// last lead time as NetCDF. Defaults to `false`.
    #[serde(default)]
    pub save_difference: bool,

    /// _(Optional)_ Ensemble file (relative to the job data
    /// directory) whose member spread is saved next to the error
    /// series, as a reference level for the error growth.
    #[serde(default)]
    pub ensemble_file: Option<PathBuf>,
}

impl ForecastErrors {
    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if self.variable.is_empty() {
            return Err(ConfigError::OutOfBounds(
                "Forecast-error variable cannot be empty",
            ));
        }

        if let Some(pressure) = self.pressure {
            if !pressure.is_finite() || pressure <= 0.0 {
                return Err(ConfigError::OutOfBounds(
                    "Selected pressure level must be positive",
                ));
            }
        }

        Ok(())
    }
}

/// Histogram bins the dipole diagnostic averages within.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Deserialize)]
pub struct Bins {
    pub min: Float,
    pub max: Float,
    pub spacing: Float,
}

impl Bins {
    /// Bin edges spanning the configured range.
    pub fn edges(&self) -> Array1<Float> {
        let count = ((self.max - self.min) / self.spacing).round() as usize + 1;

        Array1::linspace(self.min, self.max, count)
    }

    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if !(self.min < self.max) {
            return Err(ConfigError::OutOfBounds(
                "Bin minimum must be below bin maximum",
            ));
        }

        if !(self.spacing > 0.0) || self.spacing > (self.max - self.min) {
            return Err(ConfigError::OutOfBounds(
                "Bin spacing must be positive and fit into the bin range",
            ));
        }

        Ok(())
    }
}

/// A PV tracer partitioning one source of potential vorticity,
/// with the label used on plots.
///
/// The set of tracers carried by a job depends on which physics
/// schemes were enabled, so the table lives in the configuration
/// file rather than in code.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct Tracer {
    pub variable: String,
    pub label: String,
}

/// Fields of the PV dipole diagnostic: mass-weighted means of
/// tracer fields in bins of advection-only PV.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct PvDipole {
    /// Lead time (hours) of the forecast slice to diagnose.
    pub lead_hours: i64,

    /// Name of the air density variable, for grid-box mass.
    pub density: String,

    /// Name of the variable the bins are taken over.
    pub coordinate: String,

    /// Tracer fields to average within the bins.
    pub tracers: Vec<Tracer>,

    pub bins: Bins,
}

impl PvDipole {
    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if self.lead_hours < 0 {
            return Err(ConfigError::OutOfBounds(
                "Dipole lead time cannot be negative",
            ));
        }

        if self.tracers.is_empty() {
            return Err(ConfigError::OutOfBounds(
                "At least one tracer is required for the dipole diagnostic",
            ));
        }

        self.bins.check_bounds()?;

        Ok(())
    }
}

/// Main config structure representing the fields in
/// configuration file.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct Config {
    pub job: Job,

    pub forecast: ForecastFiles,

    #[serde(default)]
    pub grid: Option<Grid>,

    #[serde(default)]
    pub resources: Resources,

    #[serde(default)]
    pub trajectory_spread: Option<TrajectorySpread>,

    #[serde(default)]
    pub forecast_errors: Option<ForecastErrors>,

    #[serde(default)]
    pub pv_dipole: Option<PvDipole>,
}

impl Config {
    /// Config structure constructor, responsible for
    /// deserializing configuration and checking it.
    pub fn new_from_file(file_path: &Path) -> Result<Config, ConfigError> {
        let data = fs::read(file_path)?;
        let config: Config = serde_yaml::from_slice(data.as_slice())?;

        config.job.check_bounds()?;
        config.forecast.check_bounds()?;
        config.resources.check_bounds()?;

        if let Some(grid) = &config.grid {
            grid.check_bounds()?;
        }

        if let Some(spread) = &config.trajectory_spread {
            spread.check_bounds()?;
        }

        if let Some(errors) = &config.forecast_errors {
            errors.check_bounds()?;
        }

        if let Some(dipole) = &config.pv_dipole {
            dipole.check_bounds()?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    fn parse(yaml: &str) -> Result<Config, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml).map_err(ConfigError::CantDeserialize)?;

        config.job.check_bounds()?;
        config.forecast.check_bounds()?;
        config.resources.check_bounds()?;

        if let Some(grid) = &config.grid {
            grid.check_bounds()?;
        }

        if let Some(dipole) = &config.pv_dipole {
            dipole.check_bounds()?;
        }

        Ok(config)
    }

    const MINIMAL: &str = "
job:
  name: iop5
  data_dir: ./data/iop5
forecast:
  start: 2011-11-28T12:00:00
  lead_hours: [1, 36]
  file_stems: [prognostics_]
";

    #[test]
    fn minimal_config_parses() {
        let config = parse(MINIMAL).unwrap();

        assert_eq!(config.job.name, "iop5");
        assert_eq!(config.forecast.lead_hours, (1, 36));
        assert!(config.grid.is_none());
        assert!(config.trajectory_spread.is_none());
    }

    #[test]
    fn bad_lead_time_range_is_rejected() {
        let yaml = MINIMAL.replace("[1, 36]", "[36, 1]");

        assert!(matches!(
            parse(&yaml),
            Err(ConfigError::OutOfBounds(_))
        ));
    }

    #[test]
    fn out_of_bounds_pole_is_rejected() {
        let yaml = format!("{}grid:\n  pole_lon: 177.5\n  pole_lat: 95.0\n", MINIMAL);

        assert!(matches!(
            parse(&yaml),
            Err(ConfigError::OutOfBounds(_))
        ));
    }

    #[test]
    fn default_trajectory_filter_keeps_in_domain_paths() {
        let filter = TrajectoryFilter::default();

        assert_eq!(filter.variable, "air_pressure");
        assert_eq!(filter.comparison, Comparison::Greater);
        assert_approx_eq!(f64, filter.threshold, 0.0);
    }

    #[test]
    fn bin_edges_span_configured_range() {
        let bins = Bins {
            min: 0.0,
            max: 8.0,
            spacing: 0.25,
        };
        let edges = bins.edges();

        assert_eq!(edges.len(), 33);
        assert_approx_eq!(f64, edges[0], 0.0);
        assert_approx_eq!(f64, edges[32], 8.0);
        assert_approx_eq!(f64, edges[1] - edges[0], 0.25, epsilon = 1e-12);
    }
}
