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

//! Module with the forecast registry mapping valid times to
//! the files holding the model state at that time.
//!
//! The registry is built once from the job configuration and is
//! immutable afterwards; diagnostics consume it by slicing with
//! [`Forecast::set_lead_time`].

use crate::errors::ForecastError;
use chrono::{Duration, NaiveDateTime};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

/// A forecast start time plus the mapping from valid times to
/// the output files written for that time.
#[derive(Clone, PartialEq, Debug)]
pub struct Forecast {
    start_time: NaiveDateTime,
    mapping: FxHashMap<NaiveDateTime, Vec<PathBuf>>,
}

impl Forecast {
    pub fn new(start_time: NaiveDateTime, mapping: FxHashMap<NaiveDateTime, Vec<PathBuf>>) -> Self {
        Forecast {
            start_time,
            mapping,
        }
    }

    /// Registry constructor expanding the configured filename stems
    /// over an inclusive range of hourly lead times.
    ///
    /// Filenames follow the model output convention
    /// `<stem><lead>.nc` with the lead hour zero-padded
    /// to three digits.
    pub fn new_from_template(
        start_time: NaiveDateTime,
        data_dir: &Path,
        file_stems: &[String],
        lead_hours: (i64, i64),
    ) -> Self {
        let mut mapping = FxHashMap::default();

        for lead in lead_hours.0..=lead_hours.1 {
            let files = file_stems
                .iter()
                .map(|stem| data_dir.join(format!("{}{:03}.nc", stem, lead)))
                .collect();

            mapping.insert(start_time + Duration::hours(lead), files);
        }

        Forecast::new(start_time, mapping)
    }

    /// Returns the files stored for `start_time + lead_time`.
    ///
    /// The lookup is an exact match on the valid time, no
    /// interpolation between stored times is attempted.
    pub fn set_lead_time(&self, lead_time: Duration) -> Result<&[PathBuf], ForecastError> {
        let valid_time = self.start_time + lead_time;

        self.mapping
            .get(&valid_time)
            .map(Vec::as_slice)
            .ok_or(ForecastError::LeadTimeNotFound(valid_time))
    }

    /// Sorted lead times present in the registry.
    pub fn lead_times(&self) -> Vec<Duration> {
        let mut lead_times: Vec<Duration> = self
            .mapping
            .keys()
            .map(|valid_time| *valid_time - self.start_time)
            .collect();
        lead_times.sort();

        lead_times
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd(2011, 11, 28).and_hms(12, 0, 0)
    }

    fn forecast() -> Forecast {
        Forecast::new_from_template(
            start(),
            Path::new("./data/iop5"),
            &["pv_tracers_".to_string(), "prognostics_".to_string()],
            (1, 36),
        )
    }

    #[test]
    fn stored_lead_time_returns_paths_unchanged() {
        let files = forecast().set_lead_time(Duration::hours(7)).unwrap().to_vec();

        assert_eq!(
            files,
            vec![
                PathBuf::from("./data/iop5/pv_tracers_007.nc"),
                PathBuf::from("./data/iop5/prognostics_007.nc"),
            ]
        );
    }

    #[test]
    fn absent_lead_time_is_a_lookup_failure() {
        let forecast_handle = forecast();
        let result = forecast_handle.set_lead_time(Duration::hours(48));

        assert!(matches!(
            result,
            Err(ForecastError::LeadTimeNotFound(valid_time))
                if valid_time == start() + Duration::hours(48)
        ));

        // no interpolation between stored valid times either
        assert!(forecast().set_lead_time(Duration::minutes(90)).is_err());
    }

    #[test]
    fn lead_times_are_sorted() {
        let lead_times = forecast().lead_times();

        assert_eq!(lead_times.len(), 36);
        assert_eq!(lead_times[0], Duration::hours(1));
        assert_eq!(lead_times[35], Duration::hours(36));
        assert!(lead_times.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
