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

//! Module computing spread statistics of a trajectory set:
//! mean, median and percentile envelopes of one variable
//! across the set, as functions of time.

use super::TrajectorySet;
use crate::errors::TrajectoryError;
use crate::Float;
use ndarray::{Array1, Axis};

/// Percentile envelope of one variable over a trajectory set.
///
/// Every field holds one value per time step.
#[derive(Clone, PartialEq, Debug)]
pub struct SpreadProfile {
    pub times: Array1<Float>,
    pub mean: Array1<Float>,
    pub median: Array1<Float>,
    pub p05: Array1<Float>,
    pub p25: Array1<Float>,
    pub p75: Array1<Float>,
    pub p95: Array1<Float>,

    /// Number of trajectories the statistics are computed over.
    pub count: usize,
}

/// Computes the spread statistics of a named variable across
/// the trajectory axis.
pub fn spread(set: &TrajectorySet, variable: &str) -> Result<SpreadProfile, TrajectoryError> {
    if set.is_empty() {
        return Err(TrajectoryError::EmptySet(
            "spread statistics need at least one trajectory",
        ));
    }

    let values = set.variable(variable)?;
    let step_count = values.len_of(Axis(1));

    let mut mean = Array1::zeros(step_count);
    let mut median = Array1::zeros(step_count);
    let mut p05 = Array1::zeros(step_count);
    let mut p25 = Array1::zeros(step_count);
    let mut p75 = Array1::zeros(step_count);
    let mut p95 = Array1::zeros(step_count);

    for (step, column) in values.axis_iter(Axis(1)).enumerate() {
        let mut sorted = column.to_vec();
        sorted.sort_by(Float::total_cmp);

        mean[step] = column.sum() / column.len() as Float;
        median[step] = percentile(&sorted, 50.0);
        p05[step] = percentile(&sorted, 5.0);
        p25[step] = percentile(&sorted, 25.0);
        p75[step] = percentile(&sorted, 75.0);
        p95[step] = percentile(&sorted, 95.0);
    }

    Ok(SpreadProfile {
        times: set.times().clone(),
        mean,
        median,
        p05,
        p25,
        p75,
        p95,
        count: set.len(),
    })
}

/// Percentile of pre-sorted values with linear interpolation
/// between the two closest ranks.
fn percentile(sorted: &[Float], q: Float) -> Float {
    let rank = q / 100.0 * (sorted.len() - 1) as Float;
    let below = rank.floor() as usize;

    if below + 1 == sorted.len() {
        return sorted[below];
    }

    let fraction = rank - below as Float;

    sorted[below] + fraction * (sorted[below + 1] - sorted[below])
}

#[cfg(test)]
mod tests {
    use super::super::tests::test_set;
    use super::*;
    use float_cmp::assert_approx_eq;
    use ndarray::{array, Array3, Zip};

    #[test]
    fn percentiles_interpolate_between_ranks() {
        let sorted = vec![0.0, 1.0, 2.0, 3.0, 4.0];

        assert_approx_eq!(Float, percentile(&sorted, 0.0), 0.0);
        assert_approx_eq!(Float, percentile(&sorted, 50.0), 2.0);
        assert_approx_eq!(Float, percentile(&sorted, 100.0), 4.0);
        assert_approx_eq!(Float, percentile(&sorted, 62.5), 2.5);
    }

    #[test]
    fn envelope_is_ordered_at_every_step() {
        let profile = spread(&test_set(), "air_potential_temperature").unwrap();

        Zip::from(&profile.p05)
            .and(&profile.p25)
            .and(&profile.median)
            .and(&profile.p75)
            .and(&profile.p95)
            .for_each(|&p05, &p25, &median, &p75, &p95| {
                assert!(p05 <= p25);
                assert!(p25 <= median);
                assert!(median <= p75);
                assert!(p75 <= p95);
            });
    }

    #[test]
    fn mean_and_median_of_known_values() {
        let profile = spread(&test_set(), "air_potential_temperature").unwrap();

        // values at the first step are 300, 295 and 320
        assert_approx_eq!(Float, profile.mean[0], 305.0, epsilon = 1e-12);
        assert_approx_eq!(Float, profile.median[0], 300.0);
        assert_eq!(profile.count, 3);
        assert_eq!(profile.times, array![0.0, 6.0, 12.0]);
    }

    #[test]
    fn single_trajectory_collapses_the_envelope() {
        let times = array![0.0, 6.0];
        let variables = vec!["air_pressure".to_string()];
        let data = Array3::from_shape_vec((1, 2, 1), vec![90000.0, 85000.0]).unwrap();

        let set = TrajectorySet::new(times, variables, data).unwrap();
        let profile = spread(&set, "air_pressure").unwrap();

        assert_approx_eq!(Float, profile.p05[0], 90000.0);
        assert_approx_eq!(Float, profile.p95[1], 85000.0);
        assert_approx_eq!(Float, profile.median[1], 85000.0);
    }

    #[test]
    fn empty_set_is_an_error() {
        let times = array![0.0];
        let variables = vec!["air_pressure".to_string()];
        let data = Array3::zeros((0, 1, 1));

        let set = TrajectorySet::new(times, variables, data).unwrap();

        assert!(matches!(
            spread(&set, "air_pressure"),
            Err(TrajectoryError::EmptySet(_))
        ));
    }
}
