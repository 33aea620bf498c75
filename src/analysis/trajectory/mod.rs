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

//! Module with the trajectory-set abstraction: a collection of
//! air-parcel paths over shared time steps, each path carrying
//! several physical variables per step.

pub mod spread;

use crate::errors::TrajectoryError;
use crate::Float;
use ndarray::{Array1, Array3, ArrayView2, Axis};
use serde::Deserialize;

/// Comparison operator of a trajectory filter predicate.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Deserialize)]
pub enum Comparison {
    #[serde(rename = ">")]
    Greater,

    #[serde(rename = ">=")]
    GreaterEqual,

    #[serde(rename = "<")]
    Less,

    #[serde(rename = "<=")]
    LessEqual,
}

impl Comparison {
    pub fn compare(&self, value: Float, threshold: Float) -> bool {
        match self {
            Comparison::Greater => value > threshold,
            Comparison::GreaterEqual => value >= threshold,
            Comparison::Less => value < threshold,
            Comparison::LessEqual => value <= threshold,
        }
    }
}

/// A set of trajectories sharing time steps and carried variables.
///
/// Data is stored as one `[trajectory, time, variable]` array so
/// per-variable slices stay contiguous views.
#[derive(Clone, PartialEq, Debug)]
pub struct TrajectorySet {
    times: Array1<Float>,
    variables: Vec<String>,
    data: Array3<Float>,
}

impl TrajectorySet {
    /// Trajectory set constructor checking that the time axis and
    /// variable names are consistent with the data shape.
    pub fn new(
        times: Array1<Float>,
        variables: Vec<String>,
        data: Array3<Float>,
    ) -> Result<Self, TrajectoryError> {
        if times.len() != data.len_of(Axis(1)) {
            return Err(TrajectoryError::ShapeMismatch(
                "Time axis differs from the data time dimension",
            ));
        }

        if variables.len() != data.len_of(Axis(2)) {
            return Err(TrajectoryError::ShapeMismatch(
                "Variable names differ from the data variable dimension",
            ));
        }

        Ok(TrajectorySet {
            times,
            variables,
            data,
        })
    }

    /// Number of trajectories in the set.
    pub fn len(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Trajectory times (hours since the forecast start).
    pub fn times(&self) -> &Array1<Float> {
        &self.times
    }

    /// The `[trajectory, time]` values of a named variable.
    pub fn variable(&self, name: &str) -> Result<ArrayView2<Float>, TrajectoryError> {
        let index = self
            .variables
            .iter()
            .position(|variable| variable == name)
            .ok_or_else(|| TrajectoryError::VariableNotFound(name.to_string()))?;

        Ok(self.data.index_axis(Axis(2), index))
    }

    /// Retains only the trajectories whose named variable satisfies
    /// the comparison at every time step.
    ///
    /// Filtering an already-filtered set with the same predicate
    /// returns an identical set.
    pub fn select(
        &self,
        name: &str,
        comparison: Comparison,
        threshold: Float,
    ) -> Result<TrajectorySet, TrajectoryError> {
        let values = self.variable(name)?;

        let keep: Vec<usize> = values
            .axis_iter(Axis(0))
            .enumerate()
            .filter(|(_, path)| {
                path.iter()
                    .all(|&value| comparison.compare(value, threshold))
            })
            .map(|(index, _)| index)
            .collect();

        let data = self.data.select(Axis(0), &keep);

        Ok(TrajectorySet {
            times: self.times.clone(),
            variables: self.variables.clone(),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// Three trajectories of two variables over three time steps.
    /// The third trajectory's pressure drops to zero when it
    /// leaves the domain.
    pub(super) fn test_set() -> TrajectorySet {
        let times = array![0.0, 6.0, 12.0];
        let variables = vec!["air_pressure".to_string(), "air_potential_temperature".to_string()];

        let data = array![
            [[85000.0, 300.0], [70000.0, 305.0], [50000.0, 310.0]],
            [[90000.0, 295.0], [85000.0, 296.0], [80000.0, 298.0]],
            [[40000.0, 320.0], [0.0, 330.0], [0.0, 335.0]],
        ];

        TrajectorySet::new(times, variables, data).unwrap()
    }

    #[test]
    fn unknown_variable_is_an_error() {
        let set = test_set();

        assert!(matches!(
            set.variable("relative_humidity"),
            Err(TrajectoryError::VariableNotFound(_))
        ));
    }

    #[test]
    fn select_drops_paths_leaving_the_domain() {
        let set = test_set();

        let kept = set.select("air_pressure", Comparison::Greater, 0.0).unwrap();

        assert_eq!(set.len(), 3);
        assert_eq!(kept.len(), 2);

        // the predicate must hold at every time step, so the path
        // that starts inside the domain is still dropped
        let theta = kept.variable("air_potential_temperature").unwrap();
        assert_eq!(theta[[0, 0]], 300.0);
        assert_eq!(theta[[1, 0]], 295.0);
    }

    #[test]
    fn select_is_idempotent() {
        let set = test_set();

        let once = set.select("air_pressure", Comparison::Greater, 0.0).unwrap();
        let twice = once.select("air_pressure", Comparison::Greater, 0.0).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let times = array![0.0, 6.0];
        let variables = vec!["air_pressure".to_string()];
        let data = Array3::zeros((2, 3, 1));

        assert!(matches!(
            TrajectorySet::new(times, variables, data),
            Err(TrajectoryError::ShapeMismatch(_))
        ));
    }
}
