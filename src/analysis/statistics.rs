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

//! Module with gridpoint statistics between forecasts and
//! mass-weighted conditional averages.

use crate::analysis::cube::Cube;
use crate::errors::InputError;
use crate::Float;
use ndarray::{Array1, ArrayD, ArrayViewD, Axis, Zip};

/// Root-mean-square difference between a reference and a test
/// field over all gridpoints.
pub fn rms_error(reference: &Cube, forecast: &Cube) -> Result<Float, InputError> {
    check_same_shape(reference, forecast)?;

    let mut sum_of_squares = 0.0;

    Zip::from(&reference.data)
        .and(&forecast.data)
        .for_each(|&reference, &forecast| {
            sum_of_squares += (forecast - reference) * (forecast - reference);
        });

    Ok((sum_of_squares / reference.data.len() as Float).sqrt())
}

/// Mean difference (bias) between a reference and a test field
/// over all gridpoints.
pub fn mean_error(reference: &Cube, forecast: &Cube) -> Result<Float, InputError> {
    check_same_shape(reference, forecast)?;

    let mut sum = 0.0;

    Zip::from(&reference.data)
        .and(&forecast.data)
        .for_each(|&reference, &forecast| sum += forecast - reference);

    Ok(sum / reference.data.len() as Float)
}

/// Sample standard deviation across the leading (ensemble member)
/// axis of a field.
pub fn ensemble_std_dev(members: &ArrayViewD<Float>) -> Result<ArrayD<Float>, InputError> {
    let member_count = members.len_of(Axis(0));

    if member_count < 2 {
        return Err(InputError::DataNotSufficient(
            "Ensemble spread needs at least two members",
        ));
    }

    let mean = members.mean_axis(Axis(0)).ok_or(InputError::ShapeMismatch(
        "Ensemble field has no member axis",
    ))?;

    let mut variance: ArrayD<Float> = ArrayD::zeros(mean.raw_dim());

    for member in members.axis_iter(Axis(0)) {
        Zip::from(&mut variance)
            .and(&member)
            .and(&mean)
            .for_each(|variance, &member, &mean| {
                *variance += (member - mean) * (member - mean);
            });
    }

    variance.mapv_inplace(|sum| (sum / (member_count - 1) as Float).sqrt());

    Ok(variance)
}

/// Weighted mean of a variable within bins of a second field.
///
/// Gridpoints fall into the bin whose edges bracket their
/// `coordinate` value; each bin's result is the weighted mean of
/// `variable` over its gridpoints. Empty bins yield NaN rather
/// than an error so plots simply leave them out.
pub fn averaged_over(
    variable: &ArrayViewD<Float>,
    bin_edges: &Array1<Float>,
    coordinate: &ArrayViewD<Float>,
    weights: &ArrayViewD<Float>,
) -> Result<Array1<Float>, InputError> {
    if variable.shape() != coordinate.shape() || variable.shape() != weights.shape() {
        return Err(InputError::ShapeMismatch(
            "Binned averaging needs equally shaped variable, coordinate and weights",
        ));
    }

    if bin_edges.len() < 2 {
        return Err(InputError::DataNotSufficient(
            "Binned averaging needs at least one bin",
        ));
    }

    let bin_count = bin_edges.len() - 1;
    let mut weighted_sums = Array1::<Float>::zeros(bin_count);
    let mut weight_sums = Array1::<Float>::zeros(bin_count);

    Zip::from(variable)
        .and(coordinate)
        .and(weights)
        .for_each(|&value, &coordinate, &weight| {
            if let Some(bin) = locate_bin(bin_edges, coordinate) {
                weighted_sums[bin] += weight * value;
                weight_sums[bin] += weight;
            }
        });

    let means = Zip::from(&weighted_sums)
        .and(&weight_sums)
        .map_collect(|&weighted, &weight| {
            if weight > 0.0 {
                weighted / weight
            } else {
                Float::NAN
            }
        });

    Ok(means)
}

/// Centres of the configured bins, for plotting the binned means.
pub fn bin_centres(bin_edges: &Array1<Float>) -> Array1<Float> {
    Array1::from_shape_fn(bin_edges.len() - 1, |bin| {
        0.5 * (bin_edges[bin] + bin_edges[bin + 1])
    })
}

/// Index of the bin containing the value, with the last bin
/// closed on both sides.
fn locate_bin(bin_edges: &Array1<Float>, value: Float) -> Option<usize> {
    let bin_count = bin_edges.len() - 1;

    if value < bin_edges[0] || value > bin_edges[bin_count] {
        return None;
    }

    if value == bin_edges[bin_count] {
        return Some(bin_count - 1);
    }

    let mut lo = 0;
    let mut hi = bin_count;

    while lo + 1 < hi {
        let mid = (lo + hi) / 2;

        if value >= bin_edges[mid] {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    Some(lo)
}

fn check_same_shape(reference: &Cube, forecast: &Cube) -> Result<(), InputError> {
    if reference.data.shape() != forecast.data.shape() {
        return Err(InputError::ShapeMismatch(
            "Reference and forecast fields differ in shape",
        ));
    }

    if reference.data.is_empty() {
        return Err(InputError::DataNotSufficient(
            "Error statistics need at least one gridpoint",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::cube::Coord;
    use float_cmp::assert_approx_eq;
    use ndarray::{array, Array, Array1};

    fn scalar_cube(name: &str, values: Vec<Float>) -> Cube {
        let data = Array::from_shape_vec(vec![values.len()], values)
            .unwrap()
            .into_dyn();
        let coords = vec![Coord {
            name: "grid_longitude".to_string(),
            units: "degrees".to_string(),
            dim: 0,
            points: Array1::linspace(0.0, 1.0, data.len()),
            bounds: None,
        }];

        Cube::new(name.to_string(), "K".to_string(), data, coords).unwrap()
    }

    #[test]
    fn identical_fields_have_zero_errors() {
        let reference = scalar_cube("temperature", vec![280.0, 285.0, 290.0]);
        let forecast = reference.clone();

        assert_approx_eq!(Float, rms_error(&reference, &forecast).unwrap(), 0.0);
        assert_approx_eq!(Float, mean_error(&reference, &forecast).unwrap(), 0.0);
    }

    #[test]
    fn constant_bias_shows_in_both_statistics() {
        let reference = scalar_cube("temperature", vec![280.0, 285.0, 290.0]);
        let forecast = scalar_cube("temperature", vec![282.0, 287.0, 292.0]);

        assert_approx_eq!(Float, rms_error(&reference, &forecast).unwrap(), 2.0);
        assert_approx_eq!(Float, mean_error(&reference, &forecast).unwrap(), 2.0);
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let reference = scalar_cube("temperature", vec![280.0, 285.0]);
        let forecast = scalar_cube("temperature", vec![280.0, 285.0, 290.0]);

        assert!(matches!(
            rms_error(&reference, &forecast),
            Err(InputError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn identical_members_have_zero_spread() {
        let members = Array::from_shape_fn(vec![4, 3], |index| 280.0 + index[1] as Float);

        let spread = ensemble_std_dev(&members.view()).unwrap();

        assert_eq!(spread.shape(), [3]);
        for &value in spread.iter() {
            assert_approx_eq!(Float, value, 0.0);
        }
    }

    #[test]
    fn two_member_spread_matches_the_closed_form() {
        let members = array![[1.0, 2.0], [3.0, 6.0]].into_dyn();

        let spread = ensemble_std_dev(&members.view()).unwrap();

        // sample standard deviation of two values is
        // their half-difference times sqrt(2)
        assert_approx_eq!(Float, spread[[0]], 2.0_f64.sqrt(), epsilon = 1e-12);
        assert_approx_eq!(Float, spread[[1]], 2.0 * 2.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn binned_means_are_weighted() {
        let variable = array![1.0, 3.0, 10.0].into_dyn();
        let coordinate = array![0.5, 0.5, 1.5].into_dyn();
        let weights = array![1.0, 3.0, 2.0].into_dyn();
        let bin_edges = array![0.0, 1.0, 2.0, 3.0];

        let means = averaged_over(
            &variable.view(),
            &bin_edges,
            &coordinate.view(),
            &weights.view(),
        )
        .unwrap();

        assert_approx_eq!(Float, means[0], 2.5);
        assert_approx_eq!(Float, means[1], 10.0);
        assert!(means[2].is_nan());
    }

    #[test]
    fn values_on_the_top_edge_land_in_the_last_bin() {
        let variable = array![7.0].into_dyn();
        let coordinate = array![3.0].into_dyn();
        let weights = array![1.0].into_dyn();
        let bin_edges = array![0.0, 1.0, 2.0, 3.0];

        let means = averaged_over(
            &variable.view(),
            &bin_edges,
            &coordinate.view(),
            &weights.view(),
        )
        .unwrap();

        assert_approx_eq!(Float, means[2], 7.0);
    }

    #[test]
    fn bin_centres_sit_between_edges() {
        let centres = bin_centres(&array![0.0, 1.0, 2.0]);

        assert_eq!(centres, array![0.5, 1.5]);
    }
}
