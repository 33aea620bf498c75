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

//! Module deriving spherical-polar coordinates from cube metadata
//! and wrapping the low-level grid numerics with them.

use super::spherical;
use crate::analysis::cube::Cube;
use crate::constants::EARTH_RADIUS;
use crate::errors::GridError;
use crate::Float;
use ndarray::{Array1, Array2, Array3, Axis, Zip};

/// Spherical-polar coordinates of a cube's gridpoints:
/// radius from the Earth's centre, longitude and colatitude
/// in radians.
#[derive(Clone, PartialEq, Debug)]
pub struct PolarCoords {
    pub rho: Array1<Float>,
    pub theta: Array1<Float>,
    pub phi: Array1<Float>,
}

/// Derives spherical-polar coordinates from a cube on either a
/// geographic or a rotated grid.
pub fn polar_coords(cube: &Cube) -> Result<PolarCoords, GridError> {
    let rho = cube.coord("altitude")?.points.mapv(|alt| EARTH_RADIUS + alt);

    let theta = cube
        .coord_with_fallback("longitude", "grid_longitude")?
        .points
        .mapv(Float::to_radians);

    let phi = cube
        .coord_with_fallback("latitude", "grid_latitude")?
        .points
        .mapv(|lat| (90.0 - lat).to_radians());

    Ok(PolarCoords { rho, theta, phi })
}

/// Calculates the volume of every grid box of a cube, for
/// mass-weighted averaging.
///
/// The radial extent of each box comes from the altitude bounds,
/// which therefore must be present and monotonically increasing.
pub fn volume(cube: &Cube) -> Result<Array3<Float>, GridError> {
    let altitude = cube.coord("altitude")?;

    let bounds = altitude
        .bounds
        .as_ref()
        .ok_or(GridError::MissingBounds("altitude"))?;

    if !altitude.bounds_are_increasing() {
        return Err(GridError::NonMonotonicBounds("altitude"));
    }

    let rho_bounds = bounds.mapv(|alt| EARTH_RADIUS + alt);
    let coords = polar_coords(cube)?;

    // the per-cell array lines up with the field only for the
    // model output dimension order
    if cube.data.shape() != [coords.rho.len(), coords.phi.len(), coords.theta.len()] {
        return Err(GridError::OutOfBounds(
            "field dimensions must run altitude, latitude, longitude",
        ));
    }

    spherical::cell_volumes(&rho_bounds, &coords.theta, &coords.phi)
}

/// Calculates the magnitude of the vector gradient of a 3-D field
/// in spherical polar coordinates.
pub fn grad(cube: &Cube) -> Result<Array3<Float>, GridError> {
    let coords = polar_coords(cube)?;

    let field = cube
        .data
        .view()
        .into_dimensionality::<ndarray::Ix3>()
        .map_err(|_| GridError::OutOfBounds("gradient requires a 3-D field"))?
        .to_owned();

    let d_rho = spherical::derivative_along(&field, &coords.rho, Axis(0))?;
    let d_phi = spherical::derivative_along(&field, &coords.phi, Axis(1))?;
    let d_theta = spherical::derivative_along(&field, &coords.theta, Axis(2))?;

    let mut magnitude = Array3::zeros(field.raw_dim());

    Zip::indexed(&mut magnitude)
        .and(&d_rho)
        .and(&d_phi)
        .and(&d_theta)
        .for_each(|(k, j, _), magnitude, &d_rho, &d_phi, &d_theta| {
            let radial = d_rho;
            let meridional = d_phi / coords.rho[k];
            let zonal = d_theta / (coords.rho[k] * coords.phi[j].sin());

            *magnitude = (radial * radial + meridional * meridional + zonal * zonal).sqrt();
        });

    Ok(magnitude)
}

/// Heights of model levels in terrain-following coordinates.
///
/// Level heights decay quadratically from the orography `h` to the
/// configured flat level `k_flat`; levels above it are flat.
pub fn true_height(
    h: &Array2<Float>,
    level_heights: &Array1<Float>,
    k_flat: usize,
) -> Result<Array3<Float>, GridError> {
    let level_count = level_heights.len();

    if level_count < 2 {
        return Err(GridError::TooFewPoints("model levels"));
    }

    if k_flat >= level_count {
        return Err(GridError::OutOfBounds(
            "flat level index is past the level count",
        ));
    }

    let top = level_heights[level_count - 1];

    if !(top > 0.0) {
        return Err(GridError::NonMonotonicBounds("model levels"));
    }

    let eta = level_heights.mapv(|height| height / top);
    let eta_flat = eta[k_flat];

    let mut heights = Array3::zeros((level_count, h.nrows(), h.ncols()));

    for (level, mut layer) in heights.axis_iter_mut(Axis(0)).enumerate() {
        layer.fill(eta[level] * top);

        if level < k_flat {
            let decay = (1.0 - eta[level] / eta_flat).powi(2);
            layer += &h.mapv(|orography| orography * decay);
        }
    }

    Ok(heights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::cube::Coord;
    use float_cmp::assert_approx_eq;
    use ndarray::{array, Array};

    fn rotated_grid_cube() -> Cube {
        let data = Array::zeros(vec![3, 4, 5]).into_dyn();

        let coords = vec![
            Coord {
                name: "altitude".to_string(),
                units: "m".to_string(),
                dim: 0,
                points: array![100.0, 300.0, 500.0],
                bounds: Some(array![[0.0, 200.0], [200.0, 400.0], [400.0, 600.0]]),
            },
            Coord {
                name: "grid_latitude".to_string(),
                units: "degrees".to_string(),
                dim: 1,
                points: Array1::linspace(-5.0, 5.0, 4),
                bounds: None,
            },
            Coord {
                name: "grid_longitude".to_string(),
                units: "degrees".to_string(),
                dim: 2,
                points: Array1::linspace(350.0, 360.0, 5),
                bounds: None,
            },
        ];

        Cube::new(
            "air_density".to_string(),
            "kg m-3".to_string(),
            data,
            coords,
        )
        .unwrap()
    }

    #[test]
    fn polar_coords_fall_back_to_rotated_names() {
        let coords = polar_coords(&rotated_grid_cube()).unwrap();

        assert_approx_eq!(Float, coords.rho[0], EARTH_RADIUS + 100.0);
        assert_approx_eq!(Float, coords.theta[0], 350.0_f64.to_radians());
        // colatitude of the northernmost row
        assert_approx_eq!(Float, coords.phi[3], 85.0_f64.to_radians());
    }

    #[test]
    fn volume_is_positive_for_well_formed_bounds() {
        let volumes = volume(&rotated_grid_cube()).unwrap();

        assert_eq!(volumes.shape(), [3, 4, 5]);
        assert!(volumes.iter().all(|&volume| volume > 0.0));
    }

    #[test]
    fn volume_requires_increasing_bounds() {
        let mut cube = rotated_grid_cube();
        cube.coords[0].bounds = Some(array![[200.0, 0.0], [400.0, 200.0], [600.0, 400.0]]);

        assert!(matches!(
            volume(&cube),
            Err(GridError::NonMonotonicBounds("altitude"))
        ));

        cube.coords[0].bounds = None;
        assert!(matches!(
            volume(&cube),
            Err(GridError::MissingBounds("altitude"))
        ));
    }

    #[test]
    fn gradient_of_radial_field_matches_slope() {
        let mut cube = rotated_grid_cube();
        let rho = polar_coords(&cube).unwrap().rho;

        cube.data = Array::from_shape_fn(vec![3, 4, 5], |index| 2.0 * rho[index[0]]).into_dyn();

        let magnitude = grad(&cube).unwrap();

        for &value in magnitude.iter() {
            assert_approx_eq!(Float, value, 2.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn true_height_decays_orography_to_the_flat_level() {
        let orography = array![[250.0, 0.0], [125.0, 500.0]];
        let level_heights = array![0.0, 1000.0, 2000.0, 4000.0];

        let heights = true_height(&orography, &level_heights, 2).unwrap();

        // surface level carries the full orography
        assert_approx_eq!(Float, heights[[0, 0, 0]], 250.0);
        assert_approx_eq!(Float, heights[[0, 1, 1]], 500.0);

        // at and above the flat level terrain influence is gone
        assert_approx_eq!(Float, heights[[2, 0, 0]], 2000.0);
        assert_approx_eq!(Float, heights[[3, 1, 1]], 4000.0);

        // in between the perturbation decays quadratically
        let ratio: Float = 1.0 - 0.25 / 0.5;
        let expected = 1000.0 + 250.0 * ratio.powi(2);
        assert_approx_eq!(Float, heights[[1, 0, 0]], expected);
    }

    #[test]
    fn true_height_rejects_a_flat_level_past_the_top() {
        let orography = array![[250.0]];
        let level_heights = array![0.0, 1000.0];

        assert!(true_height(&orography, &level_heights, 2).is_err());
    }
}
