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

//! Module with methods to do computations of the rotated-pole
//! coordinate system used by limited-area model grids.
//! Closely follows the transformation equations in the UM
//! documentation paper on horizontal grids.

use crate::analysis::cube::{AuxCoord, Cube};
use crate::constants::{COLATITUDE_LIMIT, POLE_DEGENERACY_LIMIT};
use crate::errors::GridError;
use crate::Float;
use ndarray::{Array1, Array2, Zip};
use std::f64::consts::PI;

/// Front-facing struct of the rotated-pole coordinate system,
/// defined by the location of the synthetic pole.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug)]
pub struct RotatedPole {
    pole_lon: Float,
    pole_lat: Float,
}

impl RotatedPole {
    /// Rotated-pole system constructor from the pole location
    /// in degrees.
    pub fn new(pole_lon: Float, pole_lat: Float) -> Result<Self, GridError> {
        if !pole_lon.is_finite() || !pole_lat.is_finite() {
            return Err(GridError::OutOfBounds("pole location is not finite"));
        }

        if !(-90.0..=90.0).contains(&pole_lat) || !(-180.0..360.0).contains(&pole_lon) {
            return Err(GridError::OutOfBounds("pole location out of bounds"));
        }

        Ok(RotatedPole { pole_lon, pole_lat })
    }

    /// Function to transform one geographic coordinate pair (degrees)
    /// into the rotated system.
    ///
    /// At the coordinate-system pole the longitude equation
    /// degenerates, so the rotated longitude is pinned to
    /// 0, 90 or -90 degrees by the sign of the numerator
    /// instead of evaluating `atan2` there.
    pub fn rotate(&self, lon: Float, lat: Float) -> (Float, Float) {
        let pole_lon = self.pole_lon.to_radians();
        let pole_lat = self.pole_lat.to_radians();

        let sin_phi_pole = pole_lat.sin();
        let cos_phi_pole = pole_lat.cos();

        let mut x = lon.to_radians();
        let y = lat.to_radians();

        // wrap past the antimeridian
        if x > PI {
            x -= 2.0 * PI;
        }

        let rot_lat = (cos_phi_pole * y.cos() * (x - pole_lon).cos()
            + sin_phi_pole * y.sin())
        .clamp(-1.0, 1.0)
        .asin()
        .to_degrees();

        let arg1 = -(x - pole_lon).sin() * y.cos();
        let arg2 = -sin_phi_pole * y.cos() * (x - pole_lon).cos() + cos_phi_pole * y.sin();

        let rot_lon = if arg2.abs() < POLE_DEGENERACY_LIMIT {
            if arg1.abs() < POLE_DEGENERACY_LIMIT {
                0.0
            } else if arg1 > 0.0 {
                90.0
            } else {
                -90.0
            }
        } else {
            arg1.atan2(arg2).to_degrees()
        };

        (rot_lon, rot_lat)
    }

    /// Function to compute the actual geographic coordinates of
    /// rotated gridpoints, for 1-D arrays of rotated longitudes
    /// and latitudes (degrees) spanning the grid.
    ///
    /// Model grids store rotated longitudes in a range wrapped
    /// around the 360 meridian; which side of it a gridpoint
    /// started on fixes the sign of the output longitude.
    ///
    /// Returns `[rotated-longitude, rotated-latitude]`-shaped
    /// arrays of true longitudes and latitudes.
    pub fn unrotate(
        &self,
        lons: &Array1<Float>,
        lats: &Array1<Float>,
    ) -> (Array2<Float>, Array2<Float>) {
        let pole_lat = self.pole_lat.to_radians();

        // a pole in the southern hemisphere flips both factors
        let (sin_phi_pole, cos_phi_pole) = if self.pole_lat >= 0.0 {
            (pole_lat.sin(), pole_lat.cos())
        } else {
            (-pole_lat.sin(), -pole_lat.cos())
        };

        let x = lons.mapv(Float::to_radians);
        let y = lats.mapv(Float::to_radians);

        let sign = x.mapv(|x| (x - 2.0 * PI).signum());

        // scale between +/- pi
        let x = x.mapv(|x| (x + PI).rem_euclid(2.0 * PI) - PI);

        let cos_x = x.mapv(Float::cos);
        let cos_y = y.mapv(Float::cos);
        let sin_y = y.mapv(Float::sin);

        let mut true_lons = Array2::zeros((lons.len(), lats.len()));
        let mut true_lats = Array2::zeros((lons.len(), lats.len()));

        Zip::indexed(&mut true_lons)
            .and(&mut true_lats)
            .for_each(|(i, j), true_lon, true_lat| {
                let arg =
                    (cos_x[i] * cos_y[j] * cos_phi_pole + sin_y[j] * sin_phi_pole).clamp(-1.0, 1.0);
                let a_phi = arg.asin();
                *true_lat = a_phi.to_degrees();

                let term1 = cos_x[i] * cos_y[j] * sin_phi_pole - sin_y[j] * cos_phi_pole;
                let term2 = a_phi.cos();

                // gridpoints on the geographic pole have no
                // well-defined longitude
                let a_lambda = if term2.abs() < COLATITUDE_LIMIT {
                    0.0
                } else {
                    (term1 / term2).clamp(-1.0, 1.0).acos().to_degrees() * sign[i]
                };

                *true_lon = a_lambda + self.pole_lon - 180.0;
            });

        (true_lons, true_lats)
    }
}

/// Attaches true geographic coordinates to a cube sitting on a
/// rotated grid.
///
/// Cubes without both rotated-grid coordinates are passed through
/// untouched, so the call is safe on fields already carrying
/// geographic coordinates.
pub fn attach_true_coords(cube: &mut Cube, pole: &RotatedPole) -> Result<(), GridError> {
    let (lon_dim, lon_points, lat_dim, lat_points) = {
        let (lon_coord, lat_coord) =
            match (cube.coord("grid_longitude"), cube.coord("grid_latitude")) {
                (Ok(lon_coord), Ok(lat_coord)) => (lon_coord, lat_coord),
                _ => return Ok(()),
            };

        (
            lon_coord.dim,
            lon_coord.points.clone(),
            lat_coord.dim,
            lat_coord.points.clone(),
        )
    };

    let (true_lons, true_lats) = pole.unrotate(&lon_points, &lat_points);

    // unrotation produces [lon, lat] arrays while the data runs
    // [.., lat, lon], hence the transpose
    cube.aux_coords.push(AuxCoord {
        name: "longitude".to_string(),
        units: "degrees_east".to_string(),
        dims: (lat_dim, lon_dim),
        values: true_lons.reversed_axes(),
    });
    cube.aux_coords.push(AuxCoord {
        name: "latitude".to_string(),
        units: "degrees_north".to_string(),
        dims: (lat_dim, lon_dim),
        values: true_lats.reversed_axes(),
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use ndarray::array;

    /// Smallest absolute difference between two longitudes,
    /// ignoring full revolutions.
    fn lon_distance(a: Float, b: Float) -> Float {
        let diff = (a - b).rem_euclid(360.0);

        diff.min(360.0 - diff)
    }

    #[test]
    fn unrotate_inverts_rotate_away_from_singularities() {
        let pole = RotatedPole::new(177.5, 37.5).unwrap();

        for &lon in &[-120.0, -60.5, -10.0, 0.0, 25.0, 90.0, 179.0] {
            for &lat in &[-75.0, -30.0, 0.0, 20.5, 45.0, 80.0] {
                let (rot_lon, rot_lat) = pole.rotate(lon, lat);

                // grid files store rotated longitudes wrapped
                // around the 360 meridian
                let (true_lons, true_lats) =
                    pole.unrotate(&array![rot_lon + 360.0], &array![rot_lat]);

                assert_approx_eq!(Float, true_lats[[0, 0]], lat, epsilon = 1e-9);
                assert!(
                    lon_distance(true_lons[[0, 0]], lon) < 1e-9,
                    "lon {} roundtripped to {}",
                    lon,
                    true_lons[[0, 0]]
                );
            }
        }
    }

    #[test]
    fn southern_pole_unrotates_the_antipodal_convention() {
        // a grid defined about a southern pole stores its
        // coordinates in the antipodal rotated system: longitudes
        // shifted half a revolution, latitudes negated
        let pole = RotatedPole::new(10.0, -25.0).unwrap();

        let (rot_lon, rot_lat) = pole.rotate(40.0, -50.0);
        let (true_lons, true_lats) = pole.unrotate(&array![rot_lon + 180.0], &array![-rot_lat]);

        assert_approx_eq!(Float, true_lats[[0, 0]], -50.0, epsilon = 1e-9);
        assert!(lon_distance(true_lons[[0, 0]], 40.0) < 1e-9);
    }

    #[test]
    fn rotating_the_pole_itself_pins_longitude_to_zero() {
        let pole = RotatedPole::new(145.0, 52.0).unwrap();

        let (rot_lon, rot_lat) = pole.rotate(145.0, 52.0);

        assert!(rot_lon == 0.0);
        assert_approx_eq!(Float, rot_lat, 90.0, epsilon = 1e-9);
    }

    #[test]
    fn degenerate_longitude_follows_the_sign_rule() {
        // equatorial pole keeps the denominator exactly zero
        // along the equator
        let pole = RotatedPole::new(0.0, 0.0).unwrap();

        let (east, _) = pole.rotate(-90.0, 0.0);
        let (west, _) = pole.rotate(90.0, 0.0);

        assert!(east == 90.0);
        assert!(west == -90.0);
        assert!(!east.is_nan() && !west.is_nan());
    }

    #[test]
    fn unrotate_covers_a_grid_in_one_pass() {
        let pole = RotatedPole::new(177.5, 37.5).unwrap();

        let lons = Array1::linspace(330.0, 420.0, 10);
        let lats = Array1::linspace(-20.0, 20.0, 9);

        let (true_lons, true_lats) = pole.unrotate(&lons, &lats);

        assert_eq!(true_lons.shape(), [10, 9]);
        assert_eq!(true_lats.shape(), [10, 9]);
        assert!(true_lons.iter().all(|lon| lon.is_finite()));
        assert!(true_lats.iter().all(|lat| lat.is_finite() && lat.abs() <= 90.0));
    }

    #[test]
    fn out_of_bounds_pole_is_rejected() {
        assert!(RotatedPole::new(0.0, 91.0).is_err());
        assert!(RotatedPole::new(Float::NAN, 0.0).is_err());
    }
}
