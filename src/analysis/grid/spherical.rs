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

//! Low-level numeric routines on spherical-polar grids.
//!
//! The routines here work on bare coordinate arrays in radians;
//! deriving those arrays from cube metadata is the caller's job.

use crate::errors::GridError;
use crate::Float;
use ndarray::{Array1, Array2, Array3, Axis, Zip};

/// Per-cell volume of every grid box, from radial cell bounds and
/// angular gridpoint positions.
///
/// The radial part of each cell is the exact spherical-shell
/// integral `(r_hi^3 - r_lo^3) / 3`; the angular part uses the
/// midpoint rule with cell edges halfway between gridpoints.
///
/// Returns a `[radius, colatitude, longitude]`-shaped array.
pub fn cell_volumes(
    rho_bounds: &Array2<Float>,
    theta: &Array1<Float>,
    phi: &Array1<Float>,
) -> Result<Array3<Float>, GridError> {
    if theta.len() < 2 {
        return Err(GridError::TooFewPoints("longitude"));
    }

    if phi.len() < 2 {
        return Err(GridError::TooFewPoints("latitude"));
    }

    let radial: Array1<Float> = rho_bounds
        .axis_iter(Axis(0))
        .map(|cell| (cell[1].powi(3) - cell[0].powi(3)) / 3.0)
        .collect();

    let d_theta = midpoint_spacings(theta);
    let d_phi = midpoint_spacings(phi);

    let mut volumes = Array3::zeros((radial.len(), phi.len(), theta.len()));

    Zip::indexed(&mut volumes).for_each(|(k, j, i), volume| {
        *volume = radial[k] * phi[j].sin() * d_phi[j] * d_theta[i];
    });

    Ok(volumes)
}

/// Partial derivative of a 3-D field along one axis with respect to
/// the (possibly non-uniform) coordinate along that axis.
///
/// Centred differences over both neighbours in the interior,
/// second-order one-sided stencils at the edges.
pub fn derivative_along(
    field: &Array3<Float>,
    coords: &Array1<Float>,
    axis: Axis,
) -> Result<Array3<Float>, GridError> {
    let len = coords.len();

    if len < 3 {
        return Err(GridError::TooFewPoints("differentiated axis"));
    }

    if field.len_of(axis) != len {
        return Err(GridError::OutOfBounds(
            "coordinate length differs from the differentiated axis",
        ));
    }

    let mut derivative = Array3::zeros(field.raw_dim());

    for index in 0..len {
        let mut lane = derivative.index_axis_mut(axis, index);

        if index == 0 {
            let stencil = (-3.0 * &field.index_axis(axis, 0)
                + 4.0 * &field.index_axis(axis, 1)
                - &field.index_axis(axis, 2))
                / (coords[2] - coords[0]);
            lane.assign(&stencil);
        } else if index == len - 1 {
            let stencil = (3.0 * &field.index_axis(axis, len - 1)
                - 4.0 * &field.index_axis(axis, len - 2)
                + &field.index_axis(axis, len - 3))
                / (coords[len - 1] - coords[len - 3]);
            lane.assign(&stencil);
        } else {
            let stencil = (&field.index_axis(axis, index + 1)
                - &field.index_axis(axis, index - 1))
                / (coords[index + 1] - coords[index - 1]);
            lane.assign(&stencil);
        }
    }

    Ok(derivative)
}

/// Widths of cells whose edges sit halfway between gridpoints,
/// with the end cells closed by the first and last spacing.
fn midpoint_spacings(points: &Array1<Float>) -> Array1<Float> {
    let len = points.len();

    Array1::from_shape_fn(len, |index| {
        let width = if index == 0 {
            points[1] - points[0]
        } else if index == len - 1 {
            points[len - 1] - points[len - 2]
        } else {
            (points[index + 1] - points[index - 1]) / 2.0
        };

        width.abs()
    })
}
