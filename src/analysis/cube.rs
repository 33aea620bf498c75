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

//! Module with the tagged-array data model shared by all diagnostics.
//!
//! A [`Cube`] is a multi-dimensional array annotated with a name,
//! physical units and named coordinate axes. Coordinates optionally
//! carry per-point bounds (used for grid-box boundaries). Rotated-grid
//! cubes additionally carry two-dimensional auxiliary coordinates with
//! the true geographic location of each gridpoint.

use crate::errors::{GridError, InputError};
use crate::Float;
use float_cmp::approx_eq;
use ndarray::{Array1, Array2, ArrayD, Axis};

/// A named coordinate axis describing one dimension of a cube.
#[derive(Clone, PartialEq, Debug)]
pub struct Coord {
    pub name: String,
    pub units: String,

    /// Index of the data dimension this coordinate describes.
    pub dim: usize,

    /// Coordinate value at each gridpoint along the dimension.
    pub points: Array1<Float>,

    /// _(Optional)_ Lower and upper cell boundary per gridpoint.
    pub bounds: Option<Array2<Float>>,
}

impl Coord {
    /// Checks that every cell's bounds and consecutive cells
    /// are strictly increasing.
    pub fn bounds_are_increasing(&self) -> bool {
        match &self.bounds {
            Some(bounds) => {
                let cells_ok = bounds
                    .axis_iter(Axis(0))
                    .all(|cell| cell[0] < cell[1]);
                let order_ok = bounds
                    .axis_iter(Axis(0))
                    .zip(bounds.axis_iter(Axis(0)).skip(1))
                    .all(|(lower, upper)| lower[1] <= upper[0]);

                cells_ok && order_ok
            }
            None => false,
        }
    }
}

/// A two-dimensional auxiliary coordinate, one value per gridpoint
/// of the two data dimensions it spans.
#[derive(Clone, PartialEq, Debug)]
pub struct AuxCoord {
    pub name: String,
    pub units: String,

    /// Data dimensions the rows and columns of `values` run along.
    pub dims: (usize, usize),

    pub values: Array2<Float>,
}

/// A numeric array tagged with a name, units and coordinate axes.
#[derive(Clone, PartialEq, Debug)]
pub struct Cube {
    pub name: String,
    pub units: String,
    pub data: ArrayD<Float>,
    pub coords: Vec<Coord>,
    pub aux_coords: Vec<AuxCoord>,
}

impl Cube {
    /// Cube constructor checking that every coordinate is consistent
    /// in shape with the data array.
    pub fn new(
        name: String,
        units: String,
        data: ArrayD<Float>,
        coords: Vec<Coord>,
    ) -> Result<Self, InputError> {
        for coord in &coords {
            if coord.dim >= data.ndim() {
                return Err(InputError::ShapeMismatch(
                    "Coordinate refers to a dimension the data does not have",
                ));
            }

            if coord.points.len() != data.shape()[coord.dim] {
                return Err(InputError::ShapeMismatch(
                    "Coordinate length differs from the data dimension it describes",
                ));
            }

            if let Some(bounds) = &coord.bounds {
                if bounds.shape() != [coord.points.len(), 2] {
                    return Err(InputError::ShapeMismatch(
                        "Coordinate bounds are not two per gridpoint",
                    ));
                }
            }
        }

        Ok(Cube {
            name,
            units,
            data,
            coords,
            aux_coords: vec![],
        })
    }

    /// Looks up a coordinate by name.
    pub fn coord(&self, name: &'static str) -> Result<&Coord, GridError> {
        self.coords
            .iter()
            .find(|coord| coord.name == name)
            .ok_or(GridError::MissingCoord(name))
    }

    /// Looks up a coordinate by name, falling back to the rotated-grid
    /// name when the geographic one is absent.
    ///
    /// Limited-area model output names its horizontal coordinates
    /// `grid_longitude`/`grid_latitude`, so every consumer of
    /// geographic coordinates has to try both spellings.
    pub fn coord_with_fallback(
        &self,
        name: &'static str,
        fallback: &'static str,
    ) -> Result<&Coord, GridError> {
        match self.coord(name) {
            Ok(coord) => Ok(coord),
            Err(GridError::MissingCoord(_)) => {
                self.coords
                    .iter()
                    .find(|coord| coord.name == fallback)
                    .ok_or(GridError::MissingCoord(name))
            }
            Err(err) => Err(err),
        }
    }

    /// Slices out the single level where the named coordinate
    /// approximately equals the requested value.
    pub fn extract_level(
        &self,
        coord_name: &'static str,
        value: Float,
    ) -> Result<Cube, GridError> {
        let coord = self.coord(coord_name)?;
        let dim = coord.dim;

        let index = coord
            .points
            .iter()
            .position(|&point| approx_eq!(Float, point, value, epsilon = 1e-6))
            .ok_or(GridError::OutOfBounds(
                "Requested level is not present in the coordinate",
            ))?;

        let data = self.data.index_axis(Axis(dim), index).to_owned();

        // coordinates on the removed dimension are dropped,
        // the remaining ones shift down past it
        let coords = self
            .coords
            .iter()
            .filter(|coord| coord.dim != dim)
            .map(|coord| {
                let mut coord = coord.clone();
                if coord.dim > dim {
                    coord.dim -= 1;
                }
                coord
            })
            .collect();

        Cube::new(self.name.clone(), self.units.clone(), data, coords)
            .map_err(|_| GridError::OutOfBounds("Level extraction produced inconsistent shapes"))
    }
}

/// A small container of cubes selected by variable name.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct CubeList {
    cubes: Vec<Cube>,
}

impl CubeList {
    pub fn push(&mut self, cube: Cube) {
        self.cubes.push(cube);
    }

    /// Finds the cube with the given name.
    pub fn extract(&self, name: &str) -> Option<&Cube> {
        self.cubes.iter().find(|cube| cube.name == name)
    }
}
