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

//! Module responsible for reading model output from NetCDF files
//! into the tagged-array data model.
//!
//! Only metadata handling lives here; the actual format parsing
//! is the `netcdf` crate's job.

use crate::analysis::cube::{Coord, Cube, CubeList};
use crate::analysis::trajectory::TrajectorySet;
use crate::errors::InputError;
use crate::Float;
use log::debug;
use ndarray::{Array1, Array2, Array3, ArrayD, IxDyn};
use std::path::{Path, PathBuf};

/// Loads one named variable from a NetCDF file as a cube,
/// together with the coordinates describing its dimensions.
pub fn load_cube(path: &Path, name: &str) -> Result<Cube, InputError> {
    debug!("Loading {:?} from {}", name, path.display());

    let file = netcdf::open(path)?;

    let variable = file
        .variable(name)
        .ok_or_else(|| InputError::MissingVariable(name.to_string(), path.to_path_buf()))?;

    let shape: Vec<usize> = variable
        .dimensions()
        .iter()
        .map(|dimension| dimension.len())
        .collect();

    let values: Vec<Float> = variable.get_values(..)?;
    let data = ArrayD::from_shape_vec(IxDyn(&shape), values)
        .map_err(|_| InputError::ShapeMismatch("Variable values do not fill its dimensions"))?;

    let units = attribute_string(&variable, "units").unwrap_or_else(|| "unknown".to_string());

    let mut coords = vec![];

    for (dim, dimension) in variable.dimensions().iter().enumerate() {
        let dimension_name = dimension.name().to_string();

        if let Some(coord) = read_coord(&file, &dimension_name, dim, dimension.len())? {
            coords.push(coord);
        }
    }

    Cube::new(name.to_string(), units, data, coords)
}

/// Loads the named variables, trying each file in turn for
/// every name.
pub fn load_cubes(paths: &[PathBuf], names: &[String]) -> Result<CubeList, InputError> {
    let mut cubes = CubeList::default();

    'names: for name in names {
        for path in paths {
            match load_cube(path, name) {
                Ok(cube) => {
                    cubes.push(cube);
                    continue 'names;
                }
                Err(InputError::MissingVariable(..)) => continue,
                Err(err) => return Err(err),
            }
        }

        return Err(InputError::MissingVariable(
            name.clone(),
            paths.last().cloned().unwrap_or_default(),
        ));
    }

    Ok(cubes)
}

/// Loads a trajectory set from a NetCDF trajectory file.
///
/// Every `[trajectory, time]` variable in the file becomes one
/// carried variable of the set; the `time` coordinate holds hours
/// since the forecast start.
pub fn load_trajectories(path: &Path) -> Result<TrajectorySet, InputError> {
    debug!("Loading trajectories from {}", path.display());

    let file = netcdf::open(path)?;

    let time_variable = file
        .variable("time")
        .ok_or_else(|| InputError::MissingVariable("time".to_string(), path.to_path_buf()))?;
    let times = Array1::from(time_variable.get_values::<Float, _>(..)?);

    let mut names = vec![];
    let mut columns = vec![];

    for variable in file.variables() {
        let dimension_names: Vec<String> = variable
            .dimensions()
            .iter()
            .map(|dimension| dimension.name().to_string())
            .collect();

        if dimension_names != ["trajectory", "time"] {
            continue;
        }

        let trajectory_count = variable.dimensions()[0].len();
        let values: Vec<Float> = variable.get_values(..)?;

        let column = Array2::from_shape_vec((trajectory_count, times.len()), values)
            .map_err(|_| InputError::ShapeMismatch("Trajectory variable does not fill its grid"))?;

        names.push(variable.name().to_string());
        columns.push(column);
    }

    if columns.is_empty() {
        return Err(InputError::DataNotSufficient(
            "Trajectory file carries no [trajectory, time] variables",
        ));
    }

    let mut data = Array3::zeros((columns[0].nrows(), times.len(), columns.len()));

    for (index, column) in columns.iter().enumerate() {
        if column.nrows() != data.shape()[0] {
            return Err(InputError::ShapeMismatch(
                "Trajectory variables disagree on the trajectory count",
            ));
        }

        data.slice_mut(ndarray::s![.., .., index]).assign(column);
    }

    TrajectorySet::new(times, names, data)
        .map_err(|_| InputError::ShapeMismatch("Trajectory file dimensions are inconsistent"))
}

/// Reads the coordinate variable describing a dimension, when the
/// file carries one, together with its optional cell bounds.
fn read_coord(
    file: &netcdf::File,
    name: &str,
    dim: usize,
    len: usize,
) -> Result<Option<Coord>, InputError> {
    let variable = match file.variable(name) {
        Some(variable) => variable,
        None => return Ok(None),
    };

    let points: Vec<Float> = variable.get_values(..)?;

    if points.len() != len {
        return Err(InputError::ShapeMismatch(
            "Coordinate variable does not span its dimension",
        ));
    }

    let bounds = match file.variable(&format!("{}_bnds", name)) {
        Some(bounds_variable) => {
            let values: Vec<Float> = bounds_variable.get_values(..)?;

            Some(Array2::from_shape_vec((len, 2), values).map_err(|_| {
                InputError::ShapeMismatch("Coordinate bounds are not two per gridpoint")
            })?)
        }
        None => None,
    };

    let units = attribute_string(&variable, "units").unwrap_or_else(|| "unknown".to_string());

    Ok(Some(Coord {
        name: name.to_string(),
        units,
        dim,
        points: Array1::from(points),
        bounds,
    }))
}

/// String value of a variable attribute, when present and textual.
fn attribute_string(variable: &netcdf::Variable, name: &str) -> Option<String> {
    match variable.attribute_value(name) {
        Some(Ok(netcdf::AttributeValue::Str(value))) => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::trajectory::Comparison;
    use float_cmp::assert_approx_eq;

    fn write_trajectory_file(path: &Path) {
        let mut file = netcdf::create(path).unwrap();

        file.add_dimension("trajectory", 2).unwrap();
        file.add_dimension("time", 3).unwrap();

        let mut time = file.add_variable::<Float>("time", &["time"]).unwrap();
        time.put_values(&[0.0, 6.0, 12.0], ..).unwrap();

        let mut pressure = file
            .add_variable::<Float>("air_pressure", &["trajectory", "time"])
            .unwrap();
        pressure
            .put_values(&[90000.0, 85000.0, 80000.0, 70000.0, 0.0, 0.0], ..)
            .unwrap();

        let mut theta = file
            .add_variable::<Float>("air_potential_temperature", &["trajectory", "time"])
            .unwrap();
        theta
            .put_values(&[295.0, 297.0, 300.0, 310.0, 320.0, 330.0], ..)
            .unwrap();
    }

    #[test]
    fn trajectory_file_loads_into_a_set() {
        let path = std::env::temp_dir().join("pvds_input_trajectories.nc");
        write_trajectory_file(&path);

        let set = load_trajectories(&path).unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.times().len(), 3);

        let pressure = set.variable("air_pressure").unwrap();
        assert_approx_eq!(Float, pressure[[0, 1]], 85000.0);

        // the second trajectory leaves the domain and gets dropped
        let kept = set.select("air_pressure", Comparison::Greater, 0.0).unwrap();
        assert_eq!(kept.len(), 1);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_variable_reports_name_and_file() {
        let path = std::env::temp_dir().join("pvds_input_missing.nc");
        write_trajectory_file(&path);

        let result = load_cube(&path, "relative_humidity");

        assert!(matches!(
            result,
            Err(InputError::MissingVariable(name, _)) if name == "relative_humidity"
        ));

        std::fs::remove_file(&path).ok();
    }
}
