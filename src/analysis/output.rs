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

//! Module writing derived results to CSV tables and NetCDF files.

use crate::analysis::cube::Cube;
use crate::analysis::trajectory::spread::SpreadProfile;
use crate::errors::OutputError;
use crate::Float;
use ndarray::Array1;
use serde::Serialize;
use std::path::Path;

/// One row of the forecast-error growth table.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Serialize)]
pub struct ErrorRecord {
    pub lead_hours: i64,
    pub rms_error: Float,
    pub mean_error: Float,
}

#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Serialize)]
struct SpreadRecord {
    time: Float,
    mean: Float,
    median: Float,
    p05: Float,
    p25: Float,
    p75: Float,
    p95: Float,
}

/// Writes the spread envelope of a trajectory variable to CSV.
pub fn save_spread_profile(profile: &SpreadProfile, path: &Path) -> Result<(), OutputError> {
    let mut out_file = csv::Writer::from_path(path)?;

    out_file.write_record(["Time", "Mean", "Median", "P05", "P25", "P75", "P95"])?;

    for step in 0..profile.times.len() {
        out_file.serialize(SpreadRecord {
            time: profile.times[step],
            mean: profile.mean[step],
            median: profile.median[step],
            p05: profile.p05[step],
            p25: profile.p25[step],
            p75: profile.p75[step],
            p95: profile.p95[step],
        })?;
    }

    out_file.flush()?;

    Ok(())
}

/// Writes the error growth series of a compared forecast to CSV.
pub fn save_error_series(records: &[ErrorRecord], path: &Path) -> Result<(), OutputError> {
    let mut out_file = csv::Writer::from_path(path)?;

    out_file.write_record(["LeadTimeHours", "RmsError", "MeanError"])?;

    for record in records {
        out_file.serialize(record)?;
    }

    out_file.flush()?;

    Ok(())
}

/// Writes the binned tracer means of the dipole diagnostic to CSV,
/// one column per tracer.
pub fn save_dipole(
    centres: &Array1<Float>,
    curves: &[(String, Array1<Float>)],
    path: &Path,
) -> Result<(), OutputError> {
    let mut out_file = csv::Writer::from_path(path)?;

    let mut header = vec!["BinCentre".to_string()];
    header.extend(curves.iter().map(|(label, _)| label.clone()));
    out_file.write_record(&header)?;

    for (bin, &centre) in centres.iter().enumerate() {
        let mut row = vec![centre.to_string()];
        row.extend(curves.iter().map(|(_, means)| means[bin].to_string()));
        out_file.write_record(&row)?;
    }

    out_file.flush()?;

    Ok(())
}

/// Writes a cube with its coordinates, bounds and auxiliary
/// coordinates to a NetCDF file.
pub fn save_cube(cube: &Cube, path: &Path) -> Result<(), OutputError> {
    let mut file = netcdf::create(path)?;

    file.add_attribute("source", "Potential Vorticity Diagnostics Suite (PVDS)")?;
    file.add_attribute("Conventions", "CF-1.6")?;

    // dimensions without a coordinate get positional names
    let dim_names: Vec<String> = (0..cube.data.ndim())
        .map(|dim| {
            cube.coords
                .iter()
                .find(|coord| coord.dim == dim)
                .map(|coord| coord.name.clone())
                .unwrap_or_else(|| format!("dim{}", dim))
        })
        .collect();

    for (dim, name) in dim_names.iter().enumerate() {
        file.add_dimension(name, cube.data.shape()[dim])?;
    }

    let has_bounds = cube.coords.iter().any(|coord| coord.bounds.is_some());
    if has_bounds {
        file.add_dimension("bnds", 2)?;
    }

    for coord in &cube.coords {
        let dim_name = dim_names[coord.dim].as_str();

        let mut coord_variable = file.add_variable::<Float>(&coord.name, &[dim_name])?;
        coord_variable.put_values(coord.points.as_slice().unwrap(), ..)?;
        coord_variable.put_attribute("units", coord.units.as_str())?;

        if let Some(bounds) = &coord.bounds {
            let bounds_name = format!("{}_bnds", coord.name);
            let mut bounds_variable =
                file.add_variable::<Float>(&bounds_name, &[dim_name, "bnds"])?;

            let bounds = bounds.as_standard_layout();
            bounds_variable.put_values(bounds.as_slice().unwrap(), ..)?;
        }
    }

    for aux_coord in &cube.aux_coords {
        let aux_dims = [
            dim_names[aux_coord.dims.0].as_str(),
            dim_names[aux_coord.dims.1].as_str(),
        ];

        let mut aux_variable = file.add_variable::<Float>(&aux_coord.name, &aux_dims)?;

        let values = aux_coord.values.as_standard_layout();
        aux_variable.put_values(values.as_slice().unwrap(), ..)?;
        aux_variable.put_attribute("units", aux_coord.units.as_str())?;
    }

    let data_dims: Vec<&str> = dim_names.iter().map(String::as_str).collect();
    let mut data_variable = file.add_variable::<Float>(&cube.name, &data_dims)?;

    let data = cube.data.as_standard_layout();
    data_variable.put_values(data.as_slice().unwrap(), ..)?;
    data_variable.put_attribute("units", cube.units.as_str())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::cube::Coord;
    use crate::analysis::input;
    use float_cmp::assert_approx_eq;
    use ndarray::{array, Array};

    #[test]
    fn saved_cube_loads_back_with_its_metadata() {
        let data = Array::from_shape_fn(vec![2, 3], |index| (index[0] * 3 + index[1]) as Float)
            .into_dyn();
        let coords = vec![
            Coord {
                name: "altitude".to_string(),
                units: "m".to_string(),
                dim: 0,
                points: array![100.0, 300.0],
                bounds: Some(array![[0.0, 200.0], [200.0, 400.0]]),
            },
            Coord {
                name: "grid_longitude".to_string(),
                units: "degrees".to_string(),
                dim: 1,
                points: array![350.0, 355.0, 360.0],
                bounds: None,
            },
        ];
        let cube = Cube::new(
            "ertel_potential_vorticity".to_string(),
            "PVU".to_string(),
            data,
            coords,
        )
        .unwrap();

        let path = std::env::temp_dir().join("pvds_output_roundtrip.nc");
        save_cube(&cube, &path).unwrap();

        let loaded = input::load_cube(&path, "ertel_potential_vorticity").unwrap();

        assert_eq!(loaded.units, "PVU");
        assert_eq!(loaded.data.shape(), [2, 3]);
        assert_approx_eq!(Float, loaded.data[[1, 2]], 5.0);

        let altitude = loaded.coord("altitude").unwrap();
        assert_eq!(altitude.units, "m");
        assert!(altitude.bounds_are_increasing());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn error_series_has_one_row_per_lead_time() {
        let records = vec![
            ErrorRecord {
                lead_hours: 1,
                rms_error: 0.5,
                mean_error: -0.1,
            },
            ErrorRecord {
                lead_hours: 2,
                rms_error: 0.9,
                mean_error: -0.2,
            },
        ];

        let path = std::env::temp_dir().join("pvds_output_errors.csv");
        save_error_series(&records, &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "LeadTimeHours,RmsError,MeanError");
        assert!(lines[1].starts_with("1,"));

        std::fs::remove_file(&path).ok();
    }
}
