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

use chrono::NaiveDateTime;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Error while reading config.yaml: {0}")]
    Config(#[from] ConfigError),

    #[error("Error while reading input data: {0}")]
    Input(#[from] InputError),

    #[error("Error while slicing forecast: {0}")]
    Forecast(#[from] ForecastError),

    #[error("Error in grid computation: {0}")]
    Grid(#[from] GridError),

    #[error("Error in trajectory computation: {0}")]
    Trajectory(#[from] TrajectoryError),

    #[error("Error while writing output: {0}")]
    Output(#[from] OutputError),

    #[error("Output directory is not usable: {0}")]
    FaultyOutput(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot open config.yaml: {0}")]
    CantOpenFile(#[from] std::io::Error),

    #[error("Cannot deserialize config.yaml: {0}")]
    CantDeserialize(#[from] serde_yaml::Error),

    #[error("Configuration component is out of bounds: {0}")]
    OutOfBounds(&'static str),
}

#[derive(Error, Debug)]
pub enum InputError {
    #[error("Cannot read NetCDF data: {0}")]
    NetCdf(#[from] netcdf::Error),

    #[error("Variable {0:?} not present in {1}")]
    MissingVariable(String, PathBuf),

    #[error("Input data is not sufficient: {0}")]
    DataNotSufficient(&'static str),

    #[error("Input data shapes do not match: {0}")]
    ShapeMismatch(&'static str),
}

#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("No forecast files stored for valid time {0}")]
    LeadTimeNotFound(NaiveDateTime),
}

#[derive(Error, Debug)]
pub enum GridError {
    #[error("Cube has no {0:?} coordinate (nor a rotated-grid equivalent)")]
    MissingCoord(&'static str),

    #[error("Coordinate {0:?} carries no bounds")]
    MissingBounds(&'static str),

    #[error("Bounds of coordinate {0:?} are not monotonically increasing")]
    NonMonotonicBounds(&'static str),

    #[error("Too few gridpoints along {0:?} for a finite-difference stencil")]
    TooFewPoints(&'static str),

    #[error("Coordinate value is out of grid bounds: {0}")]
    OutOfBounds(&'static str),
}

#[derive(Error, Debug)]
pub enum TrajectoryError {
    #[error("Trajectory set carries no variable {0:?}")]
    VariableNotFound(String),

    #[error("Trajectory set is empty: {0}")]
    EmptySet(&'static str),

    #[error("Trajectory data shapes do not match: {0}")]
    ShapeMismatch(&'static str),
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Cannot write NetCDF output: {0}")]
    NetCdf(#[from] netcdf::Error),

    #[error("Cannot write CSV output: {0}")]
    Csv(#[from] csv::Error),

    #[error("Cannot render plot: {0}")]
    Plot(String),

    #[error("IO error while writing output: {0}")]
    Io(#[from] std::io::Error),
}
