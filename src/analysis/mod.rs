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

//! Module containing the actual diagnostics code.
//! Whole documentation of how the suite works is provided here.

mod configuration;
mod cube;
mod forecast;
mod grid;
mod input;
mod output;
mod plot;
mod statistics;
mod trajectory;

use self::configuration::{Config, ForecastErrors, PvDipole, TrajectorySpread};
use self::cube::Cube;
use self::forecast::Forecast;
use self::grid::RotatedPole;
use self::output::ErrorRecord;
use crate::{errors::AnalysisError, errors::InputError, ALLOCATOR};
use chrono::Duration;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use ndarray::Ix3;
use std::{fs, path::Path, path::PathBuf};

/// Main diagnostics function, responsible for all analysis steps.
///
/// It reads the provided configuration, builds the forecast
/// registry and then runs every configured diagnostic
/// sequentially, each one loading its data, computing its
/// derived quantity and writing its outputs.
pub fn main() -> Result<(), AnalysisError> {
    info!("Preparing the diagnostics core");

    let core = Core::new()?;

    prepare_output_dir(&core.config.job.output_dir)?;

    let forecast = Forecast::new_from_template(
        core.config.forecast.start,
        &core.config.job.data_dir,
        &core.config.forecast.file_stems,
        core.config.forecast.lead_hours,
    );

    if let Some(spread_config) = &core.config.trajectory_spread {
        info!("Running the trajectory spread diagnostic");
        trajectory_spread(&core.config, spread_config)?;
    }

    if let Some(errors_config) = &core.config.forecast_errors {
        info!("Running the forecast-error diagnostic");
        forecast_errors(&core.config, errors_config)?;
    }

    if let Some(dipole_config) = &core.config.pv_dipole {
        info!("Running the PV dipole diagnostic");
        pv_dipole(&core.config, &forecast, dipole_config)?;
    }

    Ok(())
}

/// Structure containing suite parameters.
///
/// To run the diagnostics the suite needs to load and check the
/// configuration, which is then stored in this structure.
#[derive(Debug)]
pub struct Core {
    pub config: Config,
}

impl Core {
    /// Suite [`Core`] constructor.
    ///
    /// Before any diagnostic can start (and to run it safely),
    /// configuration provided by the user must be loaded
    /// and checked.
    pub fn new() -> Result<Self, AnalysisError> {
        debug!("Reading configuration from config.yaml");
        let config = Config::new_from_file(Path::new("config.yaml"))?;

        debug!("Setting memory limit");
        ALLOCATOR
            .set_limit(config.resources.memory * 1024 * 1024)
            .unwrap();

        Ok(Core { config })
    }
}

/// Checks that the output directory is absent or empty and
/// creates it when needed.
///
/// Diagnostics outputs are cheap to recompute but easy to mix up
/// between runs, so a non-empty directory is refused instead of
/// overwritten.
fn prepare_output_dir(out_path: &Path) -> Result<(), AnalysisError> {
    debug!("Checking and setting output directory");

    if out_path.is_dir() {
        if out_path.read_dir()?.next().is_none() {
            debug!("Output directory exists but is empty so continuing");
        } else {
            return Err(AnalysisError::FaultyOutput(
                "Output directory exists and is not empty",
            ));
        }
    } else {
        debug!("Output directory does not exist so creating a new one");
        fs::create_dir(out_path)?;
    }

    Ok(())
}

/// Runs the trajectory spread diagnostic: load the trajectory set,
/// drop the paths leaving the domain, compute the percentile
/// envelope of the chosen variable and write it as CSV and PNG.
fn trajectory_spread(
    config: &Config,
    spread_config: &TrajectorySpread,
) -> Result<(), AnalysisError> {
    let path = config.job.data_dir.join(&spread_config.file);

    let trajectories = input::load_trajectories(&path)?;
    info!("Loaded {} trajectories", trajectories.len());

    let filter = &spread_config.filter;
    let trajectories = trajectories.select(&filter.variable, filter.comparison, filter.threshold)?;
    info!("{} trajectories pass the filter", trajectories.len());

    let profile = trajectory::spread::spread(&trajectories, &spread_config.variable)?;

    let stem = format!(
        "{}_{}_spread_{}",
        config.job.name,
        spread_config
            .file
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("trajectories"),
        spread_config.variable
    );

    output::save_spread_profile(
        &profile,
        &config.job.output_dir.join(format!("{}.csv", stem)),
    )?;
    plot::spread_plot(
        &profile,
        &spread_config.variable,
        &config.job.output_dir.join(format!("{}.png", stem)),
    )?;

    Ok(())
}

/// Runs the forecast-error diagnostic: for every stored lead time
/// compare the test forecast against the reference run and collect
/// the error growth series.
fn forecast_errors(config: &Config, errors_config: &ForecastErrors) -> Result<(), AnalysisError> {
    let reference = Forecast::new_from_template(
        config.forecast.start,
        &config.job.data_dir,
        std::slice::from_ref(&errors_config.reference_stem),
        config.forecast.lead_hours,
    );
    let test = Forecast::new_from_template(
        config.forecast.start,
        &config.job.data_dir,
        std::slice::from_ref(&errors_config.test_stem),
        config.forecast.lead_hours,
    );

    let lead_times = reference.lead_times();

    let progress = ProgressBar::new(lead_times.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{prefix} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
            .progress_chars("#>-"),
    );
    progress.set_prefix("Compared lead times");

    let mut records: Vec<ErrorRecord> = Vec::with_capacity(lead_times.len());
    let mut last_difference: Option<Cube> = None;

    for lead_time in &lead_times {
        let reference_path = &reference.set_lead_time(*lead_time)?[0];
        let test_path = &test.set_lead_time(*lead_time)?[0];

        let mut reference_cube = input::load_cube(reference_path, &errors_config.variable)?;
        let mut test_cube = input::load_cube(test_path, &errors_config.variable)?;

        if let Some(pressure) = errors_config.pressure {
            reference_cube = reference_cube.extract_level("pressure", pressure)?;
            test_cube = test_cube.extract_level("pressure", pressure)?;
        }

        records.push(ErrorRecord {
            lead_hours: lead_time.num_hours(),
            rms_error: statistics::rms_error(&reference_cube, &test_cube)?,
            mean_error: statistics::mean_error(&reference_cube, &test_cube)?,
        });

        if errors_config.save_difference && Some(lead_time) == lead_times.last() {
            last_difference = Some(difference_cube(&reference_cube, &test_cube)?);
        }

        progress.inc(1);
    }

    progress.finish_with_message("All lead times compared");

    output::save_error_series(
        &records,
        &config.job.output_dir.join(format!(
            "{}_{}_errors.csv",
            config.job.name, errors_config.variable
        )),
    )?;

    if let Some(mut difference) = last_difference {
        if let Some(grid_config) = &config.grid {
            let pole = RotatedPole::new(grid_config.pole_lon, grid_config.pole_lat)?;
            grid::attach_true_coords(&mut difference, &pole)?;
        }

        output::save_cube(
            &difference,
            &config.job.output_dir.join(format!(
                "{}_{}_difference.nc",
                config.job.name, errors_config.variable
            )),
        )?;
    }

    if let Some(ensemble_file) = &errors_config.ensemble_file {
        let spread = ensemble_spread_cube(
            &config.job.data_dir.join(ensemble_file),
            &errors_config.variable,
        )?;

        output::save_cube(
            &spread,
            &config.job.output_dir.join(format!(
                "{}_{}_ensemble_spread.nc",
                config.job.name, errors_config.variable
            )),
        )?;
    }

    Ok(())
}

/// Standard deviation across the members of an ensemble file,
/// as a cube without the member dimension.
fn ensemble_spread_cube(path: &Path, variable: &str) -> Result<Cube, AnalysisError> {
    let ensemble = input::load_cube(path, variable)?;

    let spread = statistics::ensemble_std_dev(&ensemble.data.view())?;

    // the member dimension is gone, remaining coordinates
    // shift down past it
    let coords = ensemble
        .coords
        .iter()
        .filter(|coord| coord.dim != 0)
        .map(|coord| {
            let mut coord = coord.clone();
            coord.dim -= 1;
            coord
        })
        .collect();

    Ok(Cube::new(
        format!("{}_ensemble_spread", variable),
        ensemble.units.clone(),
        spread,
        coords,
    )?)
}

/// Runs the PV dipole diagnostic: mass-weighted means of the PV
/// tracers in bins of advection-only PV at one lead time.
fn pv_dipole(
    config: &Config,
    forecast: &Forecast,
    dipole_config: &PvDipole,
) -> Result<(), AnalysisError> {
    let files = forecast.set_lead_time(Duration::hours(dipole_config.lead_hours))?;

    let mut names = vec![
        dipole_config.density.clone(),
        dipole_config.coordinate.clone(),
    ];
    names.extend(
        dipole_config
            .tracers
            .iter()
            .map(|tracer| tracer.variable.clone()),
    );

    let cubes = input::load_cubes(files, &names)?;

    let density = extract(&cubes, &dipole_config.density, files)?;
    let coordinate = extract(&cubes, &dipole_config.coordinate, files)?;

    // grid-box mass weights the averages towards the denser
    // lower troposphere
    let volumes = grid::volume(density)?;
    let density_values = density
        .data
        .view()
        .into_dimensionality::<Ix3>()
        .map_err(|_| InputError::ShapeMismatch("Density field must be three-dimensional"))?;
    let mass = (&volumes * &density_values).into_dyn();

    let edges = dipole_config.bins.edges();

    let mut curves = Vec::with_capacity(dipole_config.tracers.len());

    for tracer in &dipole_config.tracers {
        let tracer_cube = extract(&cubes, &tracer.variable, files)?;

        let means = statistics::averaged_over(
            &tracer_cube.data.view(),
            &edges,
            &coordinate.data.view(),
            &mass.view(),
        )?;

        curves.push((tracer.label.clone(), means));
    }

    let centres = statistics::bin_centres(&edges);

    let stem = format!("{}_dipole", config.job.name);

    output::save_dipole(
        &centres,
        &curves,
        &config.job.output_dir.join(format!("{}.csv", stem)),
    )?;
    plot::dipole_plot(
        &centres,
        &curves,
        &dipole_config.coordinate,
        &config.job.output_dir.join(format!("{}.png", stem)),
    )?;

    Ok(())
}

/// Difference field (test minus reference) keeping the test
/// cube's metadata.
fn difference_cube(reference: &Cube, test: &Cube) -> Result<Cube, InputError> {
    Cube::new(
        format!("{}_difference", test.name),
        test.units.clone(),
        &test.data - &reference.data,
        test.coords.clone(),
    )
}

fn extract<'a>(
    cubes: &'a cube::CubeList,
    name: &str,
    files: &[PathBuf],
) -> Result<&'a Cube, InputError> {
    cubes.extract(name).ok_or_else(|| {
        InputError::MissingVariable(
            name.to_string(),
            files.last().cloned().unwrap_or_default(),
        )
    })
}
