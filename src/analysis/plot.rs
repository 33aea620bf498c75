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

//! Module rendering the diagnostic plots to PNG files.

use crate::analysis::trajectory::spread::SpreadProfile;
use crate::errors::OutputError;
use crate::Float;
use ndarray::Array1;
use plotters::prelude::*;
use std::path::Path;

const PLOT_SIZE: (u32, u32) = (900, 600);

const LIGHT_GREY: RGBColor = RGBColor(211, 211, 211);
const GREY: RGBColor = RGBColor(128, 128, 128);

/// Renders the trajectory spread plot: shaded 5-95 and 25-75
/// percentile bands with the mean and median drawn on top.
pub fn spread_plot(
    profile: &SpreadProfile,
    variable: &str,
    path: &Path,
) -> Result<(), OutputError> {
    let root = BitMapBackend::new(path, PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let x_range = axis_range(&profile.times, 0.0)?;
    let y_range = {
        let low = finite_min(profile.p05.iter().copied())?;
        let high = finite_max(profile.p95.iter().copied())?;
        let pad = 0.05 * (high - low).max(Float::EPSILON);

        (low - pad)..(high + pad)
    };

    let mut chart = ChartBuilder::on(&root)
        .caption(variable.replace('_', " "), ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .x_desc("Time (hours)")
        .y_desc(variable.replace('_', " "))
        .draw()
        .map_err(plot_error)?;

    chart
        .draw_series(std::iter::once(Polygon::new(
            band(&profile.times, &profile.p05, &profile.p95),
            &LIGHT_GREY,
        )))
        .map_err(plot_error)?;

    chart
        .draw_series(std::iter::once(Polygon::new(
            band(&profile.times, &profile.p25, &profile.p75),
            &GREY,
        )))
        .map_err(plot_error)?;

    chart
        .draw_series(LineSeries::new(series(&profile.times, &profile.mean), &WHITE))
        .map_err(plot_error)?;

    chart
        .draw_series(LineSeries::new(series(&profile.times, &profile.median), &BLACK))
        .map_err(plot_error)?;

    root.draw(&Text::new(
        format!("{} Trajectories", profile.count),
        (630, 560),
        ("sans-serif", 16).into_font(),
    ))
    .map_err(plot_error)?;

    root.present().map_err(plot_error)?;

    Ok(())
}

/// Renders the dipole curves: binned tracer means against the
/// binning coordinate, one labelled line per tracer.
pub fn dipole_plot(
    centres: &Array1<Float>,
    curves: &[(String, Array1<Float>)],
    coordinate: &str,
    path: &Path,
) -> Result<(), OutputError> {
    let root = BitMapBackend::new(path, PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let x_range = axis_range(centres, 0.0)?;
    let y_range = {
        let values = curves
            .iter()
            .flat_map(|(_, means)| means.iter().copied());

        let low = finite_min(values.clone())?;
        let high = finite_max(values)?;
        let pad = 0.05 * (high - low).max(Float::EPSILON);

        (low - pad)..(high + pad)
    };

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .x_desc(coordinate.replace('_', " "))
        .y_desc("Mass-weighted mean")
        .draw()
        .map_err(plot_error)?;

    for (index, (label, means)) in curves.iter().enumerate() {
        let color = Palette99::pick(index).to_rgba();

        // empty bins hold NaN and are left out of the line
        let points: Vec<(Float, Float)> = centres
            .iter()
            .zip(means.iter())
            .filter(|(_, mean)| mean.is_finite())
            .map(|(&centre, &mean)| (centre, mean))
            .collect();

        chart
            .draw_series(LineSeries::new(points, &color))
            .map_err(plot_error)?
            .label(label.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
    }

    chart
        .configure_series_labels()
        .border_style(&BLACK)
        .background_style(&WHITE.mix(0.8))
        .draw()
        .map_err(plot_error)?;

    root.present().map_err(plot_error)?;

    Ok(())
}

fn series<'a>(
    x: &'a Array1<Float>,
    y: &'a Array1<Float>,
) -> impl Iterator<Item = (Float, Float)> + 'a {
    x.iter().zip(y.iter()).map(|(&x, &y)| (x, y))
}

/// Closed outline of the area between a lower and an upper curve.
fn band(
    x: &Array1<Float>,
    lower: &Array1<Float>,
    upper: &Array1<Float>,
) -> Vec<(Float, Float)> {
    let mut outline: Vec<(Float, Float)> = series(x, upper).collect();
    outline.extend(series(x, lower).collect::<Vec<_>>().into_iter().rev());

    outline
}

fn axis_range(points: &Array1<Float>, pad: Float) -> Result<std::ops::Range<Float>, OutputError> {
    let low = finite_min(points.iter().copied())?;
    let high = finite_max(points.iter().copied())?;

    if low == high {
        return Ok((low - 0.5)..(high + 0.5));
    }

    Ok((low - pad)..(high + pad))
}

fn finite_min(values: impl Iterator<Item = Float>) -> Result<Float, OutputError> {
    values
        .filter(|value| value.is_finite())
        .min_by(Float::total_cmp)
        .ok_or_else(|| OutputError::Plot("no finite values to plot".to_string()))
}

fn finite_max(values: impl Iterator<Item = Float>) -> Result<Float, OutputError> {
    values
        .filter(|value| value.is_finite())
        .max_by(Float::total_cmp)
        .ok_or_else(|| OutputError::Plot("no finite values to plot".to_string()))
}

fn plot_error(err: impl std::fmt::Display) -> OutputError {
    OutputError::Plot(err.to_string())
}
