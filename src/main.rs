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

//! Potential Vorticity Diagnostics Suite (PVDS) is a set of
//! diagnostics for gridded output of limited-area weather models:
//! potential-vorticity tracer partitioning, trajectory spread
//! statistics and forecast-error comparisons.
//!
//! Each diagnostic loads model output, computes a derived field
//! or statistic and writes a static plot, a CSV table or a NetCDF
//! file. The suite runs top to bottom from a single configuration
//! file and exits.

mod analysis;
mod constants;
mod errors;

use cap::Cap;
use env_logger::Env;
use log::{error, info};
use std::alloc;
use std::process::ExitCode;

type Float = f64;

/// Global allocator used by the diagnostics.
///
/// Use of static global allocator allows for capping the memory to the limit set by user
/// in configuration file and in effect provide better [OOM error](https://en.wikipedia.org/wiki/Out_of_memory) handling.
#[global_allocator]
static ALLOCATOR: Cap<alloc::System> = Cap::new(alloc::System, usize::MAX);

/// The main program function.
/// Prepares the runtime environment and calls the [`analysis::main`].
///
/// To provide meaningful and high-quality error messages the `env_logger`
/// needs to be initiated before any log messages are possible to occur.
/// Furthermore, errors can occur also while outputs are written and they
/// also can be handled.
fn main() -> ExitCode {
    #[cfg(not(feature = "debug"))]
    let logger_env = Env::new().filter_or("PVDS_LOG_LEVEL", "info");

    #[cfg(feature = "debug")]
    let logger_env = Env::new().filter_or("PVDS_LOG_LEVEL", "debug");

    env_logger::Builder::from_env(logger_env)
        .format_timestamp_millis()
        .init();

    match analysis::main() {
        Ok(_) => {
            info!("Diagnostics finished. Check the output directory and log.");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("Diagnostics failed with error: {}", err);
            ExitCode::FAILURE
        }
    }
}
