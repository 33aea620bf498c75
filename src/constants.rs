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

//! Module containing constants used by the diagnostics.

use crate::Float;

///Spherical Earth radius (m) used by the model grid
pub const EARTH_RADIUS: Float = 6_378_100.0;

///Magnitude below which the rotated-longitude denominator
///counts as zero at the coordinate-system pole
pub const POLE_DEGENERACY_LIMIT: Float = 1e-30;

///Magnitude of `cos(latitude)` below which a gridpoint counts
///as lying on the geographic pole during unrotation
pub const COLATITUDE_LIMIT: Float = 1e-5;
