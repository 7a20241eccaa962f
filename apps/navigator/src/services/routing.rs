// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Grid routing for locations without a usable mesh.

use wayfinder_core::{Point3, Rect2};
use wayfinder_floorplan::Polyline;
use wayfinder_grid::{GridKind, OccupancyGrid};

use crate::error::Result;

/// Free border around a layer boundary when rasterizing its walls, in meters
const WALL_MARGIN: f64 = 1.0;

/// Walls are drawn one cell thick on either side of the line
const WALL_SPREAD: usize = 1;

/// Rasterizes wall polylines into a grid covering `boundary`.
pub fn wall_grid(polylines: &[Polyline], boundary: Rect2, step: f64) -> Result<OccupancyGrid> {
    let mut grid = OccupancyGrid::new(boundary.expanded(WALL_MARGIN), step)?;
    for line in polylines {
        for (a, b) in line.segments() {
            grid.add_segment(
                &Point3::new(a[0], 0.0, a[1]),
                &Point3::new(b[0], 0.0, b[1]),
                WALL_SPREAD,
            );
        }
    }
    Ok(grid)
}

/// `wall - floor` over a frame covering both grids.
pub fn combine(wall: &OccupancyGrid, floor: &OccupancyGrid) -> Result<OccupancyGrid> {
    let frame = OccupancyGrid::new(wall.bounds().union(&floor.bounds()), wall.step())?;
    let wall = wall.resize_to(&frame)?;
    let floor = floor.resize_to(&frame)?;
    Ok(wall.subtract(&floor)?)
}

/// Path over whichever grids exist; `None` without grids or route.
pub fn grid_route(
    wall: Option<&OccupancyGrid>,
    floor: Option<&OccupancyGrid>,
    start: &Point3<f64>,
    end: &Point3<f64>,
    epsilon: f64,
) -> Result<Option<Vec<Point3<f64>>>> {
    Ok(match (wall, floor) {
        (Some(wall), Some(floor)) => combine(wall, floor)?.find_path(start, end, GridKind::Combined, epsilon),
        (Some(wall), None) => wall.find_path(start, end, GridKind::Wall, epsilon),
        (None, Some(floor)) => floor.find_path(start, end, GridKind::Floor, epsilon),
        (None, None) => None,
    })
}
