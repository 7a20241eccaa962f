// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Diagnostic raster previews

use std::path::Path;

use image::{Rgb, RgbImage};

use crate::error::Result;
use crate::grid::OccupancyGrid;

impl OccupancyGrid {
    /// One pixel per cell, +Z up.
    ///
    /// Positive weights shade green, negative weights (subtracted grids)
    /// shade red, zero is black.
    pub fn to_image(&self) -> RgbImage {
        let (w, h) = (self.width() as u32, self.height() as u32);
        RgbImage::from_fn(w, h, |x, y| {
            let row = (h - 1 - y) as usize;
            let weight = self.get(x as usize, row).clamp(-1.0, 1.0);
            let level = (weight.abs() * 255.0).round() as u8;
            if weight >= 0.0 {
                Rgb([0, level, 0])
            } else {
                Rgb([level, 0, 0])
            }
        })
    }

    /// Saves [`OccupancyGrid::to_image`] as PNG.
    pub fn save_png(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.to_image().save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }
}
