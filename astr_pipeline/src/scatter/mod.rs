//! Atmospheric scatter enhancement.
//!
//! Bright areas raise the sky brightness of their surroundings (the "light
//! dome" seen from dark sites near cities). The enhancement works on a
//! coarse grid: the fine raster is average-pooled, convolved with a
//! Garstang-style point-spread function, and the resulting scattered-light
//! map is added back to every fine pixel during the enhanced scan.

mod convolve;
mod downsample;
mod kernel;

pub use convolve::fft_convolve_same;
pub use downsample::downsample;
pub use kernel::build_kernel;

use crate::raster::RasterReader;
use anyhow::Result;
use log::info;
use ndarray::Array2;

/// Parameters of the scatter model.
///
/// `scatter(d) = fraction · exp(−d/scale_km) / (1 + (d/d_ref_km)^power)`,
/// truncated below 0.5 km (no self-scatter) and beyond `max_radius_km`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterConfig {
	/// Fraction of radiance that scatters into neighbouring cells.
	pub fraction: f64,
	/// e-folding distance of the exponential decay, in km.
	pub scale_km: f64,
	/// Reference distance of the power-law falloff, in km.
	pub d_ref_km: f64,
	/// Exponent of the power-law falloff.
	pub power: f64,
	/// Hard truncation radius, in km.
	pub max_radius_km: f64,
	/// Edge length of one coarse pixel, in km.
	pub pixel_km: f64,
	/// Fine pixels per coarse pixel, per side.
	pub downsample: usize,
}

impl Default for ScatterConfig {
	fn default() -> Self {
		ScatterConfig {
			fraction: 0.12,
			scale_km: 20.0,
			d_ref_km: 10.0,
			power: 2.5,
			max_radius_km: 80.0,
			pixel_km: 5.55,
			downsample: 12,
		}
	}
}

/// The scattered-light map at coarse resolution, indexed by the enhanced
/// scan with a nearest-neighbour lookup.
pub struct ScatterMap {
	grid: Array2<f32>,
	downsample: usize,
}

impl ScatterMap {
	/// Builds the scatter map for a raster: downsample, build the PSF,
	/// convolve.
	pub fn build(reader: &mut RasterReader, config: &ScatterConfig) -> Result<ScatterMap> {
		let coarse = downsample(reader, config.downsample)?;
		info!(
			"downsampled {}x{} -> {}x{}",
			reader.width(),
			reader.height(),
			coarse.ncols(),
			coarse.nrows()
		);

		let kernel = build_kernel(config);
		info!(
			"scatter kernel {}x{} (fraction {}, scale {} km)",
			kernel.ncols(),
			kernel.nrows(),
			config.fraction,
			config.scale_km
		);

		let grid = fft_convolve_same(&coarse, &kernel);
		Ok(ScatterMap {
			grid,
			downsample: config.downsample,
		})
	}

	#[cfg(test)]
	pub(crate) fn from_grid(grid: Array2<f32>, downsample: usize) -> ScatterMap {
		ScatterMap { grid, downsample }
	}

	/// Scattered light at the fine pixel `(row, col)`: the value of the
	/// enclosing coarse cell, clamped to the grid edge.
	pub fn at_pixel(&self, row: usize, col: usize) -> f32 {
		let r = (row / self.downsample).min(self.grid.nrows() - 1);
		let c = (col / self.downsample).min(self.grid.ncols() - 1);
		self.grid[[r, c]]
	}
}
