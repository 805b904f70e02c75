//! The Garstang-style scatter point-spread function.

use super::ScatterConfig;
use ndarray::Array2;

/// Distance below which no scatter is applied; a cell does not scatter
/// into itself.
const SELF_SCATTER_KM: f64 = 0.5;

/// Builds the square scatter kernel at coarse-pixel resolution.
///
/// The kernel is computed in `f64` and cast to `f32` at the end to bound
/// precision loss in the tails. Radius is
/// `⌈max_radius_km / pixel_km⌉ + 1` pixels.
pub fn build_kernel(config: &ScatterConfig) -> Array2<f32> {
	let radius = (config.max_radius_km / config.pixel_km).ceil() as usize + 1;
	let size = 2 * radius + 1;

	let mut kernel = Array2::<f32>::zeros((size, size));
	for dy in 0..size {
		for dx in 0..size {
			let y_km = (dy as f64 - radius as f64) * config.pixel_km;
			let x_km = (dx as f64 - radius as f64) * config.pixel_km;
			let d = y_km.hypot(x_km);
			if d < SELF_SCATTER_KM || d > config.max_radius_km {
				continue;
			}
			let value = config.fraction * (-d / config.scale_km).exp()
				/ (1.0 + (d / config.d_ref_km).powf(config.power));
			kernel[[dy, dx]] = value as f32;
		}
	}
	kernel
}
