//! 2-D FFT convolution of the coarse radiance grid with the scatter
//! kernel.
//!
//! A direct convolution of the global coarse grid (~5 M pixels) with a
//! 33×33 kernel is on the order of 5·10⁹ multiply-adds; going through the
//! Fourier domain cuts that by two orders of magnitude. The implementation
//! is strictly sequential so results are bit-for-bit reproducible.

use ndarray::Array2;
use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Convolves `grid` with `kernel` and returns a result of the same shape
/// as `grid` (scipy's "same" mode), clamped to non-negative.
pub fn fft_convolve_same(grid: &Array2<f32>, kernel: &Array2<f32>) -> Array2<f32> {
	let (gh, gw) = grid.dim();
	let (kh, kw) = kernel.dim();

	// Full linear-convolution size; zero padding prevents wrap-around.
	let fh = gh + kh - 1;
	let fw = gw + kw - 1;

	let mut planner = FftPlanner::<f32>::new();
	let row_fwd = planner.plan_fft_forward(fw);
	let col_fwd = planner.plan_fft_forward(fh);
	let row_inv = planner.plan_fft_inverse(fw);
	let col_inv = planner.plan_fft_inverse(fh);

	let mut a = pad_complex(grid, fh, fw);
	let mut b = pad_complex(kernel, fh, fw);
	fft_2d(&mut a, fh, fw, &row_fwd, &col_fwd);
	fft_2d(&mut b, fh, fw, &row_fwd, &col_fwd);

	for (x, y) in a.iter_mut().zip(&b) {
		*x *= *y;
	}
	drop(b);

	fft_2d(&mut a, fh, fw, &row_inv, &col_inv);

	// rustfft leaves the transform unnormalised; the round trip picks up a
	// factor of fh·fw.
	let norm = 1.0 / (fh * fw) as f32;

	// "Same" output: the centered gh×gw window of the full convolution.
	let off_r = (kh - 1) / 2;
	let off_c = (kw - 1) / 2;
	Array2::from_shape_fn((gh, gw), |(r, c)| {
		let value = a[(r + off_r) * fw + (c + off_c)].re * norm;
		value.max(0.0)
	})
}

fn pad_complex(matrix: &Array2<f32>, fh: usize, fw: usize) -> Vec<Complex<f32>> {
	let mut padded = vec![Complex::new(0.0, 0.0); fh * fw];
	for ((r, c), &value) in matrix.indexed_iter() {
		padded[r * fw + c].re = value;
	}
	padded
}

/// In-place 2-D FFT by row passes and a transposed row pass for columns.
fn fft_2d(
	data: &mut Vec<Complex<f32>>,
	rows: usize,
	cols: usize,
	row_fft: &Arc<dyn Fft<f32>>,
	col_fft: &Arc<dyn Fft<f32>>,
) {
	// One call transforms every contiguous `cols`-sized chunk, i.e. all rows.
	row_fft.process(data);

	let mut transposed = transpose(data, rows, cols);
	col_fft.process(&mut transposed);
	*data = transpose(&transposed, cols, rows);
}

fn transpose(data: &[Complex<f32>], rows: usize, cols: usize) -> Vec<Complex<f32>> {
	let mut out = vec![Complex::new(0.0, 0.0); data.len()];
	for r in 0..rows {
		for c in 0..cols {
			out[c * rows + r] = data[r * cols + c];
		}
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_abs_diff_eq;
	use ndarray::arr2;

	/// Reference direct convolution in "same" mode.
	fn direct_convolve_same(grid: &Array2<f32>, kernel: &Array2<f32>) -> Array2<f32> {
		let (gh, gw) = grid.dim();
		let (kh, kw) = kernel.dim();
		let mut out = Array2::<f32>::zeros((gh, gw));
		for r in 0..gh {
			for c in 0..gw {
				let mut acc = 0.0f64;
				for i in 0..kh {
					for j in 0..kw {
						let rr = r as isize + i as isize - (kh as isize - 1) / 2;
						let cc = c as isize + j as isize - (kw as isize - 1) / 2;
						if rr >= 0 && cc >= 0 && (rr as usize) < gh && (cc as usize) < gw {
							// Convolution flips the kernel; ours are symmetric
							// but the reference stays general.
							let kv = kernel[[kh - 1 - i, kw - 1 - j]];
							acc += f64::from(grid[[rr as usize, cc as usize]]) * f64::from(kv);
						}
					}
				}
				out[[r, c]] = acc as f32;
			}
		}
		out
	}

	#[test]
	fn identity_kernel_preserves_grid() {
		let grid = arr2(&[
			[1.0f32, 2.0, 3.0],
			[4.0, 5.0, 6.0],
			[7.0, 8.0, 9.0],
		]);
		let kernel = arr2(&[[0.0f32, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.0]]);

		let out = fft_convolve_same(&grid, &kernel);
		for ((r, c), &value) in grid.indexed_iter() {
			assert_abs_diff_eq!(out[[r, c]], value, epsilon = 1e-4);
		}
	}

	#[test]
	fn single_point_spreads_by_kernel() {
		let mut grid = Array2::<f32>::zeros((9, 9));
		grid[[4, 4]] = 10.0;
		let kernel = arr2(&[[0.1f32, 0.2, 0.1], [0.2, 0.0, 0.2], [0.1, 0.2, 0.1]]);

		let out = fft_convolve_same(&grid, &kernel);
		assert_abs_diff_eq!(out[[4, 4]], 0.0, epsilon = 1e-4);
		assert_abs_diff_eq!(out[[4, 5]], 2.0, epsilon = 1e-4);
		assert_abs_diff_eq!(out[[3, 3]], 1.0, epsilon = 1e-4);
		assert_abs_diff_eq!(out[[4, 6]], 0.0, epsilon = 1e-4);
	}

	#[test]
	fn matches_direct_convolution() {
		// A non-square grid with awkward sizes and an asymmetric kernel.
		let grid = Array2::from_shape_fn((7, 11), |(r, c)| ((r * 13 + c * 7) % 5) as f32);
		let kernel = arr2(&[
			[0.0f32, 0.5, 0.0],
			[0.25, 1.0, 0.125],
			[0.0, 0.0625, 0.0],
		]);

		let expected = direct_convolve_same(&grid, &kernel);
		let out = fft_convolve_same(&grid, &kernel);
		for ((r, c), &value) in expected.indexed_iter() {
			assert_abs_diff_eq!(out[[r, c]], value, epsilon = 1e-3);
		}
	}

	#[test]
	fn output_is_non_negative() {
		let grid = arr2(&[[1.0f32, 0.0], [0.0, 1.0]]);
		// A kernel with negative lobes would push some outputs below zero.
		let kernel = arr2(&[[-1.0f32, 0.0, 0.0], [0.0, 0.1, 0.0], [0.0, 0.0, -1.0]]);

		let out = fft_convolve_same(&grid, &kernel);
		for &value in &out {
			assert!(value >= 0.0);
		}
	}
}
