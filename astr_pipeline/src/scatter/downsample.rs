//! Average-pooling of the fine raster onto the coarse scatter grid.

use crate::raster::RasterReader;
use anyhow::{ensure, Result};
use log::debug;
use ndarray::{Array2, ArrayView2};

/// Coarse rows pooled per read batch; 20 coarse rows keeps each window
/// around 240 fine rows at the default factor.
const BATCH_COARSE_ROWS: usize = 20;

/// Average-pools the raster by `factor` per side.
///
/// Trailing rows and columns that do not fill a complete `factor×factor`
/// block are discarded. The result (~20 MB for a global raster at
/// factor 12) is held entirely in memory.
pub fn downsample(reader: &mut RasterReader, factor: usize) -> Result<Array2<f32>> {
	ensure!(factor > 0, "downsample factor must be positive");
	let coarse_h = reader.height() / factor;
	let coarse_w = reader.width() / factor;
	ensure!(
		coarse_h > 0 && coarse_w > 0,
		"raster {}x{} too small for downsample factor {factor}",
		reader.width(),
		reader.height()
	);

	let mut coarse = Array2::<f32>::zeros((coarse_h, coarse_w));
	let mut coarse_row = 0;
	while coarse_row < coarse_h {
		let rows = BATCH_COARSE_ROWS.min(coarse_h - coarse_row);
		let batch = reader.read_window(
			0,
			coarse_row * factor,
			coarse_w * factor,
			rows * factor,
		)?;
		pool_batch(&batch.view(), factor, &mut coarse, coarse_row);
		coarse_row += rows;
	}

	debug!("downsample: {coarse_h}x{coarse_w} coarse grid");
	Ok(coarse)
}

/// Pools one batch of fine rows into `coarse`, starting at `coarse_row`.
/// The batch height and width must be multiples of `factor`.
fn pool_batch(batch: &ArrayView2<f32>, factor: usize, coarse: &mut Array2<f32>, coarse_row: usize) {
	let scale = 1.0 / (factor * factor) as f32;
	for (i, block) in batch.exact_chunks((factor, factor)).into_iter().enumerate() {
		let row = coarse_row + i / coarse.ncols();
		let col = i % coarse.ncols();
		coarse[[row, col]] = block.sum() * scale;
	}
}
