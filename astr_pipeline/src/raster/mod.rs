//! Windowed access to the VNL source raster.
//!
//! [`RasterReader`] wraps a GDAL dataset and presents the one interface the
//! scan phases need: "read window → 2-D radiance matrix". Gzipped rasters
//! (`*.tif.gz`) are opened through GDAL's `/vsigzip/` virtual filesystem,
//! which keeps window reads random-access over the compressed stream.

mod transform;

pub use transform::PixelTransform;

use anyhow::{ensure, Context, Result};
use gdal::Dataset;
use log::{debug, trace};
use ndarray::Array2;
use std::path::Path;

/// GDAL block-cache cap in megabytes. The vsigzip decoder and the GTiff
/// block cache both live under this budget.
const GDAL_CACHE_MB: &str = "256";

/// A closeable, re-openable window reader over a single-band radiance
/// GeoTIFF.
///
/// The scan phases close and re-open the reader every few dozen strips to
/// force GDAL to release decoder buffers; [`RasterReader::read_window`]
/// transparently re-opens a closed reader.
pub struct RasterReader {
	dataset: Option<Dataset>,
	gdal_path: String,
	width: usize,
	height: usize,
	transform: PixelTransform,
}

impl RasterReader {
	/// Opens a radiance raster.
	///
	/// # Errors
	/// Returns an error if the file does not exist, is not a single-band
	/// raster, or carries no affine transform.
	pub fn open(path: &Path) -> Result<RasterReader> {
		ensure!(path.exists(), "raster {path:?} does not exist");
		let path = path.canonicalize()?;

		gdal::config::set_config_option("GDAL_CACHEMAX", GDAL_CACHE_MB)?;

		let gdal_path = if path.extension().is_some_and(|ext| ext == "gz") {
			format!("/vsigzip/{}", path.display())
		} else {
			path.display().to_string()
		};

		trace!("open raster {gdal_path}");
		let dataset = Dataset::open(&gdal_path)
			.with_context(|| format!("failed to open raster {gdal_path}"))?;
		ensure!(
			dataset.raster_count() == 1,
			"expected a single-band raster, {gdal_path} has {} bands",
			dataset.raster_count()
		);

		let (width, height) = dataset.raster_size();
		let transform = PixelTransform::new(dataset.geo_transform()?);
		debug!("raster {gdal_path}: {width}x{height}, transform {transform:?}");

		Ok(RasterReader {
			dataset: Some(dataset),
			gdal_path,
			width,
			height,
			transform,
		})
	}

	/// Raster width in pixels.
	pub fn width(&self) -> usize {
		self.width
	}

	/// Raster height in pixels.
	pub fn height(&self) -> usize {
		self.height
	}

	/// The affine pixel→(lon, lat) transform.
	pub fn transform(&self) -> &PixelTransform {
		&self.transform
	}

	/// Reads a window of radiance values in row-major order.
	///
	/// Negative source values denote no-data and are coerced to zero.
	///
	/// # Errors
	/// Returns an error if the window falls outside the raster or the
	/// underlying read fails (a gzip decoder with exhausted buffers
	/// surfaces here; the caller recovers by [`RasterReader::reopen`]).
	pub fn read_window(
		&mut self,
		col_off: usize,
		row_off: usize,
		width: usize,
		height: usize,
	) -> Result<Array2<f32>> {
		ensure!(
			col_off + width <= self.width && row_off + height <= self.height,
			"window {width}x{height}+{col_off}+{row_off} exceeds raster {}x{}",
			self.width,
			self.height
		);

		let buffer = self
			.ensure_open()?
			.rasterband(1)?
			.read_as::<f32>(
				(col_off as isize, row_off as isize),
				(width, height),
				(width, height),
				None,
			)
			.with_context(|| format!("window read {width}x{height}+{col_off}+{row_off} failed"))?;

		let (_shape, mut data) = buffer.into_shape_and_vec();
		for value in &mut data {
			if *value < 0.0 || value.is_nan() {
				*value = 0.0;
			}
		}
		Ok(Array2::from_shape_vec((height, width), data)?)
	}

	/// Drops the GDAL dataset, releasing decoder buffers and block cache.
	pub fn close(&mut self) {
		trace!("close raster {}", self.gdal_path);
		self.dataset = None;
	}

	/// Closes and immediately re-opens the dataset.
	pub fn reopen(&mut self) -> Result<()> {
		self.close();
		self.ensure_open()?;
		Ok(())
	}

	fn ensure_open(&mut self) -> Result<&Dataset> {
		if self.dataset.is_none() {
			trace!("reopen raster {}", self.gdal_path);
			let dataset = Dataset::open(&self.gdal_path)
				.with_context(|| format!("failed to reopen raster {}", self.gdal_path))?;
			self.dataset = Some(dataset);
		}
		Ok(self.dataset.as_ref().unwrap())
	}
}

impl std::fmt::Debug for RasterReader {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RasterReader")
			.field("path", &self.gdal_path)
			.field("size", &(self.width, self.height))
			.field("open", &self.dataset.is_some())
			.finish()
	}
}
