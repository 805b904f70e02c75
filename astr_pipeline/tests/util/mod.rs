//! Fixture helpers shared by the integration tests.

use anyhow::Result;
use flate2::write::GzEncoder;
use flate2::Compression;
use gdal::raster::Buffer;
use gdal::DriverManager;
use std::fs::File;
use std::path::Path;

/// Writes a square single-band `f32` GeoTIFF with the given sparse pixel
/// values (everything else zero) and affine transform.
pub fn write_raster(
	path: &Path,
	size: usize,
	pixels: &[(usize, usize, f32)],
	geo: [f64; 6],
) -> Result<()> {
	let driver = DriverManager::get_driver_by_name("GTiff")?;
	let mut dataset = driver.create_with_band_type::<f32, _>(path, size, size, 1)?;
	dataset.set_geo_transform(&geo)?;

	let mut data = vec![0.0f32; size * size];
	for &(row, col, value) in pixels {
		data[row * size + col] = value;
	}
	let mut buffer = Buffer::new((size, size), data);
	dataset.rasterband(1)?.write((0, 0), (size, size), &mut buffer)?;
	Ok(())
}

/// Gzips a file, as the VNL products are distributed.
#[allow(dead_code)]
pub fn gzip_file(src: &Path, dst: &Path) -> Result<()> {
	let mut input = File::open(src)?;
	let mut encoder = GzEncoder::new(File::create(dst)?, Compression::default());
	std::io::copy(&mut input, &mut encoder)?;
	encoder.finish()?;
	Ok(())
}

/// An affine transform that puts the center of pixel `(size/2, size/2)`
/// exactly at `(lat 0, lon 0)`, with `pixel_deg` degrees per pixel.
pub fn centered_geo(size: usize, pixel_deg: f64) -> [f64; 6] {
	let half = (size / 2) as f64 + 0.5;
	[
		-half * pixel_deg,
		pixel_deg,
		0.0,
		half * pixel_deg,
		0.0,
		-pixel_deg,
	]
}
