//! Strip-by-strip traversal of the fine raster.
//!
//! Both passes share one scanner. The baseline pass projects every lit
//! pixel onto the H3 grid; the enhanced pass additionally adds the
//! interpolated scattered-light value to each pixel before thresholding.
//! Each strip's upserts commit atomically together with the strip's
//! progress row, so an aborted run resumes exactly where it stopped.

use crate::accumulator::Accumulator;
use crate::raster::RasterReader;
use crate::scatter::ScatterMap;
use anyhow::{Context, Result};
use astr_core::zone::ZONE2_RADIANCE;
use h3o::{LatLng, Resolution};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use ndarray::Array2;

/// Latitude band kept by the pipeline; H3 covers the poles but the VNL
/// product does not, and extreme latitudes distort the equirectangular
/// pixels beyond usefulness.
const MAX_ABS_LATITUDE: f64 = 85.0;

/// Traversal tuning. Strips of 200 rows bound per-strip memory to
/// ~34 MB at the global raster width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanConfig {
	/// Rows per strip.
	pub strip_rows: usize,
	/// Radiance floor below which a whole strip (or pixel) is skipped
	/// without projection.
	pub min_radiance: f32,
	/// Close and re-open the raster every this many strips to flush
	/// decoder buffers.
	pub reopen_interval: usize,
}

impl Default for ScanConfig {
	fn default() -> Self {
		ScanConfig {
			strip_rows: 200,
			min_radiance: 0.1,
			reopen_interval: 25,
		}
	}
}

/// What a scan pass did, for logging and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
	pub strips_processed: u64,
	pub strips_skipped: u64,
	pub pixels_upserted: u64,
	pub pixels_rejected: u64,
}

/// The baseline pass: aggregate raw radiance into the accumulator.
pub fn scan_baseline(
	reader: &mut RasterReader,
	store: &Accumulator,
	config: &ScanConfig,
) -> Result<ScanReport> {
	run_scan(reader, store, config, None)
}

/// The enhanced pass: re-scan every strip with scattered light added.
///
/// Clears all strip checkpoints first, since scatter re-enhances the
/// whole raster. Max-reduce upserts mean a cell's radiance only ever
/// rises.
pub fn scan_enhanced(
	reader: &mut RasterReader,
	store: &Accumulator,
	config: &ScanConfig,
	scatter: &ScatterMap,
) -> Result<ScanReport> {
	store.clear_progress()?;
	run_scan(reader, store, config, Some(scatter))
}

fn run_scan(
	reader: &mut RasterReader,
	store: &Accumulator,
	config: &ScanConfig,
	scatter: Option<&ScatterMap>,
) -> Result<ScanReport> {
	let width = reader.width();
	let height = reader.height();
	let strip_count = height.div_ceil(config.strip_rows);
	let completed = store.completed_strips()?;

	let label = if scatter.is_some() { "enhance" } else { "scan" };
	info!("{label}: {strip_count} strips of {} rows, {} done", config.strip_rows, completed.len());

	let progress = ProgressBar::new(strip_count as u64);
	progress.set_style(
		ProgressStyle::default_bar()
			.template("{msg} [{bar:34}] {pos}/{len} strips [{elapsed_precise}<{eta_precise}]")?
			.progress_chars("#>-"),
	);
	progress.set_message(label);

	let mut report = ScanReport::default();
	for strip_idx in 0..strip_count {
		if completed.contains(&(strip_idx as u64)) {
			report.strips_skipped += 1;
			progress.inc(1);
			continue;
		}

		let row_off = strip_idx * config.strip_rows;
		let rows = config.strip_rows.min(height - row_off);
		let mut strip = read_strip_with_retry(reader, row_off, width, rows)
			.with_context(|| format!("strip {strip_idx} failed"))?;

		if let Some(scatter) = scatter {
			for ((r, c), value) in strip.indexed_iter_mut() {
				*value += scatter.at_pixel(row_off + r, c);
			}
		}

		let batch = project_strip(&strip, reader, row_off, config, scatter.is_some(), &mut report);
		store
			.commit_strip(strip_idx as u64, &batch)
			.with_context(|| format!("strip {strip_idx} commit failed"))?;
		report.strips_processed += 1;
		report.pixels_upserted += batch.len() as u64;

		// Transient strip buffers drop here; the reopen below is what
		// actually bounds the decoder's working set.
		if (strip_idx + 1) % config.reopen_interval == 0 {
			reader.reopen()?;
		}
		if (strip_idx + 1) % 5 == 0 {
			debug!(
				"strip {strip_idx}: {} cells so far, {} pixels rejected",
				store.count()?,
				report.pixels_rejected
			);
		}
		progress.inc(1);
	}
	progress.finish();

	info!(
		"{label} finished: {} strips processed, {} skipped, {} upserts",
		report.strips_processed, report.strips_skipped, report.pixels_upserted
	);
	Ok(report)
}

/// Reads one strip, recovering once from a transient decoder failure by
/// forcing a close-and-reopen.
fn read_strip_with_retry(
	reader: &mut RasterReader,
	row_off: usize,
	width: usize,
	rows: usize,
) -> Result<Array2<f32>> {
	match reader.read_window(0, row_off, width, rows) {
		Ok(strip) => Ok(strip),
		Err(e) => {
			warn!("window read at row {row_off} failed ({e:#}), reopening raster");
			reader.reopen()?;
			reader.read_window(0, row_off, width, rows)
		}
	}
}

/// Projects a strip's qualifying pixels to H3 cells.
fn project_strip(
	strip: &Array2<f32>,
	reader: &RasterReader,
	row_off: usize,
	config: &ScanConfig,
	enhanced: bool,
	report: &mut ScanReport,
) -> Vec<(u64, f32)> {
	// The artifact never keeps Zone 1 cells, so anything below the Zone 2
	// boundary is dropped before projection. The operator floor applies
	// only to raw radiance, not to scatter-enhanced values.
	let threshold = if enhanced {
		ZONE2_RADIANCE
	} else {
		config.min_radiance.max(ZONE2_RADIANCE)
	};

	// Whole-strip short-circuit: oceans and empty land dominate the
	// raster, and a single max scan is much cheaper than projection.
	let strip_max = strip.iter().fold(0.0f32, |acc, &v| acc.max(v));
	if strip_max < threshold {
		return Vec::new();
	}

	let mut batch = Vec::new();
	let mut rejected = 0u64;
	for ((r, c), &radiance) in strip.indexed_iter() {
		if radiance < threshold {
			continue;
		}
		let (lon, lat) = reader.transform().pixel_center(row_off + r, c);
		if lat.abs() > MAX_ABS_LATITUDE {
			continue;
		}
		match LatLng::new(lat, lon) {
			Ok(coord) => {
				let cell = coord.to_cell(Resolution::Eight);
				batch.push((u64::from(cell), radiance));
			}
			Err(_) => rejected += 1,
		}
	}
	if rejected > 0 {
		debug!("strip at row {row_off}: {rejected} pixels failed projection");
		report.pixels_rejected += rejected;
	}
	batch
}
