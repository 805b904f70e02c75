//! End-to-end scans over synthetic rasters: baseline, resume, skyglow.

mod util;

use anyhow::Result;
use astr_core::zone::radiance_to_sqm;
use astr_pipeline::{artifact, scan, Accumulator, ArtifactReader, RasterReader, ScanConfig, ScatterConfig, ScatterMap};
use h3o::{LatLng, Resolution};
use std::collections::HashMap;
use tempfile::TempDir;

/// 10 strips over a 100-row raster, matching the scenarios below.
fn test_config() -> ScanConfig {
	ScanConfig {
		strip_rows: 10,
		..ScanConfig::default()
	}
}

/// The H3 cell a pixel center projects to.
fn cell_of(reader: &RasterReader, row: usize, col: usize) -> Result<u64> {
	let (lon, lat) = reader.transform().pixel_center(row, col);
	Ok(u64::from(LatLng::new(lat, lon)?.to_cell(Resolution::Eight)))
}

#[test]
fn single_bright_pixel_yields_one_zone8_record() -> Result<()> {
	let dir = TempDir::new()?;
	let tif = dir.path().join("test.tif");
	util::write_raster(&tif, 100, &[(50, 50, 100.0)], util::centered_geo(100, 0.01))?;

	let mut reader = RasterReader::open(&tif)?;
	let store = Accumulator::open(&dir.path().join("accumulator.db"))?;
	let report = scan::scan_baseline(&mut reader, &store, &test_config())?;
	assert_eq!(report.strips_processed, 10);
	assert_eq!(report.pixels_upserted, 1);

	let out = dir.path().join("zones.db");
	artifact::write_artifact(&store, &out)?;

	let mut zones = ArtifactReader::open(&out)?;
	assert_eq!(zones.record_count(), 1);

	let record = zones.record_at(0)?;
	assert_eq!(record.h3_index, u64::from(LatLng::new(0.0, 0.0)?.to_cell(Resolution::Eight)));
	assert_eq!(record.zone, 8);
	assert_eq!(record.radiance, 100.0);
	assert_eq!(record.sqm, radiance_to_sqm(100.0));
	Ok(())
}

#[test]
fn dim_pixel_stays_implicit_zone1() -> Result<()> {
	let dir = TempDir::new()?;
	let tif = dir.path().join("test.tif");
	util::write_raster(&tif, 100, &[(50, 50, 0.2)], util::centered_geo(100, 0.01))?;

	let mut reader = RasterReader::open(&tif)?;
	let store = Accumulator::open(&dir.path().join("accumulator.db"))?;
	scan::scan_baseline(&mut reader, &store, &test_config())?;
	assert_eq!(store.count()?, 0);

	let out = dir.path().join("zones.db");
	let summary = artifact::write_artifact(&store, &out)?;
	assert_eq!(summary.record_count, 0);
	Ok(())
}

#[test]
fn neighbouring_pixels_reduce_to_per_cell_maximum() -> Result<()> {
	let dir = TempDir::new()?;
	let tif = dir.path().join("test.tif");
	// ~11 m pixels: adjacent pixels land in the same resolution-8 cell.
	let pixels = [(50usize, 50usize, 1.0f32), (50, 51, 5.0)];
	util::write_raster(&tif, 100, &pixels, util::centered_geo(100, 0.0001))?;

	let mut reader = RasterReader::open(&tif)?;
	let store = Accumulator::open(&dir.path().join("accumulator.db"))?;
	scan::scan_baseline(&mut reader, &store, &test_config())?;

	// Derive the expected per-cell maxima with the same projection the
	// scanner uses, so the assertion holds wherever the cell boundary
	// happens to fall.
	let mut expected: HashMap<u64, f32> = HashMap::new();
	for &(row, col, radiance) in &pixels {
		let cell = cell_of(&reader, row, col)?;
		let entry = expected.entry(cell).or_insert(0.0);
		*entry = entry.max(radiance);
	}

	assert_eq!(store.count()?, expected.len() as u64);
	for (&cell, &radiance) in &expected {
		assert_eq!(store.get(cell)?, Some(radiance));
	}
	Ok(())
}

#[test]
fn interrupted_scan_resumes_to_identical_artifact() -> Result<()> {
	let dir = TempDir::new()?;
	let tif = dir.path().join("test.tif");
	// One lit pixel in strip 1, one in strip 5.
	util::write_raster(
		&tif,
		100,
		&[(15, 40, 50.0), (50, 50, 100.0)],
		util::centered_geo(100, 0.01),
	)?;
	let mut reader = RasterReader::open(&tif)?;

	// Uninterrupted reference run.
	let store_a = Accumulator::open(&dir.path().join("a.db"))?;
	scan::scan_baseline(&mut reader, &store_a, &test_config())?;
	let summary_a = artifact::write_artifact(&store_a, &dir.path().join("a_zones.db"))?;

	// Replicate a run killed after strip 3 committed: strips 0..3 done,
	// strip 1's batch already upserted.
	let store_b = Accumulator::open(&dir.path().join("b.db"))?;
	let strip1_cell = cell_of(&reader, 15, 40)?;
	store_b.commit_strip(0, &[])?;
	store_b.commit_strip(1, &[(strip1_cell, 50.0)])?;
	store_b.commit_strip(2, &[])?;

	let report = scan::scan_baseline(&mut reader, &store_b, &test_config())?;
	assert_eq!(report.strips_skipped, 3);
	assert_eq!(report.strips_processed, 7);

	let summary_b = artifact::write_artifact(&store_b, &dir.path().join("b_zones.db"))?;
	assert_eq!(summary_a.sha256, summary_b.sha256);

	// A third run has nothing left to do and changes nothing.
	let report = scan::scan_baseline(&mut reader, &store_b, &test_config())?;
	assert_eq!(report.strips_skipped, 10);
	assert_eq!(report.strips_processed, 0);
	let summary_c = artifact::write_artifact(&store_b, &dir.path().join("c_zones.db"))?;
	assert_eq!(summary_b.sha256, summary_c.sha256);
	Ok(())
}

#[test]
fn skyglow_never_decreases_and_spreads_light() -> Result<()> {
	let dir = TempDir::new()?;
	let tif = dir.path().join("test.tif");
	util::write_raster(&tif, 100, &[(50, 50, 100.0)], util::centered_geo(100, 0.01))?;

	let mut reader = RasterReader::open(&tif)?;
	let store = Accumulator::open(&dir.path().join("accumulator.db"))?;
	scan::scan_baseline(&mut reader, &store, &test_config())?;

	let baseline: HashMap<u64, f32> = store
		.iter_cells_sorted()
		.collect::<Result<Vec<_>>>()?
		.into_iter()
		.collect();
	assert_eq!(baseline.len(), 1);

	// An exaggerated fraction so the dome crosses the Zone 2 threshold
	// even on a tiny grid.
	let config = ScatterConfig {
		fraction: 30.0,
		..ScatterConfig::default()
	};
	let scatter = ScatterMap::build(&mut reader, &config)?;
	scan::scan_enhanced(&mut reader, &store, &test_config(), &scatter)?;

	// Enhancement only ever raises a cell.
	for (&cell, &radiance) in &baseline {
		let enhanced = store.get(cell)?.expect("baseline cell must survive");
		assert!(enhanced >= radiance, "{enhanced} < {radiance}");
	}

	// The scattered dome promoted cells that were dark at baseline.
	assert!(store.count()? > baseline.len() as u64);

	// The source pixel keeps (at least) its own radiance and zone.
	let source = cell_of(&reader, 50, 50)?;
	let radiance = store.get(source)?.unwrap();
	assert!(radiance >= 100.0);

	let out = dir.path().join("zones.db");
	artifact::write_artifact(&store, &out)?;
	let mut zones = ArtifactReader::open(&out)?;
	assert!(zones.lookup(source)?.unwrap().zone >= 8);
	Ok(())
}

#[test]
fn pixels_beyond_latitude_band_are_discarded() -> Result<()> {
	let dir = TempDir::new()?;
	let tif = dir.path().join("test.tif");
	// 20° pixels: row 0 sits near lat 100, far outside the ±85° band.
	util::write_raster(
		&tif,
		10,
		&[(0, 5, 80.0), (5, 5, 80.0)],
		util::centered_geo(10, 20.0),
	)?;

	let mut reader = RasterReader::open(&tif)?;
	let store = Accumulator::open(&dir.path().join("accumulator.db"))?;
	scan::scan_baseline(&mut reader, &store, &ScanConfig::default())?;

	assert_eq!(store.count()?, 1);
	assert_eq!(store.get(cell_of(&reader, 5, 5)?)?, Some(80.0));
	Ok(())
}
