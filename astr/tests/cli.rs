//! End-to-end runs of the compiled binary against a synthetic raster.

use anyhow::Result;
use gdal::raster::Buffer;
use gdal::DriverManager;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn astr() -> Command {
	Command::new(env!("CARGO_BIN_EXE_astr"))
}

/// A 100x100 raster with one bright pixel whose center maps to (0, 0).
fn write_fixture(path: &Path) -> Result<()> {
	let driver = DriverManager::get_driver_by_name("GTiff")?;
	let mut dataset = driver.create_with_band_type::<f32, _>(path, 100, 100, 1)?;
	dataset.set_geo_transform(&[-0.505, 0.01, 0.0, 0.505, 0.0, -0.01])?;

	let mut data = vec![0.0f32; 100 * 100];
	data[50 * 100 + 50] = 100.0;
	let mut buffer = Buffer::new((100, 100), data);
	dataset.rasterband(1)?.write((0, 0), (100, 100), &mut buffer)?;
	Ok(())
}

#[test]
fn generate_emits_a_coherent_artifact() -> Result<()> {
	let dir = TempDir::new()?;
	let tif = dir.path().join("test.tif");
	write_fixture(&tif)?;

	let status = astr().args(["generate", "--tif"]).arg(&tif).status()?;
	assert!(status.success());

	let artifact = fs::read(dir.path().join("zones.db"))?;
	assert_eq!(&artifact[0..8], b"ASTR\x01\x00\x00\x00");
	let record_count = u64::from_le_bytes(artifact[8..16].try_into()?);
	assert_eq!(record_count, 1);
	assert_eq!(artifact.len() as u64, 16 + record_count * 20);

	assert!(dir.path().join("zones_accumulator.db").exists());
	Ok(())
}

#[test]
fn generate_reset_discards_previous_state() -> Result<()> {
	let dir = TempDir::new()?;
	let tif = dir.path().join("test.tif");
	write_fixture(&tif)?;

	assert!(astr().args(["generate", "--tif"]).arg(&tif).status()?.success());
	let first = fs::read(dir.path().join("zones.db"))?;

	let status = astr()
		.args(["generate", "--reset", "--tif"])
		.arg(&tif)
		.status()?;
	assert!(status.success());
	assert_eq!(first, fs::read(dir.path().join("zones.db"))?);
	Ok(())
}

#[test]
fn validate_fails_on_a_synthetic_artifact() -> Result<()> {
	// A raster lit only at Null Island cannot cover 30 world cities.
	let dir = TempDir::new()?;
	let tif = dir.path().join("test.tif");
	write_fixture(&tif)?;

	assert!(astr().args(["generate", "--tif"]).arg(&tif).status()?.success());

	let status = astr().args(["validate", "--tif"]).arg(&tif).status()?;
	assert_eq!(status.code(), Some(1));
	Ok(())
}

#[test]
fn validate_fails_on_a_missing_artifact() -> Result<()> {
	let dir = TempDir::new()?;
	let tif = dir.path().join("test.tif");
	write_fixture(&tif)?;

	let status = astr().args(["validate", "--tif"]).arg(&tif).status()?;
	assert_eq!(status.code(), Some(1));
	Ok(())
}
