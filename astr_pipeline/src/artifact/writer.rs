//! Streams the accumulator into the zones.db artifact.

use crate::accumulator::Accumulator;
use crate::locations::SPOT_CHECK;
use anyhow::{ensure, Context, Result};
use astr_core::record::{ArtifactHeader, ZoneRecord};
use astr_core::zone::radiance_to_zone;
use h3o::{LatLng, Resolution};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Chunk size for the post-write digest pass.
const DIGEST_CHUNK: usize = 8192;

/// What the writer produced, for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSummary {
	pub record_count: u64,
	pub file_size: u64,
	pub sha256: String,
}

/// Writes the artifact from the accumulator's sorted cells.
///
/// Emits the header with a zero record count, streams all cells at or
/// above Zone 2 in ascending H3 order, patches the count, then digests
/// the finished file and spot-checks a handful of well-known coordinates
/// against the accumulator.
///
/// # Errors
/// Returns an error on any write failure or if the accumulator yields
/// cells out of order; the partial artifact is left in place for
/// inspection.
pub fn write_artifact(store: &Accumulator, path: &Path) -> Result<ArtifactSummary> {
	info!("writing artifact {path:?}");
	let mut writer = BufWriter::new(
		File::create(path).with_context(|| format!("failed to create artifact {path:?}"))?,
	);
	ArtifactHeader::new(0).write_to(&mut writer)?;

	let progress = ProgressBar::new(store.count()?);
	progress.set_style(
		ProgressStyle::default_bar()
			.template("{msg} [{bar:34}] {pos}/{len} cells [{elapsed_precise}<{eta_precise}]")?
			.progress_chars("#>-"),
	);
	progress.set_message("write");

	let mut record_count = 0u64;
	let mut previous: Option<u64> = None;
	for cell in store.iter_cells_sorted() {
		let (h3, radiance) = cell?;
		progress.inc(1);
		if radiance_to_zone(radiance) <= 1 {
			continue;
		}
		ensure!(
			previous.is_none_or(|p| p < h3),
			"accumulator yielded cells out of order at {h3:x}"
		);
		previous = Some(h3);

		ZoneRecord::from_radiance(h3, radiance).write_to(&mut writer)?;
		record_count += 1;
	}
	progress.finish();

	// Patch the real record count over the placeholder header.
	writer.seek(SeekFrom::Start(0))?;
	ArtifactHeader::new(record_count).write_to(&mut writer)?;
	writer.flush()?;
	drop(writer);

	let file_size = path.metadata()?.len();
	let sha256 = sha256_file(path)?;
	info!("artifact complete: {record_count} records, {file_size} bytes, sha256 {sha256}");

	spot_check(store)?;

	Ok(ArtifactSummary {
		record_count,
		file_size,
		sha256,
	})
}

/// SHA-256 of a file, streamed in 8 KiB chunks.
fn sha256_file(path: &Path) -> Result<String> {
	let mut file = File::open(path)?;
	let mut hasher = Sha256::new();
	let mut chunk = [0u8; DIGEST_CHUNK];
	loop {
		let n = file.read(&mut chunk)?;
		if n == 0 {
			break;
		}
		hasher.update(&chunk[..n]);
	}
	let digest = hasher.finalize();
	Ok(format!("{digest:x}"))
}

/// Prints the zones of a few well-known coordinates to stderr as a quick
/// sanity check of a fresh accumulator.
fn spot_check(store: &Accumulator) -> Result<()> {
	for &(name, lat, lon) in SPOT_CHECK {
		let cell = LatLng::new(lat, lon)?.to_cell(Resolution::Eight);
		let zone = match store.get(u64::from(cell))? {
			Some(radiance) => radiance_to_zone(radiance),
			None => 1,
		};
		eprintln!("  {name}: Zone {zone}");
	}
	Ok(())
}
