use anyhow::{Context, Result};
use astr_pipeline::{artifact, scan, Accumulator, RasterReader, ScanConfig};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(clap::Args, Debug)]
#[command(disable_version_flag = true)]
pub struct Subcommand {
	/// the VNL annual-average radiance GeoTIFF (may be gzipped, *.tif.gz)
	#[arg(long, value_name = "PATH")]
	pub tif: PathBuf,

	/// accumulator database [default: zones_accumulator.db beside the TIF]
	#[arg(long, value_name = "PATH")]
	pub accum: Option<PathBuf>,

	/// output artifact [default: zones.db beside the TIF]
	#[arg(long, value_name = "PATH")]
	pub out: Option<PathBuf>,

	/// delete the accumulator (and its WAL/SHM siblings) before scanning
	#[arg(long)]
	pub reset: bool,
}

pub fn run(arguments: &Subcommand) -> Result<()> {
	let accum = super::accumulator_path(&arguments.tif, arguments.accum.as_ref());
	let out = super::artifact_path(&arguments.tif, arguments.out.as_ref());

	if arguments.reset {
		reset_accumulator(&accum)?;
	}

	let mut reader = RasterReader::open(&arguments.tif)?;
	let store = Accumulator::open(&accum)?;

	let report = scan::scan_baseline(&mut reader, &store, &ScanConfig::default())?;
	info!(
		"baseline scan done: {} strips processed, {} cells",
		report.strips_processed,
		store.count()?
	);

	let summary = artifact::write_artifact(&store, &out)?;
	info!("wrote {out:?}: {} records", summary.record_count);

	Ok(())
}

/// Removes the accumulator database together with the `-wal` and `-shm`
/// files SQLite leaves beside it.
fn reset_accumulator(accum: &Path) -> Result<()> {
	let sibling = |suffix: &str| {
		let mut os = accum.to_path_buf().into_os_string();
		os.push(suffix);
		PathBuf::from(os)
	};
	for path in [accum.to_path_buf(), sibling("-wal"), sibling("-shm")] {
		if path.exists() {
			info!("reset: removing {path:?}");
			fs::remove_file(&path).with_context(|| format!("failed to remove {path:?}"))?;
		}
	}
	Ok(())
}
