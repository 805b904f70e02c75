use anyhow::Result;
use astr_pipeline::{artifact, scan, Accumulator, RasterReader, ScanConfig, ScatterConfig, ScatterMap};
use log::info;
use std::path::PathBuf;

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

	/// fraction of radiance scattered into neighbouring cells
	#[arg(long, value_name = "F")]
	pub fraction: Option<f64>,

	/// e-folding distance of the scatter decay in km
	#[arg(long, value_name = "KM")]
	pub scale_km: Option<f64>,
}

pub fn run(arguments: &Subcommand) -> Result<()> {
	let accum = super::accumulator_path(&arguments.tif, arguments.accum.as_ref());
	let out = super::artifact_path(&arguments.tif, arguments.out.as_ref());

	let mut config = ScatterConfig::default();
	if let Some(fraction) = arguments.fraction {
		config.fraction = fraction;
	}
	if let Some(scale_km) = arguments.scale_km {
		config.scale_km = scale_km;
	}

	let mut reader = RasterReader::open(&arguments.tif)?;
	let store = Accumulator::open(&accum)?;

	let scatter = ScatterMap::build(&mut reader, &config)?;
	let report = scan::scan_enhanced(&mut reader, &store, &ScanConfig::default(), &scatter)?;
	info!(
		"enhanced scan done: {} strips processed, {} cells",
		report.strips_processed,
		store.count()?
	);

	let summary = artifact::write_artifact(&store, &out)?;
	info!("wrote {out:?}: {} records", summary.record_count);

	Ok(())
}
