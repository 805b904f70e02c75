use anyhow::{bail, Result};
use astr_pipeline::locations::VALIDATION_LOCATIONS;
use astr_pipeline::ArtifactReader;
use h3o::{LatLng, Resolution};
use log::info;
use std::path::PathBuf;

/// Minimum explicit hits for the artifact to pass. Dark-sky and remote
/// entries legitimately miss (implicit Zone 1), so the bar sits well
/// below the list length.
const REQUIRED_HITS: usize = 30;

#[derive(clap::Args, Debug)]
#[command(disable_version_flag = true)]
pub struct Subcommand {
	/// the VNL radiance GeoTIFF the artifact was generated from
	#[arg(long, value_name = "PATH")]
	pub tif: PathBuf,

	/// artifact to validate [default: zones.db beside the TIF]
	#[arg(long, value_name = "PATH")]
	pub out: Option<PathBuf>,
}

pub fn run(arguments: &Subcommand) -> Result<()> {
	let path = super::artifact_path(&arguments.tif, arguments.out.as_ref());
	let mut reader = ArtifactReader::open(&path)?;
	info!("validating {path:?}: {} records", reader.record_count());

	let mut hits = 0usize;
	for &(name, lat, lon) in VALIDATION_LOCATIONS {
		let cell = LatLng::new(lat, lon)?.to_cell(Resolution::Eight);
		match reader.lookup(u64::from(cell))? {
			Some(record) => {
				hits += 1;
				println!(
					"✅ {name}: Zone {}, SQM {:.2}, radiance {:.2}",
					record.zone, record.sqm, record.radiance
				);
			}
			None => println!("   {name}: Zone 1 (implicit)"),
		}
	}

	println!(
		"{hits}/{} locations have explicit zone data",
		VALIDATION_LOCATIONS.len()
	);
	if hits < REQUIRED_HITS {
		bail!("only {hits} explicit hits, expected at least {REQUIRED_HITS}");
	}
	Ok(())
}
