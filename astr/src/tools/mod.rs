pub mod generate;
pub mod skyglow;
pub mod validate;

use std::path::{Path, PathBuf};

/// Default accumulator filename, created beside the TIF.
const ACCUMULATOR_NAME: &str = "zones_accumulator.db";

/// Default artifact filename, created beside the TIF.
const ARTIFACT_NAME: &str = "zones.db";

/// Resolves a path that defaults to a sibling of the TIF.
fn sibling_or(tif: &Path, explicit: Option<&PathBuf>, name: &str) -> PathBuf {
	explicit.cloned().unwrap_or_else(|| tif.with_file_name(name))
}

fn accumulator_path(tif: &Path, explicit: Option<&PathBuf>) -> PathBuf {
	sibling_or(tif, explicit, ACCUMULATOR_NAME)
}

fn artifact_path(tif: &Path, explicit: Option<&PathBuf>) -> PathBuf {
	sibling_or(tif, explicit, ARTIFACT_NAME)
}
