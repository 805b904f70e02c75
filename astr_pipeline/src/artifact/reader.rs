//! Binary-search lookups over a finished zones.db artifact.

use anyhow::{ensure, Context, Result};
use astr_core::record::{ArtifactHeader, ZoneRecord, HEADER_SIZE, RECORD_SIZE};
use log::trace;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Reads single records out of the sorted artifact with seek + read, the
/// same access pattern a memory-mapped consumer would use.
pub struct ArtifactReader {
	file: File,
	record_count: u64,
}

impl ArtifactReader {
	/// Opens an artifact and validates its header.
	///
	/// # Errors
	/// Returns an error if the magic bytes are wrong or the record count
	/// does not match the file size.
	pub fn open(path: &Path) -> Result<ArtifactReader> {
		let mut file =
			File::open(path).with_context(|| format!("failed to open artifact {path:?}"))?;
		let header = ArtifactHeader::read_from(&mut file)?;

		let file_size = file.metadata()?.len();
		ensure!(
			file_size == HEADER_SIZE + header.record_count * RECORD_SIZE,
			"artifact {path:?} is corrupt: {} records but {file_size} bytes",
			header.record_count
		);

		trace!("artifact {path:?}: {} records", header.record_count);
		Ok(ArtifactReader {
			file,
			record_count: header.record_count,
		})
	}

	/// Number of records in the artifact.
	pub fn record_count(&self) -> u64 {
		self.record_count
	}

	/// Binary-searches for a cell. `Ok(None)` means the cell is not in the
	/// artifact, i.e. implicit Zone 1.
	pub fn lookup(&mut self, h3_index: u64) -> Result<Option<ZoneRecord>> {
		if self.record_count == 0 {
			return Ok(None);
		}

		let mut left = 0u64;
		let mut right = self.record_count - 1;
		while left <= right {
			let mid = left + (right - left) / 2;
			let record = self.record_at(mid)?;
			if record.h3_index == h3_index {
				return Ok(Some(record));
			}
			if record.h3_index < h3_index {
				left = mid + 1;
			} else if mid == 0 {
				break;
			} else {
				right = mid - 1;
			}
		}
		Ok(None)
	}

	/// Reads the record at a position in `0..record_count`.
	pub fn record_at(&mut self, index: u64) -> Result<ZoneRecord> {
		ensure!(
			index < self.record_count,
			"record {index} out of range (count {})",
			self.record_count
		);
		let mut buf = [0u8; RECORD_SIZE as usize];
		self.file
			.seek(SeekFrom::Start(HEADER_SIZE + index * RECORD_SIZE))?;
		self.file.read_exact(&mut buf)?;
		ZoneRecord::from_slice(&buf)
	}
}
