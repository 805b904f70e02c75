//! Binary codecs for the zones.db artifact.
//!
//! The artifact is a fixed 16-byte header followed by a record array sorted
//! by H3 index, so a consumer can memory-map the file and binary-search it:
//!
//! ```text
//! offset 0..8    8B    magic  "ASTR\x01\x00\x00\x00"
//! offset 8..16   u64   record_count (little-endian)
//! offset 16..    N ×   20-byte records, strictly ascending by h3_index
//! ```
//!
//! Each record:
//!
//! ```text
//! offset  0..8   u64   h3_index
//! offset  8..9   u8    zone           (2..9; Zone 1 cells are omitted)
//! offset  9..13  f32   radiance       (nW·cm⁻²·sr⁻¹)
//! offset 13..17  f32   sqm            (mag/arcsec²)
//! offset 17..20  3B    padding (0x00)
//! ```

use crate::zone::{radiance_to_sqm, radiance_to_zone};
use anyhow::{bail, ensure, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// The artifact magic bytes: "ASTR", format version 1, reserved zeroes.
pub const ARTIFACT_MAGIC: [u8; 8] = *b"ASTR\x01\x00\x00\x00";

/// Size of the artifact header in bytes.
pub const HEADER_SIZE: u64 = 16;

/// Size of one artifact record in bytes.
pub const RECORD_SIZE: u64 = 20;

/// The artifact file header: magic bytes plus the record count.
///
/// The writer emits the header with a zero count before streaming records
/// and patches the count afterwards, so a header with `record_count == 0`
/// is also what a crashed run leaves behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactHeader {
	pub record_count: u64,
}

impl ArtifactHeader {
	pub fn new(record_count: u64) -> ArtifactHeader {
		ArtifactHeader { record_count }
	}

	/// Writes the 16-byte header.
	pub fn write_to(&self, writer: &mut impl Write) -> Result<()> {
		writer.write_all(&ARTIFACT_MAGIC)?;
		writer.write_u64::<LittleEndian>(self.record_count)?;
		Ok(())
	}

	/// Reads and validates a 16-byte header.
	///
	/// # Errors
	/// Returns an error if the magic bytes do not match.
	pub fn read_from(reader: &mut impl Read) -> Result<ArtifactHeader> {
		let mut magic = [0u8; 8];
		reader.read_exact(&mut magic)?;
		if magic != ARTIFACT_MAGIC {
			bail!("not a zones artifact: bad magic {magic:02x?}");
		}
		let record_count = reader.read_u64::<LittleEndian>()?;
		Ok(ArtifactHeader { record_count })
	}
}

/// One artifact record: a hex cell with its classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneRecord {
	pub h3_index: u64,
	pub zone: u8,
	pub radiance: f32,
	pub sqm: f32,
}

impl ZoneRecord {
	/// Builds a record from the accumulated radiance of a cell, deriving
	/// zone and SQM so both stay reversible from the stored radiance.
	pub fn from_radiance(h3_index: u64, radiance: f32) -> ZoneRecord {
		ZoneRecord {
			h3_index,
			zone: radiance_to_zone(radiance),
			radiance,
			sqm: radiance_to_sqm(radiance),
		}
	}

	/// Writes the 20-byte little-endian record.
	pub fn write_to(&self, writer: &mut impl Write) -> Result<()> {
		writer.write_u64::<LittleEndian>(self.h3_index)?;
		writer.write_u8(self.zone)?;
		writer.write_f32::<LittleEndian>(self.radiance)?;
		writer.write_f32::<LittleEndian>(self.sqm)?;
		writer.write_all(&[0u8; 3])?;
		Ok(())
	}

	/// Parses a record from exactly [`RECORD_SIZE`] bytes.
	pub fn from_slice(buf: &[u8]) -> Result<ZoneRecord> {
		ensure!(
			buf.len() == RECORD_SIZE as usize,
			"a zone record is {RECORD_SIZE} bytes long, got {}",
			buf.len()
		);
		let mut reader = buf;
		Ok(ZoneRecord {
			h3_index: reader.read_u64::<LittleEndian>()?,
			zone: reader.read_u8()?,
			radiance: reader.read_f32::<LittleEndian>()?,
			sqm: reader.read_f32::<LittleEndian>()?,
		})
	}
}
