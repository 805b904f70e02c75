//! Shared types for the Astr light-pollution pipeline: the radiance→zone
//! classification, the SQM brightness conversion, and the binary artifact
//! header and record codecs.

pub mod record;
pub mod zone;

pub use record::{ArtifactHeader, ZoneRecord, ARTIFACT_MAGIC, HEADER_SIZE, RECORD_SIZE};
pub use zone::{radiance_to_sqm, radiance_to_zone, ZONE2_RADIANCE};
