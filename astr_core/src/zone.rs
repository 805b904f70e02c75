//! Radiance classification: light-pollution zones and Sky Quality Meter
//! values derived from VIIRS annual-average radiance (nW·cm⁻²·sr⁻¹).
//!
//! The zone scale follows the Bortle classes 1 (pristine) to 9 (inner
//! city). Zone 1 is implicit: cells darker than [`ZONE2_RADIANCE`] are
//! never stored in the artifact, so a lookup miss means Zone 1.

/// Radiance threshold below which a cell is Zone 1 and omitted from the
/// artifact.
pub const ZONE2_RADIANCE: f32 = 0.25;

/// SQM value reported for complete darkness.
pub const SQM_DARKEST: f32 = 22.0;

/// SQM clamp floor, reached only by the very brightest city cores.
pub const SQM_BRIGHTEST: f32 = 16.0;

/// Zone boundaries, brightest first. A radiance at or above the threshold
/// belongs to the paired zone.
const ZONE_THRESHOLDS: [(f32, u8); 8] = [
	(125.0, 9),
	(50.0, 8),
	(20.0, 7),
	(9.0, 6),
	(3.0, 5),
	(1.0, 4),
	(0.5, 3),
	(ZONE2_RADIANCE, 2),
];

/// Classifies a radiance sample into a zone 1–9.
///
/// The mapping is a monotone step function on radiance; anything below the
/// Zone 2 threshold is Zone 1.
pub fn radiance_to_zone(radiance: f32) -> u8 {
	for (threshold, zone) in ZONE_THRESHOLDS {
		if radiance >= threshold {
			return zone;
		}
	}
	1
}

/// Converts a radiance sample to an approximate Sky Quality Meter value in
/// mag/arcsec², clamped to `[16.0, 22.0]`.
///
/// `sqm = 22.0 − 1.7·log₁₀(1 + 2r)`; non-positive radiance maps to the
/// darkest value 22.0.
pub fn radiance_to_sqm(radiance: f32) -> f32 {
	if radiance <= 0.0 {
		return SQM_DARKEST;
	}
	let sqm = SQM_DARKEST - 1.7 * (2.0f32.mul_add(radiance, 1.0)).log10();
	sqm.clamp(SQM_BRIGHTEST, SQM_DARKEST)
}
