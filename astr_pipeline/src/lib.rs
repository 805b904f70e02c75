//! The Astr raster-to-artifact pipeline.
//!
//! Turns a global VIIRS Night-time Lights annual-average GeoTIFF into a
//! sorted binary artifact (`zones.db`) mapping every lit H3 resolution-8
//! cell to a light-pollution zone, an SQM estimate and its source radiance.
//!
//! The pipeline is built from five pieces:
//! - [`raster`]: windowed `f32` reads over a (possibly gzipped) GeoTIFF,
//! - [`accumulator`]: a durable SQLite store of per-cell maximum radiance
//!   plus completed-strip checkpoints, making every phase resumable,
//! - [`scan`]: the strip-by-strip traversal that projects lit pixels onto
//!   the H3 grid (baseline pass, and an enhanced pass that adds skyglow),
//! - [`scatter`]: the coarse-grid downsampler, the atmospheric scatter
//!   kernel and its FFT convolution,
//! - [`artifact`]: the sorted binary writer and a binary-search reader.
//!
//! Control flow is deliberately single-threaded and blocking: strips commit
//! in order, and the accumulator's commit fence is the only ordering
//! guarantee the pipeline needs.

pub mod accumulator;
pub mod artifact;
pub mod locations;
pub mod raster;
pub mod scan;
pub mod scatter;

pub use accumulator::Accumulator;
pub use artifact::{ArtifactReader, ArtifactSummary};
pub use raster::RasterReader;
pub use scan::{ScanConfig, ScanReport};
pub use scatter::{ScatterConfig, ScatterMap};
