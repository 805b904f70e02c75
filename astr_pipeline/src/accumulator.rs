//! The durable accumulator behind both scan phases.
//!
//! An SQLite database with two tables:
//! - `cells(h3 INTEGER PRIMARY KEY, radiance REAL)`: the maximum radiance
//!   observed at any pixel that projected to the cell,
//! - `progress(strip_idx INTEGER PRIMARY KEY)`: the set of completed
//!   strips, for resuming an interrupted run.
//!
//! A strip's upserts and its progress row commit in one transaction, so a
//! run killed at any point resumes from the last committed strip with no
//! lost or doubled data. H3 indices are stored as the `i64` with the same
//! bit pattern as the `u64` index; bit 63 of an H3 cell index is always
//! zero, so signed and unsigned orderings agree and `ORDER BY h3` yields
//! ascending `u64` order.

use anyhow::{ensure, Context, Result};
use log::trace;
use r2d2::Pool;
use r2d2_sqlite::rusqlite::params;
use r2d2_sqlite::SqliteConnectionManager;
use std::collections::{HashSet, VecDeque};
use std::path::Path;

/// Page-cache budget, in KiB (negative per SQLite convention): ~64 MB.
const CACHE_SIZE_KIB: i64 = -65536;

/// Rows fetched per batch when iterating cells in sorted order.
pub const ITER_BATCH_SIZE: usize = 100_000;

/// The durable per-cell maximum-radiance store with strip checkpoints.
pub struct Accumulator {
	pool: Pool<SqliteConnectionManager>,
}

impl Accumulator {
	/// Opens (or creates) the accumulator database at `path`.
	///
	/// Every connection is tuned for the pipeline's write pattern:
	/// write-ahead log, `synchronous=NORMAL` and a ~64 MB page cache.
	pub fn open(path: &Path) -> Result<Accumulator> {
		trace!("open accumulator {path:?}");

		let manager = SqliteConnectionManager::file(path).with_init(|conn| {
			conn.pragma_update(None, "journal_mode", "WAL")?;
			conn.pragma_update(None, "synchronous", "NORMAL")?;
			conn.pragma_update(None, "cache_size", CACHE_SIZE_KIB)?;
			Ok(())
		});
		let pool = Pool::builder().max_size(4).build(manager)?;

		pool.get()?
			.execute_batch(
				"CREATE TABLE IF NOT EXISTS cells (
					h3 INTEGER PRIMARY KEY,
					radiance REAL NOT NULL
				);
				CREATE TABLE IF NOT EXISTS progress (
					strip_idx INTEGER PRIMARY KEY
				);",
			)
			.context("failed to create accumulator tables")?;

		Ok(Accumulator { pool })
	}

	/// Upserts a batch of `(h3, radiance)` samples with max-reduce
	/// semantics, in a single transaction.
	pub fn upsert_batch(&self, items: &[(u64, f32)]) -> Result<()> {
		self.commit(items, None)
	}

	/// Upserts a strip's samples and marks the strip completed, atomically.
	///
	/// This is the pipeline's commit fence: either both the batch and the
	/// progress row land, or neither does.
	pub fn commit_strip(&self, strip_idx: u64, items: &[(u64, f32)]) -> Result<()> {
		self.commit(items, Some(strip_idx))
	}

	fn commit(&self, items: &[(u64, f32)], strip_idx: Option<u64>) -> Result<()> {
		let mut conn = self.pool.get()?;
		let tx = conn.transaction()?;
		{
			let mut stmt = tx.prepare_cached(
				"INSERT INTO cells (h3, radiance) VALUES (?1, ?2)
				ON CONFLICT(h3) DO UPDATE SET radiance = MAX(radiance, excluded.radiance)",
			)?;
			for &(h3, radiance) in items {
				stmt.execute(params![h3 as i64, f64::from(radiance)])?;
			}
		}
		if let Some(strip_idx) = strip_idx {
			tx.execute(
				"INSERT OR IGNORE INTO progress (strip_idx) VALUES (?1)",
				[strip_idx as i64],
			)?;
		}
		tx.commit().context("accumulator commit failed")?;
		Ok(())
	}

	/// Marks a strip completed without touching cells (used when a strip
	/// holds no qualifying pixels).
	pub fn mark_strip(&self, strip_idx: u64) -> Result<()> {
		self.commit_strip(strip_idx, &[])
	}

	/// The set of strip indices already committed.
	pub fn completed_strips(&self) -> Result<HashSet<u64>> {
		let conn = self.pool.get()?;
		let mut stmt = conn.prepare("SELECT strip_idx FROM progress")?;
		let strips = stmt
			.query_map([], |row| row.get::<_, i64>(0))?
			.map(|idx| Ok(idx? as u64))
			.collect::<Result<HashSet<u64>>>()?;
		Ok(strips)
	}

	/// Deletes all strip checkpoints. The skyglow pass calls this so every
	/// strip gets re-enhanced.
	pub fn clear_progress(&self) -> Result<()> {
		self.pool.get()?.execute("DELETE FROM progress", [])?;
		Ok(())
	}

	/// Number of cells in the store.
	pub fn count(&self) -> Result<u64> {
		let conn = self.pool.get()?;
		let count: i64 = conn.query_row("SELECT COUNT(*) FROM cells", [], |row| row.get(0))?;
		ensure!(count >= 0, "negative cell count");
		Ok(count as u64)
	}

	/// The stored radiance of a single cell, if present.
	pub fn get(&self, h3: u64) -> Result<Option<f32>> {
		let conn = self.pool.get()?;
		let mut stmt = conn.prepare_cached("SELECT radiance FROM cells WHERE h3 = ?1")?;
		let mut rows = stmt.query([h3 as i64])?;
		match rows.next()? {
			Some(row) => Ok(Some(row.get::<_, f64>(0)? as f32)),
			None => Ok(None),
		}
	}

	/// Iterates all cells in ascending `h3` order.
	///
	/// Rows are fetched in keyset-paginated batches of [`ITER_BATCH_SIZE`]
	/// so the artifact writer never holds more than one batch in memory.
	pub fn iter_cells_sorted(&self) -> SortedCells<'_> {
		SortedCells {
			pool: &self.pool,
			last: None,
			batch: VecDeque::new(),
			batch_size: ITER_BATCH_SIZE,
			done: false,
		}
	}

	#[cfg(test)]
	fn iter_cells_batched(&self, batch_size: usize) -> SortedCells<'_> {
		SortedCells {
			pool: &self.pool,
			last: None,
			batch: VecDeque::new(),
			batch_size,
			done: false,
		}
	}
}

impl std::fmt::Debug for Accumulator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Accumulator")
			.field("cells", &self.count().unwrap_or(0))
			.finish()
	}
}

/// Iterator over `(h3, radiance)` pairs in ascending `h3` order.
pub struct SortedCells<'a> {
	pool: &'a Pool<SqliteConnectionManager>,
	last: Option<i64>,
	batch: VecDeque<(u64, f32)>,
	batch_size: usize,
	done: bool,
}

impl SortedCells<'_> {
	fn fetch_batch(&mut self) -> Result<()> {
		let conn = self.pool.get()?;
		let mut stmt = conn.prepare_cached(
			"SELECT h3, radiance FROM cells WHERE h3 > ?1 ORDER BY h3 LIMIT ?2",
		)?;
		let rows = stmt.query_map(
			params![self.last.unwrap_or(i64::MIN), self.batch_size as i64],
			|row| Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?)),
		)?;
		for row in rows {
			let (h3, radiance) = row?;
			self.batch.push_back((h3 as u64, radiance as f32));
			self.last = Some(h3);
		}
		if self.batch.len() < self.batch_size {
			self.done = true;
		}
		Ok(())
	}
}

impl Iterator for SortedCells<'_> {
	type Item = Result<(u64, f32)>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.batch.is_empty() {
			if self.done {
				return None;
			}
			if let Err(e) = self.fetch_batch() {
				self.done = true;
				return Some(Err(e));
			}
		}
		self.batch.pop_front().map(Ok)
	}
}
