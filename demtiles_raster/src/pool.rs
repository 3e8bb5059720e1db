//! A bounded pool of lazily opened raster readers.
//!
//! Input sets can be far larger than the number of file handles (or the
//! memory) available, so readers are opened on first use and kept in an LRU
//! cache behind a mutex. Opening and eviction are the only cross-thread
//! synchronization points on the read path; the returned `Arc` keeps a
//! reader alive for the duration of a read even if it is evicted meanwhile.

use anyhow::{Context, Result};
use demtiles_core::LimitedCache;
use std::sync::{Arc, Mutex};

use crate::RasterSource;

/// Opens one raster source; called at most once per cache residency.
pub type SourceOpener = Arc<dyn Fn() -> Result<Arc<dyn RasterSource>> + Send + Sync>;

/// A lazily opening, LRU-bounded collection of raster readers.
pub struct SourcePool {
	openers: Vec<SourceOpener>,
	cache: Mutex<LimitedCache<usize, Arc<dyn RasterSource>>>,
}

impl SourcePool {
	/// Creates a pool over the given openers keeping at most `max_open`
	/// readers open at once.
	pub fn new(openers: Vec<SourceOpener>, max_open: usize) -> SourcePool {
		SourcePool {
			openers,
			cache: Mutex::new(LimitedCache::new(max_open.max(1))),
		}
	}

	/// A pool over already-open sources; used by tests and library callers.
	pub fn from_sources(sources: Vec<Arc<dyn RasterSource>>) -> SourcePool {
		let max_open = sources.len().max(1);
		let openers = sources
			.into_iter()
			.map(|source| {
				let opener: SourceOpener = Arc::new(move || Ok(source.clone()));
				opener
			})
			.collect();
		SourcePool::new(openers, max_open)
	}

	pub fn len(&self) -> usize {
		self.openers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.openers.is_empty()
	}

	/// Returns the reader for input `index`, opening it if necessary.
	pub fn get(&self, index: usize) -> Result<Arc<dyn RasterSource>> {
		let opener = self
			.openers
			.get(index)
			.with_context(|| format!("no input registered at index {index}"))?
			.clone();
		let mut cache = self.cache.lock().unwrap();
		cache.get_or_open(&index, || opener())
	}

	/// Number of currently open readers.
	pub fn open_count(&self) -> usize {
		self.cache.lock().unwrap().len()
	}
}

impl std::fmt::Debug for SourcePool {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SourcePool")
			.field("inputs", &self.openers.len())
			.field("open", &self.open_count())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::MemoryRaster;
	use demtiles_core::{Georef, Srs};
	use std::sync::atomic::{AtomicUsize, Ordering};

	fn test_opener(opens: Arc<AtomicUsize>) -> SourceOpener {
		Arc::new(move || {
			opens.fetch_add(1, Ordering::SeqCst);
			let georef = Georef::from_origin(Srs::new("EPSG:4326"), 0.0, 1.0, 1.0, 1.0, -9999.0)?;
			Ok(Arc::new(MemoryRaster::filled(georef, 2, 2, 7.0)) as Arc<dyn RasterSource>)
		})
	}

	#[test]
	fn test_opens_lazily_and_caches() {
		let opens = Arc::new(AtomicUsize::new(0));
		let pool = SourcePool::new(vec![test_opener(opens.clone())], 4);
		assert_eq!(opens.load(Ordering::SeqCst), 0);

		let a = pool.get(0).unwrap();
		let b = pool.get(0).unwrap();
		assert_eq!(opens.load(Ordering::SeqCst), 1);
		assert!(Arc::ptr_eq(&a, &b));
	}

	#[test]
	fn test_eviction_reopens() {
		let opens = Arc::new(AtomicUsize::new(0));
		let pool = SourcePool::new(vec![test_opener(opens.clone()), test_opener(opens.clone())], 1);

		pool.get(0).unwrap();
		pool.get(1).unwrap(); // evicts 0
		pool.get(0).unwrap(); // reopens 0
		assert_eq!(opens.load(Ordering::SeqCst), 3);
		assert_eq!(pool.open_count(), 1);
	}

	#[test]
	fn test_unknown_index_fails() {
		let pool = SourcePool::new(vec![], 1);
		assert!(pool.get(0).is_err());
	}
}
