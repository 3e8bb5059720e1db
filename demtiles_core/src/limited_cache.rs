//! A bounded LRU cache for expensive-to-open values.
//!
//! Used to keep a limited number of raster readers open at once: inputs are
//! opened lazily on first read and the least-recently-used reader is dropped
//! when the limit is reached.

use anyhow::Result;
use lru::LruCache;
use std::{fmt::Debug, hash::Hash, num::NonZeroUsize};

/// A key-value cache that evicts least-recently-used entries beyond a fixed
/// number of elements.
///
/// # Examples
/// ```
/// use demtiles_core::LimitedCache;
///
/// let mut cache = LimitedCache::<u32, String>::new(2);
/// cache.add(1, "one".to_string());
/// cache.add(2, "two".to_string());
/// cache.add(3, "three".to_string());
/// assert_eq!(cache.get(&1), None); // evicted
/// assert_eq!(cache.get(&3), Some("three".to_string()));
/// ```
pub struct LimitedCache<K, V> {
	cache: LruCache<K, V>,
}

impl<K, V> LimitedCache<K, V>
where
	K: Clone + Debug + Eq + Hash,
	V: Clone,
{
	/// Creates a cache holding at most `max_length` entries.
	///
	/// # Panics
	/// Panics if `max_length` is zero.
	pub fn new(max_length: usize) -> Self {
		assert!(max_length > 0, "cache capacity must be at least 1");
		Self {
			cache: LruCache::new(NonZeroUsize::new(max_length).unwrap()),
		}
	}

	/// Creates a cache sized from a byte budget and a per-entry estimate.
	pub fn with_maximum_size(maximum_size: usize, per_element_size: usize) -> Self {
		Self::new((maximum_size / per_element_size.max(1)).max(1))
	}

	/// Retrieves a cloned value, marking the entry most recently used.
	pub fn get(&mut self, key: &K) -> Option<V> {
		self.cache.get(key).cloned()
	}

	/// Returns the cached value for `key`, or opens it with `callback`,
	/// stores it and returns it. Errors from the callback propagate and
	/// nothing is stored.
	pub fn get_or_open<F>(&mut self, key: &K, callback: F) -> Result<V>
	where
		F: FnOnce() -> Result<V>,
	{
		if let Some(cached) = self.get(key) {
			return Ok(cached);
		}
		let value = callback()?;
		self.cache.put(key.clone(), value.clone());
		Ok(value)
	}

	/// Inserts a value, evicting the least recently used entry if full.
	pub fn add(&mut self, key: K, value: V) -> V {
		self.cache.put(key, value.clone());
		value
	}

	/// Drops every entry.
	pub fn clear(&mut self) {
		self.cache.clear();
	}

	pub fn len(&self) -> usize {
		self.cache.len()
	}

	pub fn is_empty(&self) -> bool {
		self.cache.is_empty()
	}

	pub fn capacity(&self) -> usize {
		self.cache.cap().get()
	}
}

impl<K, V> Debug for LimitedCache<K, V>
where
	K: Clone + Debug + Eq + Hash,
	V: Clone,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LimitedCache")
			.field("length", &self.cache.len())
			.field("capacity", &self.cache.cap().get())
			.finish()
	}
}
