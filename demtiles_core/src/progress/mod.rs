//! Progress indicators for long-running mosaicking runs.
//!
//! The `cli` feature selects a terminal progress bar; without it (and in
//! tests) a no-op drain is used so library consumers and test runs stay
//! silent.

mod traits;
pub use traits::ProgressTrait;

#[cfg(all(not(feature = "test"), feature = "cli"))]
mod progress_bar;
#[cfg(all(not(feature = "test"), feature = "cli"))]
pub use progress_bar::ProgressBar;

mod progress_drain;
pub use progress_drain::ProgressDrain;

/// Creates a progress indicator matching the build configuration.
pub fn get_progress_bar(message: &str, max_value: u64) -> Box<dyn ProgressTrait> {
	#[cfg(all(not(feature = "test"), feature = "cli"))]
	let mut progress = ProgressBar::new();
	#[cfg(any(feature = "test", not(feature = "cli")))]
	let mut progress = ProgressDrain::new();
	progress.init(message, max_value);
	Box::new(progress)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_factory_returns_working_indicator() {
		let mut progress = get_progress_bar("testing", 10);
		progress.set_position(5);
		progress.inc(2);
		progress.finish();
	}
}
