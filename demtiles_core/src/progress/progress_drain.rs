use super::ProgressTrait;

/// A no-op progress indicator.
///
/// Offers the progress interface without producing any terminal output,
/// for library consumers and test runs.
pub struct ProgressDrain {}

impl ProgressTrait for ProgressDrain {
	fn new() -> Self {
		Self {}
	}

	fn init(&mut self, message: &str, max_value: u64) {
		log::debug!("progress start: {message} (0/{max_value})");
	}

	fn set_position(&mut self, _value: u64) {}

	fn inc(&mut self, _value: u64) {}

	fn finish(&mut self) {}
}
