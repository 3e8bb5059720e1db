/// The interface shared by all progress indicators.
pub trait ProgressTrait: Send + Sync {
	/// Creates a new, uninitialized indicator.
	fn new() -> Self
	where
		Self: Sized;

	/// Starts reporting: sets the task description and the maximum value.
	fn init(&mut self, message: &str, max_value: u64);

	/// Moves the progress to an absolute position.
	fn set_position(&mut self, value: u64);

	/// Advances the progress by `value` steps.
	fn inc(&mut self, value: u64);

	/// Completes the progress and releases the display line.
	fn finish(&mut self);
}
