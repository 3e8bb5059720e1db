//! Error kinds raised by the mosaicking pipeline.
//!
//! All fallible functions in this workspace return `anyhow::Result`. Errors
//! that callers may want to classify carry a [`MosaicError`] at the root of
//! the chain; its [`ErrorKind`] can be recovered with
//! `error.downcast_ref::<MosaicError>()`.

use std::fmt;

/// Classification of unrecoverable errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	/// Invalid or conflicting options. Raised before any tile work starts.
	Config,
	/// Missing file, unreadable georeference or an empty input set.
	Input,
	/// Empty output box, or single-file output while more than one tile is needed.
	Grid,
	/// A read or write failure while processing a tile.
	Io,
	/// A violated internal invariant.
	Internal,
}

impl fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		let name = match self {
			ErrorKind::Config => "config error",
			ErrorKind::Input => "input error",
			ErrorKind::Grid => "grid error",
			ErrorKind::Io => "io error",
			ErrorKind::Internal => "internal error",
		};
		f.write_str(name)
	}
}

/// An error with a [`ErrorKind`] classification.
///
/// # Examples
/// ```
/// use demtiles_core::{ErrorKind, MosaicError};
///
/// let error: anyhow::Error = MosaicError::config("pixel size must be positive");
/// let kind = error.downcast_ref::<MosaicError>().unwrap().kind();
/// assert_eq!(kind, ErrorKind::Config);
/// ```
#[derive(Debug, Clone)]
pub struct MosaicError {
	kind: ErrorKind,
	msg: String,
}

impl MosaicError {
	/// Creates a new error of the given kind, wrapped as `anyhow::Error`.
	pub fn new(kind: ErrorKind, msg: impl Into<String>) -> anyhow::Error {
		anyhow::Error::new(MosaicError { kind, msg: msg.into() })
	}

	/// Shorthand for [`ErrorKind::Config`].
	pub fn config(msg: impl Into<String>) -> anyhow::Error {
		Self::new(ErrorKind::Config, msg)
	}

	/// Shorthand for [`ErrorKind::Input`].
	pub fn input(msg: impl Into<String>) -> anyhow::Error {
		Self::new(ErrorKind::Input, msg)
	}

	/// Shorthand for [`ErrorKind::Grid`].
	pub fn grid(msg: impl Into<String>) -> anyhow::Error {
		Self::new(ErrorKind::Grid, msg)
	}

	/// Shorthand for [`ErrorKind::Io`].
	pub fn io(msg: impl Into<String>) -> anyhow::Error {
		Self::new(ErrorKind::Io, msg)
	}

	/// Shorthand for [`ErrorKind::Internal`].
	pub fn internal(msg: impl Into<String>) -> anyhow::Error {
		Self::new(ErrorKind::Internal, msg)
	}

	/// Returns the error classification.
	pub fn kind(&self) -> ErrorKind {
		self.kind
	}
}

impl fmt::Display for MosaicError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}: {}", self.kind, self.msg)
	}
}

impl std::error::Error for MosaicError {}
