//! Output sample types and on-disk compression options.

use anyhow::{Result, bail};
#[cfg(feature = "cli")]
use clap::ValueEnum;
use std::fmt::Display;

/// The sample type of the written output raster.
#[cfg_attr(feature = "cli", derive(ValueEnum))]
#[cfg_attr(feature = "cli", value(rename_all = "lower"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputType {
	Byte,
	UInt16,
	Int16,
	UInt32,
	Int32,
	#[default]
	Float32,
}

impl OutputType {
	/// The representable value range, `None` for floating-point output.
	pub fn range(&self) -> Option<(f64, f64)> {
		match self {
			OutputType::Byte => Some((0.0, 255.0)),
			OutputType::UInt16 => Some((0.0, 65_535.0)),
			OutputType::Int16 => Some((-32_768.0, 32_767.0)),
			OutputType::UInt32 => Some((0.0, 4_294_967_295.0)),
			OutputType::Int32 => Some((-2_147_483_648.0, 2_147_483_647.0)),
			OutputType::Float32 => None,
		}
	}

	pub fn is_integer(&self) -> bool {
		self.range().is_some()
	}

	/// Converts one finished mosaic value to this output type: integer
	/// types round half-to-even and clamp, floating output passes through.
	pub fn convert(&self, value: f64) -> f64 {
		match self.range() {
			Some((min, max)) => round_half_to_even(value).clamp(min, max),
			None => value,
		}
	}
}

impl Display for OutputType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			OutputType::Byte => "Byte",
			OutputType::UInt16 => "UInt16",
			OutputType::Int16 => "Int16",
			OutputType::UInt32 => "UInt32",
			OutputType::Int32 => "Int32",
			OutputType::Float32 => "Float32",
		})
	}
}

impl TryFrom<&str> for OutputType {
	type Error = anyhow::Error;

	fn try_from(value: &str) -> Result<Self> {
		Ok(match value.to_ascii_lowercase().as_str() {
			"byte" => OutputType::Byte,
			"uint16" => OutputType::UInt16,
			"int16" => OutputType::Int16,
			"uint32" => OutputType::UInt32,
			"int32" => OutputType::Int32,
			"float32" => OutputType::Float32,
			_ => bail!("unknown output type '{value}'; expected Byte, UInt16, Int16, UInt32, Int32 or Float32"),
		})
	}
}

/// Banker's rounding: ties go to the even neighbor.
fn round_half_to_even(value: f64) -> f64 {
	let rounded = value.round();
	if (value - value.trunc()).abs() == 0.5 && rounded % 2.0 != 0.0 {
		rounded - value.signum()
	} else {
		rounded
	}
}

/// Compression of the written GeoTIFF.
#[cfg_attr(feature = "cli", derive(ValueEnum))]
#[cfg_attr(feature = "cli", value(rename_all = "lower"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TifCompression {
	None,
	#[default]
	Lzw,
	Deflate,
	Packbits,
}

impl Display for TifCompression {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			TifCompression::None => "NONE",
			TifCompression::Lzw => "LZW",
			TifCompression::Deflate => "DEFLATE",
			TifCompression::Packbits => "PACKBITS",
		})
	}
}
