//! Kubernetes resource quantities (`500m`, `2Gi`, `1.5`, `1e3`).

use phf::phf_map;
use serde_json::Value;
use thiserror::Error;

/// Bytes in one gibibyte
pub const GIBS: f64 = 1_073_741_824.0;

/// Multipliers of the quantity suffixes accepted by Kubernetes.
static UNITS: phf::Map<&'static str, f64> = phf_map! {
	"n" => 1e-9,
	"u" => 1e-6,
	"m" => 1e-3,
	"k" => 1e3,
	"K" => 1e3,
	"M" => 1e6,
	"G" => 1e9,
	"T" => 1e12,
	"P" => 1e15,
	"E" => 1e18,
	"Ki" => 1_024.0,
	"Mi" => 1_048_576.0,
	"Gi" => 1_073_741_824.0,
	"Ti" => 1_099_511_627_776.0,
	"Pi" => 1_125_899_906_842_624.0,
	"Ei" => 1_152_921_504_606_846_976.0,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuantityError {
	#[error("empty quantity")]
	Empty,

	#[error("invalid quantity number in {0:?}")]
	InvalidNumber(String),

	#[error("unknown quantity unit {unit:?} in {quantity:?}")]
	UnknownUnit { quantity: String, unit: String },
}

/// Parse a quantity string into a plain number (cores or bytes).
///
/// The suffix is the trailing run of ASCII letters, so `1e3` is read as an
/// exponent while `1E` is exa.
pub fn parse_quantity(quantity: &str) -> Result<f64, QuantityError> {
	let trimmed = quantity.trim();
	if trimmed.is_empty() {
		return Err(QuantityError::Empty);
	}

	let split = trimmed
		.char_indices()
		.rev()
		.take_while(|(_, c)| c.is_ascii_alphabetic())
		.last()
		.map_or(trimmed.len(), |(i, _)| i);
	let (number, unit) = trimmed.split_at(split);

	let number: f64 = number
		.parse()
		.map_err(|_| QuantityError::InvalidNumber(quantity.to_string()))?;

	if unit.is_empty() {
		return Ok(number);
	}
	let factor = UNITS.get(unit).ok_or_else(|| QuantityError::UnknownUnit {
		quantity: quantity.to_string(),
		unit: unit.to_string(),
	})?;
	Ok(number * factor)
}

/// Numeric value of a resource field as found in a manifest.
///
/// Missing, empty and zero values are `None`, numbers pass through and
/// strings are parsed as quantities.
pub fn resource_value(value: &Value) -> Option<f64> {
	match value {
		Value::Number(n) => n.as_f64().filter(|v| *v != 0.0),
		Value::String(s) if s.is_empty() => None,
		Value::String(s) => parse_quantity(s).ok().filter(|v| *v != 0.0),
		_ => None,
	}
}
