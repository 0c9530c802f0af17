use crate::codec::expr::{EvalContext, Scalar};
use crate::codec::{CodecError, Result};

/// Version pair a record is read or written under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Versions {
	/// Packed file or block version.
	pub version: u32,
	/// Format-specific user version.
	pub user_version: u32,
}

impl Versions {
	/// Build a version pair.
	pub fn new(version: u32, user_version: u32) -> Self {
		Self { version, user_version }
	}
}

impl EvalContext for Versions {
	fn lookup(&self, name: &str) -> Result<Scalar> {
		match name {
			"version" => Ok(Scalar::Int(i64::from(self.version))),
			"user_version" => Ok(Scalar::Int(i64::from(self.user_version))),
			_ => Err(CodecError::MissingField {
				name: name.into(),
				context: "version context".into(),
			}),
		}
	}
}

/// Parse a dotted version literal such as `20.2.0.7` into `0x14020007`.
///
/// Missing trailing components are zero. Plain decimal and `0x` hex literals
/// are accepted as already-packed values.
pub fn parse_version(text: &str) -> Option<u32> {
	let text = text.trim();
	if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
		return u32::from_str_radix(hex, 16).ok();
	}
	if !text.contains('.') {
		return text.parse::<u32>().ok();
	}

	let mut packed = 0_u32;
	let mut count = 0;
	for part in text.split('.') {
		if count == 4 {
			return None;
		}
		let byte = part.parse::<u8>().ok()?;
		packed |= u32::from(byte) << (24 - 8 * count);
		count += 1;
	}
	Some(packed)
}

/// Render a packed version as four dotted components.
pub fn format_version(version: u32) -> String {
	let [a, b, c, d] = version.to_be_bytes();
	format!("{a}.{b}.{c}.{d}")
}
