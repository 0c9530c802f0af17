use std::borrow::Cow;

use crate::codec::bytes::{ByteSink, Cursor};
use crate::codec::{CodecError, Result, Value};

/// Longest accepted NUL-terminated string.
pub const MAX_ZSTRING_LEN: usize = 1000;
/// Longest accepted length-prefixed string.
pub const MAX_SIZED_STRING_LEN: usize = 10_000;

/// Built-in leaf types with a fixed wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
	/// Signed 8-bit integer.
	Byte,
	/// Unsigned 8-bit integer.
	UByte,
	/// Signed 16-bit integer.
	Short,
	/// Unsigned 16-bit integer.
	UShort,
	/// Signed 32-bit integer.
	Int,
	/// Unsigned 32-bit integer.
	UInt,
	/// One byte, 0 or 1.
	Bool,
	/// One byte character.
	Char,
	/// 32-bit IEEE-754 float.
	Float,
	/// NUL-terminated string.
	ZString,
	/// `u32` length followed by raw bytes.
	SizedString,
	/// NUL-padded string of exactly `N` bytes.
	FixedString(u16),
}

impl Primitive {
	/// Every primitive addressable by a plain name.
	pub const NAMED: [Self; 11] = [
		Self::Byte,
		Self::UByte,
		Self::Short,
		Self::UShort,
		Self::Int,
		Self::UInt,
		Self::Bool,
		Self::Char,
		Self::Float,
		Self::ZString,
		Self::SizedString,
	];

	/// Schema-facing type name.
	pub fn name(self) -> Cow<'static, str> {
		Cow::Borrowed(match self {
			Self::Byte => "Byte",
			Self::UByte => "UByte",
			Self::Short => "Short",
			Self::UShort => "UShort",
			Self::Int => "Int",
			Self::UInt => "UInt",
			Self::Bool => "Bool",
			Self::Char => "Char",
			Self::Float => "Float",
			Self::ZString => "ZString",
			Self::SizedString => "SizedString",
			Self::FixedString(len) => return Cow::Owned(format!("String<{len}>")),
		})
	}

	/// Resolve a schema type name, including the `String<N>` form.
	pub fn from_name(name: &str) -> Option<Self> {
		if let Some(len) = name.strip_prefix("String<").and_then(|rest| rest.strip_suffix('>')) {
			return len.parse::<u16>().ok().filter(|len| *len > 0).map(Self::FixedString);
		}
		Self::NAMED.into_iter().find(|prim| prim.name() == name)
	}

	/// Inclusive value range for integer kinds.
	pub fn int_range(self) -> Option<(i64, i64)> {
		match self {
			Self::Byte => Some((i64::from(i8::MIN), i64::from(i8::MAX))),
			Self::UByte | Self::Char => Some((0, i64::from(u8::MAX))),
			Self::Short => Some((i64::from(i16::MIN), i64::from(i16::MAX))),
			Self::UShort => Some((0, i64::from(u16::MAX))),
			Self::Int => Some((i64::from(i32::MIN), i64::from(i32::MAX))),
			Self::UInt => Some((0, i64::from(u32::MAX))),
			Self::Bool => Some((0, 1)),
			_ => None,
		}
	}

	/// Byte width of integer kinds, used for enum and bitfield storage.
	pub fn int_width(self) -> Option<usize> {
		match self {
			Self::Byte | Self::UByte | Self::Bool | Self::Char => Some(1),
			Self::Short | Self::UShort => Some(2),
			Self::Int | Self::UInt => Some(4),
			_ => None,
		}
	}

	/// Whether the integer kind is unsigned.
	pub fn is_unsigned(self) -> bool {
		matches!(self, Self::UByte | Self::UShort | Self::UInt | Self::Bool | Self::Char)
	}

	/// Whether values of this kind are strings.
	pub fn is_string(self) -> bool {
		matches!(self, Self::ZString | Self::SizedString | Self::FixedString(_))
	}

	/// Longest string payload this kind can encode.
	pub fn max_str_len(self) -> Option<usize> {
		match self {
			Self::ZString => Some(MAX_ZSTRING_LEN),
			Self::SizedString => Some(MAX_SIZED_STRING_LEN),
			Self::FixedString(len) => Some(usize::from(len)),
			_ => None,
		}
	}

	fn kind_label(self) -> &'static str {
		match self {
			Self::Float => "float",
			_ if self.is_string() => "string",
			_ => "int",
		}
	}

	/// Zero value for this kind.
	pub fn default_value(self) -> Value {
		match self {
			Self::Float => Value::Float(0.0),
			_ if self.is_string() => Value::Str(Vec::new()),
			_ => Value::Int(0),
		}
	}

	/// Decode one value.
	pub fn read(self, cur: &mut Cursor<'_>) -> Result<Value> {
		match self {
			Self::Float => Ok(Value::Float(cur.read_f32_le()?)),
			Self::ZString => {
				let raw = cur.read_cstring_bytes()?;
				if raw.len() > MAX_ZSTRING_LEN {
					return Err(CodecError::StringTooLong {
						len: raw.len(),
						max: MAX_ZSTRING_LEN,
					});
				}
				Ok(Value::Str(raw.to_vec()))
			}
			Self::SizedString => {
				let len = cur.read_u32_le()? as usize;
				if len > MAX_SIZED_STRING_LEN {
					return Err(CodecError::StringTooLong {
						len,
						max: MAX_SIZED_STRING_LEN,
					});
				}
				Ok(Value::Str(cur.read_exact(len)?.to_vec()))
			}
			Self::FixedString(len) => {
				let raw = cur.read_exact(usize::from(len))?;
				Ok(Value::Str(until_nul(raw).to_vec()))
			}
			_ => Ok(Value::Int(self.read_int(cur)?)),
		}
	}

	/// Encode one value.
	pub fn write(self, value: &Value, sink: &mut ByteSink) -> Result<()> {
		match (self, value) {
			(Self::Float, Value::Float(value)) => sink.put_f32_le(*value),
			(Self::ZString, Value::Str(raw)) => {
				let raw = until_nul(raw);
				check_len(raw.len(), MAX_ZSTRING_LEN)?;
				sink.put_bytes(raw);
				sink.put_u8(0);
			}
			(Self::SizedString, Value::Str(raw)) => {
				check_len(raw.len(), MAX_SIZED_STRING_LEN)?;
				sink.put_u32_le(raw.len() as u32);
				sink.put_bytes(raw);
			}
			(Self::FixedString(len), Value::Str(raw)) => {
				let len = usize::from(len);
				check_len(raw.len(), len)?;
				sink.put_bytes(raw);
				sink.put_zeros(len - raw.len());
			}
			(_, Value::Int(value)) if self.int_width().is_some() => self.write_int(*value, sink)?,
			_ => {
				return Err(CodecError::ValueKind {
					expected: self.kind_label(),
					got: value.kind(),
				});
			}
		}
		Ok(())
	}

	/// Encoded byte count of `value`.
	pub fn size(self, value: &Value) -> Result<usize> {
		if let Some(width) = self.int_width() {
			return Ok(width);
		}
		match (self, value) {
			(Self::Float, _) => Ok(4),
			(Self::FixedString(len), _) => Ok(usize::from(len)),
			(Self::ZString, Value::Str(raw)) => Ok(until_nul(raw).len() + 1),
			(Self::SizedString, Value::Str(raw)) => Ok(4 + raw.len()),
			_ => Err(CodecError::ValueKind {
				expected: self.kind_label(),
				got: value.kind(),
			}),
		}
	}

	/// Decode an integer kind.
	pub fn read_int(self, cur: &mut Cursor<'_>) -> Result<i64> {
		Ok(match self {
			Self::Byte => i64::from(cur.read_i8()?),
			Self::UByte | Self::Char => i64::from(cur.read_u8()?),
			Self::Bool => i64::from(cur.read_u8()? != 0),
			Self::Short => i64::from(cur.read_i16_le()?),
			Self::UShort => i64::from(cur.read_u16_le()?),
			Self::Int => i64::from(cur.read_i32_le()?),
			Self::UInt => i64::from(cur.read_u32_le()?),
			_ => {
				return Err(CodecError::ValueKind {
					expected: "int",
					got: self.kind_label(),
				});
			}
		})
	}

	/// Encode an integer kind after checking its range.
	pub fn write_int(self, value: i64, sink: &mut ByteSink) -> Result<()> {
		let value = self.check_int(value)?;
		match self {
			Self::Byte => sink.put_i8(value as i8),
			Self::UByte | Self::Char | Self::Bool => sink.put_u8(value as u8),
			Self::Short => sink.put_i16_le(value as i16),
			Self::UShort => sink.put_u16_le(value as u16),
			Self::Int => sink.put_i32_le(value as i32),
			Self::UInt => sink.put_u32_le(value as u32),
			_ => {
				return Err(CodecError::ValueKind {
					expected: self.kind_label(),
					got: "int",
				});
			}
		}
		Ok(())
	}

	/// Validate `value` against the declared range.
	pub fn check_int(self, value: i64) -> Result<i64> {
		let (min, max) = self.int_range().ok_or(CodecError::ValueKind {
			expected: self.kind_label(),
			got: "int",
		})?;
		if value < min || value > max {
			return Err(CodecError::Range {
				type_name: self.name().into(),
				value,
				min,
				max,
			});
		}
		Ok(value)
	}

	/// Convert text to a value of this kind, range-checked.
	pub fn parse_literal(self, text: &str) -> Result<Value> {
		let bad = || CodecError::BadLiteral {
			type_name: self.name().into(),
			text: text.into(),
		};
		match self {
			Self::Float => text.trim().parse::<f32>().map(Value::Float).map_err(|_| bad()),
			Self::FixedString(len) => {
				check_len(text.len(), usize::from(len))?;
				Ok(Value::Str(text.as_bytes().to_vec()))
			}
			Self::ZString => {
				check_len(text.len(), MAX_ZSTRING_LEN)?;
				Ok(Value::Str(until_nul(text.as_bytes()).to_vec()))
			}
			Self::SizedString => {
				check_len(text.len(), MAX_SIZED_STRING_LEN)?;
				Ok(Value::Str(text.as_bytes().to_vec()))
			}
			Self::Bool if text.eq_ignore_ascii_case("true") => Ok(Value::Int(1)),
			Self::Bool if text.eq_ignore_ascii_case("false") => Ok(Value::Int(0)),
			_ => {
				let value = parse_int_literal(text).ok_or_else(bad)?;
				Ok(Value::Int(self.check_int(value)?))
			}
		}
	}

	/// Human-readable rendering of `value`.
	pub fn render(self, value: &Value) -> String {
		match (self, value) {
			(Self::Char, Value::Int(code)) => match u8::try_from(*code) {
				Ok(byte) if byte.is_ascii_graphic() || byte == b' ' => char::from(byte).to_string(),
				_ => code.to_string(),
			},
			(Self::Bool, Value::Int(flag)) => (*flag != 0).to_string(),
			(_, Value::Int(value)) => value.to_string(),
			(_, Value::Float(value)) => format!("{value:.4}"),
			(_, Value::Str(raw)) => String::from_utf8_lossy(raw).into_owned(),
			_ => format!("<{}>", value.kind()),
		}
	}
}

/// Parse a decimal or `0x`-prefixed hex integer literal.
pub fn parse_int_literal(text: &str) -> Option<i64> {
	let text = text.trim();
	if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
		return i64::from_str_radix(hex, 16).ok();
	}
	text.parse::<i64>().ok()
}

fn until_nul(raw: &[u8]) -> &[u8] {
	match raw.iter().position(|byte| *byte == 0) {
		Some(end) => &raw[..end],
		None => raw,
	}
}

fn check_len(len: usize, max: usize) -> Result<()> {
	if len > max {
		return Err(CodecError::StringTooLong { len, max });
	}
	Ok(())
}
