use crate::codec::primitive::{Primitive, parse_int_literal};
use crate::codec::{CodecError, Result};

/// One declared `(name, value)` pair of an enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumOption {
	/// Option name as declared.
	pub name: Box<str>,
	/// Integer value.
	pub value: i64,
}

/// Named integer domain backed by an integer primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
	/// Backing integer kind (1, 2 or 4 bytes).
	pub storage: Primitive,
	/// Declared options in declaration order.
	pub options: Vec<EnumOption>,
}

impl EnumDef {
	/// Declared name for `value`.
	pub fn name_of(&self, value: i64) -> Option<&str> {
		self.options.iter().find(|option| option.value == value).map(|option| &*option.name)
	}

	/// Declared value for `name`.
	pub fn value_of(&self, name: &str) -> Option<i64> {
		self.options.iter().find(|option| &*option.name == name).map(|option| option.value)
	}

	/// Require `value` to be one of the declared options.
	pub fn check(&self, enum_name: &str, value: i64) -> Result<i64> {
		if self.name_of(value).is_none() {
			return Err(CodecError::InvalidEnumValue {
				enum_name: enum_name.into(),
				value,
			});
		}
		Ok(value)
	}

	/// Resolve an option name, decimal or `0x` hex literal to a declared value.
	pub fn parse(&self, enum_name: &str, text: &str) -> Result<i64> {
		if let Some(value) = self.value_of(text.trim()) {
			return Ok(value);
		}
		let value = parse_int_literal(text).ok_or_else(|| CodecError::BadLiteral {
			type_name: enum_name.into(),
			text: text.into(),
		})?;
		self.check(enum_name, value)
	}

	/// Option name, or a marker carrying the raw value when undeclared.
	pub fn render(&self, value: i64) -> String {
		match self.name_of(value) {
			Some(name) => name.to_owned(),
			None => format!("<INVALID ({value})>"),
		}
	}
}
