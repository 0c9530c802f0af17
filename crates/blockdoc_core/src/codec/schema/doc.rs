use serde::{Deserialize, Serialize};

/// Serialized schema document, the input to [`Schema::from_doc`](super::Schema::from_doc).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDoc {
	/// Container-level layout description.
	pub format: FormatDoc,
	/// Enum declarations.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub enums: Vec<EnumDoc>,
	/// Bitfield declarations.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub bitfields: Vec<BitfieldDoc>,
	/// Record declarations.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub records: Vec<RecordDoc>,
}

/// Container layout section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormatDoc {
	/// Format name used in messages.
	pub name: String,
	/// Leading signature bytes.
	pub magic: String,
	/// Supported versions; empty accepts any.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub versions: Vec<LiteralDoc>,
	/// First version whose "no link" token is `-1` instead of `0`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub link_sentinel_since: Option<LiteralDoc>,
	/// Record type decoded before the blocks.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub header: Option<String>,
	/// Record type decoded after the block table.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub footer: Option<String>,
	/// Footer link array that lists the root blocks.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub roots_field: Option<String>,
	/// Block types listed before the parent that references them.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub child_first: Vec<String>,
}

/// Integer, float or text literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralDoc {
	/// Integer literal.
	Int(i64),
	/// Floating-point literal.
	Float(f64),
	/// Text literal (dotted versions, hex, names).
	Text(String),
}

impl LiteralDoc {
	/// Render as text for the literal parsers.
	pub fn to_text(&self) -> String {
		match self {
			Self::Int(value) => value.to_string(),
			Self::Float(value) => value.to_string(),
			Self::Text(value) => value.clone(),
		}
	}
}

/// Enum declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumDoc {
	/// Type name.
	pub name: String,
	/// Backing integer type name.
	pub storage: String,
	/// Declared options.
	pub options: Vec<EnumOptionDoc>,
}

/// One enum option.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumOptionDoc {
	/// Option name.
	pub name: String,
	/// Option value, decimal or `0x` hex.
	pub value: LiteralDoc,
}

/// Bitfield declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BitfieldDoc {
	/// Type name.
	pub name: String,
	/// Backing unsigned integer type name.
	pub storage: String,
	/// Members, lowest bits first.
	pub members: Vec<BitMemberDoc>,
}

/// One bitfield member.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BitMemberDoc {
	/// Member name.
	pub name: String,
	/// Width in bits.
	pub width: u32,
	/// Value for fresh instances.
	#[serde(default)]
	pub default: u32,
}

/// Record declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordDoc {
	/// Type name.
	pub name: String,
	/// Base record name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub base: Option<String>,
	/// Whether `TEMPLATE` may appear in this record's fields.
	#[serde(default)]
	pub template: bool,
	/// Own fields in declaration order.
	#[serde(default)]
	pub fields: Vec<FieldDoc>,
}

/// Field declaration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDoc {
	/// Field label; the canonical name is derived from it.
	pub name: String,
	/// Value type name or `TEMPLATE`.
	#[serde(rename = "type")]
	pub ty: String,
	/// Template argument or link target type name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub template: Option<String>,
	/// Default value literal.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub default: Option<LiteralDoc>,
	/// Expression passed down as the value's argument.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub arg: Option<String>,
	/// First array dimension expression.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub arr1: Option<String>,
	/// Second array dimension expression.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub arr2: Option<String>,
	/// Presence condition evaluated against the record.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub cond: Option<String>,
	/// Presence condition evaluated against the version pair.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub vercond: Option<String>,
	/// First version carrying the field.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ver1: Option<LiteralDoc>,
	/// Last version carrying the field.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ver2: Option<LiteralDoc>,
	/// Exact user version carrying the field.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub userver: Option<u32>,
	/// Gated like a normal field but never read or written.
	#[serde(default, rename = "abstract")]
	pub is_abstract: bool,
	/// Free-form documentation.
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub doc: String,
}
