use std::collections::HashMap;
use std::ops::BitOr;

use crate::codec::bitfield::BitfieldDef;
use crate::codec::enums::EnumDef;
use crate::codec::expr::Expr;
use crate::codec::link::LinkKind;
use crate::codec::primitive::Primitive;
use crate::codec::value::ElementType;
use crate::codec::version::Versions;
use crate::codec::{CodecError, Result, SchemaError};

mod build;
mod doc;

pub use doc::{BitMemberDoc, BitfieldDoc, EnumDoc, EnumOptionDoc, FieldDoc, FormatDoc, LiteralDoc, RecordDoc, SchemaDoc};

/// Index of a type inside one [`Schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
	/// Position in the schema type table.
	pub fn index(self) -> usize {
		self.0 as usize
	}
}

/// Precomputed "transitively contains" flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeFlags {
	/// Contains Ref or Ptr fields.
	pub has_links: bool,
	/// Contains Ref fields.
	pub has_refs: bool,
	/// Contains string fields.
	pub has_strings: bool,
}

impl BitOr for TypeFlags {
	type Output = Self;

	fn bitor(self, rhs: Self) -> Self {
		Self {
			has_links: self.has_links || rhs.has_links,
			has_refs: self.has_refs || rhs.has_refs,
			has_strings: self.has_strings || rhs.has_strings,
		}
	}
}

/// What a schema type is.
#[derive(Debug, Clone)]
pub enum TypeKind {
	/// Built-in leaf.
	Primitive(Primitive),
	/// Named integer domain.
	Enum(EnumDef),
	/// Packed sub-fields.
	Bitfield(BitfieldDef),
	/// Compound record.
	Record(RecordDef),
	/// Ref or Ptr.
	Link(LinkKind),
}

impl TypeKind {
	/// Stable lowercase label.
	pub fn label(&self) -> &'static str {
		match self {
			Self::Primitive(_) => "primitive",
			Self::Enum(_) => "enum",
			Self::Bitfield(_) => "bitfield",
			Self::Record(_) => "record",
			Self::Link(_) => "link",
		}
	}
}

/// One entry of the schema type table.
#[derive(Debug, Clone)]
pub struct TypeDef {
	/// Declared name.
	pub name: Box<str>,
	/// Definition.
	pub kind: TypeKind,
	/// Transitive content flags.
	pub flags: TypeFlags,
}

/// Declared field type: a concrete type or the enclosing record's template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
	/// The `TEMPLATE` placeholder.
	Template,
	/// A concrete type.
	Type(TypeId),
}

impl FieldType {
	/// Substitute the placeholder with `template`.
	pub fn resolve(self, template: Option<TypeId>) -> Option<TypeId> {
		match self {
			Self::Template => template,
			Self::Type(ty) => Some(ty),
		}
	}
}

/// Static metadata for one record member.
#[derive(Debug, Clone)]
pub struct FieldSpec {
	/// Canonical name (lower-case, `_`-joined).
	pub name: Box<str>,
	/// Name as declared.
	pub label: Box<str>,
	/// Value type.
	pub ty: FieldType,
	/// Template argument or link target.
	pub template: Option<FieldType>,
	/// Default literal for non-array leaf values.
	pub default: Option<Box<str>>,
	/// Argument passed to the value.
	pub arg: Option<Expr>,
	/// First array dimension.
	pub arr1: Option<Expr>,
	/// Second array dimension.
	pub arr2: Option<Expr>,
	/// Presence condition on the record.
	pub cond: Option<Expr>,
	/// Presence condition on the version pair.
	pub vercond: Option<Expr>,
	/// First version carrying the field.
	pub ver1: Option<u32>,
	/// Last version carrying the field.
	pub ver2: Option<u32>,
	/// Exact user version carrying the field.
	pub userver: Option<u32>,
	/// Gated but never read or written.
	pub is_abstract: bool,
	/// Documentation text.
	pub doc: Box<str>,
	/// Value slot in the owning record.
	pub slot: usize,
}

impl FieldSpec {
	/// Whether values of this field are arrays.
	pub fn is_array(&self) -> bool {
		self.arr1.is_some()
	}

	/// Apply the version, user-version and version-condition gates.
	pub fn version_active(&self, versions: Versions) -> Result<bool> {
		if self.ver1.is_some_and(|ver1| versions.version < ver1) {
			return Ok(false);
		}
		if self.ver2.is_some_and(|ver2| versions.version > ver2) {
			return Ok(false);
		}
		if self.userver.is_some_and(|userver| versions.user_version != userver) {
			return Ok(false);
		}
		match &self.vercond {
			Some(vercond) => vercond.eval_bool(&versions),
			None => Ok(true),
		}
	}

	/// Element type after template substitution.
	pub fn element(&self, owner: &str, template: Option<TypeId>, arg: Option<i64>) -> Result<ElementType> {
		let missing = || CodecError::MissingAttribute {
			type_name: owner.into(),
			field: self.label.clone(),
		};
		let ty = self.ty.resolve(template).ok_or_else(missing)?;
		let template = match self.template {
			Some(declared) => Some(declared.resolve(template).ok_or_else(missing)?),
			None => None,
		};
		Ok(ElementType { ty, template, arg })
	}

	fn same_shape(&self, other: &Self) -> bool {
		self.ty == other.ty && self.template == other.template && self.arg == other.arg && self.arr1 == other.arr1 && self.arr2 == other.arr2
	}
}

/// Record definition with its resolved inheritance chain.
#[derive(Debug, Clone, Default)]
pub struct RecordDef {
	/// Direct base record.
	pub base: Option<TypeId>,
	/// Whether the record takes a template parameter.
	pub is_template: bool,
	/// Effective fields: base fields first, duplicates kept with shared slots.
	pub fields: Vec<FieldSpec>,
	/// Index of the first own field in `fields`.
	pub own_from: usize,
	/// Slot names in first-declaration order.
	pub slots: Vec<Box<str>>,
}

impl RecordDef {
	/// Fields declared on this record itself.
	pub fn own_fields(&self) -> &[FieldSpec] {
		&self.fields[self.own_from..]
	}

	/// Slot holding field `name`.
	pub fn slot_of(&self, name: &str) -> Option<usize> {
		self.slots.iter().position(|slot| &**slot == name)
	}

	/// First declaration of field `name`.
	pub fn field(&self, name: &str) -> Option<&FieldSpec> {
		self.fields.iter().find(|field| &*field.name == name)
	}

	/// First declaration occupying `slot`.
	pub fn field_for_slot(&self, slot: usize) -> Option<&FieldSpec> {
		self.fields.iter().find(|field| field.slot == slot)
	}
}

/// Container layout parameters.
#[derive(Debug, Clone)]
pub struct FormatSpec {
	/// Format name.
	pub name: Box<str>,
	/// Leading signature bytes.
	pub magic: Vec<u8>,
	/// Supported versions; empty accepts any.
	pub versions: Vec<u32>,
	/// First version using `-1` as "no link".
	pub link_sentinel_since: u32,
	/// Header record type.
	pub header: Option<TypeId>,
	/// Footer record type.
	pub footer: Option<TypeId>,
	/// Canonical name of the footer's root link array.
	pub roots_field: Option<Box<str>>,
	/// Types listed before the parent that references them.
	pub child_first: Vec<TypeId>,
}

impl FormatSpec {
	/// Whether `version` is in the supported list.
	pub fn supports(&self, version: u32) -> bool {
		self.versions.is_empty() || self.versions.contains(&version)
	}

	/// "No link" token for `version`.
	pub fn sentinel(&self, version: u32) -> i32 {
		crate::codec::link::link_sentinel(version, self.link_sentinel_since)
	}
}

/// Validated, immutable type metadata.
#[derive(Debug)]
pub struct Schema {
	types: Vec<TypeDef>,
	by_name: HashMap<Box<str>, TypeId>,
	format: FormatSpec,
}

impl Schema {
	/// Parse and validate a JSON schema document.
	pub fn from_json_str(text: &str) -> std::result::Result<Self, SchemaError> {
		let doc: SchemaDoc = serde_json::from_str(text)?;
		Self::from_doc(&doc)
	}

	/// Validate a schema document.
	pub fn from_doc(doc: &SchemaDoc) -> std::result::Result<Self, SchemaError> {
		build::build(doc)
	}

	/// Container layout.
	pub fn format(&self) -> &FormatSpec {
		&self.format
	}

	/// Look up a type by name.
	pub fn type_id(&self, name: &str) -> Option<TypeId> {
		self.by_name.get(name).copied()
	}

	/// Look up a type by name, failing with [`CodecError::UnknownType`].
	pub fn require_type(&self, name: &str) -> Result<TypeId> {
		self.type_id(name).ok_or_else(|| CodecError::UnknownType { name: name.into() })
	}

	/// Definition of `id`.
	pub fn type_def(&self, id: TypeId) -> &TypeDef {
		&self.types[id.index()]
	}

	/// Name of `id`.
	pub fn type_name(&self, id: TypeId) -> &str {
		&self.types[id.index()].name
	}

	/// Transitive flags of `id`.
	pub fn flags(&self, id: TypeId) -> TypeFlags {
		self.types[id.index()].flags
	}

	/// Record definition of `id`, if it is a record.
	pub fn record(&self, id: TypeId) -> Option<&RecordDef> {
		match &self.types[id.index()].kind {
			TypeKind::Record(def) => Some(def),
			_ => None,
		}
	}

	/// Record definition of `id`, failing when it is not a record.
	pub fn record_def(&self, id: TypeId) -> Result<&RecordDef> {
		self.record(id).ok_or_else(|| CodecError::ValueKind {
			expected: "record",
			got: self.types[id.index()].kind.label(),
		})
	}

	/// Whether `ty` is `base` or inherits from it.
	pub fn is_subtype(&self, ty: TypeId, base: TypeId) -> bool {
		let mut current = Some(ty);
		while let Some(id) = current {
			if id == base {
				return true;
			}
			current = self.record(id).and_then(|def| def.base);
		}
		false
	}

	/// Iterate every type in table order.
	pub fn types(&self) -> impl Iterator<Item = (TypeId, &TypeDef)> {
		self.types.iter().enumerate().map(|(index, def)| (TypeId(index as u32), def))
	}

	/// Whether blocks of type `id` may appear in a block table.
	pub fn is_block_type(&self, id: TypeId) -> bool {
		self.record(id).is_some_and(|def| !def.is_template)
	}
}
