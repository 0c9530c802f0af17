use crate::codec::array::Array;
use crate::codec::bytes::{ByteSink, Cursor};
use crate::codec::expr::Scalar;
use crate::codec::link::Link;
use crate::codec::pass::{LinkPass, ReadPass, WritePass};
use crate::codec::primitive::{Primitive, parse_int_literal};
use crate::codec::record::Record;
use crate::codec::schema::{Schema, TypeId, TypeKind};
use crate::codec::version::Versions;
use crate::codec::{CodecError, Result};

/// Concrete type of one value after template substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementType {
	/// Value type.
	pub ty: TypeId,
	/// Template binding for records, target type for links.
	pub template: Option<TypeId>,
	/// Argument handed to nested records.
	pub arg: Option<i64>,
}

impl ElementType {
	/// Plain element without template or argument.
	pub fn of(ty: TypeId) -> Self {
		Self { ty, template: None, arg: None }
	}
}

/// Decoded node of a document tree.
///
/// Leaves carry plain data; what the data means (width, enum options, bit
/// layout) comes from the schema type the owning field declares.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	/// Integer primitive, including `Bool` and `Char`.
	Int(i64),
	/// Float primitive.
	Float(f32),
	/// String primitive bytes, without terminator or padding.
	Str(Vec<u8>),
	/// Enum value; may be undeclared when read from a stream.
	Enum(i64),
	/// Unpacked bitfield members in declaration order.
	Bits(Vec<u32>),
	/// Ref or Ptr.
	Link(Link),
	/// Nested record.
	Record(Box<Record>),
	/// One- or two-dimensional array.
	Array(Array),
}

impl Value {
	/// Stable lowercase kind label.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Int(_) => "int",
			Self::Float(_) => "float",
			Self::Str(_) => "string",
			Self::Enum(_) => "enum",
			Self::Bits(_) => "bitfield",
			Self::Link(_) => "link",
			Self::Record(_) => "record",
			Self::Array(_) => "array",
		}
	}

	/// Integer view of int, enum and bitfield values.
	pub fn as_int(&self, schema: &Schema, ty: TypeId) -> Option<i64> {
		match self {
			Self::Int(value) | Self::Enum(value) => Some(*value),
			Self::Bits(values) => match &schema.type_def(ty).kind {
				TypeKind::Bitfield(def) => Some(i64::from(def.pack(values))),
				_ => None,
			},
			_ => None,
		}
	}

	/// Plain scalar view of a leaf value of type `ty`.
	pub fn to_scalar(&self, schema: &Schema, ty: TypeId) -> Option<Scalar> {
		match self {
			Self::Float(value) => Some(Scalar::Float(f64::from(*value))),
			Self::Str(raw) => Some(Scalar::Str(raw.clone())),
			_ => self.as_int(schema, ty).map(Scalar::Int),
		}
	}

	/// Float payload.
	pub fn as_float(&self) -> Option<f32> {
		match self {
			Self::Float(value) => Some(*value),
			_ => None,
		}
	}

	/// String payload.
	pub fn as_str(&self) -> Option<&[u8]> {
		match self {
			Self::Str(raw) => Some(raw),
			_ => None,
		}
	}

	/// Link payload.
	pub fn as_link(&self) -> Option<&Link> {
		match self {
			Self::Link(link) => Some(link),
			_ => None,
		}
	}

	/// Nested record.
	pub fn as_record(&self) -> Option<&Record> {
		match self {
			Self::Record(record) => Some(record),
			_ => None,
		}
	}

	/// Nested record, mutably.
	pub fn as_record_mut(&mut self) -> Option<&mut Record> {
		match self {
			Self::Record(record) => Some(record),
			_ => None,
		}
	}

	/// Array payload.
	pub fn as_array(&self) -> Option<&Array> {
		match self {
			Self::Array(array) => Some(array),
			_ => None,
		}
	}

	/// Array payload, mutably.
	pub fn as_array_mut(&mut self) -> Option<&mut Array> {
		match self {
			Self::Array(array) => Some(array),
			_ => None,
		}
	}

	/// Visit every link in this value tree.
	pub fn for_each_link(&self, visit: &mut dyn FnMut(&Link)) {
		match self {
			Self::Link(link) => visit(link),
			Self::Record(record) => record.for_each_link(visit),
			Self::Array(array) => array.values().for_each(|value| value.for_each_link(visit)),
			_ => {}
		}
	}

	/// Visit every link in this value tree, mutably.
	pub fn for_each_link_mut(&mut self, visit: &mut dyn FnMut(&mut Link)) {
		match self {
			Self::Link(link) => visit(link),
			Self::Record(record) => record.for_each_link_mut(visit),
			Self::Array(array) => array.values_mut().for_each(|value| value.for_each_link_mut(visit)),
			_ => {}
		}
	}
}

/// Fresh value of `elem`, honoring a schema default literal.
pub fn default_value(schema: &Schema, elem: &ElementType, default: Option<&str>) -> Result<Value> {
	let def = schema.type_def(elem.ty);
	Ok(match &def.kind {
		TypeKind::Primitive(prim) => default
			.and_then(|text| prim.parse_literal(text).ok())
			.unwrap_or_else(|| prim.default_value()),
		TypeKind::Enum(options) => {
			let value = default
				.and_then(|text| options.parse(&def.name, text).ok())
				.or_else(|| options.options.first().map(|option| option.value))
				.unwrap_or(0);
			Value::Enum(value)
		}
		TypeKind::Bitfield(bits) => {
			let mut values = bits.defaults();
			if let Some(raw) = default.and_then(parse_int_literal)
				&& bits.set_packed(&def.name, &mut values, raw).is_err()
			{
				values = bits.defaults();
			}
			Value::Bits(values)
		}
		TypeKind::Link(kind) => Value::Link(Link::new(*kind, elem.template)),
		TypeKind::Record(_) => Value::Record(Box::new(Record::new(schema, elem.ty, elem.template, elem.arg)?)),
	})
}

/// Convert a plain scalar into a value of type `ty`, range- and membership-checked.
pub fn value_from_scalar(schema: &Schema, ty: TypeId, scalar: Scalar) -> Result<Value> {
	let def = schema.type_def(ty);
	Ok(match (&def.kind, scalar) {
		(TypeKind::Primitive(Primitive::Float), Scalar::Int(value)) => Value::Float(value as f32),
		(TypeKind::Primitive(Primitive::Float), Scalar::Float(value)) => Value::Float(value as f32),
		(TypeKind::Primitive(prim), Scalar::Str(raw)) if prim.is_string() => {
			let max = prim.max_str_len().unwrap_or(0);
			if raw.len() > max {
				return Err(CodecError::StringTooLong { len: raw.len(), max });
			}
			Value::Str(raw)
		}
		(TypeKind::Primitive(prim), Scalar::Int(value)) if prim.int_width().is_some() => Value::Int(prim.check_int(value)?),
		(TypeKind::Enum(options), Scalar::Int(value)) => Value::Enum(options.check(&def.name, value)?),
		(TypeKind::Enum(options), Scalar::Str(raw)) => Value::Enum(options.parse(&def.name, &String::from_utf8_lossy(&raw))?),
		(TypeKind::Bitfield(bits), Scalar::Int(raw)) => {
			let mut values = bits.defaults();
			bits.set_packed(&def.name, &mut values, raw)?;
			Value::Bits(values)
		}
		(kind, other) => {
			return Err(CodecError::ValueKind {
				expected: kind.label(),
				got: other.kind(),
			});
		}
	})
}

pub(crate) fn read_value(schema: &Schema, elem: &ElementType, cur: &mut Cursor<'_>, pass: &mut ReadPass<'_>) -> Result<Value> {
	Ok(match &schema.type_def(elem.ty).kind {
		TypeKind::Primitive(prim) => prim.read(cur)?,
		TypeKind::Enum(options) => Value::Enum(options.storage.read_int(cur)?),
		TypeKind::Bitfield(bits) => {
			let raw = bits.storage.read_int(cur)?;
			Value::Bits(bits.unpack(raw as u32))
		}
		TypeKind::Link(kind) => Value::Link(Link::read(*kind, elem.template, cur, pass)?),
		TypeKind::Record(_) => {
			let mut record = Record::new(schema, elem.ty, elem.template, elem.arg)?;
			record.read(schema, cur, pass)?;
			Value::Record(Box::new(record))
		}
	})
}

pub(crate) fn write_value(schema: &Schema, elem: &ElementType, value: &Value, sink: &mut ByteSink, pass: &WritePass<'_>) -> Result<()> {
	let kind = &schema.type_def(elem.ty).kind;
	match (kind, value) {
		(TypeKind::Primitive(prim), _) => prim.write(value, sink),
		(TypeKind::Enum(options), Value::Enum(raw)) => options.storage.write_int(*raw, sink),
		(TypeKind::Bitfield(bits), Value::Bits(values)) => bits.storage.write_int(i64::from(bits.pack(values)), sink),
		(TypeKind::Link(_), Value::Link(link)) => link.write(sink, pass),
		(TypeKind::Record(_), Value::Record(record)) => record.write(schema, elem.arg, sink, pass),
		_ => Err(mismatch(kind, value)),
	}
}

pub(crate) fn value_size(schema: &Schema, elem: &ElementType, value: &Value, versions: Versions) -> Result<usize> {
	let kind = &schema.type_def(elem.ty).kind;
	match (kind, value) {
		(TypeKind::Primitive(prim), _) => prim.size(value),
		(TypeKind::Enum(options), Value::Enum(_)) => Ok(options.storage.int_width().unwrap_or(0)),
		(TypeKind::Bitfield(bits), Value::Bits(_)) => Ok(bits.storage.int_width().unwrap_or(0)),
		(TypeKind::Link(_), Value::Link(_)) => Ok(4),
		(TypeKind::Record(_), Value::Record(record)) => record.size(schema, elem.arg, versions),
		_ => Err(mismatch(kind, value)),
	}
}

pub(crate) fn fix_value(schema: &Schema, value: &mut Value, pass: &mut LinkPass<'_>) -> Result<()> {
	match value {
		Value::Link(link) => link.resolve(schema, pass),
		Value::Record(record) => record.fix_links(schema, pass),
		Value::Array(array) => array.values_mut().try_for_each(|value| fix_value(schema, value, pass)),
		_ => Ok(()),
	}
}

fn mismatch(kind: &TypeKind, value: &Value) -> CodecError {
	CodecError::ValueKind {
		expected: kind.label(),
		got: value.kind(),
	}
}
