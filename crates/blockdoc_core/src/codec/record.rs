use crate::codec::array::{Array, ArrayShape, MAX_ARRAY_LEN};
use crate::codec::bytes::{ByteSink, Cursor};
use crate::codec::expr::{EvalContext, Scalar, canonical_name};
use crate::codec::link::{BlockId, Link};
use crate::codec::pass::{LinkPass, ReadPass, WritePass};
use crate::codec::schema::{FieldSpec, RecordDef, Schema, TypeFlags, TypeId, TypeKind};
use crate::codec::value::{ElementType, Value, default_value, fix_value, read_value, value_from_scalar, value_size, write_value};
use crate::codec::version::Versions;
use crate::codec::{CodecError, Result};

/// Identifier that resolves to the record's argument inside expressions.
const ARG: &str = "arg";

/// Instance of a schema record: one value per field slot.
///
/// Which slots take part in a read or write is decided per call from the
/// version pair and the record's current values, field by field in
/// declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
	ty: TypeId,
	template: Option<TypeId>,
	arg: Option<i64>,
	slots: Vec<Value>,
}

impl Record {
	/// Fresh record of type `ty` with every slot at its default.
	///
	/// Array lengths are evaluated against the defaults seen so far; a length
	/// that cannot be evaluated yet yields an empty array.
	pub fn new(schema: &Schema, ty: TypeId, template: Option<TypeId>, arg: Option<i64>) -> Result<Self> {
		let def = schema.record_def(ty)?;
		let mut record = Self {
			ty,
			template,
			arg,
			slots: Vec::with_capacity(def.slots.len()),
		};
		for slot in 0..def.slots.len() {
			let Some(field) = def.field_for_slot(slot) else {
				continue;
			};
			let value = record.default_for(schema, def, field)?;
			record.slots.push(value);
		}
		Ok(record)
	}

	/// Record type.
	pub fn ty(&self) -> TypeId {
		self.ty
	}

	/// Template binding.
	pub fn template(&self) -> Option<TypeId> {
		self.template
	}

	/// Argument passed in by the owner.
	pub fn arg(&self) -> Option<i64> {
		self.arg
	}

	/// Replace the argument, typically after the owner's argument field changed.
	///
	/// Arrays sized by the argument keep their length until [`Record::update_size`].
	pub fn set_arg(&mut self, arg: Option<i64>) {
		self.arg = arg;
	}

	/// Slot values in slot order.
	pub fn slots(&self) -> &[Value] {
		&self.slots
	}

	/// Fields that take part in a read or write at `versions`, in order.
	pub fn active_fields<'s>(&self, schema: &'s Schema, versions: Versions) -> Result<Vec<&'s FieldSpec>> {
		let def = schema.record_def(self.ty)?;
		self.active_with(schema, def, versions, self.arg)
	}

	/// Active, non-abstract fields paired with their values.
	pub fn entries<'s>(&'s self, schema: &'s Schema, versions: Versions) -> Result<Vec<(&'s FieldSpec, &'s Value)>> {
		Ok(self
			.active_fields(schema, versions)?
			.into_iter()
			.filter(|field| !field.is_abstract)
			.map(|field| (field, &self.slots[field.slot]))
			.collect())
	}

	/// Value of field `name` (label or canonical name).
	pub fn get(&self, schema: &Schema, name: &str) -> Result<&Value> {
		let slot = self.slot(schema, name)?;
		Ok(&self.slots[slot])
	}

	/// Value of field `name`, mutably.
	pub fn get_mut(&mut self, schema: &Schema, name: &str) -> Result<&mut Value> {
		let slot = self.slot(schema, name)?;
		Ok(&mut self.slots[slot])
	}

	/// Integer view of an int, enum or bitfield field.
	pub fn field_int(&self, schema: &Schema, name: &str) -> Result<i64> {
		let slot = self.slot(schema, name)?;
		let value = &self.slots[slot];
		self.slot_type(schema, slot)
			.and_then(|ty| value.as_int(schema, ty))
			.ok_or(CodecError::ValueKind {
				expected: "int",
				got: value.kind(),
			})
	}

	/// Set an int, enum or bitfield field, range-checked.
	pub fn set_int(&mut self, schema: &Schema, name: &str, value: i64) -> Result<()> {
		self.set_scalar(schema, name, Scalar::Int(value))
	}

	/// Set a float field.
	pub fn set_float(&mut self, schema: &Schema, name: &str, value: f32) -> Result<()> {
		self.set_scalar(schema, name, Scalar::Float(f64::from(value)))
	}

	/// Set a string field, or an enum field by option name.
	pub fn set_str(&mut self, schema: &Schema, name: &str, value: &str) -> Result<()> {
		self.set_scalar(schema, name, Scalar::Str(value.as_bytes().to_vec()))
	}

	/// Point a link field at `block`.
	pub fn set_link(&mut self, schema: &Schema, name: &str, block: Option<BlockId>) -> Result<()> {
		match self.get_mut(schema, name)? {
			Value::Link(link) => {
				link.set(block);
				Ok(())
			}
			other => Err(CodecError::ValueKind {
				expected: "link",
				got: other.kind(),
			}),
		}
	}

	/// Set one member of a bitfield field.
	pub fn set_bit(&mut self, schema: &Schema, name: &str, member: &str, value: i64) -> Result<()> {
		let slot = self.slot(schema, name)?;
		let ty = self.slot_type(schema, slot);
		let def = ty.map(|ty| schema.type_def(ty));
		match (def.map(|def| (&def.name, &def.kind)), &mut self.slots[slot]) {
			(Some((bitfield, TypeKind::Bitfield(bits))), Value::Bits(values)) => bits.set_member(bitfield, values, member, value),
			(_, other) => Err(CodecError::ValueKind {
				expected: "bitfield",
				got: other.kind(),
			}),
		}
	}

	/// Resize array field `name` to its evaluated length, keeping retained elements.
	pub fn update_size(&mut self, schema: &Schema, name: &str) -> Result<()> {
		let def = schema.record_def(self.ty)?;
		let slot = self.slot(schema, name)?;
		let field = def.field_for_slot(slot).ok_or_else(|| self.not_found(schema, name))?;
		if !field.is_array() {
			return Err(CodecError::ValueKind {
				expected: "array",
				got: self.slots[slot].kind(),
			});
		}
		let shape = self.shape(schema, def, field, self.arg, MAX_ARRAY_LEN)?;
		match &mut self.slots[slot] {
			Value::Array(array) => array.resize(schema, field.default.as_deref(), &shape),
			other => Err(CodecError::ValueKind {
				expected: "array",
				got: other.kind(),
			}),
		}
	}

	/// Set the count field driving one-dimensional array `name`, then resize it.
	pub fn resize_array(&mut self, schema: &Schema, name: &str, len: usize) -> Result<()> {
		let def = schema.record_def(self.ty)?;
		let slot = self.slot(schema, name)?;
		let field = def.field_for_slot(slot).ok_or_else(|| self.not_found(schema, name))?;
		let count = field.arr1.as_ref().and_then(|arr1| arr1.as_ident()).ok_or(CodecError::ValueKind {
			expected: "array counted by a field",
			got: "array with a computed length",
		})?;
		let len = i64::try_from(len).map_err(|_| CodecError::ArrayTooLarge {
			field: field.label.clone(),
			count: len,
			max: MAX_ARRAY_LEN,
		})?;
		self.set_int(schema, count, len)?;
		self.update_size(schema, name)
	}

	/// Encoded byte count at `versions`, with `arg` as the record argument.
	pub fn size(&self, schema: &Schema, arg: Option<i64>, versions: Versions) -> Result<usize> {
		let def = schema.record_def(self.ty)?;
		let mut total = 0;
		for field in self.active_with(schema, def, versions, arg)? {
			if field.is_abstract {
				continue;
			}
			let elem = self.element(schema, def, field, arg)?;
			total += match &self.slots[field.slot] {
				Value::Array(array) if field.is_array() => array.size(schema, &elem, versions)?,
				value => value_size(schema, &elem, value, versions)?,
			};
		}
		Ok(total)
	}

	/// Targets of every resolved link reachable through link-bearing fields.
	pub fn collect_links(&self, schema: &Schema, versions: Versions, out: &mut Vec<BlockId>) -> Result<()> {
		self.collect(schema, versions, |flags| flags.has_links, &mut |value| {
			if let Value::Link(link) = value
				&& let Some(block) = link.block()
			{
				out.push(block);
			}
		})
	}

	/// Targets of every resolved Ref reachable through ref-bearing fields.
	pub fn collect_refs(&self, schema: &Schema, versions: Versions, out: &mut Vec<BlockId>) -> Result<()> {
		self.collect(schema, versions, |flags| flags.has_refs, &mut |value| {
			if let Value::Link(link) = value
				&& link.is_ref()
				&& let Some(block) = link.block()
			{
				out.push(block);
			}
		})
	}

	/// Every string reachable through string-bearing fields.
	pub fn collect_strings(&self, schema: &Schema, versions: Versions, out: &mut Vec<Vec<u8>>) -> Result<()> {
		self.collect(schema, versions, |flags| flags.has_strings, &mut |value| {
			if let Value::Str(raw) = value {
				out.push(raw.clone());
			}
		})
	}

	/// Visit every link held in any slot, active or not.
	pub fn for_each_link(&self, visit: &mut dyn FnMut(&Link)) {
		for value in &self.slots {
			value.for_each_link(visit);
		}
	}

	/// Visit every link held in any slot, mutably.
	pub fn for_each_link_mut(&mut self, visit: &mut dyn FnMut(&mut Link)) {
		for value in &mut self.slots {
			value.for_each_link_mut(visit);
		}
	}

	pub(crate) fn read(&mut self, schema: &Schema, cur: &mut Cursor<'_>, pass: &mut ReadPass<'_>) -> Result<()> {
		let def = schema.record_def(self.ty)?;
		let mut seen = vec![false; def.slots.len()];
		for field in &def.fields {
			if seen[field.slot] || !self.is_active(schema, def, field, pass.versions, self.arg)? {
				continue;
			}
			seen[field.slot] = true;
			if field.is_abstract {
				continue;
			}

			let elem = self.element(schema, def, field, self.arg)?;
			let value = if field.is_array() {
				let shape = self.shape(schema, def, field, self.arg, pass.max_array_len)?;
				Value::Array(Array::read(schema, elem, &shape, cur, pass)?)
			} else {
				read_value(schema, &elem, cur, pass)?
			};
			self.slots[field.slot] = value;
		}
		Ok(())
	}

	pub(crate) fn write(&self, schema: &Schema, arg: Option<i64>, sink: &mut ByteSink, pass: &WritePass<'_>) -> Result<()> {
		let def = schema.record_def(self.ty)?;
		for field in self.active_with(schema, def, pass.versions, arg)? {
			if field.is_abstract {
				continue;
			}
			let elem = self.element(schema, def, field, arg)?;
			let value = &self.slots[field.slot];
			if !field.is_array() {
				write_value(schema, &elem, value, sink, pass)?;
				continue;
			}
			let array = value.as_array().ok_or(CodecError::ValueKind {
				expected: "array",
				got: value.kind(),
			})?;
			let shape = self.shape(schema, def, field, arg, pass.max_array_len)?;
			array.write(schema, &elem, &field.label, &shape, sink, pass)?;
		}
		Ok(())
	}

	/// Resolve every queued link token held by link-bearing active fields.
	pub(crate) fn fix_links(&mut self, schema: &Schema, pass: &mut LinkPass<'_>) -> Result<()> {
		let def = schema.record_def(self.ty)?;
		let fields = self.active_with(schema, def, pass.versions, self.arg)?;
		for field in fields {
			if field.is_abstract || !self.field_flags(schema, field).has_links {
				continue;
			}
			fix_value(schema, &mut self.slots[field.slot], pass)?;
		}
		Ok(())
	}

	fn collect(&self, schema: &Schema, versions: Versions, want: fn(TypeFlags) -> bool, visit: &mut dyn FnMut(&Value)) -> Result<()> {
		let def = schema.record_def(self.ty)?;
		for field in self.active_with(schema, def, versions, self.arg)? {
			if field.is_abstract || !want(self.field_flags(schema, field)) {
				continue;
			}
			collect_value(schema, versions, &self.slots[field.slot], want, visit)?;
		}
		Ok(())
	}

	fn active_with<'s>(&self, schema: &'s Schema, def: &'s RecordDef, versions: Versions, arg: Option<i64>) -> Result<Vec<&'s FieldSpec>> {
		let mut seen = vec![false; def.slots.len()];
		let mut active = Vec::new();
		for field in &def.fields {
			if seen[field.slot] || !self.is_active(schema, def, field, versions, arg)? {
				continue;
			}
			seen[field.slot] = true;
			active.push(field);
		}
		Ok(active)
	}

	fn is_active(&self, schema: &Schema, def: &RecordDef, field: &FieldSpec, versions: Versions, arg: Option<i64>) -> Result<bool> {
		if !field.version_active(versions)? {
			return Ok(false);
		}
		match &field.cond {
			Some(cond) => cond.eval_bool(&self.scope(schema, def, arg)),
			None => Ok(true),
		}
	}

	fn element(&self, schema: &Schema, def: &RecordDef, field: &FieldSpec, arg: Option<i64>) -> Result<ElementType> {
		let field_arg = match &field.arg {
			Some(expr) => Some(expr.eval_int(&self.scope(schema, def, arg))?),
			None => None,
		};
		field.element(schema.type_name(self.ty), self.template, field_arg)
	}

	fn shape(&self, schema: &Schema, def: &RecordDef, field: &FieldSpec, arg: Option<i64>, max: usize) -> Result<ArrayShape> {
		let scope = self.scope(schema, def, arg);
		let Some(arr1) = &field.arr1 else {
			return Ok(ArrayShape::Flat(0));
		};
		let rows = array_len(field, arr1.eval_int(&scope)?, max)?;
		let Some(arr2) = &field.arr2 else {
			return Ok(ArrayShape::Flat(rows));
		};

		let lens = match arr2.eval(&scope)? {
			Scalar::Int(len) => vec![array_len(field, len, max)?; rows],
			Scalar::Ints(per_row) => (0..rows)
				.map(|row| {
					let len = per_row.get(row).ok_or(CodecError::IndexOutOfRange { index: row, len: per_row.len() })?;
					array_len(field, *len, max)
				})
				.collect::<Result<Vec<_>>>()?,
			other => {
				return Err(CodecError::ValueKind {
					expected: "int",
					got: other.kind(),
				});
			}
		};
		let total: usize = lens.iter().sum();
		if total > max {
			return Err(CodecError::ArrayTooLarge {
				field: field.label.clone(),
				count: total,
				max,
			});
		}
		Ok(ArrayShape::Jagged(lens))
	}

	fn default_for(&self, schema: &Schema, def: &RecordDef, field: &FieldSpec) -> Result<Value> {
		let arg = field.arg.as_ref().and_then(|expr| expr.eval_int(&self.scope(schema, def, self.arg)).ok());
		let elem = field.element(schema.type_name(self.ty), self.template, arg)?;
		if !field.is_array() {
			return default_value(schema, &elem, field.default.as_deref());
		}
		let empty = if field.arr2.is_some() { ArrayShape::Jagged(Vec::new()) } else { ArrayShape::Flat(0) };
		let shape = self.shape(schema, def, field, self.arg, MAX_ARRAY_LEN).unwrap_or(empty);
		Ok(Value::Array(Array::new(schema, elem, field.default.as_deref(), &shape)?))
	}

	fn field_flags(&self, schema: &Schema, field: &FieldSpec) -> TypeFlags {
		let Some(ty) = field.ty.resolve(self.template) else {
			return TypeFlags::default();
		};
		let mut flags = schema.flags(ty);
		let is_link = matches!(schema.type_def(ty).kind, TypeKind::Link(_));
		if !is_link && let Some(template) = field.template.and_then(|template| template.resolve(self.template)) {
			flags = flags | schema.flags(template);
		}
		flags
	}

	fn set_scalar(&mut self, schema: &Schema, name: &str, scalar: Scalar) -> Result<()> {
		let slot = self.slot(schema, name)?;
		let ty = self.slot_type(schema, slot).ok_or_else(|| self.not_found(schema, name))?;
		if let Value::Array(_) = self.slots[slot] {
			return Err(CodecError::ValueKind {
				expected: "scalar",
				got: "array",
			});
		}
		self.slots[slot] = value_from_scalar(schema, ty, scalar)?;
		Ok(())
	}

	fn slot(&self, schema: &Schema, name: &str) -> Result<usize> {
		schema
			.record_def(self.ty)?
			.slot_of(&canonical_name(name))
			.filter(|slot| *slot < self.slots.len())
			.ok_or_else(|| self.not_found(schema, name))
	}

	fn slot_type(&self, schema: &Schema, slot: usize) -> Option<TypeId> {
		schema.record(self.ty)?.field_for_slot(slot)?.ty.resolve(self.template)
	}

	fn not_found(&self, schema: &Schema, name: &str) -> CodecError {
		CodecError::FieldNotFound {
			type_name: schema.type_name(self.ty).into(),
			field: name.into(),
		}
	}

	fn scope<'a>(&'a self, schema: &'a Schema, def: &'a RecordDef, arg: Option<i64>) -> Scope<'a> {
		Scope {
			schema,
			def,
			record: self,
			arg,
		}
	}
}

fn collect_value(schema: &Schema, versions: Versions, value: &Value, want: fn(TypeFlags) -> bool, visit: &mut dyn FnMut(&Value)) -> Result<()> {
	match value {
		Value::Record(record) => record.collect(schema, versions, want, visit),
		Value::Array(array) => array.values().try_for_each(|value| collect_value(schema, versions, value, want, visit)),
		leaf => {
			visit(leaf);
			Ok(())
		}
	}
}

fn array_len(field: &FieldSpec, value: i64, max: usize) -> Result<usize> {
	let count = usize::try_from(value).map_err(|_| CodecError::NegativeArrayLength {
		field: field.label.clone(),
		value,
	})?;
	if count > max {
		return Err(CodecError::ArrayTooLarge {
			field: field.label.clone(),
			count,
			max,
		});
	}
	Ok(count)
}

/// Expression context over one record's current values.
struct Scope<'a> {
	schema: &'a Schema,
	def: &'a RecordDef,
	record: &'a Record,
	arg: Option<i64>,
}

impl Scope<'_> {
	fn missing(&self, name: &str) -> CodecError {
		CodecError::MissingField {
			name: name.into(),
			context: self.schema.type_name(self.record.ty).into(),
		}
	}
}

impl EvalContext for Scope<'_> {
	fn lookup(&self, name: &str) -> Result<Scalar> {
		if name == ARG {
			return self.arg.map(Scalar::Int).ok_or_else(|| self.missing(name));
		}
		let slot = self.def.slot_of(name).ok_or_else(|| self.missing(name))?;
		let value = self.record.slots.get(slot).ok_or_else(|| self.missing(name))?;
		let operand = |kind: &'static str| CodecError::ExprOperand { name: name.into(), kind };
		match value {
			Value::Array(array) => array.to_ints().map(Scalar::Ints).ok_or_else(|| operand("array")),
			other => self
				.record
				.slot_type(self.schema, slot)
				.and_then(|ty| other.to_scalar(self.schema, ty))
				.ok_or_else(|| operand(other.kind())),
		}
	}
}

#[cfg(test)]
mod tests;
