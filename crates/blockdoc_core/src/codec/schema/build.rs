use std::collections::{HashMap, HashSet};

use crate::codec::bitfield::BitfieldDef;
use crate::codec::enums::{EnumDef, EnumOption};
use crate::codec::expr::{Expr, canonical_name};
use crate::codec::link::LinkKind;
use crate::codec::primitive::{Primitive, parse_int_literal};
use crate::codec::schema::doc::{BitfieldDoc, EnumDoc, FieldDoc, FormatDoc, LiteralDoc, RecordDoc, SchemaDoc};
use crate::codec::schema::{FieldSpec, FieldType, FormatSpec, RecordDef, Schema, TypeDef, TypeFlags, TypeId, TypeKind};
use crate::codec::version::parse_version;
use crate::codec::{CodecError, SchemaError};

type Result<T> = std::result::Result<T, SchemaError>;

const TEMPLATE: &str = "TEMPLATE";

struct Builder {
	types: Vec<TypeDef>,
	by_name: HashMap<Box<str>, TypeId>,
	templates: HashSet<TypeId>,
}

pub(super) fn build(doc: &SchemaDoc) -> Result<Schema> {
	let mut builder = Builder::new();

	for item in &doc.enums {
		let def = enum_def(item)?;
		builder.add(&item.name, TypeKind::Enum(def))?;
	}
	for item in &doc.bitfields {
		let def = bitfield_def(item)?;
		builder.add(&item.name, TypeKind::Bitfield(def))?;
	}

	let mut record_ids = Vec::with_capacity(doc.records.len());
	for item in &doc.records {
		let id = builder.add(&item.name, TypeKind::Record(RecordDef::default()))?;
		if item.template {
			builder.templates.insert(id);
		}
		record_ids.push(id);
	}
	let position: HashMap<TypeId, usize> = record_ids.iter().enumerate().map(|(pos, id)| (*id, pos)).collect();

	let mut own = Vec::with_capacity(doc.records.len());
	let mut bases = Vec::with_capacity(doc.records.len());
	for item in &doc.records {
		let base = match &item.base {
			Some(name) => {
				let id = builder.lookup(&item.name, name)?;
				if !position.contains_key(&id) {
					return Err(SchemaError::BaseNotRecord {
						owner: item.name.as_str().into(),
						base: name.as_str().into(),
					});
				}
				Some(id)
			}
			None => None,
		};
		let fields = item.fields.iter().map(|field| builder.field_spec(item, field)).collect::<Result<Vec<_>>>()?;
		own.push(fields);
		bases.push(base);
	}

	for (pos, item) in doc.records.iter().enumerate() {
		let def = effective_record(pos, item, &own, &bases, &position)?;
		builder.types[record_ids[pos].index()].kind = TypeKind::Record(def);
	}

	check_containment(&builder.types)?;
	compute_flags(&mut builder.types);
	let format = builder.format_spec(&doc.format)?;

	Ok(Schema {
		types: builder.types,
		by_name: builder.by_name,
		format,
	})
}

impl Builder {
	fn new() -> Self {
		let mut builder = Self {
			types: Vec::new(),
			by_name: HashMap::new(),
			templates: HashSet::new(),
		};
		for prim in Primitive::NAMED {
			builder.push(&prim.name(), TypeKind::Primitive(prim));
		}
		builder.push(LinkKind::Ref.as_str(), TypeKind::Link(LinkKind::Ref));
		builder.push(LinkKind::Ptr.as_str(), TypeKind::Link(LinkKind::Ptr));
		builder
	}

	fn push(&mut self, name: &str, kind: TypeKind) -> TypeId {
		let flags = match &kind {
			TypeKind::Primitive(prim) => TypeFlags {
				has_strings: prim.is_string(),
				..TypeFlags::default()
			},
			TypeKind::Link(kind) => TypeFlags {
				has_links: true,
				has_refs: *kind == LinkKind::Ref,
				has_strings: false,
			},
			_ => TypeFlags::default(),
		};
		let id = TypeId(self.types.len() as u32);
		self.types.push(TypeDef {
			name: name.into(),
			kind,
			flags,
		});
		self.by_name.insert(name.into(), id);
		id
	}

	fn add(&mut self, name: &str, kind: TypeKind) -> Result<TypeId> {
		if name == TEMPLATE || self.by_name.contains_key(name) {
			return Err(SchemaError::DuplicateType { name: name.into() });
		}
		Ok(self.push(name, kind))
	}

	fn lookup(&mut self, owner: &str, name: &str) -> Result<TypeId> {
		if let Some(id) = self.by_name.get(name) {
			return Ok(*id);
		}
		if let Some(prim @ Primitive::FixedString(_)) = Primitive::from_name(name) {
			let canonical = prim.name();
			if let Some(id) = self.by_name.get(&*canonical) {
				return Ok(*id);
			}
			return Ok(self.push(&canonical, TypeKind::Primitive(prim)));
		}
		Err(SchemaError::UnknownType {
			owner: owner.into(),
			name: name.into(),
		})
	}

	fn field_type(&mut self, owner: &str, name: &str) -> Result<FieldType> {
		if name == TEMPLATE {
			return Ok(FieldType::Template);
		}
		self.lookup(owner, name).map(FieldType::Type)
	}

	fn field_spec(&mut self, record: &RecordDoc, doc: &FieldDoc) -> Result<FieldSpec> {
		let owner = record.name.as_str();
		let bad = |reason: String| SchemaError::BadField {
			owner: owner.into(),
			field: doc.name.as_str().into(),
			reason,
		};
		let parse = |text: &Option<String>| -> Result<Option<Expr>> {
			text.as_deref()
				.map(|text| {
					Expr::parse(text).map_err(|err| SchemaError::Expr {
						owner: owner.into(),
						field: doc.name.as_str().into(),
						source: Box::new(err),
					})
				})
				.transpose()
		};

		let name = canonical_name(&doc.name);
		if name.is_empty() {
			return Err(bad("empty field name".to_owned()));
		}

		let ty = self.field_type(owner, &doc.ty)?;
		let template = doc.template.as_deref().map(|name| self.field_type(owner, name)).transpose()?;
		if let FieldType::Type(id) = ty
			&& self.templates.contains(&id)
			&& template.is_none()
		{
			return Err(bad(format!("template record {} needs a template argument", doc.ty)));
		}

		let arg = parse(&doc.arg)?;
		let arr1 = parse(&doc.arr1)?;
		let arr2 = parse(&doc.arr2)?;
		let cond = parse(&doc.cond)?;
		let vercond = parse(&doc.vercond)?;
		if arr2.is_some() && arr1.is_none() {
			return Err(bad("arr2 requires arr1".to_owned()));
		}

		let ver1 = doc.ver1.as_ref().map(version_literal).transpose()?;
		let ver2 = doc.ver2.as_ref().map(version_literal).transpose()?;
		let default = doc.default.as_ref().map(LiteralDoc::to_text);
		if let (Some(text), None, FieldType::Type(id)) = (&default, &arr1, ty) {
			self.check_default(id, text).map_err(|err| bad(format!("bad default: {err}")))?;
		}

		Ok(FieldSpec {
			name: name.into(),
			label: doc.name.as_str().into(),
			ty,
			template,
			default: default.map(Into::into),
			arg,
			arr1,
			arr2,
			cond,
			vercond,
			ver1,
			ver2,
			userver: doc.userver,
			is_abstract: doc.is_abstract,
			doc: doc.doc.as_str().into(),
			slot: 0,
		})
	}

	fn check_default(&self, id: TypeId, text: &str) -> std::result::Result<(), CodecError> {
		let def = &self.types[id.index()];
		match &def.kind {
			TypeKind::Primitive(prim) => prim.parse_literal(text).map(drop),
			TypeKind::Enum(options) => options.parse(&def.name, text).map(drop),
			TypeKind::Bitfield(bits) => {
				let raw = parse_int_literal(text).ok_or_else(|| CodecError::BadLiteral {
					type_name: def.name.clone(),
					text: text.into(),
				})?;
				bits.set_packed(&def.name, &mut bits.defaults(), raw)
			}
			_ => Ok(()),
		}
	}

	fn format_spec(&mut self, doc: &FormatDoc) -> Result<FormatSpec> {
		if doc.magic.is_empty() {
			return Err(SchemaError::BadFormat {
				reason: "magic must not be empty".to_owned(),
			});
		}

		let versions = doc.versions.iter().map(version_literal).collect::<Result<Vec<_>>>()?;
		let link_sentinel_since = doc.link_sentinel_since.as_ref().map(version_literal).transpose()?.unwrap_or(0);
		let header = doc.header.as_deref().map(|name| self.plain_record("header", name)).transpose()?;
		let footer = doc.footer.as_deref().map(|name| self.plain_record("footer", name)).transpose()?;
		let child_first = doc
			.child_first
			.iter()
			.map(|name| self.plain_record("child_first", name))
			.collect::<Result<Vec<_>>>()?;

		let roots_field = match &doc.roots_field {
			Some(label) => {
				let name = canonical_name(label);
				let footer = footer.ok_or_else(|| SchemaError::BadFormat {
					reason: "roots_field requires a footer".to_owned(),
				})?;
				self.check_roots_field(footer, &name)?;
				Some(name.into_boxed_str())
			}
			None => None,
		};

		Ok(FormatSpec {
			name: doc.name.as_str().into(),
			magic: doc.magic.as_bytes().to_vec(),
			versions,
			link_sentinel_since,
			header,
			footer,
			roots_field,
			child_first,
		})
	}

	fn plain_record(&mut self, role: &str, name: &str) -> Result<TypeId> {
		let id = self.lookup(role, name)?;
		let plain = matches!(self.types[id.index()].kind, TypeKind::Record(_)) && !self.templates.contains(&id);
		if !plain {
			return Err(SchemaError::BadFormat {
				reason: format!("{role} type {name} is not a plain record"),
			});
		}
		Ok(id)
	}

	fn check_roots_field(&self, footer: TypeId, name: &str) -> Result<()> {
		let TypeKind::Record(def) = &self.types[footer.index()].kind else {
			return Err(SchemaError::BadFormat {
				reason: "footer is not a record".to_owned(),
			});
		};
		let field = def.field(name).ok_or_else(|| SchemaError::BadFormat {
			reason: format!("footer has no field {name}"),
		})?;
		let is_link = matches!(field.ty, FieldType::Type(id) if matches!(self.types[id.index()].kind, TypeKind::Link(_)));
		if !is_link || field.arr1.is_none() || field.arr2.is_some() {
			return Err(SchemaError::BadFormat {
				reason: format!("roots field {name} must be a one-dimensional link array"),
			});
		}
		Ok(())
	}
}

fn effective_record(
	pos: usize,
	item: &RecordDoc,
	own: &[Vec<FieldSpec>],
	bases: &[Option<TypeId>],
	position: &HashMap<TypeId, usize>,
) -> Result<RecordDef> {
	let mut chain = vec![pos];
	let mut seen = HashSet::from([pos]);
	let mut current = bases[pos];
	while let Some(base) = current {
		let base_pos = position[&base];
		if !seen.insert(base_pos) {
			return Err(SchemaError::InheritanceCycle {
				name: item.name.as_str().into(),
			});
		}
		chain.push(base_pos);
		current = bases[base_pos];
	}

	let mut fields: Vec<FieldSpec> = chain.iter().rev().flat_map(|link| own[*link].iter().cloned()).collect();
	let own_from = fields.len() - own[pos].len();

	let mut slots: Vec<Box<str>> = Vec::new();
	for index in 0..fields.len() {
		let uses_template = fields[index].ty == FieldType::Template || fields[index].template == Some(FieldType::Template);
		if uses_template && !item.template {
			return Err(SchemaError::BadField {
				owner: item.name.as_str().into(),
				field: fields[index].label.clone(),
				reason: "TEMPLATE used outside a template record".to_owned(),
			});
		}

		match slots.iter().position(|slot| *slot == fields[index].name) {
			Some(slot) => {
				let agrees = fields[..index]
					.iter()
					.find(|earlier| earlier.slot == slot)
					.is_some_and(|earlier| earlier.same_shape(&fields[index]));
				if !agrees {
					return Err(SchemaError::DuplicateFieldMismatch {
						owner: item.name.as_str().into(),
						field: fields[index].label.clone(),
					});
				}
				fields[index].slot = slot;
			}
			None => {
				fields[index].slot = slots.len();
				slots.push(fields[index].name.clone());
			}
		}
	}

	Ok(RecordDef {
		base: bases[pos],
		is_template: item.template,
		fields,
		own_from,
		slots,
	})
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
	New,
	Active,
	Done,
}

/// Reject records that contain themselves inline, which would never terminate.
fn check_containment(types: &[TypeDef]) -> Result<()> {
	let mut marks = vec![Mark::New; types.len()];
	for index in 0..types.len() {
		if marks[index] == Mark::New && matches!(types[index].kind, TypeKind::Record(_)) {
			visit_contained(types, index, &mut marks)?;
		}
	}
	Ok(())
}

fn visit_contained(types: &[TypeDef], index: usize, marks: &mut [Mark]) -> Result<()> {
	marks[index] = Mark::Active;
	if let TypeKind::Record(def) = &types[index].kind {
		for field in &def.fields {
			let FieldType::Type(child) = field.ty else {
				continue;
			};
			if field.is_array() || !is_record(types, child.index()) {
				continue;
			}
			let mut contained = vec![child.index()];
			if let Some(FieldType::Type(template)) = field.template
				&& is_record(types, template.index())
				&& holds_template(types, child.index(), &mut vec![false; types.len()])
			{
				contained.push(template.index());
			}
			for target in contained {
				match marks[target] {
					Mark::Active => {
						return Err(SchemaError::BadField {
							owner: types[index].name.clone(),
							field: field.label.clone(),
							reason: "record contains itself without an array or link".to_owned(),
						});
					}
					Mark::New => visit_contained(types, target, marks)?,
					Mark::Done => {}
				}
			}
		}
	}
	marks[index] = Mark::Done;
	Ok(())
}

fn is_record(types: &[TypeDef], index: usize) -> bool {
	matches!(types[index].kind, TypeKind::Record(_))
}

/// Whether a value of record `index` holds its template argument inline,
/// directly or through a nested record it passes the argument on to.
fn holds_template(types: &[TypeDef], index: usize, seen: &mut [bool]) -> bool {
	if std::mem::replace(&mut seen[index], true) {
		return false;
	}
	let TypeKind::Record(def) = &types[index].kind else {
		return false;
	};
	def.fields.iter().filter(|field| !field.is_array()).any(|field| match (field.ty, field.template) {
		(FieldType::Template, _) => true,
		(FieldType::Type(nested), Some(FieldType::Template)) => is_record(types, nested.index()) && holds_template(types, nested.index(), seen),
		_ => false,
	})
}

/// Propagate content flags through record fields until nothing changes.
fn compute_flags(types: &mut [TypeDef]) {
	loop {
		let mut changed = false;
		for index in 0..types.len() {
			let TypeKind::Record(def) = &types[index].kind else {
				continue;
			};
			let mut flags = types[index].flags;
			for field in &def.fields {
				let FieldType::Type(ty) = field.ty else {
					continue;
				};
				flags = flags | types[ty.index()].flags;
				let is_link = matches!(types[ty.index()].kind, TypeKind::Link(_));
				if let Some(FieldType::Type(template)) = field.template
					&& !is_link
				{
					flags = flags | types[template.index()].flags;
				}
			}
			if flags != types[index].flags {
				types[index].flags = flags;
				changed = true;
			}
		}
		if !changed {
			break;
		}
	}
}

fn enum_def(item: &EnumDoc) -> Result<EnumDef> {
	let storage = int_storage(&item.name, &item.storage)?;
	let bad = |reason: String| SchemaError::BadEnum {
		owner: item.name.as_str().into(),
		reason,
	};

	let mut options: Vec<EnumOption> = Vec::with_capacity(item.options.len());
	for option in &item.options {
		let value = literal_int(&option.value).ok_or_else(|| bad(format!("option {} has a non-integer value", option.name)))?;
		if storage.check_int(value).is_err() {
			return Err(bad(format!("option {} = {value} does not fit {}", option.name, item.storage)));
		}
		if options.iter().any(|existing| *existing.name == *option.name) {
			return Err(bad(format!("duplicate option {}", option.name)));
		}
		options.push(EnumOption {
			name: option.name.as_str().into(),
			value,
		});
	}
	Ok(EnumDef { storage, options })
}

fn bitfield_def(item: &BitfieldDoc) -> Result<BitfieldDef> {
	let storage = int_storage(&item.name, &item.storage)?;
	if !storage.is_unsigned() {
		return Err(SchemaError::BadStorage {
			owner: item.name.as_str().into(),
			storage: item.storage.as_str().into(),
		});
	}
	let bad = |reason: String| SchemaError::BadBitfield {
		owner: item.name.as_str().into(),
		reason,
	};

	let mut names = HashSet::new();
	for member in &item.members {
		if member.width == 0 {
			return Err(bad(format!("member {} has zero width", member.name)));
		}
		if !names.insert(member.name.as_str()) {
			return Err(bad(format!("duplicate member {}", member.name)));
		}
	}

	let def = BitfieldDef::from_widths(
		storage,
		item.members.iter().map(|member| (member.name.as_str().into(), member.width, member.default)),
	);
	let available = storage.int_width().map_or(0, |width| width as u32 * 8);
	if def.total_width() > available {
		return Err(bad(format!("members use {} bits but {} holds {available}", def.total_width(), item.storage)));
	}
	if let Some(member) = def.members.iter().find(|member| member.default > member.max()) {
		return Err(bad(format!("default of {} does not fit {} bits", member.name, member.width)));
	}
	Ok(def)
}

fn int_storage(owner: &str, name: &str) -> Result<Primitive> {
	Primitive::from_name(name)
		.filter(|prim| prim.int_width().is_some() && *prim != Primitive::Bool)
		.ok_or_else(|| SchemaError::BadStorage {
			owner: owner.into(),
			storage: name.into(),
		})
}

fn literal_int(literal: &LiteralDoc) -> Option<i64> {
	match literal {
		LiteralDoc::Int(value) => Some(*value),
		LiteralDoc::Text(text) => parse_int_literal(text),
		LiteralDoc::Float(_) => None,
	}
}

fn version_literal(literal: &LiteralDoc) -> Result<u32> {
	let parsed = match literal {
		LiteralDoc::Int(value) => u32::try_from(*value).ok(),
		LiteralDoc::Text(text) => parse_version(text),
		LiteralDoc::Float(_) => None,
	};
	parsed.ok_or_else(|| SchemaError::BadVersion {
		text: literal.to_text().into(),
	})
}
