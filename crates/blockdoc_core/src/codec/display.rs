use std::fmt;

use crate::codec::array::{Array, Rows};
use crate::codec::link::{Link, LinkState};
use crate::codec::record::Record;
use crate::codec::schema::{Schema, TypeId, TypeKind};
use crate::codec::value::Value;
use crate::codec::version::Versions;

/// Array elements rendered before the listing is cut short.
pub const MAX_DISPLAY_ITEMS: usize = 16;

const INDENT: &str = "    ";

/// Indented `* name : value` rendering of one record tree.
///
/// Only fields active at `versions` are listed; abstract fields are skipped.
pub struct RecordDisplay<'a> {
	/// Schema the record belongs to.
	pub schema: &'a Schema,
	/// Record to render.
	pub record: &'a Record,
	/// Version pair deciding which fields are active.
	pub versions: Versions,
}

impl<'a> RecordDisplay<'a> {
	/// Display adapter for `record`.
	pub fn new(schema: &'a Schema, record: &'a Record, versions: Versions) -> Self {
		Self { schema, record, versions }
	}
}

impl fmt::Display for RecordDisplay<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&render_record(self.schema, self.record, self.versions))
	}
}

/// Render one value of type `ty` (after template substitution).
pub fn render_value(schema: &Schema, ty: Option<TypeId>, value: &Value, versions: Versions) -> String {
	match value {
		Value::Record(record) => render_record(schema, record, versions),
		Value::Array(array) => render_array(schema, array, versions),
		Value::Link(link) => render_link(link),
		Value::Enum(raw) => match ty.map(|ty| &schema.type_def(ty).kind) {
			Some(TypeKind::Enum(def)) => def.render(*raw),
			_ => raw.to_string(),
		},
		Value::Bits(values) => match ty.map(|ty| &schema.type_def(ty).kind) {
			Some(TypeKind::Bitfield(def)) => def.render(values),
			_ => format!("{values:?}"),
		},
		leaf => match ty.map(|ty| &schema.type_def(ty).kind) {
			Some(TypeKind::Primitive(prim)) => prim.render(leaf),
			_ => match leaf {
				Value::Int(value) => value.to_string(),
				Value::Float(value) => format!("{value:.4}"),
				Value::Str(raw) => String::from_utf8_lossy(raw).into_owned(),
				other => format!("<{}>", other.kind()),
			},
		},
	}
}

fn render_link(link: &Link) -> String {
	match link.state {
		LinkState::Resolved(None) => "None".to_owned(),
		LinkState::Resolved(Some(block)) => format!("#{}", block.0),
		LinkState::Unresolved(token) => format!("<unresolved {token}>"),
	}
}

fn render_record(schema: &Schema, record: &Record, versions: Versions) -> String {
	let mut out = format!("<{}>", schema.type_name(record.ty()));
	let entries = match record.entries(schema, versions) {
		Ok(entries) => entries,
		Err(err) => {
			out.push_str(&format!("\n* <error: {err}>"));
			return out;
		}
	};
	for (field, value) in entries {
		let ty = field.ty.resolve(record.template());
		push_item(&mut out, "* ", &field.label, " :", &render_value(schema, ty, value, versions));
	}
	out
}

fn render_array(schema: &Schema, array: &Array, versions: Versions) -> String {
	let ty = Some(array.elem().ty);
	let mut out = String::new();
	match array.rows() {
		Rows::Flat(items) => push_items(&mut out, schema, ty, items, versions),
		Rows::Jagged(rows) => {
			for (index, row) in rows.iter().take(MAX_DISPLAY_ITEMS).enumerate() {
				let mut inner = String::new();
				push_items(&mut inner, schema, ty, row, versions);
				push_item(&mut out, "", &index.to_string(), ":", inner.trim_start_matches('\n'));
			}
			if rows.len() > MAX_DISPLAY_ITEMS {
				out.push_str("\netc...");
			}
		}
	}
	out.trim_start_matches('\n').to_owned()
}

fn push_items(out: &mut String, schema: &Schema, ty: Option<TypeId>, items: &[Value], versions: Versions) {
	for (index, item) in items.iter().take(MAX_DISPLAY_ITEMS).enumerate() {
		push_item(out, "", &index.to_string(), ":", &render_value(schema, ty, item, versions));
	}
	if items.len() > MAX_DISPLAY_ITEMS {
		out.push_str("\netc...");
	}
}

fn push_item(out: &mut String, bullet: &str, name: &str, sep: &str, text: &str) {
	out.push('\n');
	out.push_str(bullet);
	out.push_str(name);
	out.push_str(sep);
	if !text.contains('\n') {
		if !text.is_empty() {
			out.push(' ');
			out.push_str(text);
		}
		return;
	}
	for line in text.lines() {
		out.push('\n');
		out.push_str(INDENT);
		out.push_str(line);
	}
}
