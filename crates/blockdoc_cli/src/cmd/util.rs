use std::path::Path;
use std::sync::Arc;

use blockdoc::codec::{Array, DecodeOptions, Link, LinkState, Record, Rows, Schema, TypeId, TypeKind, Value, Versions, render_value};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue, json};

/// Load and validate a JSON schema document.
pub(crate) fn load_schema(path: &Path) -> blockdoc::codec::Result<Arc<Schema>> {
	let text = std::fs::read_to_string(path)?;
	Ok(Arc::new(Schema::from_json_str(&text)?))
}

/// Decode preset selected by the `--lenient` flag.
pub(crate) fn decode_options(lenient: bool) -> DecodeOptions {
	if lenient { DecodeOptions::lenient() } else { DecodeOptions::strict() }
}

/// Print `payload` as pretty JSON on stdout.
pub(crate) fn emit_json<T: Serialize>(payload: &T) {
	match serde_json::to_string_pretty(payload) {
		Ok(text) => println!("{text}"),
		Err(err) => eprintln!("error: failed to serialize json output: {err}"),
	}
}

/// JSON object of a record's active fields, keyed by label.
pub(crate) fn record_json(schema: &Schema, record: &Record, versions: Versions) -> JsonValue {
	let mut fields = Map::new();
	match record.entries(schema, versions) {
		Ok(entries) => {
			for (field, value) in entries {
				let ty = field.ty.resolve(record.template());
				fields.insert(field.label.to_string(), value_json(schema, ty, value, versions));
			}
		}
		Err(err) => {
			fields.insert("<error>".to_owned(), JsonValue::String(err.to_string()));
		}
	}
	json!({ "type": schema.type_name(record.ty()), "fields": fields })
}

/// JSON rendering of one value of type `ty`.
///
/// Enums render as their option name, bitfields as a member object, links as
/// the target block index or `null`.
pub(crate) fn value_json(schema: &Schema, ty: Option<TypeId>, value: &Value, versions: Versions) -> JsonValue {
	let kind = ty.map(|ty| &schema.type_def(ty).kind);
	match (value, kind) {
		(Value::Int(value), _) => json!(value),
		(Value::Float(value), _) => json!(value),
		(Value::Str(raw), _) => JsonValue::String(String::from_utf8_lossy(raw).into_owned()),
		(Value::Enum(_), _) => JsonValue::String(render_value(schema, ty, value, versions)),
		(Value::Bits(values), Some(TypeKind::Bitfield(def))) => {
			let members = def.members.iter().zip(values).map(|(member, value)| (member.name.to_string(), json!(value))).collect();
			JsonValue::Object(members)
		}
		(Value::Bits(values), _) => json!(values),
		(Value::Link(link), _) => link_json(link),
		(Value::Record(record), _) => record_json(schema, record, versions),
		(Value::Array(array), _) => array_json(schema, array, versions),
	}
}

fn link_json(link: &Link) -> JsonValue {
	match link.state {
		LinkState::Resolved(Some(block)) => json!(block.0),
		LinkState::Resolved(None) => JsonValue::Null,
		LinkState::Unresolved(token) => json!({ "unresolved": token }),
	}
}

fn array_json(schema: &Schema, array: &Array, versions: Versions) -> JsonValue {
	let ty = Some(array.elem().ty);
	let items = |items: &[Value]| JsonValue::Array(items.iter().map(|item| value_json(schema, ty, item, versions)).collect());
	match array.rows() {
		Rows::Flat(values) => items(values),
		Rows::Jagged(rows) => JsonValue::Array(rows.iter().map(|row| items(row)).collect()),
	}
}
