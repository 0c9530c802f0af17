use std::path::PathBuf;

use blockdoc::codec::{CodecError, FieldSpec, FieldType, Schema, TypeKind, format_version};

use crate::cmd::util::{emit_json, load_schema};

#[derive(clap::Args)]
pub struct Args {
	pub schema: PathBuf,
	/// Show the effective fields of one record type.
	#[arg(long = "type")]
	pub type_name: Option<String>,
	#[arg(long)]
	pub json: bool,
}

/// List schema types, or the effective field layout of one record.
pub fn run(args: Args) -> blockdoc::codec::Result<()> {
	let Args { schema, type_name, json } = args;
	let schema = load_schema(&schema)?;

	match type_name {
		Some(name) => print_record(&schema, &name, json),
		None => {
			print_types(&schema, json);
			Ok(())
		}
	}
}

fn print_types(schema: &Schema, json: bool) {
	let rows: Vec<TypeJson> = schema
		.types()
		.map(|(id, def)| TypeJson {
			name: def.name.to_string(),
			kind: def.kind.label(),
			block: schema.is_block_type(id),
		})
		.collect();

	if json {
		emit_json(&rows);
		return;
	}
	println!("name\tkind\tblock");
	for row in &rows {
		println!("{}\t{}\t{}", row.name, row.kind, row.block);
	}
}

fn print_record(schema: &Schema, name: &str, json: bool) -> blockdoc::codec::Result<()> {
	let ty = schema.require_type(name)?;
	let def = match &schema.type_def(ty).kind {
		TypeKind::Record(def) => def,
		other => {
			return Err(CodecError::ValueKind {
				expected: "record",
				got: other.label(),
			});
		}
	};

	let fields: Vec<FieldJson> = def.fields.iter().map(|field| field_json(schema, field)).collect();
	if json {
		emit_json(&RecordJson {
			name: name.to_owned(),
			base: def.base.map(|base| schema.type_name(base).to_owned()),
			template: def.is_template,
			fields,
		});
		return Ok(());
	}

	println!("record: {name}");
	if let Some(base) = def.base {
		println!("base: {}", schema.type_name(base));
	}
	println!("template: {}", def.is_template);
	println!();
	println!("field\ttype\tgates");
	for field in &fields {
		let ty = match &field.template {
			Some(template) => format!("{}<{}>", field.type_name, template),
			None => field.type_name.clone(),
		};
		let ty = match (&field.arr1, &field.arr2) {
			(Some(arr1), Some(arr2)) => format!("{ty}[{arr1}][{arr2}]"),
			(Some(arr1), None) => format!("{ty}[{arr1}]"),
			_ => ty,
		};
		println!("{}\t{}\t{}", field.name, ty, gate_summary(field));
	}
	Ok(())
}

fn field_json(schema: &Schema, field: &FieldSpec) -> FieldJson {
	let type_label = |ty: FieldType| match ty {
		FieldType::Template => "TEMPLATE".to_owned(),
		FieldType::Type(ty) => schema.type_name(ty).to_owned(),
	};
	FieldJson {
		name: field.label.to_string(),
		type_name: type_label(field.ty),
		template: field.template.map(type_label),
		arg: field.arg.as_ref().map(ToString::to_string),
		arr1: field.arr1.as_ref().map(ToString::to_string),
		arr2: field.arr2.as_ref().map(ToString::to_string),
		cond: field.cond.as_ref().map(ToString::to_string),
		vercond: field.vercond.as_ref().map(ToString::to_string),
		ver1: field.ver1.map(format_version),
		ver2: field.ver2.map(format_version),
		userver: field.userver,
		is_abstract: field.is_abstract,
	}
}

fn gate_summary(field: &FieldJson) -> String {
	let mut gates = Vec::new();
	if let Some(cond) = &field.cond {
		gates.push(format!("cond({cond})"));
	}
	if let Some(vercond) = &field.vercond {
		gates.push(format!("vercond({vercond})"));
	}
	match (&field.ver1, &field.ver2) {
		(Some(ver1), Some(ver2)) => gates.push(format!("{ver1}..={ver2}")),
		(Some(ver1), None) => gates.push(format!(">={ver1}")),
		(None, Some(ver2)) => gates.push(format!("<={ver2}")),
		(None, None) => {}
	}
	if let Some(userver) = field.userver {
		gates.push(format!("userver={userver}"));
	}
	if let Some(arg) = &field.arg {
		gates.push(format!("arg({arg})"));
	}
	if field.is_abstract {
		gates.push("abstract".to_owned());
	}
	if gates.is_empty() { "-".to_owned() } else { gates.join(" ") }
}

#[derive(serde::Serialize)]
struct TypeJson {
	name: String,
	kind: &'static str,
	block: bool,
}

#[derive(serde::Serialize)]
struct FieldJson {
	name: String,
	#[serde(rename = "type")]
	type_name: String,
	template: Option<String>,
	arg: Option<String>,
	arr1: Option<String>,
	arr2: Option<String>,
	cond: Option<String>,
	vercond: Option<String>,
	ver1: Option<String>,
	ver2: Option<String>,
	userver: Option<u32>,
	#[serde(rename = "abstract")]
	is_abstract: bool,
}

#[derive(serde::Serialize)]
struct RecordJson {
	name: String,
	base: Option<String>,
	template: bool,
	fields: Vec<FieldJson>,
}
