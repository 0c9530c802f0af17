use std::collections::HashMap;

use blockdoc_testkit::LeBytes;

use crate::codec::array::{ArrayShape, MAX_ARRAY_LEN};
use crate::codec::bytes::{ByteSink, Cursor};
use crate::codec::expr::Scalar;
use crate::codec::link::{LinkPolicy, LinkQueue};
use crate::codec::pass::{ReadPass, WritePass};
use crate::codec::record::Record;
use crate::codec::schema::Schema;
use crate::codec::value::Value;
use crate::codec::version::Versions;
use crate::codec::{CodecError, RecordDisplay};

const V1: Versions = Versions {
	version: 0x0100_0000,
	user_version: 0,
};
const V2: Versions = Versions {
	version: 0x0200_0000,
	user_version: 0,
};

fn scene() -> Schema {
	Schema::from_json_str(&blockdoc_testkit::fixture_text("scene.schema.json")).expect("scene schema validates")
}

fn fresh(schema: &Schema, name: &str) -> Record {
	Record::new(schema, schema.type_id(name).expect("type exists"), None, None).expect("record builds")
}

fn read(schema: &Schema, name: &str, bytes: &[u8], versions: Versions, max_array_len: usize) -> crate::codec::Result<Record> {
	let mut record = fresh(schema, name);
	let mut queue = LinkQueue::new();
	let mut cur = Cursor::new(bytes);
	record.read(
		schema,
		&mut cur,
		&mut ReadPass {
			versions,
			queue: &mut queue,
			max_array_len,
		},
	)?;
	assert!(cur.is_at_end(), "record left {} bytes unread", cur.remaining());
	Ok(record)
}

fn write(schema: &Schema, record: &Record, versions: Versions) -> crate::codec::Result<Vec<u8>> {
	let index = HashMap::new();
	let mut sink = ByteSink::new();
	record.write(
		schema,
		record.arg(),
		&mut sink,
		&WritePass {
			versions,
			index: &index,
			sentinel: -1,
			policy: LinkPolicy::Strict,
			max_array_len: MAX_ARRAY_LEN,
		},
	)?;
	Ok(sink.into_inner())
}

fn mesh_v1_bytes() -> Vec<u8> {
	LeBytes::new()
		.sized_string("m")
		.u16(1 | (2 << 1) | (3 << 4))
		.u16(2)
		.f32(0.0)
		.f32(1.0)
		.f32(2.0)
		.f32(3.0)
		.f32(4.0)
		.f32(5.0)
		.u8(2)
		.u8(0)
		.u16(2)
		.u16(2)
		.u16(1)
		.u16(10)
		.u16(11)
		.u16(12)
		.u8(9)
		.u8(8)
		.u32(5)
		.finish()
}

fn names<'s>(record: &Record, schema: &'s Schema, versions: Versions) -> Vec<&'s str> {
	record
		.active_fields(schema, versions)
		.expect("active fields")
		.into_iter()
		.map(|field| &*field.name)
		.collect()
}

#[test]
fn defaults_follow_the_schema() {
	let schema = scene();
	let mesh = fresh(&schema, "Mesh");
	assert_eq!(mesh.get(&schema, "Alpha").expect("alpha"), &Value::Enum(1));
	assert_eq!(mesh.get(&schema, "Flags").expect("flags"), &Value::Bits(vec![0, 2, 0]));
	assert_eq!(mesh.field_int(&schema, "flags").expect("packed flags"), 4);

	let shape = fresh(&schema, "Shape");
	assert_eq!(shape.get(&schema, "Radius").expect("radius").as_float(), Some(0.5));

	let header = fresh(&schema, "Header");
	assert_eq!(header.get(&schema, "Creator").expect("creator").as_str(), Some(&b"blockdoc"[..]));
}

#[test]
fn reads_and_rewrites_a_mesh_bit_exactly() {
	let schema = scene();
	let bytes = mesh_v1_bytes();
	let mesh = read(&schema, "Mesh", &bytes, V1, MAX_ARRAY_LEN).expect("mesh decodes");

	assert_eq!(mesh.get(&schema, "Flags").expect("flags"), &Value::Bits(vec![1, 2, 3]));
	assert_eq!(mesh.field_int(&schema, "Alpha").expect("alpha"), 2);
	assert_eq!(mesh.field_int(&schema, "Legacy Flags").expect("legacy"), 5);

	let vertices = mesh.get(&schema, "Vertices").expect("vertices").as_array().expect("array");
	assert_eq!(vertices.len(), 2);
	let second = vertices.get(1).expect("second vertex").as_record().expect("record");
	assert_eq!(second.get(&schema, "Z").expect("z").as_float(), Some(5.0));

	let strips = mesh.get(&schema, "Strips").expect("strips").as_array().expect("array");
	assert_eq!(strips.shape(), ArrayShape::Jagged(vec![2, 1]));
	assert_eq!(strips.get2(0, 1).expect("cell"), &Value::Int(11));
	assert_eq!(strips.get2(1, 0).expect("cell"), &Value::Int(12));
	assert!(matches!(strips.get2(1, 1), Err(CodecError::IndexOutOfRange { index: 1, len: 1 })));

	assert_eq!(mesh.size(&schema, None, V1).expect("size"), bytes.len());
	assert_eq!(write(&schema, &mesh, V1).expect("mesh encodes"), bytes);
}

#[test]
fn record_argument_sizes_nested_arrays() {
	let schema = scene();
	let mesh = read(&schema, "Mesh", &mesh_v1_bytes(), V1, MAX_ARRAY_LEN).expect("mesh decodes");
	let palette = mesh.get(&schema, "Palette").expect("palette").as_record().expect("record");
	assert_eq!(palette.arg(), Some(2));
	let entries = palette.get(&schema, "Entries").expect("entries").as_array().expect("array");
	assert_eq!(entries.get_scalar(&schema, 0).expect("entry"), Scalar::Int(9));
	assert_eq!(entries.get_scalar(&schema, 1).expect("entry"), Scalar::Int(8));
}

#[test]
fn oversized_counts_are_rejected_before_allocation() {
	let schema = scene();
	let err = read(&schema, "Mesh", &mesh_v1_bytes(), V1, 1).expect_err("ceiling");
	assert!(matches!(err, CodecError::ArrayTooLarge { count: 2, max: 1, .. }));
}

#[test]
fn version_gates_change_the_field_set() {
	let schema = scene();
	let mesh = fresh(&schema, "Mesh");
	assert!(names(&mesh, &schema, V1).contains(&"legacy_flags"));
	assert!(!names(&mesh, &schema, V2).contains(&"legacy_flags"));
	assert_eq!(mesh.size(&schema, None, V2).expect("size"), 12);
	assert_eq!(mesh.size(&schema, None, V1).expect("size"), 16);

	let node = fresh(&schema, "Node");
	assert!(!names(&node, &schema, V1).contains(&"shape"));
	assert!(names(&node, &schema, V2).contains(&"shape"));
	let tagged = Versions::new(0x0200_0000, 7);
	assert!(names(&node, &schema, tagged).contains(&"export_tag"));
}

#[test]
fn conditions_read_earlier_values() {
	let schema = scene();
	let mut node = fresh(&schema, "Node");
	assert!(!names(&node, &schema, V2).contains(&"scale"));

	node.set_int(&schema, "Has Scale", 1).expect("set flag");
	assert!(names(&node, &schema, V2).contains(&"scale"));
	assert_eq!(node.get(&schema, "Scale").expect("scale").as_float(), Some(1.0));
}

#[test]
fn abstract_fields_are_gated_but_never_stored() {
	let schema = scene();
	let node = fresh(&schema, "Node");
	assert!(names(&node, &schema, V2).contains(&"bounds_radius"));
	assert!(node.entries(&schema, V2).expect("entries").iter().all(|(field, _)| &*field.name != "bounds_radius"));

	let base = node.size(&schema, None, V2).expect("size");
	let bytes = write(&schema, &node, V2).expect("node encodes");
	assert_eq!(bytes.len(), base);
}

#[test]
fn update_size_keeps_retained_elements() {
	let schema = scene();
	let mut mesh = fresh(&schema, "Mesh");
	mesh.set_int(&schema, "Num Vertices", 2).expect("count");
	mesh.update_size(&schema, "Vertices").expect("resize");
	mesh.get_mut(&schema, "Vertices")
		.expect("vertices")
		.as_array_mut()
		.expect("array")
		.get_mut(0)
		.expect("first")
		.as_record_mut()
		.expect("record")
		.set_float(&schema, "X", 7.5)
		.expect("set x");

	mesh.set_int(&schema, "Num Vertices", 3).expect("count");
	mesh.update_size(&schema, "Vertices").expect("grow");
	let vertices = mesh.get(&schema, "Vertices").expect("vertices").as_array().expect("array");
	assert_eq!(vertices.len(), 3);
	let first = vertices.get(0).expect("first").as_record().expect("record");
	assert_eq!(first.get(&schema, "X").expect("x").as_float(), Some(7.5));

	mesh.resize_array(&schema, "Vertices", 1).expect("shrink");
	assert_eq!(mesh.field_int(&schema, "Num Vertices").expect("count"), 1);
	assert_eq!(mesh.get(&schema, "Vertices").expect("vertices").as_array().map(|array| array.len()), Some(1));
}

#[test]
fn write_rejects_drifted_array_lengths() {
	let schema = scene();
	let mut mesh = fresh(&schema, "Mesh");
	mesh.set_int(&schema, "Num Vertices", 2).expect("count");
	let err = write(&schema, &mesh, V2).expect_err("length drift");
	assert!(matches!(err, CodecError::ArraySizeMismatch { .. }));

	mesh.update_size(&schema, "Vertices").expect("resize vertices");
	let err = write(&schema, &mesh, V2).expect_err("palette still empty");
	assert!(matches!(err, CodecError::ArraySizeMismatch { .. }));
}

#[test]
fn jagged_rows_follow_per_row_lengths() {
	let schema = scene();
	let mut mesh = fresh(&schema, "Mesh");
	mesh.resize_array(&schema, "Strip Lengths", 2).expect("rows");
	{
		let lengths = mesh.get_mut(&schema, "Strip Lengths").expect("lengths").as_array_mut().expect("array");
		lengths.set_scalar(&schema, 0, Scalar::Int(3)).expect("row 0");
		lengths.set_scalar(&schema, 1, Scalar::Int(1)).expect("row 1");
	}
	mesh.update_size(&schema, "Strips").expect("jagged resize");
	let strips = mesh.get(&schema, "Strips").expect("strips").as_array().expect("array");
	assert_eq!(strips.shape(), ArrayShape::Jagged(vec![3, 1]));
	assert_eq!(strips.len(), 2);
	assert_eq!(strips.values().count(), 4);
	assert_eq!(strips.shape().total(), 4);
}

#[test]
fn template_bindings_reach_nested_records() {
	let schema = scene();
	let mut animation = fresh(&schema, "Animation");
	let group = animation
		.get_mut(&schema, "Translations")
		.expect("translations")
		.as_record_mut()
		.expect("record");
	assert_eq!(group.template(), schema.type_id("Vector3"));
	assert!(!names(group, &schema, V2).contains(&"interpolation"));

	group.resize_array(&schema, "Keys", 2).expect("keys");
	assert!(names(group, &schema, V2).contains(&"interpolation"));
	let keys = group.get(&schema, "Keys").expect("keys").as_array().expect("array");
	let key = keys.get(1).expect("key").as_record().expect("record");
	assert_eq!(key.template(), schema.type_id("Vector3"));
	let value = key.get(&schema, "Value").expect("value").as_record().expect("vector value");
	assert_eq!(Some(value.ty()), schema.type_id("Vector3"));

	let visibility = animation.get(&schema, "Visibility").expect("visibility").as_record().expect("record");
	assert_eq!(visibility.template(), schema.type_id("Byte"));
}

#[test]
fn unbound_templates_fail_with_missing_attribute() {
	let schema = scene();
	let group = schema.type_id("KeyGroup").expect("KeyGroup");
	let err = Record::new(&schema, group, None, None).expect_err("no binding");
	assert!(matches!(err, CodecError::MissingAttribute { .. }));
}

#[test]
fn setters_validate_ranges_and_enum_members() {
	let schema = scene();
	let mut mesh = fresh(&schema, "Mesh");

	mesh.set_str(&schema, "Alpha", "MASK").expect("by name");
	assert_eq!(mesh.get(&schema, "Alpha").expect("alpha"), &Value::Enum(2));
	mesh.set_str(&schema, "Alpha", "0x1").expect("by hex");
	assert_eq!(mesh.field_int(&schema, "Alpha").expect("alpha"), 1);
	assert!(matches!(mesh.set_int(&schema, "Alpha", 7), Err(CodecError::InvalidEnumValue { value: 7, .. })));

	assert!(matches!(mesh.set_int(&schema, "Num Vertices", 70_000), Err(CodecError::Range { .. })));
	assert!(matches!(mesh.set_bit(&schema, "Flags", "Hidden", 2), Err(CodecError::Range { .. })));
	mesh.set_bit(&schema, "Flags", "Layer", 15).expect("max layer");
	assert_eq!(mesh.get(&schema, "Flags").expect("flags"), &Value::Bits(vec![0, 2, 15]));

	assert!(matches!(mesh.set_int(&schema, "Missing", 1), Err(CodecError::FieldNotFound { .. })));
	assert!(matches!(mesh.set_int(&schema, "Vertices", 1), Err(CodecError::ValueKind { .. })));
}

#[test]
fn negative_counts_are_size_errors() {
	let schema = Schema::from_json_str(
		r#"{
			"format": { "name": "t", "magic": "T" },
			"records": [{
				"name": "A",
				"fields": [
					{ "name": "Count", "type": "Int" },
					{ "name": "Items", "type": "UByte", "arr1": "Count" }
				]
			}]
		}"#,
	)
	.expect("schema");
	let mut record = fresh(&schema, "A");
	record.set_int(&schema, "Count", -1).expect("signed count");
	assert!(matches!(record.update_size(&schema, "Items"), Err(CodecError::NegativeArrayLength { value: -1, .. })));
}

#[test]
fn display_lists_active_fields() {
	let schema = scene();
	let mesh = read(&schema, "Mesh", &mesh_v1_bytes(), V1, MAX_ARRAY_LEN).expect("mesh decodes");
	let text = RecordDisplay::new(&schema, &mesh, V1).to_string();
	assert!(text.starts_with("<Mesh>\n* Name : m\n"));
	assert!(text.contains("* Flags : Hidden=1, Mode=2, Layer=3"));
	assert!(text.contains("* Alpha : MASK"));
	assert!(text.contains("* Vertices :\n    0:\n        <Vector3>"));
	assert!(!text.contains("* Normals :"));
}
