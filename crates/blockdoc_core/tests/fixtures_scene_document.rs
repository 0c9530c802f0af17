#![allow(missing_docs)]

use std::sync::Arc;

use blockdoc::codec::{
	BlockId, Compression, DecodeOptions, Document, EncodeOptions, RecordDisplay, Schema, Value, ZSTD_MAGIC, inspect, inspect_path,
};

const V1: u32 = 0x0100_0000;
const V2: u32 = 0x0200_0000;

fn scene_schema() -> Arc<Schema> {
	let text = blockdoc_testkit::fixture_text("scene.schema.json");
	Arc::new(Schema::from_json_str(&text).expect("scene schema validates"))
}

struct Scene {
	doc: Document,
	root: BlockId,
	child: BlockId,
	mesh: BlockId,
	shape: BlockId,
	anim: BlockId,
}

fn build_scene(version: u32) -> Scene {
	let schema = scene_schema();
	let mut doc = Document::new(Arc::clone(&schema), version, 0).expect("document");
	if version >= V2 {
		doc.header_mut().expect("header").set_str(&schema, "Export Info", "unit test").expect("export info");
	}

	let root = doc.new_block("Node").expect("root");
	let child = doc.new_block("Node").expect("child");
	let mesh = doc.new_block("Mesh").expect("mesh");
	let shape = doc.new_block("Shape").expect("shape");
	let anim = doc.new_block("Animation").expect("animation");

	{
		let record = &mut doc.block_mut(root).expect("root").record;
		record.set_str(&schema, "Name", "root").expect("name");
		record.set_bit(&schema, "Flags", "Layer", 3).expect("layer");
		record.set_int(&schema, "Has Scale", 1).expect("has scale");
		record.set_float(&schema, "Scale", 2.0).expect("scale");
		record
			.get_mut(&schema, "Translation")
			.expect("translation")
			.as_record_mut()
			.expect("vector")
			.set_float(&schema, "Y", 2.5)
			.expect("y");
		record.resize_array(&schema, "Children", 1).expect("children");
		let children = record.get_mut(&schema, "Children").expect("children").as_array_mut().expect("array");
		if let Value::Link(link) = children.get_mut(0).expect("slot") {
			link.set(Some(child));
		}
	}
	doc.set_link(root, "Mesh", Some(mesh)).expect("root -> mesh");
	if version >= V2 {
		doc.set_link(root, "Shape", Some(shape)).expect("root -> shape");
	}

	doc.block_mut(child).expect("child").record.set_str(&schema, "Name", "child").expect("name");
	doc.set_link(child, "Parent", Some(root)).expect("child -> root");

	{
		let record = &mut doc.block_mut(mesh).expect("mesh").record;
		record.set_str(&schema, "Name", "mesh").expect("name");
		record.resize_array(&schema, "Vertices", 2).expect("vertices");
		record.set_int(&schema, "Has Normals", 1).expect("has normals");
		record.update_size(&schema, "Normals").expect("normals");
		record.resize_array(&schema, "Strip Lengths", 2).expect("strip lengths");
		let lengths = record.get_mut(&schema, "Strip Lengths").expect("lengths").as_array_mut().expect("array");
		lengths.set_scalar(&schema, 0, blockdoc::codec::Scalar::Int(3)).expect("row 0");
		lengths.set_scalar(&schema, 1, blockdoc::codec::Scalar::Int(2)).expect("row 1");
		record.update_size(&schema, "Strips").expect("strips");
		let palette = record.get_mut(&schema, "Palette").expect("palette").as_record_mut().expect("record");
		palette.set_arg(Some(2));
		palette.update_size(&schema, "Entries").expect("entries");
	}

	doc.set_link(shape, "Body", Some(root)).expect("shape -> root");
	doc.block_mut(shape).expect("shape").record.set_str(&schema, "Kind", "CAPSULE").expect("kind");

	{
		let record = &mut doc.block_mut(anim).expect("animation").record;
		record.set_str(&schema, "Name", "anim").expect("name");
		let group = record.get_mut(&schema, "Translations").expect("translations").as_record_mut().expect("group");
		group.resize_array(&schema, "Keys", 1).expect("keys");
		group
			.get_mut(&schema, "Keys")
			.expect("keys")
			.as_array_mut()
			.expect("array")
			.get_mut(0)
			.expect("key")
			.as_record_mut()
			.expect("key record")
			.set_float(&schema, "Time", 0.25)
			.expect("time");
	}
	doc.set_link(anim, "Target", Some(root)).expect("anim -> root");
	doc.set_roots(vec![root, anim]).expect("roots");

	Scene {
		doc,
		root,
		child,
		mesh,
		shape,
		anim,
	}
}

#[test]
fn scene_round_trips_structurally() {
	let scene = build_scene(V2);
	let raw = scene.doc.encode(&EncodeOptions::default()).expect("encodes");
	let decoded = Document::decode(scene_schema(), raw.clone(), &DecodeOptions::strict()).expect("decodes");

	assert_eq!(decoded.len(), 5);
	assert_eq!(decoded.roots().len(), 2);
	assert_eq!(decoded.root_hashes().expect("hashes"), scene.doc.root_hashes().expect("hashes"));

	let again = decoded.encode(&EncodeOptions::default()).expect("re-encodes");
	assert_eq!(again, raw, "decoded graph encodes to identical bytes");
}

#[test]
fn child_first_types_precede_their_owner() {
	let scene = build_scene(V2);
	let plan = scene.doc.plan_blocks().expect("plan");
	assert_eq!(plan.order, vec![scene.shape, scene.root, scene.child, scene.mesh, scene.anim]);
	assert_eq!(plan.ids[&scene.shape], 0);
	assert_eq!(plan.ids[&scene.root], 1);
	let names: Vec<&str> = plan.type_names.iter().map(|name| &**name).collect();
	assert_eq!(names, ["Node", "Shape", "Mesh", "Animation"]);
}

#[test]
fn old_versions_drop_gated_links() {
	let scene = build_scene(V1);
	let plan = scene.doc.plan_blocks().expect("plan");
	assert!(!plan.order.contains(&scene.shape));

	let raw = scene.doc.encode(&EncodeOptions::default()).expect("encodes");
	let decoded = Document::decode(scene_schema(), raw, &DecodeOptions::strict()).expect("decodes");
	assert_eq!(decoded.len(), 4);
	assert_eq!(decoded.version(), V1);
	assert_eq!(decoded.root_hashes().expect("hashes"), scene.doc.root_hashes().expect("hashes"));
}

#[test]
fn inspect_lists_types_without_decoding() {
	let scene = build_scene(V2);
	let raw = scene.doc.encode(&EncodeOptions::default()).expect("encodes");
	let info = inspect(&scene_schema(), raw).expect("inspects");
	assert_eq!(info.header.version, V2);
	assert_eq!(info.compression, Compression::None);
	assert_eq!(info.type_counts(), vec![("Node", 2), ("Shape", 1), ("Mesh", 1), ("Animation", 1)]);
	assert_eq!(info.entries.iter().map(|entry| entry.id).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn zstd_output_decodes_transparently() {
	let scene = build_scene(V2);
	let options = EncodeOptions {
		compression: Compression::Zstd,
		..EncodeOptions::default()
	};
	let dir = tempfile::tempdir().expect("temp dir");
	let path = dir.path().join("scene.bdoc");
	scene.doc.save(&path, &options).expect("saves");

	let raw = std::fs::read(&path).expect("reads back");
	assert_eq!(raw[..4], ZSTD_MAGIC);
	assert_eq!(inspect_path(&scene_schema(), &path).expect("inspects").compression, Compression::Zstd);

	let decoded = Document::open(scene_schema(), &path, &DecodeOptions::strict()).expect("opens");
	assert_eq!(decoded.compression(), Compression::Zstd);
	assert_eq!(decoded.root_hashes().expect("hashes"), scene.doc.root_hashes().expect("hashes"));
}

#[test]
fn undeclared_enum_values_survive_a_round_trip() {
	let mut scene = build_scene(V2);
	let schema = Arc::clone(scene.doc.schema());
	*scene.doc.block_mut(scene.mesh).expect("mesh").record.get_mut(&schema, "Alpha").expect("alpha") = Value::Enum(9);

	let raw = scene.doc.encode(&EncodeOptions::default()).expect("encodes");
	let decoded = Document::decode(Arc::clone(&schema), raw, &DecodeOptions::strict()).expect("decodes");
	let (id, block) = decoded
		.blocks()
		.find(|(id, _)| decoded.block_type_name(*id).ok() == Some("Mesh"))
		.expect("mesh block");
	assert_eq!(block.record.get(&schema, "Alpha").expect("alpha"), &Value::Enum(9));

	let text = RecordDisplay::new(&schema, &block.record, decoded.block_versions(id).expect("versions")).to_string();
	assert!(text.contains("* Alpha : <INVALID (9)>"));
}

#[test]
fn strings_are_distinct_and_ordered() {
	let scene = build_scene(V2);
	let strings = scene.doc.strings().expect("strings");
	let strings: Vec<&[u8]> = strings.iter().map(Vec::as_slice).collect();
	assert_eq!(strings, [&b"blockdoc"[..], &b"unit test"[..], &b"root"[..], &b"child"[..], &b"mesh"[..], &b"anim"[..]]);
}

#[test]
fn unowned_blocks_default_to_roots() {
	let scene = build_scene(V2);
	let unowned = scene.doc.unowned_blocks().expect("unowned");
	assert_eq!(unowned, vec![scene.root, scene.anim]);
}
