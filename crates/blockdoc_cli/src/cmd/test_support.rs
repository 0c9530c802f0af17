use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::{Arc, OnceLock};

use blockdoc::codec::{Compression, Document, EncodeOptions, Schema};
use blockdoc_testkit::{fixture_path, fixture_text, target_dir as workspace_target_dir};

static BLOCKDOC_BIN: OnceLock<PathBuf> = OnceLock::new();

pub(crate) fn scene_schema_path() -> String {
	fixture_path("scene.schema.json").to_string_lossy().into_owned()
}

/// Write a small scene document (two nodes, a mesh, a shape) into `dir`.
pub(crate) fn write_scene(dir: &Path, name: &str, compression: Compression) -> String {
	let schema = Arc::new(Schema::from_json_str(&fixture_text("scene.schema.json")).expect("scene schema validates"));
	let mut doc = Document::new(Arc::clone(&schema), 0x0200_0000, 0).expect("document");
	let root = doc.new_block("Node").expect("root");
	let child = doc.new_block("Node").expect("child");
	let mesh = doc.new_block("Mesh").expect("mesh");
	let shape = doc.new_block("Shape").expect("shape");

	let record = &mut doc.block_mut(root).expect("root").record;
	record.set_str(&schema, "Name", "root").expect("name");
	record.resize_array(&schema, "Children", 1).expect("children");
	record
		.get_mut(&schema, "Children")
		.expect("children")
		.as_array_mut()
		.expect("array")
		.get_mut(0)
		.expect("slot")
		.for_each_link_mut(&mut |link| link.set(Some(child)));
	doc.set_link(root, "Mesh", Some(mesh)).expect("mesh link");
	doc.set_link(root, "Shape", Some(shape)).expect("shape link");
	doc.set_link(child, "Parent", Some(root)).expect("parent link");
	doc.set_link(shape, "Body", Some(root)).expect("body link");
	doc.block_mut(mesh).expect("mesh").record.set_str(&schema, "Name", "mesh").expect("name");
	doc.set_roots(vec![root]).expect("roots");

	let path = dir.join(name);
	doc.save(&path, &EncodeOptions { compression, ..EncodeOptions::default() }).expect("scene saves");
	path.to_string_lossy().into_owned()
}

pub(crate) fn run_blockdoc(args: &[&str]) -> Output {
	Command::new(blockdoc_bin()).args(args).output().expect("blockdoc command executes")
}

pub(crate) fn run_blockdoc_json(args: &[&str]) -> serde_json::Value {
	let output = run_blockdoc(args);
	assert!(
		output.status.success(),
		"blockdoc command failed with status={}: {}",
		output.status,
		String::from_utf8_lossy(&output.stderr)
	);
	serde_json::from_slice(&output.stdout).expect("stdout should be valid json")
}

fn blockdoc_bin() -> &'static PathBuf {
	BLOCKDOC_BIN.get_or_init(resolve_blockdoc_bin)
}

fn resolve_blockdoc_bin() -> PathBuf {
	if let Ok(path) = std::env::var("CARGO_BIN_EXE_blockdoc") {
		return PathBuf::from(path);
	}

	let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
	let target_dir = workspace_target_dir();

	let mut bin = target_dir.join("debug");
	bin.push(if cfg!(windows) { "blockdoc.exe" } else { "blockdoc" });

	let status = Command::new("cargo")
		.current_dir(&manifest_dir)
		.args(["build", "--quiet", "--bin", "blockdoc"])
		.status()
		.expect("cargo build executes");
	assert!(status.success(), "failed to build blockdoc binary at {}", bin.display());

	bin
}
