//! Shared test helpers for workspace crates.

use std::path::{Path, PathBuf};

/// Resolve the workspace root path.
pub fn workspace_root() -> PathBuf {
	let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
	manifest_dir
		.join("..")
		.join("..")
		.canonicalize()
		.unwrap_or_else(|_| manifest_dir.join("..").join(".."))
}

/// Resolve a fixture path under `<workspace>/fixtures`.
pub fn fixture_path(name: &str) -> PathBuf {
	workspace_root().join("fixtures").join(name)
}

/// Resolve the workspace target directory.
pub fn target_dir() -> PathBuf {
	std::env::var_os("CARGO_TARGET_DIR")
		.map(PathBuf::from)
		.unwrap_or_else(|| workspace_root().join("target"))
}

/// Read a fixture file into a string, panicking with its path on failure.
pub fn fixture_text(name: &str) -> String {
	let path = fixture_path(name);
	std::fs::read_to_string(&path).unwrap_or_else(|err| panic!("read fixture {}: {err}", path.display()))
}

/// Parse a JSON fixture.
pub fn fixture_json(name: &str) -> serde_json::Value {
	serde_json::from_str(&fixture_text(name)).unwrap_or_else(|err| panic!("parse fixture {name}: {err}"))
}

/// Little-endian byte builder for hand-crafted streams.
#[derive(Debug, Default, Clone)]
pub struct LeBytes {
	bytes: Vec<u8>,
}

impl LeBytes {
	/// Empty builder.
	pub fn new() -> Self {
		Self::default()
	}

	/// Continue an existing stream, typically to patch it.
	pub fn from_vec(bytes: Vec<u8>) -> Self {
		Self { bytes }
	}

	/// Current length, usable as an offset for later patches.
	pub fn len(&self) -> usize {
		self.bytes.len()
	}

	/// Whether nothing was written yet.
	pub fn is_empty(&self) -> bool {
		self.bytes.is_empty()
	}

	/// Append one byte.
	pub fn u8(mut self, value: u8) -> Self {
		self.bytes.push(value);
		self
	}

	/// Append a `u16`.
	pub fn u16(mut self, value: u16) -> Self {
		self.bytes.extend_from_slice(&value.to_le_bytes());
		self
	}

	/// Append a `u32`.
	pub fn u32(mut self, value: u32) -> Self {
		self.bytes.extend_from_slice(&value.to_le_bytes());
		self
	}

	/// Append an `i32`.
	pub fn i32(mut self, value: i32) -> Self {
		self.bytes.extend_from_slice(&value.to_le_bytes());
		self
	}

	/// Append an `f32`.
	pub fn f32(mut self, value: f32) -> Self {
		self.bytes.extend_from_slice(&value.to_le_bytes());
		self
	}

	/// Append raw bytes.
	pub fn bytes(mut self, value: &[u8]) -> Self {
		self.bytes.extend_from_slice(value);
		self
	}

	/// Append a `u32` length followed by the bytes of `text`.
	pub fn sized_string(self, text: &str) -> Self {
		self.u32(text.len() as u32).bytes(text.as_bytes())
	}

	/// Overwrite four bytes at `at` with `value`.
	pub fn patch_u32(mut self, at: usize, value: u32) -> Self {
		self.bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
		self
	}

	/// Finished byte vector.
	pub fn finish(self) -> Vec<u8> {
		self.bytes
	}
}
