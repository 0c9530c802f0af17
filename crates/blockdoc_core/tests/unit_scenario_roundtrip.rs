#![allow(missing_docs)]

use std::sync::Arc;

use blockdoc::codec::{BlockId, DecodeOptions, Document, EncodeOptions, Schema, Value, inspect};
use blockdoc_testkit::LeBytes;

const SCHEMA: &str = r#"{
	"format": {
		"name": "mini",
		"magic": "MINI",
		"header": "Header",
		"footer": "Footer",
		"roots_field": "Roots"
	},
	"records": [
		{ "name": "Header", "fields": [{ "name": "Count", "type": "UInt" }] },
		{ "name": "Single", "fields": [{ "name": "Value", "type": "UInt" }] },
		{
			"name": "Footer",
			"fields": [
				{ "name": "Num Roots", "type": "UInt" },
				{ "name": "Roots", "type": "Ref", "arr1": "Num Roots" }
			]
		}
	]
}"#;

fn schema() -> Arc<Schema> {
	Arc::new(Schema::from_json_str(SCHEMA).expect("schema validates"))
}

/// One `Single` block: prefix, header, block payload, table, footer.
fn single_block_file() -> Vec<u8> {
	LeBytes::new()
		.bytes(b"MINI")
		.u32(5)
		.u32(0)
		.u32(24)
		.u32(42)
		.u32(7)
		.u32(1)
		.sized_string("Single")
		.u32(1)
		.u32(0)
		.u32(5)
		.u32(20)
		.u32(4)
		.i32(0)
		.u32(1)
		.i32(0)
		.finish()
}

#[test]
fn decode_then_encode_preserves_length() {
	let raw = single_block_file();
	let doc = Document::decode(schema(), raw.clone(), &DecodeOptions::strict()).expect("decodes with balanced link queue");

	assert_eq!(doc.len(), 1);
	assert_eq!(doc.roots(), &[BlockId(0)]);
	let header = doc.header().expect("header record");
	assert_eq!(header.field_int(doc.schema(), "Count").expect("count"), 42);
	let block = doc.block(BlockId(0)).expect("block");
	assert_eq!(block.record.get(doc.schema(), "Value").expect("value"), &Value::Int(7));

	let encoded = doc.encode(&EncodeOptions::default()).expect("encodes");
	assert_eq!(encoded.len(), raw.len());
	assert_eq!(encoded, raw);
}

#[test]
fn active_field_sizes_sum_to_the_stream() {
	let raw = single_block_file();
	let doc = Document::decode(schema(), raw.clone(), &DecodeOptions::strict()).expect("decodes");
	let schema = doc.schema();
	let versions = doc.versions();

	let header = doc.header().expect("header");
	let footer = doc.footer().expect("footer");
	let block = &doc.block(BlockId(0)).expect("block").record;
	let fields = header.active_fields(schema, versions).expect("header fields").len()
		+ block.active_fields(schema, versions).expect("block fields").len()
		+ footer.active_fields(schema, versions).expect("footer fields").len();
	assert_eq!(fields, 4);

	let payload = header.size(schema, None, versions).expect("header size")
		+ block.size(schema, None, versions).expect("block size")
		+ footer.size(schema, None, versions).expect("footer size");
	let table = 4 + (4 + "Single".len()) + 4 + 20;
	assert_eq!(16 + payload + table, raw.len());
}

#[test]
fn inspect_reads_only_the_table() {
	let schema = schema();
	let info = inspect(&schema, single_block_file()).expect("inspects");
	assert_eq!(info.header.version, 5);
	assert_eq!(info.header.table_offset, 24);
	assert_eq!(info.type_counts(), vec![("Single", 1)]);
	assert_eq!(info.entries[0].offset, 20);
	assert_eq!(info.entries[0].size, 4);
}

#[test]
fn wrong_magic_is_not_a_file() {
	let mut raw = single_block_file();
	raw[0] = b'X';
	let err = Document::decode(schema(), raw, &DecodeOptions::strict()).expect_err("bad magic");
	assert!(matches!(err, blockdoc::codec::CodecError::NotAFile { .. }));
}

#[test]
fn trailing_bytes_depend_on_options() {
	let mut raw = single_block_file();
	raw.extend_from_slice(&[0xAA, 0xBB]);
	let err = Document::decode(schema(), raw.clone(), &DecodeOptions::strict()).expect_err("trailing");
	assert!(matches!(err, blockdoc::codec::CodecError::TrailingData { rem: 2, .. }));

	let doc = Document::decode(schema(), raw, &DecodeOptions::lenient()).expect("lenient accepts trailing bytes");
	assert_eq!(doc.len(), 1);
}

#[test]
fn declared_block_size_is_checked() {
	let raw = LeBytes::from_vec(single_block_file()).patch_u32(24 + 4 + 10 + 4 + 12, 8).finish();
	let err = Document::decode(schema(), raw.clone(), &DecodeOptions::strict()).expect_err("size mismatch");
	assert!(matches!(
		err,
		blockdoc::codec::CodecError::BlockSizeMismatch {
			declared: 8,
			consumed: 4,
			..
		}
	));

	Document::decode(schema(), raw, &DecodeOptions::lenient()).expect("lenient logs the mismatch");
}
