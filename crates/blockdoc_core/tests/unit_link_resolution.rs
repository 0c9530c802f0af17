#![allow(missing_docs)]

use std::sync::Arc;

use blockdoc::codec::{BlockId, CodecError, DecodeOptions, Document, EncodeOptions, LinkPolicy, Schema};
use blockdoc_testkit::LeBytes;

const SCHEMA: &str = r#"{
	"format": { "name": "links", "magic": "LNKS", "link_sentinel_since": 2 },
	"records": [
		{ "name": "Leaf", "fields": [{ "name": "Next", "type": "Ref", "template": "Leaf" }] },
		{ "name": "Other", "fields": [{ "name": "Value", "type": "UInt" }] },
		{ "name": "Pointer", "fields": [{ "name": "Target", "type": "Ptr", "template": "Leaf" }] },
		{
			"name": "Backwards",
			"fields": [
				{ "name": "Link", "type": "Ref", "cond": "Later" },
				{ "name": "Later", "type": "UInt" }
			]
		}
	]
}"#;

/// Same link records, but the footer lists the roots.
const ROOTED_SCHEMA: &str = r#"{
	"format": { "name": "rooted", "magic": "ROOT", "link_sentinel_since": 2, "footer": "Footer", "roots_field": "Roots" },
	"records": [
		{ "name": "Leaf", "fields": [{ "name": "Next", "type": "Ref", "template": "Leaf" }] },
		{ "name": "Pointer", "fields": [{ "name": "Target", "type": "Ptr", "template": "Leaf" }] },
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

fn rooted_schema() -> Arc<Schema> {
	Arc::new(Schema::from_json_str(ROOTED_SCHEMA).expect("schema validates"))
}

/// Container without header or footer: prefix, payloads, table.
fn container(version: u32, type_names: &[&str], blocks: &[(u32, i32, Vec<u8>)]) -> Vec<u8> {
	let mut bytes = LeBytes::new().bytes(b"LNKS").u32(version).u32(0).u32(0);
	let mut entries = Vec::new();
	for (type_index, id, payload) in blocks {
		entries.push((*type_index, bytes.len() as u32, payload.len() as u32, *id));
		bytes = bytes.bytes(payload);
	}
	let table_offset = bytes.len() as u32;
	bytes = bytes.patch_u32(12, table_offset).u32(type_names.len() as u32);
	for name in type_names {
		bytes = bytes.sized_string(name);
	}
	bytes = bytes.u32(entries.len() as u32);
	for (type_index, offset, size, id) in entries {
		bytes = bytes.u32(type_index).u32(version).u32(offset).u32(size).i32(id);
	}
	bytes.finish()
}

fn link(token: i32) -> Vec<u8> {
	token.to_le_bytes().to_vec()
}

#[test]
fn links_resolve_by_block_id() {
	let raw = container(2, &["Leaf"], &[(0, 0, link(1)), (0, 1, link(-1))]);
	let doc = Document::decode(schema(), raw, &DecodeOptions::strict()).expect("decodes");
	let next = |id: u32| {
		doc.block(BlockId(id))
			.expect("block")
			.record
			.get(doc.schema(), "Next")
			.expect("next")
			.as_link()
			.expect("link")
			.block()
	};
	assert_eq!(next(0), Some(BlockId(1)));
	assert_eq!(next(1), None);
	assert_eq!(doc.roots(), &[BlockId(0)]);
}

#[test]
fn sentinel_depends_on_version() {
	let raw = container(1, &["Leaf"], &[(0, 1, link(2)), (0, 2, link(0))]);
	let doc = Document::decode(schema(), raw.clone(), &DecodeOptions::strict()).expect("old sentinel is zero");
	assert_eq!(doc.roots(), &[BlockId(0)]);

	let encoded = doc.encode(&EncodeOptions::default()).expect("encodes");
	assert_eq!(encoded, raw, "pre-threshold ids start at one");
}

#[test]
fn dangling_links_follow_the_policy() {
	let raw = container(2, &["Leaf"], &[(0, 0, link(9))]);
	let err = Document::decode(schema(), raw.clone(), &DecodeOptions::strict()).expect_err("dangling");
	assert!(matches!(err, CodecError::LinkUnresolved { index: 9 }));

	let doc = Document::decode(schema(), raw, &DecodeOptions::lenient()).expect("lenient decode");
	let next = doc.block(BlockId(0)).expect("block").record.get(doc.schema(), "Next").expect("next").clone();
	assert_eq!(next.as_link().and_then(|link| link.block()), None);
}

#[test]
fn mistyped_links_follow_the_policy() {
	let raw = container(2, &["Leaf", "Other"], &[(0, 0, link(1)), (1, 1, 5_u32.to_le_bytes().to_vec())]);
	let err = Document::decode(schema(), raw.clone(), &DecodeOptions::strict()).expect_err("mistyped");
	assert!(matches!(err, CodecError::LinkTypeMismatch { index: 1, .. }));

	let options = DecodeOptions {
		link_policy: LinkPolicy::Lenient,
		..DecodeOptions::strict()
	};
	Document::decode(schema(), raw, &options).expect("lenient links only");
}

#[test]
fn forward_conditions_surface_as_queue_imbalance() {
	// Read sees `Later` at its default and skips the link; resolution sees it set.
	let payload = LeBytes::new().u32(1).finish();
	let raw = container(2, &["Backwards"], &[(0, 0, payload)]);
	let options = DecodeOptions {
		check_block_sizes: false,
		..DecodeOptions::lenient()
	};
	let err = Document::decode(schema(), raw, &options).expect_err("imbalance is fatal in every mode");
	assert!(matches!(err, CodecError::LinkQueueImbalance { pushed: 0, popped: 1 }));
}

#[test]
fn duplicate_and_unknown_blocks_are_rejected() {
	let raw = container(2, &["Leaf"], &[(0, 3, link(-1)), (0, 3, link(-1))]);
	let err = Document::decode(schema(), raw, &DecodeOptions::strict()).expect_err("duplicate id");
	assert!(matches!(err, CodecError::DuplicateBlockId { id: 3 }));

	let raw = container(2, &["Ghost"], &[(0, 0, Vec::new())]);
	let err = Document::decode(schema(), raw, &DecodeOptions::strict()).expect_err("unknown type");
	assert!(matches!(err, CodecError::UnknownBlockType { type_name } if &*type_name == "Ghost"));

	let raw = container(2, &["Leaf"], &[(4, 0, link(-1))]);
	let err = Document::decode(schema(), raw, &DecodeOptions::strict()).expect_err("bad type index");
	assert!(matches!(err, CodecError::BadTypeIndex { type_index: 4, .. }));
}

#[test]
fn cyclic_refs_encode_once() {
	let schema = schema();
	let mut doc = Document::new(Arc::clone(&schema), 2, 0).expect("document");
	let a = doc.new_block("Leaf").expect("a");
	let b = doc.new_block("Leaf").expect("b");
	doc.set_link(a, "Next", Some(b)).expect("a -> b");
	doc.set_link(b, "Next", Some(a)).expect("b -> a");
	doc.set_roots(vec![a]).expect("roots");

	let plan = doc.plan_blocks().expect("plan");
	assert_eq!(plan.order, vec![a, b]);

	let other = doc.new_block("Other").expect("other");
	let err = doc.set_link(a, "Next", Some(other)).expect_err("declared target checked");
	assert!(matches!(err, CodecError::LinkTypeMismatch { .. }));

	let decoded = Document::decode(Arc::clone(&schema), doc.encode(&EncodeOptions::default()).expect("encodes"), &DecodeOptions::strict())
		.expect("decodes");
	assert_eq!(decoded.len(), 3);
	assert_eq!(decoded.roots(), &[BlockId(2)], "every block of a ref cycle is owned");
	assert_eq!(decoded.hash_block(BlockId(0)).expect("hash"), doc.hash_block(a).expect("hash"));
}

#[test]
fn decoded_ref_cycles_survive_re_encoding() {
	let raw = container(2, &["Leaf"], &[(0, 0, link(1)), (0, 1, link(0))]);
	let first = Document::decode(schema(), raw.clone(), &DecodeOptions::strict()).expect("decodes");
	assert_eq!(first.len(), 2);
	assert!(first.roots().is_empty());

	let encoded = first.encode(&EncodeOptions::default()).expect("encodes");
	let second = Document::decode(schema(), encoded.clone(), &DecodeOptions::strict()).expect("decodes again");
	assert_eq!(second.len(), first.len());
	assert_eq!(encoded, raw);
}

#[test]
fn rootless_formats_write_unreachable_blocks() {
	let schema = schema();
	let mut doc = Document::new(Arc::clone(&schema), 2, 0).expect("document");
	let lone = doc.new_block("Other").expect("lone");
	let a = doc.new_block("Leaf").expect("a");
	let b = doc.new_block("Leaf").expect("b");
	doc.set_link(a, "Next", Some(b)).expect("a -> b");
	doc.set_roots(vec![a]).expect("roots");

	let plan = doc.plan_blocks().expect("plan");
	assert_eq!(plan.order, vec![a, b, lone]);
	let names: Vec<&str> = plan.type_names.iter().map(|name| &**name).collect();
	assert_eq!(names, ["Leaf", "Other"]);
}

#[test]
fn long_ref_chains_plan_and_hash_without_recursion() {
	const LEN: usize = 200_000;
	let schema = schema();
	let mut doc = Document::new(Arc::clone(&schema), 2, 0).expect("document");
	let ids: Vec<BlockId> = (0..LEN).map(|_| doc.new_block("Leaf").expect("leaf")).collect();
	for pair in ids.windows(2) {
		doc.set_link(pair[0], "Next", Some(pair[1])).expect("link");
	}
	doc.set_roots(vec![ids[0]]).expect("roots");

	let plan = doc.plan_blocks().expect("plan");
	assert_eq!(plan.order, ids);

	let raw = doc.encode(&EncodeOptions::default()).expect("encodes");
	let decoded = Document::decode(Arc::clone(&schema), raw, &DecodeOptions::strict()).expect("decodes");
	assert_eq!(decoded.len(), LEN);
	assert_eq!(decoded.roots(), &[BlockId(0)]);

	let key = decoded.hash_block(BlockId(0)).expect("hash");
	assert_eq!(key.tokens().len(), LEN + 1);
	assert_eq!(key, doc.hash_block(ids[0]).expect("hash"));
}

#[test]
fn replace_block_redirects_links() {
	let schema = schema();
	let mut doc = Document::new(Arc::clone(&schema), 2, 0).expect("document");
	let a = doc.new_block("Leaf").expect("a");
	let b = doc.new_block("Leaf").expect("b");
	let c = doc.new_block("Leaf").expect("c");
	doc.set_link(a, "Next", Some(b)).expect("a -> b");
	doc.set_link(b, "Next", Some(a)).expect("b -> a");
	doc.set_roots(vec![b]).expect("roots");

	doc.replace_block(b, c).expect("redirect");
	let next = |id: BlockId| doc.block(id).expect("block").record.get(&schema, "Next").expect("next").as_link().and_then(|link| link.block());
	assert_eq!(next(a), Some(c));
	assert_eq!(next(b), Some(a));
	assert_eq!(doc.roots(), &[c]);
	assert_eq!(doc.plan_blocks().expect("plan").order, vec![c, a, b]);
}

#[test]
fn unlisted_ptr_targets_follow_the_encode_policy() {
	let schema = rooted_schema();
	let mut doc = Document::new(Arc::clone(&schema), 2, 0).expect("document");
	let pointer = doc.new_block("Pointer").expect("pointer");
	let leaf = doc.new_block("Leaf").expect("leaf");
	doc.set_link(pointer, "Target", Some(leaf)).expect("pointer -> leaf");
	doc.set_roots(vec![pointer]).expect("roots");

	let err = doc.encode(&EncodeOptions::default()).expect_err("ptr does not list its target");
	assert!(matches!(err, CodecError::LinkNotListed { block } if block == leaf.0));

	let lenient = EncodeOptions {
		link_policy: LinkPolicy::Lenient,
		..EncodeOptions::default()
	};
	let raw = doc.encode(&lenient).expect("lenient encode writes none");
	let decoded = Document::decode(schema, raw, &DecodeOptions::strict()).expect("decodes");
	assert_eq!(decoded.len(), 1);
	assert_eq!(decoded.roots(), &[BlockId(0)]);
	let target = decoded.block(BlockId(0)).expect("block").record.get(decoded.schema(), "Target").expect("target").clone();
	assert_eq!(target.as_link().and_then(|link| link.block()), None);
}
