use std::path::PathBuf;

use blockdoc::codec::{BlockId, Document, RecordDisplay, format_version};
use serde_json::Value as JsonValue;

use crate::cmd::util::{decode_options, emit_json, load_schema, record_json};


#[derive(clap::Args)]
pub struct Args {
	pub schema: PathBuf,
	pub file: PathBuf,
	/// Only render the block at this arena index.
	#[arg(long)]
	pub block: Option<u32>,
	#[arg(long)]
	pub lenient: bool,
	#[arg(long)]
	pub json: bool,
}

/// Decode a file and render its header, blocks, footer and roots.
pub fn run(args: Args) -> blockdoc::codec::Result<()> {
	let Args {
		schema,
		file,
		block,
		lenient,
		json,
	} = args;

	let schema = load_schema(&schema)?;
	let doc = Document::open(schema, &file, &decode_options(lenient))?;
	let selected: Vec<BlockId> = match block {
		Some(index) => {
			doc.block(BlockId(index))?;
			vec![BlockId(index)]
		}
		None => doc.blocks().map(|(id, _)| id).collect(),
	};

	if json {
		return emit_dump_json(&doc, &file, &selected, block.is_none());
	}

	let schema = doc.schema();
	println!("path: {}", file.display());
	println!("version: {}", format_version(doc.version()));
	println!("user_version: {}", doc.user_version());
	println!("compression: {}", doc.compression().as_str());
	if block.is_none()
		&& let Some(header) = doc.header()
	{
		println!();
		println!("header: {}", RecordDisplay::new(schema, header, doc.versions()));
	}
	for id in &selected {
		println!();
		println!("block {}: {}", id.0, RecordDisplay::new(schema, &doc.block(*id)?.record, doc.block_versions(*id)?));
	}
	if block.is_none() {
		if let Some(footer) = doc.footer() {
			println!();
			println!("footer: {}", RecordDisplay::new(schema, footer, doc.versions()));
		}
		println!();
		let roots: Vec<String> = doc.roots().iter().map(|root| format!("#{}", root.0)).collect();
		println!("roots: {}", roots.join(" "));
	}
	Ok(())
}

fn emit_dump_json(doc: &Document, file: &std::path::Path, selected: &[BlockId], whole: bool) -> blockdoc::codec::Result<()> {
	let schema = doc.schema();
	let mut blocks = Vec::with_capacity(selected.len());
	for id in selected {
		let block = doc.block(*id)?;
		blocks.push(BlockJson {
			index: id.0,
			type_name: doc.block_type_name(*id)?.to_owned(),
			version: format_version(block.version),
			record: record_json(schema, &block.record, doc.block_versions(*id)?),
		});
	}

	let payload = DumpJson {
		path: file.display().to_string(),
		format: schema.format().name.to_string(),
		version: format_version(doc.version()),
		user_version: doc.user_version(),
		compression: doc.compression().as_str(),
		header: doc.header().filter(|_| whole).map(|header| record_json(schema, header, doc.versions())),
		blocks,
		footer: doc.footer().filter(|_| whole).map(|footer| record_json(schema, footer, doc.versions())),
		roots: if whole { doc.roots().iter().map(|root| root.0).collect() } else { Vec::new() },
	};
	emit_json(&payload);
	Ok(())
}

#[derive(serde::Serialize)]
struct BlockJson {
	index: u32,
	#[serde(rename = "type")]
	type_name: String,
	version: String,
	record: JsonValue,
}

#[derive(serde::Serialize)]
struct DumpJson {
	path: String,
	format: String,
	version: String,
	user_version: u32,
	compression: &'static str,
	header: Option<JsonValue>,
	blocks: Vec<BlockJson>,
	footer: Option<JsonValue>,
	roots: Vec<u32>,
}
