use std::path::PathBuf;

use blockdoc::codec::{Document, EncodeOptions, decode_bytes};
use tracing::info;

use crate::cmd::util::{decode_options, emit_json, load_schema};


#[derive(clap::Args)]
pub struct Args {
	pub schema: PathBuf,
	pub file: PathBuf,
	#[arg(long)]
	pub lenient: bool,
	#[arg(long)]
	pub json: bool,
}

/// Decode, re-encode and decode again, comparing the two object graphs.
///
/// Returns whether the root hashes of both decodes agree.
pub fn run(args: Args) -> blockdoc::codec::Result<bool> {
	let Args {
		schema,
		file,
		lenient,
		json,
	} = args;

	let schema = load_schema(&schema)?;
	let options = decode_options(lenient);
	let raw = std::fs::read(&file)?;
	let (compression, plain) = decode_bytes(raw.clone())?;
	let first = Document::decode(schema.clone(), raw, &options)?;

	let encode = EncodeOptions {
		link_policy: options.link_policy,
		compression,
	};
	let encoded = first.encode(&encode)?;
	let (_, replain) = decode_bytes(encoded.clone())?;
	let second = Document::decode(schema, encoded, &options)?;

	let roots_match = first.root_hashes()? == second.root_hashes()?;
	let report = CheckJson {
		path: file.display().to_string(),
		blocks_in: first.len(),
		blocks_out: second.len(),
		bytes_in: plain.len(),
		bytes_out: replain.len(),
		identical: plain == replain,
		roots_match,
	};
	info!(path = %report.path, identical = report.identical, roots_match, "checked file");

	if json {
		emit_json(&report);
	} else {
		println!("path: {}", report.path);
		println!("blocks: {} -> {}", report.blocks_in, report.blocks_out);
		println!("bytes: {} -> {}", report.bytes_in, report.bytes_out);
		println!("identical: {}", report.identical);
		println!("roots_match: {}", report.roots_match);
		println!("{}", if roots_match { "ok" } else { "FAILED" });
	}
	Ok(roots_match)
}

#[derive(serde::Serialize)]
struct CheckJson {
	path: String,
	blocks_in: usize,
	blocks_out: usize,
	bytes_in: usize,
	bytes_out: usize,
	identical: bool,
	roots_match: bool,
}
