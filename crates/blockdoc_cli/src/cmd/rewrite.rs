use std::path::PathBuf;

use blockdoc::codec::{Compression, Document, EncodeOptions};

use crate::cmd::util::{decode_options, load_schema};

#[derive(clap::Args)]
pub struct Args {
	pub schema: PathBuf,
	pub input: PathBuf,
	pub output: PathBuf,
	#[arg(long)]
	pub lenient: bool,
	/// Compress the output with zstd.
	#[arg(long)]
	pub zstd: bool,
}

/// Decode `input` and write it back out in dependency order.
pub fn run(args: Args) -> blockdoc::codec::Result<()> {
	let Args {
		schema,
		input,
		output,
		lenient,
		zstd,
	} = args;

	let schema = load_schema(&schema)?;
	let options = decode_options(lenient);
	let doc = Document::open(schema, &input, &options)?;
	let encode = EncodeOptions {
		link_policy: options.link_policy,
		compression: if zstd { Compression::Zstd } else { Compression::None },
	};
	let bytes = doc.encode(&encode)?;
	std::fs::write(&output, &bytes)?;

	let blocks = doc.plan_blocks()?.order.len();
	println!("wrote {} blocks ({} bytes) to {}", blocks, bytes.len(), output.display());
	Ok(())
}
