use std::path::PathBuf;

use blockdoc::codec::{format_version, inspect_path};

use crate::cmd::util::{emit_json, load_schema};

#[derive(clap::Args)]
pub struct Args {
	pub schema: PathBuf,
	pub file: PathBuf,
	#[arg(long)]
	pub json: bool,
}

/// Print container metadata read from the prefix and block table only.
pub fn run(args: Args) -> blockdoc::codec::Result<()> {
	let Args { schema, file, json } = args;
	let schema = load_schema(&schema)?;
	let info = inspect_path(&schema, &file)?;
	let format = schema.format();

	if json {
		let payload = InfoJson {
			path: file.display().to_string(),
			format: format.name.to_string(),
			version: format_version(info.header.version),
			user_version: info.header.user_version,
			compression: info.compression.as_str(),
			block_count: info.entries.len(),
			types: info
				.type_counts()
				.into_iter()
				.map(|(name, count)| TypeCountJson {
					type_name: name.to_owned(),
					count,
				})
				.collect(),
		};
		emit_json(&payload);
		return Ok(());
	}

	println!("path: {}", file.display());
	println!("format: {}", format.name);
	println!("version: {}", format_version(info.header.version));
	println!("user_version: {}", info.header.user_version);
	println!("compression: {}", info.compression.as_str());
	println!("blocks: {}", info.entries.len());
	println!();
	println!("type\tcount");
	for (name, count) in info.type_counts() {
		println!("{name}\t{count}");
	}
	Ok(())
}

#[derive(serde::Serialize)]
struct TypeCountJson {
	#[serde(rename = "type")]
	type_name: String,
	count: usize,
}

#[derive(serde::Serialize)]
struct InfoJson {
	path: String,
	format: String,
	version: String,
	user_version: u32,
	compression: &'static str,
	block_count: usize,
	types: Vec<TypeCountJson>,
}
