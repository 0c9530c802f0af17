#![allow(missing_docs)]

mod cmd;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "blockdoc")]
#[command(about = "Inspect, validate and rewrite schema-described block files")]
struct Cli {
	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand)]
enum Command {
	Info(cmd::info::Args),
	Dump(cmd::dump::Args),
	Check(cmd::check::Args),
	Rewrite(cmd::rewrite::Args),
	Schema(cmd::schema::Args),
}

fn main() {
	if let Err(err) = run() {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn run() -> blockdoc::codec::Result<()> {
	init_tracing();
	let cli = Cli::parse();
	match cli.command {
		Command::Info(args) => cmd::info::run(args),
		Command::Dump(args) => cmd::dump::run(args),
		Command::Check(args) => {
			if !cmd::check::run(args)? {
				std::process::exit(1);
			}
			Ok(())
		}
		Command::Rewrite(args) => cmd::rewrite::run(args),
		Command::Schema(args) => cmd::schema::run(args),
	}
}

fn init_tracing() {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).init();
}
