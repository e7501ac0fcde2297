// crates.io
use clap::Parser;
// self
use hybrank_eval::Args;

fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = Args::parse();
	hybrank_eval::run(args)
}
