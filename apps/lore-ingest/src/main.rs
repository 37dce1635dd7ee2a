use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = lore_ingest::Args::parse();

	lore_ingest::run(args).await
}
