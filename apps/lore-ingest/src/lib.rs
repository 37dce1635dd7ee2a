pub mod walker;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use lore_service::LoreService;
use lore_storage::db::Db;

#[derive(Debug, Parser)]
#[command(
	version = lore_cli::VERSION,
	rename_all = "kebab",
	styles = lore_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = lore_config::load(&args.config)?;
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let db = Db::connect(&config.storage.sqlite).await?;

	db.ensure_schema().await?;

	let corpus_root = PathBuf::from(&config.paths.corpus_root);
	let service = LoreService::new(config, db)?;
	let summary = walker::walk_corpus(&service, &corpus_root).await?;

	tracing::info!(
		ingested = summary.ingested,
		unchanged = summary.unchanged,
		skipped = summary.skipped,
		failed = summary.failed,
		"Corpus walk finished."
	);

	Ok(())
}
