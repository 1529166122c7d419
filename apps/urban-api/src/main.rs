use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = urban_api::Args::parse();

	urban_api::run(args).await
}
