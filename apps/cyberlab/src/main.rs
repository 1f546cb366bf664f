use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = cyberlab::Args::parse();

	cyberlab::run(args).await
}
