use anyhow::Result;
use automator::cli::App;

#[tokio::main]
async fn main() -> Result<()> {
    let args = automator::cli::Args::parse_args();
    let mut app = App::from_args(&args)?;

    app.run(args).await?;

    Ok(())
}
