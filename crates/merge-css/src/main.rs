use clap::Parser;
use merge_css::cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    merge_css::init(cli.verbose);

    cli.run()?;
    Ok(())
}
