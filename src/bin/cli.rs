// src/bin/cli.rs
use color_eyre::eyre::{Result, eyre};
use otto_fmt::cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let params = cli::parse_args().map_err(|e| eyre!("{e}"))?;
    cli::run(params).map_err(|e| eyre!("{e}"))?;
    Ok(())
}
