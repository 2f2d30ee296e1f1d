use anyhow::Result;

fn main() -> Result<()> {
    statarb::cli::run()?;
    Ok(())
}
