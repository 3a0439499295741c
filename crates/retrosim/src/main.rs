use anyhow::{Context, Result};
use retrosim::cli::{self, Command};

fn main() -> Result<()> {
    env_logger::init();

    let (program, config) = match cli::parse_args(std::env::args().skip(1))? {
        Command::Help => {
            println!("{}", cli::USAGE);
            return Ok(());
        }
        Command::Run { program, config } => (program, config),
    };

    log::info!("running program '{}'", program.display());
    let image = std::fs::read(&program)
        .with_context(|| format!("failed to read program {}", program.display()))?;

    let report = retrosim::run(&image, config)?;
    print!("{}", report);
    Ok(())
}
