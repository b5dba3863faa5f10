mod cli;
mod config;
mod error;
mod render;
mod usage;

use anyhow::Result;

use cli::Cli;

fn main() -> Result<()> {
    cli::init_logging();
    let cli = Cli::parse_lenient();

    if cli.is_mutation() {
        cli::configure::run(&cli)
    } else {
        cli::menu::run()
    }
}
