use clap::Parser;

mod cli;

fn main() -> anyhow::Result<()> {
    let options = cli::DemoOptions::parse();

    let level = if options.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    cli::run(&options)
}
