use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::debug;
use minipack::{
    compiler::Compiler,
    config::Config,
    loaders::LoaderRegistry,
    plugin::{BuildLogPlugin, Plugin},
};

#[derive(Debug, Parser)]
#[command(name = "minipack", version, about = "Minimal module bundler")]
struct Cli {
    /// Configuration file, resolved against the current directory.
    #[arg(long, default_value = "minipack.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let root = std::env::current_dir().context("cannot determine current directory")?;
    debug!("project root: {}", root.display());

    let config_path = root.join(&cli.config);
    let config = Config::load(&config_path)?;

    let registry = LoaderRegistry::with_builtins();
    let plugins: Vec<Box<dyn Plugin>> = vec![Box::new(BuildLogPlugin)];

    let mut compiler = Compiler::new(config, root, registry, &plugins)?;
    let output_path = compiler.run()?;

    println!("{}", output_path.display());
    Ok(())
}

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}
