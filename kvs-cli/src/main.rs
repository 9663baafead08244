#![allow(unused)]

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use kvscli::command::{self, run_pack};
use kvscli::config::{ConfigLoad, DEFAULT_CONFIG_PATH};
use kvscli::trace;

#[derive(Debug, Parser)]
#[command(version)]
#[command(author, about)]
pub struct Args {
    #[clap(short, long, help = "debug model")]
    debug: bool,

    /// Configuration file path, default 'config/kvscli.toml'
    #[clap(short = 'c', long = "config", help = "Configuration file path", default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    #[clap(short = 'l', long, default_value = "info")]
    log_level: String,

    #[clap(long, help = "Directory holding the store files (overrides config)")]
    base_dir: Option<PathBuf>,

    /// The subcommand to run.
    #[clap(subcommand)]
    cmd: command::Command,
}

/// CMD like:
///     kvscli set settings name Santiago
///     kvscli get settings name
///     kvscli watch session --ttl
///
#[tokio::main]
pub async fn main() -> Result<()> {
    eprintln!();
    eprintln!("██  ██  █    █  ███");
    eprintln!("██ ██   ██  ██  █");
    eprintln!("███      ████   ███");
    eprintln!("██ ██     ██      █");
    eprintln!("██  ██    ██    ███  KV Preference Store CLI");
    eprintln!();

    let args = Args::parse();
    if args.debug {
        println!("{:?}", args);
    }

    let log_dir = format!(
        "{}/.kvscli",
        std::env::var("HOME").unwrap_or_else(|_| ".".to_string())
    );
    let _guard = trace::init_logging(std::path::Path::new(&log_dir), &args.log_level, args.debug)?;
    info!("kvscli start args: {:?}", &args);

    let mut cfg = match ConfigLoad::new(args.config.as_ref()) {
        Ok(c) => c,
        Err(_) => ConfigLoad::default(),
    };
    if let Some(dir) = args.base_dir {
        cfg.set_base_dir(dir);
    }
    info!("kvscli start config: {:?}", &cfg);

    run_pack(args.cmd, &cfg).await?;

    Ok(())
}
