use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "syncbot")]
#[command(version, about = "Syncbot - mirror messages between a Discord channel and a GroupMe group")]
pub struct Cli {
    /// Config file to load (and re-read on !reload)
    #[arg(short, long, env = "SYNCBOT_CONFIG", default_value = "config.json")]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Also write daily-rotated logs into this directory
    #[arg(long, env = "SYNCBOT_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}
