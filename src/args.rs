use clap::Parser;
use proctor_eyes::config::AppConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Camera Index (default 0)
    #[arg(short, long, default_value_t = 0)]
    pub cam_index: u32,

    /// Configuration file; defaults apply when it is missing
    #[arg(long, default_value = AppConfig::DEFAULT_PATH)]
    pub config: PathBuf,

    /// Write the default configuration to the config path and exit
    #[arg(long)]
    pub write_config: bool,

    /// List available cameras
    #[arg(long)]
    pub list: bool,
}
