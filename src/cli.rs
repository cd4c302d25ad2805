use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "shopdl")]
#[command(version)]
#[command(about = "Shop-channel package installer", long_about = None)]
#[command(after_help = "Examples:\n  \
  shopdl -c osc.cfg -d /mnt/sd              install the configured payload onto /mnt/sd\n  \
  shopdl --nand ./nand -d out               read the blob from the caller title's data directory\n  \
  shopdl --broadcast wc24recv.mbx -d out    install a title announced in a mailbox capture")]
pub struct Cli {
    /// Install root for extracted files
    #[arg(short = 'd', long = "dest", value_name = "DIR", default_value = ".")]
    pub dest: PathBuf,

    /// Root of the internal-flash layout holding staged titles
    #[arg(long = "nand", value_name = "DIR", default_value = ".")]
    pub nand: PathBuf,

    /// Configuration blob written by the shop frontend
    /// (default: the caller title's data/osc.cfg under --nand)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Scan a broadcast mailbox capture for the payload instead of
    /// reading configuration keys
    #[arg(long = "broadcast", value_name = "FILE")]
    pub broadcast: Option<PathBuf>,

    /// Leave the consumed payload in place after a successful install
    #[arg(long = "keep-source")]
    pub keep_source: bool,

    /// Exit immediately on failure instead of waiting for acknowledgment
    #[arg(long = "no-wait")]
    pub no_wait: bool,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    pub fn is_quiet(&self) -> bool {
        self.quiet > 0
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }
}
