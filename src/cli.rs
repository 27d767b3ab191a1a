use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "keysweep")]
#[command(about = "Scans giveaway pages and social posts for fresh game keys", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the adaptive scan loop until interrupted
    Run,
    /// Run a single scan cycle and print what was found
    Once,
    /// Report whether a key has been seen before
    Check(KeyArgs),
    /// Mark a discovered key as claimed
    Claim(KeyArgs),
}

#[derive(clap::Args, Debug)]
pub struct KeyArgs {
    /// Key exactly as discovered, e.g. ABCDE-FGHIJ-KLMNO
    pub key: String,
}
