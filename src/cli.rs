use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "reelgrab")]
#[command(author, version, about = "Telegram bot that fetches Instagram, TikTok and YouTube Shorts media", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot (default)
    Run,

    /// Resolve and download one link to a local file, without Telegram
    Fetch {
        /// Instagram, TikTok or YouTube Shorts link
        url: String,

        /// Directory for the downloaded file
        #[arg(short, long, default_value = ".")]
        output_dir: String,
    },

    /// List links waiting for a retry
    Pending,

    /// Drop a pending link
    Forget {
        /// Link exactly as stored
        url: String,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
