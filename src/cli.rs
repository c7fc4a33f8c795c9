//! Command-line arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Runs the page-size engine against saved pages.
#[derive(Parser, Debug)]
#[command(name = "max-page-size")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Engine configuration (JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Site registry to use instead of the built-in one (JSON)
    #[arg(long, global = true)]
    pub registry: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the page pipeline on a saved HTML file and print the outcome
    Detect {
        /// URL the page was saved from
        #[arg(long)]
        url: String,

        /// Saved HTML document
        file: PathBuf,

        /// Extension settings (JSON object); defaults apply when omitted
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Virtual time to keep the page alive after load, in milliseconds
        #[arg(long, default_value_t = 6000)]
        wait_ms: u64,
    },

    /// List load-more candidates on a saved HTML file
    LoadMore {
        #[arg(long)]
        url: String,

        file: PathBuf,
    },

    /// List the known-site registry
    Sites,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_arguments() {
        let args = Args::try_parse_from([
            "max-page-size",
            "detect",
            "--url",
            "https://www.example.com/list",
            "page.html",
        ])
        .unwrap();
        match args.command {
            Command::Detect {
                url,
                file,
                settings,
                wait_ms,
            } => {
                assert_eq!(url, "https://www.example.com/list");
                assert_eq!(file, PathBuf::from("page.html"));
                assert!(settings.is_none());
                assert_eq!(wait_ms, 6000);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from(["max-page-size", "sites", "-vv", "--registry", "r.json"]).unwrap();
        assert_eq!(args.verbose, 2);
        assert_eq!(args.registry, Some(PathBuf::from("r.json")));
    }

    #[test]
    fn test_load_more_requires_url() {
        assert!(Args::try_parse_from(["max-page-size", "load-more", "page.html"]).is_err());
    }
}
