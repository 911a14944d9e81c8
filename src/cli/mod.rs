pub mod output;
pub mod progress;
mod runner;

use clap::{Parser, Subcommand};

pub use runner::run_command;

#[derive(Parser)]
#[command(
    name = "waymark",
    version,
    about = "Deep-link and shared-file dispatch for a mapping application",
    long_about = "Waymark decodes API deep links (om://, mapsme://, ...) into map actions \
                  and imports shared KML, KMZ and GPX files into bookmark collections.\n\n\
                  Map actions are recorded rather than performed, which makes the CLI a \
                  convenient way to check what a link would do."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decode a deep link and show what it carries
    Parse {
        /// The deep link, e.g. "om://map?ll=55.75,37.62&n=Moscow"
        uri: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run a request through the processor chain and list the resulting map actions
    Dispatch {
        /// Deep link or file reference
        uri: String,
        /// Treat the input as a shared resource instead of a viewed URI
        #[arg(long)]
        send: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import a KML, KMZ or GPX file into the bookmark store
    Import {
        /// Path or file:// URL of the file
        file: String,
        /// Suppress progress output
        #[arg(short, long)]
        quiet: bool,
    },
    /// List imported bookmark collections
    Bookmarks {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the active configuration
    Config {
        /// Print config path only
        #[arg(long)]
        path: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_requires_a_command() {
        assert!(Cli::try_parse_from(["waymark"]).is_err());
    }

    #[test]
    fn cli_parses_parse() {
        let cli = Cli::parse_from(["waymark", "parse", "om://map?ll=1,2"]);
        if let Commands::Parse { uri, json } = cli.command {
            assert_eq!(uri, "om://map?ll=1,2");
            assert!(!json);
        } else {
            panic!("Expected Parse command");
        }
    }

    #[test]
    fn cli_parses_dispatch_send_json() {
        let cli = Cli::parse_from(["waymark", "dispatch", "--send", "--json", "/tmp/a.gpx"]);
        assert!(matches!(
            cli.command,
            Commands::Dispatch {
                send: true,
                json: true,
                ..
            }
        ));
    }

    #[test]
    fn cli_parses_import_quiet() {
        let cli = Cli::parse_from(["waymark", "import", "-q", "/tmp/walk.kmz"]);
        if let Commands::Import { file, quiet } = cli.command {
            assert_eq!(file, "/tmp/walk.kmz");
            assert!(quiet);
        } else {
            panic!("Expected Import command");
        }
    }

    #[test]
    fn cli_parses_bookmarks_json() {
        let cli = Cli::parse_from(["waymark", "bookmarks", "--json"]);
        assert!(matches!(cli.command, Commands::Bookmarks { json: true }));
    }

    #[test]
    fn cli_parses_config_path() {
        let cli = Cli::parse_from(["waymark", "config", "--path"]);
        assert!(matches!(cli.command, Commands::Config { path: true }));
    }
}
