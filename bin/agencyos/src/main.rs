//! AgencyOS CLI
//!
//! Serves content-managed pages composed of typed blocks.
//!
//! This is the binary entry point. The library functionality is in `lib.rs`.

use std::path::PathBuf;

use agencyos::cmd::resolve::OutputFormat;
use clap::Parser;
use color_eyre::eyre::Result;

/// Command-line interface for AgencyOS.
#[derive(Parser)]
#[command(
    name = "agencyos",
    version,
    about = "Content-block resolution and page rendering for the AgencyOS portal"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(clap::Subcommand)]
enum Commands {
    /// Serve pages over HTTP
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 3000)]
        port: u16,
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Serve content from a fixture directory instead of the CMS
        #[arg(long)]
        fixtures: Option<PathBuf>,
    },
    /// Resolve one page and print it
    Resolve {
        /// Page permalink (e.g., /about)
        permalink: String,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
        /// Read content from a fixture directory instead of the CMS
        #[arg(long)]
        fixtures: Option<PathBuf>,
    },
    /// Validate configuration and content fixtures
    Check {
        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
        /// Also resolve every page in a fixture directory
        #[arg(long)]
        fixtures: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    agencyos::init_tracing(cli.verbose);

    match cli.command {
        Commands::Serve {
            port,
            host,
            fixtures,
        } => {
            agencyos::cmd::serve::run(&cli.config, &host, port, fixtures.as_deref()).await?;
        }
        Commands::Resolve {
            permalink,
            format,
            fixtures,
        } => {
            agencyos::cmd::resolve::run(&cli.config, &permalink, format, fixtures.as_deref())
                .await?;
        }
        Commands::Check { strict, fixtures } => {
            agencyos::cmd::check::run(&cli.config, strict, fixtures.as_deref()).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn test_cli_serve_defaults() {
        let cli = Cli::parse_from(["agencyos", "serve"]);

        assert_eq!(cli.config, PathBuf::from("config.toml"));
        assert_eq!(cli.verbose, 0);

        match cli.command {
            Commands::Serve {
                port,
                host,
                fixtures,
            } => {
                assert_eq!(port, 3000);
                assert_eq!(host, "127.0.0.1");
                assert!(fixtures.is_none());
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_serve_with_options() {
        let cli = Cli::parse_from([
            "agencyos",
            "serve",
            "--port",
            "8080",
            "--host",
            "0.0.0.0",
            "--fixtures",
            "demo/content",
        ]);

        match cli.command {
            Commands::Serve {
                port,
                host,
                fixtures,
            } => {
                assert_eq!(port, 8080);
                assert_eq!(host, "0.0.0.0");
                assert_eq!(fixtures, Some(PathBuf::from("demo/content")));
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_resolve_command_parsing() {
        let cli = Cli::parse_from(["agencyos", "resolve", "/about", "--format", "html"]);

        match cli.command {
            Commands::Resolve {
                permalink,
                format,
                fixtures,
            } => {
                assert_eq!(permalink, "/about");
                assert_eq!(format, OutputFormat::Html);
                assert!(fixtures.is_none());
            }
            _ => panic!("Expected Resolve command"),
        }
    }

    #[test]
    fn test_cli_resolve_defaults_to_json() {
        let cli = Cli::parse_from(["agencyos", "resolve", "/"]);

        match cli.command {
            Commands::Resolve { format, .. } => assert_eq!(format, OutputFormat::Json),
            _ => panic!("Expected Resolve command"),
        }
    }

    #[test]
    fn test_cli_resolve_rejects_unknown_format() {
        let result = Cli::try_parse_from(["agencyos", "resolve", "/", "--format", "xml"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_check_command_parsing() {
        let cli = Cli::parse_from(["agencyos", "check", "--strict"]);

        match cli.command {
            Commands::Check { strict, fixtures } => {
                assert!(strict);
                assert!(fixtures.is_none());
            }
            _ => panic!("Expected Check command"),
        }
    }

    #[test]
    fn test_cli_verbosity_flags() {
        let cli = Cli::parse_from(["agencyos", "-vvv", "serve"]);
        assert_eq!(cli.verbose, 3);
    }

    #[test]
    fn test_cli_custom_config_path() {
        let cli = Cli::parse_from(["agencyos", "--config", "site.toml", "check"]);
        assert_eq!(cli.config, PathBuf::from("site.toml"));
    }
}
