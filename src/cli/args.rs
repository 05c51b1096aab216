// ABOUTME: Command line argument definitions and parsing using Clap
// ABOUTME: Defines the main CLI structure and subcommands for automator

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "automator")]
#[command(about = "Inspect and validate declarative task descriptors")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Path to configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Disable colored output")]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate the structure of a descriptor file
    Validate {
        #[arg(help = "Path to descriptor file (JSON or YAML)")]
        descriptor: PathBuf,

        #[arg(
            short,
            long = "known",
            value_delimiter = ',',
            help = "Task types that must cover every task in the descriptor"
        )]
        known: Vec<String>,
    },

    /// Print the task tree of a descriptor file
    Tree {
        #[arg(help = "Path to descriptor file (JSON or YAML)")]
        descriptor: PathBuf,

        #[arg(long, help = "Print the outline as JSON")]
        json: bool,
    },

    /// Write a provisioning descriptor skeleton
    Init {
        #[arg(help = "Title of the collaboration space")]
        title: String,

        #[arg(short, long, help = "Output file", default_value = "descriptor.yaml")]
        output: PathBuf,
    },
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_validate_with_known_types() {
        let args = Args::try_parse_from([
            "automator",
            "validate",
            "collab.yaml",
            "--known",
            "collab,nav",
            "--known",
            "storage",
        ])
        .unwrap();

        match args.command {
            Commands::Validate { descriptor, known } => {
                assert_eq!(descriptor, PathBuf::from("collab.yaml"));
                assert_eq!(known, vec!["collab", "nav", "storage"]);
            }
            _ => panic!("expected validate command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let args =
            Args::try_parse_from(["automator", "tree", "collab.json", "--json", "-v"]).unwrap();
        assert!(args.verbose);
        assert!(matches!(args.command, Commands::Tree { json: true, .. }));
    }
}
