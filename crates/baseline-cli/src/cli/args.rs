use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "baseline",
    version,
    about = "Resolve compliance profiles against a rule catalog into typed build plans"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Resolve a profile and write its build plan
    Resolve(ResolveArgs),
    /// Resolve a profile and report diagnostics only
    Validate(ValidateArgs),
    /// List profiles in the profiles directory
    Profiles(ProfilesArgs),
    Version,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Where catalog and profiles come from. Flags win over the config file.
#[derive(clap::Args, Clone, Debug)]
pub struct SourceArgs {
    #[arg(long, default_value = "baseline.yaml", env = "BASELINE_CONFIG")]
    pub config: PathBuf,

    /// Catalog file or directory (repeatable); replaces the configured list
    #[arg(long = "catalog")]
    pub catalog: Vec<PathBuf>,

    /// Directory of `*.profile` documents
    #[arg(long)]
    pub profiles_dir: Option<PathBuf>,
}

#[derive(Parser, Clone, Debug)]
pub struct ResolveArgs {
    /// Profile id (file stem of `<id>.profile`)
    pub profile: String,

    #[command(flatten)]
    pub source: SourceArgs,

    /// Write the plan here instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Diagnostics format (stderr)
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Treat warnings as failures
    #[arg(long)]
    pub deny_warnings: bool,
}

#[derive(Parser, Clone, Debug)]
pub struct ValidateArgs {
    pub profile: String,

    #[command(flatten)]
    pub source: SourceArgs,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[arg(long)]
    pub deny_warnings: bool,
}

#[derive(Parser, Clone, Debug)]
pub struct ProfilesArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_repeatable_catalog() {
        let cli = Cli::try_parse_from([
            "baseline",
            "resolve",
            "ospp",
            "--catalog",
            "a.yml",
            "--catalog",
            "b/",
            "--deny-warnings",
        ])
        .unwrap();
        match cli.cmd {
            Command::Resolve(args) => {
                assert_eq!(args.profile, "ospp");
                assert_eq!(args.source.catalog.len(), 2);
                assert!(args.deny_warnings);
                assert_eq!(args.format, OutputFormat::Text);
            }
            _ => panic!("expected resolve"),
        }
    }
}
