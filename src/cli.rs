//! Command line interface.
//!
//! The binary is driven entirely by flags: which files to generate
//! (`--key`, `--req`, `--sign` or `--all`), whether existing output may be
//! replaced (`--overwrite`), and optional restrictions to named groups and
//! entities. At least one generation action must be requested.

use std::collections::HashSet;

use clap::Parser;

use crate::generator::Actions;

#[derive(Parser, Debug)]
#[command(
    name = "certsmith",
    version,
    about = "Generates RSA keys, certificate requests and signed certificates for the users in a configuration file",
    long_about = None
)]
pub struct Cli {
    /// Location of the configuration file.
    #[arg(long, default_value = "./config.json")]
    pub config: String,

    /// Location of the log file.
    #[arg(long, default_value = "./certsmith.log")]
    pub log: String,

    /// Location of the OpenSSL binary.
    #[arg(long, default_value = "/usr/bin/openssl")]
    pub openssl: String,

    /// Overwrite existing files.
    #[arg(long)]
    pub overwrite: bool,

    /// Generate keys, certificate requests and certificates.
    #[arg(short = 'a', long)]
    pub all: bool,

    /// Generate keys.
    #[arg(short = 'k', long)]
    pub key: bool,

    /// Generate certificate signing requests.
    #[arg(short = 'r', long)]
    pub req: bool,

    /// Sign certificate requests and generate certificates.
    #[arg(short = 's', long)]
    pub sign: bool,

    /// Process only these groups (comma separated names).
    #[arg(long, value_delimiter = ',')]
    pub group: Option<Vec<String>>,

    /// Process only these users and CAs (comma separated names).
    #[arg(long, value_delimiter = ',')]
    pub users: Option<Vec<String>>,

    /// Verbose logging.
    #[arg(short = 'v', long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Log only warning messages.
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

impl Cli {
    /// The requested generation actions.
    pub fn actions(&self) -> Actions {
        Actions {
            key: self.key,
            request: self.req,
            sign: self.sign,
            all: self.all,
            overwrite: self.overwrite,
        }
    }

    /// Log level derived from the verbosity flags.
    pub fn effective_log_level(&self) -> &str {
        if self.quiet {
            "warn"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }

    /// Group restriction, `None` when every group should be processed.
    pub fn group_filter(&self) -> Option<HashSet<String>> {
        self.group
            .as_ref()
            .map(|names| names.iter().cloned().collect())
    }

    /// Entity restriction, `None` when every entity should be processed.
    pub fn entity_filter(&self) -> Option<HashSet<String>> {
        self.users
            .as_ref()
            .map(|names| names.iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["certsmith"]);
        assert_eq!(cli.config, "./config.json");
        assert_eq!(cli.log, "./certsmith.log");
        assert_eq!(cli.openssl, "/usr/bin/openssl");
        assert!(!cli.actions().any());
        assert!(cli.group_filter().is_none());
        assert_eq!(cli.effective_log_level(), "info");
    }

    #[test]
    fn test_action_flags() {
        let cli = Cli::parse_from(["certsmith", "-k", "-r"]);
        let actions = cli.actions();
        assert!(actions.wants_key());
        assert!(actions.wants_request());
        assert!(!actions.wants_sign());
    }

    #[test]
    fn test_all_implies_every_action() {
        let cli = Cli::parse_from(["certsmith", "--all"]);
        let actions = cli.actions();
        assert!(actions.wants_key());
        assert!(actions.wants_request());
        assert!(actions.wants_sign());
    }

    #[test]
    fn test_group_list_is_split_on_commas() {
        let cli = Cli::parse_from(["certsmith", "-a", "--group", "servers,clients"]);
        let filter = cli.group_filter().unwrap();
        assert!(filter.contains("servers"));
        assert!(filter.contains("clients"));
        assert_eq!(filter.len(), 2);
    }

    #[test]
    fn test_quiet_and_verbose_levels() {
        let cli = Cli::parse_from(["certsmith", "-a", "-q"]);
        assert_eq!(cli.effective_log_level(), "warn");
        let cli = Cli::parse_from(["certsmith", "-a", "-v"]);
        assert_eq!(cli.effective_log_level(), "debug");
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["certsmith", "-a", "-q", "-v"]).is_err());
    }

    #[test]
    fn test_overwrite_flag() {
        let cli = Cli::parse_from(["certsmith", "-a", "--overwrite"]);
        assert!(cli.actions().overwrite);
    }
}
