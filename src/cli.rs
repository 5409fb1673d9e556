//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use find_sds_core::DEFAULT_CONCURRENCY;

/// Find and download safety data sheets by CAS number.
///
/// Supplier sites are searched in a fixed priority order and the first
/// confirmed sheet is saved as `<CAS>-SDS.pdf`. Sheets already present in the
/// output directory are not fetched again.
#[derive(Parser, Debug)]
#[command(name = "find-sds")]
#[command(author, version, about)]
pub struct Args {
    /// CAS numbers to look up (read from stdin when none are given)
    #[arg(value_name = "CAS")]
    pub cas_numbers: Vec<String>,

    /// Directory the sheets are saved in
    #[arg(short = 'o', long, default_value = "SDS")]
    pub output_dir: PathBuf,

    /// Maximum CAS numbers processed at once (1-100)
    #[arg(short = 'c', long, default_value_t = DEFAULT_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: u8,

    /// Report why each provider came up empty
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["find-sds"]).unwrap();
        assert!(args.cas_numbers.is_empty());
        assert_eq!(args.output_dir, PathBuf::from("SDS"));
        assert_eq!(args.concurrency, 10); // DEFAULT_CONCURRENCY
        assert!(!args.debug);
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
    }

    #[test]
    fn test_cli_positional_cas_numbers() {
        let args = Args::try_parse_from(["find-sds", "64-19-7", "141-78-6"]).unwrap();
        assert_eq!(args.cas_numbers, vec!["64-19-7", "141-78-6"]);
    }

    #[test]
    fn test_cli_debug_flag() {
        assert!(Args::try_parse_from(["find-sds", "-d"]).unwrap().debug);
        assert!(Args::try_parse_from(["find-sds", "--debug"]).unwrap().debug);
    }

    #[test]
    fn test_cli_output_dir_flag() {
        let args = Args::try_parse_from(["find-sds", "-o", "/tmp/sheets", "64-19-7"]).unwrap();
        assert_eq!(args.output_dir, PathBuf::from("/tmp/sheets"));
        assert_eq!(args.cas_numbers, vec!["64-19-7"]);
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["find-sds", "-v"]).unwrap();
        assert_eq!(args.verbose, 1);

        let args = Args::try_parse_from(["find-sds", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let args = Args::try_parse_from(["find-sds", "--quiet"]).unwrap();
        assert!(args.quiet);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        // --help causes early exit, so we check it returns an error with Help kind
        let err = Args::try_parse_from(["find-sds", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let err = Args::try_parse_from(["find-sds", "--invalid-flag"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_cli_concurrency_bounds() {
        assert_eq!(Args::try_parse_from(["find-sds", "-c", "1"]).unwrap().concurrency, 1);
        assert_eq!(
            Args::try_parse_from(["find-sds", "--concurrency", "100"])
                .unwrap()
                .concurrency,
            100
        );
    }

    #[test]
    fn test_cli_concurrency_zero_rejected() {
        let err = Args::try_parse_from(["find-sds", "-c", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_concurrency_over_max_rejected() {
        let err = Args::try_parse_from(["find-sds", "-c", "101"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
