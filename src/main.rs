//! CLI entry point for the find-sds tool.

use std::fmt::Write as _;
use std::io::{self, IsTerminal, Read};

use anyhow::{Context, Result};
use clap::Parser;
use find_sds_core::{
    BatchSummary, CasNumber, Diagnostics, FetchConfig, build_default_resolver_chain,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    // Read input: from positional args or stdin
    let raw_ids = if !args.cas_numbers.is_empty() {
        args.cas_numbers.clone()
    } else if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer.split_whitespace().map(str::to_string).collect()
    } else {
        Vec::new()
    };
    let ids: Vec<CasNumber> = raw_ids
        .into_iter()
        .filter_map(|raw| CasNumber::new(raw).ok())
        .collect();

    if ids.is_empty() {
        println!("List of CAS numbers is empty!");
        return Ok(());
    }

    std::fs::create_dir_all(&args.output_dir).with_context(|| {
        format!(
            "failed to create output directory {}",
            args.output_dir.display()
        )
    })?;

    let config = FetchConfig {
        concurrency: usize::from(args.concurrency),
        diagnostics: Diagnostics::new(args.debug),
        ..FetchConfig::default()
    };

    let token = CancellationToken::new();
    let interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; abandoning remaining lookups");
            interrupt.cancel();
        }
    });

    println!("Downloading missing SDS files. Please wait!");
    info!(count = ids.len(), output_dir = %args.output_dir.display(), "Starting lookup");

    let run = config
        .run(build_default_resolver_chain(), &args.output_dir, ids, token)
        .await?;

    if let Some(failure) = &run.failure {
        warn!(error = %failure, "Batch stopped dispatching early");
    }
    if run.cancelled {
        warn!("Batch was cancelled; unfinished CAS numbers are listed as missing");
    }

    print!("{}", render_summary(&run.summary(), args.debug));
    Ok(())
}

/// Human-readable end-of-run report.
fn render_summary(summary: &BatchSummary, debug_mode: bool) -> String {
    let mut out = String::new();
    if !summary.missing.is_empty() {
        let missing: Vec<&str> = summary.missing.iter().map(CasNumber::as_str).collect();
        let _ = writeln!(out, "\nStill missing SDS:\n{}", missing.join(", "));
    }
    let _ = writeln!(out, "\nSummary: ");
    let _ = writeln!(out, "\t{} SDS files are missing.", summary.missing_count());
    let _ = writeln!(out, "\t{} SDS files downloaded.", summary.resolved_count());

    if !debug_mode {
        let _ = writeln!(
            out,
            "\n\n(Optional): you can turn on debug mode (more error printing during search) using the following command:"
        );
        let _ = writeln!(out, "find-sds --debug <CAS>...\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn cas(value: &str) -> CasNumber {
        CasNumber::new(value).unwrap()
    }

    #[test]
    fn test_render_summary_lists_missing_and_counts() {
        let summary = BatchSummary {
            resolved: BTreeSet::from([cas("141-78-6")]),
            missing: BTreeSet::from([cas("00000-0-0"), cas("11111-1-1")]),
        };
        let text = render_summary(&summary, true);
        assert!(text.contains("Still missing SDS:\n00000-0-0, 11111-1-1"), "{text}");
        assert!(text.contains("\t2 SDS files are missing."), "{text}");
        assert!(text.contains("\t1 SDS files downloaded."), "{text}");
        assert!(!text.contains("debug mode"), "{text}");
    }

    #[test]
    fn test_render_summary_hint_without_debug() {
        let summary = BatchSummary {
            resolved: BTreeSet::from([cas("64-19-7")]),
            missing: BTreeSet::new(),
        };
        let text = render_summary(&summary, false);
        assert!(!text.contains("Still missing"), "{text}");
        assert!(text.contains("find-sds --debug"), "{text}");
    }
}
