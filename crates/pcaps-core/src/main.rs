//! getpcaps - display the capabilities of running processes
//!
//! Prints one line per pid:
//!
//! ```text
//! Capabilities for `1234': chown,kill=ep
//! ```
//!
//! A pid that cannot be queried is reported on stderr and the remaining
//! pids are still processed.

use clap::Parser;
use pcaps_common::{format_error_human, Error, OutputFormat, StructuredError};
use pcaps_core::batch::{query_batch_parallel, summarize, PidReport};
use pcaps_core::caps::TextCodec;
use pcaps_core::collect::{open_source, SourceKind};
use pcaps_core::config::{QueryConfig, QueryOverrides};
use pcaps_core::exit_codes::ExitCode;
use pcaps_core::log_event;
use pcaps_core::logging::{
    event_names, init_logging, truncate_for_log, LogConfig, LogContext, LogFormat, LogLevel,
    Stage,
};
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

/// Display the capability sets of running processes
#[derive(Parser, Debug)]
#[command(name = "getpcaps")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Process ids to inspect
    #[arg(
        value_name = "PID",
        allow_negative_numbers = true,
        required_unless_present_any = ["list_names", "canonicalize"]
    )]
    pids: Vec<String>,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Capability backend [env: PCAPS_SOURCE]
    #[arg(long, value_enum)]
    source: Option<SourceKind>,

    /// procfs mount for the procfs backend [env: PCAPS_PROC_ROOT]
    #[arg(long, value_name = "DIR")]
    proc_root: Option<PathBuf>,

    /// Query up to N pids concurrently [env: PCAPS_JOBS]
    #[arg(long, short = 'j', value_name = "N")]
    jobs: Option<usize>,

    /// Print the known capability names and exit
    #[arg(long, conflicts_with_all = ["pids", "canonicalize"])]
    list_names: bool,

    /// Print the canonical form of capability TEXT and exit
    #[arg(long, value_name = "TEXT", conflicts_with = "pids", allow_hyphen_values = true)]
    canonicalize: Option<String>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Log format on stderr [env: PCAPS_LOG_FORMAT]
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,

    /// Disable colored error output
    #[arg(long)]
    no_color: bool,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() {
                ExitCode::ArgsError
            } else {
                ExitCode::Clean
            };
            let _ = err.print();
            std::process::exit(code.as_i32());
        }
    };

    let cli_level =
        (cli.quiet || cli.verbose > 0).then(|| LogLevel::from_verbosity(cli.quiet, cli.verbose));
    init_logging(&LogConfig::from_env(cli_level, cli.log_format));

    let ctx = LogContext::for_run();
    log_event!(
        ctx,
        DEBUG,
        event_names::RUN_STARTED,
        Stage::Init,
        "getpcaps starting",
        pids = cli.pids.len(),
        format = %cli.format
    );

    let exit_code = run(&cli, &ctx);

    log_event!(
        ctx,
        DEBUG,
        event_names::RUN_FINISHED,
        Stage::Report,
        "getpcaps finished",
        exit_code = exit_code.as_i32(),
        code_name = exit_code.code_name()
    );
    std::process::exit(exit_code.as_i32());
}

fn run(cli: &Cli, ctx: &LogContext) -> ExitCode {
    let outcome = if cli.list_names {
        list_names(cli.format)
    } else if let Some(text) = &cli.canonicalize {
        canonicalize(cli, ctx, text)
    } else {
        run_query(cli, ctx)
    };

    match outcome {
        Ok(code) => code,
        Err(err) => {
            log_event!(
                ctx,
                ERROR,
                event_names::INTERNAL_ERROR,
                Stage::Report,
                "failed to write output",
                error = %err
            );
            ExitCode::IoError
        }
    }
}

fn run_query(cli: &Cli, ctx: &LogContext) -> io::Result<ExitCode> {
    let overrides = QueryOverrides {
        source: cli.source,
        proc_root: cli.proc_root.clone(),
        jobs: cli.jobs,
    };
    let config = match QueryConfig::from_env(overrides) {
        Ok(config) => config,
        Err(err) => {
            log_event!(
                ctx,
                ERROR,
                event_names::CONFIG_ERROR,
                Stage::Init,
                "invalid configuration",
                error = %err
            );
            return report_fatal(cli, &err);
        }
    };
    log_event!(
        ctx,
        DEBUG,
        event_names::CONFIG_LOADED,
        Stage::Init,
        "configuration resolved",
        source = %config.source,
        proc_root = %config.proc_root().display(),
        jobs = config.jobs
    );

    let source = match open_source(&config) {
        Ok(source) => source,
        Err(err) => return report_fatal(cli, &err),
    };

    let codec = TextCodec::linux();
    let reports = query_batch_parallel(&cli.pids, source.as_ref(), &codec, config.jobs);

    match cli.format {
        OutputFormat::Text => write_text(&reports)?,
        OutputFormat::Json => {
            let mut out = io::stdout().lock();
            serde_json::to_writer_pretty(&mut out, &summarize(&reports))?;
            writeln!(out)?;
        }
        OutputFormat::Jsonl => write_jsonl(&reports)?,
    }

    let succeeded = reports.iter().filter(|r| r.is_success()).count();
    Ok(ExitCode::from_batch(succeeded, reports.len() - succeeded))
}

fn write_text(reports: &[PidReport]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    for report in reports {
        match &report.outcome {
            Ok(found) => {
                writeln!(out, "Capabilities for `{}': {}", report.token, found.text)?;
            }
            Err(err) => {
                out.flush()?;
                eprintln!("Failed to get capabilities for `{}': {}", report.token, err);
            }
        }
    }
    out.flush()
}

fn write_jsonl(reports: &[PidReport]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    for report in reports {
        let line = match &report.outcome {
            Ok(found) => serde_json::json!({ "ok": true, "result": found }),
            Err(err) => serde_json::json!({
                "ok": false,
                "token": report.token,
                "error": StructuredError::from(err),
            }),
        };
        serde_json::to_writer(&mut out, &line)?;
        writeln!(out)?;
    }
    out.flush()
}

fn list_names(format: OutputFormat) -> io::Result<ExitCode> {
    let names = TextCodec::linux().names();
    let mut out = io::stdout().lock();
    match format {
        OutputFormat::Text => {
            for (idx, name) in names.entries() {
                writeln!(out, "{:>2} {}", idx.get(), name)?;
            }
        }
        OutputFormat::Json => {
            let entries: Vec<_> = names
                .entries()
                .map(|(idx, name)| serde_json::json!({ "index": idx, "name": name }))
                .collect();
            serde_json::to_writer_pretty(&mut out, &entries)?;
            writeln!(out)?;
        }
        OutputFormat::Jsonl => {
            for (idx, name) in names.entries() {
                serde_json::to_writer(&mut out, &serde_json::json!({ "index": idx, "name": name }))?;
                writeln!(out)?;
            }
        }
    }
    Ok(ExitCode::Clean)
}

fn canonicalize(cli: &Cli, ctx: &LogContext, text: &str) -> io::Result<ExitCode> {
    let codec = TextCodec::linux();
    match codec.canonicalize(text) {
        Ok(canonical) => {
            log_event!(
                ctx,
                DEBUG,
                event_names::CODEC_CANONICALIZED,
                Stage::Encode,
                "capability text canonicalized",
                input = %truncate_for_log(text, 80),
                canonical = %canonical
            );
            let mut out = io::stdout().lock();
            if cli.format.is_machine() {
                let doc = serde_json::json!({ "input": text, "canonical": canonical });
                serde_json::to_writer(&mut out, &doc)?;
                writeln!(out)?;
            } else {
                writeln!(out, "{}", canonical)?;
            }
            Ok(ExitCode::Clean)
        }
        Err(err) => {
            log_event!(
                ctx,
                WARN,
                event_names::CODEC_REJECTED,
                Stage::Encode,
                "capability text rejected",
                input = %truncate_for_log(text, 80),
                code = err.code()
            );
            report_fatal(cli, &err)
        }
    }
}

/// Report an error that ends the run and pick its exit code.
fn report_fatal(cli: &Cli, err: &Error) -> io::Result<ExitCode> {
    if cli.format.is_machine() {
        let mut out = io::stdout().lock();
        serde_json::to_writer(&mut out, &serde_json::json!({ "error": StructuredError::from(err) }))?;
        writeln!(out)?;
    } else {
        let use_color = !cli.no_color && io::stderr().is_terminal();
        eprintln!("{}", format_error_human(err, use_color));
    }
    Ok(ExitCode::for_error(err))
}
