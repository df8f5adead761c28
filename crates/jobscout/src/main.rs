//! jobscout CLI: start scraping pipeline runs and follow them live.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::info;

use jobscout::monitor::{HttpPipelineTransport, RunController, RunError, RunMode, RunRequest};
use jobscout::schedule::ScheduleInterval;
use jobscout::telemetry::{init_tracing, LogFormat};
use jobscout::{resolve_config, JobscoutError, RunPhase};

/// Operator tools for the job scraping pipeline.
#[derive(Parser)]
#[command(name = "jobscout", version, about, long_about = None)]
struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a pipeline run and stream its log until it ends.
    Run {
        /// Datasource (group) id to scrape.
        #[arg(long)]
        source: String,

        /// How far the scraper scrolls the source feed.
        #[arg(long, default_value_t = 5)]
        max_scrolls: u32,

        /// Trigger mode reported to the backend: auto or manual.
        #[arg(long)]
        mode: Option<RunMode>,

        /// Schedule interval in minutes, for scheduled runs.
        #[arg(long)]
        interval: Option<u32>,

        /// Config file (defaults to ~/.jobscout/config.json).
        #[arg(long, env = "JOBSCOUT_CONFIG")]
        config: Option<PathBuf>,
    },

    /// List the permitted schedule intervals.
    Intervals,

    /// Print the resolved configuration.
    Config {
        #[arg(long, env = "JOBSCOUT_CONFIG")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    match dispatch(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(command: Command) -> Result<ExitCode, JobscoutError> {
    match command {
        Command::Run {
            source,
            max_scrolls,
            mode,
            interval,
            config,
        } => {
            let mut request = RunRequest::new(source, max_scrolls);
            if let Some(mode) = mode {
                request = request.with_mode(mode);
            }
            if let Some(minutes) = interval {
                request = request.with_interval(ScheduleInterval::try_from(minutes)?);
            }
            let config = resolve_config(config.as_deref())?;
            run(&config, request).await
        }
        Command::Intervals => {
            for interval in ScheduleInterval::ALL {
                println!("{:>6}  {}", interval.minutes(), interval.label());
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Config { config } => {
            let config = resolve_config(config.as_deref())?;
            match serde_json::to_string_pretty(&config) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("error: failed to render config: {}", e),
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run(config: &jobscout::Config, request: RunRequest) -> Result<ExitCode, JobscoutError> {
    let transport = HttpPipelineTransport::new(&config.api).map_err(RunError::from)?;
    info!(endpoint = transport.endpoint(), "Using pipeline endpoint");

    let controller = RunController::new(transport);
    let handle = controller.start_run(request)?;
    let mut updates = handle.updates();

    let mut printed = 0;
    let mut last_phase = None;
    loop {
        let terminal = {
            let state = updates.borrow_and_update();
            if last_phase != Some(state.phase) {
                println!("== {} ==", state.phase);
                last_phase = Some(state.phase);
            }
            for line in &state.log[printed..] {
                println!("{}", line);
            }
            printed = state.log.len();
            state.phase.is_terminal()
        };
        if terminal || updates.changed().await.is_err() {
            break;
        }
    }

    let state = handle.wait().await;
    for line in state.log.iter().skip(printed) {
        println!("{}", line);
    }
    println!(
        "posts found: {}, jobs extracted: {}, jobs uploaded: {}",
        state.counters.posts_found, state.counters.jobs_extracted, state.counters.jobs_uploaded
    );

    Ok(if state.phase == RunPhase::Failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
