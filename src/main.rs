use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use orderline::config::{SchedulerConfig, DEFAULT_PROCESSING_TIME};
use orderline::journal::{Journal, DEFAULT_RESULT_PATH};
use orderline::scheduler::Scheduler;
use orderline::script::{dispatch_line, run_script, Reply};
use orderline::shutdown::install_shutdown_handler;
use orderline::status::StatusSnapshot;
use orderline::OrderlineError;

#[derive(Parser, Debug)]
#[command(name = "orderline")]
#[command(version)]
#[command(about = "Priority order queue served by a pool of cooking bots")]
struct Args {
    /// Replay commands from a script file instead of reading stdin
    #[arg(long, conflicts_with = "interactive")]
    script: Option<PathBuf>,

    /// Run an interactive command prompt
    #[arg(long)]
    interactive: bool,

    /// Time a bot spends on each order, in milliseconds
    #[arg(long, env = "PROCESSING_MS", default_value_t = DEFAULT_PROCESSING_TIME.as_millis() as u64)]
    processing_ms: u64,

    /// Format of the final status report
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,

    /// File that receives a timestamped copy of every reply and bot event
    #[arg(long, default_value = DEFAULT_RESULT_PATH)]
    out: PathBuf,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

// =============================================================================
// Command Modes
// =============================================================================

fn print_welcome(journal: &Journal) {
    journal.record(
        Utc::now(),
        "Commands: n(normal), v(vip), +(add bot), -(del bot), status, wait <ms>, quit",
    );
}

async fn run_interactive(
    scheduler: &Scheduler,
    journal: &Journal,
    stop: &CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            _ = stop.cancelled() => return Ok(()),
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            return Ok(());
        };

        match dispatch_line(scheduler, &line, stop).await {
            Ok(Some(Reply::Quit)) => {
                journal.record(Utc::now(), Reply::Quit);
                return Ok(());
            }
            Ok(Some(reply)) => journal.record(Utc::now(), reply),
            Ok(None) => {}
            Err(OrderlineError::Cancelled) => return Ok(()),
            Err(e) => journal.record(Utc::now(), format!("ERR: {}", e)),
        }
    }
}

async fn run_mode(
    args: &Args,
    scheduler: &Scheduler,
    journal: &Journal,
    stop: &CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = &args.script {
        let file = tokio::fs::File::open(path).await?;
        let executed = run_script(scheduler, BufReader::new(file), stop, |reply| {
            journal.record(Utc::now(), reply)
        })
        .await?;
        tracing::info!(script = %path.display(), executed, "Script finished");
    } else if args.interactive {
        print_welcome(journal);
        run_interactive(scheduler, journal, stop).await?;
    } else {
        journal.record(
            Utc::now(),
            format!(
                "CLI initialized (processing-ms={})",
                scheduler.config().processing_time.as_millis()
            ),
        );
    }
    Ok(())
}

fn print_status(snapshot: &StatusSnapshot, format: &OutputFormat) -> Result<(), serde_json::Error> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(snapshot)?),
        OutputFormat::Table => {
            println!(
                "STATUS {} (busy {}/{})",
                snapshot,
                snapshot.busy_bots(),
                snapshot.bots.len()
            );
            for bot in &snapshot.bots {
                match bot.current_order {
                    Some(order) => println!(
                        "  bot #{:<4} {:<8} order #{} ({})",
                        bot.id,
                        bot.state.to_string(),
                        order.id,
                        order.class
                    ),
                    None => println!("  bot #{:<4} {}", bot.id, bot.state),
                }
            }
            let pending = snapshot
                .pending_ids()
                .iter()
                .map(|id| format!("#{}", id))
                .collect::<Vec<_>>()
                .join(" ");
            if !pending.is_empty() {
                println!("  pending: {}", pending);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // stdout carries the journal
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let journal = Arc::new(Journal::create(&args.out)?);
    tracing::info!(path = %journal.path().display(), "Writing results");

    let config = SchedulerConfig::default().with_processing_ms(args.processing_ms);
    let (scheduler, event_loop) = Scheduler::start(config);
    let journal_done = CancellationToken::new();
    let journal_task = journal.follow(scheduler.subscribe(), journal_done.clone());
    let stop = install_shutdown_handler(scheduler.clone())?;

    let outcome = run_mode(&args, &scheduler, &journal, &stop).await;
    if let Err(e) = &outcome {
        journal.record(Utc::now(), format!("ERROR: {}", e));
    }

    print_status(&scheduler.status().await, &args.output)?;

    scheduler.shutdown().await;
    stop.cancel();
    event_loop.await?;
    journal_done.cancel();
    journal_task.await?;

    outcome
}
