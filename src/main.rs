mod cli;
mod core;
mod executor;
mod execution;
mod persistence;

use anyhow::{Context, Result};
use cli::commands::{HistoryCommand, RunCommand, ValidateCommand};
use cli::output::*;
use cli::{Cli, Command};
use core::config::{EngineConfig, PlanConfig};
use core::plan::Plan;
use execution::stream::{EventKind, EventStream};
use execution::{plan_succeeded, CancelToken, ExecutionEngine};
use executor::ExecutorRegistry;
use persistence::{create_summary, InMemoryHistory, PersistenceSink};
use std::sync::Arc;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    match &cli.command {
        Command::Run(cmd) => run_plan(cmd, &cli).await?,
        Command::Validate(cmd) => validate_plan(cmd)?,
        Command::History(cmd) => show_history(cmd).await?,
    }

    Ok(())
}

fn load_engine_config(cli: &Cli) -> Result<EngineConfig> {
    match &cli.config {
        Some(path) => EngineConfig::from_file(path).context("Failed to load engine config"),
        None => Ok(EngineConfig::default()),
    }
}

fn build_plan(cmd: &RunCommand, engine_config: &EngineConfig) -> Result<Plan> {
    let query = cmd.query.clone().unwrap_or_default();

    let mut plan = if let Some(path) = &cmd.plan {
        let config = PlanConfig::from_file(path).context("Failed to load plan definition")?;
        let mut plan = config
            .to_plan_with(&engine_config.step_defaults())
            .map_err(|e| anyhow::anyhow!("invalid plan: {}", e))?;
        if !query.is_empty() {
            plan.query = query;
        }
        plan
    } else if let Some(json) = &cmd.plan_json {
        Plan::decode_or_fallback(&query, json)
    } else if !query.is_empty() {
        Plan::fallback(&query)
    } else {
        anyhow::bail!("nothing to run: pass a query, --plan or --plan-json");
    };

    if let Some(mode) = cmd.mode {
        plan.mode = mode.into();
    }

    Ok(plan)
}

async fn run_plan(cmd: &RunCommand, cli: &Cli) -> Result<()> {
    let mut config = load_engine_config(cli)?;
    if let Some(max_parallel) = cmd.max_parallel {
        config.max_parallel = max_parallel;
    }

    let mut plan = build_plan(cmd, &config)?;
    println!(
        "{} Loaded plan: {} ({} steps, {:?})",
        INFO,
        style(&plan.query).bold(),
        style(plan.steps.len()).cyan(),
        plan.mode
    );

    // Set up persistence
    let history = open_history(cmd.no_history).await?;

    let registry = Arc::new(ExecutorRegistry::with_builtins());
    let engine =
        ExecutionEngine::new(registry, config.clone()).with_persistence(history.sink.clone());

    // Ctrl-C cancels the run cooperatively
    let cancel = CancelToken::new();
    let ctrlc = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\ninterrupt received, cancelling plan");
            ctrlc.cancel();
        }
    });

    // Event printer: progress bar plus one line per lifecycle event
    let (sink, mut rx) = EventStream::bounded(config.event_capacity);
    let stream_progress = cli.stream;
    let total_steps = plan.steps.len();
    let printer = tokio::spawn(async move {
        let bar = create_progress_bar(total_steps);
        while let Some(event) = rx.recv().await {
            match event.kind {
                EventKind::StepStarted => {
                    if let Some(step_id) = &event.step_id {
                        bar.set_message(step_id.clone());
                    }
                }
                EventKind::StepCompleted | EventKind::StepFailed | EventKind::StepSkipped => {
                    bar.inc(1);
                }
                _ => {}
            }

            let printable = match event.kind {
                EventKind::StepProgress => stream_progress,
                _ => true,
            };
            if printable {
                bar.println(format_event(&event));
            }

            if event.kind == EventKind::StepCompleted && stream_progress {
                bar.println(format_output(&event.content, 5));
            }
        }
        bar.finish_and_clear();
    });

    println!();
    let result = engine.execute(&mut plan, &sink, &cancel).await;
    drop(sink);
    printer.await.ok();

    // The engine fires the summary fire-and-forget; this explicit save makes
    // the record durable before the process exits
    let summary = create_summary(&plan);
    history.save(&summary).await;
    if !cmd.no_history {
        println!(
            "\n{} Execution saved to history (ID: {})",
            INFO,
            style(&summary.execution_id.to_string()[..8]).dim()
        );
    }

    for step in &plan.steps {
        if let Some(step_error) = &step.error {
            println!(
                "{} {}: {}",
                CROSS,
                style(&step.id).red(),
                style(&step_error.message).dim()
            );
        }
    }
    if cli.verbose {
        for step in &plan.steps {
            println!(
                "  {} {}",
                style(&step.id).bold(),
                format_step_status(step.status)
            );
        }
    }
    println!(
        "\n{} {} - {}/{} steps succeeded",
        if plan_succeeded(&plan) { CHECK } else { CROSS },
        format_status(plan.state.status),
        plan.completed_steps(),
        plan.steps.len()
    );

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
    if !plan_succeeded(&plan) {
        std::process::exit(1);
    }

    Ok(())
}

fn validate_plan(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating plan definition...", INFO);

    let plan = PlanConfig::from_file(&cmd.file)
        .and_then(|config| {
            let plan = config
                .to_plan()
                .map_err(|e| anyhow::anyhow!("invalid plan: {}", e))?;
            Ok((config, plan))
        });

    match plan {
        Ok((config, plan)) => {
            println!("{} Plan definition is valid!", CHECK);
            println!("  Query: {}", style(&plan.query).bold());
            println!("  Mode: {:?}", plan.mode);
            println!("  Steps: {}", style(plan.steps.len()).cyan());

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(e).red());
            std::process::exit(1);
        }
    }
}

#[cfg(feature = "sqlite")]
async fn show_history(cmd: &HistoryCommand) -> Result<()> {
    let store = persistence::SqliteHistoryStore::with_default_path().await?;

    if let Some(id) = &cmd.execution_id {
        let execution_id = uuid::Uuid::parse_str(id).context("Invalid execution ID format")?;
        match store.load_execution(execution_id).await? {
            Some(summary) => {
                println!("{}", format_execution_summary(&summary));
                if cmd.json {
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                }
            }
            None => println!("{} Execution not found", WARN),
        }
        return Ok(());
    }

    let executions = store.list_recent(cmd.limit).await?;
    if executions.is_empty() {
        println!("{} No executions found", INFO);
        return Ok(());
    }

    if cmd.json {
        let data = serde_json::json!({ "executions": executions });
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        println!("{} Execution history (latest {}):", INFO, cmd.limit);
        for summary in &executions {
            println!("  {}", format_execution_summary(summary));
        }
    }

    Ok(())
}

#[cfg(not(feature = "sqlite"))]
async fn show_history(_cmd: &HistoryCommand) -> Result<()> {
    println!("{} History requires the 'sqlite' feature", WARN);
    Ok(())
}

/// History backend selected for this run: always a sink for the engine,
/// plus an explicit save for durability
struct History {
    sink: Arc<dyn PersistenceSink>,
    durable: bool,
}

impl History {
    async fn save(&self, summary: &persistence::ExecutionSummary) {
        if self.durable {
            self.sink.on_execution_saved(summary.clone()).await;
        }
    }
}

#[cfg(feature = "sqlite")]
async fn open_history(no_history: bool) -> Result<History> {
    if no_history {
        Ok(History {
            sink: Arc::new(InMemoryHistory::new()),
            durable: false,
        })
    } else {
        Ok(History {
            sink: Arc::new(persistence::SqliteHistoryStore::with_default_path().await?),
            durable: true,
        })
    }
}

#[cfg(not(feature = "sqlite"))]
async fn open_history(_no_history: bool) -> Result<History> {
    Ok(History {
        sink: Arc::new(InMemoryHistory::new()),
        durable: false,
    })
}
