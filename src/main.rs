use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use laneq::config::Config;
use laneq::domain::{ExecutionResult, StepStatus};
use laneq::executor::EchoExecutor;
use laneq::orchestrator::{PlanOrchestrator, summarize_execution};
use laneq::queue::{LaneQueue, QueueEvent};

mod cli;

use cli::Cli;
use cli::commands::Commands;

fn setup_logging(config: &Config) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("laneq")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("laneq.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let default_level = config.log_level.as_deref().unwrap_or("info");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Plan { input, session, file } => {
            handle_plan_command(input, session, *file, cli.is_verbose(), config).await
        }
        Commands::Lanes => handle_lanes_command(config),
    }
}

async fn handle_plan_command(input: &str, session: &str, from_file: bool, verbose: bool, config: &Config) -> Result<()> {
    let input = if from_file {
        fs::read_to_string(input).context(format!("Failed to read plan file {}", input))?
    } else {
        input.to_string()
    };

    info!("Executing plan (dry run) for session {}", session);
    println!("{} {}", "Executing plan (dry run):".green(), first_line(&input));

    let queue = LaneQueue::new(Arc::new(EchoExecutor), config.queue_config())?;
    let mut events = queue.subscribe();

    let orch_config = config.orchestrator_config();
    let executor = config.dispatch_executor(queue.clone());
    let orchestrator = PlanOrchestrator::with_config(Arc::new(executor), orch_config);

    let result = orchestrator.execute_input(&input, session).await?;
    queue.shutdown();

    if verbose {
        while let Ok(event) = events.try_recv() {
            print_event(&event);
        }
    }

    print_result(&result);
    Ok(())
}

fn handle_lanes_command(config: &Config) -> Result<()> {
    info!("Listing {} lanes", config.lanes.len());
    println!("{}", "Lanes:".cyan());
    for lane in &config.lanes {
        println!(
            "  {:<12} {:<10} max_concurrent={}",
            lane.name.bold(),
            lane.kind().to_string(),
            lane.max_concurrent
        );
    }
    Ok(())
}

fn print_event(event: &QueueEvent) {
    let line = match event {
        QueueEvent::Enqueued { task_id, lane } => format!("enqueued  {} -> {}", task_id, lane),
        QueueEvent::Started { task_id, attempt, .. } => format!("started   {} (attempt {})", task_id, attempt),
        QueueEvent::Completed { task_id, .. } => format!("completed {}", task_id),
        QueueEvent::Retrying { task_id, delay, .. } => format!("retrying  {} in {:?}", task_id, delay),
        QueueEvent::Failed { task_id, error } => format!("failed    {}: {}", task_id, error),
        QueueEvent::Cancelled { task_id } => format!("cancelled {}", task_id),
        QueueEvent::LanePaused { lane } => format!("paused    {}", lane),
        QueueEvent::LaneResumed { lane } => format!("resumed   {}", lane),
        QueueEvent::LaneCleared { lane, removed } => format!("cleared   {} ({} removed)", lane, removed),
    };
    println!("  {}", line.dimmed());
}

fn print_result(result: &ExecutionResult) {
    for line in result.output.lines() {
        let colored_line = if line.starts_with(StepStatus::Completed.glyph()) {
            line.green()
        } else if line.starts_with(StepStatus::Failed.glyph()) {
            line.red()
        } else if line.starts_with(StepStatus::Skipped.glyph()) {
            line.yellow()
        } else {
            line.normal()
        };
        println!("{}", colored_line);
    }

    println!();
    let summary = summarize_execution(result);
    if result.success {
        println!("{}", summary.green());
    } else {
        println!("{}", summary.red());
    }
}

fn first_line(input: &str) -> &str {
    input.lines().next().unwrap_or_default()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration (its log_level drives the logger)
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(&config).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
