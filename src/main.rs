//! Assistant Engine - Entry Point
//!
//! Modes:
//! - Default: interactive line-based session over stdin
//! - --autonomy / -a: run the bounded autonomy loop and exit

use assistant_engine::{
    AutonomyLoop, BackgroundRunner, CompletionClient, CompletionConfig, CuriosityLoop,
    EngineConfig, Event, EventType, MemoryConsolidator, MemoryStore, Orchestrator, SkillLearner,
    SkillRegistry,
};
use assistant_engine::skills::register_builtins;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Parse args
    let args: Vec<String> = std::env::args().collect();
    let autonomy_mode = args.iter().any(|a| a == "--autonomy" || a == "-a");
    let help_mode = args.iter().any(|a| a == "--help" || a == "-h");

    if help_mode {
        println!("Assistant Engine v{}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Usage: assistant-engine [OPTIONS]");
        println!();
        println!("Options:");
        println!("  --autonomy, -a  Run the bounded autonomy loop and exit");
        println!("  --help, -h      Show this help");
        println!();
        println!("Default: interactive session over stdin");
        println!();
        println!("Environment variables:");
        println!("  ENGINE_STORE_PATH       Memory file path (default: assistant_memory.json)");
        println!("  COMPLETION_URL          Completion service URL (default: http://localhost:11434)");
        println!("  COMPLETION_MODEL        Model name (default: llama3.1:8b)");
        println!("  ENGINE_IDLE_THRESHOLD_SECS   Idle time before curiosity activates");
        println!("  ENGINE_AUTONOMY_MAX_CYCLES   Autonomy loop cycle cap");
        return Ok(());
    }

    let log_level = std::env::var("RUST_LOG")
        .map(|s| match s.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        })
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Assistant Engine v{}", env!("CARGO_PKG_VERSION"));

    let config = EngineConfig::from_env()?;

    let memory = Arc::new(MemoryStore::open(&config.store_path)?);
    let skills = Arc::new(SkillRegistry::new());
    register_builtins(&skills);
    let completion = Arc::new(CompletionClient::with_config(CompletionConfig {
        base_url: config.completion_url.clone(),
        model: config.completion_model.clone(),
        timeout: config.completion_timeout,
    })?);
    if !completion.is_available().await {
        info!("Completion service not reachable; falling back where possible");
    }

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&memory),
        Arc::clone(&skills),
        Arc::clone(&completion),
        &config,
    ));

    let runner = BackgroundRunner::new(
        Arc::new(CuriosityLoop::new(
            Arc::clone(&memory),
            Arc::clone(&completion),
            config.idle_threshold,
        )),
        Arc::new(MemoryConsolidator::new(
            Arc::clone(&memory),
            Arc::clone(&completion),
            config.consolidation_interval,
            config.event_log_cap,
            config.conversation_cap,
            config.insight_cap,
            config.summary_cap,
        )),
        Arc::new(SkillLearner::new(Arc::clone(&memory), Arc::clone(&completion))),
        Arc::clone(&skills),
        config.curiosity_poll,
        config.consolidation_poll,
        config.skill_poll,
    );
    runner.start();

    let boot = orchestrator.handle_event(&Event::bare(EventType::SystemBoot)).await;
    println!("{}", boot.result_text());

    if autonomy_mode {
        let autonomy = AutonomyLoop::new(Arc::clone(&orchestrator), config.autonomy_max_cycles)
            .with_delay(std::time::Duration::from_secs(1));
        autonomy.run().await;
    } else {
        run_session(&orchestrator, &runner).await?;
    }

    orchestrator
        .handle_event(&Event::bare(EventType::SystemShutdown))
        .await;
    runner.stop();
    info!("Goodbye");
    Ok(())
}

/// Interactive loop: each stdin line becomes a user-input event.
/// Ctrl-C or "quit"/"exit" ends the session.
async fn run_session(orchestrator: &Orchestrator, runner: &BackgroundRunner) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line? {
                    Some(l) => l,
                    None => break,
                };
                let text = line.trim();
                if text.is_empty() {
                    continue;
                }
                if text.eq_ignore_ascii_case("quit") || text.eq_ignore_ascii_case("exit") {
                    break;
                }

                runner.record_activity();
                let outcome = orchestrator.handle_event(&Event::user_input(text)).await;
                println!("{}", outcome.result_text());
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received");
                break;
            }
        }
    }

    Ok(())
}
