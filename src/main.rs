//! sandbox-agent - CLI entry point
//!
//! Sends one prompt to the model and lets it work inside the sandbox until it
//! answers or runs out of iterations.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use sandbox_agent::agent::{Agent, AgentEvent, AgentOutcome};
use sandbox_agent::config::Config;
use sandbox_agent::conversation::Conversation;
use sandbox_agent::llm::GeminiClient;
use sandbox_agent::tools::{Sandbox, Toolbox};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "sandbox-agent", version, about)]
struct Cli {
    /// The request for the agent
    prompt: String,

    /// Print token counts, tool arguments and full tool results
    #[arg(short, long)]
    verbose: bool,

    /// Sandbox root (overrides AGENT_WORKING_DIR)
    #[arg(long)]
    workdir: Option<PathBuf>,

    /// Model identifier (overrides GEMINI_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// Maximum agent iterations (overrides MAX_ITERATIONS)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    max_iterations: Option<u32>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = if cli.verbose {
        "sandbox_agent=debug"
    } else {
        "sandbox_agent=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let mut config = Config::from_env()?;
    if let Some(workdir) = cli.workdir {
        config.working_dir = workdir;
    }
    if let Some(model) = cli.model {
        config.model = model;
    }
    if let Some(max_iterations) = cli.max_iterations {
        config.max_iterations = max_iterations as usize;
    }
    tracing::debug!(
        "Loaded configuration: model={} working_dir={}",
        config.model,
        config.working_dir.display()
    );

    let sandbox = Sandbox::new(&config.working_dir).with_context(|| {
        format!(
            "working directory {} is not usable",
            config.working_dir.display()
        )
    })?;
    let llm = Arc::new(
        GeminiClient::new(config.api_key.clone(), config.model.clone())
            .with_base_url(config.base_url.clone()),
    );
    let agent = Agent::new(llm, Toolbox::new(sandbox, config.scripts.clone()))
        .with_max_iterations(config.max_iterations);

    if cli.verbose {
        println!("User prompt: {}", cli.prompt);
    }

    let verbose = cli.verbose;
    let mut stdout = std::io::stdout();
    let run = agent
        .run_with_events(Conversation::from_prompt(cli.prompt), |event| {
            if let Err(e) = report(&mut stdout, &event, verbose) {
                tracing::warn!("Failed to write progress: {}", e);
            }
        })
        .await?;

    match run.outcome {
        AgentOutcome::Completed { text: Some(text) } => println!("Final response:\n{}", text),
        AgentOutcome::Completed { text: None } => println!("The model returned no text."),
        AgentOutcome::IterationLimit { max_iterations } => println!(
            "Reached the maximum of {} iterations without a final response.",
            max_iterations
        ),
    }

    if verbose {
        println!(
            "Total tokens: prompt={} response={} iterations={}",
            run.usage.prompt_token_count, run.usage.candidates_token_count, run.iterations
        );
    }

    Ok(())
}

/// Print one progress notice for the user.
fn report(out: &mut impl Write, event: &AgentEvent<'_>, verbose: bool) -> io::Result<()> {
    match event {
        AgentEvent::Iteration(_) => {}
        AgentEvent::Usage(usage) => {
            if verbose {
                writeln!(out, "Prompt tokens: {}", usage.prompt_token_count)?;
                writeln!(out, "Response tokens: {}", usage.candidates_token_count)?;
            }
        }
        AgentEvent::ToolCall(call) => {
            if verbose {
                writeln!(
                    out,
                    "Calling function: {}({})",
                    call.name,
                    serde_json::Value::Object(call.args.clone())
                )?;
            } else {
                writeln!(out, " - Calling function: {}", call.name)?;
            }
        }
        AgentEvent::ToolResult(result) => {
            if verbose {
                writeln!(out, "-> {}", result.text())?;
            }
        }
    }
    Ok(())
}
