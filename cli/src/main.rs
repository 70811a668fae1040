//! CLI entrypoint for appforge
//!
//! Wires the layers together with dependency injection and drives one
//! conversational turn, printing the multiplexed event stream.

use anyhow::{Result, bail};
use appforge_application::{
    AppVersionStore, CreateAppTool, EchoTool, RunTurnUseCase, ToolRegistry, TurnInput,
};
use appforge_domain::{AgentEvent, ChatMessage, ToolStreamFrame};
use appforge_infrastructure::{
    ConfigLoader, FileConfig, HttpLlmGateway, InMemoryAppStore, JsonlAppStore,
};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "appforge", about = "Streaming code-generation agent", version)]
struct Cli {
    /// What to build
    prompt: Option<String>,

    /// Conversation id for version history
    #[arg(short, long, default_value = "default")]
    conversation: String,

    /// Explicit config file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip config files, use built-in defaults
    #[arg(long)]
    no_config: bool,

    /// Stream the prompt through the echo tool instead of the live gateway
    #[arg(long)]
    demo: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).map_err(|e| anyhow::anyhow!(e))?
    };

    let Some(prompt) = cli.prompt else {
        bail!("A prompt is required.");
    };

    // === Dependency injection ===
    let registry = Arc::new(ToolRegistry::new(config.agent.registry_config()));

    if cli.demo {
        registry.register(Arc::new(EchoTool::new(registry.tracker())));
        return run_demo(&registry, &prompt).await;
    }

    let gateway = Arc::new(build_gateway(&config)?);
    let store = build_store(&config)?;

    registry.register(Arc::new(CreateAppTool::new(
        gateway.clone(),
        registry.tracker(),
        config.agent.generation_settings(),
    )));

    info!(conversation = %cli.conversation, "starting turn");

    let use_case = RunTurnUseCase::new(gateway, registry, store);
    let input = TurnInput {
        conversation_id: cli.conversation,
        messages: vec![ChatMessage::user(prompt)],
    };

    let (tx, mut rx) = mpsc::channel(64);
    let turn = tokio::spawn(async move { use_case.execute(input, tx).await });

    let mut stdout = std::io::stdout();
    while let Some(event) = rx.recv().await {
        match event {
            AgentEvent::AssistantDelta { text } => {
                print!("{}", text);
                stdout.flush()?;
            }
            AgentEvent::Tool { frame } => print_frame(&frame, &mut stdout)?,
            AgentEvent::ToolError {
                tool_call_id,
                message,
            } => eprintln!("\n[tool {} failed: {}]", tool_call_id, message),
            AgentEvent::PersistenceError { message } => {
                eprintln!("\n[version not saved: {}]", message);
            }
            AgentEvent::Completed { version_id } => {
                println!();
                if let Some(id) = version_id {
                    println!("Saved version: {}", id);
                }
            }
            AgentEvent::Error { message } => {
                println!();
                bail!("turn failed: {}", message);
            }
        }
    }

    turn.await?;
    Ok(())
}

fn build_gateway(config: &FileConfig) -> Result<HttpLlmGateway> {
    let http = config.gateway.http_config();
    if http.api_key.is_empty() {
        bail!(
            "No API key found. Set the {} environment variable.",
            config.gateway.api_key_env
        );
    }
    Ok(HttpLlmGateway::new(http)?.with_tools(&[CreateAppTool::describe()]))
}

fn build_store(config: &FileConfig) -> Result<Arc<dyn AppVersionStore>> {
    match config.store.backend.as_str() {
        "memory" => Ok(Arc::new(InMemoryAppStore::new())),
        "jsonl" => Ok(Arc::new(JsonlAppStore::open(&config.store.path)?)),
        other => bail!("unknown store backend '{}', expected memory or jsonl", other),
    }
}

/// Stream the prompt through the echo tool and print each frame.
async fn run_demo(registry: &ToolRegistry, prompt: &str) -> Result<()> {
    let mut stream = registry.stream_tool_execution(
        "demo-1",
        "echo",
        serde_json::json!({ "text": prompt }),
    )?;

    let mut stdout = std::io::stdout();
    while let Some(item) = stream.next().await {
        print_frame(&item?, &mut stdout)?;
    }
    println!();
    Ok(())
}

fn print_frame(frame: &ToolStreamFrame, stdout: &mut std::io::Stdout) -> Result<()> {
    match frame {
        ToolStreamFrame::StreamStart { tool_name, .. } => {
            println!("[{} started]", tool_name);
        }
        ToolStreamFrame::Delta {
            args_text_delta, ..
        } => {
            print!("{}", args_text_delta);
            stdout.flush()?;
        }
        ToolStreamFrame::Call { tool_name, .. } => {
            println!("[{} invoked]", tool_name);
        }
        ToolStreamFrame::Result { result, .. } => {
            println!();
            println!("[result: {}]", serde_json::to_string_pretty(result)?);
        }
    }
    Ok(())
}
