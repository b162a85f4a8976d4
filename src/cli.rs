//! Command-line interface for newton-chat.
//!
//! The binary is a diagnostic tool: it replays recorded kernel traffic
//! through the comm model and inspects the unified message format.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::comm_model::NotebookCommModel;
use crate::config::Settings;
use crate::error::ChatError;
use crate::handler;
use crate::protocol::{OptionListKind, extract_options, split_unified_message};
use crate::transport::{
    CommLink, ExecutionOutcome, KernelEvent, KernelInfo, KernelSession, MemoryChannel,
};

/// newton-chat - chat synchronisation core for the Newton notebook assistant
#[derive(Parser)]
#[command(name = "newton-chat")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Debug log level (0-4), overrides DEBUG_LEVEL
    #[arg(long, value_name = "LEVEL", global = true, value_parser = clap::value_parser!(u8).range(0..=4))]
    pub log_level: Option<u8>,

    /// Settings file to use instead of ~/.config/newton-chat/config.yaml
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Feed a JSON-lines transcript of kernel payloads through the comm model
    Replay {
        /// Transcript file, one kernel payload per line
        file: PathBuf,

        /// Kernel name reported to the language matcher
        #[arg(long, default_value = "python3")]
        kernel: String,
    },
    /// Print the parsed segments of a unified message
    Segments {
        /// Message text using `####type#:` segment markers
        text: String,
    },
    /// Print the options of a list segment
    Options {
        /// List body (`- key::bot::label` lines)
        text: String,

        /// Number the labels
        #[arg(long)]
        ordered: bool,
    },
}

/// Run the parsed command.
pub fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Replay { file, kernel } => {
            let settings = load_settings(cli.config.as_deref())?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(replay(&file, &kernel, settings))
        }
        Commands::Segments { text } => {
            let parts = split_unified_message(&text);
            println!("{}", serde_json::to_string_pretty(&parts)?);
            Ok(())
        }
        Commands::Options { text, ordered } => {
            let kind = if ordered {
                OptionListKind::Ordered
            } else {
                OptionListKind::Unordered
            };
            for option in extract_options(&text, kind) {
                println!("{}\t{}", option.key, option.label);
            }
            Ok(())
        }
    }
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => Ok(Settings::load().unwrap_or_else(|e| {
            crate::debug_error!("CLI", "Falling back to default settings: {}", e);
            log::warn!("Falling back to default settings: {}", e);
            Settings::default()
        })),
    }
}

/// Kernel session backed by an in-memory comm.
struct ReplaySession {
    kernel: String,
    channel: Arc<MemoryChannel>,
}

impl KernelSession for ReplaySession {
    fn name(&self) -> String {
        "replay".to_string()
    }

    async fn ready(&self) -> Result<(), ChatError> {
        Ok(())
    }

    fn has_kernel(&self) -> bool {
        true
    }

    async fn kernel_info(&self) -> Option<KernelInfo> {
        Some(KernelInfo {
            name: self.kernel.clone(),
            language: self.kernel.clone(),
        })
    }

    fn register_comm_target(&self, target: &str, link: CommLink) -> Result<(), ChatError> {
        crate::debug_info!("CLI", "Registered comm target {}", target);
        link.attach(self.channel.clone());
        Ok(())
    }

    async fn execute_silent(&self, _code: &str) -> Result<ExecutionOutcome, ChatError> {
        Ok(ExecutionOutcome::default())
    }
}

// A transcript line is a kernel payload, or `{"status": "..."}` for a kernel
// status change.
fn transcript_event(line: &str) -> Result<KernelEvent> {
    let value: Value = serde_json::from_str(line)?;
    if let Some(status) = value.get("status").and_then(Value::as_str)
        && value.get("operation").is_none()
    {
        return Ok(KernelEvent::StatusChanged(status.to_string()));
    }
    Ok(KernelEvent::CommMessage(value))
}

async fn replay(file: &Path, kernel: &str, settings: Settings) -> Result<()> {
    let transcript = fs::read_to_string(file)
        .with_context(|| format!("Failed to read transcript {}", file.display()))?;

    let channel = Arc::new(MemoryChannel::new("replay"));
    let session = Arc::new(ReplaySession {
        kernel: kernel.to_string(),
        channel: channel.clone(),
    });
    let (events_tx, _events_rx) = mpsc::unbounded_channel();
    let mut model = NotebookCommModel::new(session, settings, events_tx);
    model.connect_notebook().await?;
    print_sent(&channel);

    for (number, line) in transcript.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let event = transcript_event(line)
            .with_context(|| format!("Invalid JSON on line {}", number + 1))?;
        crate::debug_log!("CLI", "line {}: {:?}", number + 1, event);
        handler::handle_event(&mut model, event).await;
        print_sent(&channel);
    }

    print_state(&model);
    Ok(())
}

fn print_sent(channel: &MemoryChannel) {
    for payload in channel.take_sent() {
        println!("-> {payload}");
    }
}

fn print_state<S: KernelSession>(model: &NotebookCommModel<S>) {
    let status = model.status();
    println!();
    println!(
        "kernel: language={} has_kernel={} ready={}",
        model.language().unwrap_or("generic"),
        status.has_kernel,
        model.is_connection_ready()
    );
    println!(
        "loaders: {}",
        model.loaders().keys().cloned().collect::<Vec<_>>().join(", ")
    );
    for (name, instance) in model.instances() {
        println!("[{}] mode={} messages={}", name, instance.mode(), instance.len());
        for message in instance.messages() {
            let summary = json!({
                "id": message.id,
                "type": message.message_type,
                "target": message.target(),
                "text": message.text,
            });
            println!("  {summary}");
        }
    }
    if let Some(replying) = model.context().replying() {
        println!("replying: {replying}");
    }
    for report in model.reporter().reports() {
        println!("error: {}", report.summary());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line_is_status_event() {
        match transcript_event(r#"{"status": "restarting"}"#).unwrap() {
            KernelEvent::StatusChanged(status) => assert_eq!(status, "restarting"),
            other => panic!("Expected StatusChanged, got {:?}", other),
        }
    }

    #[test]
    fn test_payload_line_is_comm_message() {
        let event = transcript_event(r#"{"operation": "refresh", "instance": "base", "history": []}"#)
            .unwrap();
        assert!(matches!(event, KernelEvent::CommMessage(_)));
    }

    #[test]
    fn test_cli_parses_replay() {
        let cli = Cli::try_parse_from(["newton-chat", "--log-level", "3", "replay", "t.jsonl"]).unwrap();
        assert_eq!(cli.log_level, Some(3));
        assert!(matches!(cli.command, Commands::Replay { .. }));
        assert!(Cli::try_parse_from(["newton-chat", "--log-level", "7", "segments", "x"]).is_err());
    }

    #[test]
    fn test_load_settings_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let settings = Settings {
            base_instance: "main".to_string(),
            ..Settings::default()
        };
        settings.save_to(&path).unwrap();

        assert_eq!(load_settings(Some(&path)).unwrap().base_instance, "main");
        assert!(load_settings(Some(&dir.path().join("missing.yaml"))).is_err());
    }

    #[tokio::test]
    async fn test_replay_transcript_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.jsonl");
        fs::write(
            &path,
            concat!(
                r#"{"operation": "refresh", "instance": "base", "history": [], "config": {}}"#,
                "\n\n",
                r#"{"status": "restarting"}"#,
                "\n",
            ),
        )
        .unwrap();
        replay(&path, "python3", Settings::default()).await.unwrap();

        fs::write(&path, "not json\n").unwrap();
        let err = replay(&path, "python3", Settings::default()).await.unwrap_err();
        assert!(format!("{err:#}").contains("line 1"));
    }
}
