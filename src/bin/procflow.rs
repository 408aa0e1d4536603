use anyhow::Result;
use clap::{Parser, Subcommand};
use procflow::actions::builtin::{AssignAction, ExternalAction, LogAction};
use procflow::actions::http::HttpAction;
use procflow::definition::import::load_document_from_yaml;
use procflow::runtime::engine::ProcessEngine;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a definition from YAML and run one instance of it
    Run {
        /// Path to the definition YAML file
        #[arg(long, short)]
        file: PathBuf,

        /// Initial variables (key=value)
        #[arg(long, short = 'D', value_parser = parse_key_val)]
        vars: Vec<(String, serde_json::Value)>,
    },

    /// Parse and validate a definition YAML file without running it
    Check {
        /// Path to the definition YAML file
        #[arg(long, short)]
        file: PathBuf,
    },
}

fn parse_key_val(s: &str) -> Result<(String, serde_json::Value), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=value: no `=` found in `{}`", s))?;
    let key = s[..pos].to_string();
    let val_str = &s[pos + 1..];
    // Try parsing as JSON, otherwise treat as string
    let val = serde_json::from_str(val_str)
        .unwrap_or_else(|_| serde_json::Value::String(val_str.to_string()));
    Ok((key, val))
}

fn register_standard_actions(engine: &ProcessEngine) {
    engine.register_action(Arc::new(LogAction));
    engine.register_action(Arc::new(AssignAction));
    engine.register_action(Arc::new(ExternalAction));
    engine.register_action(Arc::new(HttpAction::new()));
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { file, vars } => {
            let engine = ProcessEngine::new();
            register_standard_actions(&engine);

            let doc = load_document_from_yaml(&file)?;
            let def = engine.import_definition(&doc)?;
            info!("definition `{}` imported", def.name);

            let handle = engine.create_process_instance(def)?;
            let mut instance = handle.lock().await;

            let initial_vars: HashMap<_, _> = vars.into_iter().collect();
            instance.start(initial_vars).await?;

            info!(
                instance_id = %instance.id(),
                status = ?instance.status(),
                "walk finished"
            );
            for (key, value) in instance.variables() {
                println!("{} = {}", key, value);
            }
            if !instance.node_pool().is_empty() {
                let pending: Vec<_> = instance.node_pool().keys().collect();
                println!("pending tasks: {:?}", pending);
            }
        }

        Commands::Check { file } => {
            let engine = ProcessEngine::new();
            let doc = load_document_from_yaml(&file)?;
            let def = engine.import_definition(&doc)?;
            println!(
                "definition `{}` is valid: {} tasks, {} flows",
                def.name,
                def.tasks.len(),
                def.flows.len()
            );
        }
    }

    Ok(())
}
