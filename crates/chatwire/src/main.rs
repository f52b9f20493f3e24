// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chatwire - WhatsApp chatbot service.
//!
//! Binary entry point: loads configuration, then serves or checks it.

mod serve;

use std::path::PathBuf;

use chatwire_config::ChatwireConfig;
use clap::{Parser, Subcommand};

/// Chatwire - question flows with AI fallback over WhatsApp.
#[derive(Parser, Debug)]
#[command(name = "chatwire", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the webhook and operator API server.
    Serve,
    /// Load and validate configuration, then print a summary.
    CheckConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => chatwire_config::load_and_validate_path(path),
        None => chatwire_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            chatwire_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::CheckConfig) => print_summary(&config),
        None => {
            println!("chatwire: use --help for available commands");
        }
    }
}

fn print_summary(config: &ChatwireConfig) {
    let set = |value: &Option<String>| if value.is_some() { "set" } else { "not set" };
    println!("chatwire: config ok");
    println!("  listen            {}:{}", config.server.host, config.server.port);
    println!("  database          {}", config.storage.database_path);
    println!("  operator token    {}", set(&config.server.operator_token));
    println!("  whatsapp token    {}", set(&config.whatsapp.access_token));
    println!("  app secret        {}", set(&config.whatsapp.app_secret));
    println!("  verify token      {}", set(&config.whatsapp.verify_token));
    let ai_key = if config.ai.api_key.is_some() {
        "set"
    } else if std::env::var(chatwire_openai::API_KEY_ENV).is_ok() {
        "from environment"
    } else {
        "not set (AI replies disabled)"
    };
    println!("  ai api key        {ai_key}");
    println!("  default model     {}", config.ai.default_model);
    println!("  unmatched input   {}", config.pipeline.unmatched_input);
    println!(
        "  webhook           {}{}",
        if config.webhook.process_inline { "inline" } else { "background" },
        config
            .webhook
            .mirror_url
            .as_deref()
            .map(|u| format!(", mirrored to {u}"))
            .unwrap_or_default()
    );
}
