// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Quill - rate-limited AI prompt enhancement.
//!
//! This is the binary entry point. Every command prints a single JSON (or
//! TOML, for `config`) document to stdout; logs go to stderr.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod app;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use quill_core::{EnhancementOptions, Focus, QuillError, Tier, Tone};
use quill_enhance::{EnhanceRequest, EnhanceResponse};
use serde::Serialize;
use tokio::io::AsyncReadExt;

use crate::app::{init_tracing, render_config, App};

/// Quill - rate-limited AI prompt enhancement.
#[derive(Parser, Debug)]
#[command(name = "quill", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Enhance a prompt. Reads the prompt from stdin when none is given.
    Enhance(EnhanceArgs),
    /// Show a user's remaining quota without consuming any.
    Status {
        #[arg(long)]
        user: String,
        #[arg(long, default_value_t = Tier::Free)]
        tier: Tier,
    },
    /// List a user's most recent enhancement sessions.
    History {
        #[arg(long)]
        user: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Print the effective configuration.
    Config,
}

#[derive(Args, Debug)]
struct EnhanceArgs {
    /// Prompt text to enhance.
    content: Option<String>,
    #[arg(long)]
    user: String,
    #[arg(long, default_value_t = Tier::Free)]
    tier: Tier,
    /// Existing prompt this enhancement belongs to.
    #[arg(long)]
    prompt_id: Option<String>,
    /// Target system, e.g. "Midjourney".
    #[arg(long)]
    platform: Option<String>,
    #[arg(long)]
    tone: Option<Tone>,
    #[arg(long)]
    focus: Option<Focus>,
    /// Do not record an enhancement session.
    #[arg(long)]
    no_session: bool,
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

impl ErrorResponse {
    fn new(error: impl ToString) -> Self {
        Self {
            success: false,
            error: error.to_string(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match cli.config.as_deref() {
        Some(path) => quill_config::load_and_validate_path(path),
        None => quill_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            quill_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };

    if let Commands::Config = cli.command {
        return match render_config(&config) {
            Ok(rendered) => {
                print!("{rendered}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("quill: {e}");
                ExitCode::FAILURE
            }
        };
    }

    init_tracing(&config.app.log_level);

    let app = match App::open(&config).await {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = %e, "failed to open storage");
            emit(&ErrorResponse::new("enhancement service is currently unavailable"));
            return ExitCode::FAILURE;
        }
    };

    let code = match run(&app, cli.command).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            emit(&ErrorResponse::new("enhancement service is currently unavailable"));
            ExitCode::FAILURE
        }
    };

    if let Err(e) = app.close().await {
        tracing::warn!(error = %e, "error during shutdown");
    }
    code
}

/// Run one command. `Ok(false)` means a caller-facing failure was printed.
async fn run(app: &App, command: Commands) -> Result<bool, QuillError> {
    match command {
        Commands::Enhance(args) => {
            let request = enhance_request(&args).await?;
            let result = if args.no_session {
                app.enhancer.complete_without_session(&request).await
            } else {
                app.enhancer.enhance(&request).await
            };
            let response = EnhanceResponse::from(result);
            emit(&response);
            Ok(response.success)
        }
        Commands::Status { user, tier } => match app.enhancer.check_status(&user, tier).await {
            Ok(info) => {
                emit(&info);
                Ok(true)
            }
            Err(failure) => {
                emit(&ErrorResponse::new(failure));
                Ok(false)
            }
        },
        Commands::History { user, limit } => {
            let sessions = app.enhancer.history(&user, Some(limit)).await?;
            emit(&sessions);
            Ok(true)
        }
        Commands::Config => Ok(true),
    }
}

async fn enhance_request(args: &EnhanceArgs) -> Result<EnhanceRequest, QuillError> {
    let content = match &args.content {
        Some(content) => content.clone(),
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .map_err(|e| QuillError::Internal(format!("failed to read stdin: {e}")))?;
            buf
        }
    };

    let mut request = EnhanceRequest::new(args.user.clone(), content)
        .with_tier(args.tier)
        .with_options(EnhancementOptions {
            platform: args.platform.clone(),
            tone: args.tone,
            focus: args.focus,
        });
    if let Some(prompt_id) = &args.prompt_id {
        request = request.with_prompt_id(prompt_id.clone());
    }
    Ok(request)
}

fn emit<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("quill: failed to serialize output: {e}"),
    }
}
