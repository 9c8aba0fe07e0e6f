// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-FlowGen-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of FlowGen and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! FlowGen CLI entrypoint.
//!
//! Serves the HTTP API at `http://<bind>:<port>/api/v1`. The model endpoint is configured with
//! flags or `FLOWGEN_*` environment variables; `--demo` serves a built-in scripted model instead.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use flowgen::config::{AppConfig, ConfigOverrides, DEFAULT_MODEL, DEFAULT_PORT};
use flowgen::llm::{ModelClient, OpenAiClient, ScriptedModel};
use flowgen::server::{router, AppState};
use tracing_subscriber::EnvFilter;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--bind <addr>] [--port <port>] [--model <name>] [--api-key <key>] [--base-url <url>]\n  {program} --demo [--bind <addr>] [--port <port>]\n\nOptions:\n  --start-depth <n>   first extracted level (default 4)\n  --end-depth <n>     last extracted level (default 10)\n  --max-chars <n>     excerpt budget in characters (default 5000)\n  --max-attempts <n>  model calls per request on unusable replies (default 2)\n  --timeout <secs>    model call timeout (default 300)\n\n--port defaults to {DEFAULT_PORT}; --model defaults to {DEFAULT_MODEL}.\nFLOWGEN_API_KEY, FLOWGEN_BASE_URL and FLOWGEN_MODEL are read when the flag is absent.\n--demo answers with a scripted model and needs no API key.\nLog filtering follows RUST_LOG (default flowgen=info)."
    );
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct CliOptions {
    config: ConfigOverrides,
}

fn set_once<T>(slot: &mut Option<T>, value: T) -> Result<(), ()> {
    if slot.is_some() {
        return Err(());
    }
    *slot = Some(value);
    Ok(())
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let mut options = CliOptions::default();
    let config = &mut options.config;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--demo" => {
                if config.demo {
                    return Err(());
                }
                config.demo = true;
            }
            "--bind" => set_once(&mut config.bind, args.next().ok_or(())?)?,
            "--port" => {
                let raw = args.next().ok_or(())?;
                set_once(&mut config.port, raw.parse().map_err(|_| ())?)?;
            }
            "--model" => set_once(&mut config.model, args.next().ok_or(())?)?,
            "--api-key" => set_once(&mut config.api_key, args.next().ok_or(())?)?,
            "--base-url" => set_once(&mut config.base_url, args.next().ok_or(())?)?,
            "--start-depth" => {
                let raw = args.next().ok_or(())?;
                set_once(&mut config.start_depth, raw.parse().map_err(|_| ())?)?;
            }
            "--end-depth" => {
                let raw = args.next().ok_or(())?;
                set_once(&mut config.end_depth, raw.parse().map_err(|_| ())?)?;
            }
            "--max-chars" => {
                let raw = args.next().ok_or(())?;
                set_once(&mut config.max_chars, raw.parse().map_err(|_| ())?)?;
            }
            "--max-attempts" => {
                let raw = args.next().ok_or(())?;
                set_once(&mut config.max_attempts, raw.parse().map_err(|_| ())?)?;
            }
            "--timeout" => {
                let raw = args.next().ok_or(())?;
                set_once(&mut config.timeout_secs, raw.parse().map_err(|_| ())?)?;
            }
            _ => return Err(()),
        }
    }

    if config.demo && (config.api_key.is_some() || config.base_url.is_some()) {
        return Err(());
    }

    Ok(options)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("flowgen=info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn model_client(config: &AppConfig) -> Result<Arc<dyn ModelClient>, Box<dyn Error>> {
    if config.demo {
        return Ok(Arc::new(ScriptedModel::demo().delta_delay(Duration::from_millis(15))));
    }
    let client = OpenAiClient::new(config.model.clone(), config.orchestrator.model_timeout)?;
    tracing::info!(
        model = %config.model.model_name,
        provider = ?client.provider(),
        base_url = %config.model.base_url,
        "using remote model"
    );
    Ok(Arc::new(client))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

fn main() {
    let result = (|| -> Result<(), Box<dyn Error>> {
        let mut args = std::env::args();
        let program = args.next().unwrap_or_else(|| "flowgen".to_owned());

        let options = match parse_options(args) {
            Ok(options) => options,
            Err(()) => {
                print_usage(&program);
                std::process::exit(2);
            }
        };

        init_tracing();
        let config = AppConfig::resolve(options.config, |name| std::env::var(name).ok())?;
        let model = model_client(&config)?;
        let state = AppState::new(model, config.orchestrator.clone(), config.model.model_name.clone());

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;

        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind((config.bind.as_str(), config.port)).await?;
            tracing::info!(address = %listener.local_addr()?, demo = config.demo, "serving /api/v1");
            axum::serve(listener, router(state)).with_graceful_shutdown(shutdown_signal()).await?;
            Ok::<(), Box<dyn Error>>(())
        })?;

        Ok(())
    })();

    if let Err(err) = result {
        eprintln!("flowgen: {err}");
        std::process::exit(1);
    }
}
