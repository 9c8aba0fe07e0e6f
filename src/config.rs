// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-FlowGen-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of FlowGen and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Server configuration.
//!
//! Values come from command-line overrides first, then from the environment lookup the binary
//! passes in, then from defaults. Library code never reads the process environment itself.

use std::time::Duration;

use crate::extract::ExtractOptions;
use crate::llm::{ModelClientConfig, Provider};
use crate::orchestrator::OrchestratorConfig;

pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MODEL: &str = "deepseek-chat";

pub const API_KEY_VAR: &str = "FLOWGEN_API_KEY";
pub const BASE_URL_VAR: &str = "FLOWGEN_BASE_URL";
pub const MODEL_VAR: &str = "FLOWGEN_MODEL";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub bind: String,
    pub port: u16,
    pub model: ModelClientConfig,
    pub orchestrator: OrchestratorConfig,
    /// Serve with the in-process scripted model instead of a remote endpoint.
    pub demo: bool,
}

/// Explicit settings; `None` falls through to the environment or the default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub start_depth: Option<usize>,
    pub end_depth: Option<usize>,
    pub max_chars: Option<usize>,
    pub max_attempts: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub demo: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("no API key: pass --api-key or set {API_KEY_VAR} (or use --demo)")]
    MissingApiKey,
    #[error("start depth {start} is greater than end depth {end}")]
    DepthRange { start: usize, end: usize },
    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },
}

impl AppConfig {
    /// Resolves overrides against `env` (a variable lookup) and the defaults.
    pub fn resolve(
        overrides: ConfigOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let lookup = |name: &str| env(name).map(|value| value.trim().to_owned()).filter(|value| !value.is_empty());

        let model_name = overrides.model.or_else(|| lookup(MODEL_VAR)).unwrap_or_else(|| DEFAULT_MODEL.to_owned());
        let api_key = match overrides.api_key.or_else(|| lookup(API_KEY_VAR)) {
            Some(key) => key,
            None if overrides.demo => String::new(),
            None => return Err(ConfigError::MissingApiKey),
        };
        let base_url = overrides
            .base_url
            .or_else(|| lookup(BASE_URL_VAR))
            .unwrap_or_else(|| Provider::from_model_name(&model_name).default_base_url().to_owned());

        let defaults = OrchestratorConfig::default();
        let extract = ExtractOptions {
            start_depth: overrides.start_depth.unwrap_or(defaults.extract.start_depth),
            end_depth: overrides.end_depth.unwrap_or(defaults.extract.end_depth),
            max_chars: overrides.max_chars.unwrap_or(defaults.extract.max_chars),
            ..defaults.extract
        };
        if extract.start_depth > extract.end_depth {
            return Err(ConfigError::DepthRange { start: extract.start_depth, end: extract.end_depth });
        }
        if extract.max_chars == 0 {
            return Err(ConfigError::Zero { name: "max chars" });
        }
        let max_attempts = overrides.max_attempts.unwrap_or(defaults.max_attempts);
        if max_attempts == 0 {
            return Err(ConfigError::Zero { name: "max attempts" });
        }
        let model_timeout = match overrides.timeout_secs {
            Some(0) => return Err(ConfigError::Zero { name: "timeout" }),
            Some(secs) => Duration::from_secs(secs),
            None => defaults.model_timeout,
        };

        Ok(Self {
            bind: overrides.bind.unwrap_or_else(|| DEFAULT_BIND.to_owned()),
            port: overrides.port.unwrap_or(DEFAULT_PORT),
            model: ModelClientConfig { api_key, base_url, model_name },
            orchestrator: OrchestratorConfig { extract, max_attempts, model_timeout },
            demo: overrides.demo,
        })
    }
}
