use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::github::client::DEFAULT_API_URL;
use crate::publish::DEFAULT_COMMIT_MESSAGE;

/// Application configuration loaded from environment variables.
/// Every variable has a default; a malformed value fails startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub github_api_url: String,
    /// Root holding one `<template>/index.html` per allowed template.
    pub templates_dir: PathBuf,
    /// Built sites are written below this directory and deployed from it.
    pub output_dir: PathBuf,
    pub commit_message: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
            github_api_url: env_or("GITHUB_API_URL", DEFAULT_API_URL),
            templates_dir: PathBuf::from(env_or("TEMPLATES_DIR", "templates")),
            output_dir: PathBuf::from(env_or("OUTPUT_DIR", "tmp")),
            commit_message: env_or("DEPLOY_COMMIT_MESSAGE", DEFAULT_COMMIT_MESSAGE),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}
