//! Client configuration: backend URL and token storage location.
//! CLI flags override environment variables, which override defaults.

use std::env;
use std::path::PathBuf;

use url::Url;

use crate::error::{AppError, AppResult};

pub const ENV_API_URL: &str = "POSTBOARD_API_URL";
pub const ENV_STORAGE: &str = "POSTBOARD_STORAGE";
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: Url,
    pub storage_path: PathBuf,
}

fn default_storage_path() -> PathBuf {
    let home = env::var_os("HOME").or_else(|| env::var_os("USERPROFILE")).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    home.join(".postboard").join("storage.json")
}

/// Value following `flag`, if present.
pub fn parse_flag_value(args: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        i += 1;
    }
    None
}

pub fn has_flag(args: &[String], flag: &str) -> bool { args.iter().any(|a| a == flag) }

pub fn parse_api_url(raw: &str) -> AppResult<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| AppError::user("bad_api_url".to_string(), format!("invalid API URL '{}': {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AppError::user("bad_api_url".to_string(), format!("API URL must be http or https, got '{}'", other))),
    }
}

impl ClientConfig {
    /// Resolve from explicit values (flags) first, then the environment, then defaults.
    pub fn resolve(api_url: Option<String>, storage: Option<String>) -> AppResult<Self> {
        let api_raw = api_url
            .or_else(|| env::var(ENV_API_URL).ok().filter(|s| !s.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let storage_path = storage
            .or_else(|| env::var(ENV_STORAGE).ok().filter(|s| !s.trim().is_empty()))
            .map(PathBuf::from)
            .unwrap_or_else(default_storage_path);
        Ok(Self { api_url: parse_api_url(&api_raw)?, storage_path })
    }

    pub fn from_args(args: &[String]) -> AppResult<Self> {
        Self::resolve(parse_flag_value(args, "--api-url"), parse_flag_value(args, "--storage"))
    }
}
