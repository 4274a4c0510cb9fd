use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::{errors::Error, Result};

/// Typed configuration for the bot, read from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    /// Telegram Bot API token (required).
    pub telegram_bot_token: String,
    /// Bot alias used in registration deep links (`https://t.me/<alias>?start=...`).
    pub bot_alias: String,
    /// Path of the sqlite database holding chat links.
    pub registry_db_path: PathBuf,
    /// Base URL of the schedule backend this bot consumes.
    pub schedule_api_url: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("ROTA_TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "ROTA_TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let bot_alias = env_str("ROTA_BOT_ALIAS")
            .and_then(non_empty)
            .unwrap_or_else(|| "rota_schedule_bot".to_string());

        let registry_db_path = env_str("ROTA_DB_PATH")
            .and_then(non_empty)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("rota.db"));

        let schedule_api_url = env_str("ROTA_SCHEDULE_API_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| "http://localhost:8080".to_string());

        Ok(Self {
            telegram_bot_token,
            bot_alias,
            registry_db_path,
            schedule_api_url,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}
