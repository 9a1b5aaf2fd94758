//! User settings, loaded from the local store once and passed explicitly to the
//! executor and the AI flows.
//!
//! Every setting is read independently: a missing, unparsable or out-of-range value falls
//! back to its own default without affecting the others.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::db::Store;

pub const THEME_KEY: &str = "theme";
pub const SNIPPET_LANGUAGE_KEY: &str = "snippetLanguage";
pub const BEARER_TOKEN_KEY: &str = "bearerToken";
pub const AI_CREATIVITY_KEY: &str = "aiCreativity";
pub const REQUEST_TIMEOUT_KEY: &str = "requestTimeout";
pub const SSL_VERIFICATION_KEY: &str = "sslVerification";

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("Unknown setting '{0}'")]
    UnknownKey(String),

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl FromStr for Theme {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(()),
        }
    }
}

/// Languages offered for generated code snippets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SnippetLanguage {
    #[default]
    JavaScript,
    TypeScript,
    #[serde(rename = "Node.js")]
    NodeJs,
    Python,
    Go,
    Java,
    #[serde(rename = "C#")]
    CSharp,
    Ruby,
}

impl SnippetLanguage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnippetLanguage::JavaScript => "JavaScript",
            SnippetLanguage::TypeScript => "TypeScript",
            SnippetLanguage::NodeJs => "Node.js",
            SnippetLanguage::Python => "Python",
            SnippetLanguage::Go => "Go",
            SnippetLanguage::Java => "Java",
            SnippetLanguage::CSharp => "C#",
            SnippetLanguage::Ruby => "Ruby",
        }
    }

    pub fn all() -> Vec<Self> {
        vec![
            SnippetLanguage::JavaScript,
            SnippetLanguage::TypeScript,
            SnippetLanguage::NodeJs,
            SnippetLanguage::Python,
            SnippetLanguage::Go,
            SnippetLanguage::Java,
            SnippetLanguage::CSharp,
            SnippetLanguage::Ruby,
        ]
    }
}

impl FromStr for SnippetLanguage {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::all()
            .into_iter()
            .find(|lang| lang.as_str().eq_ignore_ascii_case(wanted))
            .ok_or(())
    }
}

impl fmt::Display for SnippetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub theme: Theme,
    pub snippet_language: SnippetLanguage,
    pub bearer_token: String,
    pub ai_creativity: f32,
    pub request_timeout_ms: u64,
    pub ssl_verification: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            snippet_language: SnippetLanguage::JavaScript,
            bearer_token: String::new(),
            ai_creativity: 0.5,
            request_timeout_ms: 30_000,
            ssl_verification: true,
        }
    }
}

impl Settings {
    pub const KEYS: [&'static str; 6] = [
        THEME_KEY,
        SNIPPET_LANGUAGE_KEY,
        BEARER_TOKEN_KEY,
        AI_CREATIVITY_KEY,
        REQUEST_TIMEOUT_KEY,
        SSL_VERIFICATION_KEY,
    ];

    /// Read all settings from the store, defaulting each one independently.
    pub fn load(store: &Store) -> Result<Self> {
        let mut settings = Settings::default();
        for key in Self::KEYS {
            let Some(raw) = store.get(key)? else {
                continue;
            };
            if let Err(e) = settings.set(key, &raw) {
                log::warn!("Ignoring stored setting: {}", e);
            }
        }
        Ok(settings)
    }

    pub fn save(&self, store: &Store) -> Result<()> {
        for key in Self::KEYS {
            store.set(key, &self.get(key).unwrap_or_default())?;
        }
        Ok(())
    }

    /// Stored text form of a setting.
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            THEME_KEY => self.theme.as_str().to_string(),
            SNIPPET_LANGUAGE_KEY => self.snippet_language.as_str().to_string(),
            BEARER_TOKEN_KEY => self.bearer_token.clone(),
            AI_CREATIVITY_KEY => self.ai_creativity.to_string(),
            REQUEST_TIMEOUT_KEY => self.request_timeout_ms.to_string(),
            SSL_VERIFICATION_KEY => self.ssl_verification.to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// Parse and apply one setting from its text form.
    pub fn set(&mut self, key: &str, value: &str) -> std::result::Result<(), SettingsError> {
        match key {
            THEME_KEY => {
                self.theme = value
                    .parse()
                    .map_err(|_| invalid(THEME_KEY, value, "expected light or dark"))?;
            }
            SNIPPET_LANGUAGE_KEY => {
                self.snippet_language = value
                    .parse()
                    .map_err(|_| invalid(SNIPPET_LANGUAGE_KEY, value, "unsupported language"))?;
            }
            BEARER_TOKEN_KEY => self.bearer_token = value.to_string(),
            AI_CREATIVITY_KEY => {
                let creativity: f32 = value
                    .trim()
                    .parse()
                    .map_err(|_| invalid(AI_CREATIVITY_KEY, value, "expected a number"))?;
                if !(0.0..=1.0).contains(&creativity) {
                    return Err(invalid(AI_CREATIVITY_KEY, value, "must be between 0 and 1"));
                }
                self.ai_creativity = creativity;
            }
            REQUEST_TIMEOUT_KEY => {
                self.request_timeout_ms = value.trim().parse().map_err(|_| {
                    invalid(REQUEST_TIMEOUT_KEY, value, "expected milliseconds")
                })?;
            }
            SSL_VERIFICATION_KEY => {
                self.ssl_verification = value
                    .trim()
                    .parse()
                    .map_err(|_| invalid(SSL_VERIFICATION_KEY, value, "expected true or false"))?;
            }
            _ => return Err(SettingsError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// Timeout applied by the HTTP client; zero disables it.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }
}

fn invalid(key: &'static str, value: &str, reason: &'static str) -> SettingsError {
    SettingsError::InvalidValue {
        key,
        value: value.to_string(),
        reason,
    }
}
