//! Local key-value settings: the stored Gemini credential and model
//! selector, kept as a small JSON file under the user config directory and
//! read back at request time.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};

use super::gemini::DEFAULT_MODEL;

pub const API_KEY_SETTING: &str = "gemini_api_key";
pub const MODEL_SETTING: &str = "gemini_model";

pub struct SettingsStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl SettingsStore {
    /// Open the store at the platform config location, creating nothing
    /// until the first write.
    pub fn load_default() -> Result<Self> {
        let dir = dirs::config_dir().context("no user config directory available")?;
        Self::load_from(dir.join("calories-advisor").join("settings.json"))
    }

    pub fn load_from(path: PathBuf) -> Result<Self> {
        let values = if path.exists() {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("Settings file is not valid JSON: {}", path.display()))?
        } else {
            BTreeMap::new()
        };

        Ok(Self { path, values })
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write settings file: {}", self.path.display()))?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.save()
    }

    pub fn remove(&mut self, key: &str) -> Result<()> {
        if self.values.remove(key).is_some() {
            self.save()?;
        }
        Ok(())
    }

    /// Stored credential, falling back to the environment (`.env` friendly,
    /// same as the server's own fallback).
    pub fn api_key(&self) -> Option<String> {
        self.get(API_KEY_SETTING)
            .map(str::to_string)
            .or_else(|| std::env::var("GEMINI_API_KEY").ok().filter(|v| !v.is_empty()))
    }

    /// Stored model selector, environment override, or the default model.
    pub fn model(&self) -> String {
        self.get(MODEL_SETTING)
            .map(str::to_string)
            .or_else(|| std::env::var("GEMINI_MODEL").ok().filter(|v| !v.is_empty()))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}
