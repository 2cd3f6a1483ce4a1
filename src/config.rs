use crate::gemini::GeminiConfig;
use crate::model::{ColorTheme, Outfit, PetAppearance, Species, UserMode};
use anyhow::{Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Parser, Debug, Clone)]
#[command(name = "nexuspet")]
#[command(about = "A tiny chat companion that lives in your terminal")]
pub(crate) struct Cli {
    /// Starting mode
    #[arg(long, value_enum)]
    pub(crate) mode: Option<UserMode>,

    /// Pet name
    #[arg(long)]
    pub(crate) name: Option<String>,

    #[arg(long, value_enum)]
    pub(crate) species: Option<Species>,

    #[arg(long, value_enum)]
    pub(crate) outfit: Option<Outfit>,

    #[arg(long, value_enum)]
    pub(crate) color: Option<ColorTheme>,

    /// Model id, e.g. gemini-2.5-flash
    #[arg(long)]
    pub(crate) model: Option<String>,

    /// API base URL (overrides settings file)
    #[arg(long)]
    pub(crate) api_base: Option<String>,

    /// Force monochrome (no colors)
    #[arg(long, default_value_t = false)]
    pub(crate) mono: bool,

    /// Draw the pet with ASCII instead of braille
    #[arg(long, default_value_t = false)]
    pub(crate) ascii: bool,

    /// Settings file to read instead of the default location
    #[arg(long)]
    pub(crate) settings: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub(crate) struct Settings {
    pub(crate) model: String,
    pub(crate) api_base: String,
    pub(crate) temperature: f32,
    pub(crate) max_output_tokens: u32,
    pub(crate) fps_cap: u32,
    pub(crate) enable_color: bool,
    pub(crate) enable_braille: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            api_base: "https://generativelanguage.googleapis.com".to_string(),
            temperature: 0.7,
            max_output_tokens: 2000,
            fps_cap: 30,
            enable_color: true,
            enable_braille: true,
        }
    }
}

pub(crate) struct Paths {
    pub(crate) settings_path: PathBuf,
    pub(crate) log_path: PathBuf,
}

pub(crate) fn project_paths() -> Result<Paths> {
    let proj = ProjectDirs::from("com", "nexuspet", "NexusPet")
        .context("could not resolve project directories")?;
    let data = proj.data_local_dir().to_path_buf();
    fs::create_dir_all(&data)
        .with_context(|| format!("could not create {}", data.display()))?;
    Ok(Paths {
        settings_path: proj.config_dir().join("settings.json"),
        log_path: data.join("nexuspet.log"),
    })
}

/// Missing or unreadable settings fall back to defaults. Never written back.
pub(crate) fn load_settings(path: &Path) -> Settings {
    let Ok(s) = fs::read_to_string(path) else {
        return Settings::default();
    };
    match serde_json::from_str::<Settings>(&s) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed settings");
            Settings::default()
        }
    }
}

/// `GEMINI_API_KEY`, then `API_KEY`.
pub(crate) fn api_key_from_env() -> Option<String> {
    ["GEMINI_API_KEY", "API_KEY"]
        .iter()
        .filter_map(|k| std::env::var(k).ok())
        .find(|v| !v.trim().is_empty())
}

#[derive(Clone, Debug)]
pub(crate) struct AppConfig {
    pub(crate) mode: UserMode,
    pub(crate) appearance: PetAppearance,
    pub(crate) gemini: GeminiConfig,
    pub(crate) fps_cap: u32,
    pub(crate) enable_color: bool,
    pub(crate) enable_braille: bool,
}

impl AppConfig {
    /// CLI beats environment beats settings file beats defaults.
    pub(crate) fn resolve(cli: &Cli, settings: Settings, api_key: Option<String>) -> Self {
        let defaults = PetAppearance::default();
        let appearance = PetAppearance {
            name: cli
                .name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(|n| n.chars().take(crate::model::NAME_MAX).collect())
                .unwrap_or(defaults.name),
            species: cli.species.unwrap_or(defaults.species),
            outfit: cli.outfit.unwrap_or(defaults.outfit),
            color: cli.color.unwrap_or(defaults.color),
        };

        Self {
            mode: cli.mode.unwrap_or(UserMode::Student),
            appearance,
            gemini: GeminiConfig {
                api_key: api_key.unwrap_or_default(),
                api_base: cli.api_base.clone().unwrap_or(settings.api_base),
                model: cli.model.clone().unwrap_or(settings.model),
                temperature: settings.temperature.clamp(0.0, 2.0),
                max_output_tokens: settings.max_output_tokens.max(1),
            },
            fps_cap: settings.fps_cap.clamp(10, 120),
            enable_color: settings.enable_color && !cli.mono,
            enable_braille: settings.enable_braille && !cli.ascii,
        }
    }
}
