use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{DashboardError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    Auto,
}

impl Theme {
    pub fn cycle(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Auto,
            Theme::Auto => Theme::Light,
        }
    }
}

/// Settings read from `dashboard.json`. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DashboardConfig {
    pub data_dir: PathBuf,
    pub page_size: usize,
    pub initial_region: String,
    pub default_region: String,
    /// Region key of the national aggregate on the map.
    pub map_default_region: String,
    pub currency: String,
    pub sample_seed: u64,
    pub theme: Theme,
    pub export_dir: PathBuf,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            page_size: 10,
            initial_region: "hidalgo".into(),
            default_region: "nacional".into(),
            map_default_region: "NACIONAL".into(),
            currency: "MXN".into(),
            sample_seed: 2025,
            theme: Theme::Auto,
            export_dir: PathBuf::from("."),
        }
    }
}

impl DashboardConfig {
    /// Read `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let cfg: Self = serde_json::from_str(&raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Store `theme` in the file at `path`, leaving every other field as the
    /// file has it. Command-line overrides never reach the file.
    pub fn persist_theme(path: &Path, theme: Theme) -> Result<()> {
        let mut on_disk = Self::load(path)?;
        on_disk.theme = theme;
        on_disk.save(path)?;
        info!(path = %path.display(), ?theme, "theme saved");
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(DashboardError::Config("pageSize must be at least 1".into()));
        }
        if self.currency.trim().is_empty() {
            return Err(DashboardError::Config("currency code is empty".into()));
        }
        Ok(())
    }

    pub fn apply_args(&mut self, args: &CliArgs) {
        if let Some(dir) = &args.data_dir {
            self.data_dir = dir.clone();
        }
        if let Some(region) = &args.region {
            self.initial_region = region.clone();
        }
        if let Some(size) = args.page_size {
            self.page_size = size.max(1);
        }
        if let Some(seed) = args.seed {
            self.sample_seed = seed;
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "procurement_dashboard", version, about = "Procurement analytics dashboard")]
pub struct CliArgs {
    /// Config file to read and persist the theme to
    #[arg(long, value_name = "PATH", default_value = "dashboard.json")]
    pub config: PathBuf,

    /// Directory holding the *-data.json files
    #[arg(long = "data-dir", value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    /// Region to show first
    #[arg(long)]
    pub region: Option<String>,

    /// Rows per table page
    #[arg(long = "page-size")]
    pub page_size: Option<usize>,

    /// Seed for generated sample data
    #[arg(long)]
    pub seed: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = DashboardConfig::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(cfg, DashboardConfig::default());
        assert_eq!(cfg.page_size, 10);
        assert_eq!(cfg.initial_region, "hidalgo");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.json");
        std::fs::write(&path, r#"{"theme": "dark", "pageSize": 25}"#).unwrap();
        let cfg = DashboardConfig::load(&path).unwrap();
        assert_eq!(cfg.theme, Theme::Dark);
        assert_eq!(cfg.page_size, 25);
        assert_eq!(cfg.currency, "MXN");
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.json");
        std::fs::write(&path, r#"{"pageSize": 0}"#).unwrap();
        assert!(matches!(DashboardConfig::load(&path), Err(DashboardError::Config(_))));
    }

    #[test]
    fn theme_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.json");
        let mut cfg = DashboardConfig::default();
        cfg.theme = cfg.theme.cycle();
        cfg.save(&path).unwrap();
        assert_eq!(DashboardConfig::load(&path).unwrap().theme, Theme::Light);
    }

    #[test]
    fn theme_change_does_not_save_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.json");
        std::fs::write(&path, r#"{"pageSize": 25}"#).unwrap();

        let args = CliArgs::parse_from([
            "dash",
            "--region",
            "Jalisco",
            "--page-size",
            "5",
            "--seed",
            "9",
        ]);
        let mut runtime = DashboardConfig::load(&path).unwrap();
        runtime.apply_args(&args);
        runtime.theme = runtime.theme.cycle();
        DashboardConfig::persist_theme(&path, runtime.theme).unwrap();

        let saved = DashboardConfig::load(&path).unwrap();
        assert_eq!(saved.theme, Theme::Light);
        assert_eq!(saved.page_size, 25);
        assert_eq!(saved.initial_region, "hidalgo");
        assert_eq!(saved.sample_seed, 2025);
    }

    #[test]
    fn args_override_file() {
        let args = CliArgs::parse_from(["dash", "--region", "Jalisco", "--page-size", "5"]);
        let mut cfg = DashboardConfig::default();
        cfg.apply_args(&args);
        assert_eq!(cfg.initial_region, "Jalisco");
        assert_eq!(cfg.page_size, 5);
        assert_eq!(cfg.data_dir, PathBuf::from("data"));
    }
}
