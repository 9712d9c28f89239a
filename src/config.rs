use crate::catalog::ProductCatalog;
use serde::Deserialize;
use std::{fs, path::Path, path::PathBuf};

/// Run configuration. Everything has a default matching the operator's
/// usual layout (reports and PODs under one downloads folder), so a
/// missing or empty file is a valid config.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub paths: Paths,
    pub report: ReportConfig,
    pub catalog: ProductCatalog,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Paths {
    /// Folder the POD PDFs were unpacked into.
    pub pods_dir: PathBuf,
    /// Folder holding the Open Orders export and the pipeline outputs.
    pub downloads_dir: PathBuf,
    pub delivered_items: String,
    pub selectable_items: String,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            pods_dir: PathBuf::from("PODs"),
            downloads_dir: PathBuf::from("."),
            delivered_items: "Delivered Items.xlsx".to_string(),
            selectable_items: "Selectable Items.xlsx".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Filename marker for the Open Orders export download.
    pub open_orders_marker: String,
    /// Sheet holding the raw report rows.
    pub open_orders_sheet: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            open_orders_marker: "Open Orders".to_string(),
            open_orders_sheet: "Raw Report".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load from `path` when it exists, defaults otherwise.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn delivered_items_path(&self) -> PathBuf {
        self.paths.downloads_dir.join(&self.paths.delivered_items)
    }

    pub fn selectable_items_path(&self) -> PathBuf {
        self.paths.downloads_dir.join(&self.paths.selectable_items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.paths.pods_dir, PathBuf::from("PODs"));
        assert_eq!(cfg.report.open_orders_sheet, "Raw Report");
        assert!(cfg.catalog.is_headgear("HCS A7035"));
    }

    #[test]
    fn catalog_overrides_replace_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [catalog]
            headgear_codes = ["TEST HG"]

            [catalog.aliases]
            "OLD CODE" = "NEW 12345"
            "#,
        )
        .unwrap();
        assert!(cfg.catalog.is_headgear("TEST HG"));
        assert!(!cfg.catalog.is_headgear("HCS A7035"));
        assert_eq!(cfg.catalog.derive_main_code("OLD CODE"), "12345");
    }

    #[test]
    fn paths_section_overrides() {
        let cfg: Config = toml::from_str(
            r#"
            [paths]
            pods_dir = "/tmp/pods"
            downloads_dir = "/tmp/dl"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.paths.pods_dir, PathBuf::from("/tmp/pods"));
        assert_eq!(
            cfg.delivered_items_path(),
            PathBuf::from("/tmp/dl/Delivered Items.xlsx")
        );
    }
}
