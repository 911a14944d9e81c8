use crate::api::DEFAULT_SCHEMES;
use crate::intent::deep_link::SEARCH_IN_VIEWPORT_ZOOM;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub import: ImportConfig,
    pub bookmarks: BookmarksConfig,
}

/// Validate a numeric field is within [min, max], clamp if not, and push a warning.
fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    warnings: &mut Vec<String>,
    field: &str,
    value: &mut T,
    min: T,
    max: T,
) {
    debug_assert!(
        min <= max,
        "validate_range: min ({min}) > max ({max}) for {field}"
    );
    if *value < min {
        warnings.push(format!(
            "config: {field} is invalid, expected {min}-{max}, got {value}, clamped to {min}"
        ));
        *value = min;
    } else if *value > max {
        warnings.push(format!(
            "config: {field} is invalid, expected {min}-{max}, got {value}, clamped to {max}"
        ));
        *value = max;
    }
}

/// Reset an empty path setting to its default.
fn validate_dir(warnings: &mut Vec<String>, field: &str, value: &mut String, default: &str) {
    if value.trim().is_empty() {
        warnings.push(format!(
            "config: {field} is invalid, expected non-empty path, reset to default \"{default}\""
        ));
        *value = default.to_string();
    }
}

impl AppConfig {
    /// Clamp out-of-range numbers and reset invalid strings to defaults.
    /// Returns one warning per corrected field.
    pub fn validate(&mut self) -> Vec<String> {
        let mut w = Vec::new();
        let defaults = AppConfig::default();

        // ── Numeric ranges ───────────────────────────────────────
        validate_range(&mut w, "api.search_zoom", &mut self.api.search_zoom, 1, 20);
        validate_range(&mut w, "import.workers", &mut self.import.workers, 1, 16);
        validate_range(
            &mut w,
            "import.max_file_size_bytes",
            &mut self.import.max_file_size_bytes,
            1024,
            1 << 30,
        );

        // ── String validations ───────────────────────────────────
        let schemes: Vec<String> = self
            .api
            .schemes
            .iter()
            .map(|s| s.trim().trim_end_matches("://").to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        if schemes.is_empty() {
            w.push(
                "config: api.schemes is invalid, expected non-empty list, reset to defaults".into(),
            );
            self.api.schemes = defaults.api.schemes;
        } else {
            self.api.schemes = schemes;
        }

        validate_dir(
            &mut w,
            "import.staging_dir",
            &mut self.import.staging_dir,
            &defaults.import.staging_dir,
        );
        validate_dir(
            &mut w,
            "bookmarks.dir",
            &mut self.bookmarks.dir,
            &defaults.bookmarks.dir,
        );

        w
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Deep-link schemes accepted by the parser.
    pub schemes: Vec<String>,
    /// Zoom used when a search or crosshair request recenters the map.
    pub search_zoom: u8,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            schemes: DEFAULT_SCHEMES.iter().map(|s| s.to_string()).collect(),
            search_zoom: SEARCH_IN_VIEWPORT_ZOOM,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub workers: usize,
    pub staging_dir: String,
    pub max_file_size_bytes: u64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            staging_dir: "~/.cache/waymark/staging".into(),
            max_file_size_bytes: 50 * 1024 * 1024,
        }
    }
}

impl ImportConfig {
    pub fn staging_path(&self) -> PathBuf {
        expand_home(&self.staging_dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BookmarksConfig {
    pub dir: String,
}

impl Default for BookmarksConfig {
    fn default() -> Self {
        Self {
            dir: "~/.local/share/waymark/bookmarks".into(),
        }
    }
}

impl BookmarksConfig {
    pub fn path(&self) -> PathBuf {
        expand_home(&self.dir)
    }
}

/// Expand a leading `~/` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("WAYMARK_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("waymark")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

pub fn load_config() -> AppConfig {
    load_config_from_path(&config_path())
}

fn load_config_from_path(path: &PathBuf) -> AppConfig {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_config(&content),
        Err(e) => {
            if path.exists() {
                tracing::warn!(path = %path.display(), error = %e, "failed to read config file, using defaults");
            } else {
                tracing::debug!(path = %path.display(), "config file not found, creating with defaults");
            }

            let cfg = AppConfig::default();
            if let Some(dir) = path.parent() {
                if let Err(e) = std::fs::create_dir_all(dir) {
                    tracing::warn!(dir = %dir.display(), error = %e, "failed to create config directory");
                }
            }
            if let Ok(toml_str) = toml::to_string_pretty(&cfg) {
                if let Err(e) = std::fs::write(path, &toml_str) {
                    tracing::warn!(path = %path.display(), error = %e, "failed to write default config");
                }
            }
            cfg
        }
    }
}

fn parse_config(content: &str) -> AppConfig {
    match toml::from_str(content) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!(error = %e, "failed to parse config TOML, using defaults");
            AppConfig::default()
        }
    }
}

fn env_number<T: std::str::FromStr>(var: &str) -> Option<T> {
    let raw = std::env::var(var).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(var, value = %raw, "ignoring non-numeric env override");
            None
        }
    }
}

fn apply_env_overrides(mut cfg: AppConfig) -> AppConfig {
    if let Some(zoom) = env_number("WAYMARK_SEARCH_ZOOM") {
        cfg.api.search_zoom = zoom;
    }
    if let Some(workers) = env_number("WAYMARK_IMPORT_WORKERS") {
        cfg.import.workers = workers;
    }
    if let Ok(dir) = std::env::var("WAYMARK_STAGING_DIR") {
        cfg.import.staging_dir = dir;
    }
    if let Ok(dir) = std::env::var("WAYMARK_BOOKMARKS_DIR") {
        cfg.bookmarks.dir = dir;
    }
    cfg
}

/// Apply env overrides, validate, log any warnings, and return the finalized config.
fn finalize_config(cfg: AppConfig) -> AppConfig {
    let mut cfg = apply_env_overrides(cfg);
    for w in &cfg.validate() {
        tracing::warn!(message = %w, "config validation");
    }
    cfg
}

pub fn init_config() -> &'static AppConfig {
    CONFIG.get_or_init(|| finalize_config(load_config()))
}

pub fn get_config() -> &'static AppConfig {
    CONFIG
        .get()
        .expect("Config not initialized. Call init_config() first.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.api.schemes, ["om", "mapsme", "mwm", "mapswithme"]);
        assert_eq!(cfg.api.search_zoom, 16);
        assert_eq!(cfg.import.workers, 2);
        assert_eq!(cfg.import.max_file_size_bytes, 50 * 1024 * 1024);
        assert!(cfg.bookmarks.dir.ends_with("bookmarks"));
    }

    #[test]
    fn parse_empty_string_returns_defaults() {
        let cfg = parse_config("");
        assert_eq!(cfg.api.search_zoom, 16);
        assert_eq!(cfg.import.workers, 2);
    }

    #[test]
    fn parse_partial_config_fills_defaults() {
        let cfg = parse_config(
            r#"
[api]
search_zoom = 12
"#,
        );
        assert_eq!(cfg.api.search_zoom, 12);
        assert_eq!(cfg.api.schemes.len(), 4);
        assert_eq!(cfg.import.workers, 2);
    }

    #[test]
    fn parse_full_config() {
        let cfg = parse_config(
            r#"
[api]
schemes = ["geo-app"]
search_zoom = 14

[import]
workers = 4
staging_dir = "/var/tmp/stage"
max_file_size_bytes = 4096

[bookmarks]
dir = "/srv/bookmarks"
"#,
        );
        assert_eq!(cfg.api.schemes, ["geo-app"]);
        assert_eq!(cfg.api.search_zoom, 14);
        assert_eq!(cfg.import.workers, 4);
        assert_eq!(cfg.import.staging_path(), PathBuf::from("/var/tmp/stage"));
        assert_eq!(cfg.import.max_file_size_bytes, 4096);
        assert_eq!(cfg.bookmarks.path(), PathBuf::from("/srv/bookmarks"));
    }

    #[test]
    fn parse_invalid_toml_returns_defaults() {
        let cfg = parse_config("this is not [valid toml");
        assert_eq!(cfg.api.search_zoom, 16);
    }

    #[test]
    fn config_path_ends_with_toml() {
        let path = config_path();
        assert_eq!(path.extension().unwrap(), "toml");
    }

    #[test]
    fn load_nonexistent_writes_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("waymark/config.toml");
        let cfg = load_config_from_path(&path);
        assert_eq!(cfg.api.search_zoom, 16);
        assert!(path.exists());
        let written = parse_config(&std::fs::read_to_string(&path).unwrap());
        assert_eq!(written.import.workers, cfg.import.workers);
    }

    #[test]
    fn expand_home_only_touches_tilde_prefix() {
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_home("rel/~/x"), PathBuf::from("rel/~/x"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/maps"), home.join("maps"));
        }
    }

    #[test]
    fn env_override_search_zoom() {
        std::env::set_var("WAYMARK_SEARCH_ZOOM", "11");
        let cfg = apply_env_overrides(AppConfig::default());
        std::env::remove_var("WAYMARK_SEARCH_ZOOM");
        assert_eq!(cfg.api.search_zoom, 11);
    }

    #[test]
    fn env_override_import_workers_ignores_garbage() {
        std::env::set_var("WAYMARK_IMPORT_WORKERS", "lots");
        let cfg = apply_env_overrides(AppConfig::default());
        std::env::remove_var("WAYMARK_IMPORT_WORKERS");
        assert_eq!(cfg.import.workers, 2);
    }

    #[test]
    fn env_override_dirs() {
        std::env::set_var("WAYMARK_STAGING_DIR", "/tmp/stage-override");
        std::env::set_var("WAYMARK_BOOKMARKS_DIR", "/tmp/bm-override");
        let cfg = apply_env_overrides(AppConfig::default());
        std::env::remove_var("WAYMARK_STAGING_DIR");
        std::env::remove_var("WAYMARK_BOOKMARKS_DIR");
        assert_eq!(cfg.import.staging_dir, "/tmp/stage-override");
        assert_eq!(cfg.bookmarks.dir, "/tmp/bm-override");
    }

    #[test]
    fn env_override_config_dir() {
        let tmp = tempfile::TempDir::new().unwrap();
        let custom_dir = tmp.path().join("custom-waymark");

        std::env::set_var("WAYMARK_CONFIG_DIR", &custom_dir);
        let dir = config_dir();
        std::env::remove_var("WAYMARK_CONFIG_DIR");
        assert_eq!(dir, custom_dir);
    }

    #[test]
    fn serializes_to_valid_toml() {
        let cfg = AppConfig::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        assert!(toml_str.contains("[api]"));
        assert!(toml_str.contains("[import]"));
        let back: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(back.api.schemes, cfg.api.schemes);
    }

    // ── Config validation tests ──────────────────────────────────────

    /// Helper: validate a config modified by `setup`, assert it warns about `field`
    /// and that `get_value` returns `expected` after validation.
    fn assert_clamps<T: PartialEq + std::fmt::Debug>(
        field: &str,
        setup: impl FnOnce(&mut AppConfig),
        get_value: impl FnOnce(&AppConfig) -> T,
        expected: T,
    ) {
        let mut cfg = AppConfig::default();
        setup(&mut cfg);
        let warnings = cfg.validate();
        assert!(
            warnings.iter().any(|w| w.contains(field)),
            "{field} should produce a warning, got: {warnings:?}"
        );
        assert_eq!(
            get_value(&cfg),
            expected,
            "{field} should be clamped to {expected:?}"
        );
    }

    #[test]
    fn test_validate_valid_defaults() {
        let mut cfg = AppConfig::default();
        let warnings = cfg.validate();
        assert!(
            warnings.is_empty(),
            "default config should pass validation, got: {warnings:?}"
        );
    }

    #[test]
    fn test_validate_search_zoom_bounds() {
        assert_clamps(
            "api.search_zoom",
            |c| c.api.search_zoom = 0,
            |c| c.api.search_zoom,
            1,
        );
        assert_clamps(
            "api.search_zoom",
            |c| c.api.search_zoom = 25,
            |c| c.api.search_zoom,
            20,
        );
    }

    #[test]
    fn test_validate_workers_bounds() {
        assert_clamps("import.workers", |c| c.import.workers = 0, |c| c.import.workers, 1);
        assert_clamps("import.workers", |c| c.import.workers = 64, |c| c.import.workers, 16);
    }

    #[test]
    fn test_validate_max_file_size_bounds() {
        assert_clamps(
            "import.max_file_size_bytes",
            |c| c.import.max_file_size_bytes = 10,
            |c| c.import.max_file_size_bytes,
            1024,
        );
        assert_clamps(
            "import.max_file_size_bytes",
            |c| c.import.max_file_size_bytes = u64::MAX,
            |c| c.import.max_file_size_bytes,
            1 << 30,
        );
    }

    #[test]
    fn test_validate_empty_schemes_reset() {
        assert_clamps(
            "api.schemes",
            |c| c.api.schemes = vec!["  ".into()],
            |c| c.api.schemes.len(),
            4,
        );
    }

    #[test]
    fn test_validate_normalizes_schemes() {
        let mut cfg = AppConfig::default();
        cfg.api.schemes = vec![" GEO:// ".into(), "om".into()];
        assert!(cfg.validate().is_empty());
        assert_eq!(cfg.api.schemes, ["geo", "om"]);
    }

    #[test]
    fn test_validate_empty_dirs_reset() {
        assert_clamps(
            "import.staging_dir",
            |c| c.import.staging_dir = " ".into(),
            |c| c.import.staging_dir.clone(),
            ImportConfig::default().staging_dir,
        );
        assert_clamps(
            "bookmarks.dir",
            |c| c.bookmarks.dir = String::new(),
            |c| c.bookmarks.dir.clone(),
            BookmarksConfig::default().dir,
        );
    }
}
