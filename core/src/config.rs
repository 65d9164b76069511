//! Engine configuration (TOML)
//!
//! Read once at engine construction. Missing files and missing keys fall
//! back to defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    /// Video/graphics settings
    #[serde(default)]
    pub video: VideoConfig,
}

/// Video and rendering configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Allow linear texture filtering when a group asks for it (default: true)
    #[serde(default = "default_true")]
    pub texture_filtering: bool,
    /// Keep a 4:3 view centered in wider windows (default: true)
    #[serde(default = "default_true")]
    pub preserve_aspect_ratio: bool,
    /// Window width in pixels (default: 640)
    #[serde(default = "default_width")]
    pub width: u32,
    /// Window height in pixels (default: 480)
    #[serde(default = "default_height")]
    pub height: u32,
    /// Graphics backend name (default: "auto")
    #[serde(default = "default_backend")]
    pub backend: String,
}

fn default_true() -> bool {
    true
}
fn default_width() -> u32 {
    640
}
fn default_height() -> u32 {
    480
}
fn default_backend() -> String {
    "auto".to_string()
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            texture_filtering: default_true(),
            preserve_aspect_ratio: default_true(),
            width: default_width(),
            height: default_height(),
            backend: default_backend(),
        }
    }
}

impl VideoConfig {
    /// Parsed [`backend`](Self::backend) name.
    pub fn backend_kind(&self) -> BackendKind {
        BackendKind::parse(&self.backend)
    }
}

/// Graphics API selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Let the backend pick
    #[default]
    Auto,
    Vulkan,
    Metal,
    Dx12,
    OpenGl,
}

impl BackendKind {
    /// Parse a backend name, case-insensitively. Unknown names fall back
    /// to [`BackendKind::Auto`].
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => BackendKind::Auto,
            "vulkan" => BackendKind::Vulkan,
            "metal" => BackendKind::Metal,
            "dx12" | "direct3d12" | "d3d12" => BackendKind::Dx12,
            "opengl" | "gl" => BackendKind::OpenGl,
            other => {
                tracing::warn!("unknown backend '{}', using auto", other);
                BackendKind::Auto
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Auto => "auto",
            BackendKind::Vulkan => "vulkan",
            BackendKind::Metal => "metal",
            BackendKind::Dx12 => "dx12",
            BackendKind::OpenGl => "opengl",
        }
    }
}

impl EngineConfig {
    /// Load the configuration at `path`.
    ///
    /// Returns defaults if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the configuration to `path` as pretty TOML, creating parent
    /// directories as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(write_err)?;
        }
        std::fs::write(path, content).map_err(write_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =============================================================
    // Default value tests
    // =============================================================

    #[test]
    fn test_config_default() {
        let config = EngineConfig::default();
        assert!(config.video.texture_filtering);
        assert!(config.video.preserve_aspect_ratio);
        assert_eq!(config.video.width, 640);
        assert_eq!(config.video.height, 480);
        assert_eq!(config.video.backend_kind(), BackendKind::Auto);
    }

    #[test]
    fn test_config_deserialize_empty() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_config_partial_section() {
        let config: EngineConfig = toml::from_str("[video]\nwidth = 1280\n").unwrap();
        assert_eq!(config.video.width, 1280);
        assert_eq!(config.video.height, 480);
        assert!(config.video.texture_filtering);
    }

    #[test]
    fn test_config_ignores_window_keys() {
        // presentation keys from windowed front ends are not engine settings
        let config: EngineConfig = toml::from_str("[video]\nvsync = false\nfullscreen = true\nheight = 720\n").unwrap();
        assert_eq!(config.video.height, 720);
        assert_eq!(
            config,
            EngineConfig {
                video: VideoConfig {
                    height: 720,
                    ..Default::default()
                },
            }
        );
        let saved = toml::to_string_pretty(&config).unwrap();
        assert!(!saved.contains("vsync"));
        assert!(!saved.contains("fullscreen"));
    }

    // =============================================================
    // Backend names
    // =============================================================

    #[test]
    fn test_backend_parse() {
        assert_eq!(BackendKind::parse("Vulkan"), BackendKind::Vulkan);
        assert_eq!(BackendKind::parse("metal"), BackendKind::Metal);
        assert_eq!(BackendKind::parse("DX12"), BackendKind::Dx12);
        assert_eq!(BackendKind::parse("OpenGL"), BackendKind::OpenGl);
        assert_eq!(BackendKind::parse("auto"), BackendKind::Auto);
        assert_eq!(BackendKind::parse("glide"), BackendKind::Auto);
    }

    #[test]
    fn test_backend_names_roundtrip() {
        for kind in [
            BackendKind::Auto,
            BackendKind::Vulkan,
            BackendKind::Metal,
            BackendKind::Dx12,
            BackendKind::OpenGl,
        ] {
            assert_eq!(BackendKind::parse(kind.as_str()), kind);
        }
    }

    // =============================================================
    // File I/O
    // =============================================================

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load(dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("fixedfn.toml");
        let mut config = EngineConfig::default();
        config.video.texture_filtering = false;
        config.video.backend = "vulkan".into();
        config.video.width = 1920;
        config.video.height = 1080;

        config.save(&path).unwrap();
        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.video.backend_kind(), BackendKind::Vulkan);
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[video\nwidth = ").unwrap();
        assert!(matches!(EngineConfig::load(&path), Err(ConfigError::Parse { .. })));
    }
}
