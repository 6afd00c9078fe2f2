//! Configuration Management

use crate::geometry::{PageGeometry, PEN_UNIT_M};
use crate::gesture::DispatchConfig;
use crate::hit_test::HitThresholds;
use crate::interpreter::InterpreterConfig;
use crate::recognition::RecognitionConfig;
use crate::stroke::StrokeConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Dot ingestion settings
    pub capture: CaptureConfig,
    /// Printed page geometry
    pub page: PageConfig,
    /// Stroke assembly and early clicks
    pub strokes: StrokeConfig,
    /// Hit thresholds (meters)
    pub hit_test: HitThresholds,
    /// Gesture size limits (meters)
    pub gesture: DispatchConfig,
    /// Recognition service
    pub recognition: RecognitionConfig,
    /// Annotation catalogue
    pub catalog: CatalogConfig,
}

/// Dot ingestion configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Ring buffer size (power of two)
    pub ring_buffer_size: usize,
    /// Dots processed per drain
    pub batch_size: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            ring_buffer_size: 1024,
            batch_size: 256,
        }
    }
}

/// Page geometry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageConfig {
    /// Page width (pen units)
    pub width: f64,
    /// Page height (pen units)
    pub height: f64,
    /// Meters per pen unit
    pub pen_unit_m: f64,
    /// Scale applied to sticky-note ink
    pub ink_scale: f64,
}

impl Default for PageConfig {
    fn default() -> Self {
        let geometry = PageGeometry::default();
        Self {
            width: geometry.width,
            height: geometry.height,
            pen_unit_m: PEN_UNIT_M,
            ink_scale: 10.0,
        }
    }
}

impl PageConfig {
    pub fn geometry(&self) -> PageGeometry {
        PageGeometry {
            width: self.width,
            height: self.height,
            pen_unit_m: self.pen_unit_m,
        }
    }
}

/// Catalogue location
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub path: Option<PathBuf>,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), crate::Error> {
        let mut errors = Vec::new();

        let size = self.capture.ring_buffer_size;
        if size == 0 || (size & (size - 1)) != 0 {
            errors.push(format!("capture.ring_buffer_size must be a power of 2, got {}", size));
        }
        if self.capture.batch_size == 0 {
            errors.push("capture.batch_size must be > 0".to_string());
        }
        for (name, value) in [
            ("page.width", self.page.width),
            ("page.height", self.page.height),
            ("page.pen_unit_m", self.page.pen_unit_m),
            ("page.ink_scale", self.page.ink_scale),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                errors.push(format!("{} must be positive, got {}", name, value));
            }
        }
        errors.extend(self.strokes.validate());
        errors.extend(self.hit_test.validate());
        errors.extend(self.gesture.validate());
        errors.extend(self.recognition.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(crate::Error::Config(errors.join("; ")))
        }
    }

    /// Interpreter settings derived from this config
    pub fn interpreter_config(&self) -> InterpreterConfig {
        InterpreterConfig {
            page: self.page.geometry(),
            ink_scale: self.page.ink_scale,
            strokes: self.strokes.clone(),
            hit_test: self.hit_test,
            gesture: self.gesture,
            head_timeout_ms: self.recognition.head_timeout_ms,
        }
    }

    /// Load config from file
    pub fn load(path: &Path) -> Result<Self, crate::Error> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from default location
    pub fn load_default() -> Result<Self, crate::Error> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<(), crate::Error> {
        let content = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Save to default location
    pub fn save_default(&self) -> Result<(), crate::Error> {
        self.save(&Self::default_path())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".pen_interpreter").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Generate TOML representation
    pub fn to_toml(&self) -> Result<String, crate::Error> {
        toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))
    }
}
