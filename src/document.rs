//! The persisted configuration: output settings plus every screen, as JSON.
//!
//! Every field is required. A document missing a field, or holding a value the renderer cannot
//! use, fails to load instead of being patched up with defaults.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::compositor::OutputConfig;
use crate::screen::ScreenConfig;

/// Largest accepted output box, in pixels per side.
pub const MAX_SIZE: u32 = 8192;

/// Smallest accepted lattice pitch, in pixels.
pub const MIN_GRID_SIZE: f64 = 1.0;

/// Largest accepted lattice pitch. One cell already spans the largest output box.
pub const MAX_GRID_SIZE: f64 = MAX_SIZE as f64;

/// Largest accepted dot scale relative to the lattice pitch.
pub const MAX_RASTER_SIZE: f64 = 4.0;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Document {
    /// Side of the box the source image is fitted into.
    pub size: u32,
    pub source: SourceConfig,
    pub output: OutputConfig,
    pub screens: Vec<ScreenEntry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SourceConfig {
    pub debug: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ScreenEntry {
    pub index: usize,
    #[serde(flatten)]
    pub config: ScreenConfig,
}

#[derive(Debug)]
pub enum LoadError {
    Json(serde_json::Error),
    BadSize { size: u32 },
    OutOfRange { field: &'static str, value: f64 },
    DuplicateIndex { index: usize },
    UnknownScreen { index: usize },
    EmptyClipboard,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Json(e) => write!(f, "malformed configuration: {}", e),
            LoadError::BadSize { size } => {
                write!(f, "size {} is outside 1..={}", size, MAX_SIZE)
            }
            LoadError::OutOfRange { field, value } => {
                write!(f, "{} = {} is out of range", field, value)
            }
            LoadError::DuplicateIndex { index } => {
                write!(f, "more than one screen has index {}", index)
            }
            LoadError::UnknownScreen { index } => write!(f, "no screen has index {}", index),
            LoadError::EmptyClipboard => write!(f, "clipboard is empty"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(e: serde_json::Error) -> Self {
        LoadError::Json(e)
    }
}

fn check(field: &'static str, value: f64, ok: bool) -> Result<(), LoadError> {
    if ok && value.is_finite() {
        Ok(())
    } else {
        Err(LoadError::OutOfRange { field, value })
    }
}

/// Checks the values a screen needs to render sensibly.
pub fn validate_screen(config: &ScreenConfig) -> Result<(), LoadError> {
    check("angle_degree", config.angle_degree, true)?;
    let grid = config.grid_size;
    check("grid_size", grid, (MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(&grid))?;
    let raster = config.raster_size;
    check("raster_size", raster, (0.0..=MAX_RASTER_SIZE).contains(&raster))?;
    Ok(())
}

impl Document {
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        let document: Document = serde_json::from_str(json)?;
        document.validate()?;
        Ok(document)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), LoadError> {
        if !(1..=MAX_SIZE).contains(&self.size) {
            return Err(LoadError::BadSize { size: self.size });
        }
        let level = self.output.noise_level;
        check("noise_level", level, (0.0..=1.0).contains(&level))?;
        let mut seen = HashSet::with_capacity(self.screens.len());
        for entry in &self.screens {
            if !seen.insert(entry.index) {
                return Err(LoadError::DuplicateIndex { index: entry.index });
            }
            validate_screen(&entry.config)?;
        }
        Ok(())
    }
}

impl Default for Document {
    fn default() -> Self {
        Document {
            size: 512,
            source: SourceConfig { debug: false },
            output: OutputConfig::default(),
            screens: vec![ScreenEntry {
                index: 0,
                config: ScreenConfig::default(),
            }],
        }
    }
}

/// Holds one copied screen configuration, serialized, until it is pasted.
#[derive(Debug, Default, Clone)]
pub struct Clipboard {
    contents: Option<String>,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn copy(&mut self, config: &ScreenConfig) -> Result<(), LoadError> {
        self.contents = Some(serde_json::to_string(config)?);
        Ok(())
    }

    pub fn paste(&self) -> Result<ScreenConfig, LoadError> {
        let text = self.contents.as_deref().ok_or(LoadError::EmptyClipboard)?;
        let config: ScreenConfig = serde_json::from_str(text)?;
        validate_screen(&config)?;
        Ok(config)
    }

    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }

    /// Replaces the contents with text from elsewhere, e.g. the system clipboard. It is only
    /// parsed on paste.
    pub fn set_contents(&mut self, text: String) {
        self.contents = Some(text);
    }
}
