//! OCR engine implementations
//!
//! This module contains implementations of the Recognizer trait for different
//! OCR backends. Engines are conditionally compiled based on feature flags.

#[cfg(any(feature = "engine-ocrs", feature = "engine-leptess"))]
mod download;

#[cfg(feature = "engine-ocrs")]
pub mod ocrs;

#[cfg(feature = "engine-leptess")]
pub mod leptess;

use crate::config::Config;
use crate::engine::Recognizer;
use crate::error::OcrError;
use serde::Serialize;
use std::sync::Arc;

/// Information about an available engine
#[derive(Debug, Clone, Serialize)]
pub struct EngineInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub supported_languages: Vec<String>,
}

/// Registry of available OCR engines
pub struct EngineRegistry {
    engines: Vec<Arc<dyn Recognizer>>,
    default_engine: String,
}

impl EngineRegistry {
    /// Create a new engine registry with all compiled-in engines initialized
    #[allow(unused_variables)]
    pub fn new(config: &Config) -> Result<Self, OcrError> {
        #[allow(unused_mut)]
        let mut engines: Vec<Arc<dyn Recognizer>> = Vec::new();

        #[cfg(feature = "engine-ocrs")]
        {
            tracing::info!("Initializing ocrs engine...");
            engines.push(Arc::new(ocrs::OcrsEngine::new()?));
        }

        #[cfg(feature = "engine-leptess")]
        {
            tracing::info!("Initializing leptess engine...");
            engines.push(Arc::new(leptess::LeptessEngine::new(
                config.tessdata_path.as_deref(),
                &config.language,
            )?));
        }

        Self::from_engines(engines)
    }

    /// Build a registry from already initialized engines. The first one is the
    /// default.
    pub fn from_engines(engines: Vec<Arc<dyn Recognizer>>) -> Result<Self, OcrError> {
        let default_engine = engines
            .first()
            .map(|e| e.name().to_string())
            .ok_or_else(|| {
                OcrError::InitializationError(
                    "No OCR engines available. Build with --features engine-ocrs or --features engine-leptess".to_string(),
                )
            })?;

        Ok(Self {
            engines,
            default_engine,
        })
    }

    /// Get an engine by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Recognizer>> {
        self.engines.iter().find(|e| e.name() == name).cloned()
    }

    /// Get the default engine
    pub fn default_engine(&self) -> Option<Arc<dyn Recognizer>> {
        self.get(&self.default_engine)
    }

    /// Get the default engine name
    pub fn default_name(&self) -> &str {
        &self.default_engine
    }

    /// Pick the named engine, or the default when no name is given
    pub fn resolve(&self, name: Option<&str>) -> Result<Arc<dyn Recognizer>, OcrError> {
        match name {
            Some(name) => self.get(name).ok_or_else(|| {
                OcrError::InitializationError(format!(
                    "Unknown engine '{}' (available: {})",
                    name,
                    self.list().join(", ")
                ))
            }),
            None => self.default_engine().ok_or_else(|| {
                OcrError::InitializationError("No default engine".to_string())
            }),
        }
    }

    /// List all available engine names
    pub fn list(&self) -> Vec<&str> {
        self.engines.iter().map(|e| e.name()).collect()
    }

    /// Get info about all available engines
    pub fn info(&self) -> Vec<EngineInfo> {
        self.engines
            .iter()
            .map(|e| EngineInfo {
                name: e.name(),
                description: e.description(),
                supported_languages: e.supported_languages(),
            })
            .collect()
    }
}
