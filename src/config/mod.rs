// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the simulator
//!
//! The configuration is backed by a YAML file and validated against a JSON
//! schema before deserialization. A default file is created on first run so
//! a bare invocation works out of the box.
//!
//! ## Configuration Structure
//!
//! - `modbus`: network settings for the Modbus TCP server
//! - `simulation`: cadence of the periodic regeneration pass
//!
//! ## Usage
//!
//! ```no_run
//! use modbus_simulator::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(Some("127.0.0.1".to_string()), Some(1502), None);
//!
//! println!("Serving on {}:{}", config.modbus.address, config.modbus.port);
//! ```

pub mod modbus;
pub mod simulation;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

// Re-export all types for public API
pub use modbus::ModbusConfig;
pub use simulation::SimulationConfig;

/// Root configuration structure for the simulator.
///
/// Each section uses default values when not explicitly specified in the
/// configuration file, allowing for minimal configuration when custom
/// settings are not required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Settings for the Modbus TCP server component.
    #[serde(default)]
    pub modbus: ModbusConfig,

    /// Settings for the periodic regeneration task.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            modbus: ModbusConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a file.
    ///
    /// If the file does not exist, a default configuration is written there
    /// and returned. The file contents are validated against the bundled
    /// JSON schema before deserialization.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        // First step: convert YAML to a generic Value
        let yaml_value: serde_yml::Value = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML configuration from {:?}", path))?;

        // Convert to JSON Value for validation
        let json_value = serde_json::to_value(&yaml_value).with_context(|| {
            format!("Failed to convert YAML to JSON for validation: {:?}", path)
        })?;

        // Load and validate with the schema
        let schema_str = include_str!("../../resources/config.schema.json");
        let schema: serde_json::Value =
            serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;

        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        debug!("Validating {} configuration against schema", path.display());
        if let Err(validation_error) = validator.validate(&json_value) {
            error!(
                "Configuration file {} is invalid: {}",
                path.display(),
                validation_error
            );
            anyhow::bail!("Invalid configuration: {validation_error}");
        }

        serde_yml::from_value(yaml_value)
            .with_context(|| format!("Failed to deserialize configuration from {:?}", path))
    }

    /// Save the configuration as YAML.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        fs::write(path.as_ref(), yaml)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only values that are explicitly provided override the file contents.
    pub fn apply_args(
        &mut self,
        modbus_address: Option<String>,
        modbus_port: Option<u16>,
        tick_interval_ms: Option<u64>,
    ) {
        if let Some(address) = modbus_address {
            self.modbus.address = address;
        }
        if let Some(port) = modbus_port {
            self.modbus.port = port;
        }
        if let Some(interval) = tick_interval_ms {
            self.simulation.tick_interval_ms = interval;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_creates_and_returns_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let config = Config::from_file(&path).unwrap();
        assert!(path.exists());
        assert!(config.modbus.enabled);
        assert_eq!(config.modbus.port, 502);
        assert_eq!(config.simulation.tick_interval_ms, 1000);

        // the created file loads back unchanged
        let reloaded = Config::from_file(&path).unwrap();
        assert_eq!(reloaded.modbus.address, config.modbus.address);
    }

    #[test]
    fn partial_file_falls_back_to_section_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "modbus:\n  enabled: false\n  port: 1502\n  address: 127.0.0.1\n")
            .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert!(!config.modbus.enabled);
        assert_eq!(config.modbus.port, 1502);
        assert!(config.simulation.enabled);
    }

    #[test]
    fn invalid_values_are_rejected_by_the_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "modbus:\n  enabled: yes please\n").unwrap();

        assert!(Config::from_file(&path).is_err());
    }

    #[test]
    fn cli_overrides_take_precedence() {
        let mut config = Config::default();
        config.apply_args(Some("127.0.0.1".to_string()), Some(10502), Some(250));
        assert_eq!(config.modbus.address, "127.0.0.1");
        assert_eq!(config.modbus.port, 10502);
        assert_eq!(config.simulation.tick_interval_ms, 250);
        config.apply_args(None, None, None);
        assert_eq!(config.modbus.port, 10502);
    }
}
