// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Simulation scheduler configuration

use serde::{Deserialize, Serialize};

/// Configuration for the periodic regeneration task.
///
/// The address map itself is static; only the cadence of the regeneration
/// pass is configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Flag to enable or disable periodic regeneration.
    ///
    /// When disabled the tables keep their startup contents and only change
    /// through client writes.
    pub enabled: bool,

    /// Milliseconds between regeneration passes.
    pub tick_interval_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_interval_ms: 1000,
        }
    }
}
