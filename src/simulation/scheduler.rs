// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Periodic regeneration scheduler
//!
//! Drives one [`SimulationEngine::tick`] per fixed period until the shared
//! running flag is cleared. The engine's eager initialization already
//! produced the tick-zero contents, so the first pass fires one period
//! after startup.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::{debug, info};
use tokio::time::interval;

use super::engine::SimulationEngine;

/// Periodic driver for the simulation engine.
pub struct SimulationScheduler {
    engine: Arc<SimulationEngine>,
    period: Duration,
}

impl SimulationScheduler {
    pub fn new(engine: Arc<SimulationEngine>, period: Duration) -> Self {
        Self { engine, period }
    }

    /// Run until `running` is cleared. Each regeneration pass completes
    /// synchronously before the next wait begins.
    pub async fn run(self, running: Arc<AtomicBool>) -> Result<()> {
        info!(
            "Simulation scheduler started, regenerating every {:?}",
            self.period
        );

        let mut ticker = interval(self.period);
        // an interval's first tick completes immediately; consume it so the
        // first regeneration happens one full period after startup
        ticker.tick().await;

        while running.load(Ordering::SeqCst) {
            ticker.tick().await;
            self.engine.tick();

            let ticks = self.engine.ticks();
            if ticks % 60 == 0 {
                debug!("completed {} regeneration passes", ticks);
            }
        }

        info!("Simulation scheduler stopped");
        Ok(())
    }
}
