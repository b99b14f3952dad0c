// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! The owned simulation engine
//!
//! [`SimulationEngine`] bundles the four data tables, the override tracker
//! and the generator cursors behind a single mutex. Protocol handlers and
//! the scheduler share one engine through an `Arc`; the lock is held for the
//! duration of one read, one write or one whole regeneration pass, so an
//! acknowledged write is excluded from the next tick at the latest.

use std::sync::Mutex;

use log::{debug, error};

use super::bank::{BankError, BitBank, RegisterBank, BIT_COUNT, REGISTER_COUNT};
use super::generator::ValueGenerator;
use super::overrides::OverrideTracker;
use super::{BitTable, RegisterTable};

struct EngineState {
    holding: RegisterBank,
    input: RegisterBank,
    coils: BitBank,
    discrete: BitBank,
    overrides: OverrideTracker,
    generator: ValueGenerator,
    ticks: u64,
}

/// Thread-safe data-point bank with per-tick value regeneration.
pub struct SimulationEngine {
    state: Mutex<EngineState>,
}

impl Default for SimulationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationEngine {
    /// Create an engine and run the eager initialization pass, so every
    /// table already holds its tick-zero contents before the first tick.
    pub fn new() -> Self {
        let mut state = EngineState {
            holding: RegisterBank::new(REGISTER_COUNT),
            input: RegisterBank::new(REGISTER_COUNT),
            coils: BitBank::new(BIT_COUNT),
            discrete: BitBank::new(BIT_COUNT),
            overrides: OverrideTracker::new(),
            generator: ValueGenerator::new(),
            ticks: 0,
        };
        let EngineState {
            holding,
            coils,
            discrete,
            generator,
            ..
        } = &mut state;
        if let Err(err) = generator.initialize(holding, coils, discrete) {
            // the static address map fits the fixed table sizes
            error!("initial table population failed: {err}");
        }
        Self {
            state: Mutex::new(state),
        }
    }

    /// Read `count` registers from the given table.
    pub fn read_registers(
        &self,
        table: RegisterTable,
        start: u16,
        count: u16,
    ) -> Result<Vec<u16>, BankError> {
        let state = self.state.lock().unwrap();
        let bank = match table {
            RegisterTable::Holding => &state.holding,
            RegisterTable::Input => &state.input,
        };
        bank.read(start, count)
    }

    /// Write raw register values and mark every touched address as
    /// client-written, excluding it from all future regeneration.
    pub fn write_registers(
        &self,
        table: RegisterTable,
        start: u16,
        values: &[u16],
    ) -> Result<(), BankError> {
        let state = &mut *self.state.lock().unwrap();
        let bank = match table {
            RegisterTable::Holding => &mut state.holding,
            RegisterTable::Input => &mut state.input,
        };
        bank.write(start, values)?;
        state.overrides.mark_range(table.into(), start, values.len());
        debug!(
            "{} register(s) at {} in the {:?} table marked client-written",
            values.len(),
            start,
            table
        );
        Ok(())
    }

    /// Read `count` bits from the given table.
    pub fn read_bits(
        &self,
        table: BitTable,
        start: u16,
        count: u16,
    ) -> Result<Vec<bool>, BankError> {
        let state = self.state.lock().unwrap();
        let bank = match table {
            BitTable::Coil => &state.coils,
            BitTable::Discrete => &state.discrete,
        };
        bank.read(start, count)
    }

    /// Write bits and mark every touched address as client-written.
    pub fn write_bits(
        &self,
        table: BitTable,
        start: u16,
        values: &[bool],
    ) -> Result<(), BankError> {
        let state = &mut *self.state.lock().unwrap();
        let bank = match table {
            BitTable::Coil => &mut state.coils,
            BitTable::Discrete => &mut state.discrete,
        };
        bank.write(start, values)?;
        state.overrides.mark_range(table.into(), start, values.len());
        debug!(
            "{} bit(s) at {} in the {:?} table marked client-written",
            values.len(),
            start,
            table
        );
        Ok(())
    }

    /// Run one regeneration pass. The engine lock is held for the whole
    /// pass, so a concurrent client write is either fully visible to this
    /// pass or deferred to the next one.
    pub fn tick(&self) {
        let state = &mut *self.state.lock().unwrap();
        state.ticks += 1;
        let EngineState {
            holding,
            coils,
            discrete,
            overrides,
            generator,
            ..
        } = state;
        generator.regenerate(holding, coils, discrete, overrides);
    }

    /// Number of regeneration passes since startup (the eager
    /// initialization pass is tick zero and not counted).
    pub fn ticks(&self) -> u64 {
        self.state.lock().unwrap().ticks
    }
}
