// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Register simulation engine
//!
//! This module owns the four Modbus data tables (holding registers, input
//! registers, coils, discrete inputs), generates their contents from
//! per-address-range rules, and regenerates them once per tick. Addresses a
//! client writes are tracked and permanently excluded from regeneration, so
//! written values stay put for the rest of the session.
//!
//! ## Key Components
//!
//! - [`SimulationEngine`]: the owned engine object - banks, override
//!   tracking and generator cursors behind a single lock.
//! - [`SimulationScheduler`]: periodic task driving one regeneration pass
//!   per tick.
//! - [`ValueGenerator`]: the per-range generation rules and counter cursors.
//!
//! The protocol layer talks to the engine exclusively through
//! [`SimulationEngine::read_registers`], [`SimulationEngine::write_registers`],
//! [`SimulationEngine::read_bits`] and [`SimulationEngine::write_bits`].

pub mod bank;
pub mod engine;
pub mod generator;
pub mod overrides;
pub mod scheduler;

pub use bank::{BankError, BitBank, RegisterBank, BIT_COUNT, REGISTER_COUNT};
pub use engine::SimulationEngine;
pub use generator::ValueGenerator;
pub use overrides::OverrideTracker;
pub use scheduler::SimulationScheduler;

/// One of the four Modbus data tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataTable {
    Holding,
    Input,
    Coil,
    Discrete,
}

/// The word-addressed tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterTable {
    Holding,
    Input,
}

/// The bit-addressed tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitTable {
    Coil,
    Discrete,
}

impl From<RegisterTable> for DataTable {
    fn from(table: RegisterTable) -> Self {
        match table {
            RegisterTable::Holding => DataTable::Holding,
            RegisterTable::Input => DataTable::Input,
        }
    }
}

impl From<BitTable> for DataTable {
    fn from(table: BitTable) -> Self {
        match table {
            BitTable::Coil => DataTable::Coil,
            BitTable::Discrete => DataTable::Discrete,
        }
    }
}
