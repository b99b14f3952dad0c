// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Value generation rules for the simulated data tables
//!
//! Every address range of the holding table is populated from one of a small
//! set of rules, re-evaluated once per tick:
//!
//! | Registers | Encoding | Cells/value | Start | Step per tick |
//! |-----------|----------|-------------|------------|-------|
//! | 0-100     | i16      | 1           | -16000     | +1    |
//! | 101-200   | u16      | 1           | 1          | +1    |
//! | 201-300   | i32      | 2           | -10000     | +1    |
//! | 301-400   | u32      | 2           | 0          | +1    |
//! | 401-500   | f32      | 2           | -10000.0   | +0.111 |
//! | 501-600   | f32      | 2           | 0.0        | +0.222 |
//! | 601-700   | f64      | 4           | 0.0        | +0.333 |
//! | 701-800   | f64      | 8-reg slot  | 0.0        | +0.444 |
//! | 801-900   | fixed UTF-8 text, written once at startup | | | |
//! | 901-999   | "Hello, World! " + epoch seconds, rewritten every tick | | | |
//!
//! Coils and discrete inputs share one map: bits 0-100 each toggle on their
//! own prior value every tick, 101-200 are constant 0 and 201-300 constant 1.
//! The input register table has no generated ranges and serves zeros.
//!
//! Each counter range derives its values from a single base cursor: the value
//! at index `i` is `base + i` for the integer encodings and `base + i * step`
//! for the float encodings. Addresses a client has written are skipped; a
//! value spanning several registers is skipped whenever any of its registers
//! is client-written.

use chrono::Utc;
use log::warn;

use super::bank::{BankError, BitBank, RegisterBank};
use super::overrides::OverrideTracker;
use super::{BitTable, DataTable};

const INT16_START: i16 = -16000;
const UINT16_START: u16 = 1;
const INT32_START: i32 = -10000;
const UINT32_START: u32 = 0;
const FLOAT32_START: f32 = -10000.0;
const FLOAT32_FAST_START: f32 = 0.0;
const FLOAT64_START: f64 = 0.0;
const FLOAT64_WIDE_START: f64 = 0.0;

const FLOAT32_STEP: f32 = 0.111;
const FLOAT32_FAST_STEP: f32 = 0.222;
const FLOAT64_STEP: f64 = 0.333;
const FLOAT64_WIDE_STEP: f64 = 0.444;

/// Drift guards for the float cursors. These bound simulated drift over long
/// uptimes; they are deliberately far inside the encodings' numeric range.
const FLOAT32_DRIFT_LIMIT: f32 = 1e6;
const FLOAT64_DRIFT_LIMIT: f64 = 1e12;

const FIXED_TEXT: &str = "Hello, World!";
const DYNAMIC_TEXT_PREFIX: &str = "Hello, World! ";

/// Base cursors for every counter range, advanced once per tick.
#[derive(Debug)]
pub struct ValueGenerator {
    int16_base: i16,
    uint16_base: u16,
    int32_base: i32,
    uint32_base: u32,
    float32_base: f32,
    float32_fast_base: f32,
    float64_base: f64,
    float64_wide_base: f64,
}

impl Default for ValueGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueGenerator {
    pub fn new() -> Self {
        Self {
            int16_base: INT16_START,
            uint16_base: UINT16_START,
            int32_base: INT32_START,
            uint32_base: UINT32_START,
            float32_base: FLOAT32_START,
            float32_fast_base: FLOAT32_FAST_START,
            float64_base: FLOAT64_START,
            float64_wide_base: FLOAT64_WIDE_START,
        }
    }

    /// Populate every range with its tick-zero contents. Runs before the
    /// server accepts connections, so no address can be client-written yet.
    pub fn initialize(
        &self,
        holding: &mut RegisterBank,
        coils: &mut BitBank,
        discrete: &mut BitBank,
    ) -> Result<(), BankError> {
        let untouched = OverrideTracker::new();
        self.write_int16_range(holding, &untouched)?;
        self.write_uint16_range(holding, &untouched)?;
        self.write_int32_range(holding, &untouched)?;
        self.write_uint32_range(holding, &untouched)?;
        self.write_float32_range(holding, &untouched)?;
        self.write_float32_fast_range(holding, &untouched)?;
        self.write_float64_range(holding, &untouched)?;
        self.write_float64_wide_range(holding, &untouched)?;
        holding.put_text(801, 900, FIXED_TEXT)?;
        write_epoch_text(holding)?;
        initialize_bits(coils)?;
        initialize_bits(discrete)?;
        Ok(())
    }

    /// One regeneration pass over every range, in holding/coil/discrete
    /// order. A range that fails is logged and skipped so the rest of the
    /// pass still runs.
    pub fn regenerate(
        &mut self,
        holding: &mut RegisterBank,
        coils: &mut BitBank,
        discrete: &mut BitBank,
        overrides: &OverrideTracker,
    ) {
        self.advance_counters();

        if let Err(err) = self.write_int16_range(holding, overrides) {
            warn!("i16 counter range skipped: {err}");
        }
        if let Err(err) = self.write_uint16_range(holding, overrides) {
            warn!("u16 counter range skipped: {err}");
        }
        if let Err(err) = self.write_int32_range(holding, overrides) {
            warn!("i32 counter range skipped: {err}");
        }
        if let Err(err) = self.write_uint32_range(holding, overrides) {
            warn!("u32 counter range skipped: {err}");
        }
        if let Err(err) = self.write_float32_range(holding, overrides) {
            warn!("f32 counter range skipped: {err}");
        }
        if let Err(err) = self.write_float32_fast_range(holding, overrides) {
            warn!("fast f32 counter range skipped: {err}");
        }
        if let Err(err) = self.write_float64_range(holding, overrides) {
            warn!("f64 counter range skipped: {err}");
        }
        if let Err(err) = self.write_float64_wide_range(holding, overrides) {
            warn!("wide f64 counter range skipped: {err}");
        }
        // The fixed text at 801-900 and the constant bit spans never change
        // after initialization.
        if let Err(err) = write_dynamic_text(holding, overrides) {
            warn!("dynamic text range skipped: {err}");
        }
        if let Err(err) = toggle_bits(coils, BitTable::Coil, overrides) {
            warn!("coil toggle range skipped: {err}");
        }
        if let Err(err) = toggle_bits(discrete, BitTable::Discrete, overrides) {
            warn!("discrete toggle range skipped: {err}");
        }
    }

    /// Advance every base cursor by one tick. Integer cursors reset to their
    /// start value before the largest derived value (`base + maxIndex`) could
    /// leave the encoding's range; float cursors reset once they drift past
    /// their guard or stop being finite.
    fn advance_counters(&mut self) {
        // largest derived index per integer range: 100, 99, 49, 49
        if self.int16_base >= i16::MAX - 100 {
            self.int16_base = INT16_START;
        } else {
            self.int16_base += 1;
        }
        if self.uint16_base >= u16::MAX - 99 {
            self.uint16_base = UINT16_START;
        } else {
            self.uint16_base += 1;
        }
        if self.int32_base >= i32::MAX - 49 {
            self.int32_base = INT32_START;
        } else {
            self.int32_base += 1;
        }
        if self.uint32_base >= u32::MAX - 49 {
            self.uint32_base = UINT32_START;
        } else {
            self.uint32_base += 1;
        }

        self.float32_base += FLOAT32_STEP;
        if !self.float32_base.is_finite() || self.float32_base.abs() > FLOAT32_DRIFT_LIMIT {
            self.float32_base = FLOAT32_START;
        }
        self.float32_fast_base += FLOAT32_FAST_STEP;
        if !self.float32_fast_base.is_finite() || self.float32_fast_base.abs() > FLOAT32_DRIFT_LIMIT
        {
            self.float32_fast_base = FLOAT32_FAST_START;
        }
        self.float64_base += FLOAT64_STEP;
        if !self.float64_base.is_finite() || self.float64_base.abs() > FLOAT64_DRIFT_LIMIT {
            self.float64_base = FLOAT64_START;
        }
        self.float64_wide_base += FLOAT64_WIDE_STEP;
        if !self.float64_wide_base.is_finite() || self.float64_wide_base.abs() > FLOAT64_DRIFT_LIMIT
        {
            self.float64_wide_base = FLOAT64_WIDE_START;
        }
    }

    fn write_int16_range(
        &self,
        holding: &mut RegisterBank,
        overrides: &OverrideTracker,
    ) -> Result<(), BankError> {
        for addr in 0..=100u16 {
            if overrides.is_written(DataTable::Holding, addr) {
                continue;
            }
            holding.put_i16(addr, self.int16_base + addr as i16)?;
        }
        Ok(())
    }

    fn write_uint16_range(
        &self,
        holding: &mut RegisterBank,
        overrides: &OverrideTracker,
    ) -> Result<(), BankError> {
        for addr in 101..=200u16 {
            if overrides.is_written(DataTable::Holding, addr) {
                continue;
            }
            holding.put_u16(addr, self.uint16_base + (addr - 101))?;
        }
        Ok(())
    }

    fn write_int32_range(
        &self,
        holding: &mut RegisterBank,
        overrides: &OverrideTracker,
    ) -> Result<(), BankError> {
        for (idx, reg) in (201..=300u16).step_by(2).enumerate() {
            if overrides.any_written(DataTable::Holding, reg, 2) {
                continue;
            }
            holding.put_i32(reg, self.int32_base + idx as i32)?;
        }
        Ok(())
    }

    fn write_uint32_range(
        &self,
        holding: &mut RegisterBank,
        overrides: &OverrideTracker,
    ) -> Result<(), BankError> {
        for (idx, reg) in (301..=400u16).step_by(2).enumerate() {
            if overrides.any_written(DataTable::Holding, reg, 2) {
                continue;
            }
            holding.put_u32(reg, self.uint32_base + idx as u32)?;
        }
        Ok(())
    }

    fn write_float32_range(
        &self,
        holding: &mut RegisterBank,
        overrides: &OverrideTracker,
    ) -> Result<(), BankError> {
        for (idx, reg) in (401..=500u16).step_by(2).enumerate() {
            if overrides.any_written(DataTable::Holding, reg, 2) {
                continue;
            }
            holding.put_f32(reg, self.float32_base + idx as f32 * FLOAT32_STEP)?;
        }
        Ok(())
    }

    fn write_float32_fast_range(
        &self,
        holding: &mut RegisterBank,
        overrides: &OverrideTracker,
    ) -> Result<(), BankError> {
        for (idx, reg) in (501..=600u16).step_by(2).enumerate() {
            if overrides.any_written(DataTable::Holding, reg, 2) {
                continue;
            }
            holding.put_f32(reg, self.float32_fast_base + idx as f32 * FLOAT32_FAST_STEP)?;
        }
        Ok(())
    }

    fn write_float64_range(
        &self,
        holding: &mut RegisterBank,
        overrides: &OverrideTracker,
    ) -> Result<(), BankError> {
        for (idx, reg) in (601..=700u16).step_by(4).enumerate() {
            if overrides.any_written(DataTable::Holding, reg, 4) {
                continue;
            }
            holding.put_f64(reg, self.float64_base + idx as f64 * FLOAT64_STEP)?;
        }
        Ok(())
    }

    fn write_float64_wide_range(
        &self,
        holding: &mut RegisterBank,
        overrides: &OverrideTracker,
    ) -> Result<(), BankError> {
        // One f64 in the first four registers of each 8-register slot; the
        // upper four registers stay zero. The skip check covers the whole
        // slot.
        for (idx, reg) in (701..=800u16).step_by(8).enumerate() {
            if overrides.any_written(DataTable::Holding, reg, 8) {
                continue;
            }
            holding.put_f64(reg, self.float64_wide_base + idx as f64 * FLOAT64_WIDE_STEP)?;
        }
        Ok(())
    }
}

/// Rewrite the dynamic text span unless any of its registers is
/// client-written.
fn write_dynamic_text(
    holding: &mut RegisterBank,
    overrides: &OverrideTracker,
) -> Result<(), BankError> {
    if overrides.any_written(DataTable::Holding, 901, 99) {
        return Ok(());
    }
    write_epoch_text(holding)
}

/// The dynamic span runs from register 901 to the top of the table (999).
fn write_epoch_text(holding: &mut RegisterBank) -> Result<(), BankError> {
    let epoch = Utc::now().timestamp();
    holding.put_text(901, 999, &format!("{DYNAMIC_TEXT_PREFIX}{epoch}"))
}

/// Flip every non-overridden bit in the toggle span on its own prior value.
fn toggle_bits(
    bank: &mut BitBank,
    table: BitTable,
    overrides: &OverrideTracker,
) -> Result<(), BankError> {
    for addr in 0..=100u16 {
        if overrides.is_written(table.into(), addr) {
            continue;
        }
        let state = bank.read_bit(addr)?;
        bank.write_bit(addr, !state)?;
    }
    Ok(())
}

/// Toggle bits start low, 101-200 are constant 0, 201-300 constant 1.
fn initialize_bits(bank: &mut BitBank) -> Result<(), BankError> {
    for addr in 0..=200u16 {
        bank.write_bit(addr, false)?;
    }
    for addr in 201..=300u16 {
        bank.write_bit(addr, true)?;
    }
    Ok(())
}
