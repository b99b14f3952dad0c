// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus communication module
//!
//! For avoiding confusion with the Modbus master/slave terminology, this
//! module uses the terms "server" and "client" instead. The server is the
//! device that provides data, while the client is the device that requests
//! data.
//!
//! ## Key Components
//!
//! - `SimulatorModbusServer`: the service implementation that decodes
//!   Modbus requests into engine read/write operations and encodes engine
//!   contents into responses.
//!
//! ## Supported Function Codes
//!
//! - FC 01: Read Coils
//! - FC 02: Read Discrete Inputs
//! - FC 03: Read Holding Registers
//! - FC 04: Read Input Registers
//! - FC 05: Write Single Coil
//! - FC 06: Write Single Register
//! - FC 15: Write Multiple Coils
//! - FC 16: Write Multiple Registers
//!
//! Every write is forwarded to the engine, which records the written
//! addresses so the simulation never regenerates them again.

pub mod modbus_server;
pub use modbus_server::SimulatorModbusServer;
