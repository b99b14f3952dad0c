// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus TCP service backed by the simulation engine
//!
//! The server is thread-safe and can handle multiple concurrent client
//! connections; every connection gets a clone of the service holding the
//! same shared engine.
//!
//! ## Register Map
//!
//! ### Holding Registers (Read/Write)
//!
//! | Registers | Contents |
//! |-----------|----------|
//! | 0-100     | i16 counter, +1 per second |
//! | 101-200   | u16 counter, +1 per second |
//! | 201-300   | i32 counter (2 registers each), +1 per second |
//! | 301-400   | u32 counter (2 registers each), +1 per second |
//! | 401-500   | f32 counter (2 registers each), +0.111 per second |
//! | 501-600   | f32 counter (2 registers each), +0.222 per second |
//! | 601-700   | f64 counter (4 registers each), +0.333 per second |
//! | 701-800   | f64 counter (8-register slots), +0.444 per second |
//! | 801-900   | fixed UTF-8 text, zero-padded |
//! | 901-999   | "Hello, World! " + UNIX epoch seconds, refreshed per second |
//!
//! ### Coils and Discrete Inputs
//!
//! | Bits    | Contents |
//! |---------|----------|
//! | 0-100   | toggles every second |
//! | 101-200 | constant 0 |
//! | 201-300 | constant 1 |
//!
//! Input registers are present (1000 registers) but carry no generated data.
//!
//! Any address written by a client keeps the written value permanently; the
//! per-second regeneration skips it from then on.

use std::{future, sync::Arc};

use log::{debug, error};

use tokio_modbus::prelude::*;

use crate::simulation::{BankError, BitTable, RegisterTable, SimulationEngine};

/// Modbus TCP service exposing the simulated data tables.
#[derive(Clone)]
pub struct SimulatorModbusServer {
    engine: Arc<SimulationEngine>,
}

impl SimulatorModbusServer {
    pub fn new(engine: Arc<SimulationEngine>) -> Self {
        Self { engine }
    }
}

impl tokio_modbus::server::Service for SimulatorModbusServer {
    type Request = Request<'static>;
    type Response = Response;
    type Exception = ExceptionCode;
    type Future = future::Ready<Result<Self::Response, Self::Exception>>;

    /// Process a Modbus request and provide a response
    ///
    /// Reads are served straight from the engine's tables; writes go through
    /// the engine so the written addresses drop out of regeneration. Any
    /// other function code gets an IllegalFunction exception.
    fn call(&self, req: Self::Request) -> Self::Future {
        debug!("Received Modbus request: {:?}", req);

        let res = match req {
            Request::ReadCoils(addr, cnt) => self
                .engine
                .read_bits(BitTable::Coil, addr, cnt)
                .map(Response::ReadCoils)
                .map_err(reject),
            Request::ReadDiscreteInputs(addr, cnt) => self
                .engine
                .read_bits(BitTable::Discrete, addr, cnt)
                .map(Response::ReadDiscreteInputs)
                .map_err(reject),
            Request::ReadHoldingRegisters(addr, cnt) => self
                .engine
                .read_registers(RegisterTable::Holding, addr, cnt)
                .map(Response::ReadHoldingRegisters)
                .map_err(reject),
            Request::ReadInputRegisters(addr, cnt) => self
                .engine
                .read_registers(RegisterTable::Input, addr, cnt)
                .map(Response::ReadInputRegisters)
                .map_err(reject),
            Request::WriteSingleRegister(addr, value) => self
                .engine
                .write_registers(RegisterTable::Holding, addr, std::slice::from_ref(&value))
                .map(|()| Response::WriteSingleRegister(addr, value))
                .map_err(reject),
            Request::WriteMultipleRegisters(addr, values) => self
                .engine
                .write_registers(RegisterTable::Holding, addr, &values)
                .map(|()| Response::WriteMultipleRegisters(addr, values.len() as u16))
                .map_err(reject),
            Request::WriteSingleCoil(addr, value) => self
                .engine
                .write_bits(BitTable::Coil, addr, &[value])
                .map(|()| Response::WriteSingleCoil(addr, value))
                .map_err(reject),
            Request::WriteMultipleCoils(addr, values) => self
                .engine
                .write_bits(BitTable::Coil, addr, &values)
                .map(|()| Response::WriteMultipleCoils(addr, values.len() as u16))
                .map_err(reject),
            _ => {
                error!(
                    "Exception::IllegalFunction - Unimplemented function code in request: {req:?}"
                );
                Err(ExceptionCode::IllegalFunction)
            }
        };

        if let Err(e) = &res {
            error!("Modbus request error: {:?}", e);
        }

        future::ready(res)
    }
}

/// Map an engine error onto the matching Modbus exception.
fn reject(err: BankError) -> ExceptionCode {
    match err {
        BankError::AddressOutOfRange { .. } => {
            error!("Exception::IllegalDataAddress - {err}");
            ExceptionCode::IllegalDataAddress
        }
    }
}
