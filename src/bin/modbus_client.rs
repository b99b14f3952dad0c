// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Smoke-test client for the simulator
//!
//! Connects to a running simulator, reads a window from one of the four
//! data tables and pretty-prints the values according to the simulator's
//! address map (counters are decoded at their encoding width, the text
//! regions as UTF-8 strings).

use std::error::Error;
use std::net::SocketAddr;

use clap::{Parser, ValueEnum};
use tokio_modbus::prelude::*;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Table {
    Holding,
    Input,
    Coil,
    Discrete,
}

/// Modbus client for reading simulated data points
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Modbus server address
    #[arg(long, default_value = "127.0.0.1")]
    address: String,

    /// Modbus server port
    #[arg(long, default_value = "502")]
    port: u16,

    /// Data table to read
    #[arg(long, value_enum, default_value = "holding")]
    table: Table,

    /// Starting address
    #[arg(long, default_value = "0")]
    start: u16,

    /// Number of registers or bits to read
    #[arg(long, default_value = "10")]
    quantity: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    let args = Args::parse();

    let socket_addr: SocketAddr = format!("{}:{}", args.address, args.port).parse()?;
    println!("Connecting to Modbus server at {}", socket_addr);
    let mut ctx = tcp::connect(socket_addr).await?;

    match args.table {
        Table::Holding => {
            let values = ctx.read_holding_registers(args.start, args.quantity).await??;
            println!("Raw register values: {:?}", values);
            print_decoded(args.start, &values);
        }
        Table::Input => {
            let values = ctx.read_input_registers(args.start, args.quantity).await??;
            println!("Raw register values: {:?}", values);
        }
        Table::Coil => {
            let bits = ctx.read_coils(args.start, args.quantity).await??;
            print_bits(args.start, &bits);
        }
        Table::Discrete => {
            let bits = ctx.read_discrete_inputs(args.start, args.quantity).await??;
            print_bits(args.start, &bits);
        }
    }

    ctx.disconnect().await?;
    Ok(())
}

fn print_bits(start: u16, bits: &[bool]) {
    for (i, bit) in bits.iter().enumerate() {
        println!("Bit {}: {}", start + i as u16, u8::from(*bit));
    }
}

/// Decode logical values that are fully contained in the read window,
/// following the simulator's holding register map.
fn print_decoded(start: u16, values: &[u16]) {
    let end = start + values.len() as u16;
    let word = |addr: u16| values[(addr - start) as usize];
    let mut addr = start;

    while addr < end {
        match addr {
            0..=100 => {
                println!("Register {}: i16 = {}", addr, word(addr) as i16);
                addr += 1;
            }
            101..=200 => {
                println!("Register {}: u16 = {}", addr, word(addr));
                addr += 1;
            }
            201..=400 => {
                let base = if addr <= 300 { 201 } else { 301 };
                if (addr - base) % 2 == 0 && addr + 2 <= end {
                    let raw = ((word(addr) as u32) << 16) | word(addr + 1) as u32;
                    if base == 201 {
                        println!("Registers {}-{}: i32 = {}", addr, addr + 1, raw as i32);
                    } else {
                        println!("Registers {}-{}: u32 = {}", addr, addr + 1, raw);
                    }
                    addr += 2;
                } else {
                    println!("Register {}: raw = {}", addr, word(addr));
                    addr += 1;
                }
            }
            401..=600 => {
                let base = if addr <= 500 { 401 } else { 501 };
                if (addr - base) % 2 == 0 && addr + 2 <= end {
                    let raw = ((word(addr) as u32) << 16) | word(addr + 1) as u32;
                    println!(
                        "Registers {}-{}: f32 = {:.3}",
                        addr,
                        addr + 1,
                        f32::from_bits(raw)
                    );
                    addr += 2;
                } else {
                    println!("Register {}: raw = {}", addr, word(addr));
                    addr += 1;
                }
            }
            601..=800 => {
                let (base, stride) = if addr <= 700 { (601, 4) } else { (701, 8) };
                if (addr - base) % stride == 0 && addr + 4 <= end {
                    let mut raw = 0u64;
                    for i in 0..4 {
                        raw = (raw << 16) | word(addr + i) as u64;
                    }
                    println!(
                        "Registers {}-{}: f64 = {:.3}",
                        addr,
                        addr + 3,
                        f64::from_bits(raw)
                    );
                    addr += stride;
                } else {
                    println!("Register {}: raw = {}", addr, word(addr));
                    addr += 1;
                }
            }
            _ => {
                // text regions: gather the remaining window as UTF-8
                let bytes: Vec<u8> = values[(addr - start) as usize..]
                    .iter()
                    .flat_map(|w| w.to_be_bytes())
                    .take_while(|b| *b != 0)
                    .collect();
                println!(
                    "Registers {}-{}: text = {:?}",
                    addr,
                    end - 1,
                    String::from_utf8_lossy(&bytes)
                );
                break;
            }
        }
    }
}
