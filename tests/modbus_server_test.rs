// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Tests for the SimulatorModbusServer implementation
//!
//! These tests validate the Modbus server functionality by starting a server
//! instance and connecting to it via a Modbus client. The simulation
//! scheduler is not started; ticks are driven explicitly through the shared
//! engine so the tests stay deterministic.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time;
use tokio_modbus::prelude::*;
use tokio_modbus::server::tcp::{accept_tcp_connection, Server};

use modbus_simulator::modbus::SimulatorModbusServer;
use modbus_simulator::simulation::SimulationEngine;

/// Test utility function to start a Modbus server in the background
async fn start_test_server() -> Result<
    (SocketAddr, Arc<SimulationEngine>, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error>,
> {
    // Use port 0 to let the OS assign an available port
    let socket_addr = SocketAddr::from_str("127.0.0.1:0").unwrap();
    let listener = TcpListener::bind(socket_addr).await?;
    let socket_addr = listener.local_addr()?;

    let engine = Arc::new(SimulationEngine::new());
    let server = Server::new(listener);

    let service_engine = engine.clone();
    let new_service =
        move |_socket_addr| Ok(Some(SimulatorModbusServer::new(service_engine.clone())));

    let on_connected = move |stream, socket_addr| {
        let new_service = new_service.clone();
        async move { accept_tcp_connection(stream, socket_addr, new_service) }
    };

    let on_process_error = |err| {
        eprintln!("Server error: {}", err);
    };

    // Start the server in a background task
    let handle = tokio::spawn(async move {
        if let Err(e) = server.serve(&on_connected, on_process_error).await {
            eprintln!("Server error: {}", e);
        }
    });

    // Give the server a moment to start
    time::sleep(Duration::from_millis(100)).await;

    Ok((socket_addr, engine, handle))
}

fn words_to_i32(words: &[u16]) -> i32 {
    (((words[0] as u32) << 16) | words[1] as u32) as i32
}

fn words_to_text(words: &[u16]) -> String {
    let bytes: Vec<u8> = words
        .iter()
        .flat_map(|w| w.to_be_bytes())
        .take_while(|b| *b != 0)
        .collect();
    String::from_utf8(bytes).expect("text region holds valid UTF-8")
}

#[tokio::test]
async fn test_read_initial_counters() -> Result<(), Box<dyn std::error::Error>> {
    let (socket_addr, _engine, _server_handle) = start_test_server().await?;

    let mut ctx = tcp::connect(socket_addr).await?;

    // i16 counters start at -16000 and grow by one per address
    let data = ctx.read_holding_registers(0, 5).await??;
    for (i, value) in data.iter().enumerate() {
        assert_eq!(*value as i16, -16000 + i as i16);
    }

    // u16 counters start at 1
    let data = ctx.read_holding_registers(101, 3).await??;
    assert_eq!(data, vec![1, 2, 3]);

    // i32 counters start at -10000, two registers per value
    let data = ctx.read_holding_registers(201, 4).await??;
    assert_eq!(words_to_i32(&data[0..2]), -10000);
    assert_eq!(words_to_i32(&data[2..4]), -9999);

    ctx.disconnect().await?;
    Ok(())
}

#[tokio::test]
async fn test_ticks_advance_counters() -> Result<(), Box<dyn std::error::Error>> {
    let (socket_addr, engine, _server_handle) = start_test_server().await?;

    let mut ctx = tcp::connect(socket_addr).await?;

    engine.tick();
    engine.tick();

    let data = ctx.read_holding_registers(0, 2).await??;
    assert_eq!(data[0] as i16, -15998);
    assert_eq!(data[1] as i16, -15997);

    let data = ctx.read_holding_registers(101, 1).await??;
    assert_eq!(data[0], 3);

    ctx.disconnect().await?;
    Ok(())
}

#[tokio::test]
async fn test_written_register_survives_ticks() -> Result<(), Box<dyn std::error::Error>> {
    let (socket_addr, engine, _server_handle) = start_test_server().await?;

    let mut ctx = tcp::connect(socket_addr).await?;

    ctx.write_single_register(7, 4242).await??;
    engine.tick();
    engine.tick();

    let data = ctx.read_holding_registers(6, 3).await??;
    // neighbours keep counting, the written register stays put
    assert_eq!(data[0] as i16, -16000 + 2 + 6);
    assert_eq!(data[1], 4242);
    assert_eq!(data[2] as i16, -16000 + 2 + 8);

    ctx.disconnect().await?;
    Ok(())
}

#[tokio::test]
async fn test_partial_write_freezes_whole_logical_value() -> Result<(), Box<dyn std::error::Error>>
{
    let (socket_addr, engine, _server_handle) = start_test_server().await?;

    let mut ctx = tcp::connect(socket_addr).await?;

    // write only the low word of the i32 at registers 201-202
    ctx.write_single_register(202, 1).await??;
    let frozen = ctx.read_holding_registers(201, 2).await??;

    engine.tick();

    let data = ctx.read_holding_registers(201, 4).await??;
    // the whole value at 201 is skipped, the next value keeps counting
    assert_eq!(&data[0..2], &frozen[..]);
    assert_eq!(words_to_i32(&data[2..4]), -9998);

    ctx.disconnect().await?;
    Ok(())
}

#[tokio::test]
async fn test_write_multiple_registers_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let (socket_addr, engine, _server_handle) = start_test_server().await?;

    let mut ctx = tcp::connect(socket_addr).await?;

    let values = vec![0xABCD, 0x0000, 0xFFFF];
    ctx.write_multiple_registers(99, &values).await??;
    engine.tick();

    let data = ctx.read_holding_registers(99, 3).await??;
    assert_eq!(data, values);

    ctx.disconnect().await?;
    Ok(())
}

#[tokio::test]
async fn test_coils_toggle_and_constant_spans_hold() -> Result<(), Box<dyn std::error::Error>> {
    let (socket_addr, engine, _server_handle) = start_test_server().await?;

    let mut ctx = tcp::connect(socket_addr).await?;

    let data = ctx.read_coils(0, 3).await??;
    assert_eq!(data, vec![false, false, false]);

    engine.tick();
    let data = ctx.read_coils(0, 3).await??;
    assert_eq!(data, vec![true, true, true]);

    engine.tick();
    let data = ctx.read_coils(0, 3).await??;
    assert_eq!(data, vec![false, false, false]);

    // the constant spans never move
    assert_eq!(ctx.read_coils(101, 4).await??, vec![false; 4]);
    assert_eq!(ctx.read_coils(201, 4).await??, vec![true; 4]);
    assert_eq!(ctx.read_discrete_inputs(297, 4).await??, vec![true; 4]);

    ctx.disconnect().await?;
    Ok(())
}

#[tokio::test]
async fn test_written_coil_stops_toggling() -> Result<(), Box<dyn std::error::Error>> {
    let (socket_addr, engine, _server_handle) = start_test_server().await?;

    let mut ctx = tcp::connect(socket_addr).await?;

    ctx.write_single_coil(2, true).await??;
    engine.tick();
    engine.tick();

    // after two ticks an untouched coil is back at 0
    let data = ctx.read_coils(2, 2).await??;
    assert_eq!(data, vec![true, false]);

    ctx.disconnect().await?;
    Ok(())
}

#[tokio::test]
async fn test_write_multiple_coils() -> Result<(), Box<dyn std::error::Error>> {
    let (socket_addr, engine, _server_handle) = start_test_server().await?;

    let mut ctx = tcp::connect(socket_addr).await?;

    let pattern = vec![true, false, true, true];
    ctx.write_multiple_coils(10, &pattern).await??;
    engine.tick();

    let data = ctx.read_coils(10, 4).await??;
    assert_eq!(data, pattern);

    ctx.disconnect().await?;
    Ok(())
}

#[tokio::test]
async fn test_text_regions() -> Result<(), Box<dyn std::error::Error>> {
    let (socket_addr, engine, _server_handle) = start_test_server().await?;

    let mut ctx = tcp::connect(socket_addr).await?;

    let data = ctx.read_holding_registers(801, 10).await??;
    assert_eq!(words_to_text(&data), "Hello, World!");

    engine.tick();

    let data = ctx.read_holding_registers(901, 20).await??;
    let text = words_to_text(&data);
    let suffix = text
        .strip_prefix("Hello, World! ")
        .expect("dynamic text carries the fixed prefix");
    let epoch: i64 = suffix.parse()?;
    assert!(epoch > 1_500_000_000, "implausible epoch {epoch}");

    ctx.disconnect().await?;
    Ok(())
}

#[tokio::test]
async fn test_input_registers_serve_zeros() -> Result<(), Box<dyn std::error::Error>> {
    let (socket_addr, engine, _server_handle) = start_test_server().await?;

    let mut ctx = tcp::connect(socket_addr).await?;

    engine.tick();
    let data = ctx.read_input_registers(0, 10).await??;
    assert_eq!(data, vec![0; 10]);

    ctx.disconnect().await?;
    Ok(())
}

#[tokio::test]
async fn test_out_of_range_access_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let (socket_addr, _engine, _server_handle) = start_test_server().await?;

    let mut ctx = tcp::connect(socket_addr).await?;

    let result = ctx.read_holding_registers(990, 20).await?;
    assert!(result.is_err());
    if let Err(error) = result {
        assert_eq!(error.to_string(), "Illegal data address");
    }

    let result = ctx.write_single_coil(1000, true).await?;
    assert!(result.is_err());

    // a rejected write marks nothing: the neighbouring registers keep
    // regenerating (checked indirectly by reading successfully afterwards)
    let data = ctx.read_holding_registers(995, 5).await?;
    assert!(data.is_ok());

    ctx.disconnect().await?;
    Ok(())
}

#[tokio::test]
async fn test_unsupported_function() -> Result<(), Box<dyn std::error::Error>> {
    let (socket_addr, _engine, _server_handle) = start_test_server().await?;

    let mut ctx = tcp::connect(socket_addr).await?;

    let result = ctx.masked_write_register(0, 0xF0F0, 0x0F0F).await?;
    assert!(result.is_err());
    if let Err(error) = result {
        assert_eq!(error.to_string(), "Illegal function");
    }

    ctx.disconnect().await?;
    Ok(())
}

#[tokio::test]
async fn test_multiple_clients() -> Result<(), Box<dyn std::error::Error>> {
    let (socket_addr, _engine, _server_handle) = start_test_server().await?;

    let mut client1 = tcp::connect(socket_addr).await?;
    let mut client2 = tcp::connect(socket_addr).await?;

    client1.write_single_register(5, 888).await??;

    // Create a small delay to ensure proper server handling
    time::sleep(Duration::from_millis(100)).await;

    let data = client2.read_holding_registers(5, 1).await??;
    assert_eq!(data[0], 888);

    client1.disconnect().await?;
    client2.disconnect().await?;
    Ok(())
}
