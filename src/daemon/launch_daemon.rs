// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Daemon launcher for the simulator services
//!
//! Owns the simulation engine and the background tasks serving it: the
//! Modbus TCP server and the regeneration scheduler. Tasks share an atomic
//! running flag and are awaited on shutdown.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{error, info, warn};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time;

use tokio_modbus::server::tcp::{accept_tcp_connection, Server};

use crate::config::Config;
use crate::modbus::SimulatorModbusServer;
use crate::simulation::{SimulationEngine, SimulationScheduler};

/// Represents a daemon task manager that coordinates the simulator services
///
/// # Fields
///
/// * `tasks` - Collection of handles to running tasks for management and cleanup
/// * `running` - Atomic flag shared between tasks to coordinate shutdown
/// * `engine` - The simulation engine shared by the scheduler and every
///   Modbus connection
pub struct Daemon {
    tasks: Vec<JoinHandle<Result<()>>>,
    running: Arc<AtomicBool>,
    engine: Arc<SimulationEngine>,
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemon {
    /// Create a new daemon instance.
    ///
    /// Building the engine runs the eager initialization pass, so the data
    /// tables already hold their startup contents before any task starts.
    pub fn new() -> Self {
        Daemon {
            tasks: Vec::new(),
            running: Arc::new(AtomicBool::new(true)),
            engine: Arc::new(SimulationEngine::new()),
        }
    }

    /// The shared simulation engine.
    pub fn engine(&self) -> Arc<SimulationEngine> {
        self.engine.clone()
    }

    /// Launch all configured tasks based on configuration.
    ///
    /// Only services that are enabled in the configuration will be started.
    /// Each service runs as a separate asynchronous task.
    pub async fn launch(&mut self, config: &Config) -> Result<()> {
        if config.modbus.enabled {
            self.start_modbus_server(config).await?;
        } else {
            warn!("Modbus server disabled, the simulation will not be reachable");
        }

        if config.simulation.enabled {
            self.start_simulation(config)?;
        } else {
            warn!("Periodic regeneration disabled, tables keep their startup contents");
        }

        Ok(())
    }

    /// Signal all tasks to shut down.
    pub fn shutdown(&self) {
        info!("Shutting down daemon tasks");
        self.running.store(false, Ordering::SeqCst);
    }

    /// Wait for every task to finish.
    pub async fn join(&mut self) -> Result<()> {
        for task in self.tasks.drain(..) {
            match task.await {
                Ok(result) => result?,
                Err(err) if err.is_cancelled() => {}
                Err(err) => return Err(err).context("Daemon task panicked"),
            }
        }
        Ok(())
    }

    /// Start the Modbus TCP server task.
    ///
    /// Binds the configured address, then serves every connection with a
    /// service clone holding the shared engine. The task watches the running
    /// flag and aborts the serve loop on shutdown.
    async fn start_modbus_server(&mut self, config: &Config) -> Result<()> {
        info!(
            "Starting Modbus server on {}:{}",
            config.modbus.address, config.modbus.port
        );

        let socket_addr: SocketAddr = format!("{}:{}", config.modbus.address, config.modbus.port)
            .parse()
            .with_context(|| {
                format!(
                    "Invalid Modbus socket address {}:{}",
                    config.modbus.address, config.modbus.port
                )
            })?;
        let listener = TcpListener::bind(socket_addr)
            .await
            .with_context(|| format!("Failed to bind Modbus server to {socket_addr}"))?;

        let running = self.running.clone();
        let engine = self.engine.clone();

        let task = tokio::spawn(async move {
            let server = Server::new(listener);

            let new_service = move |_socket_addr| Ok(Some(SimulatorModbusServer::new(engine.clone())));

            let on_connected = move |stream, socket_addr| {
                info!("Modbus client connected: {}", socket_addr);
                let new_service = new_service.clone();
                async move { accept_tcp_connection(stream, socket_addr, new_service) }
            };

            let on_process_error = |err| {
                error!("Modbus server error: {err}");
            };

            // Start the server in a separate task
            let server_handle = tokio::spawn(async move {
                if let Err(e) = server.serve(&on_connected, on_process_error).await {
                    error!("Modbus server error: {}", e);
                }
            });

            // Watch the running flag
            while running.load(Ordering::SeqCst) {
                time::sleep(Duration::from_secs(1)).await;
            }

            info!("Shutting down Modbus server...");
            server_handle.abort();

            match tokio::time::timeout(Duration::from_secs(5), server_handle).await {
                Ok(_) => info!("Modbus server shut down successfully"),
                Err(_) => {
                    warn!("Modbus server shutdown timed out, forcing termination");
                }
            }

            Ok(())
        });

        self.tasks.push(task);
        info!("Modbus server started");
        Ok(())
    }

    /// Start the regeneration scheduler task.
    fn start_simulation(&mut self, config: &Config) -> Result<()> {
        let period = Duration::from_millis(config.simulation.tick_interval_ms);
        let scheduler = SimulationScheduler::new(self.engine.clone(), period);

        let task = tokio::spawn(scheduler.run(self.running.clone()));
        self.tasks.push(task);

        info!(
            "Simulation scheduler started with a {} ms period",
            config.simulation.tick_interval_ms
        );
        Ok(())
    }
}
