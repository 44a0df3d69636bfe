//! Event dispatcher.
//!
//! Producers (the OVSDB library callbacks, the OpenFlow layer) hold an
//! [`EventSink`] and push events into a bounded channel. A single
//! [`EventDispatcher`] task receives them, appends them to the handler's
//! FIFO and drains it, so no two events are ever handled concurrently.

use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::SouthboundConfig;
use crate::error::{Result, SouthboundError};
use crate::event::SouthboundEvent;
use crate::handler::SouthboundHandler;
use crate::notation::Row;
use crate::types::{NodeId, TenantNetwork, TerminationPoint};
use netvirt_orch_common::{Action, Orch};

/// Configuration for the [`EventDispatcher`].
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Heartbeat interval
    pub heartbeat_interval: Duration,
    /// Channel capacity
    pub queue_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_millis(1000),
            queue_capacity: 4096,
        }
    }
}

impl From<&SouthboundConfig> for DispatcherConfig {
    fn from(config: &SouthboundConfig) -> Self {
        Self {
            heartbeat_interval: config.heartbeat_interval(),
            queue_capacity: config.daemon.queue_capacity,
        }
    }
}

/// Cloneable producer handle.
#[derive(Debug, Clone)]
pub struct EventSink {
    sender: mpsc::Sender<SouthboundEvent>,
}

impl EventSink {
    /// Sends an event, waiting for channel capacity.
    pub async fn send(&self, event: SouthboundEvent) -> Result<()> {
        self.sender
            .send(event)
            .await
            .map_err(|_| SouthboundError::QueueClosed)
    }

    pub async fn ovsdb_update(&self, node: NodeId, device_type: &str, action: Action) -> Result<()> {
        self.send(SouthboundEvent::from_ovsdb_update(node, device_type, action))
            .await
    }

    pub async fn port_update(&self, node: NodeId, port_name: &str, action: Action) -> Result<()> {
        self.send(SouthboundEvent::port(node, port_name, action)).await
    }

    pub async fn port_snapshot_update(
        &self,
        node: NodeId,
        port: TerminationPoint,
        action: Action,
        context: Option<TenantNetwork>,
    ) -> Result<()> {
        let event = SouthboundEvent::port_snapshot(node, port, action);
        self.send(match context {
            Some(network) => event.with_context(network),
            None => event,
        })
        .await
    }

    pub async fn row_update(
        &self,
        node: NodeId,
        table_name: &str,
        row_id: Uuid,
        row: Row,
        action: Action,
        context: Option<TenantNetwork>,
    ) -> Result<()> {
        let event = SouthboundEvent::row_update(node, table_name, row_id, row, action);
        self.send(match context {
            Some(network) => event.with_context(network),
            None => event,
        })
        .await
    }

    pub async fn notify_device_of_interest(&self, node: NodeId, action: Action) -> Result<()> {
        self.send(SouthboundEvent::device_of_interest(node, action))
            .await
    }
}

/// Single consumer of the southbound event channel.
pub struct EventDispatcher {
    config: DispatcherConfig,
    handler: SouthboundHandler,
    events: mpsc::Receiver<SouthboundEvent>,
    shutdown: watch::Receiver<bool>,
}

impl EventDispatcher {
    /// Creates the dispatcher and the sink producers use to reach it.
    ///
    /// The loop stops once `true` is published on `shutdown`, the shutdown
    /// sender is dropped, or every [`EventSink`] is gone.
    pub fn new(
        config: DispatcherConfig,
        handler: SouthboundHandler,
        shutdown: watch::Receiver<bool>,
    ) -> (Self, EventSink) {
        let (sender, events) = mpsc::channel(config.queue_capacity.max(1));
        let dispatcher = Self {
            config,
            handler,
            events,
            shutdown,
        };
        (dispatcher, EventSink { sender })
    }

    /// Runs the event loop and hands the handler back when it stops.
    pub async fn run(mut self) -> SouthboundHandler {
        info!(
            heartbeat_interval_ms = self.config.heartbeat_interval.as_millis() as u64,
            batch_size = self.handler.batch_size(),
            "Starting southbound event loop"
        );

        let mut heartbeat = tokio::time::interval(self.config.heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        info!("Shutdown requested");
                        break;
                    }
                }
                received = self.events.recv() => match received {
                    Some(event) => {
                        self.handler.enqueue(event);
                        self.pull_ready();
                        self.drain().await;
                    }
                    None => {
                        info!("All event producers closed");
                        break;
                    }
                },
                _ = heartbeat.tick() => {
                    let stats = self.handler.stats();
                    debug!(
                        pending = self.handler.pending_count(),
                        processed = stats.events_processed,
                        failed = stats.events_failed,
                        "Southbound heartbeat"
                    );
                }
            }
        }

        // Events already accepted are still handled, in order
        self.events.close();
        while let Ok(event) = self.events.try_recv() {
            self.handler.enqueue(event);
        }
        self.drain().await;

        info!(
            processed = self.handler.stats().events_processed,
            "Southbound event loop stopped"
        );
        self.handler
    }

    /// Moves already-waiting events onto the handler queue, up to a batch.
    fn pull_ready(&mut self) {
        while self.handler.pending_count() < self.handler.batch_size() {
            match self.events.try_recv() {
                Ok(event) => self.handler.enqueue(event),
                Err(_) => break,
            }
        }
    }

    async fn drain(&mut self) {
        while self.handler.has_pending_tasks() {
            self.handler.do_task().await;
        }
    }
}
