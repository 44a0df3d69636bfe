//! Southbound reconciliation engine.
//!
//! [`SouthboundHandler`] owns the FIFO of southbound events for one worker
//! and turns each of them into calls on the injected collaborators. Events
//! are processed one at a time and in arrival order; the internal VLAN
//! reclaim decision depends on it, since the last-instance scan takes no
//! lock.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::api::{
    BridgeConfigurationManager, Collaborators, ConfigurationService, L3Adapter,
    TenantNetworkManager, TopologyStore,
};
use crate::error::{Result, SouthboundError};
use crate::event::{EventKind, SouthboundEvent};
use crate::notation::Row;
use crate::provider::ProviderDispatch;
use crate::tables::{self, INTERFACE_TABLE, OPEN_VSWITCH_TABLE};
use crate::tenant::{LifetimeTracker, TenantResolution};
use crate::types::{Bridge, NodeId, TenantNetwork, TerminationPoint};
use netvirt_orch_common::{Action, EventQueue, Orch, QueueConfig, TaskStatus};

const HANDLER_NAME: &str = "SouthboundHandler";

/// Counters kept by the handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SouthboundHandlerStats {
    pub events_processed: u64,
    pub events_succeeded: u64,
    pub events_ignored: u64,
    pub events_failed: u64,
    pub vlan_reclaims: u64,
    pub provider_updates: u64,
    pub provider_deletes: u64,
}

/// Reconciliation worker for southbound switch events.
pub struct SouthboundHandler {
    queue: EventQueue<SouthboundEvent>,
    topology: Arc<dyn TopologyStore>,
    tenants: Arc<dyn TenantNetworkManager>,
    bridges: Arc<dyn BridgeConfigurationManager>,
    configuration: Arc<dyn ConfigurationService>,
    l3: Arc<dyn L3Adapter>,
    resolution: TenantResolution,
    tracker: LifetimeTracker,
    providers: ProviderDispatch,
    stats: SouthboundHandlerStats,
}

impl SouthboundHandler {
    pub fn new(collaborators: Collaborators, queue_config: QueueConfig) -> Self {
        let resolution = TenantResolution::new(Arc::clone(&collaborators.tenants));
        let tracker = LifetimeTracker::new(Arc::clone(&collaborators.topology), resolution.clone());

        Self {
            queue: EventQueue::new(queue_config),
            topology: collaborators.topology,
            tenants: collaborators.tenants,
            bridges: collaborators.bridges,
            configuration: collaborators.configuration,
            l3: collaborators.l3,
            resolution,
            tracker,
            providers: ProviderDispatch::new(collaborators.providers),
            stats: SouthboundHandlerStats::default(),
        }
    }

    pub fn stats(&self) -> &SouthboundHandlerStats {
        &self.stats
    }

    pub fn pending_count(&self) -> usize {
        self.queue.pending_count()
    }

    /// Events handled per `do_task` call.
    pub fn batch_size(&self) -> usize {
        self.queue.batch_size()
    }

    /// Appends an event to the queue.
    pub fn enqueue(&mut self, event: SouthboundEvent) {
        trace!(event = %event, "Enqueued southbound event");
        self.queue.push(event);
    }

    /// Device-level inventory change.
    pub fn ovsdb_update(&mut self, node: NodeId, device_type: &str, action: Action) {
        self.enqueue(SouthboundEvent::from_ovsdb_update(node, device_type, action));
    }

    /// Port-level change carrying the port name.
    pub fn port_update(
        &mut self,
        node: NodeId,
        port_name: &str,
        action: Action,
        context: Option<TenantNetwork>,
    ) {
        let event = SouthboundEvent::port(node, port_name, action);
        self.enqueue(match context {
            Some(network) => event.with_context(network),
            None => event,
        });
    }

    /// Port-level change carrying the port as the producer last saw it.
    ///
    /// Preferred for deletes: the snapshot still identifies the interface
    /// once the topology store has dropped it.
    pub fn port_snapshot_update(
        &mut self,
        node: NodeId,
        port: TerminationPoint,
        action: Action,
        context: Option<TenantNetwork>,
    ) {
        let event = SouthboundEvent::port_snapshot(node, port, action);
        self.enqueue(match context {
            Some(network) => event.with_context(network),
            None => event,
        });
    }

    /// Raw table-row change.
    pub fn row_update(
        &mut self,
        node: NodeId,
        table_name: &str,
        row_id: Uuid,
        row: Row,
        action: Action,
        context: Option<TenantNetwork>,
    ) {
        let event = SouthboundEvent::row_update(node, table_name, row_id, row, action);
        self.enqueue(match context {
            Some(network) => event.with_context(network),
            None => event,
        });
    }

    /// An OpenFlow node of interest connected or disconnected.
    pub fn notify_device_of_interest(&mut self, node: NodeId, action: Action) {
        self.enqueue(SouthboundEvent::device_of_interest(node, action));
    }

    /// Processes up to one batch of queued events, in order.
    pub fn process_batch(&mut self) -> Vec<TaskStatus> {
        self.queue
            .drain_batch()
            .iter()
            .map(|event| self.process_event(event))
            .collect()
    }

    /// Processes queued events until the queue is empty.
    pub fn process_all(&mut self) -> Vec<TaskStatus> {
        let mut statuses = Vec::new();
        while self.queue.has_pending() {
            statuses.extend(self.process_batch());
        }
        statuses
    }

    /// Handles one event to completion.
    ///
    /// Never fails: the outcome is logged, counted and returned as a
    /// [`TaskStatus`] so the caller can move on to the next event.
    pub fn process_event(&mut self, event: &SouthboundEvent) -> TaskStatus {
        info!(event = %event, "Processing southbound event");
        self.stats.events_processed += 1;

        let status = match self.dispatch(event) {
            Ok(status) => status,
            Err(e) if e.is_unrecognized() => {
                warn!(event = %event, error = %e, "Dropping unrecognized event");
                TaskStatus::InvalidEntry
            }
            Err(e) => {
                error!(event = %event, error = %e, "Failed to process event");
                TaskStatus::Failed
            }
        };

        match status {
            TaskStatus::Success => self.stats.events_succeeded += 1,
            TaskStatus::Ignore => self.stats.events_ignored += 1,
            TaskStatus::InvalidEntry | TaskStatus::Failed => self.stats.events_failed += 1,
        }
        status
    }

    fn dispatch(&mut self, event: &SouthboundEvent) -> Result<TaskStatus> {
        let node = event.node();
        match (event.kind(), event.action()) {
            (EventKind::Node, action) => self.process_node(node, action),
            (EventKind::Bridge, Action::Add | Action::Update) => self.process_bridge_update(node),
            (EventKind::Bridge, Action::Delete) => self.process_bridge_delete(node),
            (EventKind::Port, Action::Add | Action::Update) => self.rescan_interfaces(node),
            (EventKind::Port, Action::Delete) => self.process_port_delete(event),
            (EventKind::OpenVSwitch, _) => self.rescan_interfaces(node),
            (EventKind::OpenFlowNode, action) => self.process_openflow_node(node, action),
            (EventKind::Row, _) => self.process_row_update(event),
            (kind, action) => Err(SouthboundError::UnrecognizedEvent { kind, action }),
        }
    }

    fn process_node(&mut self, node: &NodeId, action: Action) -> Result<TaskStatus> {
        if action != Action::Add {
            debug!(node = %node, %action, "No node handling for action");
            return Ok(TaskStatus::Ignore);
        }
        self.bridges.prepare_node(node)?;
        info!(node = %node, "Node prepared");
        Ok(TaskStatus::Success)
    }

    fn process_bridge_update(&mut self, node: &NodeId) -> Result<TaskStatus> {
        match self.topology.bridge(node)? {
            Some(bridge) => {
                self.handle_bridge_update(node, &bridge);
                Ok(TaskStatus::Success)
            }
            None => {
                debug!(node = %node, "Bridge update for node without a bridge");
                Ok(TaskStatus::Ignore)
            }
        }
    }

    /// Bridge-level provisioning hook.
    fn handle_bridge_update(&mut self, node: &NodeId, bridge: &Bridge) {
        debug!(node = %node, bridge = %bridge.name, "Bridge updated");
    }

    fn process_bridge_delete(&mut self, node: &NodeId) -> Result<TaskStatus> {
        debug!(node = %node, "Bridge deleted");
        Ok(TaskStatus::Ignore)
    }

    fn process_openflow_node(&mut self, node: &NodeId, action: Action) -> Result<TaskStatus> {
        if action != Action::Add {
            debug!(node = %node, %action, "OpenFlow node went away");
            return Ok(TaskStatus::Ignore);
        }
        self.providers.initialize_flow_rules(node)?;
        Ok(TaskStatus::Success)
    }

    fn process_row_update(&mut self, event: &SouthboundEvent) -> Result<TaskStatus> {
        let missing = |field| SouthboundError::MissingEventField {
            kind: EventKind::Row,
            field,
        };
        let table = event.table_name().ok_or_else(|| missing("table_name"))?;
        let node = event.node();

        if tables::is_table(table, INTERFACE_TABLE) && event.action() == Action::Delete {
            let row_id = event.row_id().ok_or_else(|| missing("row_id"))?;
            let row = event.row().ok_or_else(|| missing("row"))?;
            let tp = TerminationPoint::from_interface_row(row_id, row)?;
            return self.handle_interface_delete(node, &tp, event.context());
        }

        if tables::is_table(table, OPEN_VSWITCH_TABLE) {
            return self.rescan_interfaces(node);
        }

        trace!(node = %node, table, action = %event.action(), "No row handling for table");
        Ok(TaskStatus::Ignore)
    }

    /// Runs the update procedure for every interface on the node.
    ///
    /// A failing interface is logged and skipped; the remaining ones are
    /// still updated and the event reports `Failed`.
    fn rescan_interfaces(&mut self, node: &NodeId) -> Result<TaskStatus> {
        let tps = self.topology.termination_points(node)?;
        debug!(node = %node, count = tps.len(), "Rescanning interfaces");

        let mut updated = 0usize;
        let mut failed = 0usize;
        for tp in &tps {
            match self.handle_interface_update(node, tp, None) {
                Ok(true) => updated += 1,
                Ok(false) => {}
                Err(e) => {
                    failed += 1;
                    error!(node = %node, interface = %tp.name, error = %e, "Interface update failed");
                }
            }
        }

        Ok(if failed > 0 {
            TaskStatus::Failed
        } else if updated > 0 {
            TaskStatus::Success
        } else {
            TaskStatus::Ignore
        })
    }

    /// Brings one interface in line with its tenant network.
    ///
    /// Returns false if the interface has no managed tenant network.
    pub fn handle_interface_update(
        &mut self,
        node: &NodeId,
        tp: &TerminationPoint,
        context: Option<&TenantNetwork>,
    ) -> Result<bool> {
        let resolved = self.resolution.resolve_with_context(tp, context)?;
        let Some(network) = self.resolution.managed(resolved) else {
            trace!(node = %node, interface = %tp.name, "No managed tenant network for interface");
            return Ok(false);
        };

        self.tenants.program_internal_vlan(node, tp, &network)?;
        self.l3
            .handle_interface_event(node, tp, Some(&network), Action::Update);

        if self.bridges.create_local_network(node, &network)? {
            self.providers.interface_update(&network, node, tp)?;
            self.stats.provider_updates += 1;
        } else {
            trace!(
                node = %node,
                interface = %tp.name,
                network = %network.network_id,
                "Local network already present"
            );
        }
        Ok(true)
    }

    /// Deletes the interface a port event names.
    ///
    /// A carried snapshot wins over the store, which may already have
    /// dropped the port. Without one the port is looked up by name, which
    /// fails if ports on several bridges share it.
    fn process_port_delete(&mut self, event: &SouthboundEvent) -> Result<TaskStatus> {
        let node = event.node();
        if let Some(tp) = event.termination_point() {
            return self.handle_interface_delete(node, tp, event.context());
        }

        let port_name = event.port_name().ok_or(SouthboundError::MissingEventField {
            kind: EventKind::Port,
            field: "port_name",
        })?;
        match self.topology.termination_point(node, port_name)? {
            Some(tp) => self.handle_interface_delete(node, &tp, event.context()),
            None => {
                warn!(node = %node, port = port_name, "Deleted port not found on node");
                Ok(TaskStatus::Ignore)
            }
        }
    }

    /// Delete decision shared by the row and port paths.
    pub fn handle_interface_delete(
        &mut self,
        node: &NodeId,
        tp: &TerminationPoint,
        context: Option<&TenantNetwork>,
    ) -> Result<TaskStatus> {
        let physical = self.bridges.physical_interface_names(node);
        if tp.is_infrastructure(&physical) {
            self.providers.infrastructure_delete(node, tp)?;
            self.stats.provider_deletes += 1;
            return Ok(TaskStatus::Success);
        }

        let resolved = self.resolution.resolve_with_context(tp, context)?;
        let Some(network) = self.resolution.managed(resolved) else {
            trace!(node = %node, interface = %tp.name, "No managed tenant network for deleted interface");
            return Ok(TaskStatus::Ignore);
        };

        // An unknown sibling set never counts as the last instance
        let is_last_instance = match self.tracker.is_last_instance(node, tp, &network) {
            Ok(is_last) => is_last,
            Err(e) => {
                error!(
                    node = %node,
                    interface = %tp.name,
                    network = %network.network_id,
                    error = %e,
                    "Failed to enumerate interfaces, skipping VLAN reclaim"
                );
                false
            }
        };

        self.l3
            .handle_interface_event(node, tp, Some(&network), Action::Delete);

        if network.network_type.requires_tunnel_endpoint()
            && self.configuration.tunnel_endpoint(node).is_none()
        {
            return Err(SouthboundError::ConfigurationMissing {
                node: node.to_string(),
            });
        }

        if is_last_instance && self.providers.has_per_tenant_tunneling(node)? {
            self.tenants.reclaim_internal_vlan(node, &network)?;
            self.stats.vlan_reclaims += 1;
        }

        self.providers
            .interface_delete(&network, node, tp, is_last_instance)?;
        self.stats.provider_deletes += 1;
        Ok(TaskStatus::Success)
    }
}

#[async_trait]
impl Orch for SouthboundHandler {
    fn name(&self) -> &str {
        HANDLER_NAME
    }

    async fn do_task(&mut self) {
        let statuses = self.process_batch();
        debug!(
            processed = statuses.len(),
            pending = self.queue.pending_count(),
            "Southbound batch done"
        );
    }

    fn has_pending_tasks(&self) -> bool {
        self.queue.has_pending()
    }

    fn dump_pending_tasks(&self) -> Vec<String> {
        let mut dump = vec![format!(
            "{}: processed={} succeeded={} ignored={} failed={} vlan_reclaims={} provider_updates={} provider_deletes={}",
            HANDLER_NAME,
            self.stats.events_processed,
            self.stats.events_succeeded,
            self.stats.events_ignored,
            self.stats.events_failed,
            self.stats.vlan_reclaims,
            self.stats.provider_updates,
            self.stats.provider_deletes,
        )];
        dump.extend(self.queue.dump());
        dump
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{NetworkingProvider, NetworkingProviderManager};
    use crate::error::LookupResult;
    use crate::memory::{InMemoryInventory, LoggingL3Adapter};
    use crate::types::{InterfaceType, NetworkType};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Update(String),
        Delete {
            network_type: String,
            network: Option<String>,
            interface: String,
            is_last: bool,
        },
        FlowRules(String),
    }

    struct MockProvider {
        per_tenant_tunneling: bool,
        calls: Mutex<Vec<Call>>,
    }

    impl NetworkingProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        fn has_per_tenant_tunneling(&self) -> bool {
            self.per_tenant_tunneling
        }

        fn handle_interface_update(
            &self,
            _network: &TenantNetwork,
            _node: &NodeId,
            tp: &TerminationPoint,
        ) -> LookupResult<()> {
            self.calls.lock().push(Call::Update(tp.name.clone()));
            Ok(())
        }

        fn handle_interface_delete(
            &self,
            network_type: &str,
            network: Option<&TenantNetwork>,
            _node: &NodeId,
            tp: &TerminationPoint,
            is_last_instance: bool,
        ) -> LookupResult<()> {
            self.calls.lock().push(Call::Delete {
                network_type: network_type.to_string(),
                network: network.map(|n| n.network_id.clone()),
                interface: tp.name.clone(),
                is_last: is_last_instance,
            });
            Ok(())
        }

        fn initialize_flow_rules(&self, node: &NodeId) -> LookupResult<()> {
            self.calls.lock().push(Call::FlowRules(node.to_string()));
            Ok(())
        }
    }

    struct MockManager(Arc<MockProvider>);

    impl NetworkingProviderManager for MockManager {
        fn provider(&self, _node: &NodeId) -> LookupResult<Arc<dyn NetworkingProvider>> {
            Ok(self.0.clone())
        }
    }

    struct Fixture {
        inventory: Arc<InMemoryInventory>,
        provider: Arc<MockProvider>,
        handler: SouthboundHandler,
        node: NodeId,
    }

    impl Fixture {
        fn new(per_tenant_tunneling: bool) -> Self {
            let inventory = Arc::new(InMemoryInventory::new());
            let node = NodeId::new("n1");
            inventory.add_node(node.clone());
            inventory.set_tunnel_endpoint(&node, Some("192.0.2.1".parse().unwrap()));

            let provider = Arc::new(MockProvider {
                per_tenant_tunneling,
                calls: Mutex::new(Vec::new()),
            });
            let collaborators = Collaborators {
                topology: inventory.clone(),
                tenants: inventory.clone(),
                bridges: inventory.clone(),
                configuration: inventory.clone(),
                providers: Arc::new(MockManager(provider.clone())),
                l3: Arc::new(LoggingL3Adapter),
            };
            let handler = SouthboundHandler::new(collaborators, QueueConfig::new("southbound"));

            Self {
                inventory,
                provider,
                handler,
                node,
            }
        }

        fn vm_port(&self, name: &str, port_id: &str, network_id: &str) -> TerminationPoint {
            self.inventory.bind_port(port_id, network_id);
            let tp = TerminationPoint::new(name, Uuid::new_v4())
                .with_bridge("br-int")
                .with_external_id("iface-id", port_id);
            self.inventory.add_termination_point(&self.node, tp.clone());
            tp
        }

        fn calls(&self) -> Vec<Call> {
            self.provider.calls.lock().clone()
        }

        fn deletes(&self) -> Vec<Call> {
            self.calls()
                .into_iter()
                .filter(|c| matches!(c, Call::Delete { .. }))
                .collect()
        }
    }

    fn delete_call(network_type: &str, network: Option<&str>, interface: &str, is_last: bool) -> Call {
        Call::Delete {
            network_type: network_type.to_string(),
            network: network.map(str::to_string),
            interface: interface.to_string(),
            is_last,
        }
    }

    #[test]
    fn test_node_add_prepares_node() {
        let mut f = Fixture::new(true);
        let node = f.node.clone();
        f.handler.ovsdb_update(node.clone(), "node", Action::Add);
        f.handler.ovsdb_update(node.clone(), "node", Action::Delete);

        assert_eq!(f.handler.process_all(), vec![TaskStatus::Success, TaskStatus::Ignore]);
        assert!(f.inventory.is_prepared(&node));
    }

    #[test]
    fn test_unknown_device_type_still_processed() {
        let mut f = Fixture::new(true);
        let node = f.node.clone();
        f.handler.ovsdb_update(node.clone(), "Flow_Sample_Collector_Set", Action::Add);

        assert_eq!(f.handler.process_all(), vec![TaskStatus::Success]);
        assert!(f.inventory.is_prepared(&node));
    }

    #[test]
    fn test_controller_event_is_dropped() {
        let mut f = Fixture::new(true);
        let node = f.node.clone();
        f.handler.ovsdb_update(node, "controller", Action::Add);

        assert_eq!(f.handler.process_all(), vec![TaskStatus::InvalidEntry]);
        assert_eq!(f.handler.stats().events_failed, 1);
    }

    #[test]
    fn test_bridge_events() {
        let mut f = Fixture::new(true);
        let node = f.node.clone();
        f.handler.ovsdb_update(node.clone(), "bridge", Action::Add);
        assert_eq!(f.handler.process_all(), vec![TaskStatus::Ignore]);

        f.inventory.set_bridge(&node, Bridge::new("br-int"));
        f.handler.ovsdb_update(node.clone(), "bridge", Action::Update);
        f.handler.ovsdb_update(node, "bridge", Action::Delete);
        assert_eq!(f.handler.process_all(), vec![TaskStatus::Success, TaskStatus::Ignore]);
    }

    #[test]
    fn test_port_add_programs_vlan_and_notifies_provider_once() {
        let mut f = Fixture::new(true);
        f.inventory.add_network(TenantNetwork::new("net-x", NetworkType::Vxlan));
        f.vm_port("tap-a", "p-a", "net-x");
        let node = f.node.clone();

        f.handler.port_update(node.clone(), "tap-a", Action::Add, None);
        f.handler.port_update(node.clone(), "tap-a", Action::Update, None);
        assert_eq!(f.handler.process_all(), vec![TaskStatus::Success, TaskStatus::Success]);

        assert_eq!(f.inventory.vlan_program_count(), 2);
        assert_eq!(f.inventory.internal_vlan(&node, "net-x"), Some(1));
        // Second update finds the local network already present
        assert_eq!(f.calls(), vec![Call::Update("tap-a".to_string())]);
    }

    #[test]
    fn test_externally_routed_network_is_never_touched() {
        let mut f = Fixture::new(true);
        f.inventory
            .add_network(TenantNetwork::new("ext", NetworkType::Flat).externally_routed());
        f.vm_port("qg-1", "p-ext", "ext");
        let node = f.node.clone();

        f.handler.port_update(node.clone(), "qg-1", Action::Add, None);
        f.handler.port_update(node.clone(), "qg-1", Action::Delete, None);
        assert_eq!(f.handler.process_all(), vec![TaskStatus::Ignore, TaskStatus::Ignore]);

        assert_eq!(f.inventory.vlan_program_count(), 0);
        assert_eq!(f.inventory.vlan_reclaim_count(), 0);
        assert!(f.calls().is_empty());
    }

    #[test]
    fn test_shared_network_reclaimed_on_last_delete() {
        let mut f = Fixture::new(true);
        f.inventory.add_network(TenantNetwork::new("net-x", NetworkType::Vlan));
        let a = f.vm_port("tap-a", "p-a", "net-x");
        f.vm_port("tap-b", "p-b", "net-x");
        let node = f.node.clone();

        f.handler.port_update(node.clone(), "tap-a", Action::Delete, None);
        assert_eq!(f.handler.process_all(), vec![TaskStatus::Success]);
        assert_eq!(f.inventory.vlan_reclaim_count(), 0);

        f.inventory.remove_termination_point(&node, &a.name);
        f.handler.port_update(node.clone(), "tap-b", Action::Delete, None);
        assert_eq!(f.handler.process_all(), vec![TaskStatus::Success]);
        assert_eq!(f.inventory.vlan_reclaim_count(), 1);

        assert_eq!(
            f.deletes(),
            vec![
                delete_call("vlan", Some("net-x"), "tap-a", false),
                delete_call("vlan", Some("net-x"), "tap-b", true),
            ]
        );
        assert_eq!(f.handler.stats().vlan_reclaims, 1);
        assert_eq!(f.handler.stats().provider_deletes, 2);
    }

    #[test]
    fn test_last_delete_without_per_tenant_tunneling_keeps_vlan() {
        let mut f = Fixture::new(false);
        f.inventory.add_network(TenantNetwork::new("net-x", NetworkType::Vlan));
        f.vm_port("tap-a", "p-a", "net-x");
        let node = f.node.clone();

        f.handler.port_update(node, "tap-a", Action::Delete, None);
        assert_eq!(f.handler.process_all(), vec![TaskStatus::Success]);

        assert_eq!(f.inventory.vlan_reclaim_count(), 0);
        assert_eq!(f.deletes(), vec![delete_call("vlan", Some("net-x"), "tap-a", true)]);
    }

    #[test]
    fn test_tunnel_interface_delete_skips_tenant_handling() {
        let mut f = Fixture::new(true);
        f.inventory.add_network(TenantNetwork::new("net-x", NetworkType::Vlan));
        // Bound to a network, but a tunnel port all the same
        f.inventory.bind_port("p-vx", "net-x");
        let vx = TerminationPoint::new("vxlan-0a000002", Uuid::new_v4())
            .with_type(InterfaceType::Vxlan)
            .with_external_id("iface-id", "p-vx");
        f.inventory.add_termination_point(&f.node, vx);
        let node = f.node.clone();

        f.handler.port_update(node, "vxlan-0a000002", Action::Delete, None);
        assert_eq!(f.handler.process_all(), vec![TaskStatus::Success]);

        assert_eq!(f.inventory.vlan_reclaim_count(), 0);
        assert_eq!(f.deletes(), vec![delete_call("vxlan", None, "vxlan-0a000002", false)]);
    }

    #[test]
    fn test_physical_interface_delete() {
        let mut f = Fixture::new(true);
        let node = f.node.clone();
        f.inventory.set_physical_interfaces(&node, ["eth1"]);
        f.inventory
            .add_termination_point(&node, TerminationPoint::new("eth1", Uuid::new_v4()));

        f.handler.port_update(node, "eth1", Action::Delete, None);
        assert_eq!(f.handler.process_all(), vec![TaskStatus::Success]);
        assert_eq!(f.deletes(), vec![delete_call("system", None, "eth1", false)]);
    }

    #[test]
    fn test_missing_tunnel_endpoint_blocks_delete() {
        let mut f = Fixture::new(true);
        f.inventory.add_network(TenantNetwork::new("net-t", NetworkType::Vxlan));
        f.vm_port("tap-a", "p-a", "net-t");
        let node = f.node.clone();
        f.inventory.set_tunnel_endpoint(&node, None);

        f.handler.port_update(node, "tap-a", Action::Delete, None);
        assert_eq!(f.handler.process_all(), vec![TaskStatus::Failed]);

        assert_eq!(f.inventory.vlan_reclaim_count(), 0);
        assert!(f.deletes().is_empty());
    }

    #[test]
    fn test_missing_tunnel_endpoint_does_not_block_vlan_network() {
        let mut f = Fixture::new(true);
        f.inventory.add_network(TenantNetwork::new("net-v", NetworkType::Vlan));
        f.vm_port("tap-a", "p-a", "net-v");
        let node = f.node.clone();
        f.inventory.set_tunnel_endpoint(&node, None);

        f.handler.port_update(node, "tap-a", Action::Delete, None);
        assert_eq!(f.handler.process_all(), vec![TaskStatus::Success]);
        assert_eq!(f.inventory.vlan_reclaim_count(), 1);
    }

    #[test]
    fn test_enumeration_failure_skips_reclaim_only() {
        let mut f = Fixture::new(true);
        f.inventory.add_network(TenantNetwork::new("net-x", NetworkType::Vlan));
        let a = f.vm_port("tap-a", "p-a", "net-x");
        let node = f.node.clone();
        f.inventory.fail_enumeration(&node, true);

        let status = f.handler.handle_interface_delete(&node, &a, None).unwrap();
        assert_eq!(status, TaskStatus::Success);
        assert_eq!(f.inventory.vlan_reclaim_count(), 0);
        assert_eq!(f.deletes(), vec![delete_call("vlan", Some("net-x"), "tap-a", false)]);
    }

    #[test]
    fn test_unknown_port_delete_is_ignored() {
        let mut f = Fixture::new(true);
        let node = f.node.clone();
        f.handler.port_update(node, "ghost", Action::Delete, None);
        assert_eq!(f.handler.process_all(), vec![TaskStatus::Ignore]);
    }

    #[test]
    fn test_port_delete_snapshot_outlives_store() {
        let mut f = Fixture::new(true);
        f.inventory.add_network(TenantNetwork::new("net-x", NetworkType::Vlan));
        let a = f.vm_port("tap-a", "p-a", "net-x");
        let node = f.node.clone();
        f.inventory.remove_termination_point(&node, &a.name);

        f.handler.port_update(node.clone(), "tap-a", Action::Delete, None);
        f.handler.port_snapshot_update(node, a, Action::Delete, None);
        assert_eq!(f.handler.process_all(), vec![TaskStatus::Ignore, TaskStatus::Success]);

        assert_eq!(f.inventory.vlan_reclaim_count(), 1);
        assert_eq!(f.deletes(), vec![delete_call("vlan", Some("net-x"), "tap-a", true)]);
    }

    #[test]
    fn test_port_delete_by_shared_name_is_refused() {
        let mut f = Fixture::new(true);
        f.inventory.add_network(TenantNetwork::new("net-x", NetworkType::Vlan));
        f.vm_port("tap0", "p-a", "net-x");
        let external = TerminationPoint::new("tap0", Uuid::new_v4()).with_bridge("br-ex");
        f.inventory.add_termination_point(&f.node, external.clone());
        let node = f.node.clone();

        f.handler.port_update(node.clone(), "tap0", Action::Delete, None);
        assert_eq!(f.handler.process_all(), vec![TaskStatus::Failed]);
        assert!(f.deletes().is_empty());

        // The snapshot names the br-ex port, which has no tenant network
        f.handler.port_snapshot_update(node, external, Action::Delete, None);
        assert_eq!(f.handler.process_all(), vec![TaskStatus::Ignore]);
        assert_eq!(f.inventory.vlan_reclaim_count(), 0);
        assert!(f.deletes().is_empty());
    }

    #[test]
    fn test_rescan_continues_past_failing_interface() {
        let mut f = Fixture::new(true);
        f.inventory.add_network(TenantNetwork::new("net-x", NetworkType::Vxlan));
        f.vm_port("tap-a", "p-a", "net-x");
        f.vm_port("tap-b", "p-b", "net-x");
        f.inventory.fail_tenant_lookup("p-a", true);
        let node = f.node.clone();

        f.handler.port_update(node.clone(), "tap-b", Action::Add, None);
        assert_eq!(f.handler.process_all(), vec![TaskStatus::Failed]);
        assert_eq!(f.inventory.vlan_program_count(), 1);
        assert_eq!(f.calls(), vec![Call::Update("tap-b".to_string())]);

        f.inventory.fail_tenant_lookup("p-a", false);
        f.handler.port_update(node, "tap-a", Action::Update, None);
        assert_eq!(f.handler.process_all(), vec![TaskStatus::Success]);
        assert_eq!(f.inventory.vlan_program_count(), 3);
    }

    #[test]
    fn test_row_delete_uses_context() {
        let mut f = Fixture::new(true);
        let node = f.node.clone();
        let network = TenantNetwork::new("net-ctx", NetworkType::Vlan);
        let row: Row = [
            ("name".to_string(), json!("tap-z")),
            ("type".to_string(), json!("")),
            ("external_ids".to_string(), json!(["map", []])),
        ]
        .into_iter()
        .collect();

        f.handler.row_update(
            node,
            "Interface",
            Uuid::new_v4(),
            row,
            Action::Delete,
            Some(network),
        );
        assert_eq!(f.handler.process_all(), vec![TaskStatus::Success]);
        assert_eq!(f.deletes(), vec![delete_call("vlan", Some("net-ctx"), "tap-z", true)]);
    }

    #[test]
    fn test_row_without_name_fails() {
        let mut f = Fixture::new(true);
        let node = f.node.clone();
        f.handler
            .row_update(node, "Interface", Uuid::new_v4(), Row::new(), Action::Delete, None);
        assert_eq!(f.handler.process_all(), vec![TaskStatus::Failed]);
    }

    #[test]
    fn test_root_row_triggers_rescan() {
        let mut f = Fixture::new(true);
        f.inventory.add_network(TenantNetwork::new("net-x", NetworkType::Vxlan));
        f.vm_port("tap-a", "p-a", "net-x");
        f.vm_port("tap-b", "p-b", "net-x");
        let node = f.node.clone();

        f.handler
            .row_update(node.clone(), "Open_vSwitch", Uuid::new_v4(), Row::new(), Action::Update, None);
        f.handler
            .row_update(node, "Flow_Table", Uuid::new_v4(), Row::new(), Action::Add, None);
        assert_eq!(f.handler.process_all(), vec![TaskStatus::Success, TaskStatus::Ignore]);
        assert_eq!(f.inventory.vlan_program_count(), 2);
    }

    #[test]
    fn test_device_of_interest_initializes_flows() {
        let mut f = Fixture::new(true);
        let node = f.node.clone();
        f.handler.notify_device_of_interest(node.clone(), Action::Add);
        f.handler.notify_device_of_interest(node, Action::Delete);

        assert_eq!(f.handler.process_all(), vec![TaskStatus::Success, TaskStatus::Ignore]);
        assert_eq!(f.calls(), vec![Call::FlowRules("n1".to_string())]);
    }

    #[test]
    fn test_stats_and_dump() {
        let mut f = Fixture::new(true);
        let node = f.node.clone();
        f.handler.ovsdb_update(node.clone(), "node", Action::Add);
        f.handler.ovsdb_update(node, "controller", Action::Delete);

        assert!(f.handler.has_pending_tasks());
        let dump = f.handler.dump_pending_tasks();
        assert_eq!(dump.len(), 3);
        assert!(dump[1].starts_with("southbound[0]"));

        f.handler.process_all();
        assert!(!f.handler.has_pending_tasks());
        assert_eq!(
            f.handler.stats(),
            &SouthboundHandlerStats {
                events_processed: 2,
                events_succeeded: 1,
                events_failed: 1,
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn test_do_task_respects_batch_size() {
        let inventory = Arc::new(InMemoryInventory::new());
        let provider = Arc::new(MockProvider {
            per_tenant_tunneling: true,
            calls: Mutex::new(Vec::new()),
        });
        let collaborators = Collaborators {
            topology: inventory.clone(),
            tenants: inventory.clone(),
            bridges: inventory.clone(),
            configuration: inventory.clone(),
            providers: Arc::new(MockManager(provider)),
            l3: Arc::new(LoggingL3Adapter),
        };
        let mut handler =
            SouthboundHandler::new(collaborators, QueueConfig::new("southbound").with_batch_size(2));
        for i in 0..3 {
            handler.ovsdb_update(NodeId::new(format!("n{}", i)), "node", Action::Add);
        }

        assert_eq!(handler.batch_size(), 2);
        handler.do_task().await;
        assert_eq!(handler.pending_count(), 1);
        handler.do_task().await;
        assert_eq!(handler.pending_count(), 0);
        assert_eq!(handler.name(), "SouthboundHandler");
    }
}
