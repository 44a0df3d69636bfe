//! In-memory collaborators.
//!
//! [`InMemoryInventory`] keeps nodes, tenant bindings and internal VLAN
//! allocations in process memory and implements every lookup-side
//! collaborator. [`LoggingProvider`] and [`LoggingL3Adapter`] only log what
//! they are asked to do. Together they let the daemon run standalone and
//! give tests a real topology to scan.

use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, info};

use crate::api::{
    BridgeConfigurationManager, ConfigurationService, L3Adapter, NetworkingProvider,
    NetworkingProviderManager, TenantNetworkManager, TopologyStore,
};
use crate::error::{CollaboratorError, LookupResult};
use crate::types::{Bridge, NodeId, TenantNetwork, TerminationPoint};
use netvirt_orch_common::Action;

/// Lowest internal VLAN tag handed out
pub const MIN_INTERNAL_VLAN: u16 = 1;
/// Highest internal VLAN tag handed out
pub const MAX_INTERNAL_VLAN: u16 = 4094;

const INTEGRATION_BRIDGE: &str = "br-int";

#[derive(Debug, Default)]
struct NodeState {
    bridge: Option<Bridge>,
    termination_points: Vec<TerminationPoint>,
    physical_interfaces: HashSet<String>,
    tunnel_endpoint: Option<IpAddr>,
    local_networks: HashSet<String>,
    /// network id -> internal VLAN tag
    internal_vlans: HashMap<String, u16>,
    prepared: bool,
    fail_enumeration: bool,
}

#[derive(Debug, Default)]
struct Inner {
    nodes: HashMap<NodeId, NodeState>,
    networks: HashMap<String, TenantNetwork>,
    /// port id (`external_ids:iface-id`) -> network id
    port_bindings: HashMap<String, String>,
    /// port ids whose tenant lookup fails
    failing_ports: HashSet<String>,
    vlan_programs: u64,
    vlan_reclaims: u64,
}

impl Inner {
    fn node(&self, node: &NodeId) -> LookupResult<&NodeState> {
        self.nodes
            .get(node)
            .ok_or_else(|| CollaboratorError::not_found("node", node.as_str()))
    }

    fn node_mut(&mut self, node: &NodeId) -> LookupResult<&mut NodeState> {
        self.nodes
            .get_mut(node)
            .ok_or_else(|| CollaboratorError::not_found("node", node.as_str()))
    }
}

/// Inventory, tenant and configuration state held in memory.
#[derive(Debug, Default)]
pub struct InMemoryInventory {
    inner: RwLock<Inner>,
}

impl InMemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&self, node: NodeId) {
        self.inner.write().nodes.entry(node).or_default();
    }

    pub fn set_bridge(&self, node: &NodeId, bridge: Bridge) {
        self.inner.write().nodes.entry(node.clone()).or_default().bridge = Some(bridge);
    }

    pub fn add_termination_point(&self, node: &NodeId, tp: TerminationPoint) {
        let mut inner = self.inner.write();
        let state = inner.nodes.entry(node.clone()).or_default();
        state
            .termination_points
            .retain(|existing| existing.interface_uuid != tp.interface_uuid);
        state.termination_points.push(tp);
    }

    /// Removes the first termination point with the given name.
    pub fn remove_termination_point(&self, node: &NodeId, name: &str) -> Option<TerminationPoint> {
        let mut inner = self.inner.write();
        let state = inner.nodes.get_mut(node)?;
        let idx = state.termination_points.iter().position(|tp| tp.name == name)?;
        Some(state.termination_points.remove(idx))
    }

    pub fn set_physical_interfaces<I, S>(&self, node: &NodeId, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.write().nodes.entry(node.clone()).or_default().physical_interfaces =
            names.into_iter().map(Into::into).collect();
    }

    pub fn set_tunnel_endpoint(&self, node: &NodeId, endpoint: Option<IpAddr>) {
        self.inner.write().nodes.entry(node.clone()).or_default().tunnel_endpoint = endpoint;
    }

    pub fn add_network(&self, network: TenantNetwork) {
        self.inner
            .write()
            .networks
            .insert(network.network_id.clone(), network);
    }

    /// Binds a port id (as found in `external_ids:iface-id`) to a network.
    pub fn bind_port(&self, port_id: impl Into<String>, network_id: impl Into<String>) {
        self.inner
            .write()
            .port_bindings
            .insert(port_id.into(), network_id.into());
    }

    /// Makes `termination_points` fail for the node.
    pub fn fail_enumeration(&self, node: &NodeId, fail: bool) {
        self.inner.write().nodes.entry(node.clone()).or_default().fail_enumeration = fail;
    }

    /// Makes `tenant_network` fail for interfaces bound to the port id.
    pub fn fail_tenant_lookup(&self, port_id: impl Into<String>, fail: bool) {
        let mut inner = self.inner.write();
        let port_id = port_id.into();
        if fail {
            inner.failing_ports.insert(port_id);
        } else {
            inner.failing_ports.remove(&port_id);
        }
    }

    /// Internal VLAN currently allocated to the network on the node.
    pub fn internal_vlan(&self, node: &NodeId, network_id: &str) -> Option<u16> {
        let inner = self.inner.read();
        inner.nodes.get(node)?.internal_vlans.get(network_id).copied()
    }

    pub fn vlan_program_count(&self) -> u64 {
        self.inner.read().vlan_programs
    }

    pub fn vlan_reclaim_count(&self) -> u64 {
        self.inner.read().vlan_reclaims
    }

    pub fn is_prepared(&self, node: &NodeId) -> bool {
        self.inner.read().nodes.get(node).is_some_and(|s| s.prepared)
    }

    pub fn has_local_network(&self, node: &NodeId, network_id: &str) -> bool {
        self.inner
            .read()
            .nodes
            .get(node)
            .is_some_and(|s| s.local_networks.contains(network_id))
    }
}

impl TopologyStore for InMemoryInventory {
    fn termination_points(&self, node: &NodeId) -> LookupResult<Vec<TerminationPoint>> {
        let inner = self.inner.read();
        let state = inner.node(node)?;
        if state.fail_enumeration {
            return Err(CollaboratorError::unavailable(
                "topology",
                format!("termination points of {} unavailable", node),
            ));
        }
        Ok(state.termination_points.clone())
    }

    fn termination_point(&self, node: &NodeId, name: &str) -> LookupResult<Option<TerminationPoint>> {
        let inner = self.inner.read();
        let matches: Vec<&TerminationPoint> = inner
            .node(node)?
            .termination_points
            .iter()
            .filter(|tp| tp.name == name)
            .collect();
        match matches.as_slice() {
            [] => Ok(None),
            [tp] => Ok(Some((*tp).clone())),
            _ => Err(CollaboratorError::ambiguous(
                "termination point",
                name,
                matches.len(),
            )),
        }
    }

    fn bridge(&self, node: &NodeId) -> LookupResult<Option<Bridge>> {
        Ok(self.inner.read().node(node)?.bridge.clone())
    }
}

impl TenantNetworkManager for InMemoryInventory {
    fn tenant_network(&self, tp: &TerminationPoint) -> LookupResult<Option<TenantNetwork>> {
        let Some(port_id) = tp.iface_id() else {
            return Ok(None);
        };
        let inner = self.inner.read();
        if inner.failing_ports.contains(port_id) {
            return Err(CollaboratorError::unavailable(
                "tenant network manager",
                format!("binding of port {} unavailable", port_id),
            ));
        }
        Ok(inner
            .port_bindings
            .get(port_id)
            .and_then(|network_id| inner.networks.get(network_id))
            .cloned())
    }

    fn program_internal_vlan(
        &self,
        node: &NodeId,
        tp: &TerminationPoint,
        network: &TenantNetwork,
    ) -> LookupResult<()> {
        let mut inner = self.inner.write();
        inner.vlan_programs += 1;
        let state = inner.node_mut(node)?;

        if let Some(tag) = state.internal_vlans.get(&network.network_id) {
            debug!(node = %node, interface = %tp.name, vlan = tag, "Reusing internal VLAN");
            return Ok(());
        }

        let used: BTreeSet<u16> = state.internal_vlans.values().copied().collect();
        let tag = (MIN_INTERNAL_VLAN..=MAX_INTERNAL_VLAN)
            .find(|t| !used.contains(t))
            .ok_or_else(|| {
                CollaboratorError::backend("tenant network manager", "no free internal VLAN")
            })?;
        state.internal_vlans.insert(network.network_id.clone(), tag);
        info!(node = %node, interface = %tp.name, network = %network.network_id, vlan = tag, "Allocated internal VLAN");
        Ok(())
    }

    fn reclaim_internal_vlan(&self, node: &NodeId, network: &TenantNetwork) -> LookupResult<()> {
        let mut inner = self.inner.write();
        inner.vlan_reclaims += 1;
        let state = inner.node_mut(node)?;
        if let Some(tag) = state.internal_vlans.remove(&network.network_id) {
            info!(node = %node, network = %network.network_id, vlan = tag, "Reclaimed internal VLAN");
        }
        state.local_networks.remove(&network.network_id);
        Ok(())
    }
}

impl BridgeConfigurationManager for InMemoryInventory {
    fn prepare_node(&self, node: &NodeId) -> LookupResult<()> {
        let mut inner = self.inner.write();
        let state = inner.nodes.entry(node.clone()).or_default();
        if state.bridge.is_none() {
            state.bridge = Some(Bridge::new(INTEGRATION_BRIDGE));
        }
        state.prepared = true;
        Ok(())
    }

    fn create_local_network(&self, node: &NodeId, network: &TenantNetwork) -> LookupResult<bool> {
        let mut inner = self.inner.write();
        Ok(inner
            .node_mut(node)?
            .local_networks
            .insert(network.network_id.clone()))
    }

    fn physical_interface_names(&self, node: &NodeId) -> HashSet<String> {
        self.inner
            .read()
            .nodes
            .get(node)
            .map(|s| s.physical_interfaces.clone())
            .unwrap_or_default()
    }
}

impl ConfigurationService for InMemoryInventory {
    fn tunnel_endpoint(&self, node: &NodeId) -> Option<IpAddr> {
        self.inner.read().nodes.get(node)?.tunnel_endpoint
    }
}

/// Provider that logs every request and succeeds.
#[derive(Debug, Clone)]
pub struct LoggingProvider {
    name: String,
    per_tenant_tunneling: bool,
}

impl LoggingProvider {
    pub fn new(name: impl Into<String>, per_tenant_tunneling: bool) -> Self {
        Self {
            name: name.into(),
            per_tenant_tunneling,
        }
    }
}

impl NetworkingProvider for LoggingProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_per_tenant_tunneling(&self) -> bool {
        self.per_tenant_tunneling
    }

    fn handle_interface_update(
        &self,
        network: &TenantNetwork,
        node: &NodeId,
        tp: &TerminationPoint,
    ) -> LookupResult<()> {
        info!(node = %node, interface = %tp.name, network = %network, "Provider interface update");
        Ok(())
    }

    fn handle_interface_delete(
        &self,
        network_type: &str,
        network: Option<&TenantNetwork>,
        node: &NodeId,
        tp: &TerminationPoint,
        is_last_instance: bool,
    ) -> LookupResult<()> {
        info!(
            node = %node,
            interface = %tp.name,
            network_type,
            network = network.map(|n| n.network_id.as_str()),
            is_last_instance,
            "Provider interface delete"
        );
        Ok(())
    }

    fn initialize_flow_rules(&self, node: &NodeId) -> LookupResult<()> {
        info!(node = %node, "Provider flow rules initialized");
        Ok(())
    }
}

/// Routes every node to the same provider.
#[derive(Clone)]
pub struct StaticProviderManager {
    provider: Arc<dyn NetworkingProvider>,
}

impl StaticProviderManager {
    pub fn new(provider: Arc<dyn NetworkingProvider>) -> Self {
        Self { provider }
    }
}

impl NetworkingProviderManager for StaticProviderManager {
    fn provider(&self, _node: &NodeId) -> LookupResult<Arc<dyn NetworkingProvider>> {
        Ok(Arc::clone(&self.provider))
    }
}

/// Routing layer that only logs.
#[derive(Debug, Default, Clone)]
pub struct LoggingL3Adapter;

impl L3Adapter for LoggingL3Adapter {
    fn handle_interface_event(
        &self,
        node: &NodeId,
        tp: &TerminationPoint,
        network: Option<&TenantNetwork>,
        action: Action,
    ) {
        debug!(
            node = %node,
            interface = %tp.name,
            network = network.map(|n| n.network_id.as_str()),
            %action,
            "L3 interface event"
        );
    }
}
