//! Recording collaborators
//!
//! Capture every call the handler makes so tests can assert on the exact
//! sequence, the way mock-mode managers capture shell commands.

use parking_lot::Mutex;
use std::sync::Arc;

use netvirt_southbound::{
    Action, L3Adapter, LookupResult, NetworkingProvider, NetworkingProviderManager, NodeId,
    TenantNetwork, TerminationPoint,
};

/// One call received by a [`RecordingProvider`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    InterfaceUpdate {
        node: String,
        interface: String,
        network: String,
    },
    InterfaceDelete {
        network_type: String,
        network: Option<String>,
        node: String,
        interface: String,
        is_last_instance: bool,
    },
    InitializeFlowRules {
        node: String,
    },
}

impl ProviderCall {
    pub fn is_delete(&self) -> bool {
        matches!(self, ProviderCall::InterfaceDelete { .. })
    }

    pub fn is_update(&self) -> bool {
        matches!(self, ProviderCall::InterfaceUpdate { .. })
    }
}

/// Provider that records calls and always succeeds
#[derive(Debug)]
pub struct RecordingProvider {
    per_tenant_tunneling: bool,
    calls: Mutex<Vec<ProviderCall>>,
}

impl RecordingProvider {
    pub fn new(per_tenant_tunneling: bool) -> Self {
        Self {
            per_tenant_tunneling,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().clone()
    }

    pub fn deletes(&self) -> Vec<ProviderCall> {
        self.calls().into_iter().filter(ProviderCall::is_delete).collect()
    }

    pub fn updates(&self) -> Vec<ProviderCall> {
        self.calls().into_iter().filter(ProviderCall::is_update).collect()
    }
}

impl NetworkingProvider for RecordingProvider {
    fn name(&self) -> &str {
        "recording"
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
        self.calls.lock().push(ProviderCall::InterfaceUpdate {
            node: node.to_string(),
            interface: tp.name.clone(),
            network: network.network_id.clone(),
        });
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
        self.calls.lock().push(ProviderCall::InterfaceDelete {
            network_type: network_type.to_string(),
            network: network.map(|n| n.network_id.clone()),
            node: node.to_string(),
            interface: tp.name.clone(),
            is_last_instance,
        });
        Ok(())
    }

    fn initialize_flow_rules(&self, node: &NodeId) -> LookupResult<()> {
        self.calls.lock().push(ProviderCall::InitializeFlowRules {
            node: node.to_string(),
        });
        Ok(())
    }
}

/// Routes every node to one recording provider
pub struct RecordingProviderManager {
    provider: Arc<RecordingProvider>,
}

impl RecordingProviderManager {
    pub fn new(provider: Arc<RecordingProvider>) -> Self {
        Self { provider }
    }
}

impl NetworkingProviderManager for RecordingProviderManager {
    fn provider(&self, _node: &NodeId) -> LookupResult<Arc<dyn NetworkingProvider>> {
        Ok(self.provider.clone())
    }
}

/// One notification received by a [`RecordingL3Adapter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct L3Event {
    pub node: String,
    pub interface: String,
    pub network: Option<String>,
    pub action: Action,
}

#[derive(Debug, Default)]
pub struct RecordingL3Adapter {
    events: Mutex<Vec<L3Event>>,
}

impl RecordingL3Adapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<L3Event> {
        self.events.lock().clone()
    }
}

impl L3Adapter for RecordingL3Adapter {
    fn handle_interface_event(
        &self,
        node: &NodeId,
        tp: &TerminationPoint,
        network: Option<&TenantNetwork>,
        action: Action,
    ) {
        self.events.lock().push(L3Event {
            node: node.to_string(),
            interface: tp.name.clone(),
            network: network.map(|n| n.network_id.clone()),
            action,
        });
    }
}
