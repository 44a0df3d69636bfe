//! Provider dispatch.
//!
//! Resolves the capability-specific provider of a node and forwards the
//! handler's decisions to it. Polymorphism over backends lives only behind
//! [`NetworkingProvider`]; everything above this adapter is backend-agnostic.

use std::sync::Arc;
use tracing::{debug, info};

use crate::api::{NetworkingProvider, NetworkingProviderManager};
use crate::error::LookupResult;
use crate::types::{NodeId, TenantNetwork, TerminationPoint};

#[derive(Clone)]
pub struct ProviderDispatch {
    manager: Arc<dyn NetworkingProviderManager>,
}

impl ProviderDispatch {
    pub fn new(manager: Arc<dyn NetworkingProviderManager>) -> Self {
        Self { manager }
    }

    pub fn provider(&self, node: &NodeId) -> LookupResult<Arc<dyn NetworkingProvider>> {
        self.manager.provider(node)
    }

    /// Returns true if the node's provider uses per-tenant tunneling.
    pub fn has_per_tenant_tunneling(&self, node: &NodeId) -> LookupResult<bool> {
        Ok(self.provider(node)?.has_per_tenant_tunneling())
    }

    pub fn interface_update(
        &self,
        network: &TenantNetwork,
        node: &NodeId,
        tp: &TerminationPoint,
    ) -> LookupResult<()> {
        let provider = self.provider(node)?;
        debug!(
            provider = provider.name(),
            node = %node,
            interface = %tp.name,
            network = %network.network_id,
            "Dispatching interface update"
        );
        provider.handle_interface_update(network, node, tp)
    }

    pub fn interface_delete(
        &self,
        network: &TenantNetwork,
        node: &NodeId,
        tp: &TerminationPoint,
        is_last_instance: bool,
    ) -> LookupResult<()> {
        let provider = self.provider(node)?;
        debug!(
            provider = provider.name(),
            node = %node,
            interface = %tp.name,
            network = %network.network_id,
            is_last_instance,
            "Dispatching interface delete"
        );
        provider.handle_interface_delete(
            network.network_type.as_str(),
            Some(network),
            node,
            tp,
            is_last_instance,
        )
    }

    /// Deletes a tunnel or physical interface.
    ///
    /// These carry no tenant network and never count as the last instance.
    pub fn infrastructure_delete(&self, node: &NodeId, tp: &TerminationPoint) -> LookupResult<()> {
        let provider = self.provider(node)?;
        debug!(
            provider = provider.name(),
            node = %node,
            interface = %tp.name,
            interface_type = tp.interface_type.as_str(),
            "Dispatching tunnel/physical interface delete"
        );
        provider.handle_interface_delete(tp.interface_type.as_str(), None, node, tp, false)
    }

    pub fn initialize_flow_rules(&self, node: &NodeId) -> LookupResult<()> {
        let provider = self.provider(node)?;
        info!(provider = provider.name(), node = %node, "Initializing flow rules");
        provider.initialize_flow_rules(node)
    }
}
