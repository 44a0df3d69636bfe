//! Interfaces of the external collaborators the handler drives.
//!
//! Every collaborator is a synchronous `Send + Sync` trait object. A call may
//! block on the collaborator's own I/O; the handler tolerates that by
//! processing one event at a time.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;

use crate::error::LookupResult;
use crate::types::{Bridge, NodeId, TenantNetwork, TerminationPoint};
use netvirt_orch_common::Action;

/// Read access to the current switch inventory.
pub trait TopologyStore: Send + Sync {
    /// All termination points on the node, across its bridges.
    fn termination_points(&self, node: &NodeId) -> LookupResult<Vec<TerminationPoint>>;

    /// The termination point with the given name, if present.
    ///
    /// Names are only unique per bridge; fails with
    /// [`crate::error::CollaboratorError::Ambiguous`] when ports on several
    /// bridges share the name.
    fn termination_point(&self, node: &NodeId, name: &str) -> LookupResult<Option<TerminationPoint>>;

    /// The node's integration bridge, if present.
    fn bridge(&self, node: &NodeId) -> LookupResult<Option<Bridge>>;
}

/// Tenant network lookup and per-node internal VLAN allocation.
pub trait TenantNetworkManager: Send + Sync {
    /// The tenant network the interface is bound to, if any.
    fn tenant_network(&self, tp: &TerminationPoint) -> LookupResult<Option<TenantNetwork>>;

    /// Externally routed networks are excluded from VLAN/tunnel handling.
    fn is_network_externally_routed(&self, network: &TenantNetwork) -> bool {
        network.router_external
    }

    /// Allocates (first call) or reuses the node's internal VLAN for the
    /// network and programs it on the interface.
    fn program_internal_vlan(
        &self,
        node: &NodeId,
        tp: &TerminationPoint,
        network: &TenantNetwork,
    ) -> LookupResult<()>;

    /// Releases the node's internal VLAN for the network.
    fn reclaim_internal_vlan(&self, node: &NodeId, network: &TenantNetwork) -> LookupResult<()>;
}

/// Bridge and local-network provisioning.
pub trait BridgeConfigurationManager: Send + Sync {
    /// Creates the bridges a freshly connected node needs.
    fn prepare_node(&self, node: &NodeId) -> LookupResult<()>;

    /// Ensures a local representation of the network exists on the node.
    ///
    /// Returns true only if it was created by this call.
    fn create_local_network(&self, node: &NodeId, network: &TenantNetwork) -> LookupResult<bool>;

    /// Names of the node's physical uplink interfaces.
    fn physical_interface_names(&self, node: &NodeId) -> HashSet<String>;
}

/// Node-level configuration.
pub trait ConfigurationService: Send + Sync {
    /// Local tunnel endpoint address of the node.
    fn tunnel_endpoint(&self, node: &NodeId) -> Option<IpAddr>;
}

/// Dataplane backend for one node.
pub trait NetworkingProvider: Send + Sync {
    /// Provider name (for logging).
    fn name(&self) -> &str;

    /// Returns true if the provider isolates tenants with per-tenant tunnels
    /// and therefore relies on per-node internal VLANs.
    fn has_per_tenant_tunneling(&self) -> bool;

    /// An interface joined a tenant network on the node.
    fn handle_interface_update(
        &self,
        network: &TenantNetwork,
        node: &NodeId,
        tp: &TerminationPoint,
    ) -> LookupResult<()>;

    /// An interface left the node.
    ///
    /// `network` is `None` for tunnel and physical interfaces, in which case
    /// `network_type` carries the interface type.
    fn handle_interface_delete(
        &self,
        network_type: &str,
        network: Option<&TenantNetwork>,
        node: &NodeId,
        tp: &TerminationPoint,
        is_last_instance: bool,
    ) -> LookupResult<()>;

    /// Installs the base flow rules on a freshly connected node.
    fn initialize_flow_rules(&self, node: &NodeId) -> LookupResult<()>;
}

/// Resolves the provider responsible for a node.
pub trait NetworkingProviderManager: Send + Sync {
    fn provider(&self, node: &NodeId) -> LookupResult<Arc<dyn NetworkingProvider>>;
}

/// Routing-layer consumer of interface events.
pub trait L3Adapter: Send + Sync {
    /// Best-effort notification; never fails the caller.
    fn handle_interface_event(
        &self,
        node: &NodeId,
        tp: &TerminationPoint,
        network: Option<&TenantNetwork>,
        action: Action,
    );
}

/// Collaborators handed to [`crate::SouthboundHandler::new`].
#[derive(Clone)]
pub struct Collaborators {
    pub topology: Arc<dyn TopologyStore>,
    pub tenants: Arc<dyn TenantNetworkManager>,
    pub bridges: Arc<dyn BridgeConfigurationManager>,
    pub configuration: Arc<dyn ConfigurationService>,
    pub providers: Arc<dyn NetworkingProviderManager>,
    pub l3: Arc<dyn L3Adapter>,
}
