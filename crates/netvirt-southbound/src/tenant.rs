//! Tenant resolution and last-instance tracking.
//!
//! The per-(node, network) internal VLAN is reference counted implicitly:
//! no count is stored, it is recomputed by scanning the node's live
//! interfaces whenever one of them is deleted.

use std::sync::Arc;
use tracing::{debug, trace};

use crate::api::{TenantNetworkManager, TopologyStore};
use crate::error::LookupResult;
use crate::types::{NodeId, TenantNetwork, TerminationPoint};

/// Decides which tenant network, if any, an interface belongs to.
#[derive(Clone)]
pub struct TenantResolution {
    tenants: Arc<dyn TenantNetworkManager>,
}

impl TenantResolution {
    pub fn new(tenants: Arc<dyn TenantNetworkManager>) -> Self {
        Self { tenants }
    }

    /// Looks up the interface's tenant network.
    pub fn resolve(&self, tp: &TerminationPoint) -> LookupResult<Option<TenantNetwork>> {
        self.tenants.tenant_network(tp)
    }

    /// Uses the caller-supplied network when present, else looks it up.
    pub fn resolve_with_context(
        &self,
        tp: &TerminationPoint,
        context: Option<&TenantNetwork>,
    ) -> LookupResult<Option<TenantNetwork>> {
        match context {
            Some(network) => Ok(Some(network.clone())),
            None => self.resolve(tp),
        }
    }

    /// Returns true if the network is excluded from VLAN/tunnel handling.
    pub fn is_externally_routed(&self, network: &TenantNetwork) -> bool {
        self.tenants.is_network_externally_routed(network)
    }

    /// Keeps the network only if it is subject to VLAN/tunnel handling.
    pub fn managed(&self, network: Option<TenantNetwork>) -> Option<TenantNetwork> {
        network.filter(|n| !self.is_externally_routed(n))
    }
}

/// Answers "is this the last interface of the network on the node?".
#[derive(Clone)]
pub struct LifetimeTracker {
    topology: Arc<dyn TopologyStore>,
    resolution: TenantResolution,
}

impl LifetimeTracker {
    pub fn new(topology: Arc<dyn TopologyStore>, resolution: TenantResolution) -> Self {
        Self {
            topology,
            resolution,
        }
    }

    /// Returns true if no interface on `node` other than `deleted` resolves
    /// to `network`.
    ///
    /// Siblings are matched by interface UUID, not by name: names are only
    /// unique per bridge. Any enumeration or lookup failure is returned to
    /// the caller instead of being folded into a guess.
    pub fn is_last_instance(
        &self,
        node: &NodeId,
        deleted: &TerminationPoint,
        network: &TenantNetwork,
    ) -> LookupResult<bool> {
        for tp in self.topology.termination_points(node)? {
            if tp.interface_uuid == deleted.interface_uuid {
                continue;
            }
            if self.resolution.resolve(&tp)?.as_ref() == Some(network) {
                debug!(
                    node = %node,
                    interface = %deleted.name,
                    sibling = %tp.name,
                    network = %network.network_id,
                    "Network still in use on node"
                );
                return Ok(false);
            }
        }

        trace!(
            node = %node,
            interface = %deleted.name,
            network = %network.network_id,
            "Last instance of network on node"
        );
        Ok(true)
    }
}
