//! Handler wired over an in-memory inventory and recording collaborators

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use netvirt_southbound::memory::InMemoryInventory;
use netvirt_southbound::{
    Collaborators, NodeId, QueueConfig, SouthboundHandler, TaskStatus, TenantNetwork,
    TerminationPoint,
};

use crate::fixtures::{node, vm_port, DEFAULT_NODE};
use crate::recorder::{RecordingL3Adapter, RecordingProvider, RecordingProviderManager};

/// Default local tunnel endpoint of the harness node
pub const DEFAULT_TUNNEL_ENDPOINT: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10));

pub struct Harness {
    pub inventory: Arc<InMemoryInventory>,
    pub provider: Arc<RecordingProvider>,
    pub l3: Arc<RecordingL3Adapter>,
    pub handler: SouthboundHandler,
    pub node: NodeId,
}

impl Harness {
    /// One node with a tunnel endpoint and no interfaces.
    pub fn new(per_tenant_tunneling: bool) -> Self {
        let inventory = Arc::new(InMemoryInventory::new());
        let node = node(DEFAULT_NODE);
        inventory.add_node(node.clone());
        inventory.set_tunnel_endpoint(&node, Some(DEFAULT_TUNNEL_ENDPOINT));

        let provider = Arc::new(RecordingProvider::new(per_tenant_tunneling));
        let l3 = Arc::new(RecordingL3Adapter::new());
        let handler = SouthboundHandler::new(
            Self::collaborators(&inventory, &provider, &l3),
            QueueConfig::new("southbound"),
        );

        Self {
            inventory,
            provider,
            l3,
            handler,
            node,
        }
    }

    /// Collaborators over the given parts, for building extra handlers.
    pub fn collaborators(
        inventory: &Arc<InMemoryInventory>,
        provider: &Arc<RecordingProvider>,
        l3: &Arc<RecordingL3Adapter>,
    ) -> Collaborators {
        Collaborators {
            topology: inventory.clone(),
            tenants: inventory.clone(),
            bridges: inventory.clone(),
            configuration: inventory.clone(),
            providers: Arc::new(RecordingProviderManager::new(provider.clone())),
            l3: l3.clone(),
        }
    }

    pub fn add_network(&self, network: TenantNetwork) -> &Self {
        self.inventory.add_network(network);
        self
    }

    /// Adds a VM port bound to `network_id` on the harness node.
    pub fn add_vm_port(&self, name: &str, port_id: &str, network_id: &str) -> TerminationPoint {
        self.inventory.bind_port(port_id, network_id);
        let tp = vm_port(name, port_id);
        self.inventory.add_termination_point(&self.node, tp.clone());
        tp
    }

    pub fn add_termination_point(&self, tp: TerminationPoint) -> TerminationPoint {
        self.inventory.add_termination_point(&self.node, tp.clone());
        tp
    }

    pub fn remove_termination_point(&self, name: &str) -> Option<TerminationPoint> {
        self.inventory.remove_termination_point(&self.node, name)
    }

    pub fn process_all(&mut self) -> Vec<TaskStatus> {
        self.handler.process_all()
    }
}
