//! Test fixtures for common southbound patterns

use serde_json::{json, Value};
use uuid::Uuid;

use netvirt_southbound::notation::Row;
use netvirt_southbound::tables::{external_ids, interface_columns};
use netvirt_southbound::{InterfaceType, NetworkType, NodeId, TenantNetwork, TerminationPoint};

/// Default node used by the harness
pub const DEFAULT_NODE: &str = "ovsdb://uuid/6a1f5c3e-0000-0000-0000-000000000001";

/// Default integration bridge name
pub const INTEGRATION_BRIDGE: &str = "br-int";

pub fn node(id: &str) -> NodeId {
    NodeId::new(id)
}

/// VM tap interface on the integration bridge, bound to `port_id`
pub fn vm_port(name: &str, port_id: &str) -> TerminationPoint {
    TerminationPoint::new(name, Uuid::new_v4())
        .with_bridge(INTEGRATION_BRIDGE)
        .with_external_id(external_ids::IFACE_ID, port_id)
        .with_external_id(external_ids::ATTACHED_MAC, "fa:16:3e:00:00:01")
}

/// Tunnel port of the given encapsulation
pub fn tunnel_port(name: &str, interface_type: InterfaceType) -> TerminationPoint {
    TerminationPoint::new(name, Uuid::new_v4())
        .with_type(interface_type)
        .with_bridge(INTEGRATION_BRIDGE)
}

/// Physical uplink on the external bridge
pub fn physical_port(name: &str) -> TerminationPoint {
    TerminationPoint::new(name, Uuid::new_v4()).with_bridge("br-ex")
}

pub fn vlan_network(id: &str, segmentation_id: &str) -> TenantNetwork {
    TenantNetwork::new(id, NetworkType::Vlan).with_segmentation_id(segmentation_id)
}

pub fn vxlan_network(id: &str, vni: &str) -> TenantNetwork {
    TenantNetwork::new(id, NetworkType::Vxlan).with_segmentation_id(vni)
}

pub fn external_network(id: &str) -> TenantNetwork {
    TenantNetwork::new(id, NetworkType::Flat).externally_routed()
}

/// Interface table row in OVSDB JSON notation
pub fn interface_row(name: &str, interface_type: &str, iface_id: Option<&str>) -> Row {
    let ids: Vec<Value> = iface_id
        .map(|id| vec![json!([external_ids::IFACE_ID, id])])
        .unwrap_or_default();

    let mut row = Row::new();
    row.insert(interface_columns::NAME.to_string(), json!(name));
    row.insert(interface_columns::TYPE.to_string(), json!(interface_type));
    row.insert(interface_columns::EXTERNAL_IDS.to_string(), json!(["map", ids]));
    row.insert(interface_columns::OFPORT.to_string(), json!(["set", []]));
    row
}

/// Interface row matching an existing termination point
pub fn interface_row_for(tp: &TerminationPoint) -> Row {
    interface_row(&tp.name, tp.interface_type.as_str(), tp.iface_id())
}
