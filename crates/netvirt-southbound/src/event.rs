//! Southbound event model and classifier.

use std::fmt;
use tracing::warn;
use uuid::Uuid;

use crate::notation::Row;
use crate::tables::device_types;
use crate::types::{NodeId, TenantNetwork, TerminationPoint};
use netvirt_orch_common::Action;

/// What part of the switch an event is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Managed switch instance appeared or went away
    Node,
    /// Bridge added, changed or removed
    Bridge,
    /// Port/interface added, changed or removed
    Port,
    /// Root Open_vSwitch record changed
    OpenVSwitch,
    /// Controller record changed (no handler)
    Controller,
    /// OpenFlow node of interest connected or disconnected
    OpenFlowNode,
    /// Raw table-row delta
    Row,
}

/// Maps a device-level change type to an event kind.
///
/// Matching ignores ASCII case. Unknown types never fail: they are logged
/// and classified as [`EventKind::Node`] so the event still reaches the
/// queue.
pub fn classify(device_type: &str, action: Action) -> EventKind {
    let lower = device_type.to_ascii_lowercase();
    match lower.as_str() {
        device_types::NODE => EventKind::Node,
        device_types::BRIDGE => EventKind::Bridge,
        device_types::PORT => EventKind::Port,
        device_types::CONTROLLER => EventKind::Controller,
        device_types::OPENVSWITCH => EventKind::OpenVSwitch,
        _ => {
            warn!(device_type, %action, "Invalid device type, classifying as node");
            EventKind::Node
        }
    }
}

/// One southbound change, consumed exactly once by the handler.
///
/// Fields are private; an event is immutable once built.
#[derive(Debug, Clone)]
pub struct SouthboundEvent {
    kind: EventKind,
    node: NodeId,
    action: Action,
    table_name: Option<String>,
    row_id: Option<Uuid>,
    row: Option<Row>,
    port_name: Option<String>,
    port: Option<TerminationPoint>,
    context: Option<TenantNetwork>,
}

impl SouthboundEvent {
    /// Creates a typed event with no payload.
    pub fn new(node: NodeId, kind: EventKind, action: Action) -> Self {
        Self {
            kind,
            node,
            action,
            table_name: None,
            row_id: None,
            row: None,
            port_name: None,
            port: None,
            context: None,
        }
    }

    /// Creates an event from a device-level inventory notification.
    pub fn from_ovsdb_update(node: NodeId, device_type: &str, action: Action) -> Self {
        Self::new(node, classify(device_type, action), action)
    }

    /// Creates a port event naming the affected port.
    pub fn port(node: NodeId, port_name: impl Into<String>, action: Action) -> Self {
        let mut event = Self::new(node, EventKind::Port, action);
        event.port_name = Some(port_name.into());
        event
    }

    /// Creates a port event carrying the port as the producer last saw it.
    ///
    /// The snapshot identifies the interface by UUID, so it stays usable
    /// after the topology store has dropped the port and when the name is
    /// shared by ports on different bridges.
    pub fn port_snapshot(node: NodeId, port: TerminationPoint, action: Action) -> Self {
        let mut event = Self::port(node, port.name.clone(), action);
        event.port = Some(port);
        event
    }

    /// Creates a raw row event.
    pub fn row_update(
        node: NodeId,
        table_name: impl Into<String>,
        row_id: Uuid,
        row: Row,
        action: Action,
    ) -> Self {
        let mut event = Self::new(node, EventKind::Row, action);
        event.table_name = Some(table_name.into());
        event.row_id = Some(row_id);
        event.row = Some(row);
        event
    }

    /// Creates a device-of-interest notification.
    pub fn device_of_interest(node: NodeId, action: Action) -> Self {
        Self::new(node, EventKind::OpenFlowNode, action)
    }

    /// Attaches the tenant network the caller already resolved.
    pub fn with_context(mut self, network: TenantNetwork) -> Self {
        self.context = Some(network);
        self
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn node(&self) -> &NodeId {
        &self.node
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn table_name(&self) -> Option<&str> {
        self.table_name.as_deref()
    }

    pub fn row_id(&self) -> Option<Uuid> {
        self.row_id
    }

    pub fn row(&self) -> Option<&Row> {
        self.row.as_ref()
    }

    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    pub fn termination_point(&self) -> Option<&TerminationPoint> {
        self.port.as_ref()
    }

    pub fn context(&self) -> Option<&TenantNetwork> {
        self.context.as_ref()
    }
}

impl fmt::Display for SouthboundEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {} node={}", self.kind, self.action, self.node)?;
        if let Some(table) = &self.table_name {
            write!(f, " table={}", table)?;
        }
        if let Some(id) = &self.row_id {
            write!(f, " uuid={}", id)?;
        }
        if let Some(port) = &self.port_name {
            write!(f, " port={}", port)?;
        }
        if let Some(tp) = &self.port {
            write!(f, " port_uuid={}", tp.interface_uuid)?;
        }
        if let Some(network) = &self.context {
            write!(f, " network={}", network.network_id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NetworkType;

    #[test]
    fn test_classify_known_types() {
        assert_eq!(classify("node", Action::Add), EventKind::Node);
        assert_eq!(classify("Bridge", Action::Update), EventKind::Bridge);
        assert_eq!(classify("PORT", Action::Delete), EventKind::Port);
        assert_eq!(classify("OpenVSwitch", Action::Update), EventKind::OpenVSwitch);
        assert_eq!(classify("controller", Action::Add), EventKind::Controller);
    }

    #[test]
    fn test_classify_unknown_defaults_to_node() {
        assert_eq!(classify("Flow_Table", Action::Add), EventKind::Node);
        assert_eq!(classify("", Action::Delete), EventKind::Node);
    }

    #[test]
    fn test_port_event() {
        let ev = SouthboundEvent::port(NodeId::new("n1"), "tap0", Action::Delete);
        assert_eq!(ev.kind(), EventKind::Port);
        assert_eq!(ev.port_name(), Some("tap0"));
        assert!(ev.context().is_none());
        assert_eq!(ev.to_string(), "Port DELETE node=n1 port=tap0");
    }

    #[test]
    fn test_port_snapshot_event() {
        let tp = TerminationPoint::new("tap0", Uuid::new_v4()).with_bridge("br-ex");
        let ev = SouthboundEvent::port_snapshot(NodeId::new("n1"), tp.clone(), Action::Delete);
        assert_eq!(ev.kind(), EventKind::Port);
        assert_eq!(ev.port_name(), Some("tap0"));
        assert_eq!(ev.termination_point(), Some(&tp));
        assert!(SouthboundEvent::port(NodeId::new("n1"), "tap0", Action::Delete)
            .termination_point()
            .is_none());
    }

    #[test]
    fn test_row_event_with_context() {
        let id = Uuid::new_v4();
        let ev = SouthboundEvent::row_update(NodeId::new("n1"), "Interface", id, Row::new(), Action::Delete)
            .with_context(TenantNetwork::new("net-1", NetworkType::Vxlan));

        assert_eq!(ev.kind(), EventKind::Row);
        assert_eq!(ev.table_name(), Some("Interface"));
        assert_eq!(ev.row_id(), Some(id));
        assert!(ev.row().is_some());
        assert_eq!(ev.context().map(|n| n.network_id.as_str()), Some("net-1"));
    }

    #[test]
    fn test_from_ovsdb_update() {
        let ev = SouthboundEvent::from_ovsdb_update(NodeId::new("n1"), "bridge", Action::Add);
        assert_eq!(ev.kind(), EventKind::Bridge);
        assert_eq!(ev.action(), Action::Add);
        assert_eq!(ev.node().as_str(), "n1");
    }
}
