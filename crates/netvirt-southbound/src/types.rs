//! Type definitions for the southbound reconciliation engine

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::NotationError;
use crate::notation::{self, Row};
use crate::tables::{external_ids, interface_columns, interface_types, network_types};

/// Identifier of a managed virtual switch instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Interface type as reported in the Interface table `type` column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterfaceType {
    /// Ordinary network device (empty `type` column)
    System,
    /// Internal port of the switch
    Internal,
    /// Patch port between bridges
    Patch,
    /// VXLAN tunnel port
    Vxlan,
    /// GRE tunnel port
    Gre,
    /// Anything else (tap, geneve, dpdk, ...)
    Other(String),
}

impl FromStr for InterfaceType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Ok(match lower.as_str() {
            "" | interface_types::SYSTEM => InterfaceType::System,
            interface_types::INTERNAL => InterfaceType::Internal,
            interface_types::PATCH => InterfaceType::Patch,
            interface_types::VXLAN => InterfaceType::Vxlan,
            interface_types::GRE => InterfaceType::Gre,
            _ => InterfaceType::Other(lower),
        })
    }
}

impl InterfaceType {
    /// Convert to string
    pub fn as_str(&self) -> &str {
        match self {
            InterfaceType::System => interface_types::SYSTEM,
            InterfaceType::Internal => interface_types::INTERNAL,
            InterfaceType::Patch => interface_types::PATCH,
            InterfaceType::Vxlan => interface_types::VXLAN,
            InterfaceType::Gre => interface_types::GRE,
            InterfaceType::Other(s) => s,
        }
    }

    /// Returns true for tunnel encapsulation ports.
    pub fn is_tunnel(&self) -> bool {
        matches!(self, InterfaceType::Vxlan | InterfaceType::Gre)
    }
}

/// A logical interface/port attached to a bridge on a managed switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminationPoint {
    /// Interface name (unique per bridge, not per node)
    pub name: String,
    /// Interface type
    pub interface_type: InterfaceType,
    /// Owning bridge name (empty when decoded from a bare Interface row)
    pub bridge: String,
    /// Interface row UUID, unique per node
    pub interface_uuid: Uuid,
    /// `external_ids` column
    pub external_ids: BTreeMap<String, String>,
    /// OpenFlow port number, once assigned
    pub ofport: Option<i64>,
}

impl TerminationPoint {
    /// Create a system interface with no bridge or external ids
    pub fn new(name: impl Into<String>, interface_uuid: Uuid) -> Self {
        Self {
            name: name.into(),
            interface_type: InterfaceType::System,
            bridge: String::new(),
            interface_uuid,
            external_ids: BTreeMap::new(),
            ofport: None,
        }
    }

    pub fn with_type(mut self, interface_type: InterfaceType) -> Self {
        self.interface_type = interface_type;
        self
    }

    pub fn with_bridge(mut self, bridge: impl Into<String>) -> Self {
        self.bridge = bridge.into();
        self
    }

    pub fn with_external_id(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.external_ids.insert(key.into(), value.into());
        self
    }

    /// Neutron port id bound to this interface, if any.
    pub fn iface_id(&self) -> Option<&str> {
        self.external_ids.get(external_ids::IFACE_ID).map(String::as_str)
    }

    /// Returns true for tunnel ports and physical uplinks, which are wired
    /// by the provider independently of any tenant network.
    pub fn is_infrastructure(&self, physical_interface_names: &HashSet<String>) -> bool {
        self.interface_type.is_tunnel() || physical_interface_names.contains(&self.name)
    }

    /// Builds a termination point from a raw Interface table row.
    pub fn from_interface_row(interface_uuid: Uuid, row: &Row) -> Result<Self, NotationError> {
        let name = notation::string_column(row, interface_columns::NAME)?;
        let interface_type = notation::optional_string_column(row, interface_columns::TYPE)?
            .unwrap_or_default()
            .parse::<InterfaceType>()
            .unwrap_or(InterfaceType::System);

        Ok(Self {
            name,
            interface_type,
            bridge: String::new(),
            interface_uuid,
            external_ids: notation::map_column(row, interface_columns::EXTERNAL_IDS)?,
            ofport: notation::optional_integer_column(row, interface_columns::OFPORT)?,
        })
    }
}

impl fmt::Display for TerminationPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.interface_type.as_str(), self.interface_uuid)
    }
}

/// Bridge on a managed node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bridge {
    pub name: String,
}

impl Bridge {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Provider network type of a tenant network
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkType {
    Vlan,
    Vxlan,
    Gre,
    Flat,
    Local,
    Other(String),
}

impl FromStr for NetworkType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Ok(match lower.as_str() {
            network_types::VLAN => NetworkType::Vlan,
            network_types::VXLAN => NetworkType::Vxlan,
            network_types::GRE => NetworkType::Gre,
            network_types::FLAT => NetworkType::Flat,
            network_types::LOCAL => NetworkType::Local,
            _ => NetworkType::Other(lower),
        })
    }
}

impl NetworkType {
    pub fn as_str(&self) -> &str {
        match self {
            NetworkType::Vlan => network_types::VLAN,
            NetworkType::Vxlan => network_types::VXLAN,
            NetworkType::Gre => network_types::GRE,
            NetworkType::Flat => network_types::FLAT,
            NetworkType::Local => network_types::LOCAL,
            NetworkType::Other(s) => s,
        }
    }

    /// VLAN networks are the only ones that work without a tunnel endpoint.
    pub fn requires_tunnel_endpoint(&self) -> bool {
        !matches!(self, NetworkType::Vlan)
    }
}

/// A tenant logical network.
///
/// Two values denote the same network when their `network_id` matches;
/// the remaining fields are descriptive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantNetwork {
    /// Network UUID as assigned by the orchestration layer
    pub network_id: String,
    /// Human readable name
    #[serde(default)]
    pub name: String,
    /// Provider network type
    pub network_type: NetworkType,
    /// Segmentation id (VLAN tag or VNI)
    #[serde(default)]
    pub segmentation_id: Option<String>,
    /// Traffic exits via an external gateway
    #[serde(default)]
    pub router_external: bool,
}

impl TenantNetwork {
    pub fn new(network_id: impl Into<String>, network_type: NetworkType) -> Self {
        Self {
            network_id: network_id.into(),
            name: String::new(),
            network_type,
            segmentation_id: None,
            router_external: false,
        }
    }

    pub fn with_segmentation_id(mut self, segmentation_id: impl Into<String>) -> Self {
        self.segmentation_id = Some(segmentation_id.into());
        self
    }

    pub fn externally_routed(mut self) -> Self {
        self.router_external = true;
        self
    }
}

impl PartialEq for TenantNetwork {
    fn eq(&self, other: &Self) -> bool {
        self.network_id == other.network_id
    }
}

impl Eq for TenantNetwork {}

impl Hash for TenantNetwork {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.network_id.hash(state);
    }
}

impl fmt::Display for TenantNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.network_id, self.network_type.as_str())
    }
}
