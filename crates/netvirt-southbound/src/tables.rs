//! Table, column and type name constants for the Open_vSwitch schema

/// Root table of the Open_vSwitch database
pub const OPEN_VSWITCH_TABLE: &str = "Open_vSwitch";

/// Interface table
pub const INTERFACE_TABLE: &str = "Interface";

/// Device-level change types reported by the inventory listener
pub mod device_types {
    pub const NODE: &str = "node";
    pub const BRIDGE: &str = "bridge";
    pub const PORT: &str = "port";
    pub const CONTROLLER: &str = "controller";
    pub const OPENVSWITCH: &str = "openvswitch";
}

/// Interface table column names
pub mod interface_columns {
    pub const NAME: &str = "name";
    pub const TYPE: &str = "type";
    pub const EXTERNAL_IDS: &str = "external_ids";
    pub const OFPORT: &str = "ofport";
}

/// Well-known `external_ids` keys
pub mod external_ids {
    /// Neutron port id bound to the interface
    pub const IFACE_ID: &str = "iface-id";
    /// MAC address of the attached VM NIC
    pub const ATTACHED_MAC: &str = "attached-mac";
}

/// Interface `type` column values
pub mod interface_types {
    pub const SYSTEM: &str = "system";
    pub const INTERNAL: &str = "internal";
    pub const PATCH: &str = "patch";
    pub const VXLAN: &str = "vxlan";
    pub const GRE: &str = "gre";
}

/// Provider network types
pub mod network_types {
    pub const VLAN: &str = "vlan";
    pub const VXLAN: &str = "vxlan";
    pub const GRE: &str = "gre";
    pub const FLAT: &str = "flat";
    pub const LOCAL: &str = "local";
}

/// Returns true if `name` designates `table`, ignoring ASCII case.
pub fn is_table(name: &str, table: &str) -> bool {
    name.eq_ignore_ascii_case(table)
}
