//! netvirt-southbound - OVSDB southbound reconciliation engine
//!
//! Receives change notifications from managed virtual switches (nodes,
//! bridges, ports, raw table rows), queues them as typed events and
//! reconciles each one against the tenant network model: internal VLANs
//! are programmed and reclaimed, the routing layer is told about interface
//! changes, and the node's networking provider installs or removes flows.
//!
//! Collaborators are injected through [`Collaborators`]; the
//! [`memory`] module provides in-process implementations.

pub mod api;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod handler;
pub mod logging;
pub mod memory;
pub mod notation;
pub mod provider;
pub mod tables;
pub mod tenant;
pub mod types;

pub use api::{
    BridgeConfigurationManager, Collaborators, ConfigurationService, L3Adapter, NetworkingProvider,
    NetworkingProviderManager, TenantNetworkManager, TopologyStore,
};
pub use config::SouthboundConfig;
pub use dispatcher::{DispatcherConfig, EventDispatcher, EventSink};
pub use error::{CollaboratorError, ConfigError, LookupResult, NotationError, SouthboundError};
pub use event::{classify, EventKind, SouthboundEvent};
pub use handler::{SouthboundHandler, SouthboundHandlerStats};
pub use provider::ProviderDispatch;
pub use tenant::{LifetimeTracker, TenantResolution};
pub use types::{Bridge, InterfaceType, NetworkType, NodeId, TenantNetwork, TerminationPoint};

pub use netvirt_orch_common::{Action, Orch, QueueConfig, TaskStatus};
