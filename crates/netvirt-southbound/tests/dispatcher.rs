//! End-to-end flow through the event dispatcher.

use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use netvirt_southbound::memory::InMemoryInventory;
use netvirt_southbound::{
    Action, DispatcherConfig, EventDispatcher, QueueConfig, SouthboundHandler, SouthboundHandlerStats,
};
use netvirt_test::{
    interface_row_for, node, vlan_network, vm_port, Harness, ProviderCall, RecordingL3Adapter,
    RecordingProvider,
};

fn dispatcher_config() -> DispatcherConfig {
    DispatcherConfig {
        heartbeat_interval: Duration::from_millis(5),
        queue_capacity: 8,
    }
}

#[tokio::test]
async fn test_port_lifecycle_through_sink() {
    let inventory = Arc::new(InMemoryInventory::new());
    let provider = Arc::new(RecordingProvider::new(true));
    let l3 = Arc::new(RecordingL3Adapter::new());
    let n1 = node("n1");

    inventory.add_network(vlan_network("net-x", "100"));
    inventory.bind_port("port-a", "net-x");
    let tap = vm_port("tap-a", "port-a");
    inventory.add_termination_point(&n1, tap.clone());

    let handler = SouthboundHandler::new(
        Harness::collaborators(&inventory, &provider, &l3),
        QueueConfig::new("southbound").with_batch_size(2),
    );
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let (dispatcher, sink) = EventDispatcher::new(dispatcher_config(), handler, shutdown_rx);
    let event_loop = tokio::spawn(dispatcher.run());

    sink.ovsdb_update(n1.clone(), "node", Action::Add).await.unwrap();
    sink.notify_device_of_interest(n1.clone(), Action::Add)
        .await
        .unwrap();
    sink.port_update(n1.clone(), "tap-a", Action::Add).await.unwrap();
    sink.row_update(
        n1.clone(),
        "Interface",
        tap.interface_uuid,
        interface_row_for(&tap),
        Action::Delete,
        None,
    )
    .await
    .unwrap();
    drop(sink);

    let handler = event_loop.await.unwrap();
    assert_eq!(
        handler.stats(),
        &SouthboundHandlerStats {
            events_processed: 4,
            events_succeeded: 4,
            vlan_reclaims: 1,
            provider_updates: 1,
            provider_deletes: 1,
            ..Default::default()
        }
    );
    assert_eq!(
        provider.calls(),
        vec![
            ProviderCall::InitializeFlowRules {
                node: "n1".to_string()
            },
            ProviderCall::InterfaceUpdate {
                node: "n1".to_string(),
                interface: "tap-a".to_string(),
                network: "net-x".to_string(),
            },
            ProviderCall::InterfaceDelete {
                network_type: "vlan".to_string(),
                network: Some("net-x".to_string()),
                node: "n1".to_string(),
                interface: "tap-a".to_string(),
                is_last_instance: true,
            },
        ]
    );
    assert!(inventory.is_prepared(&n1));
    assert_eq!(inventory.internal_vlan(&n1, "net-x"), None);
}

#[tokio::test]
async fn test_many_producers_single_consumer() {
    let inventory = Arc::new(InMemoryInventory::new());
    let provider = Arc::new(RecordingProvider::new(true));
    let l3 = Arc::new(RecordingL3Adapter::new());
    let handler = SouthboundHandler::new(
        Harness::collaborators(&inventory, &provider, &l3),
        QueueConfig::new("southbound"),
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (dispatcher, sink) = EventDispatcher::new(dispatcher_config(), handler, shutdown_rx);
    let event_loop = tokio::spawn(dispatcher.run());

    let producers: Vec<_> = (0..4)
        .map(|i| {
            let sink = sink.clone();
            tokio::spawn(async move {
                for j in 0..5 {
                    sink.ovsdb_update(node(&format!("n{}-{}", i, j)), "node", Action::Add)
                        .await
                        .unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.await.unwrap();
    }

    shutdown_tx.send(true).unwrap();
    let handler = event_loop.await.unwrap();
    assert_eq!(handler.stats().events_processed, 20);
    assert_eq!(handler.stats().events_succeeded, 20);
    assert!(inventory.is_prepared(&node("n3-4")));
}
