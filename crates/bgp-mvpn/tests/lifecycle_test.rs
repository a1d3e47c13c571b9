//! Tree manager lifecycle and table creation through the family registry.

mod common;

use bgp_mvpn::{
    create_table, MvpnTable, RoutingInstance, TableError, DEFAULT_INSTANCE_NAME,
    FAMILY_TABLE_NAME,
};
use common::*;
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[test]
fn test_tenant_attach_creates_and_initializes_once() {
    let factory = MockTreeManagerFactory::new(None);
    let ctx = context_with(Arc::new(factory.clone()));

    let mut table = MvpnTable::new("blue.inetmvpn.0", &ctx);
    assert!(factory.events().is_empty());

    table.set_routing_instance(RoutingInstance::new("blue"));
    assert_eq!(
        factory.events(),
        vec![
            TreeEvent::Create("blue.inetmvpn.0".to_string()),
            TreeEvent::Initialize,
        ]
    );
    assert!(table.tree_manager().is_some());
    assert_eq!(table.routing_instance().unwrap().name(), "blue");
}

#[test]
fn test_default_attach_creates_nothing() {
    let factory = MockTreeManagerFactory::new(None);
    let ctx = context_with(Arc::new(factory.clone()));

    let mut table = default_table(&ctx);
    assert!(table.is_default());
    assert_eq!(
        table.routing_instance().unwrap().name(),
        DEFAULT_INSTANCE_NAME
    );
    assert!(table.tree_manager().is_none());

    table.shutdown();
    drop(table);
    assert!(factory.events().is_empty());
}

#[test]
fn test_shutdown_terminates_once() {
    let factory = MockTreeManagerFactory::new(None);
    let ctx = context_with(Arc::new(factory.clone()));
    let mut table = tenant_table(&ctx, "blue");

    table.shutdown();
    assert!(table.tree_manager().is_none());
    assert_eq!(factory.events().last(), Some(&TreeEvent::Terminate));

    table.shutdown();
    drop(table);
    let terminations = factory
        .events()
        .iter()
        .filter(|e| **e == TreeEvent::Terminate)
        .count();
    assert_eq!(terminations, 1);
}

#[test]
fn test_drop_terminates_active_tree_manager() {
    let factory = MockTreeManagerFactory::new(None);
    let ctx = context_with(Arc::new(factory.clone()));

    let table = tenant_table(&ctx, "blue");
    drop(table);
    assert_eq!(factory.events().last(), Some(&TreeEvent::Terminate));
}

#[test]
#[should_panic(expected = "tree manager already active")]
fn test_second_tenant_attach_panics() {
    let factory = MockTreeManagerFactory::new(None);
    let ctx = context_with(Arc::new(factory));
    let mut table = tenant_table(&ctx, "blue");
    table.set_routing_instance(RoutingInstance::new("blue"));
}

#[test]
fn test_registry_builds_instance_tables() {
    let factory = MockTreeManagerFactory::new(None);
    let ctx = context_with(Arc::new(factory.clone()));

    let mut master = create_table(&ctx, FAMILY_TABLE_NAME)
        .unwrap()
        .into_inetmvpn()
        .unwrap();
    master.set_routing_instance(RoutingInstance::default_instance());

    let mut red = create_table(&ctx, "red.inetmvpn.0")
        .unwrap()
        .into_inetmvpn()
        .unwrap();
    red.set_routing_instance(RoutingInstance::new("red"));

    assert_eq!(master.partition_count(), TEST_PARTITIONS);
    assert_eq!(red.partition_count(), TEST_PARTITIONS);
    assert_eq!(
        factory.events(),
        vec![
            TreeEvent::Create("red.inetmvpn.0".to_string()),
            TreeEvent::Initialize,
        ]
    );
}

#[test]
fn test_registry_rejects_unknown_family() {
    let ctx = context_with(Arc::new(MockTreeManagerFactory::new(None)));
    let err = create_table(&ctx, "blue.inet.0").unwrap_err();
    assert!(matches!(err, TableError::UnknownFamily(_)));
}
