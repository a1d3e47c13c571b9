//! Shared fixtures for the inetmvpn integration tests.
//!
//! The RIB-out and tree-manager mocks record what the table asks of them
//! so tests can check both results and interactions.

#![allow(dead_code)]

use bgp_mvpn::{
    BgpAttr, BgpPath, InternAttrDb, McastTreeManager, MvpnPrefix, MvpnRoute, MvpnTable,
    PathFlags, PathSource, PeerId, RibOut, RibPeerSet, RouteDistinguisher, RoutingInstance,
    ServerContext, TreeManagerFactory, UpdateInfo,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub const TEST_PARTITIONS: usize = 7;

pub fn prefix(s: &str) -> MvpnPrefix {
    s.parse().unwrap()
}

pub fn rd(s: &str) -> RouteDistinguisher {
    s.parse().unwrap()
}

/// Server context with an interning attribute store and the given factory.
pub fn context_with(factory: Arc<dyn TreeManagerFactory>) -> ServerContext {
    ServerContext::new(Arc::new(InternAttrDb::new()), factory, TEST_PARTITIONS)
}

pub fn default_table(ctx: &ServerContext) -> MvpnTable {
    let mut table = MvpnTable::new("inetmvpn.0", ctx);
    table.set_routing_instance(RoutingInstance::default_instance());
    table
}

pub fn tenant_table(ctx: &ServerContext, instance: &str) -> MvpnTable {
    let mut table = MvpnTable::new(format!("{}.inetmvpn.0", instance), ctx);
    table.set_routing_instance(RoutingInstance::new(instance));
    table
}

/// A feasible path learned from `peer`, with its attributes interned.
pub fn peer_path(
    ctx: &ServerContext,
    peer: Option<u32>,
    local_pref: u32,
    source_rd: RouteDistinguisher,
) -> BgpPath {
    let attr = ctx
        .attr_db()
        .locate(BgpAttr::new(local_pref).with_source_rd(source_rd));
    BgpPath::new(
        peer.map(PeerId),
        0,
        PathSource::BgpXmpp,
        attr,
        PathFlags::NONE,
        0,
    )
}

/// Installs a route with a single path in `table` and returns a copy of it.
pub fn install(table: &mut MvpnTable, prefix: MvpnPrefix, path: BgpPath) -> MvpnRoute {
    let route = table.add_path(prefix, path).unwrap().clone();
    table.drain_notifications();
    route
}

/// Calls made on a [`MockTreeManager`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEvent {
    Create(String),
    Initialize,
    Terminate,
    GetUpdateInfo(MvpnPrefix),
}

/// Tree manager that records calls and returns a fixed label.
pub struct MockTreeManager {
    events: Arc<Mutex<Vec<TreeEvent>>>,
    deleted: Arc<AtomicBool>,
    label: Option<u32>,
}

impl McastTreeManager for MockTreeManager {
    fn initialize(&mut self) {
        self.events.lock().unwrap().push(TreeEvent::Initialize);
    }

    fn terminate(&mut self) {
        self.deleted.store(true, Ordering::SeqCst);
        self.events.lock().unwrap().push(TreeEvent::Terminate);
    }

    fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::SeqCst)
    }

    fn get_update_info(&self, route: &MvpnRoute) -> Option<UpdateInfo> {
        self.events
            .lock()
            .unwrap()
            .push(TreeEvent::GetUpdateInfo(*route.prefix()));
        let label = self.label?;
        let attr = route.best_path().map(|p| p.attr().clone());
        Some(UpdateInfo::new(attr, label))
    }
}

/// Factory for [`MockTreeManager`]; every manager shares its recorders.
#[derive(Clone)]
pub struct MockTreeManagerFactory {
    pub events: Arc<Mutex<Vec<TreeEvent>>>,
    pub deleted: Arc<AtomicBool>,
    pub label: Option<u32>,
}

impl MockTreeManagerFactory {
    pub fn new(label: Option<u32>) -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            deleted: Arc::new(AtomicBool::new(false)),
            label,
        }
    }

    pub fn events(&self) -> Vec<TreeEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Flags every manager built by this factory as being torn down.
    pub fn mark_deleted(&self) {
        self.deleted.store(true, Ordering::SeqCst);
    }
}

impl TreeManagerFactory for MockTreeManagerFactory {
    fn create(&self, table_name: &str) -> Box<dyn McastTreeManager> {
        self.events
            .lock()
            .unwrap()
            .push(TreeEvent::Create(table_name.to_string()));
        Box::new(MockTreeManager {
            events: self.events.clone(),
            deleted: self.deleted.clone(),
            label: self.label,
        })
    }
}

/// RIB-out with a fixed peer registration table.
pub struct MockRibOut {
    encoding_bgp: bool,
    peers: HashMap<PeerId, usize>,
    computed: Arc<Mutex<Vec<MvpnPrefix>>>,
}

impl MockRibOut {
    pub fn bgp() -> Self {
        Self::new(true)
    }

    pub fn native() -> Self {
        Self::new(false)
    }

    fn new(encoding_bgp: bool) -> Self {
        Self {
            encoding_bgp,
            peers: HashMap::new(),
            computed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_peer(mut self, peer: u32, index: usize) -> Self {
        self.peers.insert(PeerId(peer), index);
        self
    }

    /// Routes the generic computation was asked about.
    pub fn computed(&self) -> Vec<MvpnPrefix> {
        self.computed.lock().unwrap().clone()
    }
}

impl RibOut for MockRibOut {
    fn is_encoding_bgp(&self) -> bool {
        self.encoding_bgp
    }

    fn is_registered(&self, peer: PeerId) -> bool {
        self.peers.contains_key(&peer)
    }

    fn peer_index(&self, peer: PeerId) -> Option<usize> {
        self.peers.get(&peer).copied()
    }

    fn compute_update_info(&self, route: &MvpnRoute, peerset: &RibPeerSet) -> Option<UpdateInfo> {
        self.computed.lock().unwrap().push(*route.prefix());
        let best = route.best_path()?;
        let mut uinfo = UpdateInfo::new(Some(best.attr().clone()), best.label());
        uinfo.target = peerset.clone();
        Some(uinfo)
    }
}
