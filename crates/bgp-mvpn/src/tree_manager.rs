//! Multicast distribution-tree manager interface and its per-table
//! lifecycle slot.

use std::fmt;
use tracing::{debug, info};

use crate::ribout::UpdateInfo;
use crate::route::MvpnRoute;

/// Computes multicast distribution trees for one table and supplies
/// per-route update info for the native-encoding export path.
pub trait McastTreeManager: Send {
    /// Starts the manager. Called once, right after construction.
    fn initialize(&mut self);

    /// Stops the manager. Called once, right before it is dropped.
    fn terminate(&mut self);

    /// Returns true once the manager is being torn down.
    fn is_deleted(&self) -> bool;

    /// Returns update info for `route`, or `None` if there is nothing to send.
    fn get_update_info(&self, route: &MvpnRoute) -> Option<UpdateInfo>;
}

/// Builds tree managers for tables.
pub trait TreeManagerFactory: Send + Sync {
    fn create(&self, table_name: &str) -> Box<dyn McastTreeManager>;
}

/// Tree manager that never produces update info.
///
/// Used when no tree-building backend is wired in.
#[derive(Debug, Default)]
pub struct NoOpTreeManager {
    deleted: bool,
}

impl McastTreeManager for NoOpTreeManager {
    fn initialize(&mut self) {}

    fn terminate(&mut self) {
        self.deleted = true;
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }

    fn get_update_info(&self, _route: &MvpnRoute) -> Option<UpdateInfo> {
        None
    }
}

/// Factory for [`NoOpTreeManager`].
#[derive(Debug, Default)]
pub struct NoOpTreeManagerFactory;

impl TreeManagerFactory for NoOpTreeManagerFactory {
    fn create(&self, _table_name: &str) -> Box<dyn McastTreeManager> {
        Box::new(NoOpTreeManager::default())
    }
}

/// Two-state holder for a table's tree manager: absent or active.
#[derive(Default)]
pub(crate) enum TreeManagerSlot {
    #[default]
    Absent,
    Active(Box<dyn McastTreeManager>),
}

impl TreeManagerSlot {
    /// Builds and initializes a tree manager.
    ///
    /// # Panics
    ///
    /// Panics if a tree manager is already active.
    pub(crate) fn activate(&mut self, factory: &dyn TreeManagerFactory, table_name: &str) {
        assert!(
            matches!(self, TreeManagerSlot::Absent),
            "tree manager already active for table {}",
            table_name
        );

        let mut manager = factory.create(table_name);
        manager.initialize();
        *self = TreeManagerSlot::Active(manager);

        info!("Created tree manager for table {}", table_name);
    }

    /// Terminates and releases the tree manager, if any.
    pub(crate) fn deactivate(&mut self, table_name: &str) {
        match std::mem::take(self) {
            TreeManagerSlot::Active(mut manager) => {
                manager.terminate();
                info!("Destroyed tree manager for table {}", table_name);
            }
            TreeManagerSlot::Absent => {
                debug!("No tree manager to destroy for table {}", table_name);
            }
        }
    }

    pub(crate) fn get(&self) -> Option<&dyn McastTreeManager> {
        match self {
            TreeManagerSlot::Absent => None,
            TreeManagerSlot::Active(manager) => Some(manager.as_ref()),
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        matches!(self, TreeManagerSlot::Active(_))
    }
}

impl fmt::Debug for TreeManagerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeManagerSlot::Absent => f.write_str("Absent"),
            TreeManagerSlot::Active(_) => f.write_str("Active"),
        }
    }
}
