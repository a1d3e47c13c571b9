//! Routing instance identity and the shared server context tables are
//! built against.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::attr::{AttrDb, InternAttrDb};
use crate::tree_manager::{NoOpTreeManagerFactory, TreeManagerFactory};

/// Name of the default (master) routing instance.
pub const DEFAULT_INSTANCE_NAME: &str = "default-domain:default-project:ip-fabric:__default__";

/// Default number of partitions per table.
pub const DEFAULT_PARTITION_COUNT: usize = 7;

/// A routing instance a table can be bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoutingInstance {
    name: String,
    is_default: bool,
}

impl RoutingInstance {
    /// Creates a tenant (non-default) instance.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_default: false,
        }
    }

    /// Creates the default instance.
    pub fn default_instance() -> Self {
        Self {
            name: DEFAULT_INSTANCE_NAME.to_string(),
            is_default: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }
}

impl fmt::Display for RoutingInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Process-wide collaborators shared by every table.
#[derive(Clone)]
pub struct ServerContext {
    attr_db: Arc<dyn AttrDb>,
    tree_manager_factory: Arc<dyn TreeManagerFactory>,
    partition_count: usize,
}

impl ServerContext {
    /// Creates a context.
    ///
    /// # Panics
    ///
    /// Panics if `partition_count` is zero.
    pub fn new(
        attr_db: Arc<dyn AttrDb>,
        tree_manager_factory: Arc<dyn TreeManagerFactory>,
        partition_count: usize,
    ) -> Self {
        assert!(partition_count > 0, "partition count must be non-zero");
        Self {
            attr_db,
            tree_manager_factory,
            partition_count,
        }
    }

    pub fn attr_db(&self) -> &dyn AttrDb {
        self.attr_db.as_ref()
    }

    pub fn tree_manager_factory(&self) -> &Arc<dyn TreeManagerFactory> {
        &self.tree_manager_factory
    }

    pub fn partition_count(&self) -> usize {
        self.partition_count
    }
}

impl Default for ServerContext {
    fn default() -> Self {
        Self::new(
            Arc::new(InternAttrDb::new()),
            Arc::new(NoOpTreeManagerFactory),
            DEFAULT_PARTITION_COUNT,
        )
    }
}

impl fmt::Debug for ServerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerContext")
            .field("partition_count", &self.partition_count)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instances() {
        let master = RoutingInstance::default_instance();
        assert!(master.is_default());
        assert_eq!(master.name(), DEFAULT_INSTANCE_NAME);

        let blue = RoutingInstance::new("blue");
        assert!(!blue.is_default());
        assert_eq!(blue.to_string(), "blue");
    }

    #[test]
    fn test_default_context() {
        let ctx = ServerContext::default();
        assert_eq!(ctx.partition_count(), DEFAULT_PARTITION_COUNT);
    }

    #[test]
    #[should_panic(expected = "partition count must be non-zero")]
    fn test_zero_partitions_panics() {
        ServerContext::new(
            Arc::new(InternAttrDb::new()),
            Arc::new(NoOpTreeManagerFactory),
            0,
        );
    }
}
