//! Process-wide registry mapping address-family table names to table
//! constructors.
//!
//! The inetmvpn table is registered under [`FAMILY_TABLE_NAME`] on first
//! use. Instance tables are created under `<instance>.<family>` and resolve
//! to the family's constructor by suffix.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::{Result, TableError};
use crate::instance::ServerContext;
use crate::table::{MvpnTable, FAMILY_TABLE_NAME};

/// A table of any registered family.
#[derive(Debug)]
pub enum RoutingTable {
    InetMvpn(MvpnTable),
}

impl RoutingTable {
    pub fn name(&self) -> &str {
        match self {
            RoutingTable::InetMvpn(table) => table.name(),
        }
    }

    /// Family table name this table was created for.
    pub fn family_name(&self) -> &'static str {
        match self {
            RoutingTable::InetMvpn(_) => FAMILY_TABLE_NAME,
        }
    }

    pub fn as_inetmvpn(&self) -> Option<&MvpnTable> {
        match self {
            RoutingTable::InetMvpn(table) => Some(table),
        }
    }

    pub fn as_inetmvpn_mut(&mut self) -> Option<&mut MvpnTable> {
        match self {
            RoutingTable::InetMvpn(table) => Some(table),
        }
    }

    pub fn into_inetmvpn(self) -> Option<MvpnTable> {
        match self {
            RoutingTable::InetMvpn(table) => Some(table),
        }
    }
}

/// Table constructor: server context and table name in, table out.
pub type TableCreateFn = fn(&ServerContext, &str) -> RoutingTable;

fn create_inetmvpn(ctx: &ServerContext, name: &str) -> RoutingTable {
    RoutingTable::InetMvpn(MvpnTable::new(name, ctx))
}

static REGISTRY: Lazy<RwLock<HashMap<String, TableCreateFn>>> = Lazy::new(|| {
    let mut factories: HashMap<String, TableCreateFn> = HashMap::new();
    factories.insert(FAMILY_TABLE_NAME.to_string(), create_inetmvpn);
    RwLock::new(factories)
});

/// Registers a constructor for a family table name.
///
/// Fails if the family is already registered.
pub fn register_factory(family: &str, create: TableCreateFn) -> Result<()> {
    let mut factories = REGISTRY.write();
    if factories.contains_key(family) {
        return Err(TableError::DuplicateFamily(family.to_string()));
    }
    factories.insert(family.to_string(), create);
    info!("Registered table factory for {}", family);
    Ok(())
}

/// Returns true if a constructor is registered for `family`.
pub fn is_registered(family: &str) -> bool {
    REGISTRY.read().contains_key(family)
}

/// Registered family table names, sorted.
pub fn registered_families() -> Vec<String> {
    let mut families: Vec<String> = REGISTRY.read().keys().cloned().collect();
    families.sort();
    families
}

/// Resolves the family of a table name: the name itself, or the part
/// after the instance prefix.
fn lookup(name: &str) -> Option<TableCreateFn> {
    let factories = REGISTRY.read();
    if let Some(create) = factories.get(name) {
        return Some(*create);
    }
    factories
        .iter()
        .find(|(family, _)| {
            name.strip_suffix(family.as_str())
                .is_some_and(|prefix| prefix.len() > 1 && prefix.ends_with('.'))
        })
        .map(|(_, create)| *create)
}

/// Creates a table named `name` with the constructor of its family.
pub fn create_table(ctx: &ServerContext, name: &str) -> Result<RoutingTable> {
    let create = lookup(name).ok_or_else(|| TableError::UnknownFamily(name.to_string()))?;
    debug!("Creating table {}", name);
    Ok(create(ctx, name))
}
