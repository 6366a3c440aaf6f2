//! # Role–Capability Matrix Core
//!
//! The data model and pure logic behind the permission matrix:
//!
//! - [`CapabilityFlags`] — the four independent grant flags carried by an edge.
//! - [`merge`] — the Add/Update/Replace merge algebra, one pure function per mode.
//! - [`reconcile`] — submission types and the batch planner that turns a
//!   client-submitted sparse matrix into an ordered list of edge operations.
//! - [`project`] — the dense cross-product view (every active role × every
//!   active interface) with all-false defaults for missing edges.
//!
//! Everything in this module is pure and synchronous. Persistence and HTTP
//! concerns live in `db::capabilities` and `routes::matrix` respectively;
//! they consume the plans produced here but never re-implement the algebra.

pub mod merge;
pub mod project;
pub mod reconcile;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Identity of a role in the role directory.
pub type RoleId = i32;

/// Identity of an interface (gated functional module) in the interface directory.
pub type InterfaceId = i32;

/// Key of a capability edge. At most one edge exists per key.
pub type EdgeKey = (RoleId, InterfaceId);

/// The four independent grant flags stored on a capability edge.
///
/// An all-false value is semantically equivalent to "no grant" at the API
/// boundary: the dense projector synthesizes [`CapabilityFlags::NONE`] for
/// missing edges, and Replace-mode reconciliation prunes stored all-false
/// edges rather than keeping them around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub struct CapabilityFlags {
    pub read: bool,
    pub create: bool,
    pub update: bool,
    pub delete: bool,
}

impl CapabilityFlags {
    /// The explicit "no grant" default. Missing edges project as this value.
    pub const NONE: Self = Self {
        read: false,
        create: false,
        update: false,
        delete: false,
    };

    pub fn new(read: bool, create: bool, update: bool, delete: bool) -> Self {
        Self {
            read,
            create,
            update,
            delete,
        }
    }

    /// True when at least one of the four flags is set.
    pub fn any(&self) -> bool {
        self.read || self.create || self.update || self.delete
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_has_no_flags_set() {
        assert!(!CapabilityFlags::NONE.any());
        assert_eq!(CapabilityFlags::NONE, CapabilityFlags::default());
    }

    #[test]
    fn any_detects_each_flag() {
        assert!(CapabilityFlags::new(true, false, false, false).any());
        assert!(CapabilityFlags::new(false, true, false, false).any());
        assert!(CapabilityFlags::new(false, false, true, false).any());
        assert!(CapabilityFlags::new(false, false, false, true).any());
        assert!(!CapabilityFlags::new(false, false, false, false).any());
    }
}
