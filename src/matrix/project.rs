//! # Dense Matrix Projection
//!
//! Computes the display-ready cross product of active roles × active
//! interfaces. Missing edges are filled with an explicit all-false default —
//! the boundary cannot distinguish "no edge" from "edge with every flag
//! false", even though the store keeps them structurally distinct.
//!
//! Ordering is a correctness requirement, not cosmetics: rows are sorted by
//! role name ascending, and the grants inside each row by interface name
//! ascending. Test fixtures and UI grids rely on it being reproducible.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::{Interface, Role};

use super::{CapabilityFlags, EdgeKey, InterfaceId, RoleId};

/// Lite role identity carried on each matrix row.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleLite {
    pub role_id: RoleId,
    pub name: String,
}

/// One cell of the dense matrix: an interface with the four resolved flags.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InterfaceGrant {
    pub interface_id: InterfaceId,
    pub name: String,
    pub read: bool,
    pub create: bool,
    pub update: bool,
    pub delete: bool,
}

/// One row of the dense matrix: a role with its ordered interface grants.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleRow {
    pub role: RoleLite,
    pub interfaces: Vec<InterfaceGrant>,
}

/// Project the dense matrix from directory snapshots and the edge map.
///
/// Inactive roles and interfaces are filtered out here at read time; edges
/// referencing them may still exist in the store and are simply not shown.
/// Filters are exact-match on the trimmed name. A role filter that matches
/// nothing yields an empty result (the route layer turns that into 404); an
/// interface filter that matches nothing yields rows with empty grant lists,
/// which is NOT an error — a deliberate asymmetry existing clients rely on,
/// pinned by tests.
pub fn project(
    roles: &[Role],
    interfaces: &[Interface],
    edges: &BTreeMap<EdgeKey, CapabilityFlags>,
    role_filter: Option<&str>,
    interface_filter: Option<&str>,
) -> Vec<RoleRow> {
    let role_filter = role_filter.map(str::trim);
    let interface_filter = interface_filter.map(str::trim);

    let mut visible_roles: Vec<&Role> = roles
        .iter()
        .filter(|r| r.active)
        .filter(|r| role_filter.map_or(true, |f| r.name == f))
        .collect();
    visible_roles.sort_by(|a, b| a.name.cmp(&b.name).then(a.role_id.cmp(&b.role_id)));

    let mut visible_interfaces: Vec<&Interface> = interfaces
        .iter()
        .filter(|i| i.active)
        .filter(|i| interface_filter.map_or(true, |f| i.name == f))
        .collect();
    visible_interfaces.sort_by(|a, b| a.name.cmp(&b.name).then(a.interface_id.cmp(&b.interface_id)));

    visible_roles
        .into_iter()
        .map(|role| RoleRow {
            role: RoleLite {
                role_id: role.role_id,
                name: role.name.clone(),
            },
            interfaces: visible_interfaces
                .iter()
                .map(|interface| {
                    let flags = edges
                        .get(&(role.role_id, interface.interface_id))
                        .copied()
                        .unwrap_or(CapabilityFlags::NONE);
                    InterfaceGrant {
                        interface_id: interface.interface_id,
                        name: interface.name.clone(),
                        read: flags.read,
                        create: flags.create,
                        update: flags.update,
                        delete: flags.delete,
                    }
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(id: RoleId, name: &str, active: bool) -> Role {
        Role {
            role_id: id,
            name: name.to_string(),
            description: String::new(),
            active,
        }
    }

    fn interface(id: InterfaceId, name: &str, active: bool) -> Interface {
        Interface {
            interface_id: id,
            name: name.to_string(),
            description: String::new(),
            active,
        }
    }

    fn fixture() -> (Vec<Role>, Vec<Interface>, BTreeMap<EdgeKey, CapabilityFlags>) {
        let roles = vec![
            role(1, "Admin", true),
            role(2, "Tecnico", true),
            role(3, "Retired", false),
        ];
        let interfaces = vec![
            interface(7, "Usuarios", true),
            interface(8, "Terrenos", true),
            interface(9, "Legacy", false),
        ];
        let mut edges = BTreeMap::new();
        edges.insert((1, 7), CapabilityFlags::new(true, true, true, true));
        edges.insert((2, 8), CapabilityFlags::new(true, false, false, false));
        // Edge pointing at an inactive interface: filtered at read time, not deleted.
        edges.insert((1, 9), CapabilityFlags::new(true, true, true, true));
        (roles, interfaces, edges)
    }

    #[test]
    fn density_every_active_pair_appears_exactly_once() {
        let (roles, interfaces, edges) = fixture();
        let rows = project(&roles, &interfaces, &edges, None, None);

        assert_eq!(rows.len(), 2, "inactive role must not appear");
        for row in &rows {
            assert_eq!(row.interfaces.len(), 2, "inactive interface must not appear");
        }
    }

    #[test]
    fn missing_edge_projects_as_all_false() {
        let (roles, interfaces, edges) = fixture();
        let rows = project(&roles, &interfaces, &edges, None, None);

        let tecnico = rows.iter().find(|r| r.role.name == "Tecnico").unwrap();
        let usuarios = tecnico.interfaces.iter().find(|i| i.name == "Usuarios").unwrap();
        assert!(!usuarios.read && !usuarios.create && !usuarios.update && !usuarios.delete);
    }

    #[test]
    fn stored_edge_flags_come_through() {
        let (roles, interfaces, edges) = fixture();
        let rows = project(&roles, &interfaces, &edges, None, None);

        let admin = rows.iter().find(|r| r.role.name == "Admin").unwrap();
        let usuarios = admin.interfaces.iter().find(|i| i.name == "Usuarios").unwrap();
        assert!(usuarios.read && usuarios.create && usuarios.update && usuarios.delete);
    }

    #[test]
    fn rows_ordered_by_role_name_then_interface_name() {
        let (roles, interfaces, edges) = fixture();
        let rows = project(&roles, &interfaces, &edges, None, None);

        let row_names: Vec<&str> = rows.iter().map(|r| r.role.name.as_str()).collect();
        assert_eq!(row_names, vec!["Admin", "Tecnico"]);

        let grant_names: Vec<&str> = rows[0].interfaces.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(grant_names, vec!["Terrenos", "Usuarios"]);
    }

    #[test]
    fn role_filter_limits_to_one_role() {
        let (roles, interfaces, edges) = fixture();
        let rows = project(&roles, &interfaces, &edges, Some("Admin"), None);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].role.role_id, 1);
    }

    #[test]
    fn role_filter_trims_surrounding_whitespace() {
        let (roles, interfaces, edges) = fixture();
        let rows = project(&roles, &interfaces, &edges, Some("  Admin  "), None);
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn role_filter_on_inactive_role_matches_nothing() {
        let (roles, interfaces, edges) = fixture();
        let rows = project(&roles, &interfaces, &edges, Some("Retired"), None);
        assert!(rows.is_empty());
    }

    #[test]
    fn interface_filter_matching_nothing_yields_empty_grant_lists() {
        let (roles, interfaces, edges) = fixture();
        let rows = project(&roles, &interfaces, &edges, None, Some("NoSuchModule"));
        assert_eq!(rows.len(), 2, "roles still listed");
        assert!(rows.iter().all(|r| r.interfaces.is_empty()));
    }

    #[test]
    fn edge_to_inactive_interface_is_hidden_not_deleted() {
        let (roles, interfaces, edges) = fixture();
        let rows = project(&roles, &interfaces, &edges, Some("Admin"), None);
        assert!(rows[0].interfaces.iter().all(|i| i.name != "Legacy"));
        // The edge itself is still in the map.
        assert!(edges.contains_key(&(1, 9)));
    }
}
