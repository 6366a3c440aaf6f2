//! # Batch Reconciliation Planner
//!
//! Turns a client-submitted sparse matrix — one or many roles, each carrying
//! a mode tag and a list of interface/flag entries — into an ordered list of
//! edge operations against the capability store.
//!
//! The planner is pure: it works against a snapshot of known role ids, known
//! interface ids, and existing edges, and produces a [`ReconcilePlan`] that
//! the route layer applies atomically (one SQL transaction when a database is
//! configured, one store write lock otherwise).
//!
//! Tolerance policy existing clients depend on: a submission
//! referencing an unknown role id has all of its entries skipped; an entry
//! referencing an unknown interface id is skipped individually. Neither fails
//! the batch, and the skip counts are never reported to the client — they are
//! only surfaced in server logs.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::merge::{self, EdgeAction, MergeMode};
use super::{CapabilityFlags, EdgeKey, InterfaceId, RoleId};

/// Reference to a role by id. Name is accepted but ignored; the id is
/// authoritative for batch reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleRef {
    pub role_id: RoleId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// One interface/flag tuple inside a role submission.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct EntrySubmission {
    pub interface_id: InterfaceId,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub create: bool,
    #[serde(default)]
    pub update: bool,
    #[serde(default)]
    pub delete: bool,
}

impl EntrySubmission {
    pub fn flags(&self) -> CapabilityFlags {
        CapabilityFlags::new(self.read, self.create, self.update, self.delete)
    }
}

/// One role's slice of a reconciliation batch. The mode tag applies to every
/// entry under this role; different roles in the same batch may use different
/// modes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleSubmission {
    pub role: RoleRef,
    #[serde(default)]
    pub mode: MergeMode,
    #[serde(default)]
    pub entries: Vec<EntrySubmission>,
}

/// A store mutation for one edge key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOp {
    Insert(CapabilityFlags),
    Update(CapabilityFlags),
    Delete,
}

/// Ordered edge operations plus skip accounting.
#[derive(Debug, Default)]
pub struct ReconcilePlan {
    /// Operations in submission order. Well-formed submissions carry distinct
    /// keys, so order does not affect the final state; when a client repeats
    /// a key, later entries see the effect of earlier ones.
    pub ops: Vec<(EdgeKey, EdgeOp)>,
    /// Role submissions dropped because the role id resolved to nothing.
    pub skipped_roles: usize,
    /// Entries dropped because the interface id resolved to nothing.
    pub skipped_entries: usize,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Compute the edge operations for a batch against a snapshot of the store.
///
/// `known_roles` and `known_interfaces` contain every id the directories know
/// of, active or not — existence is checked permissively here; the projector
/// filters inactive records at read time instead.
pub fn plan(
    submissions: &[RoleSubmission],
    known_roles: &BTreeSet<RoleId>,
    known_interfaces: &BTreeSet<InterfaceId>,
    existing: &BTreeMap<EdgeKey, CapabilityFlags>,
) -> ReconcilePlan {
    let mut working = existing.clone();
    let mut plan = ReconcilePlan::default();

    for submission in submissions {
        let role_id = submission.role.role_id;
        if !known_roles.contains(&role_id) {
            plan.skipped_roles += 1;
            continue;
        }

        for entry in &submission.entries {
            if !known_interfaces.contains(&entry.interface_id) {
                plan.skipped_entries += 1;
                continue;
            }

            let key = (role_id, entry.interface_id);
            let current = working.get(&key).copied();
            match merge::plan_entry(submission.mode, current, entry.flags()) {
                EdgeAction::Create(flags) => {
                    working.insert(key, flags);
                    plan.ops.push((key, EdgeOp::Insert(flags)));
                }
                EdgeAction::Overwrite(flags) => {
                    working.insert(key, flags);
                    plan.ops.push((key, EdgeOp::Update(flags)));
                }
                EdgeAction::Delete => {
                    working.remove(&key);
                    plan.ops.push((key, EdgeOp::Delete));
                }
                EdgeAction::Skip => {}
            }
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(role_id: RoleId, mode: MergeMode, entries: Vec<EntrySubmission>) -> RoleSubmission {
        RoleSubmission {
            role: RoleRef {
                role_id,
                name: None,
            },
            mode,
            entries,
        }
    }

    fn entry(interface_id: InterfaceId, read: bool, create: bool, update: bool, delete: bool) -> EntrySubmission {
        EntrySubmission {
            interface_id,
            read,
            create,
            update,
            delete,
        }
    }

    fn ids(values: &[i32]) -> BTreeSet<i32> {
        values.iter().copied().collect()
    }

    #[test]
    fn replace_creates_missing_edge() {
        let plan = plan(
            &[submission(1, MergeMode::Replace, vec![entry(7, true, false, false, false)])],
            &ids(&[1]),
            &ids(&[7]),
            &BTreeMap::new(),
        );
        assert_eq!(
            plan.ops,
            vec![((1, 7), EdgeOp::Insert(CapabilityFlags::new(true, false, false, false)))]
        );
        assert_eq!(plan.skipped_roles, 0);
        assert_eq!(plan.skipped_entries, 0);
    }

    #[test]
    fn replace_prunes_edge_on_all_false() {
        let mut existing = BTreeMap::new();
        existing.insert((1, 7), CapabilityFlags::new(true, false, false, false));
        let plan = plan(
            &[submission(1, MergeMode::Replace, vec![entry(7, false, false, false, false)])],
            &ids(&[1]),
            &ids(&[7]),
            &existing,
        );
        assert_eq!(plan.ops, vec![((1, 7), EdgeOp::Delete)]);
    }

    #[test]
    fn unknown_role_skips_its_entire_submission() {
        let plan = plan(
            &[
                submission(99, MergeMode::Replace, vec![entry(7, true, true, true, true)]),
                submission(1, MergeMode::Replace, vec![entry(7, true, false, false, false)]),
            ],
            &ids(&[1]),
            &ids(&[7]),
            &BTreeMap::new(),
        );
        assert_eq!(plan.skipped_roles, 1);
        assert_eq!(plan.ops.len(), 1);
        assert_eq!(plan.ops[0].0, (1, 7));
    }

    #[test]
    fn unknown_interface_skips_single_entry_only() {
        let plan = plan(
            &[submission(
                1,
                MergeMode::Replace,
                vec![entry(42, true, true, true, true), entry(7, true, false, false, false)],
            )],
            &ids(&[1]),
            &ids(&[7]),
            &BTreeMap::new(),
        );
        assert_eq!(plan.skipped_entries, 1);
        assert_eq!(plan.ops.len(), 1);
        assert_eq!(plan.ops[0].0, (1, 7));
    }

    #[test]
    fn add_mode_ignores_existing_edges() {
        let mut existing = BTreeMap::new();
        existing.insert((1, 7), CapabilityFlags::new(true, false, false, false));
        let plan = plan(
            &[submission(
                1,
                MergeMode::Add,
                vec![entry(7, true, true, true, true), entry(8, false, true, false, false)],
            )],
            &ids(&[1]),
            &ids(&[7, 8]),
            &existing,
        );
        // The existing (1,7) edge is untouched; only (1,8) is created.
        assert_eq!(
            plan.ops,
            vec![((1, 8), EdgeOp::Insert(CapabilityFlags::new(false, true, false, false)))]
        );
    }

    #[test]
    fn update_mode_never_creates() {
        let plan = plan(
            &[submission(1, MergeMode::Update, vec![entry(7, true, true, true, true)])],
            &ids(&[1]),
            &ids(&[7]),
            &BTreeMap::new(),
        );
        assert!(plan.is_empty());
    }

    #[test]
    fn update_mode_can_clear_flags_without_deleting() {
        let mut existing = BTreeMap::new();
        existing.insert((1, 7), CapabilityFlags::new(true, true, true, true));
        let plan = plan(
            &[submission(1, MergeMode::Update, vec![entry(7, false, false, false, false)])],
            &ids(&[1]),
            &ids(&[7]),
            &existing,
        );
        assert_eq!(plan.ops, vec![((1, 7), EdgeOp::Update(CapabilityFlags::NONE))]);
    }

    #[test]
    fn modes_dispatch_per_role_submission_not_globally() {
        let mut existing = BTreeMap::new();
        existing.insert((1, 7), CapabilityFlags::new(true, false, false, false));
        existing.insert((2, 7), CapabilityFlags::new(true, false, false, false));
        let plan = plan(
            &[
                submission(1, MergeMode::Add, vec![entry(7, true, true, true, true)]),
                submission(2, MergeMode::Update, vec![entry(7, true, true, true, true)]),
            ],
            &ids(&[1, 2]),
            &ids(&[7]),
            &existing,
        );
        // Add skips the existing (1,7); Update overwrites (2,7).
        assert_eq!(
            plan.ops,
            vec![((2, 7), EdgeOp::Update(CapabilityFlags::new(true, true, true, true)))]
        );
    }

    #[test]
    fn repeated_key_sees_effect_of_earlier_entry() {
        // A malformed client repeating a key: the second entry observes the
        // edge the first one created, so Add skips it.
        let plan = plan(
            &[submission(
                1,
                MergeMode::Add,
                vec![entry(7, true, false, false, false), entry(7, false, true, false, false)],
            )],
            &ids(&[1]),
            &ids(&[7]),
            &BTreeMap::new(),
        );
        assert_eq!(
            plan.ops,
            vec![((1, 7), EdgeOp::Insert(CapabilityFlags::new(true, false, false, false)))]
        );
    }

    #[test]
    fn inactive_ids_are_accepted_when_known() {
        // Existence is permissive: the known-id sets include inactive records.
        let plan = plan(
            &[submission(3, MergeMode::Replace, vec![entry(9, false, false, true, false)])],
            &ids(&[3]),
            &ids(&[9]),
            &BTreeMap::new(),
        );
        assert_eq!(plan.ops.len(), 1);
    }

    #[test]
    fn planning_the_same_batch_twice_yields_empty_second_plan_for_add() {
        let batch = [submission(1, MergeMode::Add, vec![entry(7, true, false, false, false)])];
        let roles = ids(&[1]);
        let interfaces = ids(&[7]);

        let first = plan(&batch, &roles, &interfaces, &BTreeMap::new());
        let mut after: BTreeMap<EdgeKey, CapabilityFlags> = BTreeMap::new();
        for (key, op) in &first.ops {
            match op {
                EdgeOp::Insert(f) | EdgeOp::Update(f) => {
                    after.insert(*key, *f);
                }
                EdgeOp::Delete => {
                    after.remove(key);
                }
            }
        }

        let second = plan(&batch, &roles, &interfaces, &after);
        assert!(second.is_empty());
    }

    #[test]
    fn submission_deserializes_with_defaults() {
        let json = r#"{"role": {"role_id": 1}, "entries": [{"interface_id": 7, "read": true}]}"#;
        let s: RoleSubmission = serde_json::from_str(json).unwrap();
        assert_eq!(s.mode, MergeMode::Replace);
        assert_eq!(s.entries[0].flags(), CapabilityFlags::new(true, false, false, false));
    }
}
