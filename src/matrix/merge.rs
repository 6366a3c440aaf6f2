//! # Merge-Mode Algebra
//!
//! Each role submission selects one of three merge semantics. The three modes
//! are modeled as pure functions `(existing, incoming) -> EdgeAction` so the
//! algebra can be tested without any persistence in play. The batch planner
//! in [`super::reconcile`] dispatches on the mode tag exactly once per entry.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::CapabilityFlags;

/// Merge semantics for one role submission.
///
/// `Replace` is the default, matching the behavior clients get when they omit
/// the mode tag entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// Strictly additive: create missing edges, never touch existing ones.
    Add,
    /// Modify-only: overwrite existing edges, never create new ones.
    Update,
    /// Upsert-or-prune: create or overwrite when any flag is set, delete the
    /// edge when all flags are false.
    #[default]
    Replace,
}

/// Outcome of merging one submitted entry against the current edge state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeAction {
    /// No edge exists; create one with these flags.
    Create(CapabilityFlags),
    /// An edge exists; overwrite its flags with these.
    Overwrite(CapabilityFlags),
    /// An edge exists; remove it.
    Delete,
    /// Leave the store untouched for this key.
    Skip,
}

/// Dispatch one entry through the mode selected for its role submission.
pub fn plan_entry(
    mode: MergeMode,
    existing: Option<CapabilityFlags>,
    incoming: CapabilityFlags,
) -> EdgeAction {
    match mode {
        MergeMode::Add => add(existing, incoming),
        MergeMode::Update => update(existing, incoming),
        MergeMode::Replace => replace(existing, incoming),
    }
}

/// Add mode: create only when no edge exists and at least one flag is set.
/// An existing edge is never overwritten or deleted.
pub fn add(existing: Option<CapabilityFlags>, incoming: CapabilityFlags) -> EdgeAction {
    match existing {
        None if incoming.any() => EdgeAction::Create(incoming),
        _ => EdgeAction::Skip,
    }
}

/// Update mode: overwrite only when an edge already exists. The overwrite may
/// clear every flag; the edge row persists regardless. No edge is ever created.
pub fn update(existing: Option<CapabilityFlags>, incoming: CapabilityFlags) -> EdgeAction {
    match existing {
        Some(_) => EdgeAction::Overwrite(incoming),
        None => EdgeAction::Skip,
    }
}

/// Replace mode: upsert when any flag is set; prune the edge when all flags
/// are false and one exists. Keeps the store free of all-false rows.
pub fn replace(existing: Option<CapabilityFlags>, incoming: CapabilityFlags) -> EdgeAction {
    if incoming.any() {
        match existing {
            Some(_) => EdgeAction::Overwrite(incoming),
            None => EdgeAction::Create(incoming),
        }
    } else {
        match existing {
            Some(_) => EdgeAction::Delete,
            None => EdgeAction::Skip,
        }
    }
}

/// Apply an action to an edge state, yielding the state after the action.
///
/// Used by the planner to thread state through consecutive entries, and by
/// the tests below to state the idempotence law.
pub fn apply(existing: Option<CapabilityFlags>, action: EdgeAction) -> Option<CapabilityFlags> {
    match action {
        EdgeAction::Create(flags) | EdgeAction::Overwrite(flags) => Some(flags),
        EdgeAction::Delete => None,
        EdgeAction::Skip => existing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(read: bool, create: bool, update: bool, delete: bool) -> CapabilityFlags {
        CapabilityFlags::new(read, create, update, delete)
    }

    const READ_ONLY: CapabilityFlags = CapabilityFlags {
        read: true,
        create: false,
        update: false,
        delete: false,
    };

    const ALL: CapabilityFlags = CapabilityFlags {
        read: true,
        create: true,
        update: true,
        delete: true,
    };

    #[test]
    fn merge_mode_defaults_to_replace() {
        assert_eq!(MergeMode::default(), MergeMode::Replace);
        // Missing mode tag in a submission deserializes via Default.
        let mode: MergeMode = serde_json::from_str("\"replace\"").unwrap();
        assert_eq!(mode, MergeMode::Replace);
    }

    // ── Add mode ────────────────────────────────────────────────────────

    #[test]
    fn add_creates_when_absent_and_any_flag_set() {
        assert_eq!(add(None, READ_ONLY), EdgeAction::Create(READ_ONLY));
    }

    #[test]
    fn add_skips_when_absent_and_all_flags_false() {
        assert_eq!(add(None, CapabilityFlags::NONE), EdgeAction::Skip);
    }

    #[test]
    fn add_never_overwrites_existing_edge() {
        assert_eq!(add(Some(READ_ONLY), ALL), EdgeAction::Skip);
        assert_eq!(add(Some(ALL), CapabilityFlags::NONE), EdgeAction::Skip);
    }

    // ── Update mode ─────────────────────────────────────────────────────

    #[test]
    fn update_overwrites_existing_edge() {
        assert_eq!(update(Some(READ_ONLY), ALL), EdgeAction::Overwrite(ALL));
    }

    #[test]
    fn update_can_clear_all_flags_without_deleting_the_row() {
        let action = update(Some(ALL), CapabilityFlags::NONE);
        assert_eq!(action, EdgeAction::Overwrite(CapabilityFlags::NONE));
        assert_eq!(apply(Some(ALL), action), Some(CapabilityFlags::NONE));
    }

    #[test]
    fn update_never_creates() {
        assert_eq!(update(None, ALL), EdgeAction::Skip);
        assert_eq!(update(None, CapabilityFlags::NONE), EdgeAction::Skip);
    }

    // ── Replace mode ────────────────────────────────────────────────────

    #[test]
    fn replace_creates_when_absent_and_any_flag_set() {
        assert_eq!(replace(None, READ_ONLY), EdgeAction::Create(READ_ONLY));
    }

    #[test]
    fn replace_overwrites_when_present_and_any_flag_set() {
        assert_eq!(replace(Some(READ_ONLY), ALL), EdgeAction::Overwrite(ALL));
    }

    #[test]
    fn replace_prunes_existing_edge_when_all_flags_false() {
        assert_eq!(replace(Some(ALL), CapabilityFlags::NONE), EdgeAction::Delete);
    }

    #[test]
    fn replace_noops_when_absent_and_all_flags_false() {
        assert_eq!(replace(None, CapabilityFlags::NONE), EdgeAction::Skip);
    }

    // ── Idempotence law ─────────────────────────────────────────────────
    //
    // Clients retry on timeout; applying the same entry twice under any
    // single mode must land on the same final state as applying it once.

    proptest::proptest! {
        #[test]
        fn all_modes_are_idempotent(
            mode_idx in 0usize..3,
            has_existing in proptest::bool::ANY,
            er in proptest::bool::ANY, ec in proptest::bool::ANY,
            eu in proptest::bool::ANY, ed in proptest::bool::ANY,
            ir in proptest::bool::ANY, ic in proptest::bool::ANY,
            iu in proptest::bool::ANY, id in proptest::bool::ANY,
        ) {
            let mode = [MergeMode::Add, MergeMode::Update, MergeMode::Replace][mode_idx];
            let existing = has_existing.then(|| flags(er, ec, eu, ed));
            let incoming = flags(ir, ic, iu, id);

            let once = apply(existing, plan_entry(mode, existing, incoming));
            let twice = apply(once, plan_entry(mode, once, incoming));
            proptest::prop_assert_eq!(once, twice);
        }
    }
}
