//! Reconciliation of a differential table against its snapshot
//!
//! A differential only lists the elements a profile touches, with only the
//! properties it changes. Reconciliation fills the gaps from the snapshot and
//! borrows every missing ancestor so the differential tree stays connected.

use crate::element::ElementArena;
use crate::path;
use crate::table::ElementTable;

/// Reconciles `differential` in place against `snapshot`.
///
/// Both tables must live in `arena`. Borrowed ancestors are the snapshot's
/// own elements, not copies.
pub fn reconcile(snapshot: &ElementTable, differential: &mut ElementTable, arena: &mut ElementArena) {
    copy_unset_fields(snapshot, differential, arena);
    borrow_choice_variants(snapshot, differential, arena);
    materialize_ancestors(snapshot, differential, arena);
    follow_snapshot_order(snapshot, differential, arena);
}

fn copy_unset_fields(snapshot: &ElementTable, differential: &ElementTable, arena: &mut ElementArena) {
    let mut copied = 0usize;
    for (id, &diff_ref) in &differential.elements {
        let Some(snapshot_ref) = snapshot.element(id) else {
            continue;
        };
        if snapshot_ref == diff_ref {
            continue;
        }
        let base = arena[snapshot_ref].clone();
        arena[diff_ref].inherit_unset_fields(&base);
        copied += 1;
    }
    tracing::debug!("Copied snapshot values into {} differential elements", copied);
}

/// Choice headers flagged only through copy-in have no variants of their own
fn borrow_choice_variants(snapshot: &ElementTable, differential: &mut ElementTable, arena: &ElementArena) {
    let headers: Vec<String> = differential
        .elements
        .iter()
        .filter(|(id, element)| {
            arena[**element].is_choice_of_type_header && !differential.groups.contains_key(*id)
        })
        .map(|(id, _)| id.clone())
        .collect();

    for header in headers {
        let Some(variants) = snapshot.group(&header) else {
            continue;
        };
        for &variant in variants {
            differential
                .elements
                .entry(arena[variant].id.clone())
                .or_insert(variant);
        }
        differential.groups.insert(header, variants.to_vec());
    }
}

fn materialize_ancestors(snapshot: &ElementTable, differential: &mut ElementTable, arena: &ElementArena) {
    let ids: Vec<String> = differential.elements.keys().cloned().collect();
    let mut borrowed = 0usize;

    for id in &ids {
        let mut current = id.as_str();
        while let Some(parent) = path::try_parent_id(current) {
            if !differential.elements.contains_key(parent)
                && let Some(ancestor) = snapshot.element(parent)
            {
                differential.elements.insert(parent.to_string(), ancestor);
                borrowed += 1;
            }
            if let Some(member) = differential.element(current) {
                let group = differential.groups.entry(parent.to_string()).or_default();
                if !group.contains(&member) {
                    group.push(member);
                }
            }
            current = parent;
        }
    }

    if differential.root.is_none()
        && let Some(root) = snapshot.root
    {
        let key = path::parent_id(&arena[root].id).to_string();
        differential.elements.entry(key.clone()).or_insert(root);
        let group = differential.groups.entry(key).or_default();
        if !group.contains(&root) {
            group.insert(0, root);
        }
        differential.root = Some(root);
    }

    tracing::debug!("Borrowed {} ancestors from the snapshot", borrowed);
}

/// Re-sorts groups and their members into snapshot pre-order
fn follow_snapshot_order(snapshot: &ElementTable, differential: &mut ElementTable, arena: &ElementArena) {
    let group_rank = |key: &str| snapshot.groups.get_index_of(key).unwrap_or(usize::MAX);
    differential
        .groups
        .sort_by(|a, _, b, _| group_rank(a).cmp(&group_rank(b)));

    for members in differential.groups.values_mut() {
        members.sort_by_key(|member| {
            snapshot
                .elements
                .get_index_of(&arena[*member].id)
                .unwrap_or(usize::MAX)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Cardinality, CardinalityMax, ElementField};
    use crate::models::ElementDefinition;
    use crate::table::TableBuilder;
    use crate::test_helpers::{TestElementBuilder, patient_snapshot};

    fn reconciled(differential: &[ElementDefinition]) -> (ElementArena, ElementTable, ElementTable) {
        let mut arena = ElementArena::new();
        let snapshot = TableBuilder::new(&mut arena).build(&patient_snapshot());
        let mut diff = TableBuilder::new(&mut arena).build(differential);
        reconcile(&snapshot, &mut diff, &mut arena);
        (arena, snapshot, diff)
    }

    #[test]
    fn test_unset_fields_are_copied_and_set_fields_recorded() {
        let (arena, _, diff) = reconciled(&[
            TestElementBuilder::new("Patient").build(),
            TestElementBuilder::new("Patient.generalPractitioner")
                .with_cardinality(1, "*")
                .build(),
        ]);

        let gp = &arena[diff.element("Patient.generalPractitioner").unwrap()];
        assert_eq!(
            gp.type_name.as_deref(),
            Some("Reference(Practitioner|Organization)")
        );
        assert_eq!(gp.cardinality, Cardinality::new(1, CardinalityMax::Unbounded));
        assert!(gp.differential_changed_fields.contains(&ElementField::Min));
        assert!(gp.differential_changed_fields.contains(&ElementField::Max));
        assert!(!gp.differential_changed_fields.contains(&ElementField::Type));
    }

    #[test]
    fn test_missing_ancestors_are_borrowed_from_snapshot() {
        let (arena, snapshot, diff) = reconciled(&[
            TestElementBuilder::new("Patient").build(),
            TestElementBuilder::new("Patient.identifier:mrn.value")
                .with_cardinality(1, "1")
                .build(),
        ]);

        for ancestor in ["Patient.identifier", "Patient.identifier:mrn"] {
            assert_eq!(diff.element(ancestor), snapshot.element(ancestor));
        }
        let root_group: Vec<&str> = diff
            .group("Patient")
            .unwrap()
            .iter()
            .map(|e| arena[*e].id.as_str())
            .collect();
        assert_eq!(root_group, vec!["Patient", "Patient.identifier"]);

        let keys: Vec<&str> = diff.groups.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["Patient", "Patient.identifier", "Patient.identifier:mrn"]
        );
    }

    #[test]
    fn test_missing_root_is_borrowed() {
        let (arena, snapshot, diff) = reconciled(&[TestElementBuilder::new("Patient.photo")
            .with_cardinality(0, "0")
            .build()]);

        assert_eq!(diff.root, snapshot.root);
        let root_group = diff.group("Patient").unwrap();
        assert_eq!(root_group[0], snapshot.root.unwrap());
        assert_eq!(arena[root_group[1]].id, "Patient.photo");
    }

    #[test]
    fn test_choice_variants_follow_copied_header() {
        let (arena, _, diff) = reconciled(&[
            TestElementBuilder::new("Patient").build(),
            TestElementBuilder::new("Patient.deceased[x]")
                .with_cardinality(0, "0")
                .build(),
        ]);

        let header = &arena[diff.element("Patient.deceased[x]").unwrap()];
        assert!(header.is_choice_of_type_header);
        assert_eq!(diff.group("Patient.deceased[x]").unwrap().len(), 2);
    }

    #[test]
    fn test_tree_connectivity_matches_snapshot() {
        let (arena, _, diff) = reconciled(&[
            TestElementBuilder::new("Patient").build(),
            TestElementBuilder::new("Patient.identifier:mrn.system").build(),
            TestElementBuilder::new("Patient.photo").build(),
        ]);

        for (key, members) in &diff.groups {
            for member in members {
                let id = &arena[*member].id;
                if path::try_parent_id(id).is_some() {
                    assert_eq!(path::parent_id(id), key.as_str());
                    assert!(diff.element(key).is_some(), "group {key} has no element");
                }
            }
        }
    }
}
