//! Folding of slice-only groups into their parent group
//!
//! A differential that slices `Patient.extension` produces a group holding
//! nothing but slices. Folding renames such groups to their parent key so the
//! slices show up directly in the parent class, labelled with the segment that
//! was folded away (`Slices for extension`).

use crate::element::{ElementArena, ElementRef};
use crate::path;
use crate::table::ElementTable;
use indexmap::IndexMap;
use std::collections::HashSet;

/// Group keys whose members are all named slices, mapped to their parent key
pub fn rename_map(table: &ElementTable, arena: &ElementArena) -> IndexMap<String, String> {
    table
        .groups
        .iter()
        .filter(|(_, members)| {
            !members.is_empty() && members.iter().all(|m| arena[*m].has_slice_name)
        })
        .filter_map(|(key, _)| {
            let parent = path::parent_id(key);
            (parent != key).then(|| (key.clone(), parent.to_string()))
        })
        .collect()
}

/// One rename step: exact match, else the longest `old:` prefix
fn rename_once(key: &str, renames: &IndexMap<String, String>) -> Option<String> {
    if let Some(new) = renames.get(key) {
        return Some(new.clone());
    }
    renames
        .iter()
        .filter(|(old, _)| {
            key.strip_prefix(old.as_str())
                .is_some_and(|rest| rest.starts_with(':'))
        })
        .max_by_key(|(old, _)| old.len())
        .map(|(old, new)| format!("{new}{}", &key[old.len()..]))
}

/// Applies renames until the key stops changing.
///
/// Every step strictly shortens the key, so this terminates.
pub fn renamed_key(key: &str, renames: &IndexMap<String, String>) -> String {
    let mut current = key.to_string();
    while let Some(next) = rename_once(&current, renames) {
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// Re-keys every group, merging member lists of groups that collide
pub fn apply_renames(
    groups: &IndexMap<String, Vec<ElementRef>>,
    renames: &IndexMap<String, String>,
) -> IndexMap<String, Vec<ElementRef>> {
    let mut folded: IndexMap<String, Vec<ElementRef>> = IndexMap::new();
    for (key, members) in groups {
        let entry = folded.entry(renamed_key(key, renames)).or_default();
        for member in members {
            if !entry.contains(member) {
                entry.push(*member);
            }
        }
    }
    folded
}

/// Folds slice-only groups of `table`, rewriting element ids in `arena`.
///
/// Folding repeats until no slice-only group is left, so nested slices
/// (`Patient.extension:race.extension:omb`) collapse as far as they go. Every
/// round strictly shortens at least one group key, so this terminates.
///
/// When a renamed id is already taken, the existing element keeps the id and
/// the renamed one keeps its old id.
pub fn fold_slices(table: &ElementTable, arena: &mut ElementArena) -> ElementTable {
    let mut current = table.clone();
    loop {
        let renames = rename_map(&current, arena);
        if renames.is_empty() {
            return current;
        }
        tracing::debug!("Folding {} slice-only groups", renames.len());
        current = fold_once(&current, arena, &renames);
    }
}

fn fold_once(
    table: &ElementTable,
    arena: &mut ElementArena,
    renames: &IndexMap<String, String>,
) -> ElementTable {
    let groups = apply_renames(&table.groups, renames);

    let kept: HashSet<&str> = table
        .elements
        .keys()
        .filter(|id| renamed_key(id, renames) == **id)
        .map(String::as_str)
        .collect();

    let mut elements: IndexMap<String, ElementRef> = IndexMap::new();
    for (id, &element) in &table.elements {
        let new_id = renamed_key(id, renames);
        if new_id == *id {
            elements.entry(id.clone()).or_insert(element);
            continue;
        }
        if kept.contains(new_id.as_str()) || elements.contains_key(&new_id) {
            tracing::debug!("Keeping id {} because {} is taken", id, new_id);
            elements.entry(id.clone()).or_insert(element);
            continue;
        }

        // the first fold names the sliced element; later rounds keep that label
        let target = &mut arena[element];
        if target.has_slice_name
            && target.group.is_none()
            && let Some(removed) = path::removed_segment(id, &new_id)
            && !target.name.eq_ignore_ascii_case(removed)
        {
            target.group = Some(format!("Slices for {removed}"));
        }
        target.id = new_id.clone();
        elements.insert(new_id, element);
    }

    ElementTable {
        elements,
        groups,
        root: table.root,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ElementDefinition;
    use crate::table::TableBuilder;
    use crate::test_helpers::TestElementBuilder;

    fn race_differential() -> Vec<ElementDefinition> {
        vec![
            TestElementBuilder::new("Patient").build(),
            TestElementBuilder::new("Patient.extension:race")
                .with_cardinality(0, "1")
                .with_type("Extension")
                .with_slice_name("race")
                .build(),
            TestElementBuilder::new("Patient.extension:race.url")
                .with_cardinality(1, "1")
                .with_type("uri")
                .build(),
            TestElementBuilder::new("Patient.extension:birthsex")
                .with_cardinality(0, "1")
                .with_type("Extension")
                .with_slice_name("birthsex")
                .build(),
        ]
    }

    fn folded(definitions: &[ElementDefinition]) -> (ElementArena, ElementTable) {
        let mut arena = ElementArena::new();
        let table = TableBuilder::new(&mut arena).build(definitions);
        let folded = fold_slices(&table, &mut arena);
        (arena, folded)
    }

    #[test]
    fn test_rename_map_only_contains_slice_only_groups() {
        let mut arena = ElementArena::new();
        let table = TableBuilder::new(&mut arena).build(&race_differential());
        let renames = rename_map(&table, &arena);
        assert_eq!(renames.len(), 1);
        assert_eq!(renames.get("Patient.extension").map(String::as_str), Some("Patient"));
    }

    #[test]
    fn test_slices_move_into_parent_group() {
        let (arena, table) = folded(&race_differential());

        let root_group: Vec<&str> = table
            .group("Patient")
            .unwrap()
            .iter()
            .map(|e| arena[*e].id.as_str())
            .collect();
        assert_eq!(root_group, vec!["Patient", "Patient:race", "Patient:birthsex"]);
        assert!(table.group("Patient:race").is_some());
        assert!(table.group("Patient.extension").is_none());

        let race = &arena[table.element("Patient:race").unwrap()];
        assert_eq!(race.group.as_deref(), Some("Slices for extension"));
        assert_eq!(race.path, "Patient.extension");

        let url = &arena[table.element("Patient:race.url").unwrap()];
        assert_eq!(url.group, None);
    }

    #[test]
    fn test_folding_is_idempotent() {
        let mut arena = ElementArena::new();
        let table = TableBuilder::new(&mut arena).build(&race_differential());
        let once = fold_slices(&table, &mut arena);
        let twice = fold_slices(&once, &mut arena);

        assert_eq!(once.elements, twice.elements);
        assert_eq!(once.groups, twice.groups);
    }

    fn nested_race_differential() -> Vec<ElementDefinition> {
        vec![
            TestElementBuilder::new("Patient").build(),
            TestElementBuilder::new("Patient.extension:race")
                .with_cardinality(0, "1")
                .with_type("Extension")
                .with_slice_name("race")
                .build(),
            TestElementBuilder::new("Patient.extension:race.extension:omb")
                .with_cardinality(0, "5")
                .with_type("Extension")
                .with_slice_name("omb")
                .build(),
            TestElementBuilder::new("Patient.extension:race.extension:omb.extension:detail")
                .with_cardinality(0, "*")
                .with_type("Extension")
                .with_slice_name("detail")
                .build(),
        ]
    }

    #[test]
    fn test_nested_slice_groups_fold_to_fixed_point() {
        let (arena, table) = folded(&nested_race_differential());

        assert!(rename_map(&table, &arena).is_empty());
        let keys: Vec<&str> = table.groups.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Patient"]);
        assert_eq!(table.group("Patient").unwrap().len(), 4);

        let detail = table
            .group("Patient")
            .unwrap()
            .iter()
            .map(|e| &arena[*e])
            .find(|e| e.name == "detail")
            .unwrap();
        assert_eq!(detail.group.as_deref(), Some("Slices for extension"));
    }

    #[test]
    fn test_nested_folding_is_idempotent() {
        let mut arena = ElementArena::new();
        let table = TableBuilder::new(&mut arena).build(&nested_race_differential());
        let once = fold_slices(&table, &mut arena);
        let twice = fold_slices(&once, &mut arena);

        assert_eq!(once.elements, twice.elements);
        assert_eq!(once.groups, twice.groups);
    }

    #[test]
    fn test_taken_ids_are_not_overwritten() {
        let mut definitions = race_differential();
        definitions.insert(
            1,
            TestElementBuilder::new("Patient.extension")
                .with_cardinality(0, "*")
                .with_type("Extension")
                .with_slicing("url")
                .build(),
        );
        let (arena, table) = folded(&definitions);

        let root = &arena[table.element("Patient").unwrap()];
        assert!(root.is_main);
        let header = &arena[table.element("Patient.extension").unwrap()];
        assert_eq!(header.id, "Patient.extension");
        assert!(header.is_slice_header);
        assert_eq!(table.group("Patient").unwrap().len(), 4);
    }

    #[test]
    fn test_nested_renames_use_longest_prefix() {
        let mut renames = IndexMap::new();
        renames.insert("A.b".to_string(), "A".to_string());
        renames.insert("A.b:x.c".to_string(), "A.b:x".to_string());

        assert_eq!(renamed_key("A.b:x.c:y", &renames), "A:x:y");
        assert_eq!(renamed_key("A.b.c", &renames), "A.b.c");
        assert_eq!(renamed_key("A.b", &renames), "A");
    }
}
