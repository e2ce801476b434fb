//! Turns element groups into classes and relations

use super::{ClassRef, CustomClassType, Legend, LegendGroup, Relation, RelationKind, UmlClass, UmlModel};
use crate::config::DiagramConfig;
use crate::element::{Element, ElementArena, ElementRef};
use crate::path;
use crate::table::ElementTable;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

/// Title of a class for a main element shown under `name`
fn class_title(
    main: &Element,
    parent: Option<&Element>,
    name: &str,
    parent_name: Option<&str>,
) -> (String, String, String) {
    if main.is_slice_header {
        let parent_name = parent_name
            .map(str::to_string)
            .or_else(|| parent.map(|p| p.name.clone()))
            .unwrap_or_else(|| name.to_string());
        let type_name = format!("Slices for {name}");
        (format!("{type_name} ({parent_name})"), type_name, parent_name)
    } else if main.is_choice_of_type_header {
        (name.to_string(), main.display_type().to_string(), name.to_string())
    } else {
        let type_name = main.display_type().to_string();
        (format!("{type_name} ({name})"), type_name, name.to_string())
    }
}

/// Name qualified with the last `depth` segments of the element id
fn qualified_name(element: &Element, depth: usize) -> String {
    if depth <= 1 {
        return element.name.clone();
    }
    let segments = path::segments(&element.id);
    let start = segments.len().saturating_sub(depth);
    segments[start..].join(".")
}

/// Picks a title not yet in `taken`, qualifying the name on collision
fn unique_title(
    main: &Element,
    parent: Option<&Element>,
    taken: &HashSet<String>,
) -> (String, String, String) {
    let depth_limit = path::segments(&main.id).len().max(1);
    for depth in 1..=depth_limit {
        let name = qualified_name(main, depth);
        let parent_name = (depth > 1)
            .then(|| parent.map(|p| qualified_name(p, depth)))
            .flatten();
        let candidate = class_title(main, parent, &name, parent_name.as_deref());
        if !taken.contains(&candidate.0) {
            return candidate;
        }
    }

    let (title, type_name, name) = class_title(main, parent, &main.name, None);
    let mut counter = 2;
    loop {
        let candidate = format!("{title} #{counter}");
        if !taken.contains(&candidate) {
            return (candidate, type_name, name);
        }
        counter += 1;
    }
}

fn custom_class_type(main: &Element) -> Option<CustomClassType> {
    if main.is_slice_header {
        Some(CustomClassType::Slices)
    } else if main.is_choice_of_type_header {
        Some(CustomClassType::ChoiceOfTypes)
    } else {
        None
    }
}

fn build_classes(table: &ElementTable, arena: &ElementArena, config: &DiagramConfig) -> Vec<UmlClass> {
    let mut classes: Vec<UmlClass> = Vec::new();
    let mut removed_groups: HashSet<&str> = HashSet::new();
    let mut titles: HashSet<String> = HashSet::new();

    for (key, members) in &table.groups {
        let Some(main) = table.element(key) else {
            tracing::warn!("Skipping group {} without an element of its own", key);
            continue;
        };
        let parent_key = path::parent_id(key);
        let parent = (parent_key != key)
            .then(|| table.element(parent_key))
            .flatten();

        let derived_from_removed = arena[main].is_removed()
            || parent.is_some_and(|p| arena[p].is_removed())
            || removed_groups.contains(parent_key);
        if derived_from_removed {
            removed_groups.insert(key.as_str());
            if config.hide_removed_objects {
                tracing::debug!("Hiding group {} derived from a removed element", key);
                continue;
            }
        }

        let main_element = &arena[main];
        let parent_element = parent.map(|p| &arena[p]);
        let (title, type_name, name) = unique_title(main_element, parent_element, &titles);
        titles.insert(title.clone());

        classes.push(UmlClass {
            title,
            type_name,
            name,
            main_element: Some(main),
            parent_element: parent,
            elements: members.clone(),
            is_main_class: classes.is_empty(),
            custom_class_type: custom_class_type(main_element),
            derived_from_removed,
        });
    }

    classes
}

fn build_relations(classes: &[UmlClass], arena: &ElementArena) -> Vec<Relation> {
    let by_main: HashMap<ElementRef, usize> = classes
        .iter()
        .enumerate()
        .filter_map(|(i, class)| class.main_element.map(|main| (main, i)))
        .collect();

    let mut relations = Vec::new();
    for (i, class) in classes.iter().enumerate() {
        let (Some(main), Some(parent)) = (class.main_element, class.parent_element) else {
            continue;
        };
        let Some(&owner) = by_main.get(&parent) else {
            continue;
        };
        if owner == i {
            continue;
        }

        let kind = if arena[parent].is_main {
            RelationKind::Composition
        } else {
            RelationKind::Aggregation
        };
        let main = &arena[main];
        relations.push(Relation {
            from: ClassRef(owner),
            to: ClassRef(i),
            kind,
            label: main.name.clone(),
            cardinality: main.cardinality,
        });
    }
    relations
}

fn constraint_legend(classes: &[UmlClass], arena: &ElementArena) -> Option<LegendGroup> {
    let mut constraints: IndexMap<&str, [&str; 2]> = IndexMap::new();
    for element in classes.iter().flat_map(|c| c.elements.iter()) {
        for constraint in &arena[*element].constraints {
            constraints.entry(constraint.key.as_str()).or_insert([
                constraint.severity.as_deref().unwrap_or(""),
                constraint.human.as_str(),
            ]);
        }
    }
    if constraints.is_empty() {
        return None;
    }

    let mut group = LegendGroup::new("Constraints", &["Key", "Severity", "Description"]);
    for (key, [severity, human]) in constraints {
        group.push_row(vec![key.to_string(), severity.to_string(), human.to_string()]);
    }
    Some(group)
}

/// Builds the class diagram for a reconciled (and optionally folded) table.
///
/// The model takes ownership of `arena`.
pub fn synthesize(table: &ElementTable, arena: ElementArena, config: &DiagramConfig) -> UmlModel {
    let classes = build_classes(table, &arena, config);
    let relations = build_relations(&classes, &arena);

    let mut legend = Legend::default();
    if config.show_constraints
        && let Some(group) = constraint_legend(&classes, &arena)
    {
        legend.groups.push(group);
    }

    tracing::debug!(
        "Synthesized {} classes and {} relations",
        classes.len(),
        relations.len()
    );

    UmlModel {
        arena,
        classes,
        relations,
        legend,
        view: config.view,
    }
}
