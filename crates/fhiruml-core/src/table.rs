//! Element index and parent grouping
//!
//! The table builder walks element definitions in document order and files
//! every element under the id of its parent. Each group later becomes one
//! class of the diagram, so group insertion order is class order.

use crate::element::{ElementArena, ElementFactory, ElementRef};
use crate::fixed_value::{FixedValueExpander, FixedValueIndex};
use crate::models::ElementDefinition;
use crate::path;
use indexmap::IndexMap;

/// Elements of one element list, indexed by id and grouped by parent id
#[derive(Debug, Clone, Default)]
pub struct ElementTable {
    /// Element id -> element
    pub elements: IndexMap<String, ElementRef>,
    /// Parent id -> elements filed under it, in encounter order
    pub groups: IndexMap<String, Vec<ElementRef>>,
    /// The profile root, when the list starts with one
    pub root: Option<ElementRef>,
}

impl ElementTable {
    pub fn element(&self, id: &str) -> Option<ElementRef> {
        self.elements.get(id).copied()
    }

    pub fn group(&self, key: &str) -> Option<&[ElementRef]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    /// Appends `element` to the group `key`, creating the group if needed
    pub fn file(&mut self, key: impl Into<String>, element: ElementRef) {
        self.groups.entry(key.into()).or_default().push(element);
    }
}

/// Builds [`ElementTable`]s into a shared arena
pub struct TableBuilder<'a> {
    arena: &'a mut ElementArena,
}

impl<'a> TableBuilder<'a> {
    pub fn new(arena: &'a mut ElementArena) -> Self {
        Self { arena }
    }

    pub fn build(&mut self, definitions: &[ElementDefinition]) -> ElementTable {
        let mut definitions = definitions.to_vec();
        let mut fixed_values = FixedValueIndex::default();
        FixedValueExpander::new(&mut definitions, &mut fixed_values).expand();

        let factory = ElementFactory::new(&fixed_values);
        let mut table = ElementTable::default();
        let mut root_seen = false;

        for definition in &definitions {
            let mut element = factory.create(definition);

            // a list that starts below the root (a sparse differential) has no
            // root of its own; reconciliation borrows the snapshot's
            let is_root = !root_seen && path::try_parent_id(&element.id).is_none();
            root_seen = true;
            if is_root {
                element.is_main = true;
                element.type_name = Some(element.name.clone());
                element.type_codes = vec![element.name.clone()];
                element.refresh_visibility();
            }

            let variants = if element.is_choice_of_type_header {
                factory.choice_variants(&element)
            } else {
                Vec::new()
            };

            let id = element.id.clone();
            let group_key = element.parent_id().to_string();
            let element_ref = self.arena.alloc(element);
            if is_root {
                table.root = Some(element_ref);
            }
            table.elements.insert(id.clone(), element_ref);
            table.file(group_key, element_ref);

            for variant in variants {
                let variant_id = variant.id.clone();
                let variant_ref = self.arena.alloc(variant);
                table.elements.insert(variant_id, variant_ref);
                table.file(id.clone(), variant_ref);
            }
        }

        tracing::debug!(
            "Built element table: {} elements in {} groups",
            table.elements.len(),
            table.groups.len()
        );
        table
    }
}
