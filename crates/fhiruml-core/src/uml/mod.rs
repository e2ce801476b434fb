//! Class diagram model
//!
//! One [`UmlClass`] per element group, [`Relation`]s between a class and the
//! class owning its parent element, and a [`Legend`]. The model owns the
//! element arena its classes point into.

mod synthesizer;

pub use synthesizer::synthesize;

use crate::config::DiagramView;
use crate::element::{Cardinality, Element, ElementArena, ElementRef};
use std::fmt;

/// Index of a class inside [`UmlModel::classes`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassRef(pub usize);

/// Special roles a class can play
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomClassType {
    /// Lists the slices of a sliced element
    Slices,
    /// Lists the type variants of a `[x]` element
    ChoiceOfTypes,
}

impl CustomClassType {
    pub fn stereotype(&self) -> &'static str {
        match self {
            CustomClassType::Slices => "<< (S,#FF7700) Slices >>",
            CustomClassType::ChoiceOfTypes => "<< (C,#1892ba) Choice of Types >>",
        }
    }

    pub fn from_stereotype(stereotype: &str) -> Option<Self> {
        if stereotype.contains("Choice of Types") {
            Some(CustomClassType::ChoiceOfTypes)
        } else if stereotype.contains("Slices") {
            Some(CustomClassType::Slices)
        } else {
            None
        }
    }
}

/// One class block of the diagram
#[derive(Debug, Clone, Default)]
pub struct UmlClass {
    /// Display title, unique within a model
    pub title: String,
    pub type_name: String,
    pub name: String,
    /// The element this class details
    pub main_element: Option<ElementRef>,
    /// The element the main element is nested under
    pub parent_element: Option<ElementRef>,
    pub elements: Vec<ElementRef>,
    pub is_main_class: bool,
    pub custom_class_type: Option<CustomClassType>,
    /// The main element, its parent or an ancestor class is removed
    pub derived_from_removed: bool,
}

impl UmlClass {
    /// `struct` for backbone elements, `class` otherwise
    pub fn keyword(&self) -> &'static str {
        if self.type_name.contains("BackboneElement") {
            "struct"
        } else {
            "class"
        }
    }
}

/// Relation kinds and their arrows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    Association,
    Directed,
    Aggregation,
    Composition,
    Dependency,
    Inheritance,
}

impl RelationKind {
    pub fn arrow(&self) -> &'static str {
        match self {
            RelationKind::Association => "--",
            RelationKind::Directed => "-->",
            RelationKind::Aggregation => "o--",
            RelationKind::Composition => "*--",
            RelationKind::Dependency => "..>",
            RelationKind::Inheritance => "<|--",
        }
    }

    pub fn from_arrow(arrow: &str) -> Option<Self> {
        match arrow {
            "--" => Some(RelationKind::Association),
            "-->" => Some(RelationKind::Directed),
            "o--" => Some(RelationKind::Aggregation),
            "*--" => Some(RelationKind::Composition),
            "..>" => Some(RelationKind::Dependency),
            "<|--" => Some(RelationKind::Inheritance),
            _ => None,
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.arrow())
    }
}

/// Edge from the class holding an element to the class detailing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub from: ClassRef,
    pub to: ClassRef,
    pub kind: RelationKind,
    /// Name of the element the relation stands for
    pub label: String,
    pub cardinality: Cardinality,
}

/// Titled table inside the legend
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegendGroup {
    pub title: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl LegendGroup {
    pub fn new(title: impl Into<String>, header: &[&str]) -> Self {
        Self {
            title: title.into(),
            header: header.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Legend {
    pub groups: Vec<LegendGroup>,
}

impl Legend {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn group(&self, title: &str) -> Option<&LegendGroup> {
        self.groups.iter().find(|g| g.title == title)
    }
}

/// A complete class diagram
#[derive(Debug, Clone, Default)]
pub struct UmlModel {
    pub arena: ElementArena,
    pub classes: Vec<UmlClass>,
    pub relations: Vec<Relation>,
    pub legend: Legend,
    pub view: DiagramView,
}

impl UmlModel {
    pub fn class(&self, class: ClassRef) -> &UmlClass {
        &self.classes[class.0]
    }

    pub fn element(&self, element: ElementRef) -> &Element {
        &self.arena[element]
    }

    /// The class of the profile root
    pub fn main_class(&self) -> Option<&UmlClass> {
        self.classes.iter().find(|c| c.is_main_class)
    }

    pub fn find_class(&self, title: &str) -> Option<ClassRef> {
        self.classes
            .iter()
            .position(|c| c.title == title)
            .map(ClassRef)
    }

    /// Elements of a class, resolved
    pub fn class_elements<'a>(&'a self, class: &'a UmlClass) -> impl Iterator<Item = &'a Element> + 'a {
        class.elements.iter().map(move |e| &self.arena[*e])
    }
}
