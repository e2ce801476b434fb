//! In-memory element records
//!
//! An [`Element`] is built once per element definition (plus the synthetic
//! ones produced for composite fixed values and choice-of-type variants).
//! Elements live in an [`ElementArena`] and everything else refers to them
//! through copyable [`ElementRef`] handles, so two tables can share one
//! element and "same element" is a plain index comparison.

mod factory;

pub use factory::{ElementFactory, resolve_type};

use crate::models::{BindingStrength, Constraint};
use crate::path;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::{Index, IndexMut};

/// Upper bound of a cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardinalityMax {
    Bounded(u32),
    Unbounded,
}

impl CardinalityMax {
    /// Parses `*` or a non-negative integer
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "*" => Some(CardinalityMax::Unbounded),
            other => other.parse().ok().map(CardinalityMax::Bounded),
        }
    }
}

impl fmt::Display for CardinalityMax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardinalityMax::Bounded(n) => write!(f, "{n}"),
            CardinalityMax::Unbounded => f.write_str("*"),
        }
    }
}

/// `min..max` pair; either side may be unset on differential elements
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cardinality {
    pub min: Option<u32>,
    pub max: Option<CardinalityMax>,
}

impl Cardinality {
    pub fn new(min: u32, max: CardinalityMax) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Builds from the raw `min`/`max` properties; an unreadable max is unset
    pub fn from_definition(min: Option<u32>, max: Option<&str>) -> Self {
        Self {
            min,
            max: max.and_then(CardinalityMax::parse),
        }
    }

    /// Strict `<digits>..<digits|*>` parse
    pub fn parse(text: &str) -> Option<Self> {
        let (min, max) = text.trim().split_once("..")?;
        if min.is_empty() || !min.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if max != "*" && (max.is_empty() || !max.bytes().all(|b| b.is_ascii_digit())) {
            return None;
        }
        Some(Self {
            min: Some(min.parse().ok()?),
            max: Some(CardinalityMax::parse(max)?),
        })
    }

    /// `0..0` marks an element removed by the profile
    pub fn is_removed(&self) -> bool {
        self.min == Some(0) && self.max == Some(CardinalityMax::Bounded(0))
    }

    /// Both bounds are known
    pub fn is_complete(&self) -> bool {
        self.min.is_some() && self.max.is_some()
    }

    /// The max bound as written in element definitions
    pub fn max_string(&self) -> Option<String> {
        self.max.map(|max| max.to_string())
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(min) = self.min {
            write!(f, "{min}")?;
        }
        f.write_str("..")?;
        if let Some(max) = self.max {
            write!(f, "{max}")?;
        }
        Ok(())
    }
}

/// UML visibility, derived from the element's role rather than authored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Visibility {
    /// The profile root
    Private,
    /// Element with a fixed value
    Protected,
    /// Reference or canonical typed element
    PackagePrivate,
    #[default]
    Public,
}

impl Visibility {
    pub fn symbol(&self) -> char {
        match self {
            Visibility::Private => '-',
            Visibility::Protected => '#',
            Visibility::PackagePrivate => '~',
            Visibility::Public => '+',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '-' => Some(Visibility::Private),
            '#' => Some(Visibility::Protected),
            '~' => Some(Visibility::PackagePrivate),
            '+' => Some(Visibility::Public),
            _ => None,
        }
    }
}

/// Fields that a differential element may set explicitly
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ElementField {
    Type,
    Min,
    Max,
    FixedValue,
    Binding,
    Constraints,
}

/// Value set binding as shown on the diagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementBinding {
    pub value_set: String,
    pub strength: BindingStrength,
}

/// One attribute of the diagram
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub id: String,
    pub path: String,
    pub name: String,
    /// Resolved display type, e.g. `Reference(Patient|Organization)`
    pub type_name: Option<String>,
    /// Raw type codes, in declaration order
    pub type_codes: Vec<String>,
    pub visibility: Visibility,
    pub cardinality: Cardinality,
    pub is_main: bool,
    pub is_slice_header: bool,
    pub has_slice_name: bool,
    pub is_choice_of_type_header: bool,
    pub is_choice_of_type_element: bool,
    pub fixed_value: Option<String>,
    pub binding: Option<ElementBinding>,
    pub constraints: Vec<Constraint>,
    /// Label override set when slices are folded into their grandparent
    pub group: Option<String>,
    pub differential_changed_fields: BTreeSet<ElementField>,
}

impl Element {
    pub fn new(id: impl Into<String>, path: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: path::local_name(&id).to_string(),
            path: path.into(),
            id,
            ..Default::default()
        }
    }

    pub fn parent_id(&self) -> &str {
        path::parent_id(&self.id)
    }

    pub fn has_fixed_value(&self) -> bool {
        self.fixed_value.is_some()
    }

    pub fn is_removed(&self) -> bool {
        self.cardinality.is_removed()
    }

    /// Type as printed on the diagram
    pub fn display_type(&self) -> &str {
        self.type_name.as_deref().unwrap_or("N/A")
    }

    pub fn is_reference_typed(&self) -> bool {
        self.type_name
            .as_deref()
            .is_some_and(|t| t.contains("Reference") || t.contains("canonical"))
    }

    /// Section label the element is listed under inside its class
    pub fn effective_group(&self) -> Option<&str> {
        match &self.group {
            Some(group) => Some(group),
            None if self.has_slice_name => Some("Slices"),
            None => None,
        }
    }

    /// Visibility implied by the element's role
    pub fn derive_visibility(&self) -> Visibility {
        if self.is_main {
            Visibility::Private
        } else if self.has_fixed_value() {
            Visibility::Protected
        } else if self.is_reference_typed() {
            Visibility::PackagePrivate
        } else {
            Visibility::Public
        }
    }

    pub fn refresh_visibility(&mut self) {
        self.visibility = self.derive_visibility();
    }

    /// Fills every field not explicitly set on `self` from `base`.
    ///
    /// Explicitly set fields are recorded in `differential_changed_fields`;
    /// in a consistent profile these are the fields whose snapshot value the
    /// differential repeats.
    /// Structural flags are merged so a differential element keeps the
    /// role its snapshot counterpart plays.
    pub fn inherit_unset_fields(&mut self, base: &Element) {
        let changed = &mut self.differential_changed_fields;

        if self.type_name.is_some() {
            changed.insert(ElementField::Type);
        } else {
            self.type_name = base.type_name.clone();
            self.type_codes = base.type_codes.clone();
        }
        if self.cardinality.min.is_some() {
            changed.insert(ElementField::Min);
        } else {
            self.cardinality.min = base.cardinality.min;
        }
        if self.cardinality.max.is_some() {
            changed.insert(ElementField::Max);
        } else {
            self.cardinality.max = base.cardinality.max;
        }
        if self.fixed_value.is_some() {
            changed.insert(ElementField::FixedValue);
        } else {
            self.fixed_value = base.fixed_value.clone();
        }
        if self.binding.is_some() {
            changed.insert(ElementField::Binding);
        } else {
            self.binding = base.binding.clone();
        }
        if !self.constraints.is_empty() {
            changed.insert(ElementField::Constraints);
        } else {
            self.constraints = base.constraints.clone();
        }

        if self.path.is_empty() {
            self.path = base.path.clone();
        }
        self.is_main |= base.is_main;
        self.is_slice_header |= base.is_slice_header;
        self.has_slice_name |= base.has_slice_name;
        self.is_choice_of_type_header |= base.is_choice_of_type_header;
        self.is_choice_of_type_element |= base.is_choice_of_type_element;
        self.refresh_visibility();
    }
}

/// Stable handle to an element inside an [`ElementArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementRef(usize);

impl ElementRef {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Owner of every element of one conversion
#[derive(Debug, Clone, Default)]
pub struct ElementArena {
    elements: Vec<Element>,
}

impl ElementArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, element: Element) -> ElementRef {
        self.elements.push(element);
        ElementRef(self.elements.len() - 1)
    }

    pub fn get(&self, element: ElementRef) -> Option<&Element> {
        self.elements.get(element.0)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ElementRef, &Element)> {
        self.elements
            .iter()
            .enumerate()
            .map(|(i, element)| (ElementRef(i), element))
    }
}

impl Index<ElementRef> for ElementArena {
    type Output = Element;

    fn index(&self, element: ElementRef) -> &Element {
        &self.elements[element.0]
    }
}

impl IndexMut<ElementRef> for ElementArena {
    fn index_mut(&mut self, element: ElementRef) -> &mut Element {
        &mut self.elements[element.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cardinality_parse_is_strict() {
        assert_eq!(
            Cardinality::parse("0..*"),
            Some(Cardinality::new(0, CardinalityMax::Unbounded))
        );
        assert_eq!(
            Cardinality::parse("1..1"),
            Some(Cardinality::new(1, CardinalityMax::Bounded(1)))
        );
        assert_eq!(Cardinality::parse("1.."), None);
        assert_eq!(Cardinality::parse("..1"), None);
        assert_eq!(Cardinality::parse("a..1"), None);
        assert_eq!(Cardinality::parse("1..-1"), None);
        assert_eq!(Cardinality::parse("1"), None);
    }

    #[test]
    fn test_cardinality_display() {
        assert_eq!(Cardinality::new(0, CardinalityMax::Unbounded).to_string(), "0..*");
        assert_eq!(
            Cardinality::from_definition(Some(1), None).to_string(),
            "1.."
        );
        assert!(Cardinality::new(0, CardinalityMax::Bounded(0)).is_removed());
        assert!(!Cardinality::new(0, CardinalityMax::Bounded(1)).is_removed());
    }

    #[test]
    fn test_visibility_derivation_precedence() {
        let mut element = Element::new("Observation.subject", "Observation.subject");
        element.type_name = Some("Reference(Patient)".into());
        assert_eq!(element.derive_visibility(), Visibility::PackagePrivate);

        element.fixed_value = Some("Patient/1".into());
        assert_eq!(element.derive_visibility(), Visibility::Protected);

        element.is_main = true;
        assert_eq!(element.derive_visibility(), Visibility::Private);
    }

    #[test]
    fn test_visibility_symbols() {
        for symbol in ['-', '#', '~', '+'] {
            let visibility = Visibility::from_symbol(symbol).unwrap();
            assert_eq!(visibility.symbol(), symbol);
        }
        assert_eq!(Visibility::from_symbol('*'), None);
    }

    #[test]
    fn test_inherit_unset_fields_records_explicit_fields() {
        let mut base = Element::new("Patient.name", "Patient.name");
        base.type_name = Some("HumanName".into());
        base.type_codes = vec!["HumanName".into()];
        base.cardinality = Cardinality::new(0, CardinalityMax::Unbounded);

        let mut diff = Element::new("Patient.name", "");
        diff.cardinality.min = Some(1);
        diff.inherit_unset_fields(&base);

        assert_eq!(diff.type_name.as_deref(), Some("HumanName"));
        assert_eq!(diff.cardinality, Cardinality::new(1, CardinalityMax::Unbounded));
        assert_eq!(diff.path, "Patient.name");
        assert_eq!(
            diff.differential_changed_fields.iter().copied().collect::<Vec<_>>(),
            vec![ElementField::Min]
        );
    }

    #[test]
    fn test_restated_snapshot_values_count_as_changed() {
        let mut base = Element::new("Patient.gender", "Patient.gender");
        base.type_name = Some("code".into());
        base.cardinality = Cardinality::new(1, CardinalityMax::Bounded(1));

        // a differential that repeats the snapshot bound still emphasizes it
        let mut diff = Element::new("Patient.gender", "");
        diff.cardinality.min = Some(1);
        diff.inherit_unset_fields(&base);

        assert!(diff.differential_changed_fields.contains(&ElementField::Min));
        assert!(!diff.differential_changed_fields.contains(&ElementField::Max));
        assert!(!diff.differential_changed_fields.contains(&ElementField::Type));
        assert_eq!(diff.cardinality, base.cardinality);
    }

    #[test]
    fn test_effective_group() {
        let mut element = Element::new("Patient.identifier:mrn", "Patient.identifier");
        assert_eq!(element.effective_group(), None);
        element.has_slice_name = true;
        assert_eq!(element.effective_group(), Some("Slices"));
        element.group = Some("Slices for identifier".into());
        assert_eq!(element.effective_group(), Some("Slices for identifier"));
    }

    #[test]
    fn test_arena_handles() {
        let mut arena = ElementArena::new();
        let a = arena.alloc(Element::new("A", "A"));
        let b = arena.alloc(Element::new("A.b", "A.b"));
        assert_ne!(a, b);
        assert_eq!(arena[b].name, "b");
        arena[b].name = "renamed".into();
        assert_eq!(arena.get(b).map(|e| e.name.as_str()), Some("renamed"));
        assert_eq!(arena.len(), 2);
    }
}
