//! State and behavior shared by every node of a form tree.
//!
//! Definitions, pages and elements all carry an identifier, a type name, a
//! label, a renderer and rendering options. Pages and elements additionally
//! have a position among their siblings and a weak link to the node that owns
//! them.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Weak;

use serde_json::Value;

use crate::definition::{DefinitionInner, FormDefinition};
use crate::element::{ElementInner, FormElement};
use crate::error::{validate_identifier, FormError, Result};
use crate::merge::{merge_into, Options};
use crate::page::{Page, PageInner};

pub(crate) const LABEL: &str = "label";
pub(crate) const RENDERER: &str = "renderer";
pub(crate) const RENDERING_OPTIONS: &str = "renderingOptions";

/// Common renderable state, stored inline in every node.
#[doc(hidden)]
#[derive(Debug, Clone)]
pub struct RenderableCore {
    pub(crate) identifier: String,
    pub(crate) type_name: String,
    pub(crate) label: String,
    pub(crate) renderer: Option<String>,
    pub(crate) rendering_options: Options,
    pub(crate) index: Option<usize>,
}

impl RenderableCore {
    pub(crate) fn new(identifier: String, type_name: String) -> Result<Self> {
        validate_identifier(&identifier)?;
        Ok(Self {
            identifier,
            type_name,
            label: String::new(),
            renderer: None,
            rendering_options: Options::new(),
            index: None,
        })
    }
}

/// Read and write access to the state every form node shares.
pub trait Renderable {
    #[doc(hidden)]
    fn core(&self) -> Ref<'_, RenderableCore>;

    #[doc(hidden)]
    fn core_mut(&self) -> RefMut<'_, RenderableCore>;

    fn identifier(&self) -> String {
        self.core().identifier.clone()
    }

    /// Name of the type this node was configured from.
    fn type_name(&self) -> String {
        self.core().type_name.clone()
    }

    fn label(&self) -> String {
        self.core().label.clone()
    }

    fn set_label(&self, label: impl Into<String>)
    where
        Self: Sized,
    {
        self.core_mut().label = label.into();
    }

    fn renderer(&self) -> Option<String> {
        self.core().renderer.clone()
    }

    fn set_renderer(&self, renderer: impl Into<String>)
    where
        Self: Sized,
    {
        self.core_mut().renderer = Some(renderer.into());
    }

    fn rendering_options(&self) -> Options {
        self.core().rendering_options.clone()
    }

    fn set_rendering_option(&self, key: impl Into<String>, value: Value)
    where
        Self: Sized,
    {
        self.core_mut().rendering_options.insert(key.into(), value);
    }
}

/// Owner of a page or element, as seen by the child.
#[derive(Debug, Clone)]
pub(crate) enum ParentLink {
    Definition(Weak<RefCell<DefinitionInner>>),
    Page(Weak<RefCell<PageInner>>),
    Element(Weak<RefCell<ElementInner>>),
}

impl ParentLink {
    pub(crate) fn upgrade(&self) -> Option<Parent> {
        match self {
            ParentLink::Definition(weak) => weak.upgrade().map(|inner| {
                Parent::Definition(FormDefinition::from_inner(inner))
            }),
            ParentLink::Page(weak) => weak.upgrade().map(|inner| Parent::Page(Page { inner })),
            ParentLink::Element(weak) => weak
                .upgrade()
                .map(|inner| Parent::Element(FormElement { inner })),
        }
    }
}

/// Owner of a page or element.
#[derive(Debug, Clone, PartialEq)]
pub enum Parent {
    Definition(FormDefinition),
    Page(Page),
    Element(FormElement),
}

impl Parent {
    /// The definition at the root of the tree this parent belongs to.
    pub fn root_form(&self) -> Option<FormDefinition> {
        match self {
            Parent::Definition(definition) => Some(definition.clone()),
            Parent::Page(page) => page.parent_form(),
            Parent::Element(element) => element.root_form(),
        }
    }
}

/// A node stored in an ordered sibling sequence.
pub(crate) trait Sibling {
    fn same_node(&self, other: &Self) -> bool;
    fn set_index(&self, index: Option<usize>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placement {
    Before,
    After,
}

/// Reassign every index from the sequence order.
pub(crate) fn renumber<T: Sibling>(siblings: &[T]) {
    for (index, sibling) in siblings.iter().enumerate() {
        sibling.set_index(Some(index));
    }
}

/// Move `to_move` next to `reference` within `siblings`.
///
/// Both nodes must already be members of the sequence. Moving a member
/// relative to itself leaves the sequence untouched.
pub(crate) fn reposition<T: Sibling + Clone>(
    siblings: &mut Vec<T>,
    to_move: &T,
    reference: &T,
    placement: Placement,
) -> Result<()> {
    let from = siblings
        .iter()
        .position(|s| s.same_node(to_move))
        .ok_or_else(|| FormError::consistency("node to move is not part of this sequence"))?;
    if to_move.same_node(reference) {
        return Ok(());
    }
    let moved = siblings.remove(from);
    let Some(target) = siblings.iter().position(|s| s.same_node(reference)) else {
        siblings.insert(from, moved);
        return Err(FormError::consistency(
            "reference node is not part of this sequence",
        ));
    };
    let at = match placement {
        Placement::Before => target,
        Placement::After => target + 1,
    };
    siblings.insert(at, moved);
    renumber(siblings);
    Ok(())
}

/// Fail when `options` carries a key outside `allowed`.
pub(crate) fn ensure_known_keys(type_name: &str, options: &Options, allowed: &[&str]) -> Result<()> {
    if let Some(key) = options.keys().find(|key| !allowed.contains(&key.as_str())) {
        return Err(FormError::TypeDefinitionInvalid {
            type_name: type_name.to_string(),
            message: format!(
                "unknown property '{key}' (allowed: {})",
                allowed.join(", ")
            ),
        });
    }
    Ok(())
}

/// Label, renderer and rendering options taken from a configuration map.
#[derive(Debug, Default)]
pub(crate) struct RenderableOptions {
    label: Option<String>,
    renderer: Option<String>,
    rendering_options: Option<Options>,
}

impl RenderableOptions {
    /// Extract the shared keys, checking their shape without mutating anything.
    pub(crate) fn parse(type_name: &str, options: &Options) -> Result<Self> {
        let invalid = |message: String| FormError::TypeDefinitionInvalid {
            type_name: type_name.to_string(),
            message,
        };

        let label = match options.get(LABEL) {
            None | Some(Value::Null) => None,
            Some(Value::String(label)) => Some(label.clone()),
            Some(other) => return Err(invalid(format!("'{LABEL}' must be a string, got {other}"))),
        };
        let renderer = match options.get(RENDERER) {
            None | Some(Value::Null) => None,
            Some(Value::String(renderer)) => Some(renderer.clone()),
            Some(other) => {
                return Err(invalid(format!("'{RENDERER}' must be a string, got {other}")))
            }
        };
        let rendering_options = match options.get(RENDERING_OPTIONS) {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map.clone()),
            Some(other) => {
                return Err(invalid(format!(
                    "'{RENDERING_OPTIONS}' must be a map, got {other}"
                )))
            }
        };

        Ok(Self {
            label,
            renderer,
            rendering_options,
        })
    }

    pub(crate) fn apply(self, core: &mut RenderableCore) {
        if let Some(label) = self.label {
            core.label = label;
        }
        if let Some(renderer) = self.renderer {
            core.renderer = Some(renderer);
        }
        if let Some(rendering_options) = self.rendering_options {
            merge_into(&mut core.rendering_options, &rendering_options);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;
    use std::cell::Cell;

    #[derive(Debug, Clone)]
    struct Slot {
        name: &'static str,
        index: std::rc::Rc<Cell<Option<usize>>>,
    }

    impl Slot {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                index: Default::default(),
            }
        }
    }

    impl Sibling for Slot {
        fn same_node(&self, other: &Self) -> bool {
            self.name == other.name
        }

        fn set_index(&self, index: Option<usize>) {
            self.index.set(index);
        }
    }

    fn names(slots: &[Slot]) -> Vec<&'static str> {
        slots.iter().map(|s| s.name).collect()
    }

    fn sequence(names: &[&'static str]) -> Vec<Slot> {
        let slots: Vec<Slot> = names.iter().copied().map(Slot::new).collect();
        renumber(&slots);
        slots
    }

    #[test]
    fn move_before_adjacent() {
        let mut slots = sequence(&["a", "b", "c"]);
        let (a, b) = (slots[0].clone(), slots[1].clone());
        reposition(&mut slots, &b, &a, Placement::Before).unwrap();
        assert_eq!(names(&slots), vec!["b", "a", "c"]);
        assert_eq!(a.index.get(), Some(1));
        assert_eq!(b.index.get(), Some(0));
    }

    #[test]
    fn move_after_distant_sibling() {
        let mut slots = sequence(&["a", "b", "c", "d", "e"]);
        let (a, d) = (slots[0].clone(), slots[3].clone());
        reposition(&mut slots, &a, &d, Placement::After).unwrap();
        assert_eq!(names(&slots), vec!["b", "c", "d", "a", "e"]);
        for (i, slot) in slots.iter().enumerate() {
            assert_eq!(slot.index.get(), Some(i));
        }
    }

    #[test]
    fn move_before_from_the_back() {
        let mut slots = sequence(&["a", "b", "c", "d"]);
        let (b, d) = (slots[1].clone(), slots[3].clone());
        reposition(&mut slots, &d, &b, Placement::Before).unwrap();
        assert_eq!(names(&slots), vec!["a", "d", "b", "c"]);
    }

    #[test]
    fn move_relative_to_itself_is_noop() {
        let mut slots = sequence(&["a", "b"]);
        let a = slots[0].clone();
        reposition(&mut slots, &a, &a, Placement::After).unwrap();
        assert_eq!(names(&slots), vec!["a", "b"]);
    }

    #[test]
    fn missing_reference_restores_sequence() {
        let mut slots = sequence(&["a", "b"]);
        let a = slots[0].clone();
        let stranger = Slot::new("z");
        let err = reposition(&mut slots, &a, &stranger, Placement::Before).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConsistencyViolation);
        assert_eq!(names(&slots), vec!["a", "b"]);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let options = match json!({"label": "x", "bogus": 1}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let err = ensure_known_keys("Acme:Page", &options, &[LABEL]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeDefinitionInvalid);
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn renderable_options_check_shapes() {
        let bad = match json!({"renderingOptions": "nope"}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        assert!(RenderableOptions::parse("T", &bad).is_err());

        let good = match json!({"label": "L", "renderer": "R", "renderingOptions": {"a": 1}}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let mut core = RenderableCore::new("id".into(), "T".into()).unwrap();
        RenderableOptions::parse("T", &good).unwrap().apply(&mut core);
        assert_eq!(core.label, "L");
        assert_eq!(core.renderer.as_deref(), Some("R"));
        assert_eq!(core.rendering_options.get("a"), Some(&json!(1)));
    }
}
