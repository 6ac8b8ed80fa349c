//! Form elements.
//!
//! An element is either a leaf (a single field) or a section that holds an
//! ordered list of child elements. Sections follow the same attach, removal
//! and ordering rules as pages.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::container::Container;
use crate::definition::FormDefinition;
use crate::error::{FormError, Result};
use crate::implementations::{GENERIC_FORM_ELEMENT, SECTION};
use crate::merge::{merge_into, Options};
use crate::renderable::{
    ensure_known_keys, Parent, ParentLink, Placement, Renderable, RenderableCore,
    RenderableOptions, Sibling, LABEL, RENDERER, RENDERING_OPTIONS,
};
use crate::validator::{parse_preset_references, ValidatorSpec, IMPLEMENTATION};

pub(crate) const PROPERTIES: &str = "properties";
pub(crate) const VALIDATORS: &str = "validators";
pub(crate) const DEFAULT_VALUE: &str = "defaultValue";

/// Keys an element type definition or option map may carry.
pub(crate) const ELEMENT_KEYS: &[&str] = &[
    IMPLEMENTATION,
    LABEL,
    RENDERER,
    RENDERING_OPTIONS,
    PROPERTIES,
    VALIDATORS,
    DEFAULT_VALUE,
];

pub(crate) struct ElementInner {
    pub(crate) core: RenderableCore,
    implementation: String,
    composite: bool,
    properties: Options,
    default_value: Option<Value>,
    data_type: Option<String>,
    validators: Vec<ValidatorSpec>,
    pub(crate) children: Vec<FormElement>,
    pub(crate) parent: Option<ParentLink>,
}

/// Handle to a form element.
///
/// Clones refer to the same element; equality is identity.
#[derive(Clone)]
pub struct FormElement {
    pub(crate) inner: Rc<RefCell<ElementInner>>,
}

impl FormElement {
    /// A detached leaf element.
    pub fn new(identifier: &str, type_name: &str) -> Result<Self> {
        Self::build(identifier, type_name, GENERIC_FORM_ELEMENT, false)
    }

    /// A detached section that can hold child elements.
    pub fn section(identifier: &str, type_name: &str) -> Result<Self> {
        Self::build(identifier, type_name, SECTION, true)
    }

    fn build(identifier: &str, type_name: &str, implementation: &str, composite: bool) -> Result<Self> {
        let core = RenderableCore::new(identifier.to_string(), type_name.to_string())?;
        Ok(Self {
            inner: Rc::new(RefCell::new(ElementInner {
                core,
                implementation: implementation.to_string(),
                composite,
                properties: Options::new(),
                default_value: None,
                data_type: None,
                validators: Vec::new(),
                children: Vec::new(),
                parent: None,
            })),
        })
    }

    /// Name of the implementation this element was built from.
    pub fn implementation(&self) -> String {
        self.inner.borrow().implementation.clone()
    }

    pub(crate) fn set_implementation(&self, implementation: &str) {
        self.inner.borrow_mut().implementation = implementation.to_string();
    }

    /// Whether this element can hold child elements.
    pub fn is_composite(&self) -> bool {
        self.inner.borrow().composite
    }

    /// Position among the siblings, `None` while detached.
    pub fn index(&self) -> Option<usize> {
        self.inner.borrow().core.index
    }

    pub fn parent(&self) -> Option<Parent> {
        self.inner.borrow().parent.as_ref().and_then(ParentLink::upgrade)
    }

    /// The definition owning this element, through any number of sections.
    pub fn root_form(&self) -> Option<FormDefinition> {
        self.parent().and_then(|parent| parent.root_form())
    }

    /// `<form identifier>-<element identifier>`, once attached to a form.
    pub fn unique_identifier(&self) -> Option<String> {
        self.root_form()
            .map(|form| format!("{}-{}", form.identifier(), self.identifier()))
    }

    pub fn properties(&self) -> Options {
        self.inner.borrow().properties.clone()
    }

    pub fn property(&self, key: &str) -> Option<Value> {
        self.inner.borrow().properties.get(key).cloned()
    }

    pub fn set_property(&self, key: impl Into<String>, value: Value) {
        self.inner.borrow_mut().properties.insert(key.into(), value);
    }

    pub fn default_value(&self) -> Option<Value> {
        self.inner.borrow().default_value.clone()
    }

    /// Set the default value, updating the owning form's default values.
    pub fn set_default_value(&self, value: Value) {
        self.inner.borrow_mut().default_value = Some(value.clone());
        if let Some(form) = self.root_form() {
            form.set_element_default_value(&self.identifier(), value);
        }
    }

    pub fn data_type(&self) -> Option<String> {
        self.inner.borrow().data_type.clone()
    }

    /// Set the target data type, forwarding it to the processing rule once attached.
    pub fn set_data_type(&self, data_type: impl Into<String>) {
        let data_type = data_type.into();
        self.inner.borrow_mut().data_type = Some(data_type.clone());
        if let Some(form) = self.root_form() {
            form.processing_rule(&self.identifier()).set_data_type(data_type);
        }
    }

    pub fn validators(&self) -> Vec<ValidatorSpec> {
        self.inner.borrow().validators.clone()
    }

    /// Add a validator, forwarding it to the processing rule once attached.
    ///
    /// A validator equal to one already present is ignored.
    pub fn add_validator(&self, validator: ValidatorSpec) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.validators.contains(&validator) {
                return;
            }
            inner.validators.push(validator.clone());
        }
        if let Some(form) = self.root_form() {
            form.processing_rule(&self.identifier()).add_validator(validator);
        }
    }

    /// Apply a configuration map.
    ///
    /// Accepts the element keys of a type definition. `implementation` is
    /// consumed at construction and ignored here. Validator presets can only
    /// be resolved while the element is attached to a form.
    pub fn set_options(&self, options: &Options) -> Result<()> {
        let root = self.root_form();
        let parsed = ElementOptions::parse(&self.type_name(), options, root.as_ref())?;
        self.apply_options(parsed);
        Ok(())
    }

    pub(crate) fn apply_options(&self, options: ElementOptions) {
        {
            let mut inner = self.inner.borrow_mut();
            options.renderable.apply(&mut inner.core);
            if let Some(properties) = options.properties {
                merge_into(&mut inner.properties, &properties);
            }
        }
        if let Some(value) = options.default_value {
            self.set_default_value(value);
        }
        for validator in options.validators {
            self.add_validator(validator);
        }
    }

    /// Direct children, in order. Leaves have none.
    pub fn elements(&self) -> Vec<FormElement> {
        self.inner.borrow().children.clone()
    }

    /// Every descendant, depth first in document order.
    pub fn elements_recursively(&self) -> Vec<FormElement> {
        let mut all = Vec::new();
        for child in self.elements() {
            all.push(child.clone());
            all.extend(child.elements_recursively());
        }
        all
    }

    /// This element followed by all of its descendants.
    pub(crate) fn subtree(&self) -> Vec<FormElement> {
        let mut all = vec![self.clone()];
        all.extend(self.elements_recursively());
        all
    }

    pub fn find_element(&self, identifier: &str) -> Option<FormElement> {
        self.elements_recursively()
            .into_iter()
            .find(|element| element.identifier() == identifier)
    }

    /// Append a detached element to this section.
    pub fn add_element(&self, element: &FormElement) -> Result<()> {
        Container::Section(self).add_element(element)
    }

    /// Resolve `type_name`, build the element and append it to this section.
    pub fn create_element(&self, identifier: &str, type_name: &str) -> Result<FormElement> {
        Container::Section(self).create_element(identifier, type_name)
    }

    pub fn remove_element(&self, element: &FormElement) -> Result<()> {
        Container::Section(self).remove_element(element)
    }

    pub fn move_element_before(&self, to_move: &FormElement, reference: &FormElement) -> Result<()> {
        Container::Section(self).move_element(to_move, reference, Placement::Before)
    }

    pub fn move_element_after(&self, to_move: &FormElement, reference: &FormElement) -> Result<()> {
        Container::Section(self).move_element(to_move, reference, Placement::After)
    }

    pub(crate) fn has_parent(&self) -> bool {
        self.inner.borrow().parent.is_some()
    }

    pub(crate) fn attach(&self, parent: ParentLink, index: usize) {
        let mut inner = self.inner.borrow_mut();
        inner.parent = Some(parent);
        inner.core.index = Some(index);
    }

    pub(crate) fn detach(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.parent = None;
        inner.core.index = None;
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Renderable for FormElement {
    fn core(&self) -> Ref<'_, RenderableCore> {
        Ref::map(self.inner.borrow(), |inner| &inner.core)
    }

    fn core_mut(&self) -> RefMut<'_, RenderableCore> {
        RefMut::map(self.inner.borrow_mut(), |inner| &mut inner.core)
    }
}

impl Sibling for FormElement {
    fn same_node(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }

    fn set_index(&self, index: Option<usize>) {
        self.inner.borrow_mut().core.index = index;
    }
}

impl PartialEq for FormElement {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for FormElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("FormElement")
            .field("identifier", &inner.core.identifier)
            .field("type_name", &inner.core.type_name)
            .field("implementation", &inner.implementation)
            .field("index", &inner.core.index)
            .field("children", &inner.children.len())
            .finish_non_exhaustive()
    }
}

/// Element configuration validated ahead of any mutation.
#[derive(Debug, Default)]
pub(crate) struct ElementOptions {
    renderable: RenderableOptions,
    properties: Option<Options>,
    default_value: Option<Value>,
    validators: Vec<ValidatorSpec>,
}

impl ElementOptions {
    pub(crate) fn parse(
        type_name: &str,
        options: &Options,
        root: Option<&FormDefinition>,
    ) -> Result<Self> {
        ensure_known_keys(type_name, options, ELEMENT_KEYS)?;
        let renderable = RenderableOptions::parse(type_name, options)?;

        let properties = match options.get(PROPERTIES) {
            None | Some(Value::Null) => None,
            Some(Value::Object(properties)) => Some(properties.clone()),
            Some(other) => {
                return Err(FormError::TypeDefinitionInvalid {
                    type_name: type_name.to_string(),
                    message: format!("'{PROPERTIES}' must be a map, got {other}"),
                })
            }
        };

        let default_value = match options.get(DEFAULT_VALUE) {
            None | Some(Value::Null) => None,
            Some(value) => Some(value.clone()),
        };

        let references = match options.get(VALIDATORS) {
            Some(value) => parse_preset_references(type_name, VALIDATORS, value)?,
            None => Vec::new(),
        };
        let validators = match (references.is_empty(), root) {
            (true, _) => Vec::new(),
            (false, Some(root)) => references
                .iter()
                .map(|reference| root.create_validator(&reference.identifier, &reference.options))
                .collect::<Result<Vec<_>>>()?,
            (false, None) => {
                return Err(FormError::consistency(format!(
                    "validators of type '{type_name}' need an element attached to a form definition"
                )))
            }
        };

        Ok(Self {
            renderable,
            properties,
            default_value,
            validators,
        })
    }
}
