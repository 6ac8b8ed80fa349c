//! The form definition aggregate.
//!
//! A [`FormDefinition`] owns its pages, keeps a flat index from element
//! identifier to element across every page and section, and carries the
//! finishers, presets and processing rules of the form. All structural
//! invariants are checked before anything is mutated, so a failed call leaves
//! the definition as it was.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::element::{ElementOptions, FormElement};
use crate::error::{FormError, Result};
use crate::finisher::{resolve_finisher, Finisher};
use crate::implementations::Implementations;
use crate::merge::Options;
use crate::page::{Page, PAGE_KEYS};
use crate::processing_rule::ProcessingRule;
use crate::renderable::{
    ensure_known_keys, renumber, reposition, Placement, Renderable, RenderableCore,
    RenderableOptions, LABEL, RENDERER, RENDERING_OPTIONS,
};
use crate::runtime::FormRuntime;
use crate::settings::FormDefaults;
use crate::types::{SupertypeResolver, TypeRegistry, DEFAULT_FORM_TYPE, DEFAULT_PAGE_TYPE};
use crate::validator::{parse_preset_references, resolve_validator, ValidatorSpec, IMPLEMENTATION};

pub(crate) const FINISHERS: &str = "finishers";

/// Keys a form type definition or option map may carry.
pub(crate) const FORM_KEYS: &[&str] = &[LABEL, RENDERER, RENDERING_OPTIONS, FINISHERS];

pub(crate) struct DefinitionInner {
    core: RenderableCore,
    pages: Vec<Page>,
    elements_by_identifier: HashMap<String, FormElement>,
    element_default_values: HashMap<String, Value>,
    finishers: Vec<Rc<dyn Finisher>>,
    finisher_presets: Options,
    validator_presets: Options,
    processing_rules: IndexMap<String, ProcessingRule>,
    resolver: Rc<SupertypeResolver>,
    implementations: Rc<Implementations>,
}

/// Handle to a form definition.
///
/// Clones refer to the same definition; equality is identity.
#[derive(Clone)]
pub struct FormDefinition {
    inner: Rc<RefCell<DefinitionInner>>,
}

impl FormDefinition {
    /// An empty definition of the default form type, without type lookup.
    pub fn new(identifier: &str) -> Result<Self> {
        Self::assemble(
            identifier,
            DEFAULT_FORM_TYPE,
            FormDefaults::default(),
            Rc::new(Implementations::default()),
        )
    }

    /// A definition configured from a preset's defaults.
    ///
    /// Resolves `type_name` against the preset's types and applies the
    /// resulting label, renderer, rendering options and finishers.
    pub fn with_defaults(
        identifier: &str,
        defaults: FormDefaults,
        type_name: &str,
        implementations: Rc<Implementations>,
    ) -> Result<Self> {
        let definition = Self::assemble(identifier, type_name, defaults, implementations)?;
        let options = definition.type_definition(type_name)?;
        definition.set_options(&options)?;
        debug!(form = identifier, type_name, "created form definition");
        Ok(definition)
    }

    fn assemble(
        identifier: &str,
        type_name: &str,
        defaults: FormDefaults,
        implementations: Rc<Implementations>,
    ) -> Result<Self> {
        let core = RenderableCore::new(identifier.to_string(), type_name.to_string())?;
        let resolver = SupertypeResolver::new(TypeRegistry::from_types(defaults.form_element_types));
        Ok(Self {
            inner: Rc::new(RefCell::new(DefinitionInner {
                core,
                pages: Vec::new(),
                elements_by_identifier: HashMap::new(),
                element_default_values: HashMap::new(),
                finishers: Vec::new(),
                finisher_presets: defaults.finisher_presets,
                validator_presets: defaults.validator_presets,
                processing_rules: IndexMap::new(),
                resolver: Rc::new(resolver),
                implementations,
            })),
        })
    }

    pub(crate) fn from_inner(inner: Rc<RefCell<DefinitionInner>>) -> Self {
        Self { inner }
    }

    /// Apply label, renderer, rendering options and finishers.
    ///
    /// Every finisher is resolved before anything changes.
    pub fn set_options(&self, options: &Options) -> Result<()> {
        let type_name = self.type_name();
        ensure_known_keys(&type_name, options, FORM_KEYS)?;
        let renderable = RenderableOptions::parse(&type_name, options)?;
        let references = match options.get(FINISHERS) {
            Some(value) => parse_preset_references(&type_name, FINISHERS, value)?,
            None => Vec::new(),
        };
        let finishers = references
            .iter()
            .map(|reference| self.construct_finisher(&reference.identifier, &reference.options))
            .collect::<Result<Vec<_>>>()?;

        renderable.apply(&mut self.core_mut());
        for finisher in finishers {
            self.add_finisher(finisher);
        }
        Ok(())
    }

    /// The resolver this definition resolves page and element types with.
    pub fn type_resolver(&self) -> Rc<SupertypeResolver> {
        Rc::clone(&self.inner.borrow().resolver)
    }

    /// Merged definition of `type_name`.
    pub fn type_definition(&self, type_name: &str) -> Result<Options> {
        self.type_resolver().merged_type_definition(type_name)
    }

    pub fn implementations(&self) -> Rc<Implementations> {
        Rc::clone(&self.inner.borrow().implementations)
    }

    /// Pages in order.
    pub fn pages(&self) -> Vec<Page> {
        self.inner.borrow().pages.clone()
    }

    pub fn page_by_index(&self, index: usize) -> Result<Page> {
        let inner = self.inner.borrow();
        inner
            .pages
            .get(index)
            .cloned()
            .ok_or(FormError::PageNotFound {
                index,
                count: inner.pages.len(),
            })
    }

    pub fn has_page_with_index(&self, index: usize) -> bool {
        index < self.inner.borrow().pages.len()
    }

    /// Append a detached page and register every element below it.
    pub fn add_page(&self, page: &Page) -> Result<()> {
        if page.has_parent() {
            return Err(FormError::consistency(format!(
                "page '{}' already belongs to a form definition",
                page.identifier()
            )));
        }
        let elements = page.elements_recursively();
        self.check_can_register(&elements)?;

        let index = {
            let mut inner = self.inner.borrow_mut();
            inner.pages.push(page.clone());
            inner.pages.len() - 1
        };
        page.attach(Rc::downgrade(&self.inner), index);
        self.register_elements(&elements);

        debug!(
            form = %self.identifier(),
            page = %page.identifier(),
            index,
            elements = elements.len(),
            "added page"
        );
        Ok(())
    }

    /// Create a page of the default page type and append it.
    pub fn create_page(&self, identifier: &str) -> Result<Page> {
        self.create_page_of_type(identifier, DEFAULT_PAGE_TYPE)
    }

    /// Resolve `type_name`, build the page it names and append it.
    pub fn create_page_of_type(&self, identifier: &str, type_name: &str) -> Result<Page> {
        let mut options = self.type_definition(type_name)?;
        let implementation = take_implementation(type_name, &mut options)?;
        ensure_known_keys(type_name, &options, PAGE_KEYS)?;
        let renderable = RenderableOptions::parse(type_name, &options)?;
        let construct = self
            .implementations()
            .page(&implementation)
            .ok_or_else(|| FormError::ImplementationNotFound {
                type_name: type_name.to_string(),
                message: format!("page implementation '{implementation}' is not registered"),
            })?;

        let page = construct(identifier, type_name)?;
        renderable.apply(&mut page.core_mut());
        self.add_page(&page)?;
        Ok(page)
    }

    /// Build a detached element of `type_name`, configured from its merged type.
    pub(crate) fn instantiate_element(&self, identifier: &str, type_name: &str) -> Result<FormElement> {
        let mut options = self.type_definition(type_name)?;
        let implementation = take_implementation(type_name, &mut options)?;
        let parsed = ElementOptions::parse(type_name, &options, Some(self))?;
        let construct = self
            .implementations()
            .element(&implementation)
            .ok_or_else(|| FormError::ImplementationNotFound {
                type_name: type_name.to_string(),
                message: format!("element implementation '{implementation}' is not registered"),
            })?;

        let element = construct(identifier, type_name)?;
        element.set_implementation(&implementation);
        element.apply_options(parsed);
        Ok(element)
    }

    /// Detach `page` and forget every identifier below it.
    pub fn remove_page(&self, page: &Page) -> Result<()> {
        let position = self
            .inner
            .borrow()
            .pages
            .iter()
            .position(|candidate| candidate.ptr_eq(page));
        let Some(position) = position else {
            return Err(FormError::consistency(format!(
                "page '{}' does not belong to form '{}'",
                page.identifier(),
                self.identifier()
            )));
        };

        {
            let mut inner = self.inner.borrow_mut();
            inner.pages.remove(position);
            renumber(&inner.pages);
        }
        page.detach();
        self.deregister_elements(&page.elements_recursively());

        debug!(form = %self.identifier(), page = %page.identifier(), "removed page");
        Ok(())
    }

    pub fn move_page_before(&self, to_move: &Page, reference: &Page) -> Result<()> {
        self.move_page(to_move, reference, Placement::Before)
    }

    pub fn move_page_after(&self, to_move: &Page, reference: &Page) -> Result<()> {
        self.move_page(to_move, reference, Placement::After)
    }

    fn move_page(&self, to_move: &Page, reference: &Page, placement: Placement) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        reposition(&mut inner.pages, to_move, reference, placement)
    }

    /// Look up any element of this form by identifier.
    pub fn element_by_identifier(&self, identifier: &str) -> Option<FormElement> {
        self.inner
            .borrow()
            .elements_by_identifier
            .get(identifier)
            .cloned()
    }

    pub fn element_default_value(&self, identifier: &str) -> Option<Value> {
        self.inner
            .borrow()
            .element_default_values
            .get(identifier)
            .cloned()
    }

    pub(crate) fn set_element_default_value(&self, identifier: &str, value: Value) {
        self.inner
            .borrow_mut()
            .element_default_values
            .insert(identifier.to_string(), value);
    }

    /// Fail if any of `elements` would collide with each other or with an
    /// identifier already registered.
    pub(crate) fn check_can_register(&self, elements: &[FormElement]) -> Result<()> {
        let inner = self.inner.borrow();
        let mut seen = HashSet::new();
        for element in elements {
            let identifier = element.identifier();
            if inner.elements_by_identifier.contains_key(&identifier) || !seen.insert(identifier.clone()) {
                return Err(FormError::DuplicateIdentifier { identifier });
            }
        }
        Ok(())
    }

    pub(crate) fn register_elements(&self, elements: &[FormElement]) {
        for element in elements {
            let identifier = element.identifier();
            {
                let mut inner = self.inner.borrow_mut();
                inner
                    .elements_by_identifier
                    .insert(identifier.clone(), element.clone());
                if let Some(value) = element.default_value() {
                    inner.element_default_values.insert(identifier.clone(), value);
                }
            }

            let data_type = element.data_type();
            let validators = element.validators();
            if data_type.is_none() && validators.is_empty() {
                continue;
            }
            let rule = self.processing_rule(&identifier);
            if let Some(data_type) = data_type {
                rule.set_data_type(data_type);
            }
            for validator in validators {
                rule.add_validator(validator);
            }
        }
    }

    pub(crate) fn deregister_elements(&self, elements: &[FormElement]) {
        let mut inner = self.inner.borrow_mut();
        for element in elements {
            let identifier = element.identifier();
            inner.elements_by_identifier.remove(&identifier);
            inner.element_default_values.remove(&identifier);
        }
    }

    pub fn add_finisher(&self, finisher: Rc<dyn Finisher>) {
        debug!(
            form = %self.identifier(),
            implementation = finisher.implementation(),
            "added finisher"
        );
        self.inner.borrow_mut().finishers.push(finisher);
    }

    /// Build a finisher from a preset and append it.
    ///
    /// `override_options` are merged over the preset's options.
    pub fn create_finisher(&self, preset: &str, override_options: &Options) -> Result<Rc<dyn Finisher>> {
        let finisher = self.construct_finisher(preset, override_options)?;
        self.add_finisher(Rc::clone(&finisher));
        Ok(finisher)
    }

    fn construct_finisher(&self, preset: &str, override_options: &Options) -> Result<Rc<dyn Finisher>> {
        let (resolved, implementations) = {
            let inner = self.inner.borrow();
            (
                resolve_finisher(&inner.finisher_presets, preset, override_options)?,
                Rc::clone(&inner.implementations),
            )
        };
        let construct = implementations
            .finisher(&resolved.implementation)
            .ok_or_else(|| FormError::FinisherPresetNotFound {
                name: preset.to_string(),
                message: format!(
                    "finisher implementation '{}' is not registered",
                    resolved.implementation
                ),
            })?;
        Ok(construct(&resolved.implementation, resolved.options))
    }

    pub fn finishers(&self) -> Vec<Rc<dyn Finisher>> {
        self.inner.borrow().finishers.clone()
    }

    pub fn finisher_presets(&self) -> Options {
        self.inner.borrow().finisher_presets.clone()
    }

    pub fn validator_presets(&self) -> Options {
        self.inner.borrow().validator_presets.clone()
    }

    /// Resolve a validator preset, merging `override_options` over its options.
    pub fn create_validator(&self, preset: &str, override_options: &Options) -> Result<ValidatorSpec> {
        resolve_validator(&self.inner.borrow().validator_presets, preset, override_options)
    }

    /// The processing rule for `property_path`, created on first use.
    pub fn processing_rule(&self, property_path: &str) -> ProcessingRule {
        let mut inner = self.inner.borrow_mut();
        inner
            .processing_rules
            .entry(property_path.to_string())
            .or_insert_with(|| {
                debug!(property_path, "created processing rule");
                ProcessingRule::new()
            })
            .clone()
    }

    /// Every processing rule created so far, in creation order.
    pub fn processing_rules(&self) -> IndexMap<String, ProcessingRule> {
        self.inner.borrow().processing_rules.clone()
    }

    /// Hand this definition to the runtime layer.
    pub fn bind<Req, Res>(&self, request: Req, response: Res) -> FormRuntime<Req, Res> {
        FormRuntime::new(self.clone(), request, response)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Remove and return the `implementation` a merged type declares.
fn take_implementation(type_name: &str, options: &mut Options) -> Result<String> {
    match options.remove(IMPLEMENTATION) {
        Some(Value::String(implementation)) if !implementation.is_empty() => Ok(implementation),
        Some(other) => Err(FormError::ImplementationNotFound {
            type_name: type_name.to_string(),
            message: format!("'{IMPLEMENTATION}' must be a non-empty string, got {other}"),
        }),
        None => Err(FormError::ImplementationNotFound {
            type_name: type_name.to_string(),
            message: "type declares no implementation".to_string(),
        }),
    }
}

impl Renderable for FormDefinition {
    fn core(&self) -> Ref<'_, RenderableCore> {
        Ref::map(self.inner.borrow(), |inner| &inner.core)
    }

    fn core_mut(&self) -> RefMut<'_, RenderableCore> {
        RefMut::map(self.inner.borrow_mut(), |inner| &mut inner.core)
    }
}

impl PartialEq for FormDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for FormDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("FormDefinition")
            .field("identifier", &inner.core.identifier)
            .field("type_name", &inner.core.type_name)
            .field("pages", &inner.pages.len())
            .field("elements", &inner.elements_by_identifier.len())
            .field("finishers", &inner.finishers.len())
            .finish_non_exhaustive()
    }
}
