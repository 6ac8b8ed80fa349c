//! Name → constructor registry for pages, elements and finishers.
//!
//! Merged type definitions and finisher presets name their implementation as a
//! plain string. The registry maps those names to constructors.

use std::collections::HashMap;
use std::rc::Rc;

use crate::element::FormElement;
use crate::error::Result;
use crate::finisher::Finisher;
use crate::merge::Options;
use crate::page::Page;

/// Builds a page from its identifier and type name.
pub type PageConstructor = fn(identifier: &str, type_name: &str) -> Result<Page>;

/// Builds an element from its identifier and type name.
pub type ElementConstructor = fn(identifier: &str, type_name: &str) -> Result<FormElement>;

/// Builds a finisher from its implementation name and merged options.
pub type FinisherConstructor = fn(implementation: &str, options: Options) -> Rc<dyn Finisher>;

/// Implementation name of the built-in page.
pub const PAGE: &str = "Page";

/// Implementation name of the built-in leaf element.
pub const GENERIC_FORM_ELEMENT: &str = "GenericFormElement";

/// Implementation name of the built-in composite element.
pub const SECTION: &str = "Section";

/// Registered implementations.
///
/// `Default` registers the built-in page, leaf element and section. There
/// are no built-in finishers.
#[derive(Debug, Clone)]
pub struct Implementations {
    pages: HashMap<String, PageConstructor>,
    elements: HashMap<String, ElementConstructor>,
    finishers: HashMap<String, FinisherConstructor>,
}

impl Implementations {
    /// A registry without any implementations.
    pub fn empty() -> Self {
        Self {
            pages: HashMap::new(),
            elements: HashMap::new(),
            finishers: HashMap::new(),
        }
    }

    pub fn with_page(mut self, name: impl Into<String>, constructor: PageConstructor) -> Self {
        self.pages.insert(name.into(), constructor);
        self
    }

    pub fn with_element(
        mut self,
        name: impl Into<String>,
        constructor: ElementConstructor,
    ) -> Self {
        self.elements.insert(name.into(), constructor);
        self
    }

    pub fn with_finisher(
        mut self,
        name: impl Into<String>,
        constructor: FinisherConstructor,
    ) -> Self {
        self.finishers.insert(name.into(), constructor);
        self
    }

    pub fn page(&self, name: &str) -> Option<PageConstructor> {
        self.pages.get(name).copied()
    }

    pub fn element(&self, name: &str) -> Option<ElementConstructor> {
        self.elements.get(name).copied()
    }

    pub fn finisher(&self, name: &str) -> Option<FinisherConstructor> {
        self.finishers.get(name).copied()
    }

    pub fn has_finisher(&self, name: &str) -> bool {
        self.finishers.contains_key(name)
    }
}

impl Default for Implementations {
    fn default() -> Self {
        Self::empty()
            .with_page(PAGE, Page::with_type)
            .with_element(GENERIC_FORM_ELEMENT, FormElement::new)
            .with_element(SECTION, FormElement::section)
    }
}
