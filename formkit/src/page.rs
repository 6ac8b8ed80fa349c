//! Pages of a multi-page form.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::container::Container;
use crate::definition::{DefinitionInner, FormDefinition};
use crate::element::FormElement;
use crate::error::Result;
use crate::merge::Options;
use crate::renderable::{
    ensure_known_keys, Parent, ParentLink, Placement, Renderable, RenderableCore,
    RenderableOptions, Sibling, LABEL, RENDERER, RENDERING_OPTIONS,
};
use crate::types::DEFAULT_PAGE_TYPE;
use crate::validator::IMPLEMENTATION;

/// Keys a page type definition or option map may carry.
pub(crate) const PAGE_KEYS: &[&str] = &[IMPLEMENTATION, LABEL, RENDERER, RENDERING_OPTIONS];

pub(crate) struct PageInner {
    pub(crate) core: RenderableCore,
    pub(crate) elements: Vec<FormElement>,
    pub(crate) parent: Option<ParentLink>,
}

/// Handle to a page.
///
/// Clones refer to the same page; equality is identity.
#[derive(Clone)]
pub struct Page {
    pub(crate) inner: Rc<RefCell<PageInner>>,
}

impl Page {
    /// A detached page of the default page type.
    pub fn new(identifier: &str) -> Result<Self> {
        Self::with_type(identifier, DEFAULT_PAGE_TYPE)
    }

    /// A detached page of `type_name`.
    pub fn with_type(identifier: &str, type_name: &str) -> Result<Self> {
        let core = RenderableCore::new(identifier.to_string(), type_name.to_string())?;
        Ok(Self {
            inner: Rc::new(RefCell::new(PageInner {
                core,
                elements: Vec::new(),
                parent: None,
            })),
        })
    }

    /// Position within the form, `None` while detached.
    pub fn index(&self) -> Option<usize> {
        self.inner.borrow().core.index
    }

    /// Owner of this page, always a [`Parent::Definition`] once attached.
    pub fn parent(&self) -> Option<Parent> {
        self.inner.borrow().parent.as_ref().and_then(ParentLink::upgrade)
    }

    pub fn parent_form(&self) -> Option<FormDefinition> {
        match self.parent()? {
            Parent::Definition(definition) => Some(definition),
            _ => None,
        }
    }

    /// Apply label, renderer and rendering options from a configuration map.
    ///
    /// `implementation` is consumed at construction and ignored here.
    pub fn set_options(&self, options: &Options) -> Result<()> {
        let type_name = self.type_name();
        ensure_known_keys(&type_name, options, PAGE_KEYS)?;
        let parsed = RenderableOptions::parse(&type_name, options)?;
        parsed.apply(&mut self.core_mut());
        Ok(())
    }

    /// Top-level elements, in order.
    pub fn elements(&self) -> Vec<FormElement> {
        self.inner.borrow().elements.clone()
    }

    /// Every element on this page, including those nested in sections.
    pub fn elements_recursively(&self) -> Vec<FormElement> {
        let mut all = Vec::new();
        for element in self.elements() {
            all.extend(element.subtree());
        }
        all
    }

    /// Search this page's subtree for `identifier`.
    pub fn find_element(&self, identifier: &str) -> Option<FormElement> {
        self.elements_recursively()
            .into_iter()
            .find(|element| element.identifier() == identifier)
    }

    /// Append a detached element.
    ///
    /// On an attached page, identifiers of the element's subtree are checked
    /// against the form before anything changes.
    pub fn add_element(&self, element: &FormElement) -> Result<()> {
        Container::Page(self).add_element(element)
    }

    /// Resolve `type_name`, build the element and append it.
    pub fn create_element(&self, identifier: &str, type_name: &str) -> Result<FormElement> {
        Container::Page(self).create_element(identifier, type_name)
    }

    pub fn remove_element(&self, element: &FormElement) -> Result<()> {
        Container::Page(self).remove_element(element)
    }

    pub fn move_element_before(&self, to_move: &FormElement, reference: &FormElement) -> Result<()> {
        Container::Page(self).move_element(to_move, reference, Placement::Before)
    }

    pub fn move_element_after(&self, to_move: &FormElement, reference: &FormElement) -> Result<()> {
        Container::Page(self).move_element(to_move, reference, Placement::After)
    }

    pub(crate) fn has_parent(&self) -> bool {
        self.inner.borrow().parent.is_some()
    }

    pub(crate) fn attach(&self, parent: Weak<RefCell<DefinitionInner>>, index: usize) {
        let mut inner = self.inner.borrow_mut();
        inner.parent = Some(ParentLink::Definition(parent));
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

impl Renderable for Page {
    fn core(&self) -> Ref<'_, RenderableCore> {
        Ref::map(self.inner.borrow(), |inner| &inner.core)
    }

    fn core_mut(&self) -> RefMut<'_, RenderableCore> {
        RefMut::map(self.inner.borrow_mut(), |inner| &mut inner.core)
    }
}

impl Sibling for Page {
    fn same_node(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }

    fn set_index(&self, index: Option<usize>) {
        self.inner.borrow_mut().core.index = index;
    }
}

impl PartialEq for Page {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Page")
            .field("identifier", &inner.core.identifier)
            .field("type_name", &inner.core.type_name)
            .field("index", &inner.core.index)
            .field("elements", &inner.elements.len())
            .finish_non_exhaustive()
    }
}
