//! Child management shared by pages and sections.

use std::cell::RefMut;
use std::rc::Rc;

use tracing::debug;

use crate::definition::FormDefinition;
use crate::element::FormElement;
use crate::error::{FormError, Result};
use crate::page::Page;
use crate::renderable::{renumber, reposition, Parent, ParentLink, Placement, Renderable};

/// A node that owns an ordered list of elements.
pub(crate) enum Container<'a> {
    Page(&'a Page),
    Section(&'a FormElement),
}

impl Container<'_> {
    fn identifier(&self) -> String {
        match self {
            Container::Page(page) => page.identifier(),
            Container::Section(section) => section.identifier(),
        }
    }

    fn root_form(&self) -> Option<FormDefinition> {
        match self {
            Container::Page(page) => page.parent_form(),
            Container::Section(section) => section.root_form(),
        }
    }

    fn link(&self) -> ParentLink {
        match self {
            Container::Page(page) => ParentLink::Page(Rc::downgrade(&page.inner)),
            Container::Section(section) => ParentLink::Element(Rc::downgrade(&section.inner)),
        }
    }

    fn children(&self) -> Vec<FormElement> {
        match self {
            Container::Page(page) => page.elements(),
            Container::Section(section) => section.elements(),
        }
    }

    fn children_mut(&self) -> RefMut<'_, Vec<FormElement>> {
        match self {
            Container::Page(page) => RefMut::map(page.inner.borrow_mut(), |inner| &mut inner.elements),
            Container::Section(section) => {
                RefMut::map(section.inner.borrow_mut(), |inner| &mut inner.children)
            }
        }
    }

    fn accepts_children(&self) -> Result<()> {
        match self {
            Container::Section(section) if !section.is_composite() => {
                Err(FormError::consistency(format!(
                    "element '{}' of type '{}' cannot hold child elements",
                    section.identifier(),
                    section.type_name()
                )))
            }
            _ => Ok(()),
        }
    }

    /// Whether this container is `element` or nested somewhere below it.
    fn lies_within(&self, element: &FormElement) -> bool {
        let Container::Section(section) = self else {
            return false;
        };
        let mut current = Some((*section).clone());
        while let Some(node) = current {
            if node.ptr_eq(element) {
                return true;
            }
            current = match node.parent() {
                Some(Parent::Element(parent)) => Some(parent),
                _ => None,
            };
        }
        false
    }

    pub(crate) fn add_element(&self, element: &FormElement) -> Result<()> {
        self.accepts_children()?;
        if element.has_parent() {
            return Err(FormError::consistency(format!(
                "element '{}' already has a parent",
                element.identifier()
            )));
        }
        if self.lies_within(element) {
            return Err(FormError::consistency(format!(
                "element '{}' cannot be added to its own subtree",
                element.identifier()
            )));
        }

        let root = self.root_form();
        let subtree = element.subtree();
        if let Some(root) = &root {
            root.check_can_register(&subtree)?;
        }

        let index = {
            let mut children = self.children_mut();
            children.push(element.clone());
            children.len() - 1
        };
        element.attach(self.link(), index);
        if let Some(root) = &root {
            root.register_elements(&subtree);
        }

        debug!(
            element = %element.identifier(),
            container = %self.identifier(),
            index,
            "added form element"
        );
        Ok(())
    }

    pub(crate) fn create_element(&self, identifier: &str, type_name: &str) -> Result<FormElement> {
        self.accepts_children()?;
        let root = self.root_form().ok_or_else(|| {
            FormError::consistency(format!(
                "cannot create element '{identifier}': '{}' is not attached to a form definition",
                self.identifier()
            ))
        })?;
        let element = root.instantiate_element(identifier, type_name)?;
        self.add_element(&element)?;
        Ok(element)
    }

    pub(crate) fn remove_element(&self, element: &FormElement) -> Result<()> {
        let position = self
            .children()
            .iter()
            .position(|child| child.ptr_eq(element))
            .ok_or_else(|| {
                FormError::consistency(format!(
                    "element '{}' is not a child of '{}'",
                    element.identifier(),
                    self.identifier()
                ))
            })?;

        {
            let mut children = self.children_mut();
            children.remove(position);
            renumber(children.as_slice());
        }
        element.detach();
        if let Some(root) = self.root_form() {
            root.deregister_elements(&element.subtree());
        }

        debug!(
            element = %element.identifier(),
            container = %self.identifier(),
            "removed form element"
        );
        Ok(())
    }

    pub(crate) fn move_element(
        &self,
        to_move: &FormElement,
        reference: &FormElement,
        placement: Placement,
    ) -> Result<()> {
        let mut children = self.children_mut();
        reposition(&mut *children, to_move, reference, placement)
    }
}
