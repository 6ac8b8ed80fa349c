//! Form element types and supertype resolution.
//!
//! A type is a named configuration fragment that may extend exactly one other
//! type through its `superType` key. Resolving a type walks the chain up to its
//! root and folds the fragments root-first, so the most specific type wins per
//! key while nested maps are merged instead of replaced.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{FormError, Result};
use crate::logging::Pretty;
use crate::merge::{merge_into, Options};

/// Key through which a fragment names its parent type.
pub const SUPER_TYPE_KEY: &str = "superType";

/// Default type of a form definition.
pub const DEFAULT_FORM_TYPE: &str = "Formkit.Core:Form";

/// Default type of a page.
pub const DEFAULT_PAGE_TYPE: &str = "Formkit.Core:Page";

/// Named type fragments, keyed by type name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeRegistry {
    fragments: Options,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a `formElementTypes` map.
    ///
    /// Entries are checked when resolved: each must be a map or null, the
    /// latter counting as an empty fragment.
    pub fn from_types(types: Options) -> Self {
        Self { fragments: types }
    }

    /// Add or replace a fragment.
    pub fn register(&mut self, type_name: impl Into<String>, fragment: Options) {
        self.fragments
            .insert(type_name.into(), Value::Object(fragment));
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.fragments.contains_key(type_name)
    }

    /// Registered type names, in registration order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.fragments.keys().map(String::as_str)
    }

    /// The raw, unmerged fragment of a type, `None` if it is not registered.
    pub fn fragment(&self, type_name: &str) -> Result<Option<Options>> {
        match self.fragments.get(type_name) {
            None => Ok(None),
            Some(Value::Null) => Ok(Some(Options::new())),
            Some(Value::Object(map)) => Ok(Some(map.clone())),
            Some(other) => Err(FormError::TypeDefinitionInvalid {
                type_name: type_name.to_string(),
                message: format!("type definition must be a map, got {other}"),
            }),
        }
    }

    fn parent_of(&self, type_name: &str) -> Result<Option<String>> {
        let Some(fragment) = self.fragment(type_name)? else {
            return Ok(None);
        };
        match fragment.get(SUPER_TYPE_KEY) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(parent)) => Ok(Some(parent.clone())),
            Some(other) => Err(FormError::TypeDefinitionInvalid {
                type_name: type_name.to_string(),
                message: format!("'{SUPER_TYPE_KEY}' must be a type name, got {other}"),
            }),
        }
    }
}

/// Resolves merged type definitions from a [`TypeRegistry`].
///
/// Results are memoized per type name. Mutating the registry through
/// [`SupertypeResolver::register`] drops the memo, so resolution is always
/// deterministic for the current registry snapshot.
#[derive(Debug, Default)]
pub struct SupertypeResolver {
    registry: TypeRegistry,
    cache: RefCell<HashMap<String, Options>>,
}

impl SupertypeResolver {
    pub fn new(registry: TypeRegistry) -> Self {
        Self {
            registry,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Add or replace a type, invalidating every memoized resolution.
    pub fn register(&mut self, type_name: impl Into<String>, fragment: Options) {
        self.registry.register(type_name, fragment);
        self.cache.get_mut().clear();
    }

    /// Ancestor chain of `type_name`, most specific first.
    pub fn supertypes(&self, type_name: &str) -> Result<Vec<String>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(type_name.to_string());

        while let Some(name) = current {
            if !self.registry.contains(&name) {
                return Err(FormError::TypeNotFound { type_name: name });
            }
            if !seen.insert(name.clone()) {
                chain.push(name);
                return Err(FormError::CyclicTypeHierarchy { chain });
            }
            current = self.registry.parent_of(&name)?;
            chain.push(name);
        }

        Ok(chain)
    }

    /// Fully merged definition of `type_name`, without the `superType` key.
    pub fn merged_type_definition(&self, type_name: &str) -> Result<Options> {
        if let Some(cached) = self.cache.borrow().get(type_name) {
            trace!(type_name, "type definition cache hit");
            return Ok(cached.clone());
        }

        let chain = self.supertypes(type_name)?;
        let mut merged = Options::new();
        for name in chain.iter().rev() {
            if let Some(fragment) = self.registry.fragment(name)? {
                merge_into(&mut merged, &fragment);
            }
        }
        merged.remove(SUPER_TYPE_KEY);

        debug!(
            type_name,
            depth = chain.len(),
            "resolved type definition: {}",
            Pretty(&merged)
        );
        self.cache
            .borrow_mut()
            .insert(type_name.to_string(), merged.clone());
        Ok(merged)
    }
}
