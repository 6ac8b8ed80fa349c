//! Building form definitions from configuration documents.
//!
//! A document is a map with the form's `identifier`, an optional `type`, the
//! form-level options and a `renderables` list. Top-level renderables become
//! pages, everything below a page becomes an element:
//!
//! ```yaml
//! identifier: contact
//! renderables:
//!   - identifier: page1
//!     renderables:
//!       - identifier: name
//!         type: Formkit.Core:SingleLineText
//!         label: Name
//! ```

use std::rc::Rc;

use serde_json::Value;
use tracing::debug;

use crate::definition::FormDefinition;
use crate::element::{FormElement, PROPERTIES};
use crate::error::{validate_identifier, FormError, Result};
use crate::implementations::Implementations;
use crate::merge::Options;
use crate::page::Page;
use crate::renderable::Renderable;
use crate::settings::FormSettings;
use crate::types::{DEFAULT_FORM_TYPE, DEFAULT_PAGE_TYPE};
use crate::validator::IDENTIFIER;

const TYPE: &str = "type";
const RENDERABLES: &str = "renderables";
const KEY: &str = "_key";
const VALUE: &str = "_value";

/// Builds form definitions against a set of presets.
#[derive(Debug, Clone)]
pub struct FormFactory {
    settings: FormSettings,
    implementations: Rc<Implementations>,
}

enum ElementParent<'a> {
    Page(&'a Page),
    Section(&'a FormElement),
}

impl FormFactory {
    pub fn new(settings: FormSettings, implementations: Rc<Implementations>) -> Self {
        Self {
            settings,
            implementations,
        }
    }

    pub fn settings(&self) -> &FormSettings {
        &self.settings
    }

    /// Build the form described by `configuration` using preset `preset_name`.
    pub fn build(&self, configuration: &Value, preset_name: &str) -> Result<FormDefinition> {
        let defaults = self.settings.preset(preset_name)?;
        let Value::Object(document) = configuration else {
            return Err(FormError::invalid_identifier(
                "form configuration must be a map with an identifier",
            ));
        };
        let identifier = required_identifier(document)?;
        let type_name = optional_type(document, identifier)?.unwrap_or(DEFAULT_FORM_TYPE);

        let form = FormDefinition::with_defaults(
            identifier,
            defaults,
            type_name,
            Rc::clone(&self.implementations),
        )?;
        form.set_options(&remaining_options(document))?;

        for entry in renderables(document, identifier)? {
            let entry = entry_map(entry, identifier)?;
            let page_identifier = required_identifier(entry)?;
            let page_type = optional_type(entry, page_identifier)?.unwrap_or(DEFAULT_PAGE_TYPE);
            let page = form.create_page_of_type(page_identifier, page_type)?;
            page.set_options(&remaining_options(entry))?;
            build_elements(renderables(entry, page_identifier)?, &ElementParent::Page(&page))?;
        }

        debug!(
            form = identifier,
            preset = preset_name,
            pages = form.pages().len(),
            "built form definition"
        );
        Ok(form)
    }
}

fn build_elements(entries: &[Value], parent: &ElementParent<'_>) -> Result<()> {
    for entry in entries {
        let parent_identifier = match parent {
            ElementParent::Page(page) => page.identifier(),
            ElementParent::Section(section) => section.identifier(),
        };
        let entry = entry_map(entry, &parent_identifier)?;
        let identifier = required_identifier(entry)?;
        let type_name = optional_type(entry, identifier)?.ok_or_else(|| FormError::MissingType {
            identifier: identifier.to_string(),
        })?;

        let element = match parent {
            ElementParent::Page(page) => page.create_element(identifier, type_name)?,
            ElementParent::Section(section) => section.create_element(identifier, type_name)?,
        };

        let mut options = remaining_options(entry);
        if let Some(properties) = options.get_mut(PROPERTIES) {
            convert_key_value_lists(properties);
        }
        element.set_options(&options)?;

        build_elements(
            renderables(entry, identifier)?,
            &ElementParent::Section(&element),
        )?;
    }
    Ok(())
}

fn required_identifier(entry: &Options) -> Result<&str> {
    match entry.get(IDENTIFIER) {
        Some(Value::String(identifier)) => {
            validate_identifier(identifier)?;
            Ok(identifier)
        }
        Some(other) => Err(FormError::invalid_identifier(format!(
            "identifier must be a string, got {other}"
        ))),
        None => Err(FormError::invalid_identifier("identifier is missing")),
    }
}

fn optional_type<'a>(entry: &'a Options, identifier: &str) -> Result<Option<&'a str>> {
    match entry.get(TYPE) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(type_name)) => Ok(Some(type_name)),
        Some(other) => Err(FormError::TypeDefinitionInvalid {
            type_name: other.to_string(),
            message: format!("type of '{identifier}' must be a string"),
        }),
    }
}

fn renderables<'a>(entry: &'a Options, identifier: &str) -> Result<&'a [Value]> {
    match entry.get(RENDERABLES) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(entries)) => Ok(entries),
        Some(other) => Err(FormError::TypeDefinitionInvalid {
            type_name: identifier.to_string(),
            message: format!("'{RENDERABLES}' must be a list, got {other}"),
        }),
    }
}

fn entry_map<'a>(entry: &'a Value, parent: &str) -> Result<&'a Options> {
    match entry {
        Value::Object(entry) => Ok(entry),
        other => Err(FormError::invalid_identifier(format!(
            "renderable below '{parent}' must be a map with an identifier, got {other}"
        ))),
    }
}

/// Every key except the structural ones.
fn remaining_options(entry: &Options) -> Options {
    entry
        .iter()
        .filter(|(key, _)| ![IDENTIFIER, TYPE, RENDERABLES].contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Turn `[{_key: k, _value: v}, ...]` lists into `{k: v, ...}` maps, recursively.
fn convert_key_value_lists(value: &mut Value) {
    match value {
        Value::Array(items) if is_key_value_list(items) => {
            let map: Options = items
                .iter_mut()
                .filter_map(|item| match item {
                    Value::Object(pair) => {
                        let key = match pair.remove(KEY)? {
                            Value::String(key) => key,
                            other => other.to_string(),
                        };
                        let mut value = pair.remove(VALUE).unwrap_or(Value::Null);
                        convert_key_value_lists(&mut value);
                        Some((key, value))
                    }
                    _ => None,
                })
                .collect();
            *value = Value::Object(map);
        }
        Value::Array(items) => items.iter_mut().for_each(convert_key_value_lists),
        Value::Object(map) => map.values_mut().for_each(convert_key_value_lists),
        _ => {}
    }
}

fn is_key_value_list(items: &[Value]) -> bool {
    !items.is_empty()
        && items
            .iter()
            .all(|item| matches!(item, Value::Object(pair) if pair.contains_key(KEY)))
}
