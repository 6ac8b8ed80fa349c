//! Validator configuration resolved from validator presets.
//!
//! Validators are not executed by this crate. A [`ValidatorSpec`] records which
//! implementation a later processing step should run and with which options.

use serde::Serialize;
use serde_json::Value;

use crate::error::{FormError, Result};
use crate::merge::{merged, object_or_empty, Options};

pub(crate) const IMPLEMENTATION: &str = "implementation";
pub(crate) const OPTIONS: &str = "options";
pub(crate) const IDENTIFIER: &str = "identifier";

/// A validator ready to be attached to a processing rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorSpec {
    /// Preset the validator was created from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    pub implementation: String,
    pub options: Options,
}

impl ValidatorSpec {
    pub fn new(implementation: impl Into<String>, options: Options) -> Self {
        Self {
            preset: None,
            implementation: implementation.into(),
            options,
        }
    }
}

/// Resolve `preset` from `presets`, merging `overrides` over the preset options.
pub(crate) fn resolve_validator(
    presets: &Options,
    preset: &str,
    overrides: &Options,
) -> Result<ValidatorSpec> {
    let not_found = |message: &str| FormError::ValidatorPresetNotFound {
        name: preset.to_string(),
        message: message.to_string(),
    };

    let Some(Value::Object(configuration)) = presets.get(preset) else {
        return Err(not_found("preset is not defined"));
    };
    let implementation = configuration
        .get(IMPLEMENTATION)
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| not_found("preset declares no implementation"))?;

    Ok(ValidatorSpec {
        preset: Some(preset.to_string()),
        implementation: implementation.to_string(),
        options: merged(&object_or_empty(configuration, OPTIONS), overrides),
    })
}

/// A `{identifier, options}` reference to a preset, as written in
/// `validators` and `finishers` lists.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PresetReference {
    pub(crate) identifier: String,
    pub(crate) options: Options,
}

/// Parse a list of preset references stored under `key`.
pub(crate) fn parse_preset_references(
    type_name: &str,
    key: &str,
    value: &Value,
) -> Result<Vec<PresetReference>> {
    let invalid = |message: String| FormError::TypeDefinitionInvalid {
        type_name: type_name.to_string(),
        message,
    };

    let entries = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Array(entries) => entries,
        other => return Err(invalid(format!("'{key}' must be a list, got {other}"))),
    };

    entries
        .iter()
        .map(|entry| {
            let Value::Object(entry) = entry else {
                return Err(invalid(format!("'{key}' entries must be maps, got {entry}")));
            };
            let identifier = entry
                .get(IDENTIFIER)
                .and_then(Value::as_str)
                .ok_or_else(|| invalid(format!("'{key}' entry without identifier")))?;
            let options = match entry.get(OPTIONS) {
                None | Some(Value::Null) => Options::new(),
                Some(Value::Object(options)) => options.clone(),
                Some(other) => {
                    return Err(invalid(format!(
                        "options of '{identifier}' must be a map, got {other}"
                    )))
                }
            };
            Ok(PresetReference {
                identifier: identifier.to_string(),
                options,
            })
        })
        .collect()
}
