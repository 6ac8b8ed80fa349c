//! Form presets and how they are loaded.
//!
//! A preset bundles the type registry, finisher presets and validator presets
//! a form is built against. Presets may extend another preset through
//! `parentPreset`; the parent's configuration is merged first.
//!
//! Settings are read with figment. Files are merged in the order given, then
//! environment variables prefixed `FORMKIT_` are merged on top, with `__`
//! separating nested keys:
//!
//! ```text
//! FORMKIT_presets__contact__parentPreset=default
//! ```

use std::collections::HashSet;
use std::path::Path;

use figment::providers::{Env, Format, Json, Toml, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{FormError, Result};
use crate::merge::{merge_into, Options};

/// Prefix of environment variables read by [`FormSettings::load`].
pub const ENV_PREFIX: &str = "FORMKIT_";

const PARENT_PRESET: &str = "parentPreset";
const FORM_ELEMENT_TYPES: &str = "formElementTypes";
const FINISHER_PRESETS: &str = "finisherPresets";
const VALIDATOR_PRESETS: &str = "validatorPresets";

const PRESET_KEYS: &[&str] = &[
    FORM_ELEMENT_TYPES,
    FINISHER_PRESETS,
    VALIDATOR_PRESETS,
    PARENT_PRESET,
];

/// The resolved configuration a form definition is built against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormDefaults {
    /// Type fragments keyed by type name.
    pub form_element_types: Options,
    /// Finisher presets: `{implementation, options}` keyed by preset name.
    pub finisher_presets: Options,
    /// Validator presets: `{implementation, options}` keyed by preset name.
    pub validator_presets: Options,
}

/// Named presets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormSettings {
    #[serde(default)]
    pub presets: Options,
}

impl FormSettings {
    pub fn new(presets: Options) -> Self {
        Self { presets }
    }

    /// Load settings from `paths`, then from `FORMKIT_` environment variables.
    ///
    /// The format of each file follows its extension: `.json`, `.toml`, and
    /// YAML for anything else.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut figment = Figment::new();
        for path in paths {
            let path = path.as_ref();
            if !path.is_file() {
                return Err(figment::Error::from(format!(
                    "settings file not found: {}",
                    path.display()
                ))
                .into());
            }
            debug!(path = %path.display(), "loading form settings");
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("json") => figment.merge(Json::file(path)),
                Some("toml") => figment.merge(Toml::file(path)),
                _ => figment.merge(Yaml::file(path)),
            };
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__").lowercase(false));

        let settings: FormSettings = figment.extract()?;
        debug!(presets = settings.presets.len(), "loaded form settings");
        Ok(settings)
    }

    /// Names of all presets.
    pub fn preset_names(&self) -> Vec<String> {
        self.presets.keys().cloned().collect()
    }

    /// Resolve `name`, merging its `parentPreset` chain root-first.
    pub fn preset(&self, name: &str) -> Result<FormDefaults> {
        let mut chain: Vec<Options> = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(name.to_string());

        while let Some(preset_name) = current {
            if !seen.insert(preset_name.clone()) {
                return Err(FormError::PresetNotFound { name: preset_name });
            }
            let preset = match self.presets.get(&preset_name) {
                Some(Value::Object(preset)) => preset,
                Some(other) => {
                    return Err(FormError::TypeDefinitionInvalid {
                        type_name: preset_name,
                        message: format!("preset must be a map, got {other}"),
                    })
                }
                None => return Err(FormError::PresetNotFound { name: preset_name }),
            };
            if let Some(key) = preset.keys().find(|key| !PRESET_KEYS.contains(&key.as_str())) {
                return Err(FormError::TypeDefinitionInvalid {
                    type_name: preset_name,
                    message: format!("unknown preset key '{key}'"),
                });
            }
            current = preset
                .get(PARENT_PRESET)
                .and_then(Value::as_str)
                .map(str::to_string);
            chain.push(preset.clone());
        }

        let mut merged = Options::new();
        for preset in chain.iter().rev() {
            merge_into(&mut merged, preset);
        }
        merged.remove(PARENT_PRESET);

        let defaults: FormDefaults =
            serde_json::from_value(Value::Object(merged)).map_err(|err| {
                FormError::TypeDefinitionInvalid {
                    type_name: name.to_string(),
                    message: err.to_string(),
                }
            })?;
        debug!(
            preset = name,
            types = defaults.form_element_types.len(),
            finishers = defaults.finisher_presets.len(),
            validators = defaults.validator_presets.len(),
            "resolved form preset"
        );
        Ok(defaults)
    }
}
