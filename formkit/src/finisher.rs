//! Finishers run after a form was submitted successfully.
//!
//! Running them belongs to the runtime layer. Here they are only constructed
//! from presets and carried by the definition.

use std::any::Any;
use std::fmt::Debug;
use std::rc::Rc;

use serde_json::Value;

use crate::error::{FormError, Result};
use crate::merge::{merged, object_or_empty, Options};
use crate::validator::{IMPLEMENTATION, OPTIONS};

/// A finisher attached to a form definition.
pub trait Finisher: Debug {
    /// Implementation name the finisher was registered under.
    fn implementation(&self) -> &str;

    /// Options the finisher was constructed with.
    fn options(&self) -> &Options;

    fn as_any(&self) -> &dyn Any;
}

/// Finisher that only carries its options.
///
/// Useful for tools that build and inspect definitions without running them.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionsFinisher {
    implementation: String,
    options: Options,
}

impl OptionsFinisher {
    pub fn new(implementation: impl Into<String>, options: Options) -> Self {
        Self {
            implementation: implementation.into(),
            options,
        }
    }

    /// Constructor suitable for [`Implementations::with_finisher`](crate::Implementations::with_finisher).
    pub fn construct(implementation: &str, options: Options) -> Rc<dyn Finisher> {
        Rc::new(Self::new(implementation, options))
    }
}

impl Finisher for OptionsFinisher {
    fn implementation(&self) -> &str {
        &self.implementation
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Implementation name and merged options of a finisher preset.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ResolvedFinisher {
    pub(crate) implementation: String,
    pub(crate) options: Options,
}

/// Look up `preset` and merge `overrides` over its options.
pub(crate) fn resolve_finisher(
    presets: &Options,
    preset: &str,
    overrides: &Options,
) -> Result<ResolvedFinisher> {
    let not_found = |message: &str| FormError::FinisherPresetNotFound {
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

    Ok(ResolvedFinisher {
        implementation: implementation.to_string(),
        options: merged(&object_or_empty(configuration, OPTIONS), overrides),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn obj(value: Value) -> Options {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn override_wins_and_preset_keys_survive() {
        let presets = obj(json!({
            "email": {"implementation": "Email", "options": {"foo": "bar", "name": "asdf"}}
        }));
        let resolved = resolve_finisher(&presets, "email", &obj(json!({"foo": "baz"}))).unwrap();
        assert_eq!(resolved.implementation, "Email");
        assert_eq!(
            Value::Object(resolved.options),
            json!({"foo": "baz", "name": "asdf"})
        );
    }

    #[test]
    fn preset_without_implementation_is_not_found() {
        let presets = obj(json!({"asdf": {"assd": "as"}}));
        let err = resolve_finisher(&presets, "asdf", &Options::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FinisherPresetNotFound);
    }

    #[test]
    fn options_finisher_downcasts() {
        let finisher = OptionsFinisher::construct("Redirect", obj(json!({"uri": "/thanks"})));
        assert_eq!(finisher.implementation(), "Redirect");
        assert_eq!(finisher.options().get("uri"), Some(&json!("/thanks")));
        assert!(finisher.as_any().downcast_ref::<OptionsFinisher>().is_some());
    }
}
