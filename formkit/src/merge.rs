//! Recursive merging of configuration maps.
//!
//! Objects merge key by key so that a more specific fragment refines the one
//! it overlays. Every other value (strings, numbers, lists, null) is replaced
//! wholesale by the overlay.

use serde_json::{Map, Value};

/// A configuration map as read from type fragments, presets and documents.
pub type Options = Map<String, Value>;

/// Overlay `overlay` onto `base`, in place.
pub fn merge_into(base: &mut Options, overlay: &Options) {
    for (key, value) in overlay {
        match (base.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_into(existing, incoming);
            }
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Return `base` overlaid with `overlay`, leaving both inputs untouched.
pub fn merged(base: &Options, overlay: &Options) -> Options {
    let mut result = base.clone();
    merge_into(&mut result, overlay);
    result
}

/// Borrow the object stored under `key`, or an empty map when absent.
pub(crate) fn object_or_empty(options: &Options, key: &str) -> Options {
    match options.get(key) {
        Some(Value::Object(map)) => map.clone(),
        _ => Options::new(),
    }
}
