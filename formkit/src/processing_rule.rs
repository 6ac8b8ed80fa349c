//! Per-property processing rules.
//!
//! A processing rule collects what a later submission step needs to know about
//! one property path: the target data type, the validators to run and the
//! property-mapping configuration. Rules are created lazily by
//! [`FormDefinition::processing_rule`](crate::FormDefinition::processing_rule)
//! and shared by handle.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::merge::Options;
use crate::validator::ValidatorSpec;

#[derive(Debug, Default)]
struct ProcessingRuleInner {
    data_type: Option<String>,
    validators: Vec<ValidatorSpec>,
    property_mapping: Options,
}

/// Shared handle to the processing rule of one property path.
///
/// Clones refer to the same rule; equality is identity.
#[derive(Clone, Default)]
pub struct ProcessingRule {
    inner: Rc<RefCell<ProcessingRuleInner>>,
}

impl ProcessingRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data_type(&self) -> Option<String> {
        self.inner.borrow().data_type.clone()
    }

    pub fn set_data_type(&self, data_type: impl Into<String>) {
        self.inner.borrow_mut().data_type = Some(data_type.into());
    }

    pub fn validators(&self) -> Vec<ValidatorSpec> {
        self.inner.borrow().validators.clone()
    }

    /// Append a validator unless an equal one is already present.
    pub fn add_validator(&self, validator: ValidatorSpec) {
        let mut inner = self.inner.borrow_mut();
        if !inner.validators.contains(&validator) {
            inner.validators.push(validator);
        }
    }

    pub fn property_mapping(&self) -> Options {
        self.inner.borrow().property_mapping.clone()
    }

    pub fn set_property_mapping_option(&self, key: impl Into<String>, value: Value) {
        self.inner
            .borrow_mut()
            .property_mapping
            .insert(key.into(), value);
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for ProcessingRule {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ProcessingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ProcessingRule")
            .field("data_type", &inner.data_type)
            .field("validators", &inner.validators)
            .finish_non_exhaustive()
    }
}
