//! Declarative multi-page form definitions
//!
//! `formkit` models a form as a tree: a [`FormDefinition`] owns ordered
//! [`Page`]s, and pages own ordered [`FormElement`]s, some of which are
//! sections holding further elements. Every node is configured from a named
//! type whose configuration is resolved along its `superType` chain.
//!
//! # Architecture
//!
//! - **Type resolution**: [`SupertypeResolver`] deep-merges type fragments
//!   root-first and memoizes the result per type name
//! - **Tree model**: handles share state through `Rc<RefCell<..>>`; children
//!   point back at their parent through `Weak` links
//! - **Flat index**: every element attached below a definition is reachable by
//!   identifier in O(1), and identifiers are unique per definition
//! - **Presets**: [`FormSettings`] holds named presets with types, finisher
//!   presets and validator presets, loaded through figment
//! - **Factory**: [`FormFactory`] turns a configuration document into a
//!   definition
//!
//! Rendering, validation and finisher execution happen elsewhere. A built
//! definition is handed to that layer with [`FormDefinition::bind`].

mod container;
pub mod definition;
pub mod element;
pub mod error;
pub mod factory;
pub mod finisher;
pub mod implementations;
pub mod logging;
pub mod merge;
pub mod page;
pub mod processing_rule;
pub mod renderable;
pub mod runtime;
pub mod settings;
pub mod types;
pub mod validator;

pub use definition::FormDefinition;
pub use element::FormElement;
pub use error::{ErrorKind, FormError, Result};
pub use factory::FormFactory;
pub use finisher::{Finisher, OptionsFinisher};
pub use implementations::Implementations;
pub use logging::Pretty;
pub use merge::Options;
pub use page::Page;
pub use processing_rule::ProcessingRule;
pub use renderable::{Parent, Renderable};
pub use runtime::FormRuntime;
pub use settings::{FormDefaults, FormSettings};
pub use types::{SupertypeResolver, TypeRegistry, DEFAULT_FORM_TYPE, DEFAULT_PAGE_TYPE};
pub use validator::ValidatorSpec;
