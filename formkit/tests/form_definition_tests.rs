//! Integration tests for the form definition aggregate
//!
//! These drive the public API end to end: configuration from preset defaults,
//! page management, the flat element index, finishers and processing rules.

use std::any::Any;
use std::rc::Rc;

use formkit::{
    ErrorKind, Finisher, FormDefaults, FormDefinition, FormElement, Implementations, Options,
    Page, Renderable, DEFAULT_FORM_TYPE,
};
use serde_json::{json, Value};

/// Finisher fixture that records the options it was built with.
#[derive(Debug)]
struct EmptyFinisher {
    implementation: String,
    options: Options,
}

impl EmptyFinisher {
    fn construct(implementation: &str, options: Options) -> Rc<dyn Finisher> {
        Rc::new(Self {
            implementation: implementation.to_string(),
            options,
        })
    }
}

impl Finisher for EmptyFinisher {
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

fn obj(value: Value) -> Options {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn implementations() -> Rc<Implementations> {
    Rc::new(Implementations::default().with_finisher("EmptyFinisher", EmptyFinisher::construct))
}

fn form_with(defaults: Value) -> formkit::Result<FormDefinition> {
    let defaults: FormDefaults = serde_json::from_value(defaults).unwrap();
    FormDefinition::with_defaults("myForm", defaults, DEFAULT_FORM_TYPE, implementations())
}

fn form_with_finisher_presets() -> FormDefinition {
    form_with(json!({
        "finisherPresets": {
            "asdf": {"assd": "as"},
            "email": {"implementation": "EmptyFinisher"},
            "emailWithOptions": {
                "implementation": "EmptyFinisher",
                "options": {"foo": "bar", "name": "asdf"}
            }
        },
        "formElementTypes": {"Formkit.Core:Form": {}}
    }))
    .unwrap()
}

fn form_with_page_types() -> FormDefinition {
    form_with(json!({
        "formElementTypes": {
            "Formkit.Core:Form": {},
            "Formkit.Core:Page": {"implementation": "Page"},
            "Acme:LabeledPage": {
                "superType": "Formkit.Core:Page",
                "label": "My Label",
                "renderer": "FooRenderer",
                "renderingOptions": {"foo": "bar", "baz": "test"}
            },
            "Acme:BrokenPage": {"superType": "Formkit.Core:Page", "unknownProperty": "val"},
            "Acme:AbstractPage": {"label": "no implementation"}
        }
    }))
    .unwrap()
}

#[test]
fn identifier_set_in_constructor_can_be_read_again() {
    let form = FormDefinition::new("foo").unwrap();
    assert_eq!(form.identifier(), "foo");
    let form = FormDefinition::new("fooBar").unwrap();
    assert_eq!(form.identifier(), "fooBar");
}

#[test]
fn empty_identifier_is_rejected() {
    let err = FormDefinition::new("").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IdentifierInvalid);
}

#[test]
fn form_type_sets_renderer_and_rendering_options() {
    let form = form_with(json!({
        "formElementTypes": {
            "Formkit.Core:Form": {
                "renderer": "FooRenderer",
                "renderingOptions": {"foo": "bar", "baz": "test"}
            }
        }
    }))
    .unwrap();
    assert_eq!(form.renderer().as_deref(), Some("FooRenderer"));
    assert_eq!(
        Value::Object(form.rendering_options()),
        json!({"foo": "bar", "baz": "test"})
    );
}

#[test]
fn form_type_sets_finishers() {
    let form = form_with(json!({
        "finisherPresets": {
            "myFinisher": {
                "implementation": "EmptyFinisher",
                "options": {"foo": "bar", "test": "asdf"}
            }
        },
        "formElementTypes": {
            "Formkit.Core:Form": {
                "finishers": [{"identifier": "myFinisher", "options": {"foo": "baz"}}]
            }
        }
    }))
    .unwrap();

    let finishers = form.finishers();
    assert_eq!(finishers.len(), 1);
    let finisher = finishers[0]
        .as_any()
        .downcast_ref::<EmptyFinisher>()
        .expect("finisher should be an EmptyFinisher");
    assert_eq!(
        Value::Object(finisher.options.clone()),
        json!({"foo": "baz", "test": "asdf"})
    );
}

#[test]
fn validator_presets_are_available() {
    let form = form_with(json!({
        "validatorPresets": {"foo": "bar"},
        "formElementTypes": {"Formkit.Core:Form": {}}
    }))
    .unwrap();
    assert_eq!(Value::Object(form.validator_presets()), json!({"foo": "bar"}));
}

#[test]
fn unknown_form_property_is_rejected() {
    let err = form_with(json!({
        "formElementTypes": {"Formkit.Core:Form": {"unknownFormProperty": "val"}}
    }))
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeDefinitionInvalid);
}

#[test]
fn pages_are_empty_by_default() {
    let form = FormDefinition::new("foo").unwrap();
    assert!(form.pages().is_empty());
    assert!(!form.has_page_with_index(0));
    assert_eq!(form.page_by_index(0).unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn add_page_sets_back_reference_and_index() {
    let form = FormDefinition::new("foo").unwrap();
    let first = Page::new("bar").unwrap();
    let second = Page::new("baz").unwrap();
    form.add_page(&first).unwrap();
    form.add_page(&second).unwrap();

    assert_eq!(form.pages(), vec![first.clone(), second.clone()]);
    assert_eq!(first.parent_form(), Some(form.clone()));
    assert_eq!(first.index(), Some(0));
    assert_eq!(second.index(), Some(1));
    assert!(form.has_page_with_index(1));
}

#[test]
fn element_lookup_covers_elements_attached_before_and_after() {
    let form = FormDefinition::new("foo").unwrap();
    let page = Page::new("bar").unwrap();
    let before = FormElement::new("before", "Acme:Text").unwrap();
    page.add_element(&before).unwrap();
    form.add_page(&page).unwrap();
    let after = FormElement::new("after", "Acme:Text").unwrap();
    page.add_element(&after).unwrap();

    assert_eq!(form.element_by_identifier("before"), Some(before));
    assert_eq!(form.element_by_identifier("after"), Some(after));
    assert!(form.element_by_identifier("nope").is_none());
}

#[test]
fn two_elements_with_the_same_identifier_are_rejected() {
    let form = FormDefinition::new("foo").unwrap();
    let page = Page::new("bar").unwrap();
    form.add_page(&page).unwrap();
    page.add_element(&FormElement::new("myElement", "Acme:Text").unwrap())
        .unwrap();
    let err = page
        .add_element(&FormElement::new("myElement", "Acme:Text").unwrap())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateIdentifier);

    let other_page = Page::new("baz").unwrap();
    other_page
        .add_element(&FormElement::new("myElement", "Acme:Text").unwrap())
        .unwrap();
    let err = form.add_page(&other_page).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateIdentifier);
    assert_eq!(form.pages().len(), 1);
}

#[test]
fn a_page_can_only_be_attached_to_a_single_form() {
    let page = Page::new("bar").unwrap();
    FormDefinition::new("foo1").unwrap().add_page(&page).unwrap();
    let err = FormDefinition::new("foo2").unwrap().add_page(&page).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConsistencyViolation);
}

#[test]
fn create_page_uses_the_type_definition() {
    let form = form_with_page_types();
    let page = form.create_page_of_type("myPage", "Acme:LabeledPage").unwrap();

    assert_eq!(page.identifier(), "myPage");
    assert_eq!(page.type_name(), "Acme:LabeledPage");
    assert_eq!(page.label(), "My Label");
    assert_eq!(page.renderer().as_deref(), Some("FooRenderer"));
    assert_eq!(
        Value::Object(page.rendering_options()),
        json!({"foo": "bar", "baz": "test"})
    );
    assert_eq!(form.pages(), vec![page]);

    let default_page = form.create_page("second").unwrap();
    assert_eq!(default_page.index(), Some(1));
}

#[test]
fn create_page_rejects_bad_type_definitions() {
    let form = form_with_page_types();
    let err = form.create_page_of_type("p", "Acme:BrokenPage").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeDefinitionInvalid);
    let err = form.create_page_of_type("p", "Acme:AbstractPage").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeNotFound);
    assert!(form.pages().is_empty());
}

#[test]
fn type_resolver_is_exposed() {
    let form = form_with_page_types();
    let resolver = form.type_resolver();
    assert!(resolver.registry().contains("Acme:LabeledPage"));
    assert_eq!(
        resolver.supertypes("Acme:LabeledPage").unwrap(),
        vec!["Acme:LabeledPage".to_string(), "Formkit.Core:Page".to_string()]
    );
}

#[test]
fn move_page_before_and_after() {
    let form = FormDefinition::new("foo").unwrap();
    let pages: Vec<Page> = ["bar1", "bar2", "bar3"]
        .into_iter()
        .map(|id| Page::new(id).unwrap())
        .collect();
    for page in &pages {
        form.add_page(page).unwrap();
    }

    form.move_page_before(&pages[1], &pages[0]).unwrap();
    assert_eq!(
        form.pages(),
        vec![pages[1].clone(), pages[0].clone(), pages[2].clone()]
    );
    assert_eq!(
        pages.iter().map(Page::index).collect::<Vec<_>>(),
        vec![Some(1), Some(0), Some(2)]
    );

    let form = FormDefinition::new("foo").unwrap();
    let pages: Vec<Page> = ["bar1", "bar2", "bar3"]
        .into_iter()
        .map(|id| Page::new(id).unwrap())
        .collect();
    for page in &pages {
        form.add_page(page).unwrap();
    }
    form.move_page_after(&pages[0], &pages[1]).unwrap();
    assert_eq!(
        pages.iter().map(Page::index).collect::<Vec<_>>(),
        vec![Some(1), Some(0), Some(2)]
    );
}

#[test]
fn move_page_rejects_pages_of_other_forms() {
    let form = FormDefinition::new("foo").unwrap();
    let mine = Page::new("bar1").unwrap();
    form.add_page(&mine).unwrap();
    let foreign = Page::new("bar2").unwrap();

    let err = form.move_page_before(&mine, &foreign).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConsistencyViolation);
    let err = form.move_page_after(&foreign, &mine).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConsistencyViolation);
    assert_eq!(mine.index(), Some(0));
}

#[test]
fn remove_page_removes_page_and_its_elements() {
    let form = FormDefinition::new("foo").unwrap();
    let page = Page::new("bar").unwrap();
    let element = FormElement::new("el", "Acme:Text").unwrap();
    page.add_element(&element).unwrap();
    form.add_page(&page).unwrap();

    form.remove_page(&page).unwrap();
    assert!(form.pages().is_empty());
    assert!(page.parent_form().is_none());
    assert!(form.element_by_identifier("el").is_none());

    let err = form.remove_page(&page).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConsistencyViolation);
}

#[test]
fn processing_rule_is_created_once_per_path() {
    let form = FormDefinition::new("foo").unwrap();
    let rule = form.processing_rule("email");
    assert!(rule.ptr_eq(&form.processing_rule("email")));
    assert_eq!(form.processing_rules().len(), 1);
}

#[test]
fn add_finisher_appends() {
    let form = FormDefinition::new("foo1").unwrap();
    assert!(form.finishers().is_empty());
    let finisher = EmptyFinisher::construct("EmptyFinisher", Options::new());
    form.add_finisher(Rc::clone(&finisher));
    let finishers = form.finishers();
    assert_eq!(finishers.len(), 1);
    assert!(Rc::ptr_eq(&finishers[0], &finisher));
}

#[test]
fn create_finisher_failures() {
    let err = FormDefinition::new("foo1")
        .unwrap()
        .create_finisher("asdf", &Options::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FinisherPresetNotFound);

    let err = form_with_finisher_presets()
        .create_finisher("asdf", &Options::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FinisherPresetNotFound);
}

#[test]
fn create_finisher_builds_and_appends() {
    let form = form_with_finisher_presets();
    let finisher = form.create_finisher("email", &Options::new()).unwrap();
    assert!(finisher.as_any().downcast_ref::<EmptyFinisher>().is_some());
    assert_eq!(form.finishers().len(), 1);
    assert!(Rc::ptr_eq(&form.finishers()[0], &finisher));
}

#[test]
fn create_finisher_merges_options() {
    let form = form_with_finisher_presets();
    let finisher = form
        .create_finisher("emailWithOptions", &Options::new())
        .unwrap();
    assert_eq!(
        Value::Object(finisher.options().clone()),
        json!({"foo": "bar", "name": "asdf"})
    );

    let finisher = form
        .create_finisher("emailWithOptions", &obj(json!({"foo": "baz"})))
        .unwrap();
    assert_eq!(
        Value::Object(finisher.options().clone()),
        json!({"foo": "baz", "name": "asdf"})
    );
}

#[test]
fn bind_returns_runtime_for_the_form() {
    let form = FormDefinition::new("foo").unwrap();
    let runtime = form.bind(vec!["GET"], String::new());
    assert_eq!(runtime.definition(), &form);
    let (definition, request, response) = runtime.into_parts();
    assert!(definition.ptr_eq(&form));
    assert_eq!(request, vec!["GET"]);
    assert!(response.is_empty());
}
