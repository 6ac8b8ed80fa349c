//! Command implementations.
//!
//! Each command returns the text to print so the output can be tested without
//! capturing stdout.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result};
use formkit::{
    FormDefaults, FormDefinition, FormElement, FormFactory, FormSettings, Implementations,
    OptionsFinisher, Renderable, SupertypeResolver, TypeRegistry,
};
use serde_json::{json, Value};
use tracing::debug;

/// Registry with the built-in implementations plus an [`OptionsFinisher`]
/// for every finisher implementation the preset names.
///
/// Built forms are only inspected, so finishers never need to run.
pub fn inspection_implementations(defaults: &FormDefaults) -> Implementations {
    let mut implementations = Implementations::default();
    for preset in defaults.finisher_presets.values() {
        if let Some(name) = preset.get("implementation").and_then(Value::as_str) {
            if !implementations.has_finisher(name) {
                debug!(implementation = name, "registering inspection finisher");
                implementations = implementations.with_finisher(name, OptionsFinisher::construct);
            }
        }
    }
    implementations
}

/// Read a YAML or JSON form document.
pub fn read_document(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read form document {}", path.display()))?;
    let document = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&text)
            .with_context(|| format!("invalid JSON in {}", path.display()))?,
        _ => serde_yaml_ng::from_str(&text)
            .with_context(|| format!("invalid YAML in {}", path.display()))?,
    };
    Ok(document)
}

pub fn run_build(settings: &FormSettings, preset: &str, form: &Path, as_json: bool) -> Result<String> {
    let defaults = settings.preset(preset)?;
    let implementations = inspection_implementations(&defaults);
    let document = read_document(form)?;
    let factory = FormFactory::new(settings.clone(), Rc::new(implementations));
    let definition = factory.build(&document, preset)?;

    if as_json {
        Ok(serde_json::to_string_pretty(&summarize(&definition))?)
    } else {
        Ok(render_tree(&definition))
    }
}

pub fn run_type(settings: &FormSettings, preset: &str, type_name: &str) -> Result<String> {
    let defaults = settings.preset(preset)?;
    let resolver = SupertypeResolver::new(TypeRegistry::from_types(defaults.form_element_types));
    let merged = resolver.merged_type_definition(type_name)?;
    let chain = resolver.supertypes(type_name)?;

    let mut out = format!("# {}\n", chain.join(" < "));
    out.push_str(&serde_yaml_ng::to_string(&merged)?);
    Ok(out)
}

pub fn run_presets(settings: &FormSettings) -> String {
    let mut out = String::new();
    for name in settings.preset_names() {
        let _ = writeln!(out, "{name}");
    }
    out
}

fn render_tree(definition: &FormDefinition) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} ({}){}",
        definition.identifier(),
        definition.type_name(),
        label_suffix(&definition.label())
    );
    for page in definition.pages() {
        let _ = writeln!(
            out,
            "  {} [{}] ({}){}",
            page.identifier(),
            page.index().unwrap_or_default(),
            page.type_name(),
            label_suffix(&page.label())
        );
        for element in page.elements() {
            render_element(&mut out, &element, 2);
        }
    }
    for finisher in definition.finishers() {
        let _ = writeln!(out, "  finisher {}", finisher.implementation());
    }
    out
}

fn render_element(out: &mut String, element: &FormElement, depth: usize) {
    let _ = writeln!(
        out,
        "{}{} [{}] ({}){}",
        "  ".repeat(depth),
        element.identifier(),
        element.index().unwrap_or_default(),
        element.type_name(),
        label_suffix(&element.label())
    );
    for child in element.elements() {
        render_element(out, &child, depth + 1);
    }
}

fn label_suffix(label: &str) -> String {
    if label.is_empty() {
        String::new()
    } else {
        format!(" \"{label}\"")
    }
}

fn summarize(definition: &FormDefinition) -> Value {
    let rules: serde_json::Map<String, Value> = definition
        .processing_rules()
        .into_iter()
        .map(|(path, rule)| {
            (
                path,
                json!({
                    "dataType": rule.data_type(),
                    "validators": rule.validators(),
                }),
            )
        })
        .collect();

    let pages: Vec<Value> = definition
        .pages()
        .iter()
        .map(|page| {
            json!({
                "identifier": page.identifier(),
                "type": page.type_name(),
                "label": page.label(),
                "elements": page.elements().iter().map(summarize_element).collect::<Vec<_>>(),
            })
        })
        .collect();
    let finishers: Vec<Value> = definition
        .finishers()
        .iter()
        .map(|finisher| {
            json!({
                "implementation": finisher.implementation(),
                "options": finisher.options(),
            })
        })
        .collect();

    json!({
        "identifier": definition.identifier(),
        "type": definition.type_name(),
        "label": definition.label(),
        "pages": pages,
        "finishers": finishers,
        "processingRules": rules,
    })
}

fn summarize_element(element: &FormElement) -> Value {
    json!({
        "identifier": element.identifier(),
        "type": element.type_name(),
        "implementation": element.implementation(),
        "label": element.label(),
        "properties": element.properties(),
        "defaultValue": element.default_value(),
        "elements": element.elements().iter().map(summarize_element).collect::<Vec<_>>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    const SETTINGS: &str = r#"
presets:
  default:
    formElementTypes:
      Formkit.Core:Form: {}
      Formkit.Core:Page:
        implementation: Page
      Formkit.Core:Section:
        implementation: Section
      Formkit.Core:SingleLineText:
        implementation: GenericFormElement
        properties:
          placeholder: ""
    finisherPresets:
      confirmation:
        implementation: Confirmation
        options:
          message: Thanks
    validatorPresets:
      NotEmpty:
        implementation: NotEmptyValidator
  contact:
    parentPreset: default
"#;

    const FORM: &str = r#"
identifier: contact
label: Contact
finishers:
  - identifier: confirmation
renderables:
  - identifier: page1
    label: Step 1
    renderables:
      - identifier: person
        type: Formkit.Core:Section
        renderables:
          - identifier: name
            type: Formkit.Core:SingleLineText
            label: Name
            validators:
              - identifier: NotEmpty
"#;

    fn fixture() -> (TempDir, FormSettings) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("forms.yaml");
        fs::write(&path, SETTINGS).unwrap();
        fs::write(dir.path().join("contact.yaml"), FORM).unwrap();
        let settings = FormSettings::load(&[path]).unwrap();
        (dir, settings)
    }

    #[test]
    #[serial]
    fn test_build_renders_tree() {
        let (dir, settings) = fixture();
        let out = run_build(&settings, "default", &dir.path().join("contact.yaml"), false).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                "contact (Formkit.Core:Form) \"Contact\"",
                "  page1 [0] (Formkit.Core:Page) \"Step 1\"",
                "    person [0] (Formkit.Core:Section)",
                "      name [0] (Formkit.Core:SingleLineText) \"Name\"",
                "  finisher Confirmation",
            ]
        );
    }

    #[test]
    #[serial]
    fn test_build_json_summary() {
        let (dir, settings) = fixture();
        let out = run_build(&settings, "contact", &dir.path().join("contact.yaml"), true).unwrap();
        let summary: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(summary["identifier"], json!("contact"));
        assert_eq!(
            summary["pages"][0]["elements"][0]["elements"][0]["properties"],
            json!({"placeholder": ""})
        );
        assert_eq!(
            summary["finishers"][0]["options"],
            json!({"message": "Thanks"})
        );
        assert_eq!(
            summary["processingRules"]["name"]["validators"][0]["implementation"],
            json!("NotEmptyValidator")
        );
    }

    #[test]
    #[serial]
    fn test_type_prints_merged_definition() {
        let (_dir, settings) = fixture();
        let out = run_type(&settings, "default", "Formkit.Core:SingleLineText").unwrap();
        assert!(out.starts_with("# Formkit.Core:SingleLineText\n"));
        assert!(out.contains("implementation: GenericFormElement"));

        let err = run_type(&settings, "default", "Acme:Missing").unwrap_err();
        assert!(err.to_string().contains("Acme:Missing"));
    }

    #[test]
    #[serial]
    fn test_presets_lists_names() {
        let (_dir, settings) = fixture();
        let out = run_presets(&settings);
        assert!(out.lines().any(|line| line == "default"));
        assert!(out.lines().any(|line| line == "contact"));
    }

    #[test]
    fn test_inspection_implementations_cover_presets() {
        let defaults: FormDefaults = serde_json::from_value(json!({
            "finisherPresets": {
                "email": {"implementation": "Email"},
                "broken": {"options": {}}
            }
        }))
        .unwrap();
        let implementations = inspection_implementations(&defaults);
        assert!(implementations.has_finisher("Email"));
        assert!(implementations.page("Page").is_some());
    }

    #[test]
    fn test_missing_document_is_reported() {
        let dir = TempDir::new().unwrap();
        let err = read_document(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(err.to_string().contains("missing.yaml"));
    }
}
