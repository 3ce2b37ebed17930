//! Integration tests for rule loading, resolution and pipelines

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use tempfile::TempDir;
use tts_preprocessor::{
    apply, parse_delimited, parse_mapping, process_file, register_builtins, DelimitedOptions,
    DirectiveError, DirectiveRef, DirectiveRegistry, Operation, OutputNameFormat, PatternKind,
    Pipeline, Resolver, RowDefaults, Transformation,
};

fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

fn data_dir() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    write_file(
        temp_dir.path(),
        "default_txt.txt",
        "e.g.\tfor example\t1\n\\s+\t \t0\n",
    );
    write_file(
        temp_dir.path(),
        "markup/default_html.yaml",
        r#"
options:
  type: 0
substitutions:
  - ["<br\\s*/?>", " "]
  - ["<[^>]+>", ""]
  - ["&amp;", "and", 1]
"#,
    );
    write_file(
        temp_dir.path(),
        "units.json",
        r#"{"options": {"type": 1}, "substitutions": {"cm": "centimeters", "km": "kilometers"}}"#,
    );
    write_file(temp_dir.path(), "_scratch.txt", "x\ty\n");
    temp_dir
}

#[test]
fn test_end_to_end_rule_file() {
    let temp_dir = data_dir();
    let registry = DirectiveRegistry::from_dir(temp_dir.path()).unwrap();
    let mut resolver = Resolver::new(registry);

    let transform = resolver.resolve(&"default_txt".into()).unwrap();
    assert_eq!(
        transform.transform("Use e.g.   this.").unwrap(),
        "Use for example this."
    );
}

#[test]
fn test_discovery_registers_names_and_paths() {
    let temp_dir = data_dir();
    let registry = DirectiveRegistry::from_dir(temp_dir.path()).unwrap();

    assert!(registry.contains("default_txt"));
    assert!(registry.contains("default_html"));
    assert!(registry.contains("units"));
    assert!(!registry.contains("_scratch"));

    let html_path = temp_dir.path().join("markup/default_html.yaml");
    assert!(registry.contains(&html_path.to_string_lossy()));
}

#[test]
fn test_order_sensitivity() {
    let op_a = Operation::literal("cm", "centimeters").unwrap();
    let op_b = Operation::literal("centi", "one-hundredth").unwrap();

    assert_eq!(apply("5 cm", &[op_a.clone(), op_b.clone()]).unwrap(), "5 one-hundredthmeters");
    assert_eq!(apply("5 cm", &[op_b, op_a]).unwrap(), "5 centimeters");
}

#[test]
fn test_literal_versus_regex_kind() {
    let literal = Operation::new(".", "X", PatternKind::Literal, None).unwrap();
    let regex = Operation::new(".", "X", PatternKind::Regex, None).unwrap();

    assert_eq!(apply("a.b.c", &[literal]).unwrap(), "aXbXc");
    assert_eq!(apply("abc", &[regex]).unwrap(), "XXX");
}

#[test]
fn test_mapping_input_equivalence() {
    let mut map = IndexMap::new();
    map.insert("foo".to_string(), serde_yaml::Value::String("bar".to_string()));

    let from_mapping = parse_mapping(&map, "mapping", &RowDefaults::default()).unwrap();
    let from_row = parse_delimited("foo\tbar", "rows", &DelimitedOptions::default())
        .unwrap()
        .operations;

    assert_eq!(from_mapping, from_row);
}

#[test]
fn test_rule_file_with_look_around_and_anchors() {
    let text = "# {type: 0}\n(?<=\\d)cm\\b\t centimeters\n\\b(\\w+) \\1\\b\t\\1\n\\s+\\Z\t\n";
    let parsed = parse_delimited(text, "units", &DelimitedOptions::default()).unwrap();
    assert_eq!(parsed.operations.len(), 3);

    let output = apply("a 5cm cm stick stick  \n", &parsed.operations).unwrap();
    assert_eq!(output, "a 5 centimeters cm stick");
}

#[test]
fn test_registry_idempotence() {
    let temp_dir = data_dir();
    let mut resolver = Resolver::new(DirectiveRegistry::from_dir(temp_dir.path()).unwrap());

    let first = resolver.resolve(&"units".into()).unwrap();
    let second = resolver.resolve(&"units".into()).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    let text = "3 km and 40 cm";
    assert_eq!(first.transform(text).unwrap(), second.transform(text).unwrap());
    assert_eq!(first.transform(text).unwrap(), "3 kilometers and 40 centimeters");
}

#[test]
fn test_composition_law() {
    let temp_dir = data_dir();
    let mut resolver = Resolver::new(DirectiveRegistry::from_dir(temp_dir.path()).unwrap());
    let text = "<p>Walk 5 km,<br/>e.g.  to the   lake &amp; back</p>";

    let sequential = Pipeline::build(&mut resolver, ["default_html", "default_txt"]).unwrap();

    let registry = resolver.registry();
    let concatenated: Vec<Operation> = ["default_html", "default_txt"]
        .iter()
        .flat_map(|name| registry.get(name).unwrap().operations().unwrap().to_vec())
        .collect();
    let once = resolver.resolve(&DirectiveRef::from(concatenated)).unwrap();

    let expected = "Walk 5 km, for example to the lake and back";
    assert_eq!(sequential.run(text).unwrap(), expected);
    assert_eq!(once.transform(text).unwrap(), expected);
}

#[test]
fn test_lazy_file_reference_and_function_directive() {
    let temp_dir = TempDir::new().unwrap();
    let rules = write_file(temp_dir.path(), "greek.txt", "# {type: 1}\nα\talpha\nβ\tbeta\n");

    let mut registry = DirectiveRegistry::new();
    registry.register_function("latex_to_text", |text: &str| -> tts_preprocessor::Result<String> {
        Ok(text.replace("\\alpha", "α").replace("\\beta", "β"))
    });
    let mut resolver = Resolver::new(registry);

    let references = vec![
        DirectiveRef::from("latex_to_text"),
        DirectiveRef::from(rules.to_string_lossy().into_owned()),
    ];
    let pipeline = Pipeline::build(&mut resolver, references).unwrap();

    assert_eq!(pipeline.run("\\alpha and \\beta decay").unwrap(), "alpha and beta decay");
    assert!(resolver.registry().contains("greek"));
}

#[test]
fn test_builtin_latex_directive_then_rule_file() {
    let temp_dir = TempDir::new().unwrap();
    write_file(temp_dir.path(), "units.txt", "# {type: 1}\nkg\tkilograms\n");

    let mut registry = DirectiveRegistry::new();
    register_builtins(&mut registry);
    registry.discover(temp_dir.path()).unwrap();
    let mut resolver = Resolver::new(registry);

    let pipeline = Pipeline::build(&mut resolver, ["pylatexenc", "units"]).unwrap();
    let text = pipeline.run("\\section{Mass}About \\SI{5}{kg}.").unwrap();
    assert_eq!(text, "\nSection: Mass\nAbout 5 kilograms.");

    let err = pipeline.run("\\emph{open").unwrap_err();
    match err {
        DirectiveError::Stage { directive, source } => {
            assert_eq!(directive, "pylatexenc");
            assert!(matches!(*source, DirectiveError::Transform { .. }));
        }
        other => panic!("expected stage error, got {:?}", other),
    }
}

#[test]
fn test_unknown_directive_is_reported() {
    let mut resolver = Resolver::new(DirectiveRegistry::new());
    match Pipeline::build(&mut resolver, ["default_rtf"]) {
        Err(DirectiveError::UnknownDirective(name)) => assert_eq!(name, "default_rtf"),
        other => panic!("expected unknown directive, got {:?}", other),
    }
}

#[test]
fn test_bad_rule_file_names_file_and_row() {
    let temp_dir = TempDir::new().unwrap();
    write_file(temp_dir.path(), "broken.txt", "ok\tfine\n\n([a-z]\tx\t0\n");

    let err = DirectiveRegistry::from_dir(temp_dir.path()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("([a-z]"));
    assert!(message.contains("broken.txt"));
    assert!(message.contains("row 3"));
}

#[test]
fn test_process_file_with_pipeline() {
    let temp_dir = data_dir();
    let input = write_file(temp_dir.path(), "input/page.html", "<h1>Hi</h1><p>salt &amp; pepper</p>");

    let mut resolver = Resolver::new(DirectiveRegistry::from_dir(temp_dir.path().join("markup")).unwrap());
    let pipeline = Pipeline::build(
        &mut resolver,
        tts_preprocessor::default_directives_for(&input),
    )
    .unwrap();

    let output = process_file(&input, &pipeline, &OutputNameFormat::default()).unwrap();
    assert_eq!(output, temp_dir.path().join("input/page.out.html"));
    assert_eq!(fs::read_to_string(output).unwrap(), "Hisalt and pepper");
}
