//! Domain resource loading against on-disk layouts.

use kgforge::Error;
use kgforge::domains::{ExtractionMode, KnowledgeDomain, get_domain, list_domains};
use kgforge::models::ExampleRecord;
use std::path::Path;

fn write_domain(root: &Path) {
    let extraction = root.join("extraction");
    std::fs::create_dir_all(&extraction).unwrap();
    std::fs::write(
        extraction.join("prompt_open.txt"),
        "Open prompt.\n{{record_json}}",
    )
    .unwrap();
    std::fs::write(
        extraction.join("prompt_constrained.txt"),
        "Constrained prompt.\n{{record_json}}",
    )
    .unwrap();
    std::fs::write(
        extraction.join("examples.json"),
        r#"[{"text": "A works at B.", "extractions": [
            {"extraction_text": "A works at B", "char_start": 0, "char_end": 12,
             "attributes": {"head": "A", "relation": "works_at", "tail": "B"}}
        ]}]"#,
    )
    .unwrap();

    let connectivity = root.join("augmentation").join("connectivity");
    std::fs::create_dir_all(&connectivity).unwrap();
    std::fs::write(connectivity.join("prompt.txt"), "Bridge the components.").unwrap();
    // Both exemplar shapes in the same file.
    std::fs::write(
        connectivity.join("examples.json"),
        r#"[
            {"text": "t", "extractions": []},
            {"input": {"text": "t", "components": [{"entities": ["A"]}]},
             "output": [{"head": "A", "relation": "r", "tail": "B", "inference": "contextual"}]}
        ]"#,
    )
    .unwrap();

    std::fs::write(
        root.join("schema.json"),
        r#"{"entity_types": ["person"], "relation_types": ["works_at"]}"#,
    )
    .unwrap();
}

#[test]
fn full_layout_loads() {
    let dir = tempfile::tempdir().unwrap();
    write_domain(dir.path());

    let domain = KnowledgeDomain::from_dir("custom", dir.path(), ExtractionMode::Open).unwrap();
    assert_eq!(domain.extraction().prompt().unwrap(), "Open prompt.\n{{record_json}}");
    assert_eq!(domain.extraction().examples().unwrap().len(), 1);
    assert_eq!(domain.augmentation_strategies(), vec!["connectivity"]);

    let schema = domain.schema().unwrap();
    assert_eq!(schema.entity_types, vec!["person"]);
}

#[test]
fn mode_selects_prompt_file() {
    let dir = tempfile::tempdir().unwrap();
    write_domain(dir.path());

    let constrained =
        KnowledgeDomain::from_dir("custom", dir.path(), ExtractionMode::Constrained).unwrap();
    assert!(
        constrained
            .extraction()
            .prompt()
            .unwrap()
            .starts_with("Constrained prompt.")
    );
}

#[test]
fn dual_exemplar_shapes_accepted() {
    let dir = tempfile::tempdir().unwrap();
    write_domain(dir.path());

    let domain = KnowledgeDomain::from_dir("custom", dir.path(), ExtractionMode::Open).unwrap();
    let examples = domain.augmentation("connectivity").unwrap().examples().unwrap();

    assert_eq!(examples.len(), 2);
    assert!(matches!(examples[0], ExampleRecord::Extraction(_)));
    assert!(matches!(examples[1], ExampleRecord::Augmentation(_)));
}

#[test]
fn examples_cached_after_first_access() {
    let dir = tempfile::tempdir().unwrap();
    write_domain(dir.path());

    let domain = KnowledgeDomain::from_dir("custom", dir.path(), ExtractionMode::Open).unwrap();
    let first = domain.extraction().examples().unwrap().len();

    // Deleting the file after the first load must not matter.
    std::fs::remove_file(dir.path().join("extraction").join("examples.json")).unwrap();
    let second = domain.extraction().examples().unwrap().len();
    assert_eq!(first, second);
}

#[test]
fn missing_prompt_is_resource_not_found() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("extraction")).unwrap();

    let domain = KnowledgeDomain::from_dir("bare", dir.path(), ExtractionMode::Open).unwrap();
    let err = domain.extraction().prompt().unwrap_err();
    match err {
        Error::ResourceNotFound { path } => {
            assert!(path.ends_with("prompt_open.txt"));
        },
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn malformed_examples_is_invalid_resource() {
    let dir = tempfile::tempdir().unwrap();
    write_domain(dir.path());
    std::fs::write(
        dir.path().join("extraction").join("examples.json"),
        "{ not json",
    )
    .unwrap();

    let domain = KnowledgeDomain::from_dir("broken", dir.path(), ExtractionMode::Open).unwrap();
    let err = domain.extraction().examples().unwrap_err();
    assert!(matches!(err, Error::InvalidResource { .. }));
}

#[test]
fn builtin_domains_resolve() {
    let names = list_domains();
    assert!(names.contains(&"default".to_string()));
    assert!(names.contains(&"legal".to_string()));

    let legal = get_domain("legal", ExtractionMode::Constrained).unwrap();
    assert!(!legal.schema().unwrap().is_empty());
    assert!(!legal.extraction().examples().unwrap().is_empty());
}

#[test]
fn unknown_domain_reports_available() {
    let err = get_domain("finance", ExtractionMode::Open).unwrap_err();
    match err {
        Error::UnknownDomain { name, available } => {
            assert_eq!(name, "finance");
            assert!(available.contains("default"));
        },
        other => panic!("unexpected error: {other}"),
    }
}
