use std::fs;

use mds_registry::{scan_manifests, summary_table, DatasetRegistry};
use tempfile::tempdir;

#[test]
fn manifests_register_datasets_with_metadata() {
    let dir = tempdir().expect("tempdir");
    fs::write(
        dir.path().join("liver_ct.json"),
        r#"{
            "name": "LiverCT",
            "description": {"modality": "CT", "task": ["seg"]},
            "ids": ["case_0", "case_1", "case_2"]
        }"#,
    )
    .expect("write manifest");
    fs::write(
        dir.path().join("amos.json"),
        r#"{"name": "Amos", "module": "amos_mr", "ids": ["a"]}"#,
    )
    .expect("write manifest");
    // Non-manifest files are skipped.
    fs::write(dir.path().join("readme.txt"), "notes").expect("write readme");

    let mut registry = DatasetRegistry::new();
    let registered = scan_manifests(dir.path(), &mut registry).expect("scan");
    assert_eq!(registered, 2);

    let liver = registry.get("LiverCT").expect("entry");
    assert_eq!(liver.module(), "liver_ct");
    assert_eq!(liver.instantiate().ids().len(), 3);
    let amos = registry.get("Amos").expect("entry");
    assert_eq!(amos.module(), "amos_mr");

    let table = summary_table(&registry);
    assert_eq!(table.columns, ["name", "entries", "modality", "task"]);
}

#[test]
fn unknown_description_fields_abort_the_scan() {
    let dir = tempdir().expect("tempdir");
    fs::write(
        dir.path().join("typo.json"),
        r#"{"name": "Typo", "description": {"licence": "CC-BY"}, "ids": []}"#,
    )
    .expect("write manifest");

    let mut registry = DatasetRegistry::new();
    let err = scan_manifests(dir.path(), &mut registry).unwrap_err();
    assert_eq!(err.info().code, "mds_registry.manifest_parse");
    assert!(registry.is_empty());
}

#[test]
fn duplicate_manifest_names_abort_the_scan() {
    let dir = tempdir().expect("tempdir");
    for file in ["first.json", "second.json"] {
        fs::write(
            dir.path().join(file),
            r#"{"name": "LiverCT", "ids": ["x"]}"#,
        )
        .expect("write manifest");
    }

    let mut registry = DatasetRegistry::new();
    let err = scan_manifests(dir.path(), &mut registry).unwrap_err();
    assert_eq!(err.info().code, "mds_registry.duplicate");
}
