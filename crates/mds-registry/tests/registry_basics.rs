use mds_registry::{gather_datasets, Dataset, DatasetRegistry, Description};

struct FixedDataset {
    ids: Vec<String>,
}

impl Dataset for FixedDataset {
    fn ids(&self) -> Vec<String> {
        self.ids.clone()
    }
}

fn fixed(count: usize) -> impl Fn() -> Box<dyn Dataset> {
    move || {
        Box::new(FixedDataset {
            ids: (0..count).map(|i| format!("case_{i}")).collect(),
        })
    }
}

#[test]
fn duplicate_names_are_fatal() {
    let mut registry = DatasetRegistry::new();
    registry
        .register("LiverCT", "liver", Description::default(), fixed(3))
        .expect("first registration");
    let err = registry
        .register("LiverCT", "liver_v2", Description::default(), fixed(5))
        .unwrap_err();
    assert_eq!(err.info().code, "mds_registry.duplicate");
    assert_eq!(registry.len(), 1);
}

#[test]
fn entries_enumerate_in_name_order() {
    let mut registry = DatasetRegistry::new();
    for name in ["Spleen", "Amos", "LiverCT"] {
        registry
            .register(name, "modules", Description::default(), fixed(1))
            .expect("register");
    }
    let names: Vec<&str> = registry.entries().map(|(name, _)| name).collect();
    assert_eq!(names, ["Amos", "LiverCT", "Spleen"]);
}

#[test]
fn gather_runs_hooks_and_stops_on_failure() {
    fn chest(registry: &mut DatasetRegistry) -> Result<(), mds_core::MdsError> {
        registry.register("ChestXR", "chest", Description::default(), fixed(2))
    }
    fn clashing(registry: &mut DatasetRegistry) -> Result<(), mds_core::MdsError> {
        registry.register("ChestXR", "chest_alt", Description::default(), fixed(2))
    }

    let registry = gather_datasets(&[chest]).expect("gather");
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.get("ChestXR").expect("entry").module(), "chest");

    let err = gather_datasets(&[chest, clashing]).unwrap_err();
    assert_eq!(err.info().code, "mds_registry.duplicate");
}

#[test]
fn registry_debug_renders_entries_without_factories() {
    let mut registry = DatasetRegistry::new();
    registry
        .register(
            "LiverCT",
            "liver",
            Description::default().with_modality("CT"),
            fixed(1),
        )
        .expect("register");
    // `unwrap_err` on gather results needs this rendering; factories are elided.
    let rendered = format!("{registry:?}");
    assert!(rendered.contains("LiverCT"));
    assert!(rendered.contains("liver"));
    assert!(rendered.contains(".."));
}

#[test]
fn entry_exposes_factory_and_metadata() {
    let mut registry = DatasetRegistry::new();
    let description = Description::default().with_modality("CT");
    registry
        .register("LiverCT", "liver", description, fixed(4))
        .expect("register");
    let entry = registry.get("LiverCT").expect("entry");
    assert_eq!(entry.instantiate().ids().len(), 4);
    assert_eq!(
        entry.description().modality.as_ref().map(|m| m.display()),
        Some("CT".to_string())
    );
}
