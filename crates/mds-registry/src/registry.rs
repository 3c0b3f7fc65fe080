use std::collections::BTreeMap;
use std::fmt;

use mds_core::{ErrorInfo, MdsError};

use crate::description::Description;

/// A loadable dataset: the only capability the registry needs is the
/// collection of entry identifiers.
pub trait Dataset {
    /// Identifiers of the dataset's entries.
    fn ids(&self) -> Vec<String>;
}

/// Constructs a dataset instance on demand.
pub type DatasetFactory = Box<dyn Fn() -> Box<dyn Dataset>>;

/// One registered dataset: its factory, declaring module, and metadata.
pub struct RegistryEntry {
    factory: DatasetFactory,
    module: String,
    description: Description,
}

impl RegistryEntry {
    /// Instantiates the dataset.
    pub fn instantiate(&self) -> Box<dyn Dataset> {
        (self.factory)()
    }

    /// Module the dataset was declared in.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Metadata attached at registration time.
    pub fn description(&self) -> &Description {
        &self.description
    }
}

// The factory closure has no useful rendering, so it is elided.
impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("module", &self.module)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Explicit dataset registry keyed by dataset name.
///
/// Registries are plain values so tests can build isolated ones; names are
/// unique and enumeration is always name-ascending.
#[derive(Default)]
pub struct DatasetRegistry {
    entries: BTreeMap<String, RegistryEntry>,
}

impl DatasetRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a dataset under `name`.
    ///
    /// A duplicate name is a programming error in the dataset definitions
    /// and aborts registration.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        module: impl Into<String>,
        description: Description,
        factory: impl Fn() -> Box<dyn Dataset> + 'static,
    ) -> Result<(), MdsError> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(MdsError::Registry(
                ErrorInfo::new("mds_registry.duplicate", "dataset name already registered")
                    .with_context("name", name),
            ));
        }
        self.entries.insert(
            name,
            RegistryEntry {
                factory: Box::new(factory),
                module: module.into(),
                description,
            },
        );
        Ok(())
    }

    /// Number of registered datasets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up a dataset by name.
    pub fn get(&self, name: &str) -> Option<&RegistryEntry> {
        self.entries.get(name)
    }

    /// Entries in ascending name order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &RegistryEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }
}

impl fmt::Debug for DatasetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}
