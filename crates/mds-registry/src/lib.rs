//! Dataset registry and summary-table utilities for the MDS collection.

mod description;
mod discover;
mod registry;
mod table;

pub use description::{Description, MetaValue};
pub use discover::{gather_datasets, scan_manifests, RegistrationHook};
pub use registry::{Dataset, DatasetFactory, DatasetRegistry, RegistryEntry};
pub use table::{build_table_record, export_csv, summary_table, Table};
