use std::cell::Cell;
use std::fs;
use std::path::Path;

use mds_cache::{DiskCache, Repository, CONFIG_FILE};
use mds_core::{CacheValue, TensorData, TensorValue};
use tempfile::tempdir;

fn write_config(root: &Path, local: &str, remote: Option<&str>) {
    let mut text = format!("cache:\n  local:\n    - {local}\n");
    if let Some(remote) = remote {
        text.push_str(&format!("  remote:\n    - {remote}\n"));
    }
    fs::write(root.join(CONFIG_FILE), text).expect("write config");
}

fn sample_value() -> CacheValue {
    let tensor = TensorValue::new(vec![2, 2], TensorData::I64(vec![3, 1, 4, 1])).expect("tensor");
    CacheValue::Tensor(tensor)
}

#[test]
fn store_then_load_round_trips() {
    let root = tempdir().expect("root");
    write_config(root.path(), "cache", None);
    let repo = Repository::from_root(root.path()).expect("repo");
    let cache = DiskCache::new(&repo, ["series_uid"], None, false);

    let value = sample_value();
    let fingerprint = cache.fingerprint(&"1.2.840.1").expect("fingerprint");
    let entry = cache.store(&fingerprint, &value).expect("store");
    assert!(entry.starts_with(root.path().join("cache")));
    assert_eq!(cache.load(&fingerprint).expect("load"), value);
}

#[test]
fn fingerprints_are_stable_and_name_sensitive() {
    let root = tempdir().expect("root");
    write_config(root.path(), "cache", None);
    let repo = Repository::from_root(root.path()).expect("repo");
    let by_uid = DiskCache::new(&repo, ["series_uid"], None, false);
    let by_path = DiskCache::new(&repo, ["path"], None, false);

    let first = by_uid.fingerprint(&"1.2.840.1").expect("fingerprint");
    let second = by_uid.fingerprint(&"1.2.840.1").expect("fingerprint");
    assert_eq!(first, second);
    assert_ne!(first, by_path.fingerprint(&"1.2.840.1").expect("fingerprint"));
}

#[test]
fn storing_the_same_entry_twice_fails() {
    let root = tempdir().expect("root");
    write_config(root.path(), "cache", None);
    let repo = Repository::from_root(root.path()).expect("repo");
    let cache = DiskCache::new(&repo, ["series_uid"], None, false);

    let fingerprint = cache.fingerprint(&"dup").expect("fingerprint");
    cache.store(&fingerprint, &sample_value()).expect("store");
    let err = cache.store(&fingerprint, &sample_value()).unwrap_err();
    assert_eq!(err.info().code, "mds_cache.entry_exists");
}

#[test]
fn damaged_entries_surface_as_corrupt_on_load() {
    let root = tempdir().expect("root");
    write_config(root.path(), "cache", None);
    let repo = Repository::from_root(root.path()).expect("repo");
    let cache = DiskCache::new(&repo, ["series_uid"], None, false);

    let fingerprint = cache.fingerprint(&"1.2.840.3").expect("fingerprint");
    let entry = cache.store(&fingerprint, &sample_value()).expect("store");
    // A stray file makes the folder unrecognisable to every layout.
    fs::write(entry.join("stray.txt"), b"not a cache file").expect("damage entry");

    let err = cache.load(&fingerprint).unwrap_err();
    assert_eq!(err.info().code, "mds_cache.entry_corrupt");
}

#[test]
fn get_or_compute_caches_the_first_result() {
    let root = tempdir().expect("root");
    write_config(root.path(), "cache", None);
    let repo = Repository::from_root(root.path()).expect("repo");
    let cache = DiskCache::new(&repo, ["series_uid"], None, false);

    let calls = Cell::new(0u32);
    let compute = || {
        calls.set(calls.get() + 1);
        Ok(sample_value())
    };
    let first = cache.get_or_compute(&"1.2.840.7", compute).expect("miss");
    let second = cache
        .get_or_compute(&"1.2.840.7", || unreachable!("must hit the cache"))
        .expect("hit");
    assert_eq!(calls.get(), 1);
    assert_eq!(first, second);
}

#[test]
fn remote_entries_are_fetched_only_when_enabled() {
    let remote_root = tempdir().expect("remote root");
    write_config(remote_root.path(), "cache", None);
    let remote_repo = Repository::from_root(remote_root.path()).expect("remote repo");
    let remote_cache = DiskCache::new(&remote_repo, ["series_uid"], None, false);
    let fingerprint = remote_cache.fingerprint(&"1.2.840.9").expect("fingerprint");
    remote_cache
        .store(&fingerprint, &sample_value())
        .expect("seed remote");

    let local_root = tempdir().expect("local root");
    let remote_cache_dir = remote_root.path().join("cache");
    write_config(
        local_root.path(),
        "cache",
        Some(remote_cache_dir.to_str().expect("utf-8 path")),
    );
    let repo = Repository::from_root(local_root.path()).expect("repo");

    let offline = DiskCache::new(&repo, ["series_uid"], None, false);
    let err = offline.load(&fingerprint).unwrap_err();
    assert_eq!(err.info().code, "mds_cache.entry_missing");

    let fetching = DiskCache::new(&repo, ["series_uid"], None, true);
    assert_eq!(fetching.load(&fingerprint).expect("fetch"), sample_value());
    // The entry was copied into the local tier on the way through.
    assert!(local_root
        .path()
        .join("cache")
        .join(&fingerprint[..2])
        .is_dir());
}

#[test]
fn missing_config_is_a_storage_error() {
    let root = tempdir().expect("root");
    let err = Repository::from_root(root.path()).unwrap_err();
    assert_eq!(err.info().code, "mds_cache.repo_config");
}
