mod common;

use std::cell::Cell;
use std::path::PathBuf;
use std::sync::Arc;

use bundler_engine::status::{BundleStatus, BundlerStage, StatusCache};
use common::defaults;

fn status(stage: BundlerStage) -> BundleStatus {
    BundleStatus::build(&[], &defaults(), 0, 0, PathBuf::from("/tmp/bundle.tar.gz"), stage)
}

#[test]
fn same_version_reuses_snapshot() {
    let mut cache = StatusCache::default();
    let computed = Cell::new(0);

    let first = cache.get_or_compute((1, 0), || {
        computed.set(computed.get() + 1);
        status(BundlerStage::Execution)
    });
    let second = cache.get_or_compute((1, 0), || {
        computed.set(computed.get() + 1);
        status(BundlerStage::Execution)
    });

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(computed.get(), 1);
}

#[test]
fn new_version_recomputes() {
    let mut cache = StatusCache::default();

    let first = cache.get_or_compute((1, 0), || status(BundlerStage::Execution));
    let bumped = cache.get_or_compute((1, 1), || status(BundlerStage::Archive));
    let provider_bumped = cache.get_or_compute((2, 1), || status(BundlerStage::Checksum));

    assert!(!Arc::ptr_eq(&first, &bumped));
    assert!(!Arc::ptr_eq(&bumped, &provider_bumped));
    assert_eq!(bumped.stage, BundlerStage::Archive);
    assert_eq!(provider_bumped.stage, BundlerStage::Checksum);
    assert!(provider_bumped.all_tasks_completed);
}
