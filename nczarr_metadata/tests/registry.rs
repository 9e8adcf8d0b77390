#![allow(missing_docs)]

use std::error::Error;

use serial_test::serial;

use nczarr_metadata::{
    ConsolidatedMetadataHandler, Metadata, MetadataError, MetadataHandlerKind,
    MetadataHandlerPlugin,
};
use nczarr_storage::map::MemoryMap;

#[test]
#[serial]
fn not_initialized() {
    nczarr_metadata::initialize();
    nczarr_metadata::finalize();
    assert!(!nczarr_metadata::is_initialized());
    let map = MemoryMap::new();
    let mut metadata = Metadata::new();
    assert!(matches!(
        metadata.set_metadata_handler(&map),
        Err(MetadataError::NotInitialized)
    ));
    assert!(matches!(
        metadata.select_metadata_handler(MetadataHandlerKind::PerKey),
        Err(MetadataError::NotInitialized)
    ));
}

#[test]
#[serial]
fn finalize_without_initialize() {
    testing_logger::setup();
    nczarr_metadata::initialize();
    nczarr_metadata::finalize();
    nczarr_metadata::finalize();
    testing_logger::validate(|captured_logs| {
        let warnings: Vec<_> = captured_logs
            .iter()
            .filter(|log| log.level == log::Level::Warn)
            .collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(
            warnings[0].body,
            "metadata handler registry finalized without being initialized"
        );
    });
}

#[test]
#[serial]
fn registered_plugin_precedence() -> Result<(), Box<dyn Error>> {
    nczarr_metadata::initialize();
    let handle = nczarr_metadata::register_metadata_handler(MetadataHandlerPlugin::new(
        "custom",
        |map| Ok(map.path().is_empty()),
        || Box::new(ConsolidatedMetadataHandler::new()),
    ));
    assert_eq!(handle.identifier(), "custom");

    // an anonymous map without .zmetadata
    let map = MemoryMap::new();
    let mut metadata = Metadata::new();
    assert_eq!(
        metadata.set_metadata_handler(&map)?,
        MetadataHandlerKind::Consolidated
    );

    assert!(nczarr_metadata::unregister_metadata_handler(&handle));
    assert!(!nczarr_metadata::unregister_metadata_handler(&handle));
    let mut metadata = Metadata::new();
    assert_eq!(
        metadata.set_metadata_handler(&map)?,
        MetadataHandlerKind::PerKey
    );
    nczarr_metadata::finalize();
    Ok(())
}

#[test]
#[serial]
fn concurrent_initialize() {
    nczarr_metadata::initialize();
    nczarr_metadata::finalize();
    let threads: Vec<_> = (0..8)
        .map(|_| {
            std::thread::spawn(|| {
                nczarr_metadata::initialize();
                let map = MemoryMap::new();
                Metadata::new().set_metadata_handler(&map)
            })
        })
        .collect();
    for thread in threads {
        assert_eq!(
            thread.join().unwrap().unwrap(),
            MetadataHandlerKind::PerKey
        );
    }
    nczarr_metadata::finalize();
}
