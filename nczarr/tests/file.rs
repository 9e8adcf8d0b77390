#![allow(missing_docs)]

use std::error::Error;
use std::sync::Arc;

use serde_json::json;
use serial_test::serial;

use nczarr::chunk_key_encoding::ChunkKeySeparator;
use nczarr::config::global_config_mut;
use nczarr::metadata::{JsonKind, MetadataHandlerKind, ZMETADATA_KEY, ZMETADATA_TMP_KEY};
use nczarr::object_store::ObjectStoreMapOptions;
use nczarr::storage::{MapImpl, MapMode, MapTraits, ReadableMapTraits, StoreKey};
use nczarr::{ErrorKind, MapParams, ZarrFile};

#[test]
#[serial]
fn memory_per_key() -> Result<(), Box<dyn Error>> {
    nczarr::initialize();
    let path = "memory_per_key";
    let mut file = ZarrFile::create(
        MapImpl::Memory,
        path,
        MapMode::read_write(),
        MapParams::default(),
    )?;
    assert_eq!(
        file.metadata().handler_kind(),
        Some(MetadataHandlerKind::PerKey)
    );
    file.update_json_content(JsonKind::Group, "", json!({"zarr_format": 2}))?;
    file.update_json_content(JsonKind::Attributes, "g", json!({"x": 1}))?;
    assert!(file.map().exists(&"g/.zattrs".try_into()?)?);
    assert!(file.exists("g")?);
    file.close(false)?;

    let file = ZarrFile::open(
        MapImpl::Memory,
        path,
        MapMode::read_only(),
        MapParams::default(),
    )?;
    assert_eq!(
        file.metadata().handler_kind(),
        Some(MetadataHandlerKind::PerKey)
    );
    assert_eq!(file.fetch_json_content(JsonKind::Attributes, "g")?["x"], json!(1));
    assert_eq!(
        file.fetch_json_content(JsonKind::Array, "g")
            .unwrap_err()
            .kind(),
        ErrorKind::NotFound
    );
    file.close(true)?;

    assert_eq!(
        ZarrFile::open(
            MapImpl::Memory,
            path,
            MapMode::read_only(),
            MapParams::default()
        )
        .unwrap_err()
        .kind(),
        ErrorKind::NotFound
    );
    Ok(())
}

#[test]
#[serial]
fn memory_consolidated() -> Result<(), Box<dyn Error>> {
    nczarr::initialize();
    global_config_mut().set_consolidated_metadata_on_create(true);
    let path = "memory_consolidated";
    let file = ZarrFile::create(
        MapImpl::Memory,
        path,
        MapMode::read_write(),
        MapParams::default(),
    );
    global_config_mut().set_consolidated_metadata_on_create(false);
    let mut file = file?;
    assert_eq!(
        file.metadata().handler_kind(),
        Some(MetadataHandlerKind::Consolidated)
    );
    file.update_json_content(JsonKind::Group, "", json!({"zarr_format": 2}))?;
    file.update_json_content(JsonKind::Attributes, "g", json!({"x": 1}))?;
    assert!(!file.map().exists(&ZMETADATA_KEY.try_into()?)?);
    assert!(!file.map().exists(&"g/.zattrs".try_into()?)?);
    file.close(false)?;

    let file = ZarrFile::open(
        MapImpl::Memory,
        path,
        MapMode::read_only(),
        MapParams::default(),
    )?;
    assert_eq!(
        file.metadata().handler_kind(),
        Some(MetadataHandlerKind::Consolidated)
    );
    assert!(file.map().exists(&"g/.zattrs".try_into()?)?);
    assert_eq!(file.fetch_json_content(JsonKind::Attributes, "g")?["x"], json!(1));
    assert_eq!(
        file.fetch_json_content(JsonKind::Group, "")?["zarr_format"],
        json!(2)
    );
    file.close(true)?;
    Ok(())
}

#[test]
#[serial]
#[cfg_attr(miri, ignore)]
fn filesystem() -> Result<(), Box<dyn Error>> {
    nczarr::initialize();
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("file.zarr");
    let path = path.to_str().unwrap();

    assert_eq!(
        ZarrFile::open(
            MapImpl::File,
            path,
            MapMode::read_only(),
            MapParams::default()
        )
        .unwrap_err()
        .kind(),
        ErrorKind::NotFound
    );

    let mut file = ZarrFile::create(
        MapImpl::File,
        path,
        MapMode::read_write(),
        MapParams::default(),
    )?;
    file.update_json_content(JsonKind::Group, "", json!({"zarr_format": 2}))?;
    file.close(false)?;
    assert!(dir.path().join("file.zarr/.zgroup").is_file());

    assert_eq!(
        ZarrFile::create(
            MapImpl::File,
            path,
            MapMode::read_write(),
            MapParams::default()
        )
        .unwrap_err()
        .kind(),
        ErrorKind::AlreadyExists
    );

    let file = ZarrFile::open(
        MapImpl::File,
        path,
        MapMode::read_only(),
        MapParams::default(),
    )?;
    assert_eq!(
        file.fetch_json_content(JsonKind::Group, "")?["zarr_format"],
        json!(2)
    );
    file.close(true)?;
    assert!(!dir.path().join("file.zarr").exists());
    Ok(())
}

#[test]
#[serial]
fn object_store() -> Result<(), Box<dyn Error>> {
    nczarr::initialize();
    let store = Arc::new(object_store::memory::InMemory::new());
    let params = || MapParams {
        object_store: ObjectStoreMapOptions::default().with_store(store.clone()),
        ..Default::default()
    };

    let mut file = ZarrFile::create(
        MapImpl::ObjectStore,
        "bucket/file.zarr",
        MapMode::read_write(),
        params(),
    )?;
    file.update_json_content(JsonKind::Array, "v", json!({"shape": [10]}))?;
    file.close(false)?;

    let file = ZarrFile::open(
        MapImpl::ObjectStore,
        "bucket/file.zarr",
        MapMode::read_only(),
        params(),
    )?;
    assert_eq!(
        file.fetch_json_content(JsonKind::Array, "v")?["shape"],
        json!([10])
    );
    file.close(true)?;
    Ok(())
}

#[test]
#[serial]
fn chunk_key_separator() -> Result<(), Box<dyn Error>> {
    nczarr::initialize();
    let file = ZarrFile::create(
        MapImpl::Memory,
        "chunk_key_separator",
        MapMode::read_write(),
        MapParams::default(),
    )?;
    assert_eq!(
        file.chunk_key("/g/v", &[3, 0, 1])?,
        StoreKey::new("g/v/3.0.1")?
    );
    global_config_mut().set_chunk_key_separator(ChunkKeySeparator::Slash);
    let key = file.chunk_key("g/v", &[3, 0, 1]);
    global_config_mut().set_chunk_key_separator(ChunkKeySeparator::Dot);
    assert_eq!(key?, StoreKey::new("g/v/3/0/1")?);
    assert_eq!(
        file.chunk_key("g/../v", &[0]).unwrap_err().kind(),
        ErrorKind::InvalidArgument
    );
    file.close(true)?;
    Ok(())
}

#[test]
#[serial]
fn map_selection() -> Result<(), Box<dyn Error>> {
    let map = nczarr::create_map(
        MapImpl::Memory,
        "map_selection",
        MapMode::read_write(),
        MapParams::default(),
    )?;
    assert_eq!(map.implementation(), MapImpl::Memory);
    nczarr_storage::map_test::map_write(&map)?;
    nczarr_storage::map_test::map_read(&map)?;
    map.close(false)?;

    let map = nczarr::open_map(
        "mem".parse()?,
        "map_selection",
        MapMode::read_only(),
        MapParams::default(),
    )?;
    nczarr_storage::map_test::map_read(&map)?;
    nczarr_storage::map_test::map_list(&map)?;
    map.close(true)?;

    assert_eq!(
        nczarr::open_map(
            MapImpl::Memory,
            "map_selection",
            MapMode::read_only(),
            MapParams::default()
        )
        .err().unwrap()
        .kind(),
        ErrorKind::NotFound
    );
    Ok(())
}

/// Create a consolidated file, then update it after reopening so `.zmetadata` is replaced.
fn consolidated_lifecycle(
    implementation: MapImpl,
    path: &str,
    params: impl Fn() -> MapParams,
) -> Result<(), Box<dyn Error>> {
    global_config_mut().set_consolidated_metadata_on_create(true);
    let file = ZarrFile::create(implementation, path, MapMode::read_write(), params());
    global_config_mut().set_consolidated_metadata_on_create(false);
    let mut file = file?;
    file.update_json_content(JsonKind::Group, "", json!({"zarr_format": 2}))?;
    file.close(false)?;

    let mut file = ZarrFile::open(implementation, path, MapMode::read_write(), params())?;
    assert_eq!(
        file.metadata().handler_kind(),
        Some(MetadataHandlerKind::Consolidated)
    );
    file.update_json_content(JsonKind::Attributes, "g", json!({"x": 1}))?;
    file.close(false)?;

    let file = ZarrFile::open(implementation, path, MapMode::read_only(), params())?;
    assert_eq!(
        file.metadata().handler_kind(),
        Some(MetadataHandlerKind::Consolidated)
    );
    assert_eq!(file.fetch_json_content(JsonKind::Attributes, "g")?["x"], json!(1));
    assert_eq!(
        file.fetch_json_content(JsonKind::Group, "")?["zarr_format"],
        json!(2)
    );
    assert!(file.map().exists(&ZMETADATA_KEY.try_into()?)?);
    assert!(!file.map().exists(&ZMETADATA_TMP_KEY.try_into()?)?);
    assert!(file.map().exists(&"g/.zattrs".try_into()?)?);
    file.close(true)?;
    Ok(())
}

#[test]
#[serial]
#[cfg_attr(miri, ignore)]
fn filesystem_consolidated() -> Result<(), Box<dyn Error>> {
    nczarr::initialize();
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("consolidated.zarr");
    consolidated_lifecycle(MapImpl::File, path.to_str().unwrap(), MapParams::default)?;
    assert!(!path.exists());
    Ok(())
}

#[test]
#[serial]
fn object_store_consolidated() -> Result<(), Box<dyn Error>> {
    nczarr::initialize();
    let store = Arc::new(object_store::memory::InMemory::new());
    consolidated_lifecycle(MapImpl::ObjectStore, "bucket/consolidated.zarr", || {
        MapParams {
            object_store: ObjectStoreMapOptions::default().with_store(store.clone()),
            ..Default::default()
        }
    })
}
