#![allow(missing_docs)]

use std::error::Error;

use nczarr_filesystem::{FileMap, FileMapOptions};
use nczarr_shared::ErrorKind;
use nczarr_storage::{
    Bytes, ListableMapTraits, MapBackend, MapImpl, MapMode, MapTraits, ReadableMapTraits,
    StorePrefix, WritableMapTraits,
};

fn create_map(dir: &tempfile::TempDir) -> Result<FileMap, Box<dyn Error>> {
    let path = dir.path().join("map");
    Ok(FileMap::create(
        path.to_str().unwrap(),
        MapMode::read_write(),
        FileMapOptions::default(),
    )?)
}

#[test]
#[cfg_attr(miri, ignore)]
fn filesystem() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::TempDir::new()?;
    let map = create_map(&dir)?;
    nczarr_storage::map_test::map_write(&map)?;
    nczarr_storage::map_test::map_read(&map)?;
    nczarr_storage::map_test::map_list(&map)?;
    nczarr_storage::map_test::map_write_partial(&map)?;
    // erasing the last key of a directory removes the directory
    nczarr_storage::map_test::map_list(&map)?;
    Ok(())
}

#[test]
#[cfg_attr(miri, ignore)]
fn filesystem_sync_data() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::TempDir::new()?;
    let mut options = FileMapOptions::default();
    options.sync_data(true);
    let map = FileMap::create(
        dir.path().join("map").to_str().unwrap(),
        MapMode::read_write(),
        options,
    )?;
    nczarr_storage::map_test::map_write_partial(&map)?;
    Ok(())
}

#[test]
#[cfg_attr(miri, ignore)]
fn filesystem_create_open_close() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("map");
    let path = path.to_str().unwrap();

    assert_eq!(
        FileMap::open(path, MapMode::read_only(), FileMapOptions::default())
            .unwrap_err()
            .kind(),
        ErrorKind::NotFound
    );

    let map = FileMap::create(path, MapMode::read_only(), FileMapOptions::default())?;
    assert!(map.mode().writable());
    assert_eq!(map.implementation(), MapImpl::File);
    map.set(&"g/.zgroup".try_into()?, Bytes::from_static(b"{}"))?;
    Box::new(map).close(false)?;

    assert_eq!(
        FileMap::create(path, MapMode::read_write(), FileMapOptions::default())
            .unwrap_err()
            .kind(),
        ErrorKind::AlreadyExists
    );

    let map = FileMap::open(path, MapMode::read_only(), FileMapOptions::default())?;
    assert_eq!(map.get(&"g/.zgroup".try_into()?)?, Bytes::from_static(b"{}"));
    assert_eq!(map.list(&StorePrefix::root())?, &["g"]);
    assert_eq!(
        map.erase(&"g/.zgroup".try_into()?).unwrap_err().kind(),
        ErrorKind::PermissionDenied
    );
    assert_eq!(
        map.len(&"g".try_into()?).unwrap_err().kind(),
        ErrorKind::NotFound
    );
    Box::new(map).close(false)?;

    // overwrite
    let map = FileMap::create(
        path,
        MapMode::read_write().with_overwrite(true),
        FileMapOptions::default(),
    )?;
    assert!(map.list_all(&StorePrefix::root())?.is_empty());
    map.set(&"a".try_into()?, Bytes::from_static(b"a"))?;
    map.clear()?;
    assert!(map.list(&StorePrefix::root())?.is_empty());
    Box::new(map).close(true)?;
    assert!(!std::path::Path::new(path).exists());
    Ok(())
}
