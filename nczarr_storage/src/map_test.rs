use std::error::Error;

use nczarr_shared::ErrorKind;

use crate::{Bytes, ListableMapTraits, ReadableMapTraits, StorePrefix, WritableMapTraits};

#[allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]
/// Fill a map with the following data using whole-value writes only
/// ```text
/// - a/
///   - b [0, 1, 2, 3]
///   - c [0]
///   - d/
///     - e
///   - f/
///     - g
///     - h
/// - i/
///   - j/
///     - k [0, 1]
/// ```
pub fn map_write<T: WritableMapTraits>(map: &T) -> Result<(), Box<dyn Error>> {
    map.clear()?;

    map.set(&"a/b".try_into()?, vec![255, 255].into())?;
    map.write(&"a/b".try_into()?, 0, 4, &[0, 1, 2, 3])?;

    map.set(&"a/c".try_into()?, vec![0].into())?;
    map.set(&"a/d/e".try_into()?, Bytes::new())?;
    map.write(&"a/f/g".try_into()?, 0, 0, &[])?;
    map.set(&"a/f/h".try_into()?, Bytes::new())?;

    map.set(&"i/j/k".try_into()?, vec![9, 9, 9].into())?;
    map.set(&"i/j/rename".try_into()?, vec![0, 1].into())?;
    // replaces the existing value
    map.rename(&"i/j/rename".try_into()?, &"i/j/k".try_into()?)?;
    assert_eq!(
        map.rename(&"i/j/rename".try_into()?, &"i/j/k".try_into()?)
            .unwrap_err()
            .kind(),
        ErrorKind::NotFound
    );

    map.set(&"erase".try_into()?, Bytes::new())?;
    map.erase(&"erase".try_into()?)?;
    map.erase(&"erase".try_into()?)?; // succeeds

    assert_eq!(
        map.write(&"a/x".try_into()?, 0, 2, &[0])
            .unwrap_err()
            .kind(),
        ErrorKind::InvalidArgument
    );

    Ok(())
}

#[allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]
/// Read from the map and check the data matches the expected values after [`map_write`].
pub fn map_read<T: ReadableMapTraits>(map: &T) -> Result<(), Box<dyn Error>> {
    assert_eq!(
        map.len(&"notfound".try_into()?).unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        map.read(&"notfound".try_into()?, 0, 0).unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert!(!map.exists(&"notfound".try_into()?)?);
    assert!(!map.exists(&"a".try_into()?)?);
    assert!(map.exists(&"a/b".try_into()?)?);
    assert!(map.exists(&"a/d/e".try_into()?)?);

    assert_eq!(map.get(&"a/b".try_into()?)?, Bytes::from(vec![0, 1, 2, 3]));
    assert_eq!(map.len(&"a/b".try_into()?)?, 4);
    assert_eq!(map.len(&"a/c".try_into()?)?, 1);
    assert_eq!(map.len(&"a/d/e".try_into()?)?, 0);
    assert_eq!(map.len(&"i/j/k".try_into()?)?, 2);
    assert_eq!(
        map.read(&"a/b".try_into()?, 1, 2)?,
        Bytes::from(vec![1, 2])
    );
    assert_eq!(map.read(&"a/b".try_into()?, 4, 0)?, Bytes::new());
    assert_eq!(
        map.read(&"a/b".try_into()?, 3, 2).unwrap_err().kind(),
        ErrorKind::OutOfRange
    );
    assert_eq!(map.get(&"i/j/k".try_into()?)?, Bytes::from(vec![0, 1]));
    assert!(!map.exists(&"i/j/rename".try_into()?)?);

    Ok(())
}

#[allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]
/// List the map and check the data matches the expected values after [`map_write`].
pub fn map_list<T: ListableMapTraits>(map: &T) -> Result<(), Box<dyn Error>> {
    assert_eq!(map.list(&StorePrefix::root())?, &["a", "i"]);
    assert_eq!(map.list(&"a/".try_into()?)?, &["b", "c", "d", "f"]);
    assert_eq!(map.list(&"a/f/".try_into()?)?, &["g", "h"]);
    assert_eq!(map.list(&"i/j/".try_into()?)?, &["k"]);
    assert!(map.list(&"notfound/".try_into()?)?.is_empty());

    assert_eq!(
        map.list_all(&StorePrefix::root())?,
        &[
            "a/b".try_into()?,
            "a/c".try_into()?,
            "a/d/e".try_into()?,
            "a/f/g".try_into()?,
            "a/f/h".try_into()?,
            "i/j/k".try_into()?
        ]
    );
    assert_eq!(
        map.list_all(&"a/f/".try_into()?)?,
        &["a/f/g".try_into()?, "a/f/h".try_into()?]
    );
    assert!(map.list_all(&"notfound/".try_into()?)?.is_empty());

    Ok(())
}

#[allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]
/// Check ranged writes on a map supporting partial writes.
///
/// Writes extend a value, zero-fill any gap, and never truncate.
pub fn map_write_partial<T: ReadableMapTraits + WritableMapTraits>(
    map: &T,
) -> Result<(), Box<dyn Error>> {
    let key = "partial/a".try_into()?;
    map.write(&key, 0, 3, b"abc")?;
    map.write(&key, 3, 2, b"de")?;
    assert_eq!(map.read(&key, 0, 5)?, Bytes::from_static(b"abcde"));

    map.write(&key, 0, 2, b"xy")?;
    assert_eq!(map.get(&key)?, Bytes::from_static(b"xycde"));

    let key = "partial/gap".try_into()?;
    map.write(&key, 2, 1, &[7])?;
    assert_eq!(map.get(&key)?, Bytes::from(vec![0, 0, 7]));

    map.erase(&"partial/a".try_into()?)?;
    map.erase(&key)?;
    Ok(())
}
