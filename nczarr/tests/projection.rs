#![allow(missing_docs)]

use std::error::Error;

use serial_test::serial;

use nczarr::chunk_grid::{ChunkProjections, Slice};
use nczarr::config::global_config_mut;
use nczarr::storage::{
    ListableMapTraits, MapImpl, MapMode, MapTraits, ReadableMapTraits, WritableMapTraits,
};
use nczarr::MapParams;

const ARRAY_SHAPE: [u64; 2] = [10, 10];
const CHUNK_SHAPE: [u64; 2] = [4, 4];

fn chunk_len() -> usize {
    CHUNK_SHAPE.iter().product::<u64>() as usize
}

/// Write the `memory_shape` buffer `data` to the chunks of `map` touched by `slices`.
fn write_selection(
    map: &dyn MapTraits,
    slices: &[Slice],
    memory_shape: &[u64],
    data: &[u8],
) -> Result<(), Box<dyn Error>> {
    let projections = ChunkProjections::new_with_array_shape(slices, &CHUNK_SHAPE, &ARRAY_SHAPE)?;
    for projection in &projections {
        let key = nczarr::chunk_key_encoding::ChunkKeyEncoding::new_dot()
            .chunk_key("v", projection.chunk_indices())?;
        let mut chunk = if map.exists(&key)? {
            map.get(&key)?.to_vec()
        } else {
            vec![0; chunk_len()]
        };
        let mut chunk_odometer = projection.chunk_odometer(&CHUNK_SHAPE)?;
        let mut memory_odometer = projection.memory_odometer(memory_shape)?;
        while chunk_odometer.has_more() {
            assert!(memory_odometer.has_more());
            chunk[chunk_odometer.linear_offset() as usize] =
                data[memory_odometer.linear_offset() as usize];
            chunk_odometer.advance();
            memory_odometer.advance();
        }
        assert!(!memory_odometer.has_more());
        map.write(&key, 0, chunk.len() as u64, &chunk)?;
    }
    Ok(())
}

/// Read the elements selected by `slices` from the chunks of `map` into a buffer of shape `memory_shape`.
fn read_selection(
    map: &dyn MapTraits,
    slices: &[Slice],
    memory_shape: &[u64],
) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut data = vec![0; memory_shape.iter().product::<u64>() as usize];
    let projections = ChunkProjections::new_with_array_shape(slices, &CHUNK_SHAPE, &ARRAY_SHAPE)?;
    for projection in &projections {
        let key = nczarr::chunk_key_encoding::ChunkKeyEncoding::new_dot()
            .chunk_key("v", projection.chunk_indices())?;
        let mut chunk_odometer = projection.chunk_odometer(&CHUNK_SHAPE)?;
        let mut memory_odometer = projection.memory_odometer(memory_shape)?;
        while chunk_odometer.has_more() {
            let offset = chunk_odometer.linear_offset();
            data[memory_odometer.linear_offset() as usize] = map.read(&key, offset, 1)?[0];
            chunk_odometer.advance();
            memory_odometer.advance();
        }
    }
    Ok(data)
}

fn element(i: u64, j: u64) -> u8 {
    (i * ARRAY_SHAPE[1] + j) as u8
}

fn roundtrip(implementation: MapImpl, path: &str, params: MapParams) -> Result<(), Box<dyn Error>> {
    let map = nczarr::create_map(implementation, path, MapMode::read_write(), params)?;

    // whole array
    let full = [Slice::from_range(0..10)?, Slice::from_range(0..10)?];
    let data: Vec<u8> = (0..10)
        .flat_map(|i| (0..10).map(move |j| element(i, j)))
        .collect();
    write_selection(&*map, &full, &ARRAY_SHAPE, &data)?;
    assert_eq!(map.list_all(&"v/".try_into()?)?.len(), 9);
    assert_eq!(map.len(&"v/2.2".try_into()?)?, 16);

    // strided selection crossing chunk boundaries
    let slices = [Slice::new(1, 9, 3)?, Slice::new(0, 10, 2)?];
    let selected = read_selection(&*map, &slices, &[3, 5])?;
    let expected: Vec<u8> = [1, 4, 7]
        .into_iter()
        .flat_map(|i| [0, 2, 4, 6, 8].into_iter().map(move |j| element(i, j)))
        .collect();
    assert_eq!(selected, expected);

    // overwrite a block and read it back through the whole array
    let block = [Slice::new(2, 9, 1)?, Slice::new(2, 9, 1)?];
    write_selection(&*map, &block, &[7, 7], &[255; 49])?;
    let all = read_selection(&*map, &full, &ARRAY_SHAPE)?;
    for i in 0..10 {
        for j in 0..10 {
            let value = all[(i * 10 + j) as usize];
            if (2..9).contains(&i) && (2..9).contains(&j) {
                assert_eq!(value, 255);
            } else {
                assert_eq!(value, element(i, j));
            }
        }
    }

    map.close(true)?;
    Ok(())
}

#[test]
#[serial]
fn projection_memory_roundtrip() -> Result<(), Box<dyn Error>> {
    roundtrip(MapImpl::Memory, "projection_roundtrip", MapParams::default())
}

#[test]
#[serial]
#[cfg_attr(miri, ignore)]
fn projection_filesystem_roundtrip() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("roundtrip");
    roundtrip(MapImpl::File, path.to_str().unwrap(), MapParams::default())
}

#[test]
#[serial]
fn projection_object_store_roundtrip() -> Result<(), Box<dyn Error>> {
    let params = MapParams {
        object_store: nczarr::object_store::ObjectStoreMapOptions::default()
            .with_store(std::sync::Arc::new(object_store::memory::InMemory::new())),
        ..Default::default()
    };
    roundtrip(MapImpl::ObjectStore, "roundtrip", params)
}

#[test]
#[serial]
fn new_odometer_slabs() -> Result<(), Box<dyn Error>> {
    let slices = [Slice::new(1, 3, 1)?, Slice::from_range(0..4)?];
    let odometer = nczarr::new_odometer(&slices, &[4, 4])?;
    assert!(odometer.use_slabs());
    assert_eq!(odometer.slab1(), 0);
    assert_eq!(odometer.slabs().collect::<Vec<_>>(), vec![(4, 8)]);

    global_config_mut().set_odometer_use_slabs(false);
    let odometer = nczarr::new_odometer(&slices, &[4, 4]);
    global_config_mut().set_odometer_use_slabs(true);
    let mut odometer = odometer?;
    assert!(!odometer.use_slabs());
    let mut offsets = Vec::new();
    while odometer.has_more() {
        offsets.push(odometer.linear_offset());
        odometer.advance();
    }
    assert_eq!(offsets, (4..12).collect::<Vec<_>>());
    Ok(())
}
