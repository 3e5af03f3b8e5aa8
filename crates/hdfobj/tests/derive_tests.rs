use hdfobj::{Container, ElementKind, Error, File, HasAttributes, Record, Slab, TypeDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Record)]
struct Point {
    x: f64,
    y: f64,
    z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Record)]
struct Sample {
    channel: u8,
    reading: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Record)]
struct Pixel(u8, u8, u8, u8);

#[derive(Debug, Clone, Copy, PartialEq, Record)]
struct Mixed {
    count: u16,
    offset: i8,
    gain: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Record)]
struct Wide {
    id: i64,
    weight: f32,
}

fn points() -> Vec<Point> {
    (0..4)
        .map(|i| {
            let i = f64::from(i);
            Point {
                x: i,
                y: i * 2.0,
                z: -i,
            }
        })
        .collect()
}

#[test]
fn derived_descriptor_lists_fields_in_order() {
    let desc = Point::descriptor().unwrap();
    assert!(desc.is_aggregate());
    assert_eq!(desc.arity(), 3);
    assert_eq!(desc.storage_kind(), ElementKind::F64);
    assert_eq!(desc.record_size(), 24);
    let names: Vec<_> = desc.fields().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["x", "y", "z"]);
    let offsets: Vec<_> = desc.fields().iter().map(|f| f.offset).collect();
    assert_eq!(offsets, vec![0, 8, 16]);
}

#[test]
fn descriptor_is_stable_across_calls() {
    assert_eq!(Point::descriptor().unwrap(), Point::descriptor().unwrap());
}

#[test]
fn mixed_field_kinds_widen_to_a_common_kind() {
    let desc = Sample::descriptor().unwrap();
    assert_eq!(desc.storage_kind(), ElementKind::I16);
    let kinds: Vec<_> = desc.fields().iter().map(|f| f.kind).collect();
    assert_eq!(kinds, vec![ElementKind::U8, ElementKind::I16]);
}

#[test]
fn storage_kind_is_chosen_over_all_fields() {
    let desc = Mixed::descriptor().unwrap();
    assert_eq!(desc.storage_kind(), ElementKind::F32);

    let dir = tempfile::tempdir().unwrap();
    let file = File::create(dir.path().join("mixed.hob")).unwrap();
    let records = [
        Mixed { count: u16::MAX, offset: i8::MIN, gain: 0.25 },
        Mixed { count: 0, offset: 7, gain: -3.5 },
    ];
    let ds = file.write_dataset("mixed", &records).unwrap();
    assert_eq!(ds.element_kind(), ElementKind::F32);
    assert_eq!(ds.read::<Mixed>().unwrap(), records);
}

#[test]
fn tuple_structs_use_positional_names() {
    let desc = Pixel::descriptor().unwrap();
    assert_eq!(desc.arity(), 4);
    assert_eq!(desc.fields()[3].name, "3");
    assert_eq!(desc.storage_kind(), ElementKind::U8);
}

#[test]
fn fields_without_exact_common_kind_are_unsupported() {
    assert!(matches!(
        Wide::descriptor(),
        Err(Error::UnsupportedElementType(_))
    ));
    let dir = tempfile::tempdir().unwrap();
    let file = File::create(dir.path().join("wide.hob")).unwrap();
    let records = [Wide { id: 1, weight: 1.0 }];
    assert!(matches!(
        file.write_dataset("w", &records),
        Err(Error::UnsupportedElementType(_))
    ));
    assert!(!file.exists("w").unwrap());
}

#[test]
fn structure_round_trip_counts_elements_not_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("points.hob");
    {
        let file = File::create(&path).unwrap();
        let ds = file.write_dataset("points", &points()).unwrap();
        assert_eq!(ds.shape(), &[4, 3]);
        assert_eq!(ds.element_count(), 12);
    }

    let file = File::open(&path).unwrap();
    let ds = file.open_dataset("points").unwrap();
    assert_eq!(ds.element_count(), 12);
    assert_eq!(ds.record_count::<Point>().unwrap(), 4);
    let back: Vec<Point> = ds.read().unwrap();
    assert_eq!(back.len(), 4);
    assert_eq!(back, points());

    // The same storage reads as plain elements too.
    let flat = ds.read::<f64>().unwrap();
    assert_eq!(&flat[..6], &[0.0, 0.0, -0.0, 1.0, 2.0, -1.0]);
}

#[test]
fn aggregate_extents_must_hold_whole_records() {
    let dir = tempfile::tempdir().unwrap();
    let file = File::create(dir.path().join("extent.hob")).unwrap();
    assert!(matches!(
        file.create_dataset::<Point, 1>("bad", &Slab::new([10])),
        Err(Error::ShapeMismatch {
            expected: 12,
            actual: 10
        })
    ));
    let ds = file
        .create_dataset::<Point, 2>("good", &Slab::new([2, 3]))
        .unwrap();
    assert_eq!(ds.read::<Point>().unwrap(), vec![Point { x: 0.0, y: 0.0, z: 0.0 }; 2]);
    assert!(matches!(ds.read::<Pixel>(), Err(Error::ShapeMismatch { .. })));
}

#[test]
fn pairs_keep_each_slot_kind() {
    let dir = tempfile::tempdir().unwrap();
    let file = File::create(dir.path().join("pairs.hob")).unwrap();
    let pairs = vec![(1i32, 0.5f32), (-3, 2.25), (i32::MAX, -1.0)];
    let ds = file.write_dataset("pairs", &pairs).unwrap();
    assert_eq!(ds.shape(), &[3, 2]);
    assert_eq!(ds.element_kind(), ElementKind::F64);
    assert_eq!(ds.read::<(i32, f32)>().unwrap(), pairs);

    let same = vec![(1u16, 2u16), (3, 4)];
    let ds = file.write_dataset("same", &same).unwrap();
    assert_eq!(ds.element_kind(), ElementKind::U16);
    assert_eq!(ds.read::<(u16, u16)>().unwrap(), same);
}

#[test]
fn arrays_are_records() {
    let dir = tempfile::tempdir().unwrap();
    let file = File::create(dir.path().join("arrays.hob")).unwrap();
    let rows = [[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]];
    let ds = file.write_dataset("rows", &rows).unwrap();
    assert_eq!(ds.shape(), &[2, 3]);
    let block = ds.slab::<2>().unwrap().select([1, 0], [1, 3]);
    assert_eq!(ds.read_slab::<[f32; 3], 2>(&block).unwrap(), vec![[4.0, 5.0, 6.0]]);
}

#[test]
fn aggregate_attribute_scalar() {
    let dir = tempfile::tempdir().unwrap();
    let file = File::create(dir.path().join("origin.hob")).unwrap();
    let origin = Point { x: 1.0, y: 2.0, z: 3.0 };
    let attr = file.write_attribute_scalar("origin", origin).unwrap();
    assert_eq!(attr.shape(), &[3]);
    assert_eq!(attr.read_scalar::<Point>().unwrap(), origin);
    assert!(matches!(
        attr.read_scalar::<(f64, f64)>(),
        Err(Error::ShapeMismatch { .. })
    ));
}

#[test]
fn out_of_range_values_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let file = File::create(dir.path().join("range.hob")).unwrap();
    let ds = file
        .write_dataset("samples", &[Sample { channel: 1, reading: -5 }])
        .unwrap();
    let err = ds.read::<(u8, u8)>().unwrap_err();
    assert!(matches!(err, Error::NativeEngineError { .. } | Error::ValueOutOfRange { .. }));
    assert!(matches!(
        TypeDescriptor::aggregate(Vec::new(), 0),
        Err(Error::UnsupportedElementType(_))
    ));
}
