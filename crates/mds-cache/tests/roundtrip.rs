use mds_cache::{
    CompressionPolicy, FsStorage, Serializer, TensorSerializer, NPY_FILE, NPY_GZ_FILE,
};
use mds_core::{CacheValue, TensorData, TensorValue};
use proptest::prelude::*;
use tempfile::tempdir;

fn tensor_strategy() -> impl Strategy<Value = TensorValue> {
    proptest::collection::vec(1usize..4, 0..3).prop_flat_map(|shape| {
        let count: usize = shape.iter().product();
        let bools = proptest::collection::vec(any::<bool>(), count).prop_map(TensorData::Bool);
        let bytes = proptest::collection::vec(any::<u8>(), count).prop_map(TensorData::U8);
        let ints = proptest::collection::vec(any::<i64>(), count).prop_map(TensorData::I64);
        let floats =
            proptest::collection::vec(-1.0e9f64..1.0e9f64, count).prop_map(TensorData::F64);
        prop_oneof![bools, bytes, ints, floats]
            .prop_map(move |data| TensorValue::new(shape.clone(), data).expect("valid tensor"))
    })
}

fn policy_strategy() -> impl Strategy<Value = CompressionPolicy> {
    (
        proptest::option::of(0u32..=9),
        proptest::option::of(0u32..=9),
        proptest::option::of(0u32..=9),
    )
        .prop_map(|(bool_level, integer_level, default_level)| CompressionPolicy {
            bool_level,
            integer_level,
            default_level,
        })
}

proptest! {
    #[test]
    fn tensor_save_load_restores_value(tensor in tensor_strategy(), policy in policy_strategy()) {
        let serializer = TensorSerializer::new(policy);
        let folder = tempdir().expect("tempdir");
        let value = CacheValue::Tensor(tensor.clone());
        serializer.save(&value, folder.path()).expect("save");

        let expected_name = if policy.choose(tensor.dtype()).is_some() {
            NPY_GZ_FILE
        } else {
            NPY_FILE
        };
        prop_assert!(folder.path().join(expected_name).is_file());

        let restored = serializer
            .load(folder.path(), &FsStorage)
            .expect("load")
            .expect("recognized layout");
        prop_assert_eq!(restored, value);
    }
}

#[test]
fn compressed_bytes_are_reproducible() {
    let policy = CompressionPolicy {
        bool_level: None,
        integer_level: Some(4),
        default_level: None,
    };
    let serializer = TensorSerializer::new(policy);
    let tensor = TensorValue::new(vec![8], TensorData::I64((0..8).collect())).expect("tensor");
    let value = CacheValue::Tensor(tensor);

    let first = tempdir().expect("tempdir");
    let second = tempdir().expect("tempdir");
    serializer.save(&value, first.path()).expect("first save");
    serializer.save(&value, second.path()).expect("second save");

    let first_bytes = std::fs::read(first.path().join(NPY_GZ_FILE)).expect("first bytes");
    let second_bytes = std::fs::read(second.path().join(NPY_GZ_FILE)).expect("second bytes");
    assert_eq!(first_bytes, second_bytes);
}
