use crate::basic::{ConvertedType, PhysicalType, Repetition};
use crate::metadata::SchemaElementRaw;
use crate::record::{assemble_leaf_rows, assemble_row_group, merge, Value};
use crate::schema::Schema;
use crate::value::{ColumnBatch, TypedArray};

fn repeated_int32_list_schema() -> Schema {
    let elements = vec![
        SchemaElementRaw {
            physical_type: None,
            type_length: None,
            repetition: None,
            name: "schema".to_string(),
            num_children: Some(1),
            converted_type: None,
            scale: None,
            precision: None,
            field_id: None,
            logical_type: None,
        },
        SchemaElementRaw {
            physical_type: Some(PhysicalType::Int32),
            type_length: None,
            repetition: Some(Repetition::Repeated),
            name: "values".to_string(),
            num_children: None,
            converted_type: None,
            scale: None,
            precision: None,
            field_id: None,
            logical_type: None,
        },
    ];
    Schema::build(&elements).unwrap()
}

fn mixed_flat_and_repeated_schema() -> Schema {
    let elements = vec![
        SchemaElementRaw {
            physical_type: None,
            type_length: None,
            repetition: None,
            name: "schema".to_string(),
            num_children: Some(2),
            converted_type: None,
            scale: None,
            precision: None,
            field_id: None,
            logical_type: None,
        },
        SchemaElementRaw {
            physical_type: Some(PhysicalType::Int32),
            type_length: None,
            repetition: Some(Repetition::Required),
            name: "id".to_string(),
            num_children: None,
            converted_type: None,
            scale: None,
            precision: None,
            field_id: None,
            logical_type: None,
        },
        SchemaElementRaw {
            physical_type: Some(PhysicalType::Int32),
            type_length: None,
            repetition: Some(Repetition::Repeated),
            name: "values".to_string(),
            num_children: None,
            converted_type: None,
            scale: None,
            precision: None,
            field_id: None,
            logical_type: None,
        },
    ];
    Schema::build(&elements).unwrap()
}

/// Standard 3-level MAP<int32, int32> encoding: an optional `tags` group
/// wraps a repeated `key_value` group whose two children are `key`
/// (required) and `value` (optional).
fn map_int32_to_int32_schema() -> Schema {
    let elements = vec![
        SchemaElementRaw {
            physical_type: None,
            type_length: None,
            repetition: None,
            name: "schema".to_string(),
            num_children: Some(1),
            converted_type: None,
            scale: None,
            precision: None,
            field_id: None,
            logical_type: None,
        },
        SchemaElementRaw {
            physical_type: None,
            type_length: None,
            repetition: Some(Repetition::Optional),
            name: "tags".to_string(),
            num_children: Some(1),
            converted_type: Some(ConvertedType::Map),
            scale: None,
            precision: None,
            field_id: None,
            logical_type: None,
        },
        SchemaElementRaw {
            physical_type: None,
            type_length: None,
            repetition: Some(Repetition::Repeated),
            name: "key_value".to_string(),
            num_children: Some(2),
            converted_type: None,
            scale: None,
            precision: None,
            field_id: None,
            logical_type: None,
        },
        SchemaElementRaw {
            physical_type: Some(PhysicalType::Int32),
            type_length: None,
            repetition: Some(Repetition::Required),
            name: "key".to_string(),
            num_children: None,
            converted_type: None,
            scale: None,
            precision: None,
            field_id: None,
            logical_type: None,
        },
        SchemaElementRaw {
            physical_type: Some(PhysicalType::Int32),
            type_length: None,
            repetition: Some(Repetition::Optional),
            name: "value".to_string(),
            num_children: None,
            converted_type: None,
            scale: None,
            precision: None,
            field_id: None,
            logical_type: None,
        },
    ];
    Schema::build(&elements).unwrap()
}

/// Three logical rows: `{1: 10, 2: 20}`, `{}` (present but empty), and
/// `None` (the whole map absent). Exercises both the key/value pairing and
/// merging the assembled `Map` column alongside the flat fast path.
#[test]
fn test_map_key_and_value_leaves_zip_into_ordered_pairs() {
    let schema = map_int32_to_int32_schema();
    let key_col = schema.column_by_path(&["tags", "key_value", "key"]).unwrap().node;
    let value_col = schema.column_by_path(&["tags", "key_value", "value"]).unwrap().node;

    // Row 0: two entries. Row 1: map present, zero entries. Row 2: map null.
    let key_batch = ColumnBatch {
        def_levels: vec![2, 2, 1, 0],
        rep_levels: vec![0, 1, 0, 0],
        values: TypedArray::Int32(vec![1, 2]),
    };
    let value_batch = ColumnBatch {
        def_levels: vec![3, 3, 1, 0],
        rep_levels: vec![0, 1, 0, 0],
        values: TypedArray::Int32(vec![10, 20]),
    };
    let leaves = vec![(key_col, key_batch), (value_col, value_batch)];

    let rows = assemble_row_group(&schema, &leaves).unwrap();
    assert_eq!(
        rows,
        vec![
            Value::Struct(vec![(
                "tags".to_string(),
                Value::Map(vec![(Value::Int32(1), Value::Int32(10)), (Value::Int32(2), Value::Int32(20))])
            )]),
            Value::Struct(vec![("tags".to_string(), Value::Map(vec![]))]),
            Value::Struct(vec![("tags".to_string(), Value::Null)]),
        ]
    );
}

/// A null value paired with a present key: the entry survives with
/// `Value::Null` on the value side rather than being dropped or erroring.
#[test]
fn test_map_with_null_value_keeps_the_entry() {
    let schema = map_int32_to_int32_schema();
    let key_col = schema.column_by_path(&["tags", "key_value", "key"]).unwrap().node;
    let value_col = schema.column_by_path(&["tags", "key_value", "value"]).unwrap().node;

    let key_batch = ColumnBatch {
        def_levels: vec![2],
        rep_levels: vec![0],
        values: TypedArray::Int32(vec![1]),
    };
    let value_batch = ColumnBatch {
        def_levels: vec![2], // present key_value slot, but value itself undefined
        rep_levels: vec![0],
        values: TypedArray::Int32(vec![]),
    };
    let leaves = vec![(key_col, key_batch), (value_col, value_batch)];

    let rows = assemble_row_group(&schema, &leaves).unwrap();
    assert_eq!(
        rows,
        vec![Value::Struct(vec![("tags".to_string(), Value::Map(vec![(Value::Int32(1), Value::Null)]))])]
    );
}

/// `id` is required and non-repeated (`is_flat`), so its rows come from
/// `assemble_flat_leaf_rows` with no ancestor-chain walk at all, while
/// `values` still goes through the general Dremel path in the same call.
#[test]
fn test_assemble_row_group_dispatches_flat_and_nested_columns_independently() {
    let schema = mixed_flat_and_repeated_schema();
    assert!(schema.columns[0].is_flat);
    assert!(!schema.columns[1].is_flat);

    let id_batch = ColumnBatch {
        def_levels: vec![0, 0],
        rep_levels: vec![0, 0],
        values: TypedArray::Int32(vec![100, 200]),
    };
    let values_batch = ColumnBatch {
        def_levels: vec![1, 1, 0],
        rep_levels: vec![0, 1, 0],
        values: TypedArray::Int32(vec![10, 20]),
    };
    let leaves = vec![(schema.columns[0].node, id_batch), (schema.columns[1].node, values_batch)];

    let rows = assemble_row_group(&schema, &leaves).unwrap();
    assert_eq!(
        rows,
        vec![
            Value::Struct(vec![
                ("id".to_string(), Value::Int32(100)),
                ("values".to_string(), Value::List(vec![Value::Int32(10), Value::Int32(20)])),
            ]),
            Value::Struct(vec![("id".to_string(), Value::Int32(200)), ("values".to_string(), Value::List(vec![]))]),
        ]
    );
}

/// Two logical rows: `[10, 20]` then `[]`. Definition level 1 marks a
/// present element, 0 marks the repeated field occurring zero times;
/// repetition level 0 starts a new row, 1 continues the current list.
#[test]
fn test_repeated_leaf_assembles_into_list_rows() {
    let schema = repeated_int32_list_schema();
    let leaf = schema.columns[0].node;
    let batch = ColumnBatch {
        def_levels: vec![1, 1, 0],
        rep_levels: vec![0, 1, 0],
        values: TypedArray::Int32(vec![10, 20]),
    };
    let rows = assemble_leaf_rows(&schema, leaf, &batch).unwrap();
    assert_eq!(rows, vec![Value::List(vec![Value::Int32(10), Value::Int32(20)]), Value::List(vec![])]);
}

#[test]
fn test_merge_unions_struct_fields_by_name() {
    let a = Value::Struct(vec![("a".to_string(), Value::Int32(1))]);
    let b = Value::Struct(vec![("b".to_string(), Value::Int32(2))]);
    let merged = merge(a, b);
    assert_eq!(
        merged,
        Value::Struct(vec![("a".to_string(), Value::Int32(1)), ("b".to_string(), Value::Int32(2))])
    );
}

#[test]
fn test_merge_combines_shared_struct_field_recursively() {
    let a = Value::Struct(vec![("point".to_string(), Value::Struct(vec![("x".to_string(), Value::Int32(1))]))]);
    let b = Value::Struct(vec![("point".to_string(), Value::Struct(vec![("y".to_string(), Value::Int32(2))]))]);
    let merged = merge(a, b);
    assert_eq!(
        merged,
        Value::Struct(vec![(
            "point".to_string(),
            Value::Struct(vec![("x".to_string(), Value::Int32(1)), ("y".to_string(), Value::Int32(2))])
        )])
    );
}

#[test]
fn test_merge_lists_element_wise() {
    let a = Value::List(vec![Value::Struct(vec![("x".to_string(), Value::Int32(1))])]);
    let b = Value::List(vec![Value::Struct(vec![("y".to_string(), Value::Int32(2))])]);
    let merged = merge(a, b);
    assert_eq!(
        merged,
        Value::List(vec![Value::Struct(vec![("x".to_string(), Value::Int32(1)), ("y".to_string(), Value::Int32(2))])])
    );
}
