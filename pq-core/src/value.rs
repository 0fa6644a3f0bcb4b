//! The decoded-value data model: a typed primitive array plus an
//! optional null bitmap, with no further nesting — the shape a single leaf
//! column decodes into before `record` reassembles the schema's nesting
//! around it.

use bytes::Bytes;

use pq_base::Bitmap;

use crate::basic::PhysicalType;

#[derive(Debug, Clone)]
pub enum TypedArray {
    Boolean(Vec<bool>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    /// INT96 is carried as its raw 12 bytes, with no calendar/timestamp
    /// interpretation.
    Int96(Vec<[u8; 12]>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    ByteArray(Vec<Bytes>),
    FixedLenByteArray(Vec<Bytes>),
}

impl TypedArray {
    pub fn physical_type(&self) -> PhysicalType {
        match self {
            TypedArray::Boolean(_) => PhysicalType::Boolean,
            TypedArray::Int32(_) => PhysicalType::Int32,
            TypedArray::Int64(_) => PhysicalType::Int64,
            TypedArray::Int96(_) => PhysicalType::Int96,
            TypedArray::Float(_) => PhysicalType::Float,
            TypedArray::Double(_) => PhysicalType::Double,
            TypedArray::ByteArray(_) => PhysicalType::ByteArray,
            TypedArray::FixedLenByteArray(_) => PhysicalType::FixedLenByteArray,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TypedArray::Boolean(v) => v.len(),
            TypedArray::Int32(v) => v.len(),
            TypedArray::Int64(v) => v.len(),
            TypedArray::Int96(v) => v.len(),
            TypedArray::Float(v) => v.len(),
            TypedArray::Double(v) => v.len(),
            TypedArray::ByteArray(v) => v.len(),
            TypedArray::FixedLenByteArray(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A decoded batch for one leaf column: definition/repetition levels for
/// every logical slot (including nulls), and the dense array of
/// non-null values in slot order. `values.len() == number of slots whose
/// definition level equals the column's max_def_level`.
#[derive(Debug, Clone)]
pub struct ColumnBatch {
    pub def_levels: Vec<u32>,
    pub rep_levels: Vec<u32>,
    pub values: TypedArray,
}

impl ColumnBatch {
    /// A bitmap over logical slots (one bit per entry in `def_levels`),
    /// set where the value is non-null (def level == `max_def_level`).
    pub fn null_mask(&self, max_def_level: u16) -> Bitmap {
        let mut bm = Bitmap::new(self.def_levels.len());
        for (i, &d) in self.def_levels.iter().enumerate() {
            bm.set(i, d == max_def_level as u32);
        }
        bm
    }
}
