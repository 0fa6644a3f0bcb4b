//! C8: nested record assembly — turning each leaf column's flat
//! (repetition level, definition level, value) triples back into the
//! schema's original nesting. This follows the Dremel
//! assembly algorithm: walk one leaf's ancestor chain from the schema
//! root down to the leaf, using definition levels to find how deep a given
//! entry's presence reaches and repetition levels to find where one
//! repeated ancestor's element sequence restarts. Each leaf is assembled
//! against its own chain in isolation, then every leaf's per-row tree for
//! a row group is merged field-by-field into one record (groups merge by
//! field name; lists sharing a repeated ancestor merge element-wise, since
//! sibling leaves under the same repeated group always produce the same
//! element counts). A MAP's `key` and `value` leaves are the one case that
//! can't be reconciled after the fact this way — two independently
//! assembled lists of scalars carry no field name to merge by — so they are
//! recognized up front and assembled together: see `map_key_value_child`
//! and `zip_map_entries`. A column that can never be null or repeated
//! (`ColumnDescriptor::is_flat`) skips the ancestor-chain walk altogether —
//! see `assemble_flat_leaf_rows` — since there is nothing for it to resolve.

use bytes::Bytes;

use crate::error::{fail, Result};
use crate::schema::{is_map_wrapper, NodeId, NodeKind, Schema};
use crate::value::{ColumnBatch, TypedArray};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Int96([u8; 12]),
    Float(f32),
    Double(f64),
    Bytes(Bytes),
    List(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Struct(Vec<(String, Value)>),
}

struct Ancestor {
    node: NodeId,
    is_repeated: bool,
    is_optional: bool,
    cumulative_max_def: u16,
    cumulative_max_rep: u16,
}

struct Entry<'a> {
    rep: u32,
    def: u32,
    leaf: LeafValue<'a>,
}

/// Borrowed handle into a `TypedArray`'s `i`-th element, resolved lazily
/// only when an entry turns out to be defined.
#[derive(Clone, Copy)]
struct LeafValue<'a> {
    values: &'a TypedArray,
    index: usize,
}

impl<'a> LeafValue<'a> {
    fn materialize(&self) -> Value {
        match self.values {
            TypedArray::Boolean(v) => Value::Boolean(v[self.index]),
            TypedArray::Int32(v) => Value::Int32(v[self.index]),
            TypedArray::Int64(v) => Value::Int64(v[self.index]),
            TypedArray::Int96(v) => Value::Int96(v[self.index]),
            TypedArray::Float(v) => Value::Float(v[self.index]),
            TypedArray::Double(v) => Value::Double(v[self.index]),
            TypedArray::ByteArray(v) | TypedArray::FixedLenByteArray(v) => Value::Bytes(v[self.index].clone()),
        }
    }
}

/// Build the ancestor chain from the schema root down to (and including)
/// `leaf`, skipping the implicit file root itself.
fn ancestor_chain(schema: &Schema, leaf: NodeId) -> Vec<Ancestor> {
    let mut chain = Vec::new();
    let mut cur = Some(leaf);
    while let Some(id) = cur {
        let node = schema.node(id);
        if node.parent.is_none() {
            break; // implicit root carries no value of its own
        }
        chain.push(Ancestor {
            node: id,
            is_repeated: matches!(node.repetition, crate::basic::Repetition::Repeated),
            is_optional: matches!(node.repetition, crate::basic::Repetition::Optional),
            cumulative_max_def: node.max_def_level,
            cumulative_max_rep: node.max_rep_level,
        });
        cur = node.parent;
    }
    chain.reverse();
    chain
}

/// Assemble every row of one leaf column's batch into per-row trees
/// following that leaf's ancestor chain. Rows are split wherever
/// `rep_level == 0`.
pub fn assemble_leaf_rows(schema: &Schema, leaf: NodeId, batch: &ColumnBatch) -> Result<Vec<Value>> {
    let chain = ancestor_chain(schema, leaf);
    if chain.is_empty() {
        return Err(fail!(InvalidFormat, "leaf column has no ancestor chain"));
    }

    let n = batch.def_levels.len();
    if batch.rep_levels.len() != n {
        return Err(fail!(Malformed, "definition/repetition level count mismatch"));
    }

    let mut value_cursor = 0usize;
    let entries: Vec<Entry> = (0..n)
        .map(|i| {
            let def = batch.def_levels[i];
            let is_value = def == chain.last().unwrap().cumulative_max_def as u32;
            let leaf = LeafValue { values: &batch.values, index: value_cursor };
            if is_value {
                value_cursor += 1;
            }
            Entry { rep: batch.rep_levels[i], def, leaf }
        })
        .collect();
    if value_cursor != batch.values.len() {
        return Err(fail!(
            Malformed,
            "column had {} values but only {value_cursor} definition-level slots matched",
            batch.values.len()
        ));
    }

    let mut rows = Vec::new();
    let mut i = 0usize;
    while i < entries.len() {
        let row_start = i;
        i += 1;
        while i < entries.len() && entries[i].rep != 0 {
            i += 1;
        }
        let row_entries = &entries[row_start..i];
        let mut cursor = 0usize;
        rows.push(build(&chain, 0, row_entries, &mut cursor));
    }
    Ok(rows)
}

/// The fast path for a column that is never null and never repeated
/// (`ColumnDescriptor::is_flat`): every slot is a value in row order, so
/// there is no definition/repetition bookkeeping to interpret and no
/// recursive descent through an ancestor chain — each row is exactly one
/// materialized value.
fn assemble_flat_leaf_rows(batch: &ColumnBatch) -> Vec<Value> {
    (0..batch.values.len())
        .map(|index| LeafValue { values: &batch.values, index }.materialize())
        .collect()
}

fn build(chain: &[Ancestor], depth: usize, entries: &[Entry], idx: &mut usize) -> Value {
    let node = &chain[depth];
    let entry = &entries[*idx];

    // Required, non-repeated nodes never gate presence on their own: pass
    // straight through to the next depth without consuming anything.
    if !node.is_optional && !node.is_repeated {
        return if depth + 1 < chain.len() {
            build(chain, depth + 1, entries, idx)
        } else {
            *idx += 1;
            entry.leaf.materialize()
        };
    }

    if entry.def < node.cumulative_max_def as u32 {
        *idx += 1;
        return if node.is_repeated { Value::List(Vec::new()) } else { Value::Null };
    }

    if node.is_repeated {
        let mut elems = Vec::new();
        loop {
            let elem = if depth + 1 < chain.len() {
                build(chain, depth + 1, entries, idx)
            } else {
                let v = entries[*idx].leaf.materialize();
                *idx += 1;
                v
            };
            elems.push(elem);
            if *idx >= entries.len() || entries[*idx].rep < node.cumulative_max_rep as u32 {
                break;
            }
        }
        Value::List(elems)
    } else {
        // Optional, defined, non-repeated: pass through.
        if depth + 1 < chain.len() {
            build(chain, depth + 1, entries, idx)
        } else {
            let v = entries[*idx].leaf.materialize();
            *idx += 1;
            v
        }
    }
}

/// Wrap a leaf's single-field-per-level tree in `Struct`/group nodes
/// matching the schema path down to it, so independently-assembled leaves
/// can be merged by field name.
pub fn wrap_in_schema_path(schema: &Schema, leaf: NodeId, value: Value) -> Value {
    let mut path = Vec::new();
    let mut cur = Some(leaf);
    while let Some(id) = cur {
        let node = schema.node(id);
        if node.parent.is_none() {
            break;
        }
        path.push(id);
        cur = node.parent;
    }
    path.reverse();

    // A leaf sitting directly under a repeated ancestor (without being
    // repeated itself) is the anonymous element of that ancestor's list --
    // the standard 2- and 3-level list/map encodings both shape up this
    // way -- and never gets a field name of its own.
    let leaf_node = schema.node(leaf);
    let leaf_is_repeated = matches!(leaf_node.repetition, crate::basic::Repetition::Repeated);
    let parent_is_repeated = leaf_node
        .parent
        .map(|p| matches!(schema.node(p).repetition, crate::basic::Repetition::Repeated))
        .unwrap_or(false);
    let leaf_is_anonymous_element = !leaf_is_repeated && parent_is_repeated;

    // Fold from the leaf outward: the leaf's own name becomes the innermost
    // field, then each enclosing non-repeated group becomes another Struct
    // layer above it. Repeated groups never contribute a layer of their
    // own -- `build` already turned their repetition into the `List` this
    // is folding around.
    let last = path.len().saturating_sub(1);
    let mut current = value;
    for (depth, &id) in path.iter().enumerate().rev() {
        let node = schema.node(id);
        let should_wrap = if depth == last {
            !leaf_is_anonymous_element
        } else {
            matches!(node.kind, NodeKind::Group { .. }) && !matches!(node.repetition, crate::basic::Repetition::Repeated)
        };
        if should_wrap {
            current = Value::Struct(vec![(node.name.clone(), current)]);
        }
    }
    current
}

/// Merge two per-leaf partial trees for the same row into one combined
/// record. `Struct`s union by field name (recursing into shared fields);
/// `List`s from leaves under the same repeated ancestor are merged
/// element-wise since they share an element count by construction. A MAP's
/// `key`/`value` leaves never reach this function as a pair — they are
/// assembled into a single `Value::Map` up front by
/// `assemble_row_group` — so there is no `Map` case here to merge.
pub fn merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Null, other) | (other, Value::Null) => other,
        (Value::Struct(mut fa), Value::Struct(fb)) => {
            for (name, v) in fb {
                if let Some(existing) = fa.iter_mut().find(|(n, _)| *n == name) {
                    let taken = std::mem::replace(&mut existing.1, Value::Null);
                    existing.1 = merge(taken, v);
                } else {
                    fa.push((name, v));
                }
            }
            Value::Struct(fa)
        }
        (Value::List(va), Value::List(vb)) if va.len() == vb.len() => {
            Value::List(va.into_iter().zip(vb).map(|(x, y)| merge(x, y)).collect())
        }
        (other, _) => other,
    }
}

/// If `leaf` is a direct child of a MAP's `key_value` repeated group (slot 0
/// is `key`, slot 1 is `value` — the only two children that group ever
/// has), returns the enclosing MAP group's node id and which slot `leaf`
/// occupies. `assemble_row_group` uses this to find the sibling leaf that
/// must be assembled in lock-step with it rather than merged after the
/// fact.
fn map_key_value_child(schema: &Schema, leaf: NodeId) -> Option<(NodeId, usize)> {
    let parent_id = schema.node(leaf).parent?;
    let parent = schema.node(parent_id);
    if !matches!(parent.repetition, crate::basic::Repetition::Repeated) {
        return None;
    }
    let grandparent_id = parent.parent?;
    if !is_map_wrapper(schema.node(grandparent_id)) {
        return None;
    }
    let NodeKind::Group { children } = &parent.kind else {
        return None;
    };
    let slot = children.iter().position(|&c| c == leaf)?;
    Some((grandparent_id, slot))
}

/// Assemble one leaf column's batch into per-row values, taking the flat
/// fast path when the schema says the column can never be null or
/// repeated.
fn assemble_leaf_column_rows(schema: &Schema, leaf: NodeId, batch: &ColumnBatch) -> Result<Vec<Value>> {
    let is_flat = schema.column_for_node(leaf).map(|c| c.is_flat).unwrap_or(false);
    if is_flat {
        Ok(assemble_flat_leaf_rows(batch))
    } else {
        assemble_leaf_rows(schema, leaf, batch)
    }
}

/// Pair one row's independently-assembled key/value lists into the ordered
/// map entries spec 4.8 requires: both leaves share every ancestor up to
/// and including the `key_value` repeated group, so their presence and
/// element counts always agree when the file is well-formed.
fn zip_map_entries(key_row: Value, value_row: Value) -> Result<Value> {
    match (key_row, value_row) {
        (Value::Null, Value::Null) => Ok(Value::Null),
        (Value::List(keys), Value::List(values)) if keys.len() == values.len() => {
            Ok(Value::Map(keys.into_iter().zip(values).collect()))
        }
        _ => Err(fail!(Malformed, "map key/value columns disagree on presence or entry count")),
    }
}

/// Assemble one full row group into `Value::Struct` records, merging every
/// leaf column's contribution. Columns the schema marks `is_flat` skip the
/// Dremel assembler entirely and go straight from dense array to per-row
/// value; columns with nulls and/or repetition go through the full
/// ancestor-chain walk. The choice is made independently per projected
/// column, so a row group that mixes a scalar column and a nested list
/// column takes the fast path for the former and the general path for the
/// latter in the same call. A MAP's `key` and `value` leaves are detected
/// and paired up front — see `map_key_value_child` — and assembled into a
/// single `Value::Map` column instead of two independent `List` columns.
pub fn assemble_row_group(schema: &Schema, leaves: &[(NodeId, ColumnBatch)]) -> Result<Vec<Value>> {
    let mut consumed = vec![false; leaves.len()];
    let mut per_leaf_rows: Vec<Vec<Value>> = Vec::with_capacity(leaves.len());

    for i in 0..leaves.len() {
        if consumed[i] {
            continue;
        }
        let leaf = leaves[i].0;
        if let Some((map_group, slot)) = map_key_value_child(schema, leaf) {
            let partner = leaves.iter().enumerate().position(|(j, (other, _))| {
                j != i && !consumed[j] && map_key_value_child(schema, *other).map(|(g, _)| g) == Some(map_group)
            });
            if let Some(j) = partner {
                consumed[i] = true;
                consumed[j] = true;
                let (key_idx, value_idx) = if slot == 0 { (i, j) } else { (j, i) };
                let key_rows = assemble_leaf_column_rows(schema, leaves[key_idx].0, &leaves[key_idx].1)?;
                let value_rows = assemble_leaf_column_rows(schema, leaves[value_idx].0, &leaves[value_idx].1)?;
                if key_rows.len() != value_rows.len() {
                    return Err(fail!(Malformed, "map key/value columns disagree on row count"));
                }
                let maps: Vec<Value> = key_rows
                    .into_iter()
                    .zip(value_rows)
                    .map(|(k, v)| zip_map_entries(k, v))
                    .collect::<Result<_>>()?;
                let wrapped: Vec<Value> = maps.into_iter().map(|v| wrap_in_schema_path(schema, map_group, v)).collect();
                per_leaf_rows.push(wrapped);
                continue;
            }
        }
        let rows = assemble_leaf_column_rows(schema, leaf, &leaves[i].1)?;
        let wrapped: Vec<Value> = rows.into_iter().map(|v| wrap_in_schema_path(schema, leaf, v)).collect();
        per_leaf_rows.push(wrapped);
    }

    let num_rows = per_leaf_rows.first().map(|r| r.len()).unwrap_or(0);
    for rows in &per_leaf_rows {
        if rows.len() != num_rows {
            return Err(fail!(Malformed, "columns in row group disagree on row count"));
        }
    }
    let mut out = Vec::with_capacity(num_rows);
    for row_idx in 0..num_rows {
        let mut combined = Value::Null;
        for rows in &per_leaf_rows {
            combined = merge(combined, rows[row_idx].clone());
        }
        out.push(combined);
    }
    Ok(out)
}
