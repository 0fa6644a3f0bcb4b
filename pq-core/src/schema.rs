//! C3: the schema tree built from the footer's flattened preorder
//! `SchemaElement` list. Built as a plain arena (`Vec<Node>`
//! indexed by `NodeId`) rather than parent/child `Rc` pointers, since the
//! tree is immutable after construction and a flat arena is both simpler to
//! walk and free of reference cycles.

use crate::basic::{ConvertedType, LogicalType, PhysicalType, Repetition};
use crate::error::{fail, Result};
use crate::metadata::SchemaElementRaw;

pub type NodeId = u32;

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub repetition: Repetition,
    pub field_id: Option<i32>,
    pub converted_type: Option<ConvertedType>,
    pub logical_type: Option<LogicalType>,
    pub kind: NodeKind,
    pub max_def_level: u16,
    pub max_rep_level: u16,
    pub parent: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Primitive {
        physical_type: PhysicalType,
        type_length: Option<i32>,
    },
    Group {
        children: Vec<NodeId>,
    },
}

#[derive(Debug, Clone)]
pub struct Schema {
    nodes: Vec<Node>,
    root: NodeId,
    /// Leaf columns in the same left-to-right order pages are written in.
    pub columns: Vec<ColumnDescriptor>,
}

#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    pub node: NodeId,
    pub path: Vec<String>,
    pub physical_type: PhysicalType,
    pub type_length: Option<i32>,
    pub max_def_level: u16,
    pub max_rep_level: u16,
    pub logical_type: Option<LogicalType>,
    pub converted_type: Option<ConvertedType>,
    /// True when this column can never be null and is never repeated: takes
    /// the flat fast path (decode straight into a dense array with no level
    /// bookkeeping at all).
    pub is_flat: bool,
}

impl Schema {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Build the arena from the footer's flattened preorder listing. Element
    /// 0 is always the implicit root group; `num_children` on each group
    /// tells us how many of the following elements (each itself possibly a
    /// subtree) belong to it.
    pub fn build(elements: &[SchemaElementRaw]) -> Result<Schema> {
        if elements.is_empty() {
            return Err(fail!(InvalidFormat, "schema has no elements"));
        }
        let mut nodes = Vec::new();
        let mut cursor = 0usize;
        let root = build_node(elements, &mut cursor, None, &mut nodes)?;
        if cursor != elements.len() {
            return Err(fail!(
                InvalidFormat,
                "schema listing has {} trailing unconsumed elements",
                elements.len() - cursor
            ));
        }
        let mut columns = Vec::new();
        collect_columns(&nodes, root, &mut Vec::new(), &mut columns);
        Ok(Schema { nodes, root, columns })
    }

    pub fn column_by_path(&self, path: &[&str]) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.path.iter().map(String::as_str).eq(path.iter().copied()))
    }

    /// The leaf-column descriptor for a given schema node, if `node` is one
    /// of this schema's leaves. Lets code downstream of assembly (record
    /// assembly, the row reader) decide per column whether the flat fast
    /// path applies without re-walking the tree.
    pub fn column_for_node(&self, node: NodeId) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.node == node)
    }

    pub fn column_index_by_name(&self, dotted: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.path.join(".") == dotted)
    }

    /// Resolve a caller-supplied projection to the dense ordered list of
    /// original leaf-column indices it selects. Projecting a
    /// group name includes every descendant leaf under it; duplicates
    /// across overlapping names are collapsed, keeping the first
    /// occurrence's position so ordering follows the caller's input order.
    pub fn resolve_projection(&self, projection: &Projection) -> Result<Vec<usize>> {
        match projection {
            Projection::All => Ok((0..self.columns.len()).collect()),
            Projection::Columns(names) => {
                let mut out = Vec::new();
                for name in names {
                    for idx in self.match_projected_name(name)? {
                        if !out.contains(&idx) {
                            out.push(idx);
                        }
                    }
                }
                Ok(out)
            }
        }
    }

    fn match_projected_name(&self, name: &str) -> Result<Vec<usize>> {
        let prefix = format!("{name}.");
        let matched: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| {
                let path = c.path.join(".");
                path == name || path.starts_with(&prefix)
            })
            .map(|(i, _)| i)
            .collect();
        if matched.is_empty() {
            return Err(fail!(UnknownColumn, "no column or group named {name}"));
        }
        Ok(matched)
    }
}

/// The caller's choice of which leaf columns to read: either
/// everything, or an explicit, order-preserving list of top-level/dotted
/// field names. Projecting to a group name pulls in every descendant leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    All,
    Columns(Vec<String>),
}

impl Default for Projection {
    fn default() -> Self {
        Projection::All
    }
}

fn build_node(
    elements: &[SchemaElementRaw],
    cursor: &mut usize,
    parent: Option<NodeId>,
    nodes: &mut Vec<Node>,
) -> Result<NodeId> {
    if *cursor >= elements.len() {
        return Err(fail!(InvalidFormat, "schema listing truncated mid-tree"));
    }
    let elem = &elements[*cursor];
    *cursor += 1;

    // The root element is conventionally REQUIRED regardless of what its
    // repetition field says (it is usually simply absent).
    let repetition = if parent.is_none() {
        Repetition::Required
    } else {
        elem.repetition
            .ok_or_else(|| fail!(InvalidFormat, "non-root SchemaElement {} missing repetition_type", elem.name))?
    };

    let is_group = elem.physical_type.is_none();
    let id = nodes.len() as NodeId;
    // Reserve the slot so children can record this id as their parent
    // before we know our own final `kind`.
    nodes.push(Node {
        name: elem.name.clone(),
        repetition,
        field_id: elem.field_id,
        converted_type: elem.converted_type,
        logical_type: elem.logical_type.clone(),
        kind: NodeKind::Group { children: Vec::new() },
        max_def_level: 0,
        max_rep_level: 0,
        parent,
        });

    let (parent_def, parent_rep) = match parent {
        Some(p) => (nodes[p as usize].max_def_level, nodes[p as usize].max_rep_level),
        None => (0, 0),
    };
    // Both optional and repeated fields can be "missing" at this level (an
    // optional field can be null; a repeated field can occur zero times),
    // so both bump the definition level. Only repetition itself bumps the
    // repetition level.
    let def_bump = if matches!(repetition, Repetition::Optional | Repetition::Repeated) { 1 } else { 0 };
    let rep_bump = if matches!(repetition, Repetition::Repeated) { 1 } else { 0 };
    let max_def_level = parent_def + def_bump;
    let max_rep_level = parent_rep + rep_bump;
    nodes[id as usize].max_def_level = max_def_level;
    nodes[id as usize].max_rep_level = max_rep_level;

    if is_group {
        let num_children = elem
            .num_children
            .ok_or_else(|| fail!(InvalidFormat, "group SchemaElement {} missing num_children", elem.name))?;
        if num_children < 0 {
            return Err(fail!(InvalidFormat, "group SchemaElement {} has negative num_children", elem.name));
        }
        let mut children = Vec::with_capacity(num_children as usize);
        for _ in 0..num_children {
            children.push(build_node(elements, cursor, Some(id), nodes)?);
        }
        nodes[id as usize].kind = NodeKind::Group { children };
    } else {
        nodes[id as usize].kind = NodeKind::Primitive {
            physical_type: elem.physical_type.unwrap(),
            type_length: elem.type_length,
        };
    }
    Ok(id)
}

fn collect_columns(nodes: &[Node], id: NodeId, path: &mut Vec<String>, out: &mut Vec<ColumnDescriptor>) {
    let node = &nodes[id as usize];
    // The implicit file root's own name is not part of any column path.
    let is_root = node.parent.is_none();
    if !is_root {
        path.push(node.name.clone());
    }
    match &node.kind {
        NodeKind::Primitive { physical_type, type_length } => {
            let is_flat = node.max_def_level == 0 && node.max_rep_level == 0;
            out.push(ColumnDescriptor {
                node: id,
                path: path.clone(),
                physical_type: *physical_type,
                type_length: *type_length,
                max_def_level: node.max_def_level,
                max_rep_level: node.max_rep_level,
                logical_type: node.logical_type.clone(),
                converted_type: node.converted_type,
                is_flat,
            });
        }
        NodeKind::Group { children } => {
            for &child in children {
                collect_columns(nodes, child, path, out);
            }
        }
    }
    if !is_root {
        path.pop();
    }
}

/// True when a group node is the 3-level `LIST` wrapper (`LIST` converted
/// type or `LogicalType::List`, one repeated child group named `list`/`bag`
/// holding one child named `element`/`array`) as opposed to a plain 2-level
/// repeated-field encoding; used by the record assembler to decide how many
/// repetition levels to peel off when materializing a list value.
pub fn is_list_wrapper(node: &Node) -> bool {
    matches!(node.converted_type, Some(ConvertedType::List)) || matches!(node.logical_type, Some(LogicalType::List))
}

pub fn is_map_wrapper(node: &Node) -> bool {
    matches!(node.converted_type, Some(ConvertedType::Map) | Some(ConvertedType::MapKeyValue))
        || matches!(node.logical_type, Some(LogicalType::Map))
}
