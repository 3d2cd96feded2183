use crate::bse::screener::model::{MAX_DEPTH, Record};

/// Union of the structure of every record merged so far.
///
/// The tree only ever grows: keys are never removed, sequences never shrink,
/// and the first scalar seen at a position is the one that is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaTree {
    root: Record,
}

impl Default for SchemaTree {
    fn default() -> Self {
        Self {
            root: Record::empty_mapping(),
        }
    }
}

impl SchemaTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the schema by folding [`merge`] over `records` in iteration
    /// order. Key order in the result follows that order.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a Record>,
    {
        records.into_iter().fold(Self::new(), |schema, record| merge(record, schema))
    }

    pub fn root(&self) -> &Record {
        &self.root
    }

    /// Merges one record into the schema in place.
    pub fn merge(&mut self, record: &Record) {
        merge_into(&mut self.root, record, 0);
    }

    /// Number of leaf positions, counting each empty container once.
    pub fn leaf_count(&self) -> usize {
        leaf_count(&self.root, 0)
    }
}

/// Combines `record` into `schema`, returning the grown schema.
pub fn merge(record: &Record, mut schema: SchemaTree) -> SchemaTree {
    schema.merge(record);
    schema
}

fn merge_into(schema: &mut Record, record: &Record, depth: usize) {
    if depth >= MAX_DEPTH {
        return;
    }

    match (schema, record) {
        (Record::Mapping(known), Record::Mapping(incoming)) => {
            for (key, value) in incoming.iter() {
                match known.get_mut(key) {
                    Some(slot) => merge_into(slot, value, depth + 1),
                    None => {
                        known.insert(key, value.clone());
                    }
                }
            }
        }
        (Record::Sequence(known), Record::Sequence(incoming)) => {
            for (slot, value) in known.iter_mut().zip(incoming) {
                merge_into(slot, value, depth + 1);
            }
            let seen = known.len();
            if incoming.len() > seen {
                known.extend(incoming[seen..].iter().cloned());
            }
        }
        (slot, incoming) => {
            if expands_shape(slot, incoming) {
                *slot = incoming.clone();
            }
        }
    }
}

// A populated container replaces a scalar or an empty container of the other
// kind. Two populated containers of different kinds keep the first one.
fn expands_shape(known: &Record, incoming: &Record) -> bool {
    let incoming_populated = incoming.is_container() && !incoming.is_empty_container();
    let known_placeholder = !known.is_container() || known.is_empty_container();
    incoming_populated && known_placeholder
}

pub(crate) fn leaf_count(node: &Record, depth: usize) -> usize {
    if depth >= MAX_DEPTH {
        return 1;
    }
    match node {
        Record::Mapping(mapping) if !mapping.is_empty() => mapping
            .iter()
            .map(|(_, child)| leaf_count(child, depth + 1))
            .sum(),
        Record::Sequence(items) if !items.is_empty() => {
            items.iter().map(|child| leaf_count(child, depth + 1)).sum()
        }
        _ => 1,
    }
}
