//! Turns a collection of nested per-entity records into a rectangular table.
//!
//! The transform runs in two passes. The merge pass folds every record into a
//! [`SchemaTree`] and freezes the resulting [`ColumnLayout`]; the resolve pass
//! then reads each header path out of every entity's own record. Entities are
//! always visited in ascending identifier order so the column layout is the
//! same from run to run.

mod columns;
mod resolve;
mod schema;

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, warn};

use crate::bse::screener::error::{Result, ScreenerError};
use crate::bse::screener::model::{EntityId, Record, Scalar};

pub use columns::{ColumnLayout, HeaderGrid, assign_columns};
pub use resolve::resolve;
pub use schema::{SchemaTree, merge};

/// One entity's cells, one per column of the layout. `None` is a blank cell.
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedRow {
    pub entity: EntityId,
    pub cells: Vec<Option<Scalar>>,
}

/// An entity that was left out of the table, with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityFailure {
    pub entity: EntityId,
    pub message: String,
}

/// Header layout plus one row per entity, ready for a spreadsheet or table
/// writer.
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedTable {
    pub layout: ColumnLayout,
    pub rows: Vec<FlattenedRow>,
    pub failures: Vec<EntityFailure>,
}

/// Resolves every column of `layout` against `record`.
pub fn flatten_row(record: &Record, layout: &ColumnLayout) -> Vec<Option<Scalar>> {
    layout
        .paths()
        .iter()
        .map(|path| resolve(record, path).cloned())
        .collect()
}

/// Flattens already-converted records. Iterating a `BTreeMap` fixes the
/// entity order to ascending identifier.
pub fn flatten_records(records: &BTreeMap<EntityId, Record>) -> FlattenedTable {
    let schema = SchemaTree::from_records(records.values());
    let layout = assign_columns(&schema);
    debug!(
        entity_count = records.len(),
        column_count = layout.column_count(),
        header_rows = layout.grid().row_count(),
        "column layout frozen"
    );

    let rows = records
        .iter()
        .map(|(entity, record)| FlattenedRow {
            entity: entity.clone(),
            cells: flatten_row(record, &layout),
        })
        .collect();

    FlattenedTable {
        layout,
        rows,
        failures: Vec::new(),
    }
}

/// Flattens raw JSON entities. An entity whose value cannot be converted is
/// dropped and reported in [`FlattenedTable::failures`]; the rest of the
/// batch is unaffected.
pub fn flatten_entities<'a, I>(entities: I) -> FlattenedTable
where
    I: IntoIterator<Item = (&'a EntityId, &'a Value)>,
{
    let mut records = BTreeMap::new();
    let mut failures = Vec::new();

    for (entity, value) in entities {
        match Record::from_json(entity.as_str(), value) {
            Ok(record) => {
                records.insert(entity.clone(), record);
            }
            Err(error) => {
                warn!(entity = %entity, %error, "skipping entity");
                failures.push(EntityFailure {
                    entity: entity.clone(),
                    message: error.to_string(),
                });
            }
        }
    }

    let mut table = flatten_records(&records);
    failures.sort_by(|lhs, rhs| lhs.entity.cmp(&rhs.entity));
    table.failures = failures;
    table
}

/// Flattens a whole cache document: a JSON object keyed by entity identifier.
pub fn flatten_document(document: &Value) -> Result<FlattenedTable> {
    let Value::Object(object) = document else {
        return Err(ScreenerError::InvalidCache(
            "expected a JSON object keyed by entity identifier".into(),
        ));
    };

    let entities: Vec<(EntityId, &Value)> = object
        .iter()
        .map(|(key, value)| (EntityId::new(key.as_str()), value))
        .collect();
    Ok(flatten_entities(
        entities.iter().map(|(entity, value)| (entity, *value)),
    ))
}
