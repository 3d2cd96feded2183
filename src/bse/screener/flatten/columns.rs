use std::collections::{BTreeMap, HashMap};

use crate::bse::screener::flatten::schema::SchemaTree;
use crate::bse::screener::model::{HeaderPath, MAX_DEPTH, PathSegment, Record};

/// Stacked header labels, one row per tree depth.
///
/// A label sits in the first column of the span its key covers; the cells to
/// its right within that span are blank on that row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HeaderGrid {
    rows: usize,
    width: usize,
    labels: BTreeMap<(usize, usize), String>,
}

impl HeaderGrid {
    /// Number of header rows (the depth of the deepest labelled key + 1).
    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Number of columns the grid spans.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Label at `(row, column)`, if that cell starts a key's span.
    pub fn label(&self, row: usize, column: usize) -> Option<&str> {
        self.labels.get(&(row, column)).map(String::as_str)
    }

    /// Row-major view of the grid, `None` where a cell is blank.
    pub fn rows(&self) -> Vec<Vec<Option<&str>>> {
        (0..self.rows)
            .map(|row| (0..self.width).map(|column| self.label(row, column)).collect())
            .collect()
    }
}

/// Frozen header-path → column assignment derived from a [`SchemaTree`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnLayout {
    paths: Vec<HeaderPath>,
    index: HashMap<HeaderPath, usize>,
    grid: HeaderGrid,
}

impl ColumnLayout {
    /// Number of leaf columns.
    pub fn column_count(&self) -> usize {
        self.paths.len()
    }

    /// Header paths in column order.
    pub fn paths(&self) -> &[HeaderPath] {
        &self.paths
    }

    /// Header path of `column`.
    pub fn path(&self, column: usize) -> Option<&HeaderPath> {
        self.paths.get(column)
    }

    /// Column assigned to `path`; `None` when the path is not a leaf.
    pub fn column_of(&self, path: &HeaderPath) -> Option<usize> {
        self.index.get(path).copied()
    }

    /// Stacked header labels for this layout.
    pub fn grid(&self) -> &HeaderGrid {
        &self.grid
    }
}

/// Assigns one column per leaf of `schema` using a depth-first, key-order
/// traversal. Scalars and empty containers each take exactly one column.
pub fn assign_columns(schema: &SchemaTree) -> ColumnLayout {
    let mut builder = LayoutBuilder::default();
    builder.visit(schema.root(), HeaderPath::root(), 0);
    builder.finish()
}

#[derive(Default)]
struct LayoutBuilder {
    paths: Vec<HeaderPath>,
    labels: BTreeMap<(usize, usize), String>,
    rows: usize,
}

impl LayoutBuilder {
    /// Visits `node` and returns the number of columns it consumed.
    fn visit(&mut self, node: &Record, path: HeaderPath, depth: usize) -> usize {
        let start = self.paths.len();
        match node {
            Record::Mapping(mapping) if !mapping.is_empty() && depth < MAX_DEPTH => {
                let mut consumed = 0;
                for (key, child) in mapping.iter() {
                    self.label(depth, start + consumed, key.to_string());
                    consumed += self.visit(child, path.child(PathSegment::from(key)), depth + 1);
                }
                consumed
            }
            Record::Sequence(items) if !items.is_empty() && depth < MAX_DEPTH => {
                let mut consumed = 0;
                for (position, child) in items.iter().enumerate() {
                    self.label(depth, start + consumed, position.to_string());
                    consumed += self.visit(child, path.child(PathSegment::Index(position)), depth + 1);
                }
                consumed
            }
            _ => {
                self.paths.push(path);
                1
            }
        }
    }

    fn label(&mut self, row: usize, column: usize, text: String) {
        self.rows = self.rows.max(row + 1);
        self.labels.insert((row, column), text);
    }

    fn finish(self) -> ColumnLayout {
        let index = self
            .paths
            .iter()
            .enumerate()
            .map(|(column, path)| (path.clone(), column))
            .collect();
        let grid = HeaderGrid {
            rows: self.rows,
            width: self.paths.len(),
            labels: self.labels,
        };
        ColumnLayout {
            paths: self.paths,
            index,
            grid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bse::screener::model::{Mapping, Scalar};
    use serde_json::json;

    fn schema_of(value: serde_json::Value) -> SchemaTree {
        let record = Record::from_json("test", &value).expect("record converted");
        SchemaTree::from_records([&record])
    }

    fn path(segments: &[&str]) -> HeaderPath {
        segments.iter().copied().collect()
    }

    #[test]
    fn columns_follow_depth_first_key_order() {
        let schema = schema_of(json!({
            "quote": {"price": 1, "mktCap": {"value": 2, "in": "Cr"}},
            "name": "x"
        }));
        let layout = assign_columns(&schema);

        let rendered: Vec<String> = layout.paths().iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec!["quote.price", "quote.mktCap.value", "quote.mktCap.in", "name"]
        );
        assert_eq!(layout.column_of(&path(&["quote", "mktCap", "in"])), Some(2));
        assert_eq!(layout.column_count(), schema.leaf_count());
    }

    #[test]
    fn header_grid_stacks_one_row_per_depth() {
        let schema = schema_of(json!({
            "quote": {"price": 1, "mktCap": {"value": 2, "in": "Cr"}},
            "name": "x"
        }));
        let layout = assign_columns(&schema);

        assert_eq!(
            layout.grid().rows(),
            vec![
                vec![Some("quote"), None, None, Some("name")],
                vec![Some("price"), Some("mktCap"), None, None],
                vec![None, Some("value"), Some("in"), None],
            ]
        );
    }

    #[test]
    fn sequence_positions_become_index_columns() {
        let schema = schema_of(json!({"peers": [{"PE": 1}, {"PE": 2, "EPS": 3}]}));
        let layout = assign_columns(&schema);

        let rendered: Vec<String> = layout.paths().iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["peers.0.PE", "peers.1.PE", "peers.1.EPS"]);
        assert_eq!(layout.grid().label(1, 1), Some("1"));
        assert_eq!(
            layout.column_of(&HeaderPath::new(vec![
                "peers".into(),
                PathSegment::Index(1),
                "EPS".into()
            ])),
            Some(2)
        );
    }

    #[test]
    fn empty_containers_reserve_a_column() {
        let schema = schema_of(json!({"peers": [], "holdings": {}, "name": "x"}));
        let layout = assign_columns(&schema);

        assert_eq!(layout.column_count(), 3);
        assert_eq!(layout.grid().row_count(), 1);
        assert_eq!(layout.path(0), Some(&path(&["peers"])));
    }

    #[test]
    fn empty_schema_still_has_one_column() {
        let layout = assign_columns(&SchemaTree::new());
        assert_eq!(layout.column_count(), 1);
        assert_eq!(layout.path(0), Some(&HeaderPath::root()));
        assert_eq!(layout.grid().row_count(), 0);
    }

    #[test]
    fn hand_built_records_past_the_depth_cap_collapse_to_one_leaf() {
        let mut record = Record::Scalar(Scalar::String("leaf".into()));
        for _ in 0..MAX_DEPTH + 10 {
            let mut mapping = Mapping::new();
            mapping.insert("nested", record);
            record = Record::Mapping(mapping);
        }

        let schema = crate::bse::screener::flatten::merge(&record, SchemaTree::new());
        let layout = assign_columns(&schema);

        assert_eq!(schema.leaf_count(), 1);
        assert_eq!(layout.column_count(), 1);
        assert_eq!(layout.grid().row_count(), MAX_DEPTH);
        assert_eq!(layout.path(0).map(HeaderPath::len), Some(MAX_DEPTH));
    }
}
