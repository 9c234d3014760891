//! Row queries.
//!
//! A [`Query`] selects rows of one table by exact field equality, optionally
//! orders them by one field and starts at a scan offset. Scans without an
//! order follow key order, which is the only native order of the store.

use std::cmp::Ordering;

use serde_json::Value;

use crate::storage::blob::Row;
use crate::storage::types::TableName;

/// a selection over one table
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: TableName,
    /// `(field, value)` pairs every selected row must carry
    pub requirements: Vec<(String, Value)>,
    /// optional `(field, descending)` ordering
    pub order: Option<(String, bool)>,
    /// number of selected rows to skip
    pub offset: usize,
}

impl Query {
    pub fn new(table: TableName) -> Self {
        Self {
            table,
            requirements: Vec::new(),
            order: None,
            offset: 0,
        }
    }

    /// require `field` to equal `value`
    pub fn require(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.requirements.push((field.into(), value.into()));
        self
    }

    /// order by `field`, ascending
    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.order = Some((field.into(), false));
        self
    }

    /// order by `field`, descending
    pub fn order_by_desc(mut self, field: impl Into<String>) -> Self {
        self.order = Some((field.into(), true));
        self
    }

    /// start the scan after `offset` selected rows
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// run the selection over rows given in key order
    pub fn execute(&self, rows: impl IntoIterator<Item = Row>) -> RowIter {
        let mut selected: Vec<Row> = rows
            .into_iter()
            .filter(|row| row.matches_all(&self.requirements))
            .collect();

        if let Some((field, descending)) = &self.order {
            // stable, so ties keep key order
            selected.sort_by(|a, b| {
                let ordering = compare_values(a.get(field), b.get(field));
                if *descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        RowIter::new(selected, self.offset)
    }
}

/// total order over stored field values; missing values sort last
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or_default();
            let y = y.as_f64().unwrap_or_default();
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

/// rows produced by a query, tracking the scan position
///
/// the position counts every row handed out plus the starting offset, so a
/// caller that stops early can resume exactly after the last consumed row
#[derive(Debug)]
pub struct RowIter {
    rows: std::vec::IntoIter<Row>,
    position: usize,
}

impl RowIter {
    fn new(rows: Vec<Row>, offset: usize) -> Self {
        let mut rows = rows.into_iter();
        let skipped = rows.by_ref().take(offset).count();
        Self {
            rows,
            position: skipped,
        }
    }

    /// scan position after the last row handed out
    pub fn position(&self) -> usize {
        self.position
    }

    /// whether every selected row has been handed out
    pub fn is_exhausted(&self) -> bool {
        self.rows.len() == 0
    }
}

impl Iterator for RowIter {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        let row = self.rows.next()?;
        self.position += 1;
        Some(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::RowKey;
    use std::collections::BTreeMap;

    fn row(key: &str, spec: &str, created: &str) -> Row {
        let mut data = BTreeMap::new();
        data.insert("spec_id".to_string(), Value::String(spec.into()));
        data.insert("revision_create_time".to_string(), Value::String(created.into()));
        Row::new(RowKey::new(key).unwrap(), data)
    }

    fn fixture() -> Vec<Row> {
        vec![
            row("s1@aaaaaaaa", "s1", "2024-01-01T00:00:03.000000000Z"),
            row("s1@bbbbbbbb", "s1", "2024-01-01T00:00:01.000000000Z"),
            row("s1@cccccccc", "s1", "2024-01-01T00:00:02.000000000Z"),
            row("s2@dddddddd", "s2", "2024-01-01T00:00:04.000000000Z"),
        ]
    }

    fn keys(iter: RowIter) -> Vec<String> {
        iter.map(|r| r.key.as_str().to_string()).collect()
    }

    #[test]
    fn test_requirements_keep_key_order() {
        let query = Query::new(TableName::new("specs").unwrap()).require("spec_id", "s1");
        assert_eq!(
            keys(query.execute(fixture())),
            vec!["s1@aaaaaaaa", "s1@bbbbbbbb", "s1@cccccccc"]
        );
    }

    #[test]
    fn test_order_by_desc() {
        let query = Query::new(TableName::new("specs").unwrap())
            .require("spec_id", "s1")
            .order_by_desc("revision_create_time");
        assert_eq!(
            keys(query.execute(fixture())),
            vec!["s1@aaaaaaaa", "s1@cccccccc", "s1@bbbbbbbb"]
        );
    }

    #[test]
    fn test_position_tracks_offset_and_consumption() {
        let query = Query::new(TableName::new("specs").unwrap()).offset(1);
        let mut iter = query.execute(fixture());
        assert_eq!(iter.position(), 1);

        iter.next().unwrap();
        iter.next().unwrap();
        assert_eq!(iter.position(), 3);
        assert!(!iter.is_exhausted());

        iter.next().unwrap();
        assert!(iter.is_exhausted());
        assert_eq!(iter.next(), None);
        assert_eq!(iter.position(), 4);
    }

    #[test]
    fn test_offset_past_end() {
        let query = Query::new(TableName::new("specs").unwrap()).offset(10);
        let iter = query.execute(fixture());
        assert!(iter.is_exhausted());
        assert_eq!(iter.position(), 4);
    }

    #[test]
    fn test_compare_numbers_numerically() {
        let a = Value::from(9);
        let b = Value::from(10);
        assert_eq!(compare_values(Some(&a), Some(&b)), Ordering::Less);
        assert_eq!(compare_values(None, Some(&b)), Ordering::Greater);
    }
}
