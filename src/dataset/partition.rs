use std::collections::HashSet;

use chrono::{DateTime, Timelike, Utc};

use super::{ColumnValues, DatasetError, Frame};

/// Which window of the current slice a run at `now` should analyse.
///
/// Rotates through `0..cycles` with the wall-clock minute, so a job firing
/// once a minute walks the windows in order and wraps around.
pub fn cycle_index(now: DateTime<Utc>, cycles: usize) -> usize {
    now.minute() as usize % cycles.max(1)
}

/// Rows `[size * i, size * (i + 1))` of `frame`.
///
/// No bounds checking: short frames yield a short (possibly empty) window.
pub fn window(frame: &Frame, i: usize, size: usize) -> Frame {
    let start = size.saturating_mul(i);
    frame.slice(start, start.saturating_add(size))
}

/// Splits one table into a static reference set and a windowed current set
/// by membership of a categorical column in a fixed value set.
#[derive(Debug, Clone)]
pub struct Partitioner {
    pub column: String,
    pub current_values: Vec<String>,
    pub window_size: usize,
}

/// Reference rows plus the full (unwindowed) current superset.
#[derive(Debug, Clone)]
pub struct Partition {
    pub reference: Frame,
    pub current: Frame,
    pub window_size: usize,
}

impl Partitioner {
    pub fn new(
        column: impl Into<String>,
        current_values: Vec<String>,
        window_size: usize,
    ) -> Self {
        Self {
            column: column.into(),
            current_values,
            window_size,
        }
    }

    /// Rows whose value is in the set become `current`; all others,
    /// missing values included, become `reference`.
    pub fn split(&self, frame: &Frame) -> Result<Partition, DatasetError> {
        let column = frame
            .column(&self.column)
            .ok_or_else(|| DatasetError::MissingColumn(self.column.clone()))?;
        let wanted: HashSet<&str> = self.current_values.iter().map(String::as_str).collect();

        let in_current: Vec<bool> = match &column.values {
            ColumnValues::Categorical(values) => values
                .iter()
                .map(|v| v.as_deref().is_some_and(|v| wanted.contains(v)))
                .collect(),
            ColumnValues::Numeric(values) => values
                .iter()
                .map(|v| v.is_some_and(|v| wanted.contains(v.to_string().as_str())))
                .collect(),
        };
        let in_reference: Vec<bool> = in_current.iter().map(|c| !c).collect();

        Ok(Partition {
            reference: frame.filter(&in_reference),
            current: frame.filter(&in_current),
            window_size: self.window_size,
        })
    }
}

impl Partition {
    /// The `i`-th window of the current superset.
    pub fn current_window(&self, i: usize) -> Frame {
        window(&self.current, i, self.window_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;
    use chrono::TimeZone;

    fn frame(rows: usize) -> Frame {
        let education = (0..rows)
            .map(|i| Some(if i % 2 == 0 { "HS-grad" } else { "Masters" }.to_string()))
            .collect();
        let age = (0..rows).map(|i| Some(i as f64)).collect();
        Frame::new(vec![
            Column::categorical("education", education),
            Column::numeric("age", age),
        ])
        .unwrap()
    }

    #[test]
    fn cycle_index_follows_minute() {
        let at = |m| Utc.with_ymd_and_hms(2024, 1, 1, 10, m, 0).unwrap();
        assert_eq!(cycle_index(at(0), 5), 0);
        assert_eq!(cycle_index(at(7), 5), 2);
        assert_eq!(cycle_index(at(59), 5), 4);
    }

    #[test]
    fn windows_cover_consecutive_rows() {
        let data = frame(500);
        for i in 0..5 {
            let w = window(&data, i, 100);
            assert_eq!(w.n_rows(), 100);
            let ages = w.column("age").unwrap().present_numbers();
            assert_eq!(ages.first().copied(), Some((100 * i) as f64));
            assert_eq!(ages.last().copied(), Some((100 * i + 99) as f64));
        }
    }

    #[test]
    fn windows_shrink_on_short_frames() {
        let data = frame(250);
        assert_eq!(window(&data, 2, 100).n_rows(), 50);
        assert_eq!(window(&data, 3, 100).n_rows(), 0);
    }

    #[test]
    fn split_routes_missing_values_to_reference() {
        let data = Frame::new(vec![Column::categorical(
            "education",
            vec![Some("HS-grad".into()), None, Some("Masters".into())],
        )])
        .unwrap();
        let partition = Partitioner::new("education", vec!["HS-grad".into()], 100)
            .split(&data)
            .unwrap();
        assert_eq!(partition.current.n_rows(), 1);
        assert_eq!(partition.reference.n_rows(), 2);
    }

    #[test]
    fn split_requires_the_column() {
        let result = Partitioner::new("missing", vec![], 100).split(&frame(10));
        assert!(matches!(result, Err(DatasetError::MissingColumn(_))));
    }
}
