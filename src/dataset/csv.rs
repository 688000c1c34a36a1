use std::io::Read;

use ::csv::{ReaderBuilder, Trim};

use super::{Column, DatasetError, Frame};

/// Cell contents treated as missing values.
pub const MISSING_MARKERS: &[&str] = &["", "?"];

/// Parse a headed CSV document into a [`Frame`].
///
/// A column is numeric when every non-missing cell parses as `f64`;
/// otherwise it is categorical. Quoted headers and cells are unquoted and
/// trimmed.
pub fn parse_csv<R: Read>(reader: R) -> Result<Frame, DatasetError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() {
        return Err(DatasetError::Malformed("CSV has no header row".to_string()));
    }

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for record in rdr.records() {
        let record = record?;
        for (i, column) in cells.iter_mut().enumerate() {
            let raw = record.get(i).unwrap_or("");
            column.push(if MISSING_MARKERS.contains(&raw) {
                None
            } else {
                Some(raw.to_string())
            });
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, values)| infer_column(name, values))
        .collect();

    Frame::new(columns)
}

fn infer_column(name: String, values: Vec<Option<String>>) -> Column {
    let parsed: Option<Vec<Option<f64>>> = values
        .iter()
        .map(|cell| match cell {
            None => Some(None),
            Some(s) => s.parse::<f64>().ok().filter(|x| x.is_finite()).map(Some),
        })
        .collect();

    match parsed {
        Some(numbers) if numbers.iter().any(Option::is_some) => Column::numeric(name, numbers),
        _ => Column::categorical(name, values),
    }
}
