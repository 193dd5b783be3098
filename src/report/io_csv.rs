// Primitives for reading CSV files.

use std::collections::HashMap;
use std::fs::File;

use crate::report::{
    io_common::{make_default_id, parse_timestamp, text_cell_value},
    *,
};

// Header names recognized for the submission time, compared in lowercase.
const TIMESTAMP_HEADERS: [&str; 5] = [
    "submittedat",
    "submitted_at",
    "timestamp",
    "completion time",
    "submitted",
];

pub fn read_csv_responses(
    path: &str,
    source: &ResponseSource,
    schema: &SurveySchema,
) -> ReportResult<Vec<ResponseRecord>> {
    let default_id = make_default_id(path);
    let delimiter = source.multiselect_delimiter();

    let (mut records, row_offset) = get_records(path, source)?;
    let header: Vec<String> = match records.next() {
        Some(line_r) => line_r
            .context(CsvLineParseSnafu {})?
            .iter()
            .map(|s| s.trim().to_string())
            .collect(),
        None => return Ok(vec![]),
    };
    debug!("read_csv_responses: header: {:?}", header);

    let id_idx_o = match source.id_column_index_int()? {
        Some(idx) => Some(idx),
        None => header.iter().position(|h| h.eq_ignore_ascii_case("id")),
    };
    let ts_idx = match source.submitted_at_column_index_int()? {
        Some(idx) => idx,
        None => header
            .iter()
            .position(|h| TIMESTAMP_HEADERS.contains(&h.to_lowercase().as_str()))
            .context(MissingTimestampColumnSnafu { path })?,
    };
    let field_cols = get_field_columns(&header, schema);
    debug!("read_csv_responses: field columns: {:?}", field_cols);

    // Rows between the header and the first row of values.
    for _ in 1..row_offset {
        _ = records.next();
    }

    let mut res: Vec<ResponseRecord> = Vec::new();
    for (idx, line_r) in records.enumerate() {
        let lineno = idx + row_offset + 1;
        let line = line_r.context(CsvLineParseSnafu {})?;
        if line.iter().all(|s| s.trim().is_empty()) {
            debug!("read_csv_responses: skipping blank line {}", lineno);
            continue;
        }
        let id = if let Some(id_idx) = id_idx_o {
            line.get(id_idx)
                .context(CsvLineTooShortSnafu { lineno })?
                .to_string()
        } else {
            default_id(lineno)
        };
        let ts_s = line.get(ts_idx).context(CsvLineTooShortSnafu { lineno })?;
        let submitted_at = parse_timestamp(ts_s).context(BadTimestampSnafu {
            lineno,
            content: ts_s,
        })?;

        let mut field_values: HashMap<String, ResponseValue> = HashMap::new();
        for (col_idx, field) in field_cols.iter() {
            // Short lines are missing values, not errors.
            let cell = line.get(*col_idx).unwrap_or("");
            field_values.insert(field.id.clone(), text_cell_value(field, cell, &delimiter));
        }
        res.push(ResponseRecord {
            id,
            field_values,
            submitted_at,
        });
    }
    debug!("read_csv_responses: {} responses in {:?}", res.len(), path);
    Ok(res)
}

/// Maps the columns of the header to the fields with the same id.
pub fn get_field_columns<'s>(header: &[String], schema: &'s SurveySchema) -> Vec<(usize, &'s FieldSchema)> {
    header
        .iter()
        .enumerate()
        .filter_map(|(idx, h)| schema.field(h).map(|f| (idx, f)))
        .collect()
}

fn get_records(
    path: &str,
    source: &ResponseSource,
) -> ReportResult<(csv::StringRecordsIntoIter<File>, usize)> {
    let first_row = source.first_value_row_index()?;
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    Ok((rdr.into_records(), first_row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use survey_insights::builder::Builder;

    fn schema() -> SurveySchema {
        Builder::new()
            .categorical("team", &["Platform", "Product"])
            .unwrap()
            .multiselect("tools", &["Rust", "Go"])
            .unwrap()
            .free_text("comment")
            .unwrap()
            .schema()
    }

    fn write(name: &str, contents: &str) -> String {
        let p = std::env::temp_dir().join(name);
        fs::write(&p, contents).unwrap();
        p.display().to_string()
    }

    #[test]
    fn reads_header_mapped_columns() {
        let path = write(
            "surveyviz-io-csv-header.csv",
            "id,Timestamp,team,tools,unrelated,comment\n\
             r1,2024-05-01T10:00:00Z,Platform,Rust;Go,x,fine\n\
             ,,,,,\n\
             r2,2024-05-02 09:30:00,product,,y\n",
        );
        let res = read_csv_responses(&path, &ResponseSource::default(), &schema()).unwrap();
        assert_eq!(res.len(), 2);
        assert_eq!(res[0].id, "r1");
        assert_eq!(
            res[0].value("tools"),
            Some(&ResponseValue::List(vec!["Rust".to_string(), "Go".to_string()]))
        );
        assert_eq!(res[1].value("tools"), Some(&ResponseValue::Empty));
        // The last column is missing on the short line.
        assert_eq!(res[1].value("comment"), Some(&ResponseValue::Empty));
        assert_eq!(res[1].value("unrelated"), None);
    }

    #[test]
    fn configured_columns_and_delimiter() {
        let path = write(
            "surveyviz-io-csv-config.csv",
            "when,team,tools\n\
             (explanation row),,\n\
             2024-05-01,Platform,Rust|Go\n",
        );
        let source = ResponseSource {
            submitted_at_column_index: Some(json!(1)),
            first_value_row_index: Some(json!(3)),
            multiselect_delimiter: Some("|".to_string()),
            ..ResponseSource::default()
        };
        let res = read_csv_responses(&path, &source, &schema()).unwrap();
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].id, "surveyviz-io-csv-config.csv-00000003");
        assert_eq!(
            res[0].value("tools"),
            Some(&ResponseValue::List(vec!["Rust".to_string(), "Go".to_string()]))
        );
    }

    #[test]
    fn needs_a_timestamp_column() {
        let path = write("surveyviz-io-csv-no-ts.csv", "team\nPlatform\n");
        let res = read_csv_responses(&path, &ResponseSource::default(), &schema());
        assert!(matches!(
            res,
            Err(ReportError::MissingTimestampColumn { .. })
        ));
    }
}
