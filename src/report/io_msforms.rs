// Reading the Excel exports of Microsoft Forms (and Google Forms).

use calamine::{open_workbook, DataType, Reader, Xlsx};
use std::collections::HashMap;

use crate::report::{
    io_common::{excel_serial_to_datetime, make_default_id, parse_timestamp, text_cell_value},
    io_csv::get_field_columns,
    *,
};

// Preferred first: the completion time is the submission time.
const TIMESTAMP_HEADERS: [&str; 4] = ["Completion time", "Timestamp", "Submitted at", "Start time"];

pub fn read_msforms_responses(
    path: &str,
    source: &ResponseSource,
    schema: &SurveySchema,
) -> ReportResult<Vec<ResponseRecord>> {
    let default_id = make_default_id(path);
    let delimiter = source.multiselect_delimiter();

    let wrange = get_range(path, source)?;

    let header_row = wrange.rows().next().context(EmptyExcelSnafu { path })?;
    let header: Vec<String> = header_row
        .iter()
        .map(|dt| match dt {
            DataType::String(s) => s.trim().to_string(),
            _ => String::new(),
        })
        .collect();
    debug!("read_msforms_responses: header: {:?}", header);

    let id_idx_o = match source.id_column_index_int()? {
        Some(idx) => Some(idx),
        None => header.iter().position(|h| h == "ID" || h == "Id"),
    };
    let ts_idx = match source.submitted_at_column_index_int()? {
        Some(idx) => idx,
        None => TIMESTAMP_HEADERS
            .iter()
            .find_map(|name| header.iter().position(|h| h.eq_ignore_ascii_case(name)))
            .context(MissingTimestampColumnSnafu { path })?,
    };
    let field_cols = get_field_columns(&header, schema);
    debug!("read_msforms_responses: field columns: {:?}", field_cols);
    if field_cols.is_empty() {
        warn!(
            "read_msforms_responses: no column of {:?} matches a field of the schema",
            path
        );
    }

    let first_row = source.first_value_row_index()?;
    let mut res: Vec<ResponseRecord> = Vec::new();
    for (idx, row) in wrange.rows().enumerate().skip(first_row) {
        let lineno = idx + 1;
        if row.iter().all(|c| matches!(c, DataType::Empty)) {
            continue;
        }
        let id = match id_idx_o.and_then(|i| row.get(i)) {
            Some(DataType::String(s)) => s.clone(),
            Some(DataType::Int(i)) => i.to_string(),
            Some(DataType::Float(f)) => f.to_string(),
            _ => default_id(lineno),
        };
        let submitted_at = read_timestamp_cell(row.get(ts_idx), lineno)?;

        let mut field_values: HashMap<String, ResponseValue> = HashMap::new();
        for (col_idx, field) in field_cols.iter() {
            let v = match row.get(*col_idx) {
                None | Some(DataType::Empty) => ResponseValue::Empty,
                Some(DataType::String(s)) => text_cell_value(field, s, &delimiter),
                Some(DataType::Int(i)) => ResponseValue::Number(*i as f64),
                Some(DataType::Float(f)) => ResponseValue::Number(*f),
                Some(DataType::Bool(b)) => ResponseValue::Bool(*b),
                Some(x) => {
                    return ExcelWrongCellTypeSnafu {
                        lineno,
                        content: format!("{:?} IN {:?}", x, row),
                    }
                    .fail();
                }
            };
            field_values.insert(field.id.clone(), v);
        }
        res.push(ResponseRecord {
            id,
            field_values,
            submitted_at,
        });
    }
    debug!("read_msforms_responses: {} responses in {:?}", res.len(), path);
    Ok(res)
}

fn read_timestamp_cell(cell: Option<&DataType>, lineno: usize) -> ReportResult<DateTime<Utc>> {
    let parsed = match cell {
        Some(DataType::DateTime(serial)) | Some(DataType::Float(serial)) => {
            excel_serial_to_datetime(*serial)
        }
        Some(DataType::String(s)) => parse_timestamp(s),
        _ => None,
    };
    parsed.context(BadTimestampSnafu {
        lineno,
        content: format!("{:?}", cell),
    })
}

fn get_range(path: &str, source: &ResponseSource) -> ReportResult<calamine::Range<DataType>> {
    let worksheet_name_o = source.excel_worksheet_name.clone();
    debug!(
        "get_range: path: {:?} worksheet: {:?}",
        &path, &worksheet_name_o
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet_name) = worksheet_name_o {
        let wrange = workbook
            .worksheet_range(&worksheet_name)
            .context(EmptyExcelSnafu { path })?
            .context(OpeningExcelSnafu { path })?;
        Ok(wrange)
    } else {
        let all_worksheets = workbook.worksheets();
        match all_worksheets.as_slice() {
            [] => EmptyExcelSnafu { path }.fail(),
            [(worksheet_name, wrange)] => {
                debug!("get_range: path: {:?} worksheet: {:?}", &path, &worksheet_name);
                Ok(wrange.clone())
            }
            _ => AmbiguousWorksheetSnafu { path }.fail(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_cells() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(
            read_timestamp_cell(Some(&DataType::DateTime(45413.5)), 2).unwrap(),
            expected
        );
        assert_eq!(
            read_timestamp_cell(Some(&DataType::String("5/1/24 12:00:00".to_string())), 2)
                .unwrap(),
            expected
        );
        assert!(matches!(
            read_timestamp_cell(Some(&DataType::Empty), 7),
            Err(ReportError::BadTimestamp { lineno: 7, .. })
        ));
        assert!(read_timestamp_cell(None, 7).is_err());
    }

    #[test]
    fn missing_workbook() {
        let res = read_msforms_responses(
            "/nonexistent/surveyviz.xlsx",
            &ResponseSource::default(),
            &SurveySchema::default(),
        );
        assert!(matches!(res, Err(ReportError::OpeningExcel { .. })));
    }
}
