// Reading responses stored as a JSON array.

use std::collections::HashMap;

use serde_json::Map as JSMap;

use crate::report::{
    io_common::{make_default_id, parse_timestamp},
    *,
};

#[derive(Debug, Clone, Deserialize)]
struct JsonResponse {
    id: Option<String>,
    #[serde(rename = "submittedAt")]
    submitted_at: String,
    #[serde(default)]
    values: JSMap<String, JSValue>,
}

pub fn read_json_responses(path: &str, schema: &SurveySchema) -> ReportResult<Vec<ResponseRecord>> {
    let default_id = make_default_id(path);
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let raw: Vec<JsonResponse> =
        serde_json::from_str(&contents).context(ParsingJsonSnafu { path })?;

    let mut res: Vec<ResponseRecord> = Vec::new();
    for (idx, jr) in raw.into_iter().enumerate() {
        let lineno = idx + 1;
        let submitted_at = parse_timestamp(&jr.submitted_at).context(BadTimestampSnafu {
            lineno,
            content: jr.submitted_at.clone(),
        })?;
        let mut field_values: HashMap<String, ResponseValue> = HashMap::new();
        for (fid, jsv) in jr.values.iter() {
            if schema.field(fid).is_none() {
                debug!("read_json_responses: {}: ignoring unknown field {:?}", lineno, fid);
                continue;
            }
            field_values.insert(fid.clone(), json_value(fid, jsv, lineno)?);
        }
        res.push(ResponseRecord {
            id: jr.id.unwrap_or_else(|| default_id(lineno)),
            field_values,
            submitted_at,
        });
    }
    debug!("read_json_responses: {} responses in {:?}", res.len(), path);
    Ok(res)
}

fn json_value(field_id: &str, jsv: &JSValue, lineno: usize) -> ReportResult<ResponseValue> {
    let v = match jsv {
        JSValue::Null => ResponseValue::Empty,
        JSValue::String(s) => ResponseValue::Text(s.clone()),
        JSValue::Bool(b) => ResponseValue::Bool(*b),
        JSValue::Number(n) => match n.as_f64() {
            Some(f) => ResponseValue::Number(f),
            None => whatever!("Response {}: cannot read number {} of {:?}", lineno, n, field_id),
        },
        JSValue::Array(elts) => {
            let mut l: Vec<String> = Vec::new();
            for elt in elts.iter() {
                match elt {
                    JSValue::String(s) => l.push(s.clone()),
                    JSValue::Number(n) => l.push(n.to_string()),
                    JSValue::Bool(b) => l.push(b.to_string()),
                    JSValue::Null => {}
                    x => whatever!("Response {}: unexpected selection {} in {:?}", lineno, x, field_id),
                }
            }
            ResponseValue::List(l)
        }
        JSValue::Object(_) => {
            whatever!("Response {}: unexpected value {} for {:?}", lineno, jsv, field_id)
        }
    };
    Ok(v)
}
