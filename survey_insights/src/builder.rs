pub use crate::config::*;

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;

/// A builder for declaring a survey and adding responses to it.
///
/// ```
/// use survey_insights::builder::Builder;
/// # use survey_insights::SchemaError;
/// # use chrono::{TimeZone, Utc};
///
/// let mut builder = Builder::new()
///     .categorical("team", &["Platform", "Product"])?
///     .in_section("about-you", None)?
///     .free_text("comment")?;
///
/// let at = Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap();
/// builder.add_response_simple(at, &[("team", "Platform"), ("comment", "Nice")])?;
///
/// assert_eq!(builder.schema().fields.len(), 2);
/// assert_eq!(builder.responses().len(), 1);
/// # Ok::<(), SchemaError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Builder {
    pub(crate) _fields: Vec<FieldSchema>,
    pub(crate) _responses: Vec<ResponseRecord>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Declares a field. Its display order is its position in the builder.
    pub fn field(self, id: &str, kind: FieldKind) -> Result<Builder, SchemaError> {
        if self._fields.iter().any(|f| f.id == id) {
            return Err(SchemaError::DuplicateField(id.to_string()));
        }
        let mut fields = self._fields;
        let order = fields.len() as i32 + 1;
        fields.push(FieldSchema {
            id: id.to_string(),
            kind,
            order,
            section: None,
            subsection: None,
        });
        Ok(Builder {
            _fields: fields,
            _responses: self._responses,
        })
    }

    /// A single-choice field whose option values are also the labels.
    pub fn categorical(self, id: &str, options: &[&str]) -> Result<Builder, SchemaError> {
        self.categorical_options(id, simple_options(options))
    }

    pub fn categorical_options(
        self,
        id: &str,
        options: Vec<FieldOption>,
    ) -> Result<Builder, SchemaError> {
        self.field(id, FieldKind::Categorical { options })
    }

    pub fn multiselect(self, id: &str, options: &[&str]) -> Result<Builder, SchemaError> {
        self.field(
            id,
            FieldKind::MultiSelect {
                options: simple_options(options),
            },
        )
    }

    /// A rating field with one option per step between `low` and `high` (inclusive).
    pub fn rating_scale(self, id: &str, low: u32, high: u32) -> Result<Builder, SchemaError> {
        let options = (low..=high)
            .map(|step| FieldOption::simple(&step.to_string()))
            .collect();
        self.field(id, FieldKind::Rating { options })
    }

    pub fn free_text(self, id: &str) -> Result<Builder, SchemaError> {
        self.field(id, FieldKind::FreeText)
    }

    /// Places the last declared field in a section (and optionally a subsection).
    pub fn in_section(
        self,
        section: &str,
        subsection: Option<&str>,
    ) -> Result<Builder, SchemaError> {
        let mut fields = self._fields;
        let last = fields.last_mut().ok_or(SchemaError::NoField)?;
        last.section = Some(section.to_string());
        last.subsection = subsection.map(|s| s.to_string());
        Ok(Builder {
            _fields: fields,
            _responses: self._responses,
        })
    }

    /// Adds a response with text values.
    ///
    /// The response gets a generated identifier.
    pub fn add_response_simple(
        &mut self,
        submitted_at: DateTime<Utc>,
        values: &[(&str, &str)],
    ) -> Result<(), SchemaError> {
        let id = format!("response-{:06}", self._responses.len() + 1);
        let typed: Vec<(&str, ResponseValue)> = values
            .iter()
            .map(|(fid, v)| (*fid, ResponseValue::Text(v.to_string())))
            .collect();
        self.add_response(&id, submitted_at, &typed)
    }

    /// Adds a response. Every value must refer to a declared field.
    pub fn add_response(
        &mut self,
        id: &str,
        submitted_at: DateTime<Utc>,
        values: &[(&str, ResponseValue)],
    ) -> Result<(), SchemaError> {
        let mut field_values: HashMap<String, ResponseValue> = HashMap::new();
        for (fid, v) in values.iter() {
            if !self._fields.iter().any(|f| f.id == *fid) {
                return Err(SchemaError::UnknownField(fid.to_string()));
            }
            field_values.insert(fid.to_string(), v.clone());
        }
        self.add_record(ResponseRecord {
            id: id.to_string(),
            field_values,
            submitted_at,
        })
    }

    pub fn add_record(&mut self, record: ResponseRecord) -> Result<(), SchemaError> {
        self._responses.push(record);
        Ok(())
    }

    pub fn schema(&self) -> SurveySchema {
        SurveySchema::new(self._fields.clone())
    }

    pub fn responses(&self) -> &[ResponseRecord] {
        &self._responses
    }

    /// Runs [crate::aggregate_on] over the responses added so far.
    pub fn aggregate_on(&self, filters: &ResponseFilters, today: NaiveDate) -> Aggregation {
        crate::aggregate_on(&self.schema(), &self._responses, filters, today)
    }
}

fn simple_options(options: &[&str]) -> Vec<FieldOption> {
    options.iter().map(|o| FieldOption::simple(o)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn rejects_duplicate_fields() {
        let res = Builder::new()
            .categorical("q", &["A"])
            .unwrap()
            .free_text("q");
        assert_eq!(res.err(), Some(SchemaError::DuplicateField("q".to_string())));
    }

    #[test]
    fn rejects_unknown_fields_in_responses() {
        let mut b = Builder::new().free_text("comment").unwrap();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            b.add_response_simple(at, &[("other", "x")]),
            Err(SchemaError::UnknownField("other".to_string()))
        );
        assert!(b.responses().is_empty());
    }

    #[test]
    fn section_needs_a_field() {
        assert_eq!(
            Builder::new().in_section("intro", None).err(),
            Some(SchemaError::NoField)
        );
    }

    #[test]
    fn rating_scale_and_order() {
        let b = Builder::new()
            .free_text("a")
            .unwrap()
            .rating_scale("r", 1, 3)
            .unwrap();
        let schema = b.schema();
        let r = schema.field("r").unwrap();
        assert_eq!(r.order, 2);
        let values: Vec<&str> = r.kind.options().iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, vec!["1", "2", "3"]);
    }

    #[test]
    fn aggregates_through_the_builder() {
        let mut b = Builder::new().categorical("q", &["A", "B"]).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap();
        b.add_response_simple(at, &[("q", "B")]).unwrap();
        let res = b.aggregate_on(
            &ResponseFilters::NONE,
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        );
        assert_eq!(res.distributions[0].buckets[1].count, 1);
        assert_eq!(res.totals.today_count, 1);
    }
}
