//! Conversion between raw API records and entities.
//!
//! Field-name fallbacks are explicit ordered lists; the first key holding a
//! non-null value wins. Each list is covered by a test per branch.

use crate::entity::{Line, Service};
use crate::error::MappingError;
use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use tracing::debug;

/// A raw JSON object as exchanged with the provisioning API.
pub type RawRecord = Map<String, Value>;

/// Canonical number of a standalone line.
const LINE_NUMBER_FIELDS: &[&str] = &["number", "sdaNumber"];
/// Display number of a standalone line.
const LINE_DISPLAY_FIELDS: &[&str] = &["sdaNumber", "number"];
/// Canonical and display number of a line nested in a service.
const SERVICE_LINE_NUMBER_FIELDS: &[&str] = &["sdaNumber", "commercial", "number"];
/// Collection of lines nested in a service.
const SERVICE_LINES_FIELDS: &[&str] = &["sdaLists", "lines"];

/// Maps standalone line records (`/sdas` responses).
#[derive(Debug, Clone, Copy, Default)]
pub struct LineMapper;

impl LineMapper {
    /// Build a [`Line`] from a raw record.
    ///
    /// Requires `id`, one of `number`/`sdaNumber`, `releasedDate` and
    /// `enable`. `sdaUsage` defaults to empty, `status` is derived from
    /// `enable` when absent.
    pub fn map_to_entity(&self, raw: &RawRecord) -> Result<Line, MappingError> {
        let id = as_id("id", required(raw, "id")?)?;
        let (number_field, number) =
            first_present(raw, LINE_NUMBER_FIELDS).ok_or(MappingError::MissingField("sdaNumber"))?;
        let number = as_string(number_field, number)?;
        let sda_number = match first_present(raw, LINE_DISPLAY_FIELDS) {
            Some((field, value)) => as_string(field, value)?,
            None => number.clone(),
        };
        let released_at = parse_date("releasedDate", required(raw, "releasedDate")?)?;
        let enabled = as_bool("enable", required(raw, "enable")?)?;
        let usage = optional_string(raw, "sdaUsage")?.unwrap_or_default();
        let status = optional_string(raw, "status")?;

        Ok(Line::new(id, sda_number, usage, released_at, enabled, number, status))
    }

    /// Inverse of [`LineMapper::map_to_entity`]. Unknown raw fields are not
    /// reproduced.
    pub fn map_to_array(&self, line: &Line) -> RawRecord {
        let mut raw = RawRecord::new();
        raw.insert("id".into(), json!(line.id()));
        raw.insert("sdaNumber".into(), json!(line.sda_number()));
        raw.insert("sdaUsage".into(), json!(line.usage()));
        raw.insert("releasedDate".into(), json!(format_date(line.released_at())));
        raw.insert("enable".into(), json!(line.is_enabled()));
        raw.insert("number".into(), json!(line.number()));
        raw.insert("status".into(), json!(line.status()));
        raw
    }

    /// Map every record, failing on the first malformed one.
    pub fn map_all(&self, raws: &[RawRecord]) -> Result<Vec<Line>, MappingError> {
        raws.iter()
            .enumerate()
            .map(|(index, raw)| {
                self.map_to_entity(raw)
                    .map_err(|err| MappingError::at(index, err))
            })
            .collect()
    }
}

/// Maps service records (`/via-services` responses).
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceMapper;

impl ServiceMapper {
    /// Build a [`Service`] and its lines from a raw record.
    ///
    /// Nested lines are read leniently: `releasedDate` defaults to now,
    /// `enable` to true. A present but unparseable date still fails.
    pub fn map_to_entity(&self, raw: &RawRecord) -> Result<Service, MappingError> {
        let id = as_id("id", required(raw, "id")?)?;
        let label = as_string("label", required(raw, "label")?)?;
        let product = as_string("product", required(raw, "product")?)?;
        let enabled = as_bool("enable", required(raw, "enable")?)?;

        let mut service = Service::new(id, label, product, enabled);

        if let Some((field, lines)) = first_present(raw, SERVICE_LINES_FIELDS) {
            let lines = lines.as_array().ok_or(MappingError::InvalidType {
                field,
                expected: "array",
            })?;
            for (index, element) in lines.iter().enumerate() {
                let line = element
                    .as_object()
                    .ok_or(MappingError::InvalidType {
                        field,
                        expected: "array of objects",
                    })
                    .and_then(map_service_line)
                    .map_err(|err| MappingError::at(index, err))?;
                service.push_line(line);
            }
        }

        Ok(service)
    }

    /// Partial inverse of [`ServiceMapper::map_to_entity`].
    ///
    /// Lines are reduced to `id` and `commercial`: usage, release date and
    /// status do not survive a round trip.
    pub fn map_to_array(&self, service: &Service) -> RawRecord {
        let lines: Vec<Value> = service
            .lines()
            .iter()
            .map(|line| json!({ "id": line.id(), "commercial": line.number() }))
            .collect();

        let mut raw = RawRecord::new();
        raw.insert("id".into(), json!(service.id()));
        raw.insert("label".into(), json!(service.label()));
        raw.insert("product".into(), json!(service.product()));
        raw.insert("enable".into(), json!(service.is_enabled()));
        raw.insert("sdaLists".into(), Value::Array(lines));
        raw
    }

    /// Map every record, failing on the first malformed one.
    pub fn map_all(&self, raws: &[RawRecord]) -> Result<Vec<Service>, MappingError> {
        raws.iter()
            .enumerate()
            .map(|(index, raw)| {
                self.map_to_entity(raw)
                    .map_err(|err| MappingError::at(index, err))
            })
            .collect()
    }
}

fn map_service_line(raw: &RawRecord) -> Result<Line, MappingError> {
    let id = as_id("id", required(raw, "id")?)?;
    let (field, number) = first_present(raw, SERVICE_LINE_NUMBER_FIELDS)
        .ok_or(MappingError::MissingField("sdaNumber"))?;
    let number = as_string(field, number)?;
    let released_at = match raw.get("releasedDate").filter(|value| !value.is_null()) {
        Some(value) => parse_date("releasedDate", value)?,
        None => {
            debug!(line_id = id, "Line has no release date, defaulting to now");
            Utc::now().fixed_offset()
        }
    };
    let enabled = match raw.get("enable").filter(|value| !value.is_null()) {
        Some(value) => as_bool("enable", value)?,
        None => true,
    };
    let usage = optional_string(raw, "sdaUsage")?.unwrap_or_default();
    let status = optional_string(raw, "status")?;

    Ok(Line::new(id, number.clone(), usage, released_at, enabled, number, status))
}

/// ISO-8601 with explicit offset (`2024-01-15T10:30:00+00:00`).
///
/// Whole seconds only, the format the provisioning API emits and accepts;
/// sub-second precision does not survive a round trip.
pub(crate) fn format_date(date: DateTime<FixedOffset>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, false)
}

fn required<'a>(raw: &'a RawRecord, field: &'static str) -> Result<&'a Value, MappingError> {
    raw.get(field)
        .filter(|value| !value.is_null())
        .ok_or(MappingError::MissingField(field))
}

fn first_present<'a>(
    raw: &'a RawRecord,
    fields: &[&'static str],
) -> Option<(&'static str, &'a Value)> {
    fields.iter().find_map(|field| {
        raw.get(*field)
            .filter(|value| !value.is_null())
            .map(|value| (*field, value))
    })
}

fn optional_string(raw: &RawRecord, field: &'static str) -> Result<Option<String>, MappingError> {
    raw.get(field)
        .filter(|value| !value.is_null())
        .map(|value| as_string(field, value))
        .transpose()
}

fn as_id(field: &'static str, value: &Value) -> Result<i64, MappingError> {
    let invalid = MappingError::InvalidType {
        field,
        expected: "integer",
    };
    match value {
        Value::Number(n) => n.as_i64().ok_or(invalid),
        Value::String(s) => s.trim().parse().map_err(|_| invalid),
        _ => Err(invalid),
    }
}

fn as_string(field: &'static str, value: &Value) -> Result<String, MappingError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(MappingError::InvalidType {
            field,
            expected: "string",
        }),
    }
}

/// Accepts booleans, 0/1 and their string spellings.
fn as_bool(field: &'static str, value: &Value) -> Result<bool, MappingError> {
    let invalid = MappingError::InvalidType {
        field,
        expected: "boolean",
    };
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(invalid),
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" | "" => Ok(false),
            _ => Err(invalid),
        },
        _ => Err(invalid),
    }
}

/// RFC 3339 first; offset-less timestamps are read as UTC.
fn parse_date(field: &'static str, value: &Value) -> Result<DateTime<FixedOffset>, MappingError> {
    let text = value.as_str().ok_or(MappingError::InvalidType {
        field,
        expected: "date string",
    })?;

    DateTime::parse_from_rfc3339(text).or_else(|err| {
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"]
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
            .map(|naive| naive.and_utc().fixed_offset())
            .ok_or_else(|| MappingError::InvalidDate {
                field,
                value: text.to_string(),
                source: err,
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{STATUS_ACTIVE, STATUS_INACTIVE};

    fn record(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    fn raw_line() -> RawRecord {
        record(json!({
            "id": 12345,
            "sdaNumber": "+33123456789",
            "sdaUsage": "INBOUND",
            "releasedDate": "2024-01-15T10:30:00+00:00",
            "enable": true,
            "number": "0123456789",
            "status": "ACTIVE"
        }))
    }

    #[test]
    fn test_line_full_record() {
        let line = LineMapper.map_to_entity(&raw_line()).unwrap();

        assert_eq!(line.id(), 12345);
        assert_eq!(line.sda_number(), "+33123456789");
        assert_eq!(line.number(), "0123456789");
        assert_eq!(line.usage(), "INBOUND");
        assert_eq!(line.status(), "ACTIVE");
        assert!(line.is_enabled());
        assert_eq!(format_date(line.released_at()), "2024-01-15T10:30:00+00:00");
    }

    #[test]
    fn test_line_round_trip_preserves_fields() {
        let original = raw_line();
        let line = LineMapper.map_to_entity(&original).unwrap();
        let raw = LineMapper.map_to_array(&line);

        assert_eq!(raw, original);
    }

    #[test]
    fn test_line_round_trip_truncates_to_whole_seconds() {
        let mut original = raw_line();
        original.insert("releasedDate".into(), json!("2024-01-15T10:30:00.750+02:00"));

        let line = LineMapper.map_to_entity(&original).unwrap();
        let raw = LineMapper.map_to_array(&line);

        assert_eq!(raw["releasedDate"], json!("2024-01-15T10:30:00+02:00"));
    }

    #[test]
    fn test_line_round_trip_drops_unknown_fields() {
        let mut original = raw_line();
        original.insert("legacyId".into(), json!(9));

        let line = LineMapper.map_to_entity(&original).unwrap();
        let raw = LineMapper.map_to_array(&line);

        assert!(!raw.contains_key("legacyId"));
        assert_eq!(raw["id"], json!(12345));
        assert_eq!(raw["number"], json!("0123456789"));
    }

    #[test]
    fn test_line_status_derived_when_missing() {
        for (enable, expected) in [(true, STATUS_ACTIVE), (false, STATUS_INACTIVE)] {
            let mut raw = raw_line();
            raw.remove("status");
            raw.insert("enable".into(), json!(enable));

            let line = LineMapper.map_to_entity(&raw).unwrap();
            assert_eq!(line.status(), expected);
        }
    }

    #[test]
    fn test_line_null_status_is_derived() {
        let mut raw = raw_line();
        raw.insert("status".into(), Value::Null);
        raw.insert("enable".into(), json!(false));

        let line = LineMapper.map_to_entity(&raw).unwrap();
        assert_eq!(line.status(), STATUS_INACTIVE);
    }

    #[test]
    fn test_line_number_falls_back_to_sda_number() {
        let mut raw = raw_line();
        raw.remove("number");

        let line = LineMapper.map_to_entity(&raw).unwrap();
        assert_eq!(line.number(), "+33123456789");
        assert_eq!(line.sda_number(), "+33123456789");
    }

    #[test]
    fn test_line_display_number_falls_back_to_number() {
        let mut raw = raw_line();
        raw.remove("sdaNumber");

        let line = LineMapper.map_to_entity(&raw).unwrap();
        assert_eq!(line.sda_number(), "0123456789");
        assert_eq!(line.number(), "0123456789");
    }

    #[test]
    fn test_line_without_any_number_fails() {
        let mut raw = raw_line();
        raw.remove("sdaNumber");
        raw.remove("number");

        let err = LineMapper.map_to_entity(&raw).unwrap_err();
        assert!(matches!(err, MappingError::MissingField("sdaNumber")));
    }

    #[test]
    fn test_line_missing_id_fails() {
        let mut raw = raw_line();
        raw.remove("id");

        let err = LineMapper.map_to_entity(&raw).unwrap_err();
        assert!(matches!(err, MappingError::MissingField("id")));
    }

    #[test]
    fn test_line_missing_date_fails() {
        let mut raw = raw_line();
        raw.remove("releasedDate");

        let err = LineMapper.map_to_entity(&raw).unwrap_err();
        assert!(matches!(err, MappingError::MissingField("releasedDate")));
    }

    #[test]
    fn test_line_unparseable_date_fails() {
        let mut raw = raw_line();
        raw.insert("releasedDate".into(), json!("last tuesday"));

        let err = LineMapper.map_to_entity(&raw).unwrap_err();
        assert!(matches!(
            err,
            MappingError::InvalidDate { field: "releasedDate", ref value, .. } if value == "last tuesday"
        ));
    }

    #[test]
    fn test_line_accepts_offsetless_and_zulu_dates() {
        let mut raw = raw_line();
        raw.insert("releasedDate".into(), json!("2024-01-15T10:30:00"));
        let line = LineMapper.map_to_entity(&raw).unwrap();
        assert_eq!(format_date(line.released_at()), "2024-01-15T10:30:00+00:00");

        raw.insert("releasedDate".into(), json!("2024-01-15T10:30:00Z"));
        let line = LineMapper.map_to_entity(&raw).unwrap();
        assert_eq!(format_date(line.released_at()), "2024-01-15T10:30:00+00:00");

        raw.insert("releasedDate".into(), json!("2024-01-15T10:30:00+02:00"));
        let line = LineMapper.map_to_entity(&raw).unwrap();
        assert_eq!(format_date(line.released_at()), "2024-01-15T10:30:00+02:00");
    }

    #[test]
    fn test_line_boolean_like_enable() {
        for (value, expected) in [
            (json!(1), true),
            (json!(0), false),
            (json!("true"), true),
            (json!("0"), false),
        ] {
            let mut raw = raw_line();
            raw.remove("status");
            raw.insert("enable".into(), value);
            assert_eq!(LineMapper.map_to_entity(&raw).unwrap().is_enabled(), expected);
        }

        let mut raw = raw_line();
        raw.insert("enable".into(), json!("maybe"));
        assert!(matches!(
            LineMapper.map_to_entity(&raw),
            Err(MappingError::InvalidType { field: "enable", .. })
        ));
    }

    #[test]
    fn test_line_map_all_fails_fast_with_index() {
        let mut broken = raw_line();
        broken.remove("id");
        let raws = vec![raw_line(), broken, raw_line()];

        let err = LineMapper.map_all(&raws).unwrap_err();
        match err {
            MappingError::InvalidElement { index, source } => {
                assert_eq!(index, 1);
                assert!(matches!(*source, MappingError::MissingField("id")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_service_end_to_end_scenario() {
        let raw = record(json!({
            "id": 42,
            "label": "Main",
            "product": "voice",
            "enable": true,
            "sdaLists": [{
                "id": 1,
                "sdaNumber": "0100000001",
                "enable": true,
                "releasedDate": "2024-01-01T00:00:00+00:00"
            }]
        }));

        let service = ServiceMapper.map_to_entity(&raw).unwrap();

        assert_eq!(service.id(), 42);
        assert_eq!(service.label(), "Main");
        assert_eq!(service.product(), "voice");
        assert!(service.is_enabled());
        assert_eq!(service.lines().len(), 1);
        assert_eq!(service.lines()[0].number(), "0100000001");
        assert_eq!(service.lines()[0].status(), STATUS_ACTIVE);
    }

    #[test]
    fn test_service_without_lines() {
        let absent = record(json!({"id": 1, "label": "A", "product": "p", "enable": false}));
        let empty = record(json!({"id": 1, "label": "A", "product": "p", "enable": false, "sdaLists": []}));
        let null = record(json!({"id": 1, "label": "A", "product": "p", "enable": false, "sdaLists": null}));

        for raw in [absent, empty, null] {
            let service = ServiceMapper.map_to_entity(&raw).unwrap();
            assert!(service.lines().is_empty());
            assert!(!service.is_enabled());
        }
    }

    #[test]
    fn test_service_missing_required_field() {
        for field in ["id", "label", "product", "enable"] {
            let mut raw = record(json!({"id": 1, "label": "A", "product": "p", "enable": true}));
            raw.remove(field);
            let err = ServiceMapper.map_to_entity(&raw).unwrap_err();
            assert!(matches!(err, MappingError::MissingField(f) if f == field));
        }
    }

    #[test]
    fn test_service_line_number_fallback_order() {
        let raw = record(json!({
            "id": 1, "label": "A", "product": "p", "enable": true,
            "sdaLists": [
                {"id": 1, "sdaNumber": "s", "commercial": "c", "number": "n"},
                {"id": 2, "commercial": "c", "number": "n"},
                {"id": 3, "number": "n"}
            ]
        }));

        let service = ServiceMapper.map_to_entity(&raw).unwrap();
        let numbers: Vec<&str> = service.lines().iter().map(Line::number).collect();
        assert_eq!(numbers, vec!["s", "c", "n"]);
    }

    #[test]
    fn test_service_lines_alias_collection() {
        let raw = record(json!({
            "id": 1, "label": "A", "product": "p", "enable": true,
            "lines": [{"id": 5, "commercial": "0299999999"}]
        }));

        let service = ServiceMapper.map_to_entity(&raw).unwrap();
        assert_eq!(service.lines().len(), 1);
        assert_eq!(service.lines()[0].id(), 5);
    }

    #[test]
    fn test_service_line_defaults() {
        let before = Utc::now();
        let raw = record(json!({
            "id": 1, "label": "A", "product": "p", "enable": true,
            "sdaLists": [{"id": 5, "commercial": "0299999999"}]
        }));

        let service = ServiceMapper.map_to_entity(&raw).unwrap();
        let line = &service.lines()[0];

        assert!(line.is_enabled());
        assert_eq!(line.status(), STATUS_ACTIVE);
        assert_eq!(line.usage(), "");
        assert!(line.released_at() >= before - chrono::Duration::seconds(1));
    }

    #[test]
    fn test_service_line_missing_id_fails() {
        let raw = record(json!({
            "id": 1, "label": "A", "product": "p", "enable": true,
            "sdaLists": [{"id": 5, "commercial": "1"}, {"commercial": "2"}]
        }));

        let err = ServiceMapper.map_to_entity(&raw).unwrap_err();
        assert!(matches!(
            err,
            MappingError::InvalidElement { index: 1, ref source } if matches!(**source, MappingError::MissingField("id"))
        ));
    }

    #[test]
    fn test_service_line_bad_date_fails() {
        let raw = record(json!({
            "id": 1, "label": "A", "product": "p", "enable": true,
            "sdaLists": [{"id": 5, "commercial": "1", "releasedDate": "not a date"}]
        }));

        let err = ServiceMapper.map_to_entity(&raw).unwrap_err();
        assert!(matches!(
            err,
            MappingError::InvalidElement { index: 0, ref source } if matches!(**source, MappingError::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_service_lines_must_be_array() {
        let raw = record(json!({
            "id": 1, "label": "A", "product": "p", "enable": true,
            "sdaLists": {"id": 5}
        }));

        let err = ServiceMapper.map_to_entity(&raw).unwrap_err();
        assert!(matches!(err, MappingError::InvalidType { field: "sdaLists", .. }));
    }

    #[test]
    fn test_service_to_array_is_lossy_for_lines() {
        let raw = record(json!({
            "id": 42, "label": "Main", "product": "voice", "enable": true,
            "sdaLists": [{
                "id": 1,
                "sdaNumber": "0100000001",
                "sdaUsage": "INBOUND",
                "enable": false,
                "status": "SUSPENDED",
                "releasedDate": "2020-06-01T08:00:00+00:00"
            }]
        }));

        let service = ServiceMapper.map_to_entity(&raw).unwrap();
        let exported = ServiceMapper.map_to_array(&service);

        assert_eq!(
            Value::Object(exported.clone()),
            json!({
                "id": 42, "label": "Main", "product": "voice", "enable": true,
                "sdaLists": [{"id": 1, "commercial": "0100000001"}]
            })
        );

        // Usage, release date, enable and status of the lines are gone after
        // a round trip.
        let round_tripped = ServiceMapper.map_to_entity(&exported).unwrap();
        let line = &round_tripped.lines()[0];
        assert_eq!(line.id(), 1);
        assert_eq!(line.number(), "0100000001");
        assert_eq!(line.usage(), "");
        assert_eq!(line.status(), STATUS_ACTIVE);
        assert!(line.is_enabled());
        assert_ne!(format_date(line.released_at()), "2020-06-01T08:00:00+00:00");
    }

    #[test]
    fn test_service_map_all_reports_index() {
        let good = record(json!({"id": 1, "label": "A", "product": "p", "enable": true}));
        let bad = record(json!({"id": 2, "product": "p", "enable": true}));

        let err = ServiceMapper.map_all(&[good, bad]).unwrap_err();
        assert!(matches!(err, MappingError::InvalidElement { index: 1, .. }));
    }
}
