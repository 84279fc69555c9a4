//! Field codec layer: wire string encode/decode per field type
//!
//! Every supported field type maps to one `FieldType` discriminant. The
//! remote stores all field values as strings; `encode` produces exactly the
//! string the remote expects and `decode` inverts it for every value the
//! remote can legally return. List types encode as a JSON array of the
//! scalar encoding of each element.

use crate::error::{Error, Result};
use crate::value::{Measurement, Value};
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire type tag for a declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    SingleLineText,
    SingleLineTextList,
    MultiLineText,
    Url,
    UrlList,
    Integer,
    IntegerList,
    Decimal,
    DecimalList,
    Date,
    DateList,
    DateTime,
    DateTimeList,
    Dimension,
    DimensionList,
    Volume,
    VolumeList,
    Weight,
    WeightList,
    ProductReference,
    ProductReferenceList,
    FileReference,
    FileReferenceList,
    EntityReference,
}

impl FieldType {
    /// The exact type tag the remote service uses for this field type
    pub fn wire_name(&self) -> &'static str {
        match self {
            FieldType::SingleLineText => "single_line_text_field",
            FieldType::SingleLineTextList => "list.single_line_text_field",
            FieldType::MultiLineText => "multi_line_text_field",
            FieldType::Url => "url",
            FieldType::UrlList => "list.url",
            FieldType::Integer => "number_integer",
            FieldType::IntegerList => "list.number_integer",
            FieldType::Decimal => "number_decimal",
            FieldType::DecimalList => "list.number_decimal",
            FieldType::Date => "date",
            FieldType::DateList => "list.date",
            FieldType::DateTime => "date_time",
            FieldType::DateTimeList => "list.date_time",
            FieldType::Dimension => "dimension",
            FieldType::DimensionList => "list.dimension",
            FieldType::Volume => "volume",
            FieldType::VolumeList => "list.volume",
            FieldType::Weight => "weight",
            FieldType::WeightList => "list.weight",
            FieldType::ProductReference => "product_reference",
            FieldType::ProductReferenceList => "list.product_reference",
            FieldType::FileReference => "file_reference",
            FieldType::FileReferenceList => "list.file_reference",
            FieldType::EntityReference => "entity_reference",
        }
    }

    /// Look a field type up by its remote type tag
    pub fn from_wire_name(name: &str) -> Option<FieldType> {
        let ty = match name {
            "single_line_text_field" => FieldType::SingleLineText,
            "list.single_line_text_field" => FieldType::SingleLineTextList,
            "multi_line_text_field" => FieldType::MultiLineText,
            "url" => FieldType::Url,
            "list.url" => FieldType::UrlList,
            "number_integer" => FieldType::Integer,
            "list.number_integer" => FieldType::IntegerList,
            "number_decimal" => FieldType::Decimal,
            "list.number_decimal" => FieldType::DecimalList,
            "date" => FieldType::Date,
            "list.date" => FieldType::DateList,
            "date_time" => FieldType::DateTime,
            "list.date_time" => FieldType::DateTimeList,
            "dimension" => FieldType::Dimension,
            "list.dimension" => FieldType::DimensionList,
            "volume" => FieldType::Volume,
            "list.volume" => FieldType::VolumeList,
            "weight" => FieldType::Weight,
            "list.weight" => FieldType::WeightList,
            "product_reference" => FieldType::ProductReference,
            "list.product_reference" => FieldType::ProductReferenceList,
            "file_reference" => FieldType::FileReference,
            "list.file_reference" => FieldType::FileReferenceList,
            "entity_reference" => FieldType::EntityReference,
            _ => return None,
        };
        Some(ty)
    }

    /// The element type for list variants, `None` for scalar types
    pub fn element_type(&self) -> Option<FieldType> {
        let elem = match self {
            FieldType::SingleLineTextList => FieldType::SingleLineText,
            FieldType::UrlList => FieldType::Url,
            FieldType::IntegerList => FieldType::Integer,
            FieldType::DecimalList => FieldType::Decimal,
            FieldType::DateList => FieldType::Date,
            FieldType::DateTimeList => FieldType::DateTime,
            FieldType::DimensionList => FieldType::Dimension,
            FieldType::VolumeList => FieldType::Volume,
            FieldType::WeightList => FieldType::Weight,
            FieldType::ProductReferenceList => FieldType::ProductReference,
            FieldType::FileReferenceList => FieldType::FileReference,
            _ => return None,
        };
        Some(elem)
    }

    pub fn is_list(&self) -> bool {
        self.element_type().is_some()
    }

    /// Encode a runtime value into the wire string for this field type
    pub fn encode(&self, value: &Value) -> Result<String> {
        if let Some(elem) = self.element_type() {
            let Value::List(items) = value else {
                return Err(self.mismatch(value));
            };
            let encoded = items
                .iter()
                .map(|item| elem.encode_scalar(item))
                .collect::<Result<Vec<String>>>()?;
            serde_json::to_string(&encoded)
                .map_err(|e| Error::codec(self.wire_name(), e.to_string()))
        } else {
            self.encode_scalar(value)
        }
    }

    /// Decode a wire string returned by the remote into a runtime value
    pub fn decode(&self, wire: &str) -> Result<Value> {
        if let Some(elem) = self.element_type() {
            let encoded: Vec<String> = serde_json::from_str(wire)
                .map_err(|e| Error::codec(self.wire_name(), e.to_string()))?;
            let items = encoded
                .iter()
                .map(|item| elem.decode_scalar(item))
                .collect::<Result<Vec<Value>>>()?;
            Ok(Value::List(items))
        } else {
            self.decode_scalar(wire)
        }
    }

    fn encode_scalar(&self, value: &Value) -> Result<String> {
        match (self, value) {
            (
                FieldType::SingleLineText | FieldType::MultiLineText | FieldType::Url,
                Value::Text(s),
            ) => Ok(s.clone()),
            (FieldType::Integer, Value::Integer(i)) => Ok(i.to_string()),
            (FieldType::Decimal, Value::Decimal(d)) => encode_decimal(*d)
                .ok_or_else(|| Error::codec(self.wire_name(), "non-finite decimal")),
            (FieldType::Date, Value::Date(d)) => Ok(d.format("%Y-%m-%d").to_string()),
            (FieldType::DateTime, Value::DateTime(dt)) => {
                Ok(dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
            }
            (
                FieldType::Dimension | FieldType::Volume | FieldType::Weight,
                Value::Measurement(m),
            ) => {
                let number = encode_decimal(m.value)
                    .ok_or_else(|| Error::codec(self.wire_name(), "non-finite measurement"))?;
                Ok(format!("{{\"value\":{},\"unit\":\"{}\"}}", number, m.unit))
            }
            (
                FieldType::ProductReference
                | FieldType::FileReference
                | FieldType::EntityReference,
                Value::Reference(id),
            ) => Ok(id.clone()),
            _ => Err(self.mismatch(value)),
        }
    }

    fn decode_scalar(&self, wire: &str) -> Result<Value> {
        match self {
            FieldType::SingleLineText | FieldType::MultiLineText | FieldType::Url => {
                Ok(Value::Text(wire.to_string()))
            }
            FieldType::Integer => wire
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|e| Error::codec(self.wire_name(), e.to_string())),
            FieldType::Decimal => wire
                .parse::<f64>()
                .map(Value::Decimal)
                .map_err(|e| Error::codec(self.wire_name(), e.to_string())),
            FieldType::Date => NaiveDate::parse_from_str(wire, "%Y-%m-%d")
                .map(Value::Date)
                .map_err(|e| Error::codec(self.wire_name(), e.to_string())),
            FieldType::DateTime => decode_date_time(wire)
                .map(Value::DateTime)
                .map_err(|e| Error::codec(self.wire_name(), e)),
            FieldType::Dimension | FieldType::Volume | FieldType::Weight => {
                let m: Measurement = serde_json::from_str(wire)
                    .map_err(|e| Error::codec(self.wire_name(), e.to_string()))?;
                Ok(Value::Measurement(m))
            }
            FieldType::ProductReference | FieldType::FileReference | FieldType::EntityReference => {
                Ok(Value::Reference(wire.to_string()))
            }
            // list variants are handled in decode()
            _ => Err(Error::codec(self.wire_name(), "not a scalar type")),
        }
    }

    fn mismatch(&self, value: &Value) -> Error {
        Error::codec(
            self.wire_name(),
            format!("cannot encode a {} value", value.kind()),
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl Serialize for FieldType {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.wire_name())
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        FieldType::from_wire_name(&name)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown field type '{}'", name)))
    }
}

/// The remote decimal grammar always carries a fractional point: `5` encodes
/// as `"5.0"`. Returns `None` for non-finite values, which have no wire form.
pub(crate) fn encode_decimal(value: f64) -> Option<String> {
    if !value.is_finite() {
        return None;
    }
    let s = value.to_string();
    if s.contains('.') {
        Some(s)
    } else {
        Some(format!("{}.0", s))
    }
}

fn decode_date_time(wire: &str) -> std::result::Result<DateTime<Utc>, String> {
    let parsed = DateTime::parse_from_rfc3339(wire).map_err(|e| e.to_string())?;
    let utc = parsed.with_timezone(&Utc);
    // the remote stores second precision only
    utc.with_nanosecond(0)
        .ok_or_else(|| "out-of-range timestamp".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{DimensionUnit, WeightUnit};
    use chrono::TimeZone;

    fn round_trip(ty: FieldType, value: Value) {
        let wire = ty.encode(&value).unwrap();
        assert_eq!(ty.decode(&wire).unwrap(), value);
    }

    #[test]
    fn test_decimal_always_carries_fraction() {
        assert_eq!(FieldType::Decimal.encode(&Value::Decimal(5.0)).unwrap(), "5.0");
        assert_eq!(FieldType::Decimal.encode(&Value::Decimal(1.25)).unwrap(), "1.25");
        assert_eq!(FieldType::Decimal.encode(&Value::Decimal(-3.0)).unwrap(), "-3.0");
    }

    #[test]
    fn test_scalar_round_trips() {
        round_trip(FieldType::SingleLineText, Value::Text("pull buoy".into()));
        round_trip(FieldType::MultiLineText, Value::Text("a\nb".into()));
        round_trip(FieldType::Url, Value::Text("https://example.com".into()));
        round_trip(FieldType::Integer, Value::Integer(-42));
        round_trip(FieldType::Decimal, Value::Decimal(19.99));
        round_trip(
            FieldType::Date,
            Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()),
        );
        round_trip(
            FieldType::DateTime,
            Value::DateTime(Utc.with_ymd_and_hms(2024, 1, 1, 12, 30, 45).unwrap()),
        );
        round_trip(
            FieldType::Weight,
            Value::Measurement(Measurement::new(2.5, WeightUnit::Kilograms)),
        );
        round_trip(
            FieldType::ProductReference,
            Value::Reference("gid://storecraft/Product/42".into()),
        );
    }

    #[test]
    fn test_measurement_wire_format() {
        let m = Value::Measurement(Measurement::new(5.0, DimensionUnit::Centimeters));
        assert_eq!(
            FieldType::Dimension.encode(&m).unwrap(),
            r#"{"value":5.0,"unit":"CENTIMETERS"}"#
        );
    }

    #[test]
    fn test_date_time_wire_format() {
        let dt = Value::DateTime(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(
            FieldType::DateTime.encode(&dt).unwrap(),
            "2024-01-01T00:00:00Z"
        );
    }

    #[test]
    fn test_date_time_decode_truncates_to_seconds() {
        let decoded = FieldType::DateTime.decode("2024-01-01T10:20:30.500Z").unwrap();
        assert_eq!(
            decoded,
            Value::DateTime(Utc.with_ymd_and_hms(2024, 1, 1, 10, 20, 30).unwrap())
        );
    }

    #[test]
    fn test_list_encodes_as_json_array_of_scalar_encodings() {
        let list = Value::List(vec![Value::Decimal(1.0), Value::Decimal(2.5)]);
        let wire = FieldType::DecimalList.encode(&list).unwrap();
        assert_eq!(wire, r#"["1.0","2.5"]"#);
        assert_eq!(FieldType::DecimalList.decode(&wire).unwrap(), list);
    }

    #[test]
    fn test_list_round_trips() {
        round_trip(
            FieldType::SingleLineTextList,
            Value::List(vec![Value::Text("a".into()), Value::Text("b".into())]),
        );
        round_trip(
            FieldType::IntegerList,
            Value::List(vec![Value::Integer(1), Value::Integer(2)]),
        );
        round_trip(
            FieldType::DateList,
            Value::List(vec![
                Value::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
                Value::Date(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()),
            ]),
        );
        round_trip(
            FieldType::DimensionList,
            Value::List(vec![
                Value::Measurement(Measurement::new(1.5, DimensionUnit::Meters)),
                Value::Measurement(Measurement::new(7.0, DimensionUnit::Inches)),
            ]),
        );
    }

    #[test]
    fn test_type_value_mismatch_is_a_codec_error() {
        let err = FieldType::Integer.encode(&Value::Text("five".into())).unwrap_err();
        assert!(matches!(err, Error::Codec { .. }));
        let err = FieldType::DecimalList.encode(&Value::Decimal(1.0)).unwrap_err();
        assert!(matches!(err, Error::Codec { .. }));
    }

    #[test]
    fn test_wire_name_round_trip() {
        for ty in [
            FieldType::SingleLineText,
            FieldType::DecimalList,
            FieldType::EntityReference,
            FieldType::WeightList,
        ] {
            assert_eq!(FieldType::from_wire_name(ty.wire_name()), Some(ty));
        }
        assert_eq!(FieldType::from_wire_name("bogus"), None);
    }
}
