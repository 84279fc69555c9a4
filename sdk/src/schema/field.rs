//! Field definitions and the typed builders that produce them
//!
//! Each codec family gets its own builder so only the validation rules
//! that family supports are expressible. A builder converts into the
//! untyped `FieldDefinition` the schema and diff layers work with.

use crate::codec::FieldType;
use crate::validation::ValidationRule;
use crate::value::Measurement;
use chrono::{DateTime, NaiveDate, Utc};

/// A declared field, immutable once built
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    /// Remote key. Defaults to the schema alias when unset.
    pub key: Option<String>,
    /// Human-readable name. The remote defaults it to the key.
    pub name: Option<String>,
    pub description: Option<String>,
    pub required: bool,
    pub field_type: FieldType,
    pub validations: Vec<ValidationRule>,
}

impl FieldDefinition {
    fn new(field_type: FieldType) -> Self {
        Self {
            key: None,
            name: None,
            description: None,
            required: false,
            field_type,
            validations: Vec::new(),
        }
    }

    /// The key this field resolves to under the given schema alias
    pub fn resolved_key<'a>(&'a self, alias: &'a str) -> &'a str {
        self.key.as_deref().unwrap_or(alias)
    }
}

macro_rules! field_config {
    ($builder:ident) => {
        impl $builder {
            pub fn key(mut self, key: impl Into<String>) -> Self {
                self.def.key = Some(key.into());
                self
            }

            pub fn name(mut self, name: impl Into<String>) -> Self {
                self.def.name = Some(name.into());
                self
            }

            pub fn description(mut self, description: impl Into<String>) -> Self {
                self.def.description = Some(description.into());
                self
            }

            pub fn required(mut self) -> Self {
                self.def.required = true;
                self
            }
        }

        impl From<$builder> for FieldDefinition {
            fn from(builder: $builder) -> FieldDefinition {
                builder.def
            }
        }
    };
}

pub struct TextField {
    def: FieldDefinition,
}

field_config!(TextField);

impl TextField {
    pub fn min(mut self, length: u32) -> Self {
        self.def.validations.push(ValidationRule::min(length.to_string()));
        self
    }

    pub fn max(mut self, length: u32) -> Self {
        self.def.validations.push(ValidationRule::max(length.to_string()));
        self
    }

    pub fn regex(mut self, pattern: impl Into<String>) -> Self {
        self.def.validations.push(ValidationRule::regex(pattern));
        self
    }

    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.def.validations.push(ValidationRule::choices(choices));
        self
    }
}

pub struct MultiLineTextField {
    def: FieldDefinition,
}

field_config!(MultiLineTextField);

impl MultiLineTextField {
    pub fn min(mut self, length: u32) -> Self {
        self.def.validations.push(ValidationRule::min(length.to_string()));
        self
    }

    pub fn max(mut self, length: u32) -> Self {
        self.def.validations.push(ValidationRule::max(length.to_string()));
        self
    }

    pub fn regex(mut self, pattern: impl Into<String>) -> Self {
        self.def.validations.push(ValidationRule::regex(pattern));
        self
    }
}

pub struct UrlField {
    def: FieldDefinition,
}

field_config!(UrlField);

impl UrlField {
    pub fn allowed_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.def.validations.push(ValidationRule::allowed_domains(domains));
        self
    }
}

pub struct IntegerField {
    def: FieldDefinition,
}

field_config!(IntegerField);

impl IntegerField {
    pub fn min(mut self, value: i64) -> Self {
        self.def.validations.push(ValidationRule::min(value.to_string()));
        self
    }

    pub fn max(mut self, value: i64) -> Self {
        self.def.validations.push(ValidationRule::max(value.to_string()));
        self
    }
}

pub struct DecimalField {
    def: FieldDefinition,
}

field_config!(DecimalField);

impl DecimalField {
    pub fn min(mut self, value: f64) -> Self {
        self.def.validations.push(ValidationRule::min(decimal_bound(value)));
        self
    }

    pub fn max(mut self, value: f64) -> Self {
        self.def.validations.push(ValidationRule::max(decimal_bound(value)));
        self
    }

    pub fn max_precision(mut self, digits: u32) -> Self {
        self.def.validations.push(ValidationRule::max_precision(digits));
        self
    }
}

pub struct DateField {
    def: FieldDefinition,
}

field_config!(DateField);

impl DateField {
    pub fn min(mut self, value: NaiveDate) -> Self {
        self.def
            .validations
            .push(ValidationRule::min(value.format("%Y-%m-%d").to_string()));
        self
    }

    pub fn max(mut self, value: NaiveDate) -> Self {
        self.def
            .validations
            .push(ValidationRule::max(value.format("%Y-%m-%d").to_string()));
        self
    }
}

pub struct DateTimeField {
    def: FieldDefinition,
}

field_config!(DateTimeField);

impl DateTimeField {
    pub fn min(mut self, value: DateTime<Utc>) -> Self {
        self.def
            .validations
            .push(ValidationRule::min(value.format("%Y-%m-%dT%H:%M:%SZ").to_string()));
        self
    }

    pub fn max(mut self, value: DateTime<Utc>) -> Self {
        self.def
            .validations
            .push(ValidationRule::max(value.format("%Y-%m-%dT%H:%M:%SZ").to_string()));
        self
    }
}

pub struct MeasurementField {
    def: FieldDefinition,
}

field_config!(MeasurementField);

impl MeasurementField {
    pub fn min(mut self, bound: Measurement) -> Self {
        self.def.validations.push(ValidationRule::min(measurement_bound(&bound)));
        self
    }

    pub fn max(mut self, bound: Measurement) -> Self {
        self.def.validations.push(ValidationRule::max(measurement_bound(&bound)));
        self
    }
}

pub struct FileField {
    def: FieldDefinition,
}

field_config!(FileField);

impl FileField {
    pub fn file_types<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.def.validations.push(ValidationRule::file_types(kinds));
        self
    }
}

pub struct ReferenceField {
    def: FieldDefinition,
}

field_config!(ReferenceField);

pub struct EntityReferenceField {
    def: FieldDefinition,
}

field_config!(EntityReferenceField);

fn decimal_bound(value: f64) -> String {
    // serde_json prints whole floats with a trailing ".0", matching the
    // remote decimal grammar
    serde_json::to_string(&value).unwrap_or_else(|_| value.to_string())
}

fn measurement_bound(bound: &Measurement) -> String {
    serde_json::to_string(bound).unwrap_or_default()
}

pub fn single_line_text() -> TextField {
    TextField { def: FieldDefinition::new(FieldType::SingleLineText) }
}

pub fn single_line_text_list() -> TextField {
    TextField { def: FieldDefinition::new(FieldType::SingleLineTextList) }
}

pub fn multi_line_text() -> MultiLineTextField {
    MultiLineTextField { def: FieldDefinition::new(FieldType::MultiLineText) }
}

pub fn url() -> UrlField {
    UrlField { def: FieldDefinition::new(FieldType::Url) }
}

pub fn url_list() -> UrlField {
    UrlField { def: FieldDefinition::new(FieldType::UrlList) }
}

pub fn integer() -> IntegerField {
    IntegerField { def: FieldDefinition::new(FieldType::Integer) }
}

pub fn integer_list() -> IntegerField {
    IntegerField { def: FieldDefinition::new(FieldType::IntegerList) }
}

pub fn decimal() -> DecimalField {
    DecimalField { def: FieldDefinition::new(FieldType::Decimal) }
}

pub fn decimal_list() -> DecimalField {
    DecimalField { def: FieldDefinition::new(FieldType::DecimalList) }
}

pub fn date() -> DateField {
    DateField { def: FieldDefinition::new(FieldType::Date) }
}

pub fn date_list() -> DateField {
    DateField { def: FieldDefinition::new(FieldType::DateList) }
}

pub fn date_time() -> DateTimeField {
    DateTimeField { def: FieldDefinition::new(FieldType::DateTime) }
}

pub fn date_time_list() -> DateTimeField {
    DateTimeField { def: FieldDefinition::new(FieldType::DateTimeList) }
}

pub fn dimension() -> MeasurementField {
    MeasurementField { def: FieldDefinition::new(FieldType::Dimension) }
}

pub fn dimension_list() -> MeasurementField {
    MeasurementField { def: FieldDefinition::new(FieldType::DimensionList) }
}

pub fn volume() -> MeasurementField {
    MeasurementField { def: FieldDefinition::new(FieldType::Volume) }
}

pub fn volume_list() -> MeasurementField {
    MeasurementField { def: FieldDefinition::new(FieldType::VolumeList) }
}

pub fn weight() -> MeasurementField {
    MeasurementField { def: FieldDefinition::new(FieldType::Weight) }
}

pub fn weight_list() -> MeasurementField {
    MeasurementField { def: FieldDefinition::new(FieldType::WeightList) }
}

pub fn product_reference() -> ReferenceField {
    ReferenceField { def: FieldDefinition::new(FieldType::ProductReference) }
}

pub fn product_reference_list() -> ReferenceField {
    ReferenceField { def: FieldDefinition::new(FieldType::ProductReferenceList) }
}

pub fn file_reference() -> FileField {
    FileField { def: FieldDefinition::new(FieldType::FileReference) }
}

pub fn file_reference_list() -> FileField {
    FileField { def: FieldDefinition::new(FieldType::FileReferenceList) }
}

/// A reference to another declared entity type. The type is recorded as an
/// `entity_definition_id` validation and resolved to the real definition id
/// when the schema is applied.
pub fn entity_reference(entity_type: impl Into<String>) -> EntityReferenceField {
    let mut def = FieldDefinition::new(FieldType::EntityReference);
    def.validations.push(ValidationRule::entity_definition(entity_type));
    EntityReferenceField { def }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::WeightUnit;

    #[test]
    fn test_builder_collects_config_and_validations() {
        let field: FieldDefinition = single_line_text()
            .name("Title")
            .description("Display title")
            .required()
            .min(1)
            .max(80)
            .into();
        assert_eq!(field.field_type, FieldType::SingleLineText);
        assert_eq!(field.name.as_deref(), Some("Title"));
        assert!(field.required);
        assert_eq!(field.validations.len(), 2);
        assert_eq!(field.validations[0], ValidationRule::min("1"));
    }

    #[test]
    fn test_key_defaults_to_alias() {
        let field: FieldDefinition = integer().into();
        assert_eq!(field.resolved_key("pages"), "pages");
        let field: FieldDefinition = integer().key("page_count").into();
        assert_eq!(field.resolved_key("pages"), "page_count");
    }

    #[test]
    fn test_measurement_bounds_use_wire_form() {
        let field: FieldDefinition = weight()
            .min(Measurement::new(0.5, WeightUnit::Kilograms))
            .into();
        assert_eq!(
            field.validations[0].value,
            r#"{"value":0.5,"unit":"KILOGRAMS"}"#
        );
    }

    #[test]
    fn test_decimal_bounds_carry_fraction() {
        let field: FieldDefinition = decimal().min(5.0).max(9.75).into();
        assert_eq!(field.validations[0].value, "5.0");
        assert_eq!(field.validations[1].value, "9.75");
    }

    #[test]
    fn test_entity_reference_records_target_type() {
        let field: FieldDefinition = entity_reference("author").into();
        assert_eq!(field.field_type, FieldType::EntityReference);
        assert_eq!(
            field.validations[0],
            ValidationRule::entity_definition("author")
        );
    }
}
