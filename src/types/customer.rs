//! Customer record data structures for churn prediction

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub const GENDER_VALUES: &[&str] = &["Male", "Female"];
pub const YES_NO_VALUES: &[&str] = &["Yes", "No"];
pub const MULTIPLE_LINES_VALUES: &[&str] = &["Yes", "No", "No phone service"];
pub const INTERNET_SERVICE_VALUES: &[&str] = &["DSL", "Fiber optic", "No"];
pub const INTERNET_FEATURE_VALUES: &[&str] = &["Yes", "No", "No internet service"];
pub const CONTRACT_VALUES: &[&str] = &["Month-to-month", "One year", "Two year"];
pub const PAYMENT_METHOD_VALUES: &[&str] = &[
    "Electronic check",
    "Mailed check",
    "Bank transfer (automatic)",
    "Credit card (automatic)",
];

/// Upper bound for `tenure`, in months.
pub const MAX_TENURE: i64 = 100;

/// Raw customer record as received by the prediction endpoint.
///
/// Categorical fields stay as strings: the encoder also runs over
/// unvalidated training rows and zero-fills anything it does not recognise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    /// Customer identifier (dropped before encoding)
    #[serde(rename = "customerID")]
    pub customer_id: String,

    /// "Male" or "Female"
    pub gender: String,

    /// 0 or 1
    #[serde(rename = "SeniorCitizen", deserialize_with = "lenient_int")]
    pub senior_citizen: i64,

    #[serde(rename = "Partner")]
    pub partner: String,

    #[serde(rename = "Dependents")]
    pub dependents: String,

    /// Months with the company
    #[serde(deserialize_with = "lenient_int")]
    pub tenure: i64,

    #[serde(rename = "PhoneService")]
    pub phone_service: String,

    #[serde(rename = "MultipleLines")]
    pub multiple_lines: String,

    #[serde(rename = "InternetService")]
    pub internet_service: String,

    #[serde(rename = "OnlineSecurity")]
    pub online_security: String,

    #[serde(rename = "OnlineBackup")]
    pub online_backup: String,

    #[serde(rename = "DeviceProtection")]
    pub device_protection: String,

    #[serde(rename = "TechSupport")]
    pub tech_support: String,

    #[serde(rename = "StreamingTV")]
    pub streaming_tv: String,

    #[serde(rename = "StreamingMovies")]
    pub streaming_movies: String,

    #[serde(rename = "Contract")]
    pub contract: String,

    #[serde(rename = "PaperlessBilling")]
    pub paperless_billing: String,

    #[serde(rename = "PaymentMethod")]
    pub payment_method: String,

    #[serde(rename = "MonthlyCharges", deserialize_with = "lenient_float")]
    pub monthly_charges: f64,

    /// Free text; blank for customers without billing history
    #[serde(rename = "TotalCharges")]
    pub total_charges: String,
}

/// Numeric field as sent by clients: a JSON number or numeric text.
/// Float-typed tabular exports send integer columns as `5.0`.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumericInput {
    Int(i64),
    Float(f64),
    Text(String),
}

/// Accepts integers, integral floats (`5.0`) and numeric strings (`"5"`).
/// Range checks stay in [`CustomerRecord::validate`].
fn lenient_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match NumericInput::deserialize(deserializer)? {
        NumericInput::Int(value) => return Ok(value),
        NumericInput::Float(value) => value,
        NumericInput::Text(text) => {
            let text = text.trim();
            if let Ok(value) = text.parse::<i64>() {
                return Ok(value);
            }
            text.parse::<f64>()
                .map_err(|_| D::Error::custom(format!("invalid integer {text:?}")))?
        }
    };

    if value.is_finite()
        && value.fract() == 0.0
        && value >= i64::MIN as f64
        && value < i64::MAX as f64
    {
        Ok(value as i64)
    } else {
        Err(D::Error::custom(format!(
            "invalid integer {value}: fractional part or out of range"
        )))
    }
}

/// Accepts JSON numbers and numeric strings (`"20.5"`).
fn lenient_float<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumericInput::deserialize(deserializer)? {
        NumericInput::Int(value) => Ok(value as f64),
        NumericInput::Float(value) => Ok(value),
        NumericInput::Text(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| D::Error::custom(format!("invalid number {text:?}"))),
    }
}

/// A single failed field constraint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

/// Every constraint a record failed, collected in one pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldViolation>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn violations(&self) -> &[FieldViolation] {
        &self.0
    }

    /// Names of the failing fields, in declaration order
    pub fn fields(&self) -> Vec<&'static str> {
        self.0.iter().map(|v| v.field).collect()
    }

    fn one_of(&mut self, field: &'static str, value: &str, allowed: &[&str]) {
        if !allowed.contains(&value) {
            self.0.push(FieldViolation {
                field,
                message: format!("value {value:?} must be one of {allowed:?}"),
            });
        }
    }

    fn int_range(&mut self, field: &'static str, value: i64, min: i64, max: i64) {
        if value < min || value > max {
            self.0.push(FieldViolation {
                field,
                message: format!("value {value} must be between {min} and {max}"),
            });
        }
    }

    fn non_negative(&mut self, field: &'static str, value: f64) {
        if value.is_nan() || value < 0.0 {
            self.0.push(FieldViolation {
                field,
                message: format!("value {value} must be greater than or equal to 0"),
            });
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|v| format!("{}: {}", v.field, v.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

impl CustomerRecord {
    /// Check every field against its declared domain.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        errors.one_of("gender", &self.gender, GENDER_VALUES);
        errors.int_range("SeniorCitizen", self.senior_citizen, 0, 1);
        errors.one_of("Partner", &self.partner, YES_NO_VALUES);
        errors.one_of("Dependents", &self.dependents, YES_NO_VALUES);
        errors.int_range("tenure", self.tenure, 0, MAX_TENURE);
        errors.one_of("PhoneService", &self.phone_service, YES_NO_VALUES);
        errors.one_of("MultipleLines", &self.multiple_lines, MULTIPLE_LINES_VALUES);
        errors.one_of(
            "InternetService",
            &self.internet_service,
            INTERNET_SERVICE_VALUES,
        );
        for (field, value) in self.internet_features() {
            errors.one_of(field, value, INTERNET_FEATURE_VALUES);
        }
        errors.one_of("Contract", &self.contract, CONTRACT_VALUES);
        errors.one_of("PaperlessBilling", &self.paperless_billing, YES_NO_VALUES);
        errors.one_of("PaymentMethod", &self.payment_method, PAYMENT_METHOD_VALUES);
        errors.non_negative("MonthlyCharges", self.monthly_charges);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// The six add-on fields that depend on internet service, with their wire names.
    pub fn internet_features(&self) -> [(&'static str, &str); 6] {
        [
            ("OnlineSecurity", self.online_security.as_str()),
            ("OnlineBackup", self.online_backup.as_str()),
            ("DeviceProtection", self.device_protection.as_str()),
            ("TechSupport", self.tech_support.as_str()),
            ("StreamingTV", self.streaming_tv.as_str()),
            ("StreamingMovies", self.streaming_movies.as_str()),
        ]
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::CustomerRecord;

    /// A valid fiber customer on a monthly contract.
    pub fn sample_record() -> CustomerRecord {
        CustomerRecord {
            customer_id: "7590-VHVEG".to_string(),
            gender: "Female".to_string(),
            senior_citizen: 0,
            partner: "Yes".to_string(),
            dependents: "No".to_string(),
            tenure: 5,
            phone_service: "Yes".to_string(),
            multiple_lines: "No".to_string(),
            internet_service: "Fiber optic".to_string(),
            online_security: "No".to_string(),
            online_backup: "Yes".to_string(),
            device_protection: "No".to_string(),
            tech_support: "No".to_string(),
            streaming_tv: "Yes".to_string(),
            streaming_movies: "No".to_string(),
            contract: "Month-to-month".to_string(),
            paperless_billing: "Yes".to_string(),
            payment_method: "Electronic check".to_string(),
            monthly_charges: 20.0,
            total_charges: "100.0".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::sample_record;
    use super::*;

    #[test]
    fn test_wire_field_names() {
        let json = serde_json::to_value(sample_record()).unwrap();
        assert_eq!(json["customerID"], "7590-VHVEG");
        assert_eq!(json["SeniorCitizen"], 0);
        assert_eq!(json["StreamingTV"], "Yes");
        assert_eq!(json["TotalCharges"], "100.0");
    }

    fn sample_json_with(field: &str, value: serde_json::Value) -> serde_json::Value {
        let mut json = serde_json::to_value(sample_record()).unwrap();
        json[field] = value;
        json
    }

    #[test]
    fn test_integral_floats_and_numeric_strings_accepted() {
        let record: CustomerRecord =
            serde_json::from_value(sample_json_with("tenure", serde_json::json!(5.0))).unwrap();
        assert_eq!(record.tenure, 5);

        let record: CustomerRecord =
            serde_json::from_value(sample_json_with("tenure", serde_json::json!(" 12 "))).unwrap();
        assert_eq!(record.tenure, 12);

        let record: CustomerRecord =
            serde_json::from_value(sample_json_with("SeniorCitizen", serde_json::json!(1.0)))
                .unwrap();
        assert_eq!(record.senior_citizen, 1);

        let record: CustomerRecord = serde_json::from_value(sample_json_with(
            "MonthlyCharges",
            serde_json::json!("20.5"),
        ))
        .unwrap();
        assert_eq!(record.monthly_charges, 20.5);

        let record: CustomerRecord =
            serde_json::from_value(sample_json_with("MonthlyCharges", serde_json::json!(70)))
                .unwrap();
        assert_eq!(record.monthly_charges, 70.0);
    }

    #[test]
    fn test_non_integral_and_non_numeric_rejected() {
        for value in [
            serde_json::json!(5.5),
            serde_json::json!("five"),
            serde_json::json!(true),
            serde_json::Value::Null,
        ] {
            let result =
                serde_json::from_value::<CustomerRecord>(sample_json_with("tenure", value.clone()));
            assert!(result.is_err(), "tenure {value} should not deserialize");
        }

        let result = serde_json::from_value::<CustomerRecord>(sample_json_with(
            "MonthlyCharges",
            serde_json::json!("twenty"),
        ));
        assert!(result.is_err());
    }

    #[test]
    fn test_lenient_values_still_range_checked() {
        let record: CustomerRecord =
            serde_json::from_value(sample_json_with("tenure", serde_json::json!("101"))).unwrap();
        assert_eq!(record.validate().unwrap_err().fields(), vec!["tenure"]);
    }

    #[test]
    fn test_valid_record_passes() {
        assert!(sample_record().validate().is_ok());
    }

    #[test]
    fn test_no_service_values_are_valid() {
        let mut record = sample_record();
        record.phone_service = "No".to_string();
        record.multiple_lines = "No phone service".to_string();
        record.internet_service = "No".to_string();
        record.online_security = "No internet service".to_string();
        record.streaming_movies = "No internet service".to_string();
        record.total_charges = " ".to_string();
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_rejects_unknown_gender() {
        let mut record = sample_record();
        record.gender = "Other".to_string();

        let errors = record.validate().unwrap_err();
        assert_eq!(errors.fields(), vec!["gender"]);
    }

    #[test]
    fn test_collects_every_violation() {
        let mut record = sample_record();
        record.senior_citizen = 2;
        record.tenure = 101;
        record.tech_support = "Maybe".to_string();
        record.payment_method = "Cash".to_string();
        record.monthly_charges = -0.5;

        let errors = record.validate().unwrap_err();
        assert_eq!(
            errors.fields(),
            vec![
                "SeniorCitizen",
                "tenure",
                "TechSupport",
                "PaymentMethod",
                "MonthlyCharges"
            ]
        );
    }

    #[test]
    fn test_tenure_bounds_inclusive() {
        let mut record = sample_record();
        record.tenure = 0;
        assert!(record.validate().is_ok());
        record.tenure = MAX_TENURE;
        assert!(record.validate().is_ok());
        record.tenure = -1;
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_values_are_case_sensitive() {
        let mut record = sample_record();
        record.contract = "one year".to_string();
        assert_eq!(record.validate().unwrap_err().fields(), vec!["Contract"]);
    }

    #[test]
    fn test_nan_monthly_charges_rejected() {
        let mut record = sample_record();
        record.monthly_charges = f64::NAN;
        assert_eq!(
            record.validate().unwrap_err().fields(),
            vec!["MonthlyCharges"]
        );
    }
}
