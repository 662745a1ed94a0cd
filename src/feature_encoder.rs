//! Feature encoding for churn model inference.
//!
//! Turns a raw customer record into the fixed-order numeric vector the
//! gradient-boosted classifier was trained on. The output schema is a closed
//! set of slots; categorical branches missing from a record are left at
//! their default instead of being discovered per record.

use crate::types::customer::CustomerRecord;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Number of slots in the canonical feature schema.
pub const FEATURE_COUNT: usize = 29;

/// Value type carried by a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Boolean, encoded as 0.0 / 1.0; defaults to false
    Flag,
    /// Numeric; defaults to 0
    Numeric,
}

/// One column of the canonical feature schema, declared in model order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureSlot {
    Gender,
    SeniorCitizen,
    Partner,
    Dependents,
    Tenure,
    PaperlessBilling,
    MonthlyCharges,
    MultipleLinesNo,
    MultipleLinesYes,
    InternetServiceDsl,
    InternetServiceFiberOptic,
    OnlineSecurityNo,
    OnlineSecurityYes,
    OnlineBackupNo,
    OnlineBackupYes,
    DeviceProtectionNo,
    DeviceProtectionYes,
    TechSupportNo,
    TechSupportYes,
    StreamingTvNo,
    StreamingTvYes,
    StreamingMoviesNo,
    StreamingMoviesYes,
    PaymentMethodCreditCard,
    PaymentMethodElectronicCheck,
    PaymentMethodMailedCheck,
    ContractOneYear,
    ContractTwoYear,
    PriceDelta,
}

impl FeatureSlot {
    /// Every slot, in the order the classifier expects.
    pub const ALL: [FeatureSlot; FEATURE_COUNT] = [
        FeatureSlot::Gender,
        FeatureSlot::SeniorCitizen,
        FeatureSlot::Partner,
        FeatureSlot::Dependents,
        FeatureSlot::Tenure,
        FeatureSlot::PaperlessBilling,
        FeatureSlot::MonthlyCharges,
        FeatureSlot::MultipleLinesNo,
        FeatureSlot::MultipleLinesYes,
        FeatureSlot::InternetServiceDsl,
        FeatureSlot::InternetServiceFiberOptic,
        FeatureSlot::OnlineSecurityNo,
        FeatureSlot::OnlineSecurityYes,
        FeatureSlot::OnlineBackupNo,
        FeatureSlot::OnlineBackupYes,
        FeatureSlot::DeviceProtectionNo,
        FeatureSlot::DeviceProtectionYes,
        FeatureSlot::TechSupportNo,
        FeatureSlot::TechSupportYes,
        FeatureSlot::StreamingTvNo,
        FeatureSlot::StreamingTvYes,
        FeatureSlot::StreamingMoviesNo,
        FeatureSlot::StreamingMoviesYes,
        FeatureSlot::PaymentMethodCreditCard,
        FeatureSlot::PaymentMethodElectronicCheck,
        FeatureSlot::PaymentMethodMailedCheck,
        FeatureSlot::ContractOneYear,
        FeatureSlot::ContractTwoYear,
        FeatureSlot::PriceDelta,
    ];

    /// Position of the slot in the feature vector.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Column name used at training time.
    pub fn name(self) -> &'static str {
        match self {
            FeatureSlot::Gender => "gender",
            FeatureSlot::SeniorCitizen => "SeniorCitizen",
            FeatureSlot::Partner => "Partner",
            FeatureSlot::Dependents => "Dependents",
            FeatureSlot::Tenure => "tenure",
            FeatureSlot::PaperlessBilling => "PaperlessBilling",
            FeatureSlot::MonthlyCharges => "MonthlyCharges",
            FeatureSlot::MultipleLinesNo => "MultipleLines_No",
            FeatureSlot::MultipleLinesYes => "MultipleLines_Yes",
            FeatureSlot::InternetServiceDsl => "InternetService_DSL",
            FeatureSlot::InternetServiceFiberOptic => "InternetService_Fiber optic",
            FeatureSlot::OnlineSecurityNo => "OnlineSecurity_No",
            FeatureSlot::OnlineSecurityYes => "OnlineSecurity_Yes",
            FeatureSlot::OnlineBackupNo => "OnlineBackup_No",
            FeatureSlot::OnlineBackupYes => "OnlineBackup_Yes",
            FeatureSlot::DeviceProtectionNo => "DeviceProtection_No",
            FeatureSlot::DeviceProtectionYes => "DeviceProtection_Yes",
            FeatureSlot::TechSupportNo => "TechSupport_No",
            FeatureSlot::TechSupportYes => "TechSupport_Yes",
            FeatureSlot::StreamingTvNo => "StreamingTV_No",
            FeatureSlot::StreamingTvYes => "StreamingTV_Yes",
            FeatureSlot::StreamingMoviesNo => "StreamingMovies_No",
            FeatureSlot::StreamingMoviesYes => "StreamingMovies_Yes",
            FeatureSlot::PaymentMethodCreditCard => "PaymentMethod_Credit card (automatic)",
            FeatureSlot::PaymentMethodElectronicCheck => "PaymentMethod_Electronic check",
            FeatureSlot::PaymentMethodMailedCheck => "PaymentMethod_Mailed check",
            FeatureSlot::ContractOneYear => "Contract_One year",
            FeatureSlot::ContractTwoYear => "Contract_Two year",
            FeatureSlot::PriceDelta => "price_delta",
        }
    }

    pub fn kind(self) -> SlotKind {
        match self {
            FeatureSlot::Tenure | FeatureSlot::MonthlyCharges | FeatureSlot::PriceDelta => {
                SlotKind::Numeric
            }
            _ => SlotKind::Flag,
        }
    }
}

/// Branches kept from the multi-line field. "No phone service" is dropped.
const MULTIPLE_LINES_BRANCHES: [(&str, FeatureSlot); 2] = [
    ("No", FeatureSlot::MultipleLinesNo),
    ("Yes", FeatureSlot::MultipleLinesYes),
];

/// Branches kept from the internet service field. "No" is dropped.
const INTERNET_SERVICE_BRANCHES: [(&str, FeatureSlot); 2] = [
    ("DSL", FeatureSlot::InternetServiceDsl),
    ("Fiber optic", FeatureSlot::InternetServiceFiberOptic),
];

/// (No, Yes) branches for each internet add-on, aligned with
/// `CustomerRecord::internet_features`. "No internet service" is dropped.
const INTERNET_FEATURE_BRANCHES: [(FeatureSlot, FeatureSlot); 6] = [
    (FeatureSlot::OnlineSecurityNo, FeatureSlot::OnlineSecurityYes),
    (FeatureSlot::OnlineBackupNo, FeatureSlot::OnlineBackupYes),
    (FeatureSlot::DeviceProtectionNo, FeatureSlot::DeviceProtectionYes),
    (FeatureSlot::TechSupportNo, FeatureSlot::TechSupportYes),
    (FeatureSlot::StreamingTvNo, FeatureSlot::StreamingTvYes),
    (FeatureSlot::StreamingMoviesNo, FeatureSlot::StreamingMoviesYes),
];

/// Reference branch "Bank transfer (automatic)" has no slot.
const PAYMENT_METHOD_BRANCHES: [(&str, FeatureSlot); 3] = [
    ("Credit card (automatic)", FeatureSlot::PaymentMethodCreditCard),
    ("Electronic check", FeatureSlot::PaymentMethodElectronicCheck),
    ("Mailed check", FeatureSlot::PaymentMethodMailedCheck),
];

/// Reference branch "Month-to-month" has no slot.
const CONTRACT_BRANCHES: [(&str, FeatureSlot); 2] = [
    ("One year", FeatureSlot::ContractOneYear),
    ("Two year", FeatureSlot::ContractTwoYear),
];

/// Fixed-schema numeric representation consumed by the classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: [f32; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn get(&self, slot: FeatureSlot) -> f32 {
        self.values[slot.index()]
    }

    /// Read a flag slot as a boolean.
    pub fn flag(&self, slot: FeatureSlot) -> bool {
        self.values[slot.index()] != 0.0
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// `(column name, value)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        FeatureSlot::ALL
            .into_iter()
            .map(move |slot| (slot.name(), self.get(slot)))
    }

    fn set(&mut self, slot: FeatureSlot, value: f32) {
        self.values[slot.index()] = value;
    }

    fn set_flag(&mut self, slot: FeatureSlot, on: bool) {
        self.set(slot, if on { 1.0 } else { 0.0 });
    }

    fn one_hot(&mut self, value: &str, branches: &[(&str, FeatureSlot)]) {
        for &(branch, slot) in branches {
            self.set_flag(slot, value == branch);
        }
    }
}

impl Default for FeatureVector {
    /// Flags false, numerics zero.
    fn default() -> Self {
        Self {
            values: [0.0; FEATURE_COUNT],
        }
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FEATURE_COUNT))?;
        for slot in FeatureSlot::ALL {
            match slot.kind() {
                SlotKind::Flag => map.serialize_entry(slot.name(), &self.flag(slot))?,
                SlotKind::Numeric => map.serialize_entry(slot.name(), &self.get(slot))?,
            }
        }
        map.end()
    }
}

/// Encoded training example: features plus the recoded churn target.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TrainingRow {
    pub features: FeatureVector,
    #[serde(rename = "Churn")]
    pub churn: bool,
}

/// Stateless encoder from raw customer records to model input.
///
/// Unknown or missing categorical values are not errors: their branches stay
/// at the default. Domain checks belong to `CustomerRecord::validate`.
pub struct FeatureEncoder;

impl FeatureEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Encode one record into the canonical feature vector.
    pub fn encode(&self, record: &CustomerRecord) -> FeatureVector {
        let mut features = FeatureVector::default();

        // customerID carries no signal and is never read.

        features.set_flag(FeatureSlot::Gender, record.gender != "Male");
        features.set_flag(FeatureSlot::SeniorCitizen, record.senior_citizen != 0);
        features.set_flag(FeatureSlot::Partner, record.partner == "Yes");
        features.set_flag(FeatureSlot::Dependents, record.dependents == "Yes");
        features.set_flag(
            FeatureSlot::PaperlessBilling,
            record.paperless_billing == "Yes",
        );

        // PhoneService is redundant with MultipleLines and is dropped.
        features.one_hot(&record.multiple_lines, &MULTIPLE_LINES_BRANCHES);

        features.one_hot(&record.internet_service, &INTERNET_SERVICE_BRANCHES);
        for ((_, value), (no, yes)) in record
            .internet_features()
            .into_iter()
            .zip(INTERNET_FEATURE_BRANCHES)
        {
            features.one_hot(value, &[("No", no), ("Yes", yes)]);
        }

        features.one_hot(&record.payment_method, &PAYMENT_METHOD_BRANCHES);
        features.one_hot(&record.contract, &CONTRACT_BRANCHES);

        let tenure = record.tenure as f64;
        let expected_total = tenure * record.monthly_charges;
        let total_charges = parse_total_charges(&record.total_charges).unwrap_or(expected_total);

        features.set(FeatureSlot::Tenure, tenure as f32);
        features.set(FeatureSlot::MonthlyCharges, record.monthly_charges as f32);
        features.set(
            FeatureSlot::PriceDelta,
            (expected_total - total_charges) as f32,
        );

        features
    }

    /// Encode a labelled record for (re)training.
    ///
    /// Features are identical to [`FeatureEncoder::encode`]; `churn` is
    /// recoded with "Yes" as the positive class and anything else negative.
    pub fn encode_training(&self, record: &CustomerRecord, churn: &str) -> TrainingRow {
        TrainingRow {
            features: self.encode(record),
            churn: churn == "Yes",
        }
    }

    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    /// Column names in model order.
    pub fn feature_names(&self) -> Vec<&'static str> {
        FeatureSlot::ALL.iter().map(|slot| slot.name()).collect()
    }
}

impl Default for FeatureEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Numeric coercion of the free-text total charges field.
///
/// Blank, non-numeric and non-finite values yield `None`.
fn parse_total_charges(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
