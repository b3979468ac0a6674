//! Data model shared by the blood gas evaluation engine and its adapters.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tunable calibration for trend analysis and alert thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Trend calibration for laboratory values (blood gas, electrolytes).
    pub laboratory_trend: TrendProfile,
    /// Trend calibration for bedside vital signs.
    pub vital_trend: TrendProfile,
    /// Which absolute pH limits apply.
    pub alert_profile: AlertProfile,
    /// Minimum series length before a regression is attempted.
    pub min_trend_readings: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            laboratory_trend: TrendProfile::laboratory(),
            vital_trend: TrendProfile::vital_sign(),
            alert_profile: AlertProfile::Laboratory,
            min_trend_readings: 2,
        }
    }
}

impl AnalyzerConfig {
    /// Trend profile for a parameter class.
    pub fn trend_profile(&self, class: ParameterClass) -> &TrendProfile {
        match class {
            ParameterClass::Laboratory => &self.laboratory_trend,
            ParameterClass::VitalSign => &self.vital_trend,
        }
    }

    /// Reject calibrations that would make the engine misclassify silently.
    pub fn validate(&self) -> Result<(), AnalyzerError> {
        self.laboratory_trend.validate("laboratory_trend")?;
        self.vital_trend.validate("vital_trend")?;
        if self.min_trend_readings < 2 {
            return Err(AnalyzerError::InvalidConfig(format!(
                "min_trend_readings must be at least 2, got {}",
                self.min_trend_readings
            )));
        }
        Ok(())
    }
}

/// Slope threshold and coefficient-of-variation bands for one class of series.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TrendProfile {
    /// Absolute slope (units per reading) above which a series is trending.
    pub slope_threshold: f64,
    /// CV strictly below this is "high" stability.
    pub high_stability_cv: f64,
    /// CV strictly below this (and not high) is "medium" stability.
    pub medium_stability_cv: f64,
}

impl TrendProfile {
    pub const fn laboratory() -> Self {
        Self {
            slope_threshold: 0.01,
            high_stability_cv: 0.05,
            medium_stability_cv: 0.15,
        }
    }

    pub const fn vital_sign() -> Self {
        Self {
            slope_threshold: 0.1,
            high_stability_cv: 0.1,
            medium_stability_cv: 0.2,
        }
    }

    fn validate(&self, name: &str) -> Result<(), AnalyzerError> {
        if !(self.slope_threshold.is_finite() && self.slope_threshold > 0.0) {
            return Err(AnalyzerError::InvalidConfig(format!(
                "{name}.slope_threshold must be a positive number"
            )));
        }
        let bands_ordered = self.high_stability_cv > 0.0
            && self.high_stability_cv < self.medium_stability_cv
            && self.medium_stability_cv.is_finite();
        if !bands_ordered {
            return Err(AnalyzerError::InvalidConfig(format!(
                "{name} requires 0 < high_stability_cv < medium_stability_cv"
            )));
        }
        Ok(())
    }
}

/// Selects the absolute pH limits used for life-threatening acidemia/alkalemia.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertProfile {
    /// Blood gas panel limits: pH < 7.2 or > 7.6.
    #[default]
    Laboratory,
    /// Bedside monitoring limits: pH < 7.25 or > 7.55.
    VitalSigns,
}

impl AlertProfile {
    pub fn severe_acidemia_below(self) -> f64 {
        match self {
            AlertProfile::Laboratory => 7.2,
            AlertProfile::VitalSigns => 7.25,
        }
    }

    pub fn severe_alkalemia_above(self) -> f64 {
        match self {
            AlertProfile::Laboratory => 7.6,
            AlertProfile::VitalSigns => 7.55,
        }
    }
}

/// Calibration family a parameter belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ParameterClass {
    Laboratory,
    VitalSign,
}

/// Every measurement the engine understands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParameterId {
    #[serde(rename = "pH")]
    Ph,
    #[serde(rename = "PaCO2")]
    PaCo2,
    #[serde(rename = "PaO2")]
    PaO2,
    #[serde(rename = "HCO3")]
    Hco3,
    BaseExcess,
    Lactate,
    Sodium,
    Potassium,
    Chloride,
    Glucose,
    HeartRate,
    #[serde(rename = "SystolicBP")]
    SystolicBp,
    #[serde(rename = "DiastolicBP")]
    DiastolicBp,
    #[serde(rename = "SpO2")]
    SpO2,
    RespiratoryRate,
}

/// Static facts attached to a parameter: how it is labelled, which
/// calibration it uses and which breaches escalate to critical.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterRule {
    pub label: &'static str,
    /// Unit suffix as it appears after a number, including the leading space.
    pub unit: &'static str,
    pub class: ParameterClass,
    pub critical_when_low: bool,
    pub critical_when_high: bool,
    pub adult_range: Range,
}

const fn rule(
    label: &'static str,
    unit: &'static str,
    class: ParameterClass,
    critical_when_low: bool,
    critical_when_high: bool,
    low: f64,
    high: f64,
) -> ParameterRule {
    ParameterRule {
        label,
        unit,
        class,
        critical_when_low,
        critical_when_high,
        adult_range: Range { low, high },
    }
}

impl ParameterId {
    pub const ALL: [ParameterId; 15] = [
        ParameterId::Ph,
        ParameterId::PaCo2,
        ParameterId::PaO2,
        ParameterId::Hco3,
        ParameterId::BaseExcess,
        ParameterId::Lactate,
        ParameterId::Sodium,
        ParameterId::Potassium,
        ParameterId::Chloride,
        ParameterId::Glucose,
        ParameterId::HeartRate,
        ParameterId::SystolicBp,
        ParameterId::DiastolicBp,
        ParameterId::SpO2,
        ParameterId::RespiratoryRate,
    ];

    pub const fn rule(self) -> ParameterRule {
        use ParameterClass::{Laboratory as Lab, VitalSign as Vital};
        match self {
            ParameterId::Ph => rule("pH", "", Lab, true, true, 7.35, 7.45),
            ParameterId::PaCo2 => rule("PaCO2", " mmHg", Lab, false, true, 35.0, 45.0),
            ParameterId::PaO2 => rule("PaO2", " mmHg", Lab, true, false, 80.0, 100.0),
            ParameterId::Hco3 => rule("HCO3", " mEq/L", Lab, false, false, 22.0, 26.0),
            ParameterId::BaseExcess => rule("Base Excess", " mEq/L", Lab, false, false, -2.0, 2.0),
            ParameterId::Lactate => rule("Lactate", " mmol/L", Lab, false, true, 0.5, 2.2),
            ParameterId::Sodium => rule("Sodium", " mEq/L", Lab, true, false, 136.0, 145.0),
            ParameterId::Potassium => rule("Potassium", " mEq/L", Lab, true, true, 3.5, 5.0),
            ParameterId::Chloride => rule("Chloride", " mEq/L", Lab, false, false, 98.0, 107.0),
            ParameterId::Glucose => rule("Glucose", " mg/dL", Lab, true, true, 70.0, 110.0),
            ParameterId::HeartRate => rule("Heart Rate", " bpm", Vital, true, true, 60.0, 100.0),
            ParameterId::SystolicBp => rule("Systolic BP", " mmHg", Vital, false, true, 90.0, 120.0),
            ParameterId::DiastolicBp => rule("Diastolic BP", " mmHg", Vital, false, false, 60.0, 80.0),
            ParameterId::SpO2 => rule("SpO2", "%", Vital, true, false, 95.0, 100.0),
            ParameterId::RespiratoryRate => {
                rule("Respiratory Rate", " /min", Vital, false, false, 12.0, 20.0)
            }
        }
    }

    pub fn label(self) -> &'static str {
        self.rule().label
    }

    pub fn unit(self) -> &'static str {
        self.rule().unit
    }

    pub fn class(self) -> ParameterClass {
        self.rule().class
    }
}

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ParameterId {
    type Err = AnalyzerError;

    /// Accepts the serialized names (`PaCO2`), display labels (`Heart Rate`)
    /// and snake_case aliases (`pa_co2`), ignoring case and separators.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let key: String = raw
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_lowercase())
            .collect();

        let id = match key.as_str() {
            "ph" => ParameterId::Ph,
            "paco2" | "pco2" => ParameterId::PaCo2,
            "pao2" | "po2" => ParameterId::PaO2,
            "hco3" | "bicarbonate" => ParameterId::Hco3,
            "baseexcess" | "be" => ParameterId::BaseExcess,
            "lactate" => ParameterId::Lactate,
            "sodium" | "na" => ParameterId::Sodium,
            "potassium" | "k" => ParameterId::Potassium,
            "chloride" | "cl" => ParameterId::Chloride,
            "glucose" => ParameterId::Glucose,
            "heartrate" | "hr" => ParameterId::HeartRate,
            "systolicbp" | "sbp" => ParameterId::SystolicBp,
            "diastolicbp" | "dbp" => ParameterId::DiastolicBp,
            "spo2" => ParameterId::SpO2,
            "respiratoryrate" | "rr" => ParameterId::RespiratoryRate,
            _ => return Err(AnalyzerError::UnknownParameter(raw.to_string())),
        };
        Ok(id)
    }
}

/// Inclusive reference interval.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Range {
    pub low: f64,
    pub high: f64,
}

impl Range {
    /// Checked constructor; `parameter` only names the offender in the error.
    pub fn new(parameter: ParameterId, low: f64, high: f64) -> Result<Self, AnalyzerError> {
        let range = Self { low, high };
        range.validate(parameter)?;
        Ok(range)
    }

    pub fn validate(&self, parameter: ParameterId) -> Result<(), AnalyzerError> {
        if self.low.is_finite() && self.high.is_finite() && self.low <= self.high {
            Ok(())
        } else {
            Err(AnalyzerError::InvertedRange {
                parameter,
                low: self.low,
                high: self.high,
            })
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value <= self.high
    }
}

/// Alert severity. Bucketing is done on this tag, never on message text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Warning,
    Critical,
}

/// A single finding. Constructed once, never modified.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Alert {
    severity: Severity,
    message: String,
}

impl Alert {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn critical(message: impl Into<String>) -> Self {
        Self::new(Severity::Critical, message)
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
        };
        write!(f, "{tag}: {}", self.message)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Stability {
    High,
    Medium,
    Low,
    Unknown,
}

/// Direction and noisiness of a series.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TrendResult {
    pub trend: Trend,
    pub slope: f64,
    pub stability: Stability,
    pub coefficient_of_variation: f64,
}

impl TrendResult {
    pub const fn insufficient() -> Self {
        Self {
            trend: Trend::InsufficientData,
            slope: 0.0,
            stability: Stability::Unknown,
            coefficient_of_variation: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ParameterStatus {
    Normal,
    Abnormal,
}

/// Evaluation of one parameter's series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParameterAnalysis {
    pub current: f64,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub readings: usize,
    pub unit: String,
    pub normal_range: Range,
    pub status: ParameterStatus,
    pub trend_analysis: TrendResult,
    pub alerts: Vec<Alert>,
    /// Saturation estimated from the oxygen dissociation curve (PaO2 only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spo2_estimated: Option<u8>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PatientCondition {
    #[default]
    Stable,
    Critical,
    PostOp,
    Icu,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SampleType {
    #[default]
    Arterial,
    Venous,
    Capillary,
}

/// Who the readings belong to. Drives reference range selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientContext {
    /// Age in years; fractions are meaningful below one year.
    pub age_years: f64,
    #[serde(default)]
    pub condition: PatientCondition,
    #[serde(default)]
    pub sample_type: SampleType,
    /// Body temperature in °C, echoed for display only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_c: Option<f64>,
}

impl Default for PatientContext {
    fn default() -> Self {
        Self::adult(45.0)
    }
}

impl PatientContext {
    pub fn adult(age_years: f64) -> Self {
        Self {
            age_years,
            condition: PatientCondition::Stable,
            sample_type: SampleType::Arterial,
            temperature_c: None,
        }
    }

    pub fn with_condition(mut self, condition: PatientCondition) -> Self {
        self.condition = condition;
        self
    }

    pub fn with_sample_type(mut self, sample_type: SampleType) -> Self {
        self.sample_type = sample_type;
        self
    }

    pub fn with_temperature(mut self, temperature_c: f64) -> Self {
        self.temperature_c = Some(temperature_c);
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AcidBaseDisorder {
    Normal,
    RespiratoryAcidosis,
    MetabolicAcidosis,
    RespiratoryAlkalosis,
    MetabolicAlkalosis,
    /// pH is out of range but neither component explains it.
    MixedOrUncharacterized,
}

/// Acid-base interpretation with its compensation flag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AcidBaseStatus {
    pub disorder: AcidBaseDisorder,
    pub compensated: bool,
}

impl AcidBaseStatus {
    pub const fn new(disorder: AcidBaseDisorder, compensated: bool) -> Self {
        Self {
            disorder,
            compensated,
        }
    }

    pub const fn normal() -> Self {
        Self::new(AcidBaseDisorder::Normal, false)
    }

    pub const fn mixed() -> Self {
        Self::new(AcidBaseDisorder::MixedOrUncharacterized, false)
    }

    /// Human-readable interpretation, e.g. "Metabolic Acidosis with Respiratory Compensation".
    pub fn description(&self) -> String {
        let (base, compensation) = match self.disorder {
            AcidBaseDisorder::Normal => return "Normal Acid-Base Balance".to_string(),
            AcidBaseDisorder::MixedOrUncharacterized => {
                return "Mixed/Uncharacterized Disturbance".to_string()
            }
            AcidBaseDisorder::RespiratoryAcidosis => {
                ("Respiratory Acidosis", "with Metabolic Compensation")
            }
            AcidBaseDisorder::MetabolicAcidosis => {
                ("Metabolic Acidosis", "with Respiratory Compensation")
            }
            AcidBaseDisorder::RespiratoryAlkalosis => {
                ("Respiratory Alkalosis", "with Metabolic Compensation")
            }
            AcidBaseDisorder::MetabolicAlkalosis => {
                ("Metabolic Alkalosis", "with Respiratory Compensation")
            }
        };

        if self.compensated {
            format!("{base} {compensation}")
        } else {
            base.to_string()
        }
    }
}

impl fmt::Display for AcidBaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnionGapStatus {
    High,
    Normal,
    Low,
}

impl AnionGapStatus {
    pub fn description(self) -> &'static str {
        match self {
            AnionGapStatus::High => "High (possible metabolic acidosis)",
            AnionGapStatus::Normal => "Normal",
            AnionGapStatus::Low => "Low",
        }
    }
}

/// Values derived from several parameters at once.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CalculatedValues {
    pub acid_base_status: Option<AcidBaseStatus>,
    pub acid_base_summary: Option<String>,
    /// Na − (Cl + HCO3) rounded to 0.1 mEq/L; `anion_gap_status` is banded on this value.
    pub anion_gap: Option<f64>,
    pub anion_gap_status: Option<AnionGapStatus>,
    #[serde(default)]
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    Normal,
    Abnormal,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverallAssessment {
    pub status: OverallStatus,
    pub critical_alerts: Vec<Alert>,
    pub warning_alerts: Vec<Alert>,
    pub total_alerts: usize,
    pub patient: PatientContext,
}

/// Final result of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,
    pub parameters: BTreeMap<ParameterId, ParameterAnalysis>,
    pub calculated: CalculatedValues,
    /// Parameters supplied with an empty series.
    #[serde(default)]
    pub skipped: Vec<ParameterId>,
    pub overall: OverallAssessment,
}

impl AnalysisReport {
    pub fn parameter(&self, id: ParameterId) -> Option<&ParameterAnalysis> {
        self.parameters.get(&id)
    }

    pub fn status(&self) -> OverallStatus {
        self.overall.status
    }

    /// All alerts, critical first.
    pub fn alerts(&self) -> impl Iterator<Item = &Alert> {
        self.overall
            .critical_alerts
            .iter()
            .chain(self.overall.warning_alerts.iter())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("Reference range for {parameter} is invalid: low {low} > high {high}")]
    InvertedRange {
        parameter: ParameterId,
        low: f64,
        high: f64,
    },
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Input is missing the minimum required data")]
    MissingData,
    #[error("Could not read input: {0}")]
    Parse(String),
}
