//! Rule-based evaluation of blood gas panels and vital signs.
//!
//! The engine is a set of pure functions: reference range selection, trend
//! analysis, alert derivation, acid-base interpretation and the orchestrator
//! that ties them into an [`AnalysisReport`]. Nothing here keeps state between
//! calls.

use std::collections::BTreeMap;

use bloodgas_core::{
    AcidBaseDisorder, AcidBaseStatus, Alert, AlertProfile, AnalysisReport, AnalyzerConfig,
    AnalyzerError, AnionGapStatus, CalculatedValues, OverallAssessment, OverallStatus,
    ParameterAnalysis, ParameterId, ParameterStatus, PatientCondition, PatientContext, Range,
    SampleType, Severity, Stability, Trend, TrendProfile, TrendResult,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

/// Reference intervals resolved for one patient.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceRanges {
    ranges: BTreeMap<ParameterId, Range>,
}

impl ReferenceRanges {
    fn adult() -> Self {
        Self {
            ranges: ParameterId::ALL
                .iter()
                .map(|&id| (id, id.rule().adult_range))
                .collect(),
        }
    }

    fn set(&mut self, id: ParameterId, low: f64, high: f64) {
        self.ranges.insert(id, Range { low, high });
    }

    /// Range for `id`. Anything missing falls back to the adult base range.
    pub fn get(&self, id: ParameterId) -> Range {
        self.ranges
            .get(&id)
            .copied()
            .unwrap_or_else(|| id.rule().adult_range)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParameterId, Range)> + '_ {
        self.ranges.iter().map(|(id, range)| (*id, *range))
    }

    pub fn validate(&self) -> Result<(), AnalyzerError> {
        self.ranges
            .iter()
            .try_for_each(|(id, range)| range.validate(*id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AgeBracket {
    Infant,
    Toddler,
    Child,
    Adult,
    Elderly,
}

impl AgeBracket {
    fn from_age(age_years: f64) -> Self {
        if !age_years.is_finite() || age_years < 0.0 {
            return AgeBracket::Adult;
        }
        if age_years < 1.0 {
            AgeBracket::Infant
        } else if age_years < 3.0 {
            AgeBracket::Toddler
        } else if age_years < 12.0 {
            AgeBracket::Child
        } else if age_years > 65.0 {
            AgeBracket::Elderly
        } else {
            AgeBracket::Adult
        }
    }
}

/// Resolve the normal range of every parameter for a patient.
///
/// Age brackets are applied first, then the condition, then the sample type,
/// so a venous sample always gets the venous PaO2 interval.
pub fn ranges_for(patient: &PatientContext) -> ReferenceRanges {
    use ParameterId::*;

    let mut ranges = ReferenceRanges::adult();

    match AgeBracket::from_age(patient.age_years) {
        AgeBracket::Infant => {
            ranges.set(PaO2, 60.0, 90.0);
            ranges.set(PaCo2, 30.0, 40.0);
            ranges.set(HeartRate, 100.0, 160.0);
            ranges.set(RespiratoryRate, 30.0, 60.0);
        }
        AgeBracket::Toddler => {
            ranges.set(PaO2, 75.0, 100.0);
            ranges.set(HeartRate, 80.0, 130.0);
            ranges.set(RespiratoryRate, 24.0, 40.0);
        }
        AgeBracket::Child => {
            ranges.set(PaO2, 75.0, 100.0);
            ranges.set(HeartRate, 70.0, 110.0);
            ranges.set(RespiratoryRate, 18.0, 30.0);
        }
        AgeBracket::Adult => {}
        AgeBracket::Elderly => {
            ranges.set(PaO2, 75.0, 95.0);
            ranges.set(SystolicBp, 90.0, 140.0);
        }
    }

    if patient.condition == PatientCondition::Critical {
        ranges.set(SpO2, 88.0, 100.0);
    }

    match patient.sample_type {
        SampleType::Venous | SampleType::Capillary => ranges.set(PaO2, 35.0, 45.0),
        SampleType::Arterial => {}
    }

    ranges
}

/// Check the compiled-in tables and the configuration once, before serving.
///
/// Every age bracket, condition and sample type is probed so an inverted
/// interval surfaces here instead of during an analysis.
pub fn validate_reference_tables(config: &AnalyzerConfig) -> Result<(), AnalyzerError> {
    config.validate()?;

    const PROBE_AGES: [f64; 5] = [0.5, 2.0, 6.0, 40.0, 80.0];
    let conditions = [
        PatientCondition::Stable,
        PatientCondition::Critical,
        PatientCondition::PostOp,
        PatientCondition::Icu,
    ];
    let samples = [SampleType::Arterial, SampleType::Venous, SampleType::Capillary];

    for age in PROBE_AGES {
        for condition in conditions {
            for sample_type in samples {
                let patient = PatientContext::adult(age)
                    .with_condition(condition)
                    .with_sample_type(sample_type);
                ranges_for(&patient).validate()?;
            }
        }
    }

    Ok(())
}

/// Least-squares trend and coefficient-of-variation stability of a series.
pub fn analyze_trend(readings: &[f64], profile: &TrendProfile) -> TrendResult {
    if readings.len() < 2 {
        return TrendResult::insufficient();
    }

    let slope = least_squares_slope(readings);
    let trend = if slope > profile.slope_threshold {
        Trend::Increasing
    } else if slope < -profile.slope_threshold {
        Trend::Decreasing
    } else {
        Trend::Stable
    };

    let cv = coefficient_of_variation(readings);
    let stability = if cv < profile.high_stability_cv {
        Stability::High
    } else if cv < profile.medium_stability_cv {
        Stability::Medium
    } else {
        Stability::Low
    };

    TrendResult {
        trend,
        slope,
        stability,
        coefficient_of_variation: cv,
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn least_squares_slope(values: &[f64]) -> f64 {
    let mean_x = (values.len() as f64 - 1.0) / 2.0;
    let mean_y = mean(values);

    let (covariance, variance) = values.iter().enumerate().fold(
        (0.0, 0.0),
        |(cov, var), (index, value)| {
            let dx = index as f64 - mean_x;
            (cov + dx * (value - mean_y), var + dx * dx)
        },
    );

    if variance == 0.0 {
        0.0
    } else {
        covariance / variance
    }
}

/// Population standard deviation over the mean; zero when the mean is not positive.
fn coefficient_of_variation(values: &[f64]) -> f64 {
    let avg = mean(values);
    if avg <= 0.0 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt() / avg
}

/// Condition under which an absolute threshold fires.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trigger {
    Below(f64),
    Above(f64),
    /// Half-open `[low, high)`.
    Within { low: f64, high: f64 },
}

impl Trigger {
    pub fn matches(self, value: f64) -> bool {
        match self {
            Trigger::Below(limit) => value < limit,
            Trigger::Above(limit) => value > limit,
            Trigger::Within { low, high } => value >= low && value < high,
        }
    }
}

/// Life-threatening limit that applies regardless of the patient's range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdRule {
    pub parameter: ParameterId,
    pub trigger: Trigger,
    pub severity: Severity,
    pub message: &'static str,
}

const fn threshold(
    parameter: ParameterId,
    trigger: Trigger,
    severity: Severity,
    message: &'static str,
) -> ThresholdRule {
    ThresholdRule {
        parameter,
        trigger,
        severity,
        message,
    }
}

const FIXED_THRESHOLDS: [ThresholdRule; 12] = {
    use ParameterId::*;
    use Severity::{Critical, Warning};
    [
        threshold(PaO2, Trigger::Below(60.0), Critical, "Severe hypoxemia - Immediate intervention required"),
        threshold(PaO2, Trigger::Within { low: 60.0, high: 80.0 }, Warning, "Moderate hypoxemia"),
        threshold(PaCo2, Trigger::Above(60.0), Critical, "Severe hypercapnia - Respiratory failure"),
        threshold(PaCo2, Trigger::Below(30.0), Warning, "Hyperventilation detected"),
        threshold(Lactate, Trigger::Above(4.0), Critical, "Severe lactic acidosis - Tissue hypoxia"),
        threshold(Potassium, Trigger::Above(6.0), Critical, "Severe hyperkalemia - Cardiac arrhythmia risk"),
        threshold(Potassium, Trigger::Below(3.0), Critical, "Severe hypokalemia - Cardiac arrhythmia risk"),
        threshold(Glucose, Trigger::Below(50.0), Critical, "Severe hypoglycemia - Neurological risk"),
        threshold(Glucose, Trigger::Above(300.0), Critical, "Severe hyperglycemia - DKA risk"),
        threshold(SpO2, Trigger::Below(90.0), Critical, "Severe hypoxemia - Oxygen saturation below 90%"),
        threshold(HeartRate, Trigger::Above(150.0), Critical, "Tachycardia - Heart rate above 150 bpm"),
        threshold(SystolicBp, Trigger::Above(180.0), Critical, "Hypertensive crisis - Systolic pressure above 180 mmHg"),
    ]
};

/// Full absolute-threshold table for an alert profile, in evaluation order.
pub fn threshold_rules(profile: AlertProfile) -> impl Iterator<Item = ThresholdRule> {
    let ph_rules = [
        threshold(
            ParameterId::Ph,
            Trigger::Below(profile.severe_acidemia_below()),
            Severity::Critical,
            "Severe acidemia - Life threatening",
        ),
        threshold(
            ParameterId::Ph,
            Trigger::Above(profile.severe_alkalemia_above()),
            Severity::Critical,
            "Severe alkalemia - Life threatening",
        ),
    ];
    ph_rules.into_iter().chain(FIXED_THRESHOLDS)
}

/// Alerts for one current value: the range breach first, then every
/// absolute threshold that fires. Overlapping findings are all kept.
pub fn check_alert(
    value: f64,
    range: Range,
    parameter: ParameterId,
    profile: AlertProfile,
) -> Vec<Alert> {
    let rule = parameter.rule();
    let unit = rule.unit;
    let mut alerts = Vec::new();

    if value < range.low {
        let severity = if rule.critical_when_low {
            Severity::Critical
        } else {
            Severity::Warning
        };
        alerts.push(Alert::new(
            severity,
            format!("{} low ({value}{unit} < {}{unit})", rule.label, range.low),
        ));
    } else if value > range.high {
        let severity = if rule.critical_when_high {
            Severity::Critical
        } else {
            Severity::Warning
        };
        alerts.push(Alert::new(
            severity,
            format!("{} high ({value}{unit} > {}{unit})", rule.label, range.high),
        ));
    }

    alerts.extend(
        threshold_rules(profile)
            .filter(|limit| limit.parameter == parameter && limit.trigger.matches(value))
            .map(|limit| Alert::new(limit.severity, limit.message)),
    );

    alerts
}

/// Interpret pH, PaCO2 and HCO3. The first matching pattern wins.
pub fn classify_acid_base(ph: f64, pa_co2: f64, hco3: f64) -> AcidBaseStatus {
    use AcidBaseDisorder::*;

    if ph < 7.35 {
        if pa_co2 > 45.0 {
            AcidBaseStatus::new(RespiratoryAcidosis, hco3 > 26.0)
        } else if hco3 < 22.0 {
            AcidBaseStatus::new(MetabolicAcidosis, pa_co2 < 35.0)
        } else {
            AcidBaseStatus::mixed()
        }
    } else if ph > 7.45 {
        if pa_co2 < 35.0 {
            AcidBaseStatus::new(RespiratoryAlkalosis, hco3 < 22.0)
        } else if hco3 > 26.0 {
            AcidBaseStatus::new(MetabolicAlkalosis, pa_co2 > 45.0)
        } else {
            AcidBaseStatus::mixed()
        }
    } else {
        AcidBaseStatus::normal()
    }
}

/// Na − (Cl + HCO3), in mEq/L.
pub fn anion_gap(sodium: f64, chloride: f64, hco3: f64) -> f64 {
    sodium - (chloride + hco3)
}

pub fn anion_gap_status(gap: f64) -> AnionGapStatus {
    if gap > 12.0 {
        AnionGapStatus::High
    } else if gap < 8.0 {
        AnionGapStatus::Low
    } else {
        AnionGapStatus::Normal
    }
}

/// Saturation (%) on the oxygen dissociation curve with P50 = 26.8 mmHg.
pub fn estimate_spo2(pa_o2: f64) -> u8 {
    if pa_o2.is_nan() || pa_o2 <= 0.0 {
        return 0;
    }
    let saturation = 100.0 - 100.0 / (1.0 + (pa_o2 / 26.8).powf(2.6));
    saturation.round().clamp(0.0, 100.0) as u8
}

/// Evaluate a set of series, stamping the report with the current time.
pub fn analyze(
    inputs: &BTreeMap<ParameterId, Vec<f64>>,
    patient: &PatientContext,
    config: &AnalyzerConfig,
) -> AnalysisReport {
    analyze_at(inputs, patient, config, Utc::now())
}

/// Evaluate a set of series. Identical arguments give identical reports.
pub fn analyze_at(
    inputs: &BTreeMap<ParameterId, Vec<f64>>,
    patient: &PatientContext,
    config: &AnalyzerConfig,
    generated_at: DateTime<Utc>,
) -> AnalysisReport {
    let ranges = ranges_for(patient);
    let mut parameters = BTreeMap::new();
    let mut skipped = Vec::new();

    for (&id, series) in inputs {
        match analyze_parameter(id, series, ranges.get(id), config) {
            Some(analysis) => {
                debug!(
                    parameter = %id,
                    current = analysis.current,
                    status = ?analysis.status,
                    alerts = analysis.alerts.len(),
                    "Evaluated parameter"
                );
                parameters.insert(id, analysis);
            }
            None => {
                warn!(parameter = %id, "Empty series, parameter skipped");
                skipped.push(id);
            }
        }
    }

    let calculated = calculate_derived(&parameters);

    let all_alerts = parameters
        .values()
        .flat_map(|analysis| analysis.alerts.iter())
        .chain(calculated.alerts.iter());
    let (critical_alerts, warning_alerts): (Vec<Alert>, Vec<Alert>) =
        all_alerts.cloned().partition(Alert::is_critical);

    let status = if !critical_alerts.is_empty() {
        OverallStatus::Critical
    } else if !warning_alerts.is_empty() {
        OverallStatus::Abnormal
    } else {
        OverallStatus::Normal
    };

    debug!(
        status = ?status,
        critical = critical_alerts.len(),
        warnings = warning_alerts.len(),
        "Analysis complete"
    );

    AnalysisReport {
        generated_at,
        parameters,
        calculated,
        skipped,
        overall: OverallAssessment {
            status,
            total_alerts: critical_alerts.len() + warning_alerts.len(),
            critical_alerts,
            warning_alerts,
            patient: patient.clone(),
        },
    }
}

fn analyze_parameter(
    id: ParameterId,
    series: &[f64],
    range: Range,
    config: &AnalyzerConfig,
) -> Option<ParameterAnalysis> {
    let current = *series.last()?;
    let min = series.iter().copied().fold(f64::INFINITY, f64::min);
    let max = series.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let trend_analysis = if series.len() < config.min_trend_readings {
        TrendResult::insufficient()
    } else {
        analyze_trend(series, config.trend_profile(id.class()))
    };

    let status = if range.contains(current) {
        ParameterStatus::Normal
    } else {
        ParameterStatus::Abnormal
    };

    Some(ParameterAnalysis {
        current,
        average: mean(series),
        min,
        max,
        readings: series.len(),
        unit: id.unit().trim().to_string(),
        normal_range: range,
        status,
        trend_analysis,
        alerts: check_alert(current, range, id, config.alert_profile),
        spo2_estimated: (id == ParameterId::PaO2).then(|| estimate_spo2(current)),
    })
}

fn calculate_derived(parameters: &BTreeMap<ParameterId, ParameterAnalysis>) -> CalculatedValues {
    let current = |id: ParameterId| parameters.get(&id).map(|analysis| analysis.current);
    let mut calculated = CalculatedValues::default();

    if let (Some(ph), Some(pa_co2), Some(hco3)) = (
        current(ParameterId::Ph),
        current(ParameterId::PaCo2),
        current(ParameterId::Hco3),
    ) {
        let status = classify_acid_base(ph, pa_co2, hco3);
        calculated.acid_base_summary = Some(status.description());
        calculated.acid_base_status = Some(status);
    }

    if let (Some(sodium), Some(chloride), Some(hco3)) = (
        current(ParameterId::Sodium),
        current(ParameterId::Chloride),
        current(ParameterId::Hco3),
    ) {
        // Status is banded on the reported 0.1 mEq/L value.
        let gap = (anion_gap(sodium, chloride, hco3) * 10.0).round() / 10.0;
        let status = anion_gap_status(gap);
        if status == AnionGapStatus::High {
            calculated
                .alerts
                .push(Alert::warning(format!("High anion gap: {gap:.1} mEq/L")));
        }
        calculated.anion_gap = Some(gap);
        calculated.anion_gap_status = Some(status);
    }

    calculated
}

/// A panel as supplied by a form layer: patient plus named series.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelInput {
    pub patient: PatientContext,
    pub series: BTreeMap<ParameterId, Vec<f64>>,
}

impl PanelInput {
    /// Read `{"patient": {...}, "series": {"pH": [7.31, 7.28], ...}}`.
    ///
    /// Unknown series names are logged and dropped; a later alias of an
    /// already-seen parameter is ignored.
    pub fn from_value(panel: &Value) -> Result<Self, AnalyzerError> {
        let patient = panel
            .get("patient")
            .cloned()
            .ok_or(AnalyzerError::MissingData)
            .and_then(|value| {
                serde_json::from_value::<PatientContext>(value)
                    .map_err(|err| AnalyzerError::Parse(format!("patient: {err}")))
            })?;

        let entries = panel
            .get("series")
            .and_then(Value::as_object)
            .ok_or(AnalyzerError::MissingData)?;

        let mut series = BTreeMap::new();
        for (name, values) in entries {
            let id = match name.parse::<ParameterId>() {
                Ok(id) => id,
                Err(err) => {
                    warn!(name = %name, error = %err, "Ignoring series");
                    continue;
                }
            };

            let readings = parse_readings(name, values)?;
            if series.contains_key(&id) {
                warn!(name = %name, parameter = %id, "Duplicate series for parameter, keeping the first");
                continue;
            }
            series.insert(id, readings);
        }

        Ok(Self { patient, series })
    }
}

fn parse_readings(name: &str, values: &Value) -> Result<Vec<f64>, AnalyzerError> {
    let items = values
        .as_array()
        .ok_or_else(|| AnalyzerError::Parse(format!("series {name} must be an array")))?;

    items
        .iter()
        .map(|item| {
            item.as_f64()
                .filter(|reading| reading.is_finite())
                .ok_or_else(|| {
                    AnalyzerError::Parse(format!("series {name} contains a non-numeric value: {item}"))
                })
        })
        .collect()
}

/// Analyze a panel from a JSON string.
pub fn analyze_panel_str(
    panel_json: &str,
    config: &AnalyzerConfig,
) -> Result<AnalysisReport, AnalyzerError> {
    let value: Value =
        serde_json::from_str(panel_json).map_err(|err| AnalyzerError::Parse(err.to_string()))?;
    analyze_panel_value(&value, config)
}

/// Analyze a panel from a `serde_json::Value`.
pub fn analyze_panel_value(
    panel: &Value,
    config: &AnalyzerConfig,
) -> Result<AnalysisReport, AnalyzerError> {
    let input = PanelInput::from_value(panel)?;
    Ok(analyze(&input.series, &input.patient, config))
}
