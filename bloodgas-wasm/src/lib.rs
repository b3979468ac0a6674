//! Bridge WASM <-> JavaScript trung lập framework.

use bloodgas_core::{AlertProfile, AnalysisReport, AnalyzerConfig, AnalyzerError, TrendProfile};
use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::{from_value, Serializer};
use wasm_bindgen::prelude::*;

#[derive(Deserialize)]
struct JsTrendProfile {
    #[serde(default)]
    slope_threshold: Option<f64>,
    #[serde(default)]
    high_stability_cv: Option<f64>,
    #[serde(default)]
    medium_stability_cv: Option<f64>,
}

impl JsTrendProfile {
    fn merge_into(self, base: &mut TrendProfile) {
        if let Some(slope) = self.slope_threshold {
            base.slope_threshold = slope;
        }
        if let Some(cv) = self.high_stability_cv {
            base.high_stability_cv = cv;
        }
        if let Some(cv) = self.medium_stability_cv {
            base.medium_stability_cv = cv;
        }
    }
}

#[derive(Deserialize)]
struct JsAnalyzerConfig {
    #[serde(default)]
    laboratory_trend: Option<JsTrendProfile>,
    #[serde(default)]
    vital_trend: Option<JsTrendProfile>,
    #[serde(default)]
    alert_profile: Option<AlertProfile>,
    #[serde(default)]
    min_trend_readings: Option<usize>,
}

impl From<JsAnalyzerConfig> for AnalyzerConfig {
    fn from(cfg: JsAnalyzerConfig) -> Self {
        let mut base = AnalyzerConfig::default();
        if let Some(profile) = cfg.laboratory_trend {
            profile.merge_into(&mut base.laboratory_trend);
        }
        if let Some(profile) = cfg.vital_trend {
            profile.merge_into(&mut base.vital_trend);
        }
        if let Some(profile) = cfg.alert_profile {
            base.alert_profile = profile;
        }
        if let Some(readings) = cfg.min_trend_readings {
            base.min_trend_readings = readings;
        }
        base
    }
}

/// Phân tích một panel khí máu: `{ patient, series }` -> báo cáo.
#[wasm_bindgen]
pub fn analyze_panel(input_panel: JsValue, config: Option<JsValue>) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let panel_value = from_value::<serde_json::Value>(input_panel)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được JSON panel: {err}")))?;

    let cfg = match config {
        Some(js_cfg) => {
            let cfg: JsAnalyzerConfig = from_value(js_cfg)
                .map_err(|err| JsValue::from_str(&format!("Không đọc được config: {err}")))?;
            AnalyzerConfig::from(cfg)
        }
        None => AnalyzerConfig::default(),
    };

    bloodgas_engine::validate_reference_tables(&cfg)
        .map_err(|err| JsValue::from_str(&format_analyzer_error(err)))?;

    let report = bloodgas_engine::analyze_panel_value(&panel_value, &cfg)
        .map_err(|err| JsValue::from_str(&format_analyzer_error(err)))?;

    report_to_js(&report)
        .map_err(|err| JsValue::from_str(&format!("Không serialize báo cáo: {err}")))
}

/// Map trong báo cáo phải thành object thường để `JSON.stringify` và `report.parameters.pH` hoạt động.
fn report_to_js(report: &AnalysisReport) -> Result<JsValue, serde_wasm_bindgen::Error> {
    report.serialize(&Serializer::json_compatible())
}

fn format_analyzer_error(err: AnalyzerError) -> String {
    format!("Analyzer error: {err}")
}
