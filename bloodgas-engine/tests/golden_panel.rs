use std::fs;

use bloodgas_core::AnalyzerConfig;
use bloodgas_engine::analyze_panel_str;
use serde_json::Value;

fn fixture_path(name: &str) -> String {
    format!("{}/tests/data/{name}", env!("CARGO_MANIFEST_DIR"))
}

#[test]
fn critical_panel_matches_golden() {
    let panel = fs::read_to_string(fixture_path("critical_panel_input.json"))
        .expect("Không đọc được panel mẫu");

    let report =
        analyze_panel_str(&panel, &AnalyzerConfig::default()).expect("Không tạo được báo cáo");

    let mut actual = serde_json::to_value(report).expect("Không serialize báo cáo");
    normalize_dynamic_fields(&mut actual);

    let expected = fs::read_to_string(fixture_path("critical_panel_report.json"))
        .expect("Không đọc được golden report");

    let mut expected_value: Value = serde_json::from_str(&expected).expect("Golden không hợp lệ");
    normalize_dynamic_fields(&mut expected_value);

    assert_eq!(actual, expected_value);
}

fn normalize_dynamic_fields(value: &mut Value) {
    if let Some(obj) = value.as_object_mut() {
        if obj.contains_key("generated_at") {
            obj.insert(
                "generated_at".to_string(),
                Value::String("__DYNAMIC_TIMESTAMP__".to_string()),
            );
        }
    }
}
