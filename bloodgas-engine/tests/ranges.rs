use bloodgas_core::{AnalyzerConfig, ParameterId, PatientCondition, PatientContext, Range, SampleType};
use bloodgas_engine::{ranges_for, validate_reference_tables};

fn range(low: f64, high: f64) -> Range {
    Range { low, high }
}

#[test]
fn adult_gets_base_ranges() {
    let ranges = ranges_for(&PatientContext::adult(40.0));

    assert_eq!(ranges.get(ParameterId::Ph), range(7.35, 7.45));
    assert_eq!(ranges.get(ParameterId::PaCo2), range(35.0, 45.0));
    assert_eq!(ranges.get(ParameterId::PaO2), range(80.0, 100.0));
    assert_eq!(ranges.get(ParameterId::Potassium), range(3.5, 5.0));
    assert_eq!(ranges.get(ParameterId::HeartRate), range(60.0, 100.0));
    assert_eq!(ranges.get(ParameterId::SpO2), range(95.0, 100.0));
    assert_eq!(ranges.iter().count(), ParameterId::ALL.len());
}

#[test]
fn infant_bracket_overrides_gas_and_vitals() {
    let ranges = ranges_for(&PatientContext::adult(0.5));

    assert_eq!(ranges.get(ParameterId::PaO2), range(60.0, 90.0));
    assert_eq!(ranges.get(ParameterId::PaCo2), range(30.0, 40.0));
    assert_eq!(ranges.get(ParameterId::HeartRate), range(100.0, 160.0));
    assert_eq!(ranges.get(ParameterId::RespiratoryRate), range(30.0, 60.0));
    assert_eq!(ranges.get(ParameterId::Ph), range(7.35, 7.45));
}

#[test]
fn pediatric_brackets_split_at_three_and_twelve() {
    let toddler = ranges_for(&PatientContext::adult(2.0));
    assert_eq!(toddler.get(ParameterId::HeartRate), range(80.0, 130.0));
    assert_eq!(toddler.get(ParameterId::RespiratoryRate), range(24.0, 40.0));
    assert_eq!(toddler.get(ParameterId::PaO2), range(75.0, 100.0));

    let child = ranges_for(&PatientContext::adult(3.0));
    assert_eq!(child.get(ParameterId::HeartRate), range(70.0, 110.0));
    assert_eq!(child.get(ParameterId::RespiratoryRate), range(18.0, 30.0));
    assert_eq!(child.get(ParameterId::PaO2), range(75.0, 100.0));

    let teenager = ranges_for(&PatientContext::adult(12.0));
    assert_eq!(teenager.get(ParameterId::HeartRate), range(60.0, 100.0));
    assert_eq!(teenager.get(ParameterId::PaO2), range(80.0, 100.0));
}

#[test]
fn elderly_bracket_starts_after_sixty_five() {
    let sixty_five = ranges_for(&PatientContext::adult(65.0));
    assert_eq!(sixty_five.get(ParameterId::PaO2), range(80.0, 100.0));

    let elderly = ranges_for(&PatientContext::adult(70.0));
    assert_eq!(elderly.get(ParameterId::PaO2), range(75.0, 95.0));
    assert_eq!(elderly.get(ParameterId::SystolicBp), range(90.0, 140.0));
}

#[test]
fn critical_condition_lowers_spo2_floor() {
    let patient = PatientContext::adult(50.0).with_condition(PatientCondition::Critical);
    assert_eq!(ranges_for(&patient).get(ParameterId::SpO2), range(88.0, 100.0));

    let icu = PatientContext::adult(50.0).with_condition(PatientCondition::Icu);
    assert_eq!(ranges_for(&icu).get(ParameterId::SpO2), range(95.0, 100.0));
}

#[test]
fn venous_and_capillary_samples_use_venous_pao2() {
    for sample_type in [SampleType::Venous, SampleType::Capillary] {
        let infant = PatientContext::adult(0.5).with_sample_type(sample_type);
        assert_eq!(ranges_for(&infant).get(ParameterId::PaO2), range(35.0, 45.0));
    }
}

#[test]
fn unknown_ages_fall_back_to_adult() {
    for age in [f64::NAN, -3.0, f64::INFINITY] {
        let ranges = ranges_for(&PatientContext::adult(age));
        assert_eq!(ranges.get(ParameterId::PaO2), range(80.0, 100.0));
        assert_eq!(ranges.get(ParameterId::HeartRate), range(60.0, 100.0));
    }
}

#[test]
fn compiled_tables_pass_startup_validation() {
    validate_reference_tables(&AnalyzerConfig::default()).expect("tables must be valid");
}

#[test]
fn startup_validation_rejects_bad_config() {
    let mut config = AnalyzerConfig::default();
    config.vital_trend.high_stability_cv = 0.3;

    assert!(validate_reference_tables(&config).is_err());
}
