use bloodgas_core::{Stability, Trend, TrendProfile};
use bloodgas_engine::analyze_trend;

#[test]
fn flat_vital_series_is_stable_and_highly_stable() {
    let result = analyze_trend(&[72.0, 72.0, 72.0, 72.0], &TrendProfile::vital_sign());

    assert_eq!(result.trend, Trend::Stable);
    assert_eq!(result.slope, 0.0);
    assert_eq!(result.stability, Stability::High);
    assert_eq!(result.coefficient_of_variation, 0.0);
}

#[test]
fn rising_heart_rate_is_increasing() {
    let result = analyze_trend(&[70.0, 80.0, 90.0, 100.0], &TrendProfile::vital_sign());

    assert_eq!(result.trend, Trend::Increasing);
    assert!((result.slope - 10.0).abs() < 1e-9);
}

#[test]
fn falling_lab_series_is_decreasing() {
    let result = analyze_trend(&[7.40, 7.35, 7.30, 7.25], &TrendProfile::laboratory());

    assert_eq!(result.trend, Trend::Decreasing);
    assert!((result.slope + 0.05).abs() < 1e-9);
}

#[test]
fn slope_inside_threshold_is_stable() {
    // 0.005 per reading is below the 0.01 laboratory threshold.
    let result = analyze_trend(&[7.400, 7.405, 7.410], &TrendProfile::laboratory());
    assert_eq!(result.trend, Trend::Stable);

    // A finer threshold picks the same drift up.
    let tight = TrendProfile {
        slope_threshold: 0.001,
        ..TrendProfile::laboratory()
    };
    assert_eq!(analyze_trend(&[7.400, 7.405, 7.410], &tight).trend, Trend::Increasing);
}

#[test]
fn fewer_than_two_readings_is_insufficient() {
    for readings in [&[][..], &[95.0][..]] {
        let result = analyze_trend(readings, &TrendProfile::vital_sign());
        assert_eq!(result.trend, Trend::InsufficientData);
        assert_eq!(result.slope, 0.0);
        assert_eq!(result.stability, Stability::Unknown);
    }
}

#[test]
fn stability_bands_differ_between_profiles() {
    // mean 100, population std 8 -> CV 0.08
    let readings = [92.0, 108.0];

    assert_eq!(
        analyze_trend(&readings, &TrendProfile::vital_sign()).stability,
        Stability::High
    );
    assert_eq!(
        analyze_trend(&readings, &TrendProfile::laboratory()).stability,
        Stability::Medium
    );
}

#[test]
fn noisy_series_has_low_stability() {
    let result = analyze_trend(&[50.0, 150.0, 50.0, 150.0], &TrendProfile::vital_sign());
    assert_eq!(result.stability, Stability::Low);
}

#[test]
fn non_positive_mean_reports_zero_variation() {
    let result = analyze_trend(&[-4.0, -2.0, -6.0], &TrendProfile::laboratory());

    assert_eq!(result.coefficient_of_variation, 0.0);
    assert_eq!(result.stability, Stability::High);
}
