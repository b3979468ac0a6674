use bloodgas_core::{AcidBaseDisorder, AcidBaseStatus, AnionGapStatus};
use bloodgas_engine::{anion_gap, anion_gap_status, classify_acid_base};

#[test]
fn uncompensated_respiratory_acidosis() {
    let status = classify_acid_base(7.25, 55.0, 24.0);

    assert_eq!(status, AcidBaseStatus::new(AcidBaseDisorder::RespiratoryAcidosis, false));
    assert_eq!(status.description(), "Respiratory Acidosis");
}

#[test]
fn respiratory_acidosis_with_metabolic_compensation() {
    let status = classify_acid_base(7.32, 60.0, 30.0);
    assert_eq!(
        status.description(),
        "Respiratory Acidosis with Metabolic Compensation"
    );
}

#[test]
fn metabolic_acidosis_with_respiratory_compensation() {
    let status = classify_acid_base(7.30, 30.0, 18.0);
    assert_eq!(
        status.description(),
        "Metabolic Acidosis with Respiratory Compensation"
    );
}

#[test]
fn respiratory_branch_wins_when_both_components_are_acidotic() {
    let status = classify_acid_base(7.20, 50.0, 18.0);
    assert_eq!(status.disorder, AcidBaseDisorder::RespiratoryAcidosis);
}

#[test]
fn alkaloses() {
    assert_eq!(
        classify_acid_base(7.50, 30.0, 24.0).description(),
        "Respiratory Alkalosis"
    );
    assert_eq!(
        classify_acid_base(7.50, 30.0, 20.0).description(),
        "Respiratory Alkalosis with Metabolic Compensation"
    );
    assert_eq!(
        classify_acid_base(7.50, 40.0, 30.0).description(),
        "Metabolic Alkalosis"
    );
    assert_eq!(
        classify_acid_base(7.48, 48.0, 34.0).description(),
        "Metabolic Alkalosis with Respiratory Compensation"
    );
}

#[test]
fn normal_ph_is_normal_regardless_of_components() {
    assert_eq!(classify_acid_base(7.40, 40.0, 24.0), AcidBaseStatus::normal());
    assert_eq!(classify_acid_base(7.35, 50.0, 30.0), AcidBaseStatus::normal());
    assert_eq!(classify_acid_base(7.45, 30.0, 18.0), AcidBaseStatus::normal());
}

#[test]
fn abnormal_ph_without_matching_component_is_flagged_as_mixed() {
    // Neither PaCO2 nor HCO3 explains the acidemia; no clinical label is guessed.
    let acidemia = classify_acid_base(7.30, 40.0, 24.0);
    assert_eq!(acidemia.disorder, AcidBaseDisorder::MixedOrUncharacterized);
    assert_eq!(acidemia.description(), "Mixed/Uncharacterized Disturbance");

    let alkalemia = classify_acid_base(7.50, 40.0, 24.0);
    assert_eq!(alkalemia, AcidBaseStatus::mixed());
}

#[test]
fn anion_gap_bands() {
    let gap = anion_gap(140.0, 100.0, 24.0);
    assert_eq!(gap, 16.0);
    assert_eq!(anion_gap_status(gap), AnionGapStatus::High);
    assert_eq!(
        anion_gap_status(gap).description(),
        "High (possible metabolic acidosis)"
    );

    assert_eq!(anion_gap_status(12.0), AnionGapStatus::Normal);
    assert_eq!(anion_gap_status(8.0), AnionGapStatus::Normal);
    assert_eq!(anion_gap_status(7.9), AnionGapStatus::Low);
}
