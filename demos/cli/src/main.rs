use std::path::PathBuf;

use anyhow::Context;
use bloodgas_core::AnalyzerConfig;
use bloodgas_engine::{analyze_panel_str, validate_reference_tables};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "bloodgas-cli",
    about = "Phân tích panel khí máu động mạch và dấu hiệu sinh tồn từ file JSON."
)]
struct Args {
    /// Đường dẫn tới file JSON panel.
    #[arg(short, long)]
    input: PathBuf,

    /// File JSON cấu hình (mặc định nếu bỏ trống).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// In toàn bộ báo cáo dạng JSON.
    #[arg(long)]
    json: bool,

    /// Định dạng JSON dễ đọc (dùng cùng --json).
    #[arg(long, requires = "json")]
    pretty: bool,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AnalyzerConfig> {
    let Some(path) = path else {
        return Ok(AnalyzerConfig::default());
    };
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Không đọc được file cấu hình {path:?}"))?;
    serde_json::from_str(&data).with_context(|| format!("Cấu hình không hợp lệ: {path:?}"))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();

    let config = load_config(args.config.as_ref())?;
    validate_reference_tables(&config).context("Bảng tham chiếu hoặc cấu hình không hợp lệ")?;

    let data = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Không đọc được file {:?}", args.input))?;
    let report = analyze_panel_str(&data, &config)?;

    tracing::info!(
        parameters = report.parameters.len(),
        skipped = report.skipped.len(),
        "Panel analyzed"
    );

    if args.json {
        let rendered = if args.pretty {
            serde_json::to_string_pretty(&report)?
        } else {
            serde_json::to_string(&report)?
        };
        println!("{rendered}");
        return Ok(());
    }

    println!(
        "Generated at: {}\nOverall status: {:?}\nCritical alerts: {}\nWarning alerts: {}",
        report.generated_at,
        report.status(),
        report.overall.critical_alerts.len(),
        report.overall.warning_alerts.len(),
    );

    if let Some(summary) = &report.calculated.acid_base_summary {
        println!("Acid-base: {summary}");
    }
    if let (Some(gap), Some(status)) = (report.calculated.anion_gap, report.calculated.anion_gap_status) {
        println!("Anion gap: {gap:.1} mEq/L ({})", status.description());
    }
    for alert in report.alerts() {
        println!("  - {alert}");
    }

    Ok(())
}
