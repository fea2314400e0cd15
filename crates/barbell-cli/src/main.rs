mod bootstrap;

use anyhow::{Context, Result};
use barbell_core::settings::Settings;
use barbell_data::analysis::{run_pipeline, PipelineResult};
use barbell_data::resampler::PreviewRow;

fn main() -> Result<()> {
    let settings = Settings::load()?;

    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_deref())?;

    tracing::info!("barbell v{} starting", env!("CARGO_PKG_VERSION"));

    let config = settings.pipeline_config()?;
    tracing::info!(
        "Data: {}, output: {}, bucket: {} ms, timezone: {}",
        config.data_dir.display(),
        config.output.display(),
        config.bucket_width.num_milliseconds(),
        settings.timezone
    );

    let result = run_pipeline(&config)
        .with_context(|| format!("preprocessing {} failed", config.data_dir.display()))?;

    if let Some(preview) = &result.preview {
        log_preview(preview);
    }
    log_result(&result);

    Ok(())
}

/// Log the diagnostic grid one bucket per line.
fn log_preview(rows: &[PreviewRow]) {
    let empty = rows.iter().filter(|r| r.means.is_none()).count();
    tracing::info!("Preview: {} buckets, {} without readings", rows.len(), empty);

    for row in rows {
        let channels = match row.means {
            Some(m) => format!(
                "{:>9.4} {:>9.4} {:>9.4} {:>9.3} {:>9.3} {:>9.3}",
                m[0], m[1], m[2], m[3], m[4], m[5]
            ),
            None => format!("{:>59}", "-"),
        };
        tracing::info!(
            "{} {} {} {} {} {}",
            row.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            channels,
            row.participant,
            row.label,
            row.category,
            row.set
        );
    }
}

fn log_result(result: &PipelineResult) {
    let meta = &result.metadata;
    for day in &meta.days {
        tracing::info!("{}: {} merged rows -> {} buckets", day.date, day.source_rows, day.buckets);
    }
    tracing::info!(
        "Done: {} files, {} merged rows ({} dropped), {} resampled rows written to {}",
        meta.files_processed,
        meta.merged_rows,
        meta.merge.dropped(),
        meta.resampled_rows,
        meta.output.display()
    );
}
