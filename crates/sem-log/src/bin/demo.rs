use sem_log::{FormatPolicy, FormatSpec, LoggerConfig, MetricLog};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let label = std::env::args().nth(1).unwrap_or_else(|| "demo".to_string());

    let config = match std::env::var("SEM_LOG_CONFIG") {
        Ok(path) => LoggerConfig::from_json_file(path)?,
        Err(_) => LoggerConfig::default(),
    };
    let formats = FormatPolicy::from_pairs([("acc", ".3f")])?
        .with_override("lr", FormatSpec::Exponent(2));
    let config = config.with_formats(formats);

    let mut log = MetricLog::with_config(&label, config)?;
    log.print(&format!("run '{}' started", label))?;

    let mut lr = 1e-2;
    for epoch in 0..10 {
        let t = epoch as f64;
        log.record(epoch, "loss", 2.5 * (-0.3 * t).exp());
        log.record(epoch, "acc", 1.0 - 0.9 * (-0.4 * t).exp());
        log.record(epoch, "lr", lr);
        if epoch % 2 == 0 {
            log.record(epoch, "val_loss", 2.7 * (-0.25 * t).exp());
        }
        lr *= 0.8;

        log.report_latest(None)?;
    }

    log.export_all()?;
    tracing::info!("checkpoint path reserved at {}", log.checkpoint_path().display());
    Ok(())
}
