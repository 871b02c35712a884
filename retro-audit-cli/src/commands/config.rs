use std::path::Path;

use retro_audit_lib::{AuditConfig, settings_path};

pub(crate) fn run_config(path: Option<&Path>, config: &AuditConfig) {
    let shown = path.map(Path::to_path_buf).unwrap_or_else(settings_path);
    let source = if shown.exists() { "" } else { " (not found, using defaults)" };
    log::info!("Settings: {}{}", shown.display(), source);
    log::info!("  display_mode      = {}", config.display_mode);
    let statuses: Vec<String> = Vec::<retro_audit_lib::AuditStatus>::from(config.status_filter)
        .iter()
        .map(|s| s.label().to_lowercase())
        .collect();
    log::info!("  status_filter     = [{}]", statuses.join(", "));
    log::info!("  compare_extension = {}", config.matching.compare_extension);
    log::info!("  use_checksums     = {}", config.matching.use_checksums);
}
