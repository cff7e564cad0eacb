use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

/// Writes one table of computed records as CSV, headers included. Export
/// only serializes the fields as-is; no value is recomputed on the way out.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("writing row to {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("flushing {}", path.display()))?;
    Ok(())
}
