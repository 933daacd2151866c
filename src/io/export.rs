//! Export plot products to CSV or JSON.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::PlotData;
use crate::error::AppError;

/// Write one or more plots to a CSV file, one row per bin.
///
/// Fit plots export as two blocks (data then model) sharing the header; the
/// `plot` column tells them apart.
pub fn write_plot_csv(path: &Path, plots: &[PlotData]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);

    // Header
    writeln!(out, "plot,x,xlo,xhi,y,yerr")
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for plot in plots {
        let opt = |v: Option<&Vec<f64>>, i: usize| {
            v.and_then(|v| v.get(i)).map(|v| format!("{v:.10e}")).unwrap_or_default()
        };
        for i in 0..plot.y.len() {
            writeln!(
                out,
                "{},{},{},{},{:.10e},{}",
                csv_field(&plot.title),
                plot.x.get(i).map(|v| format!("{v:.10e}")).unwrap_or_default(),
                opt(plot.xlo.as_ref(), i),
                opt(plot.xhi.as_ref(), i),
                plot.y[i],
                opt(plot.yerr.as_ref(), i),
            )
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
        }
    }

    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV '{}': {e}", path.display())))?;
    log::info!("wrote {} plot(s) to {}", plots.len(), path.display());
    Ok(())
}

/// Write plots as pretty-printed JSON (an array of `PlotData`).
pub fn write_plot_json(path: &Path, plots: &[PlotData]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(BufWriter::new(file), plots)
        .map_err(|e| AppError::new(2, format!("Failed to write export JSON '{}': {e}", path.display())))?;
    log::info!("wrote {} plot(s) to {}", plots.len(), path.display());
    Ok(())
}

/// Quote a field when it contains a separator, quote or newline.
fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn plot() -> PlotData {
        PlotData {
            x: vec![1.0, 2.0],
            xlo: None,
            xhi: None,
            y: vec![0.5, 0.25],
            yerr: Some(vec![0.1, 0.2]),
            title: "src, with comma".to_string(),
            xlabel: "Channel".to_string(),
            ylabel: "Counts/sec/channel".to_string(),
        }
    }

    #[test]
    fn csv_has_header_and_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plot.csv");
        write_plot_csv(&path, &[plot()]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "plot,x,xlo,xhi,y,yerr");
        assert!(lines[1].starts_with("\"src, with comma\",1.0000000000e0,,,"));
    }

    #[test]
    fn json_round_trips_plot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plot.json");
        write_plot_json(&path, &[plot()]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();

        let back: Vec<PlotData> = serde_json::from_str(&text).unwrap();
        assert_eq!(back, vec![plot()]);
    }

    #[test]
    fn unwritable_path_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("plot.csv");
        let err = write_plot_csv(&path, &[plot()]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
