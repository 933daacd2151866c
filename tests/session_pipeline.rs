//! Session file -> pipeline -> export, without spawning the binary.

use std::io::Write;
use std::path::PathBuf;

use sherpa_pha::app::pipeline;
use sherpa_pha::cli::SessionArgs;
use sherpa_pha::domain::{AnalysisUnit, DataId, PlotData, PlotKind};
use tempfile::{NamedTempFile, TempDir};

const SESSION: &str = r#"{
    "components": [
        { "type": "const1d", "name": "cpt", "c0": 102.0 },
        { "type": "powlaw1d", "name": "bcpt", "gamma": 0.0, "ampl": 0.1 }
    ],
    "datasets": [
        {
            "id": "one",
            "data": {
                "name": "example",
                "channel": [1, 2, 3, 4, 5, 6, 7, 8, 9, 10],
                "counts": [0, 1, 2, 3, 4, 0, 1, 2, 3, 4],
                "exposure": 1201.0,
                "backscal": 0.1,
                "arf": {
                    "name": "test-arf",
                    "energ_lo": [0.5, 0.6, 0.7, 0.8, 0.9, 1.0, 1.1, 1.2, 1.3, 1.4],
                    "energ_hi": [0.6, 0.7, 0.8, 0.9, 1.0, 1.1, 1.2, 1.3, 1.4, 1.5],
                    "specresp": [0.8, 0.8, 0.9, 1.0, 1.1, 1.1, 0.7, 0.6, 0.6, 0.6],
                    "exposure": 1201.0
                },
                "rmf": {
                    "name": "test-rmf",
                    "energ_lo": [0.5, 0.6, 0.7, 0.8, 0.9, 1.0, 1.1, 1.2, 1.3, 1.4],
                    "energ_hi": [0.6, 0.7, 0.8, 0.9, 1.0, 1.1, 1.2, 1.3, 1.4, 1.5]
                }
            },
            "backgrounds": [
                {
                    "id": 1,
                    "data": {
                        "name": "example-bkg",
                        "channel": [1, 2, 3, 4, 5, 6, 7, 8, 9, 10],
                        "counts": [1, 0, 0, 1, 0, 0, 2, 0, 0, 1],
                        "exposure": 3002.5,
                        "backscal": 0.4
                    }
                }
            ],
            "source": ["cpt"],
            "background_models": [ { "bkg_id": 1, "model": ["bcpt"] } ]
        }
    ]
}"#;

/// Write the session to a temporary file; the file lives as long as the handle.
fn session_args(analysis: Option<AnalysisUnit>) -> (NamedTempFile, SessionArgs) {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(SESSION.as_bytes()).unwrap();
    let args = SessionArgs {
        session: file.path().to_path_buf(),
        analysis,
    };
    (file, args)
}

#[test]
fn fit_plot_from_session_file() {
    let (_file, args) = session_args(Some(AnalysisUnit::Energy));
    let id = DataId::from("one");
    let session = pipeline::load_session(&args, std::slice::from_ref(&id)).unwrap();

    let plots = pipeline::run_plot(&session, PlotKind::Fit, &id, &DataId::Int(1)).unwrap();
    assert_eq!(plots.len(), 2);
    assert_eq!(plots[0].title, "example");
    assert_eq!(plots[1].title, "Model");
    assert_eq!(plots[1].xlabel, "Energy (keV)");

    // 102 per keV folded through the ARF, plus 0.1 * 0.1 per keV of background.
    let arf = [0.8, 0.8, 0.9, 1.0, 1.1, 1.1, 0.7, 0.6, 0.6, 0.6];
    for (y, a) in plots[1].y.iter().zip(arf) {
        let want = a * (102.0 + 0.01);
        assert!((y - want).abs() < 1e-9, "got {y}, want {want}");
    }
}

#[test]
fn exports_plot_as_csv_and_json() {
    let (_file, args) = session_args(None);
    let id = DataId::from("one");
    let session = pipeline::load_session(&args, &[]).unwrap();
    let plots = pipeline::run_plot(&session, PlotKind::BkgResid, &id, &DataId::Int(1)).unwrap();

    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("bkg-resid.csv");
    let json = dir.path().join("bkg-resid.json");
    sherpa_pha::io::write_plot_csv(&csv, &plots).unwrap();
    sherpa_pha::io::write_plot_json(&json, &plots).unwrap();

    let text = std::fs::read_to_string(&csv).unwrap();
    assert_eq!(text.lines().count(), 11);
    assert!(text.lines().nth(1).unwrap().starts_with("Residuals of example-bkg - Bkg Model,"));

    let back: Vec<PlotData> = serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
    assert_eq!(back.len(), 1);
    assert_eq!(back[0].title, plots[0].title);
    assert_eq!(back[0].y.len(), 10);
}

#[test]
fn stat_and_fake_are_reproducible() {
    let (_file, args) = session_args(None);
    let id = DataId::from("one");

    let session = pipeline::load_session(&args, &[]).unwrap();
    let info = pipeline::run_stat(&session, &[]).unwrap();
    assert_eq!(info.len(), 1);
    assert_eq!(info[0].id, id);
    assert_eq!(info[0].numpoints, 10);

    let a = pipeline::run_fake(&session, &id, 11).unwrap();
    let other = pipeline::load_session(&args, &[]).unwrap();
    let b = pipeline::run_fake(&other, &id, 11).unwrap();
    assert_eq!(a.y, b.y);
}

#[test]
fn missing_session_file_is_an_io_error() {
    let args = SessionArgs {
        session: PathBuf::from("/nonexistent/session.json"),
        analysis: None,
    };
    let err = pipeline::load_session(&args, &[]).unwrap_err();
    assert_eq!(err.exit_code(), 2);
}
