//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory while evaluating models
//! - read from session files
//! - exported to JSON/CSV as plot products

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Identifier of a dataset or of a background within a dataset.
///
/// Identifiers are either integers (`1`, `23`) or strings (`"one"`). The
/// default dataset and the default background are both `1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataId {
    Int(i64),
    Str(String),
}

impl Default for DataId {
    fn default() -> Self {
        DataId::Int(1)
    }
}

impl fmt::Display for DataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataId::Int(i) => write!(f, "{i}"),
            DataId::Str(s) => write!(f, "{s}"),
        }
    }
}

impl FromStr for DataId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<i64>() {
            Ok(i) => DataId::Int(i),
            Err(_) => DataId::Str(s.to_string()),
        })
    }
}

impl From<i64> for DataId {
    fn from(value: i64) -> Self {
        DataId::Int(value)
    }
}

impl From<&str> for DataId {
    fn from(value: &str) -> Self {
        DataId::Str(value.to_string())
    }
}

/// Analysis unit of a PHA dataset.
///
/// The unit only changes how the dataset is viewed (plot axes, bin widths);
/// the stored counts are always per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisUnit {
    #[default]
    Channel,
    Energy,
    Wavelength,
}

impl AnalysisUnit {
    /// X-axis label.
    pub fn xlabel(self) -> &'static str {
        match self {
            AnalysisUnit::Channel => "Channel",
            AnalysisUnit::Energy => "Energy (keV)",
            AnalysisUnit::Wavelength => "Wavelength (Angstrom)",
        }
    }

    /// Y-axis label for count-rate densities.
    pub fn rate_label(self) -> &'static str {
        match self {
            AnalysisUnit::Channel => "Counts/sec/channel",
            AnalysisUnit::Energy => "Counts/sec/keV",
            AnalysisUnit::Wavelength => "Counts/sec/Angstrom",
        }
    }
}

/// Which plot product to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PlotKind {
    Data,
    Model,
    Source,
    Resid,
    Ratio,
    Delchi,
    Chisqr,
    Fit,
    FitResid,
    FitRatio,
    FitDelchi,
    Bkg,
    BkgModel,
    BkgResid,
    BkgRatio,
    BkgDelchi,
    BkgChisqr,
    BkgFit,
    BkgFitResid,
    BkgFitRatio,
    BkgFitDelchi,
    Arf,
}

impl PlotKind {
    /// Whether this plot is about a background dataset.
    pub fn is_background(self) -> bool {
        matches!(
            self,
            PlotKind::Bkg
                | PlotKind::BkgModel
                | PlotKind::BkgResid
                | PlotKind::BkgRatio
                | PlotKind::BkgDelchi
                | PlotKind::BkgChisqr
                | PlotKind::BkgFit
                | PlotKind::BkgFitResid
                | PlotKind::BkgFitRatio
                | PlotKind::BkgFitDelchi
        )
    }
}

/// Values of a single plot (no rendering).
///
/// Histogram-style products fill `xlo`/`xhi`; point-style products fill `x`.
/// Both may be present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlotData {
    pub x: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xlo: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xhi: Option<Vec<f64>>,
    pub y: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yerr: Option<Vec<f64>>,
    pub title: String,
    pub xlabel: String,
    pub ylabel: String,
}

/// A data plot and a model plot sharing the same axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitPlot {
    pub dataplot: PlotData,
    pub modelplot: PlotData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_id_parses_ints_and_strings() {
        assert_eq!("23".parse::<DataId>().unwrap(), DataId::Int(23));
        assert_eq!("one".parse::<DataId>().unwrap(), DataId::Str("one".into()));
        assert_eq!(DataId::default().to_string(), "1");
    }

    #[test]
    fn data_id_deserializes_untagged() {
        let ids: Vec<DataId> = serde_json::from_str(r#"[1, "bkg"]"#).unwrap();
        assert_eq!(ids, vec![DataId::Int(1), DataId::Str("bkg".into())]);
    }

    #[test]
    fn combined_fit_kinds_use_kebab_names() {
        let kind = <PlotKind as ValueEnum>::from_str("bkg-fit-delchi", false).unwrap();
        assert_eq!(kind, PlotKind::BkgFitDelchi);
        assert!(kind.is_background());
        assert!(!PlotKind::FitResid.is_background());
        let kinds: Vec<PlotKind> = serde_json::from_str(r#"["fit-ratio", "bkg-fit-resid"]"#).unwrap();
        assert_eq!(kinds, vec![PlotKind::FitRatio, PlotKind::BkgFitResid]);
    }
}
