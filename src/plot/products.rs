//! Plot products for PHA datasets and their backgrounds.
//!
//! Every product is normalised to a rate density: counts are divided by the
//! exposure time and by the bin width in the current analysis unit (1 for
//! channels, keV for energy, Angstrom for wavelength).

use crate::background::ResponseRegistry;
use crate::data::{DataPha, PhaHandle};
use crate::domain::{AnalysisUnit, DataId, FitPlot, PlotData};
use crate::error::DataError;
use crate::instrument::Response;
use crate::models::{Grid, ModelExpr};
use crate::session::Session;

/// Axis values and normalisation of one dataset in one analysis unit.
struct View {
    x: Vec<f64>,
    xlo: Vec<f64>,
    xhi: Vec<f64>,
    norm: Vec<f64>,
    units: AnalysisUnit,
}

impl View {
    fn new(data: &DataPha, response: Option<&Response>) -> Result<Self, DataError> {
        let units = data.units();
        let (xlo, xhi) = data.bin_edges(units, response)?;
        let exposure = data.exposure.unwrap_or(1.0);
        let norm = xlo.iter().zip(&xhi).map(|(l, h)| exposure * (h - l)).collect();
        let x = match units {
            AnalysisUnit::Channel => xlo.clone(),
            AnalysisUnit::Energy | AnalysisUnit::Wavelength => {
                xlo.iter().zip(&xhi).map(|(l, h)| 0.5 * (l + h)).collect()
            }
        };
        Ok(Self {
            x,
            xlo,
            xhi,
            norm,
            units,
        })
    }

    fn normalise(&self, values: &[f64]) -> Result<Vec<f64>, DataError> {
        if values.len() != self.norm.len() {
            return Err(DataError::GridMismatch {
                expected: self.norm.len(),
                got: values.len(),
            });
        }
        Ok(values.iter().zip(&self.norm).map(|(v, n)| v / n).collect())
    }

    fn plot(&self, y: Vec<f64>, title: String) -> PlotData {
        PlotData {
            x: self.x.clone(),
            xlo: None,
            xhi: None,
            y,
            yerr: None,
            title,
            xlabel: self.units.xlabel().to_string(),
            ylabel: self.units.rate_label().to_string(),
        }
    }

    fn histogram(&self, y: Vec<f64>, title: String) -> PlotData {
        PlotData {
            xlo: Some(self.xlo.clone()),
            xhi: Some(self.xhi.clone()),
            ..self.plot(y, title)
        }
    }
}

/// Response needed to view `data`; only required outside channel space.
fn view_response(session: &Session, id: &DataId, data: &PhaHandle) -> Result<Option<Response>, DataError> {
    if data.read().units() == AnalysisUnit::Channel {
        return Ok(None);
    }
    session.response(id, data).map(Some)
}

fn data_values(session: &Session, id: &DataId, data: &PhaHandle) -> Result<PlotData, DataError> {
    let response = view_response(session, id, data)?;
    let guard = data.read();
    let view = View::new(&guard, response.as_ref())?;
    let y = view.normalise(&guard.counts_for_plot()?)?;
    let yerr = view.normalise(&guard.staterror())?;
    let mut plot = view.plot(y, guard.name.clone());
    plot.yerr = Some(yerr);
    Ok(plot)
}

fn model_values(
    session: &Session,
    id: &DataId,
    data: &PhaHandle,
    model: &ModelExpr,
    title: &str,
) -> Result<PlotData, DataError> {
    let response = view_response(session, id, data)?;
    // The guard must be released before evaluating: the model may read this
    // dataset again (background scaling).
    let (view, channel) = {
        let guard = data.read();
        (View::new(&guard, response.as_ref())?, guard.channel().to_vec())
    };
    let counts = model.eval(&Grid::Points(channel))?;
    Ok(view.histogram(view.normalise(&counts)?, title.to_string()))
}

// -------------------------------------------------------------------------
// Source dataset
// -------------------------------------------------------------------------

pub fn data_plot(session: &Session, id: &DataId) -> Result<PlotData, DataError> {
    let data = session.get_data(id)?;
    data_values(session, id, &data)
}

pub fn model_plot(session: &Session, id: &DataId) -> Result<PlotData, DataError> {
    let data = session.get_data(id)?;
    let model = session.get_model(id)?;
    model_values(session, id, &data, &model, "Model")
}

/// The unconvolved source model, per keV or per Angstrom.
///
/// Channel space has no meaning for the source model; energy is used instead
/// and a warning is logged.
pub fn source_plot(session: &Session, id: &DataId) -> Result<PlotData, DataError> {
    let data = session.get_data(id)?;
    let src = session.get_source(id)?;
    let response = session.response(id, &data)?;

    let (units, name) = {
        let guard = data.read();
        (guard.units(), guard.name.clone())
    };
    let units = if units == AnalysisUnit::Channel {
        log::warn!("Channel space is unappropriate for the PHA unfolded source model,\nusing energy.");
        AnalysisUnit::Energy
    } else {
        units
    };

    let grid = response.energy_grid();
    let flux = src.eval(&grid)?;
    let Grid::Integrated { lo, hi } = grid else {
        return Err(DataError::invalid("source grid", "response energy grid must be binned"));
    };

    let (xlo, xhi, ylabel) = match units {
        AnalysisUnit::Wavelength => {
            let hc = crate::data::HC_KEV_ANGSTROM;
            (
                hi.iter().map(|e| hc / e).collect::<Vec<f64>>(),
                lo.iter().map(|e| hc / e).collect::<Vec<f64>>(),
                "f(lambda)  Photons/sec/cm^2/Angstrom",
            )
        }
        _ => (lo, hi, "f(E)  Photons/sec/cm^2/keV"),
    };
    let y = flux
        .iter()
        .zip(xlo.iter().zip(&xhi))
        .map(|(f, (l, h))| f / (h - l))
        .collect();
    let x = xlo.iter().zip(&xhi).map(|(l, h)| 0.5 * (l + h)).collect();

    Ok(PlotData {
        x,
        xlo: Some(xlo),
        xhi: Some(xhi),
        y,
        yerr: None,
        title: format!("Source Model of {name}"),
        xlabel: units.xlabel().to_string(),
        ylabel: ylabel.to_string(),
    })
}

pub fn resid_plot(session: &Session, id: &DataId) -> Result<PlotData, DataError> {
    Ok(fit_resid_plot(session, id)?.1)
}

pub fn ratio_plot(session: &Session, id: &DataId) -> Result<PlotData, DataError> {
    Ok(fit_ratio_plot(session, id)?.1)
}

pub fn delchi_plot(session: &Session, id: &DataId) -> Result<PlotData, DataError> {
    Ok(fit_delchi_plot(session, id)?.1)
}

pub fn chisqr_plot(session: &Session, id: &DataId) -> Result<PlotData, DataError> {
    chisqr(&fit_plot(session, id)?)
}

/// The fit plot with the residuals below it, sharing the x axis.
pub fn fit_resid_plot(session: &Session, id: &DataId) -> Result<(FitPlot, PlotData), DataError> {
    let fit = fit_plot(session, id)?;
    let title = format!("Residuals of {} - Model", fit.dataplot.title);
    let lower = resid(&fit, title);
    Ok((fit, lower))
}

pub fn fit_ratio_plot(session: &Session, id: &DataId) -> Result<(FitPlot, PlotData), DataError> {
    let fit = fit_plot(session, id)?;
    let lower = ratio(&fit);
    Ok((fit, lower))
}

pub fn fit_delchi_plot(session: &Session, id: &DataId) -> Result<(FitPlot, PlotData), DataError> {
    let fit = fit_plot(session, id)?;
    let title = format!("Sigma Residuals of {}", fit.dataplot.title);
    let lower = delchi(&fit, title)?;
    Ok((fit, lower))
}

pub fn fit_plot(session: &Session, id: &DataId) -> Result<FitPlot, DataError> {
    Ok(FitPlot {
        dataplot: data_plot(session, id)?,
        modelplot: model_plot(session, id)?,
    })
}

pub fn arf_plot(session: &Session, id: &DataId) -> Result<PlotData, DataError> {
    let data = session.get_data(id)?;
    let guard = data.read();
    let arf = guard.arf().ok_or_else(|| DataError::NoResponse {
        name: guard.name.clone(),
    })?;
    Ok(PlotData {
        x: arf
            .energ_lo
            .iter()
            .zip(&arf.energ_hi)
            .map(|(l, h)| 0.5 * (l + h))
            .collect(),
        xlo: Some(arf.energ_lo.clone()),
        xhi: Some(arf.energ_hi.clone()),
        y: arf.specresp.clone(),
        yerr: None,
        title: arf.name.clone(),
        xlabel: AnalysisUnit::Energy.xlabel().to_string(),
        ylabel: "cm^2".to_string(),
    })
}

// -------------------------------------------------------------------------
// Background datasets
// -------------------------------------------------------------------------

pub fn bkg_plot(session: &Session, id: &DataId, bkg_id: &DataId) -> Result<PlotData, DataError> {
    let bkg = session.get_bkg(id, bkg_id)?;
    data_values(session, id, &bkg)
}

pub fn bkg_model_plot(session: &Session, id: &DataId, bkg_id: &DataId) -> Result<PlotData, DataError> {
    let bkg = session.get_bkg(id, bkg_id)?;
    let model = session.get_bkg_model(id, bkg_id)?;
    model_values(session, id, &bkg, &model, "Model")
}

pub fn bkg_fit_plot(session: &Session, id: &DataId, bkg_id: &DataId) -> Result<FitPlot, DataError> {
    let bkg = session.get_bkg(id, bkg_id)?;
    let model = session.get_bkg_model(id, bkg_id)?;
    Ok(FitPlot {
        dataplot: data_values(session, id, &bkg)?,
        modelplot: model_values(session, id, &bkg, &model, "Background Model Contribution")?,
    })
}

pub fn bkg_resid_plot(session: &Session, id: &DataId, bkg_id: &DataId) -> Result<PlotData, DataError> {
    Ok(bkg_fit_resid_plot(session, id, bkg_id)?.1)
}

pub fn bkg_ratio_plot(session: &Session, id: &DataId, bkg_id: &DataId) -> Result<PlotData, DataError> {
    Ok(bkg_fit_ratio_plot(session, id, bkg_id)?.1)
}

pub fn bkg_delchi_plot(session: &Session, id: &DataId, bkg_id: &DataId) -> Result<PlotData, DataError> {
    Ok(bkg_fit_delchi_plot(session, id, bkg_id)?.1)
}

pub fn bkg_chisqr_plot(session: &Session, id: &DataId, bkg_id: &DataId) -> Result<PlotData, DataError> {
    chisqr(&bkg_fit_plot(session, id, bkg_id)?)
}

pub fn bkg_fit_resid_plot(session: &Session, id: &DataId, bkg_id: &DataId) -> Result<(FitPlot, PlotData), DataError> {
    let fit = bkg_fit_plot(session, id, bkg_id)?;
    let title = format!("Residuals of {} - Bkg Model", fit.dataplot.title);
    let lower = resid(&fit, title);
    Ok((fit, lower))
}

pub fn bkg_fit_ratio_plot(session: &Session, id: &DataId, bkg_id: &DataId) -> Result<(FitPlot, PlotData), DataError> {
    let fit = bkg_fit_plot(session, id, bkg_id)?;
    let lower = ratio(&fit);
    Ok((fit, lower))
}

pub fn bkg_fit_delchi_plot(session: &Session, id: &DataId, bkg_id: &DataId) -> Result<(FitPlot, PlotData), DataError> {
    let fit = bkg_fit_plot(session, id, bkg_id)?;
    let title = format!("Sigma Residuals of {}", fit.dataplot.title);
    let lower = delchi(&fit, title)?;
    Ok((fit, lower))
}

// -------------------------------------------------------------------------
// Derived products
// -------------------------------------------------------------------------

fn derived(fit: &FitPlot, y: Vec<f64>, yerr: Option<Vec<f64>>, title: String, ylabel: &str) -> PlotData {
    PlotData {
        x: fit.dataplot.x.clone(),
        xlo: None,
        xhi: None,
        y,
        yerr,
        title,
        xlabel: fit.dataplot.xlabel.clone(),
        ylabel: ylabel.to_string(),
    }
}

fn resid(fit: &FitPlot, title: String) -> PlotData {
    let y = fit
        .dataplot
        .y
        .iter()
        .zip(&fit.modelplot.y)
        .map(|(d, m)| d - m)
        .collect();
    let ylabel = fit.dataplot.ylabel.clone();
    derived(fit, y, fit.dataplot.yerr.clone(), title, &ylabel)
}

fn ratio(fit: &FitPlot) -> PlotData {
    let div = |a: f64, m: f64| if m == 0.0 { 0.0 } else { a / m };
    let y = fit
        .dataplot
        .y
        .iter()
        .zip(&fit.modelplot.y)
        .map(|(&d, &m)| div(d, m))
        .collect();
    let yerr = fit.dataplot.yerr.as_ref().map(|err| {
        err.iter()
            .zip(&fit.modelplot.y)
            .map(|(&e, &m)| div(e, m))
            .collect()
    });
    derived(fit, y, yerr, "Ratio of Data to Model".to_string(), "Data / Model")
}

fn delchi(fit: &FitPlot, title: String) -> Result<PlotData, DataError> {
    let err = fit
        .dataplot
        .yerr
        .as_ref()
        .ok_or_else(|| DataError::invalid("data plot", "no errors available"))?;
    if err.len() != fit.dataplot.y.len() || fit.modelplot.y.len() != fit.dataplot.y.len() {
        return Err(DataError::SizeMismatch {
            what: "data/model plot",
            left: fit.dataplot.y.len(),
            right: fit.modelplot.y.len(),
        });
    }
    let y = fit
        .dataplot
        .y
        .iter()
        .zip(&fit.modelplot.y)
        .zip(err)
        .map(|((d, m), e)| (d - m) / e)
        .collect();
    let ones = vec![1.0; fit.dataplot.y.len()];
    Ok(derived(fit, y, Some(ones), title, "Sigma"))
}

fn chisqr(fit: &FitPlot) -> Result<PlotData, DataError> {
    let mut plot = delchi(fit, "Chi^2".to_string())?;
    plot.y = plot.y.iter().map(|d| d * d).collect();
    plot.yerr = None;
    plot.ylabel = "Chi^2".to_string();
    Ok(plot)
}

