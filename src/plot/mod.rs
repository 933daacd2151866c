//! Plot products: the values behind data, model, residual and fit plots.
//!
//! Nothing here draws; each function returns `PlotData` (or a `FitPlot` pair)
//! that a front-end can render or export.

pub mod products;

pub use products::*;

use crate::domain::{DataId, FitPlot, PlotData, PlotKind};
use crate::error::DataError;
use crate::session::Session;

/// Compute a plot product by kind.
///
/// Fit plots return the data plot followed by the model plot, and the
/// `fit-*` kinds append the residual product; everything else returns a
/// single plot. `bkg_id` is only used by background kinds.
pub fn compute(session: &Session, kind: PlotKind, id: &DataId, bkg_id: &DataId) -> Result<Vec<PlotData>, DataError> {
    log::debug!("computing {kind:?} plot for data set {id}");
    let single = match kind {
        PlotKind::Data => data_plot(session, id)?,
        PlotKind::Model => model_plot(session, id)?,
        PlotKind::Source => source_plot(session, id)?,
        PlotKind::Resid => resid_plot(session, id)?,
        PlotKind::Ratio => ratio_plot(session, id)?,
        PlotKind::Delchi => delchi_plot(session, id)?,
        PlotKind::Chisqr => chisqr_plot(session, id)?,
        PlotKind::Fit => {
            let fit = fit_plot(session, id)?;
            return Ok(vec![fit.dataplot, fit.modelplot]);
        }
        PlotKind::FitResid => return Ok(stacked(fit_resid_plot(session, id)?)),
        PlotKind::FitRatio => return Ok(stacked(fit_ratio_plot(session, id)?)),
        PlotKind::FitDelchi => return Ok(stacked(fit_delchi_plot(session, id)?)),
        PlotKind::Bkg => bkg_plot(session, id, bkg_id)?,
        PlotKind::BkgModel => bkg_model_plot(session, id, bkg_id)?,
        PlotKind::BkgResid => bkg_resid_plot(session, id, bkg_id)?,
        PlotKind::BkgRatio => bkg_ratio_plot(session, id, bkg_id)?,
        PlotKind::BkgDelchi => bkg_delchi_plot(session, id, bkg_id)?,
        PlotKind::BkgChisqr => bkg_chisqr_plot(session, id, bkg_id)?,
        PlotKind::BkgFit => {
            let fit = bkg_fit_plot(session, id, bkg_id)?;
            return Ok(vec![fit.dataplot, fit.modelplot]);
        }
        PlotKind::BkgFitResid => return Ok(stacked(bkg_fit_resid_plot(session, id, bkg_id)?)),
        PlotKind::BkgFitRatio => return Ok(stacked(bkg_fit_ratio_plot(session, id, bkg_id)?)),
        PlotKind::BkgFitDelchi => return Ok(stacked(bkg_fit_delchi_plot(session, id, bkg_id)?)),
        PlotKind::Arf => arf_plot(session, id)?,
    };
    Ok(vec![single])
}

fn stacked((fit, lower): (FitPlot, PlotData)) -> Vec<PlotData> {
    vec![fit.dataplot, fit.modelplot, lower]
}
