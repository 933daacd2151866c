//! Shared pipeline logic behind the CLI commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! session file -> analysis unit -> plot products / statistic / simulation
//!
//! The command handlers in `app` can then focus on presentation.

use crate::cli::SessionArgs;
use crate::domain::{DataId, PlotData, PlotKind};
use crate::error::AppError;
use crate::session::{Session, StatInfo};

/// Load the session file and apply the requested analysis unit.
///
/// The unit is applied to `ids`, or to every data set when `ids` is empty.
pub fn load_session(args: &SessionArgs, ids: &[DataId]) -> Result<Session, AppError> {
    let session = crate::io::session_file::load_session(&args.session)?;
    if let Some(units) = args.analysis {
        let targets = if ids.is_empty() { session.list_data_ids() } else { ids.to_vec() };
        for id in &targets {
            session.set_analysis(id, units)?;
        }
        log::debug!("analysis unit set to {units:?} for {} data set(s)", targets.len());
    }
    Ok(session)
}

/// Compute the plot product(s) of one kind for a data set.
pub fn run_plot(session: &Session, kind: PlotKind, id: &DataId, bkg_id: &DataId) -> Result<Vec<PlotData>, AppError> {
    let plots = crate::plot::compute(session, kind, id, bkg_id)?;
    let bins = plots.first().map_or(0, |p| p.y.len());
    if kind.is_background() {
        log::info!("computed {kind:?} plot for background {bkg_id} of data set {id} ({bins} bins)");
    } else {
        log::info!("computed {kind:?} plot for data set {id} ({bins} bins)");
    }
    Ok(plots)
}

/// Per-dataset statistics for `ids` (all data sets with a source when empty).
pub fn run_stat(session: &Session, ids: &[DataId]) -> Result<Vec<StatInfo>, AppError> {
    Ok(session.calc_stat_info(ids)?)
}

/// Replace the counts of `id` with a Poisson realisation of its model and
/// return the resulting data plot.
pub fn run_fake(session: &Session, id: &DataId, seed: u64) -> Result<PlotData, AppError> {
    crate::data::fake_pha(session, id, seed)?;
    Ok(crate::plot::data_plot(session, id)?)
}
