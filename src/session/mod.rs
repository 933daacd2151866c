//! Session registry: datasets, source models and background models by id.
//!
//! The session is the collaborator `add_response` consults (through
//! [`ResponseRegistry`]) and the entry point the plot and statistic code use
//! to find the data and models for an identifier.

use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;

use crate::background::{BackgroundModelMap, ResponseRegistry, add_response};
use crate::data::{DataPha, PhaHandle};
use crate::domain::{AnalysisUnit, DataId};
use crate::error::DataError;
use crate::instrument::Response;
use crate::models::{Grid, ModelExpr};
use crate::stat::chi2;

/// Per-dataset statistic.
#[derive(Debug, Clone, PartialEq)]
pub struct StatInfo {
    pub id: DataId,
    pub statval: f64,
    pub numpoints: usize,
}

#[derive(Debug, Default)]
pub struct Session {
    datasets: BTreeMap<DataId, PhaHandle>,
    sources: HashMap<DataId, ModelExpr>,
    background_sources: HashMap<DataId, BackgroundModelMap>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------------------------------------------------------------
    // Data
    // ---------------------------------------------------------------------

    pub fn set_data(&mut self, id: DataId, data: impl Into<PhaHandle>) {
        let _ = self.datasets.insert(id, data.into());
    }

    pub fn get_data(&self, id: &DataId) -> Result<PhaHandle, DataError> {
        self.datasets
            .get(id)
            .cloned()
            .ok_or_else(|| DataError::IdentifierNotFound {
                what: "data set",
                id: id.to_string(),
            })
    }

    pub fn list_data_ids(&self) -> Vec<DataId> {
        self.datasets.keys().cloned().collect()
    }

    /// Background `bkg_id` of dataset `id`.
    pub fn get_bkg(&self, id: &DataId, bkg_id: &DataId) -> Result<PhaHandle, DataError> {
        let data = self.get_data(id)?;
        let guard = data.read();
        guard
            .get_background(bkg_id)
            .cloned()
            .map_err(|_| DataError::IdentifierNotFound {
                what: "background data set",
                id: format!("{bkg_id} in PHA data set {id}"),
            })
    }

    /// Change the analysis unit of a dataset and of its backgrounds.
    pub fn set_analysis(&self, id: &DataId, units: AnalysisUnit) -> Result<(), DataError> {
        let data = self.get_data(id)?;
        let mut guard = data.write();
        guard.set_analysis(units);
        for key in guard.background_ids() {
            guard.get_background(&key)?.write().set_analysis(units);
        }
        log::debug!("data set {id}: analysis set to {units:?}");
        Ok(())
    }

    pub fn subtract(&self, id: &DataId) -> Result<(), DataError> {
        self.get_data(id)?.write().subtract()
    }

    pub fn unsubtract(&self, id: &DataId) -> Result<(), DataError> {
        self.get_data(id)?.write().unsubtract();
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Models
    // ---------------------------------------------------------------------

    pub fn set_source(&mut self, id: DataId, model: ModelExpr) {
        let _ = self.sources.insert(id, model);
    }

    pub fn get_source(&self, id: &DataId) -> Result<ModelExpr, DataError> {
        self.sources
            .get(id)
            .cloned()
            .ok_or_else(|| DataError::NoModel { id: id.to_string() })
    }

    /// Register the source model of background `bkg_id` of dataset `id`.
    pub fn set_bkg_model(&mut self, id: DataId, bkg_id: DataId, model: ModelExpr) -> Result<(), DataError> {
        let _ = self.get_data(&id)?;
        let _ = self.background_sources.entry(id).or_default().insert(bkg_id, model);
        Ok(())
    }

    pub fn delete_bkg_model(&mut self, id: &DataId, bkg_id: &DataId) {
        if let Some(map) = self.background_sources.get_mut(id) {
            let _ = map.remove(bkg_id);
        }
    }

    pub fn get_bkg_source(&self, id: &DataId, bkg_id: &DataId) -> Result<ModelExpr, DataError> {
        self.background_sources
            .get(id)
            .and_then(|m| m.get(bkg_id))
            .cloned()
            .ok_or_else(|| DataError::IdentifierNotFound {
                what: "background model",
                id: format!("{bkg_id} for data set {id}"),
            })
    }

    /// Source model with backgrounds and response applied.
    pub fn get_model(&self, id: &DataId) -> Result<ModelExpr, DataError> {
        let data = self.get_data(id)?;
        let src = self.get_source(id)?;
        add_response(self, id, &data, src)
    }

    /// Background source model with the background's response applied.
    pub fn get_bkg_model(&self, id: &DataId, bkg_id: &DataId) -> Result<ModelExpr, DataError> {
        let bkg = self.get_bkg(id, bkg_id)?;
        let src = self.get_bkg_source(id, bkg_id)?;
        let resp = self.response(id, &bkg)?;
        Ok(resp.apply(src))
    }

    // ---------------------------------------------------------------------
    // Statistic
    // ---------------------------------------------------------------------

    /// Datasets named by `ids`, or every dataset with a source model when
    /// `ids` is empty.
    fn stat_ids(&self, ids: &[DataId]) -> Vec<DataId> {
        if ids.is_empty() {
            self.datasets
                .keys()
                .filter(|id| self.sources.contains_key(*id))
                .cloned()
                .collect()
        } else {
            ids.to_vec()
        }
    }

    /// Chi-square (Gehrels errors) per dataset. Datasets are evaluated in
    /// parallel; see [`Session::calc_stat`] for how `ids` is resolved.
    pub fn calc_stat_info(&self, ids: &[DataId]) -> Result<Vec<StatInfo>, DataError> {
        self.stat_ids(ids)
            .par_iter()
            .map(|id| {
                let model = self.get_model(id)?;
                let data = self.get_data(id)?;
                // Subtracted counts keep the errors of the raw counts.
                let (counts, errors, grid) = {
                    let guard = data.read();
                    (
                        guard.counts_for_plot()?,
                        guard.staterror(),
                        Grid::Points(guard.channel().to_vec()),
                    )
                };
                let predicted = model.eval(&grid)?;
                Ok(StatInfo {
                    id: id.clone(),
                    statval: chi2(&counts, &predicted, &errors)?,
                    numpoints: counts.len(),
                })
            })
            .collect()
    }

    /// Total statistic over `ids` (all datasets with a source when empty).
    pub fn calc_stat(&self, ids: &[DataId]) -> Result<f64, DataError> {
        let info = self.calc_stat_info(ids)?;
        log::info!("statistic computed over {} data set(s)", info.len());
        Ok(info.iter().map(|s| s.statval).sum())
    }
}

impl ResponseRegistry for Session {
    fn background_models(&self, id: &DataId) -> BackgroundModelMap {
        self.background_sources.get(id).cloned().unwrap_or_default()
    }

    /// A background without its own ARF/RMF uses the response of the
    /// dataset `id` it belongs to, with its own exposure.
    fn response(&self, id: &DataId, data: &PhaHandle) -> Result<Response, DataError> {
        let (has_response, exposure) = {
            let guard = data.read();
            (guard.has_response(), guard.exposure)
        };
        if has_response {
            return data.read().response();
        }
        let src = self.get_data(id)?;
        if src.ptr_eq(data) {
            return Err(DataError::NoResponse {
                name: data.read().name.clone(),
            });
        }
        let kind = src.read().response()?.kind().clone();
        Response::new(kind, exposure)
    }
}

impl From<DataPha> for Session {
    fn from(value: DataPha) -> Self {
        let mut session = Session::new();
        session.set_data(DataId::default(), value);
        session
    }
}
