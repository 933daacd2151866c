//! Session files (JSON).
//!
//! A session file describes everything needed to evaluate plot products:
//! model components, datasets with their responses and backgrounds, and
//! which components make up the source and background models.
//!
//! ```json
//! {
//!   "components": [
//!     { "type": "const1d", "name": "cpt", "c0": 102.0 },
//!     { "type": "powlaw1d", "name": "bcpt", "gamma": 0.0, "ampl": 0.1 }
//!   ],
//!   "datasets": [
//!     {
//!       "id": 1,
//!       "data": { "name": "example", "channel": [1, 2], "counts": [0, 1],
//!                 "exposure": 1201.0, "backscal": 0.1 },
//!       "backgrounds": [ { "id": 1, "data": { "...": "..." } } ],
//!       "source": ["cpt"],
//!       "background_models": [ { "bkg_id": 1, "model": ["bcpt"] } ]
//!     }
//!   ]
//! }
//! ```
//!
//! Components are shared: naming the same component in two expressions links
//! their parameters.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::{DataPha, PhaHandle};
use crate::domain::{AnalysisUnit, DataId};
use crate::error::{AppError, DataError};
use crate::instrument::{DataArf, DataRmf};
use crate::math::Scale;
use crate::models::{Const1D, Gauss1D, ModelExpr, PowLaw1D};
use crate::session::Session;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionFile {
    #[serde(default)]
    pub components: Vec<ComponentSpec>,
    pub datasets: Vec<DatasetSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ComponentSpec {
    Const1d {
        name: String,
        #[serde(default)]
        c0: Option<f64>,
    },
    Powlaw1d {
        name: String,
        #[serde(default)]
        gamma: Option<f64>,
        #[serde(default, rename = "ref")]
        reference: Option<f64>,
        #[serde(default)]
        ampl: Option<f64>,
    },
    Gauss1d {
        name: String,
        #[serde(default)]
        fwhm: Option<f64>,
        #[serde(default)]
        pos: Option<f64>,
        #[serde(default)]
        ampl: Option<f64>,
    },
}

impl ComponentSpec {
    pub fn name(&self) -> &str {
        match self {
            ComponentSpec::Const1d { name, .. }
            | ComponentSpec::Powlaw1d { name, .. }
            | ComponentSpec::Gauss1d { name, .. } => name,
        }
    }

    fn build(&self) -> ModelExpr {
        let set = |p: &crate::models::Parameter, v: Option<f64>| {
            if let Some(v) = v {
                p.set(v);
            }
        };
        match self {
            ComponentSpec::Const1d { name, c0 } => {
                let m = Const1D::new(name);
                set(&m.c0, *c0);
                ModelExpr::new(m)
            }
            ComponentSpec::Powlaw1d {
                name,
                gamma,
                reference,
                ampl,
            } => {
                let m = PowLaw1D::new(name);
                set(&m.gamma, *gamma);
                set(&m.reference, *reference);
                set(&m.ampl, *ampl);
                ModelExpr::new(m)
            }
            ComponentSpec::Gauss1d { name, fwhm, pos, ampl } => {
                let m = Gauss1D::new(name);
                set(&m.fwhm, *fwhm);
                set(&m.pos, *pos);
                set(&m.ampl, *ampl);
                ModelExpr::new(m)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaSpec {
    pub name: String,
    pub channel: Vec<f64>,
    pub counts: Vec<f64>,
    #[serde(default)]
    pub exposure: Option<f64>,
    #[serde(default)]
    pub backscal: Option<Scale>,
    #[serde(default)]
    pub areascal: Option<Scale>,
    #[serde(default)]
    pub arf: Option<ArfSpec>,
    #[serde(default)]
    pub rmf: Option<RmfSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArfSpec {
    pub name: String,
    pub energ_lo: Vec<f64>,
    pub energ_hi: Vec<f64>,
    pub specresp: Vec<f64>,
    #[serde(default)]
    pub exposure: Option<f64>,
}

/// RMF description; without `matrix` the ideal one-to-one response is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RmfSpec {
    pub name: String,
    pub energ_lo: Vec<f64>,
    pub energ_hi: Vec<f64>,
    #[serde(default)]
    pub e_min: Option<Vec<f64>>,
    #[serde(default)]
    pub e_max: Option<Vec<f64>>,
    #[serde(default = "default_offset")]
    pub offset: i64,
    #[serde(default)]
    pub matrix: Option<Vec<Vec<f64>>>,
}

fn default_offset() -> i64 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundSpec {
    #[serde(default)]
    pub id: DataId,
    pub data: PhaSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundModelSpec {
    #[serde(default)]
    pub bkg_id: DataId,
    pub model: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSpec {
    #[serde(default)]
    pub id: DataId,
    pub data: PhaSpec,
    #[serde(default)]
    pub analysis: AnalysisUnit,
    #[serde(default)]
    pub subtracted: bool,
    #[serde(default)]
    pub backgrounds: Vec<BackgroundSpec>,
    #[serde(default)]
    pub source: Vec<String>,
    #[serde(default)]
    pub background_models: Vec<BackgroundModelSpec>,
}

/// Read and build a session from a JSON file.
pub fn load_session(path: &Path) -> Result<Session, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open session file '{}': {e}", path.display())))?;
    let spec: SessionFile = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::new(2, format!("Invalid session file '{}': {e}", path.display())))?;
    log::info!(
        "loaded session file {} ({} components, {} data sets)",
        path.display(),
        spec.components.len(),
        spec.datasets.len()
    );
    Ok(build_session(&spec)?)
}

/// Build a session from its parsed description.
pub fn build_session(spec: &SessionFile) -> Result<Session, DataError> {
    let mut components: HashMap<&str, ModelExpr> = HashMap::new();
    for c in &spec.components {
        if components.insert(c.name(), c.build()).is_some() {
            return Err(DataError::invalid("component", format!("'{}' is defined twice", c.name())));
        }
    }

    let mut session = Session::new();
    for ds in &spec.datasets {
        let mut data = build_pha(&ds.data)?;
        for b in &ds.backgrounds {
            data.set_background(b.id.clone(), PhaHandle::new(build_pha(&b.data)?));
        }
        session.set_data(ds.id.clone(), data);
        session.set_analysis(&ds.id, ds.analysis)?;
        if ds.subtracted {
            session.subtract(&ds.id)?;
        }

        if let Some(model) = sum_components(&components, &ds.source)? {
            session.set_source(ds.id.clone(), model);
        }
        for bm in &ds.background_models {
            let model = sum_components(&components, &bm.model)?
                .ok_or_else(|| DataError::invalid("background model", format!("empty expression for {}", bm.bkg_id)))?;
            session.set_bkg_model(ds.id.clone(), bm.bkg_id.clone(), model)?;
        }
    }
    Ok(session)
}

fn sum_components(components: &HashMap<&str, ModelExpr>, names: &[String]) -> Result<Option<ModelExpr>, DataError> {
    let mut expr: Option<ModelExpr> = None;
    for name in names {
        let part = components
            .get(name.as_str())
            .cloned()
            .ok_or_else(|| DataError::IdentifierNotFound {
                what: "model component",
                id: name.clone(),
            })?;
        expr = Some(match expr {
            None => part,
            Some(acc) => acc + part,
        });
    }
    Ok(expr)
}

fn build_pha(spec: &PhaSpec) -> Result<DataPha, DataError> {
    let mut data = DataPha::new(&spec.name, spec.channel.clone(), spec.counts.clone())?;
    data.exposure = spec.exposure;
    data.backscal = spec.backscal.clone();
    data.areascal = spec.areascal.clone();
    if let Some(a) = &spec.arf {
        data.set_arf(DataArf::new(
            &a.name,
            a.energ_lo.clone(),
            a.energ_hi.clone(),
            a.specresp.clone(),
            a.exposure,
        )?);
    }
    if let Some(r) = &spec.rmf {
        let rmf = match &r.matrix {
            None => DataRmf::ideal(&r.name, r.energ_lo.clone(), r.energ_hi.clone(), r.offset)?,
            Some(rows) => {
                let e_min = r.e_min.clone().unwrap_or_else(|| r.energ_lo.clone());
                let e_max = r.e_max.clone().unwrap_or_else(|| r.energ_hi.clone());
                DataRmf::from_rows(
                    &r.name,
                    r.energ_lo.clone(),
                    r.energ_hi.clone(),
                    e_min,
                    e_max,
                    r.offset,
                    rows,
                )?
            }
        };
        data.set_rmf(rmf);
    }
    Ok(data)
}
