//! Instrument response application.
//!
//! A [`Response`] turns a source model (photons/cm^2/sec per energy bin) into a
//! model of predicted counts per channel:
//!
//! ```text
//! counts = RMF · (ARF.specresp * exposure * ∫ model dE)
//! ```
//!
//! The ARF exposure is used when there is an ARF; an RMF-only response uses the
//! exposure of the dataset it was built for.

use std::sync::Arc;

use crate::error::DataError;
use crate::instrument::{DataArf, DataRmf};
use crate::models::{Grid, Model, ModelExpr, Parameter};
use crate::report::format_g;

#[derive(Debug, Clone)]
pub enum ResponseKind {
    Arf(Arc<DataArf>),
    Rmf(Arc<DataRmf>),
    ArfRmf(Arc<DataArf>, Arc<DataRmf>),
}

/// The response of one dataset, ready to wrap models.
#[derive(Debug, Clone)]
pub struct Response {
    kind: ResponseKind,
    exposure: Option<f64>,
}

impl Response {
    pub fn new(kind: ResponseKind, data_exposure: Option<f64>) -> Result<Self, DataError> {
        if let ResponseKind::ArfRmf(arf, rmf) = &kind {
            if arf.len() != rmf.nenergy() {
                return Err(DataError::SizeMismatch {
                    what: "ARF/RMF energy grids",
                    left: arf.len(),
                    right: rmf.nenergy(),
                });
            }
        }
        let exposure = match &kind {
            ResponseKind::Rmf(_) => data_exposure,
            ResponseKind::Arf(arf) | ResponseKind::ArfRmf(arf, _) => arf.exposure,
        };
        Ok(Self { kind, exposure })
    }

    pub fn kind(&self) -> &ResponseKind {
        &self.kind
    }

    pub fn arf(&self) -> Option<&DataArf> {
        match &self.kind {
            ResponseKind::Arf(arf) | ResponseKind::ArfRmf(arf, _) => Some(&**arf),
            ResponseKind::Rmf(_) => None,
        }
    }

    pub fn rmf(&self) -> Option<&DataRmf> {
        match &self.kind {
            ResponseKind::Rmf(rmf) | ResponseKind::ArfRmf(_, rmf) => Some(&**rmf),
            ResponseKind::Arf(_) => None,
        }
    }

    /// Number of channels the response predicts.
    pub fn nchan(&self) -> usize {
        match &self.kind {
            ResponseKind::Arf(arf) => arf.len(),
            ResponseKind::Rmf(rmf) | ResponseKind::ArfRmf(_, rmf) => rmf.nchan(),
        }
    }

    /// Energy bins the wrapped model is integrated over.
    pub fn energy_grid(&self) -> Grid {
        let (lo, hi) = match &self.kind {
            ResponseKind::Arf(arf) | ResponseKind::ArfRmf(arf, _) => (&arf.energ_lo, &arf.energ_hi),
            ResponseKind::Rmf(rmf) => (&rmf.energ_lo, &rmf.energ_hi),
        };
        Grid::Integrated {
            lo: lo.clone(),
            hi: hi.clone(),
        }
    }

    /// Nominal energy bounds of each channel.
    pub fn channel_bounds(&self) -> (&[f64], &[f64]) {
        match &self.kind {
            ResponseKind::Arf(arf) => (arf.energ_lo.as_slice(), arf.energ_hi.as_slice()),
            ResponseKind::Rmf(rmf) | ResponseKind::ArfRmf(_, rmf) => (rmf.e_min.as_slice(), rmf.e_max.as_slice()),
        }
    }

    /// Wrap `model` so that it predicts counts per channel.
    pub fn apply(&self, model: ModelExpr) -> ModelExpr {
        ModelExpr::new(ResponseModel {
            response: self.clone(),
            model,
        })
    }

    fn fold(&self, src: &[f64]) -> Result<Vec<f64>, DataError> {
        match &self.kind {
            ResponseKind::Arf(arf) => arf.apply_arf(src),
            ResponseKind::Rmf(rmf) => {
                let exposure = self.exposure.unwrap_or(1.0);
                let scaled: Vec<f64> = src.iter().map(|v| v * exposure).collect();
                rmf.apply_rmf(&scaled)
            }
            ResponseKind::ArfRmf(arf, rmf) => rmf.apply_rmf(&arf.apply_arf(src)?),
        }
    }
}

/// A model folded through a response.
#[derive(Debug)]
pub struct ResponseModel {
    response: Response,
    model: ModelExpr,
}

impl ResponseModel {
    pub fn source(&self) -> &ModelExpr {
        &self.model
    }
}

impl Model for ResponseModel {
    fn name(&self) -> String {
        let inner = match self.response.exposure {
            Some(e) => format!("({} * {})", format_g(e), self.model.name()),
            None => self.model.name(),
        };
        match &self.response.kind {
            ResponseKind::Arf(_) => format!("apply_arf({inner})"),
            ResponseKind::Rmf(_) => format!("apply_rmf({inner})"),
            ResponseKind::ArfRmf(_, _) => format!("apply_rmf(apply_arf({inner}))"),
        }
    }

    fn parameters(&self) -> Vec<&Parameter> {
        self.model.model().parameters()
    }

    /// The supplied grid only fixes the number of output channels; the
    /// wrapped model is always integrated over the response's energy bins.
    fn calc(&self, pars: &[f64], grid: &Grid) -> Result<Vec<f64>, DataError> {
        let nchan = self.response.nchan();
        if grid.len() != nchan {
            return Err(DataError::GridMismatch {
                expected: nchan,
                got: grid.len(),
            });
        }
        let src = self.model.calc(pars, &self.response.energy_grid())?;
        self.response.fold(&src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Const1D;

    fn energies() -> (Vec<f64>, Vec<f64>) {
        let lo: Vec<f64> = (0..4).map(|i| 0.5 + 0.1 * i as f64).collect();
        let hi: Vec<f64> = lo.iter().map(|l| l + 0.1).collect();
        (lo, hi)
    }

    fn cpt(c0: f64) -> ModelExpr {
        let m = Const1D::new("cpt");
        m.c0.set(c0);
        ModelExpr::new(m)
    }

    #[test]
    fn arf_rmf_folds_model() {
        let (lo, hi) = energies();
        let arf = Arc::new(DataArf::new("arf", lo.clone(), hi.clone(), vec![1.0, 2.0, 1.0, 0.5], Some(100.0)).unwrap());
        let rmf = Arc::new(DataRmf::ideal("rmf", lo, hi, 1).unwrap());
        let resp = Response::new(ResponseKind::ArfRmf(arf, rmf), Some(5.0)).unwrap();

        let full = resp.apply(cpt(2.0));
        assert_eq!(full.name(), "apply_rmf(apply_arf((100 * cpt)))");

        let y = full.eval(&Grid::Points(vec![1.0, 2.0, 3.0, 4.0])).unwrap();
        let expected = [20.0, 40.0, 20.0, 10.0];
        for (a, b) in y.iter().zip(expected) {
            assert!((a - b).abs() < 1e-9, "{a} vs {b}");
        }
    }

    #[test]
    fn rmf_only_uses_dataset_exposure() {
        let (lo, hi) = energies();
        let rmf = Arc::new(DataRmf::ideal("rmf", lo, hi, 1).unwrap());
        let resp = Response::new(ResponseKind::Rmf(rmf), Some(10.0)).unwrap();
        let y = resp.apply(cpt(1.0)).eval(&Grid::Points(vec![0.0; 4])).unwrap();
        assert!(y.iter().all(|v| (v - 1.0).abs() < 1e-9));
    }

    #[test]
    fn wrong_channel_count_is_rejected() {
        let (lo, hi) = energies();
        let arf = Arc::new(DataArf::new("arf", lo, hi, vec![1.0; 4], None).unwrap());
        let resp = Response::new(ResponseKind::Arf(arf), None).unwrap();
        let err = resp.apply(cpt(1.0)).eval(&Grid::Points(vec![0.0; 3])).unwrap_err();
        assert_eq!(err, DataError::GridMismatch { expected: 4, got: 3 });
    }
}
