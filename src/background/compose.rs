//! Build the full model for a PHA dataset: source + backgrounds, through the
//! instrument response.

use crate::background::{BackgroundModelMap, BackgroundSumModel};
use crate::data::PhaHandle;
use crate::domain::DataId;
use crate::error::DataError;
use crate::instrument::Response;
use crate::models::ModelExpr;

/// What `add_response` needs from a session.
pub trait ResponseRegistry {
    /// Background source models registered for a dataset (empty if none).
    fn background_models(&self, id: &DataId) -> BackgroundModelMap;

    /// The response to apply to models of `data`.
    fn response(&self, id: &DataId, data: &PhaHandle) -> Result<Response, DataError>;
}

/// Create the model that predicts the counts of `data`.
///
/// Background models are added (via [`BackgroundSumModel`]) unless the dataset
/// is already background-subtracted or none are registered; the response is
/// then applied to the result.
pub fn add_response<R>(registry: &R, id: &DataId, data: &PhaHandle, model: ModelExpr) -> Result<ModelExpr, DataError>
where
    R: ResponseRegistry + ?Sized,
{
    let subtracted = data.read().subtracted();
    let model = if subtracted {
        model
    } else {
        let bkg_srcs = registry.background_models(id);
        if bkg_srcs.is_empty() {
            model
        } else {
            log::debug!("adding {} background model(s) to data set {id}", bkg_srcs.len());
            model + ModelExpr::new(BackgroundSumModel::new(data.clone(), bkg_srcs)?)
        }
    };

    let resp = registry.response(id, data)?;
    Ok(resp.apply(model))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::data::DataPha;
    use crate::instrument::{DataArf, DataRmf};
    use crate::models::{Const1D, Grid};

    struct Registry {
        bkg: HashMap<DataId, BackgroundModelMap>,
    }

    impl ResponseRegistry for Registry {
        fn background_models(&self, id: &DataId) -> BackgroundModelMap {
            self.bkg.get(id).cloned().unwrap_or_default()
        }

        fn response(&self, _id: &DataId, data: &PhaHandle) -> Result<Response, DataError> {
            data.read().response()
        }
    }

    fn energies() -> (Vec<f64>, Vec<f64>) {
        let edges: Vec<f64> = (0..=10).map(|i| 0.5 + 0.1 * f64::from(i)).collect();
        (edges[..10].to_vec(), edges[1..].to_vec())
    }

    fn source() -> PhaHandle {
        let (lo, hi) = energies();
        let chans: Vec<f64> = (1..=10).map(f64::from).collect();
        let mut src = DataPha::new("src", chans.clone(), vec![0.0; 10])
            .unwrap()
            .with_exposure(1201.0)
            .with_backscal(0.1);
        let arf = vec![0.8, 0.8, 0.9, 1.0, 1.1, 1.1, 0.7, 0.6, 0.6, 0.6];
        src.set_arf(DataArf::new("arf", lo.clone(), hi.clone(), arf, Some(1201.0)).unwrap());
        src.set_rmf(DataRmf::ideal("rmf", lo, hi, 1).unwrap());
        let bkg = DataPha::new("bkg", chans, vec![0.0; 10])
            .unwrap()
            .with_exposure(1201.0 * 2.5)
            .with_backscal(0.4);
        src.set_background(DataId::Int(1), bkg.into());
        src.into()
    }

    fn cst(name: &str, c0: f64) -> ModelExpr {
        let m = Const1D::new(name);
        m.c0.set(c0);
        ModelExpr::new(m)
    }

    fn grid() -> Grid {
        Grid::Points((1..=10).map(f64::from).collect())
    }

    fn registry_with_bkg() -> Registry {
        let map: BackgroundModelMap = [(DataId::Int(1), cst("bcpt", 0.1))].into_iter().collect();
        Registry {
            bkg: HashMap::from([(DataId::Int(1), map)]),
        }
    }

    #[test]
    fn no_background_models_means_plain_response() {
        let data = source();
        let reg = Registry { bkg: HashMap::new() };
        let bare = cst("cpt", 102.0);
        let full = add_response(&reg, &DataId::Int(1), &data, bare.clone()).unwrap();
        let direct = data.read().response().unwrap().apply(bare);
        assert_eq!(full.name(), direct.name());
        assert_eq!(full.eval(&grid()).unwrap(), direct.eval(&grid()).unwrap());
    }

    #[test]
    fn subtracted_data_skips_backgrounds() {
        let data = source();
        data.write().subtract().unwrap();
        let reg = registry_with_bkg();
        let bare = cst("cpt", 102.0);
        let full = add_response(&reg, &DataId::Int(1), &data, bare.clone()).unwrap();
        let direct = data.read().response().unwrap().apply(bare);
        assert_eq!(full.eval(&grid()).unwrap(), direct.eval(&grid()).unwrap());
        assert!(!full.name().contains("bcpt"));
    }

    #[test]
    fn background_term_is_folded_through_response() {
        let data = source();
        let reg = registry_with_bkg();
        let full = add_response(&reg, &DataId::Int(1), &data, cst("cpt", 102.0)).unwrap();
        assert_eq!(full.name(), "apply_rmf(apply_arf((1201 * (cpt + 0.1 * (bcpt)))))");

        // response(bare + ratio * bkg) with ratio = 0.1
        let expected = data.read().response().unwrap().apply(cst("x", 102.0 + 0.1 * 0.1));
        let (a, b) = (full.eval(&grid()).unwrap(), expected.eval(&grid()).unwrap());
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-9 * y.abs().max(1.0), "{x} vs {y}");
        }
    }

    #[test]
    fn background_models_for_other_ids_are_ignored() {
        let data = source();
        let reg = registry_with_bkg();
        let full = add_response(&reg, &DataId::Int(2), &data, cst("cpt", 1.0)).unwrap();
        assert!(!full.name().contains("bcpt"));
    }

    #[test]
    fn missing_response_is_an_error() {
        let chans: Vec<f64> = (1..=10).map(f64::from).collect();
        let data: PhaHandle = DataPha::new("bare", chans, vec![0.0; 10]).unwrap().into();
        let reg = Registry { bkg: HashMap::new() };
        let err = add_response(&reg, &DataId::Int(1), &data, cst("cpt", 1.0)).unwrap_err();
        assert!(matches!(err, DataError::NoResponse { .. }));
    }
}
