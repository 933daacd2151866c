//! Combine the models of several background datasets into one model term.
//!
//! The background models of a source dataset are defined on the background
//! datasets; to add them to the source model each one has to be scaled to the
//! source aperture (exposure, BACKSCAL, AREASCAL). `BackgroundSumModel` does
//! that by evaluating every background model on the grid it is given and
//! handing the results to the source dataset's `sum_background_data`.
//!
//! Numerical caveat: the combination is only correct when every scaling ratio
//! is a scalar. A per-channel BACKSCAL/AREASCAL gives an array of ratios defined
//! in channel space, which only lines up with the model values when the models
//! were evaluated on a grid with one bin per channel in that same order.

use crate::data::PhaHandle;
use crate::domain::DataId;
use crate::error::DataError;
use crate::math::Scale;
use crate::models::{Grid, Model, ModelExpr, Parameter};
use crate::report::format_g;

/// Background identifier -> background model, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct BackgroundModelMap {
    entries: Vec<(DataId, ModelExpr)>,
}

impl BackgroundModelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; a replaced entry keeps its position.
    pub fn insert(&mut self, key: DataId, model: ModelExpr) -> Option<ModelExpr> {
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            return Some(std::mem::replace(&mut slot.1, model));
        }
        self.entries.push((key, model));
        None
    }

    pub fn remove(&mut self, key: &DataId) -> Option<ModelExpr> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn get(&self, key: &DataId) -> Option<&ModelExpr> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, m)| m)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DataId, &ModelExpr)> {
        self.entries.iter().map(|(k, m)| (k, m))
    }

    pub fn keys(&self) -> impl Iterator<Item = &DataId> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &ModelExpr> {
        self.entries.iter().map(|(_, m)| m)
    }
}

impl FromIterator<(DataId, ModelExpr)> for BackgroundModelMap {
    fn from_iter<T: IntoIterator<Item = (DataId, ModelExpr)>>(iter: T) -> Self {
        let mut map = BackgroundModelMap::new();
        for (k, m) in iter {
            let _ = map.insert(k, m);
        }
        map
    }
}

/// The scaled sum of all background models of a source dataset.
///
/// The name is `"<scale> * (<bkg1> + <bkg2> + ...)"`, where `<scale>` is the
/// sum of the per-background ratios at construction time. It is only used for
/// display; the ratios applied by `calc` are read from the datasets on every
/// call.
#[derive(Debug)]
pub struct BackgroundSumModel {
    srcdata: PhaHandle,
    bkgmodels: BackgroundModelMap,
    name: String,
}

impl BackgroundSumModel {
    /// Fails with `EmptyBackgroundModels` when `bkgmodels` is empty.
    ///
    /// The keys are not checked against the dataset here: a background that
    /// has no model is reported when the model is evaluated.
    pub fn new(srcdata: PhaHandle, bkgmodels: BackgroundModelMap) -> Result<Self, DataError> {
        if bkgmodels.is_empty() {
            return Err(DataError::EmptyBackgroundModels);
        }

        let scale = srcdata.read().sum_background_data(|_, _| Ok(Scale::Scalar(1.0)))?;
        let scale = match scale {
            Scale::Scalar(s) => format_g(s),
            Scale::Array(_) => {
                log::warn!(
                    "background scale factor for '{}' varies per channel; display scale is undefined",
                    srcdata.read().name
                );
                "undefined".to_string()
            }
        };
        let names: Vec<String> = bkgmodels.values().map(ModelExpr::name).collect();
        let name = format!("{scale} * ({})", names.join(" + "));
        log::debug!("built background sum model {name}");

        Ok(Self {
            srcdata,
            bkgmodels,
            name,
        })
    }

    /// The aggregate scale factor, if every ratio is a scalar.
    pub fn scale_factor(&self) -> Result<Option<f64>, DataError> {
        let scale = self.srcdata.read().sum_background_data(|_, _| Ok(Scale::Scalar(1.0)))?;
        Ok(scale.as_scalar())
    }

    pub fn bkgmodels(&self) -> &BackgroundModelMap {
        &self.bkgmodels
    }
}

impl Model for BackgroundSumModel {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn parameters(&self) -> Vec<&Parameter> {
        self.bkgmodels
            .values()
            .flat_map(|m| m.model().parameters())
            .collect()
    }

    /// `_pars` is accepted for interface compatibility but not used: the
    /// wrapped models are evaluated with the parameter values they already
    /// hold, so callers must push new values into them before calling this.
    fn calc(&self, _pars: &[f64], grid: &Grid) -> Result<Vec<f64>, DataError> {
        let src = self.srcdata.read();
        let total = src.sum_background_data(|key, _bkg| {
            let model = self
                .bkgmodels
                .get(key)
                .ok_or_else(|| DataError::MissingBackgroundModel { key: key.to_string() })?;
            Ok(Scale::Array(model.eval(grid)?))
        })?;
        match total {
            Scale::Array(values) if values.len() == grid.len() => Ok(values),
            Scale::Array(values) => Err(DataError::GridMismatch {
                expected: grid.len(),
                got: values.len(),
            }),
            Scale::Scalar(s) => Ok(vec![s; grid.len()]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataPha;
    use crate::models::{Const1D, PowLaw1D};

    fn pha(name: &str, exposure: f64, backscal: f64) -> DataPha {
        let chans: Vec<f64> = (1..=10).map(f64::from).collect();
        DataPha::new(name, chans, vec![0.0; 10])
            .unwrap()
            .with_exposure(exposure)
            .with_backscal(backscal)
    }

    fn flat(name: &str, ampl: f64) -> ModelExpr {
        let m = PowLaw1D::new(name);
        m.gamma.set(0.0);
        m.ampl.set(ampl);
        ModelExpr::new(m)
    }

    fn cst(name: &str, c0: f64) -> ModelExpr {
        let m = Const1D::new(name);
        m.c0.set(c0);
        ModelExpr::new(m)
    }

    fn grid() -> Grid {
        Grid::Points((1..=10).map(f64::from).collect())
    }

    fn source_with(bkgs: &[(i64, f64, f64)]) -> PhaHandle {
        let mut src = pha("src", 1201.0, 0.1);
        for &(id, exposure, backscal) in bkgs {
            src.set_background(DataId::Int(id), pha("bkg", exposure, backscal).into());
        }
        src.into()
    }

    #[test]
    fn empty_mapping_fails_at_construction() {
        let src = source_with(&[(1, 1201.0, 0.1)]);
        let err = BackgroundSumModel::new(src, BackgroundModelMap::new()).unwrap_err();
        assert_eq!(err, DataError::EmptyBackgroundModels);
    }

    #[test]
    fn single_background_is_scaled_by_ratio() {
        let src = source_with(&[(1, 1201.0 * 2.5, 0.4)]);
        let map: BackgroundModelMap = [(DataId::Int(1), flat("bcpt", 0.1))].into_iter().collect();
        let sum = BackgroundSumModel::new(src, map).unwrap();
        assert_eq!(sum.name(), "0.1 * (bcpt)");

        let y = sum.calc(&[], &grid()).unwrap();
        assert_eq!(y.len(), 10);
        for v in y {
            assert!((v - 0.01).abs() < 1e-12, "got {v}");
        }
    }

    #[test]
    fn name_sums_ratios_in_map_order() {
        let src = source_with(&[(1, 1201.0, 0.1), (2, 1201.0 * 2.5, 0.4)]);
        let map: BackgroundModelMap = [(DataId::Int(2), cst("b2", 1.0)), (DataId::Int(1), cst("b1", 1.0))]
            .into_iter()
            .collect();
        let sum = BackgroundSumModel::new(src, map).unwrap();
        assert_eq!(sum.name(), "1.1 * (b2 + b1)");
        let scale = sum.scale_factor().unwrap().unwrap();
        assert!((scale - 1.1).abs() < 1e-12);
    }

    #[test]
    fn two_backgrounds_sum_independent_of_order() {
        let bkgs = [(1, 1201.0 * 2.0, 0.1), (2, 1201.0, 0.2)];
        let (r1, r2) = (0.5, 0.5);

        let forward: BackgroundModelMap = [(DataId::Int(1), cst("b1", 3.0)), (DataId::Int(2), cst("b2", 7.0))]
            .into_iter()
            .collect();
        let backward: BackgroundModelMap = [(DataId::Int(2), cst("b2", 7.0)), (DataId::Int(1), cst("b1", 3.0))]
            .into_iter()
            .collect();

        let a = BackgroundSumModel::new(source_with(&bkgs), forward).unwrap().calc(&[], &grid()).unwrap();
        let b = BackgroundSumModel::new(source_with(&bkgs), backward).unwrap().calc(&[], &grid()).unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - (r1 * 3.0 + r2 * 7.0)).abs() < 1e-12);
            assert!((x - y).abs() < 1e-12);
        }
    }

    #[test]
    fn background_attached_after_construction_is_reported() {
        let src = source_with(&[(1, 1201.0, 0.1)]);
        let map: BackgroundModelMap = [(DataId::Int(1), cst("b1", 1.0))].into_iter().collect();
        let sum = BackgroundSumModel::new(src.clone(), map).unwrap();
        assert!(sum.calc(&[], &grid()).is_ok());

        src.write().set_background(DataId::from("late"), pha("late", 1.0, 1.0).into());
        let err = sum.calc(&[], &grid()).unwrap_err();
        assert_eq!(err, DataError::MissingBackgroundModel { key: "late".into() });
    }

    #[test]
    fn ratios_are_read_at_evaluation_time() {
        let src = source_with(&[(1, 1201.0, 0.1)]);
        let map: BackgroundModelMap = [(DataId::Int(1), cst("b1", 2.0))].into_iter().collect();
        let sum = BackgroundSumModel::new(src.clone(), map).unwrap();
        assert!((sum.calc(&[], &grid()).unwrap()[0] - 2.0).abs() < 1e-12);

        {
            let guard = src.read();
            let bkg = guard.get_background(&DataId::Int(1)).unwrap();
            bkg.write().exposure = Some(1201.0 * 4.0);
        }
        assert!((sum.calc(&[], &grid()).unwrap()[0] - 0.5).abs() < 1e-12);
        // the display name keeps the construction-time scale
        assert_eq!(sum.name(), "1 * (b1)");
    }

    #[test]
    fn parameter_vector_is_ignored() {
        let src = source_with(&[(1, 1201.0, 0.1)]);
        let b1 = std::sync::Arc::new(Const1D::new("b1"));
        b1.c0.set(4.0);
        let map: BackgroundModelMap = [(DataId::Int(1), ModelExpr::from(b1.clone()))].into_iter().collect();
        let sum = BackgroundSumModel::new(src, map).unwrap();
        assert_eq!(sum.npars(), 1);
        assert!((sum.calc(&[100.0], &grid()).unwrap()[0] - 4.0).abs() < 1e-12);

        b1.c0.set(6.0);
        assert!((sum.calc(&[4.0], &grid()).unwrap()[0] - 6.0).abs() < 1e-12);
    }

    #[test]
    fn array_backscal_scales_per_bin_and_name_is_undefined() {
        let mut src = pha("src", 100.0, 1.0);
        let bscal: Vec<f64> = (1..=10).map(f64::from).collect();
        src.set_background(DataId::Int(1), pha("bkg", 100.0, 1.0).with_backscal(bscal).into());
        let map: BackgroundModelMap = [(DataId::Int(1), cst("b1", 1.0))].into_iter().collect();
        let sum = BackgroundSumModel::new(src.into(), map).unwrap();
        assert_eq!(sum.name(), "undefined * (b1)");
        assert_eq!(sum.scale_factor().unwrap(), None);

        let y = sum.calc(&[], &grid()).unwrap();
        for (i, v) in y.iter().enumerate() {
            assert!((v - 1.0 / (i as f64 + 1.0)).abs() < 1e-12);
        }

        // the per-channel ratios cannot be applied to a differently sized grid
        let err = sum.calc(&[], &Grid::Points(vec![1.0, 2.0])).unwrap_err();
        assert!(matches!(err, DataError::SizeMismatch { .. }));
    }
}
