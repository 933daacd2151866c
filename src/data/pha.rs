//! PHA (pulse-height-amplitude) datasets.
//!
//! A `DataPha` holds counts per channel plus the metadata needed to compare it
//! with other datasets: exposure time, BACKSCAL/AREASCAL and any attached
//! background datasets. It is the authority on how background contributions
//! are scaled to the source aperture (`sum_background_data`).
//!
//! Datasets are shared through [`PhaHandle`] because models built from them
//! must see later edits (a background attached after the fact, an exposure
//! changed between fits).

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::{AnalysisUnit, DataId};
use crate::error::DataError;
use crate::instrument::{DataArf, DataRmf, Response, ResponseKind};
use crate::math::Scale;

/// `h * c` in keV Angstrom, for energy <-> wavelength conversion.
pub const HC_KEV_ANGSTROM: f64 = 12.398_419_843_320_026;

/// Shared, mutable handle to a dataset.
#[derive(Debug, Clone)]
pub struct PhaHandle(Arc<RwLock<DataPha>>);

impl PhaHandle {
    pub fn new(data: DataPha) -> Self {
        PhaHandle(Arc::new(RwLock::new(data)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, DataPha> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, DataPha> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn ptr_eq(&self, other: &PhaHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<DataPha> for PhaHandle {
    fn from(value: DataPha) -> Self {
        PhaHandle::new(value)
    }
}

#[derive(Debug, Clone)]
pub struct DataPha {
    pub name: String,
    channel: Vec<f64>,
    counts: Vec<f64>,
    /// Exposure time in seconds.
    pub exposure: Option<f64>,
    pub backscal: Option<Scale>,
    pub areascal: Option<Scale>,
    backgrounds: Vec<(DataId, PhaHandle)>,
    subtracted: bool,
    units: AnalysisUnit,
    arf: Option<Arc<DataArf>>,
    rmf: Option<Arc<DataRmf>>,
}

impl DataPha {
    pub fn new(name: &str, channel: Vec<f64>, counts: Vec<f64>) -> Result<Self, DataError> {
        if channel.len() != counts.len() {
            return Err(DataError::SizeMismatch {
                what: "channel/counts",
                left: channel.len(),
                right: counts.len(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            channel,
            counts,
            exposure: None,
            backscal: None,
            areascal: None,
            backgrounds: Vec::new(),
            subtracted: false,
            units: AnalysisUnit::Channel,
            arf: None,
            rmf: None,
        })
    }

    pub fn with_exposure(mut self, exposure: f64) -> Self {
        self.exposure = Some(exposure);
        self
    }

    pub fn with_backscal(mut self, backscal: impl Into<Scale>) -> Self {
        self.backscal = Some(backscal.into());
        self
    }

    pub fn with_areascal(mut self, areascal: impl Into<Scale>) -> Self {
        self.areascal = Some(areascal.into());
        self
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    pub fn channel(&self) -> &[f64] {
        &self.channel
    }

    pub fn counts(&self) -> &[f64] {
        &self.counts
    }

    /// Replace the counts; the channel grid itself never changes.
    pub fn set_counts(&mut self, counts: Vec<f64>) -> Result<(), DataError> {
        if counts.len() != self.channel.len() {
            return Err(DataError::SizeMismatch {
                what: "counts",
                left: counts.len(),
                right: self.channel.len(),
            });
        }
        self.counts = counts;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Backgrounds
    // ---------------------------------------------------------------------

    /// Attach (or replace) a background dataset.
    pub fn set_background(&mut self, key: DataId, bkg: PhaHandle) {
        if let Some(slot) = self.backgrounds.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = bkg;
        } else {
            self.backgrounds.push((key, bkg));
        }
    }

    pub fn delete_background(&mut self, key: &DataId) -> Result<PhaHandle, DataError> {
        let idx = self
            .backgrounds
            .iter()
            .position(|(k, _)| k == key)
            .ok_or_else(|| DataError::BackgroundNotFound { key: key.to_string() })?;
        let (_, bkg) = self.backgrounds.remove(idx);
        if self.backgrounds.is_empty() {
            self.subtracted = false;
        }
        Ok(bkg)
    }

    /// Background identifiers in attachment order.
    pub fn background_ids(&self) -> Vec<DataId> {
        self.backgrounds.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn get_background(&self, key: &DataId) -> Result<&PhaHandle, DataError> {
        self.backgrounds
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, b)| b)
            .ok_or_else(|| DataError::BackgroundNotFound { key: key.to_string() })
    }

    /// Factor that scales a background rate to the source aperture:
    ///
    /// `(src_exposure / bkg_exposure) * (src_backscal / bkg_backscal) * (src_areascal / bkg_areascal)`
    ///
    /// Unset values count as 1. The result is an array when any BACKSCAL or
    /// AREASCAL is given per channel.
    pub fn background_ratio(&self, bkg: &DataPha) -> Result<Scale, DataError> {
        let one = Scale::Scalar(1.0);
        let exposure = Scale::Scalar(self.exposure.unwrap_or(1.0)).div(&Scale::Scalar(bkg.exposure.unwrap_or(1.0)))?;
        let backscal = self
            .backscal
            .as_ref()
            .unwrap_or(&one)
            .div(bkg.backscal.as_ref().unwrap_or(&one))?;
        let areascal = self
            .areascal
            .as_ref()
            .unwrap_or(&one)
            .div(bkg.areascal.as_ref().unwrap_or(&one))?;
        exposure.mul(&backscal)?.mul(&areascal)
    }

    /// Sum per-background values after scaling each to the source aperture.
    ///
    /// `eval` is called once per attached background, in attachment order,
    /// and its result is multiplied by `background_ratio`. Any error it
    /// returns is propagated unchanged.
    pub fn sum_background_data<F>(&self, mut eval: F) -> Result<Scale, DataError>
    where
        F: FnMut(&DataId, &DataPha) -> Result<Scale, DataError>,
    {
        if self.backgrounds.is_empty() {
            return Err(DataError::NoBackground {
                name: self.name.clone(),
            });
        }
        let mut total: Option<Scale> = None;
        for (key, handle) in &self.backgrounds {
            let bkg = handle.read();
            let ratio = self.background_ratio(&bkg)?;
            let scaled = ratio.mul(&eval(key, &bkg)?)?;
            total = Some(match total {
                None => scaled,
                Some(acc) => acc.add(&scaled)?,
            });
        }
        total.ok_or_else(|| DataError::NoBackground {
            name: self.name.clone(),
        })
    }

    pub fn subtracted(&self) -> bool {
        self.subtracted
    }

    pub fn subtract(&mut self) -> Result<(), DataError> {
        if self.backgrounds.is_empty() {
            return Err(DataError::NoBackground {
                name: self.name.clone(),
            });
        }
        self.subtracted = true;
        Ok(())
    }

    pub fn unsubtract(&mut self) {
        self.subtracted = false;
    }

    /// Counts after background subtraction, if it is enabled.
    pub fn counts_for_plot(&self) -> Result<Vec<f64>, DataError> {
        if !self.subtracted {
            return Ok(self.counts.clone());
        }
        let bkg = self.sum_background_data(|_, b| Ok(Scale::Array(b.counts.clone())))?;
        let bkg = bkg.apply(&vec![1.0; self.len()])?;
        Ok(self.counts.iter().zip(&bkg).map(|(c, b)| c - b).collect())
    }

    // ---------------------------------------------------------------------
    // Response and analysis units
    // ---------------------------------------------------------------------

    pub fn units(&self) -> AnalysisUnit {
        self.units
    }

    pub fn set_analysis(&mut self, units: AnalysisUnit) {
        self.units = units;
    }

    pub fn set_arf(&mut self, arf: DataArf) {
        self.arf = Some(Arc::new(arf));
    }

    pub fn set_rmf(&mut self, rmf: DataRmf) {
        self.rmf = Some(Arc::new(rmf));
    }

    pub fn arf(&self) -> Option<&DataArf> {
        self.arf.as_deref()
    }

    pub fn rmf(&self) -> Option<&DataRmf> {
        self.rmf.as_deref()
    }

    pub fn has_response(&self) -> bool {
        self.arf.is_some() || self.rmf.is_some()
    }

    /// The instrument response of this dataset.
    pub fn response(&self) -> Result<Response, DataError> {
        let kind = match (&self.arf, &self.rmf) {
            (Some(arf), Some(rmf)) => ResponseKind::ArfRmf(arf.clone(), rmf.clone()),
            (Some(arf), None) => ResponseKind::Arf(arf.clone()),
            (None, Some(rmf)) => ResponseKind::Rmf(rmf.clone()),
            (None, None) => {
                return Err(DataError::NoResponse {
                    name: self.name.clone(),
                });
            }
        };
        Response::new(kind, self.exposure)
    }

    /// Bin edges of every channel in `units`, using `response` for the
    /// channel-to-energy mapping.
    ///
    /// Wavelength bins are returned with `lo < hi`, so they run in the opposite
    /// direction to the channels.
    pub fn bin_edges(&self, units: AnalysisUnit, response: Option<&Response>) -> Result<(Vec<f64>, Vec<f64>), DataError> {
        if units == AnalysisUnit::Channel {
            let hi = self.channel.iter().map(|c| c + 1.0).collect();
            return Ok((self.channel.clone(), hi));
        }

        let response = response.ok_or_else(|| DataError::NoResponse {
            name: self.name.clone(),
        })?;
        let (e_min, e_max) = response.channel_bounds();
        if e_min.len() != self.len() {
            return Err(DataError::GridMismatch {
                expected: self.len(),
                got: e_min.len(),
            });
        }
        let offset = response.rmf().map(|r| r.offset);
        let mut lo = Vec::with_capacity(self.len());
        let mut hi = Vec::with_capacity(self.len());
        for (i, &chan) in self.channel.iter().enumerate() {
            let row = match offset {
                Some(off) => {
                    let row = chan as i64 - off;
                    usize::try_from(row)
                        .ok()
                        .filter(|r| *r < e_min.len())
                        .ok_or_else(|| DataError::invalid("channel", format!("{chan} is outside the response")))?
                }
                None => i,
            };
            lo.push(e_min[row]);
            hi.push(e_max[row]);
        }

        if units == AnalysisUnit::Wavelength {
            if lo.iter().any(|e| *e <= 0.0) {
                return Err(DataError::invalid("energy", "wavelength conversion needs energies > 0"));
            }
            let wlo = hi.iter().map(|e| HC_KEV_ANGSTROM / e).collect();
            let whi = lo.iter().map(|e| HC_KEV_ANGSTROM / e).collect();
            return Ok((wlo, whi));
        }
        Ok((lo, hi))
    }

    /// Gehrels approximation to the Poisson error: `1 + sqrt(N + 0.75)`.
    pub fn staterror(&self) -> Vec<f64> {
        self.counts.iter().map(|&n| gehrels_error(n)).collect()
    }
}

pub fn gehrels_error(n: f64) -> f64 {
    1.0 + (n + 0.75).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pha(name: &str, exposure: f64, backscal: f64) -> DataPha {
        DataPha::new(name, vec![1.0, 2.0, 3.0], vec![1.0, 2.0, 3.0])
            .unwrap()
            .with_exposure(exposure)
            .with_backscal(backscal)
    }

    #[test]
    fn ratio_combines_exposure_and_backscal() {
        let src = pha("src", 1201.0, 0.1);
        let bkg = pha("bkg", 1201.0 * 2.5, 0.4);
        let r = src.background_ratio(&bkg).unwrap().as_scalar().unwrap();
        assert!((r - 0.1).abs() < 1e-12);

        let same = pha("same", 1201.0, 0.1);
        assert_eq!(src.background_ratio(&same).unwrap(), Scale::Scalar(1.0));
    }

    #[test]
    fn array_backscal_gives_array_ratio() {
        let src = pha("src", 10.0, 1.0);
        let bkg = pha("bkg", 10.0, 1.0).with_backscal(vec![1.0, 2.0, 4.0]);
        assert_eq!(src.background_ratio(&bkg).unwrap(), Scale::Array(vec![1.0, 0.5, 0.25]));
    }

    #[test]
    fn areascal_enters_the_ratio() {
        let src = pha("src", 1201.0, 0.1).with_areascal(0.5);
        let bkg = pha("bkg", 1201.0 * 2.5, 0.4).with_areascal(1.0);
        let r = src.background_ratio(&bkg).unwrap().as_scalar().unwrap();
        assert!((r - 0.05).abs() < 1e-12, "ratio {r}");

        // unset AREASCAL on either side counts as 1
        let plain = pha("plain", 1201.0 * 2.5, 0.4);
        let r = src.background_ratio(&plain).unwrap().as_scalar().unwrap();
        assert!((r - 0.05).abs() < 1e-12, "ratio {r}");
    }

    #[test]
    fn array_areascal_gives_array_ratio() {
        let src = pha("src", 10.0, 1.0).with_areascal(vec![1.0, 0.5, 0.25]);
        let bkg = pha("bkg", 20.0, 1.0).with_areascal(0.5);
        assert_eq!(src.background_ratio(&bkg).unwrap(), Scale::Array(vec![1.0, 0.5, 0.25]));
    }

    #[test]
    fn subtraction_scales_by_areascal() {
        let mut src = pha("src", 100.0, 1.0).with_areascal(0.5);
        src.set_background(DataId::Int(1), pha("b", 200.0, 1.0).into());
        src.subtract().unwrap();
        assert_eq!(src.counts_for_plot().unwrap(), vec![0.75, 1.5, 2.25]);
    }

    #[test]
    fn sum_without_backgrounds_fails() {
        let src = pha("src", 1.0, 1.0);
        let err = src.sum_background_data(|_, _| Ok(Scale::Scalar(1.0))).unwrap_err();
        assert!(matches!(err, DataError::NoBackground { .. }));
    }

    #[test]
    fn sum_propagates_callback_errors() {
        let mut src = pha("src", 1.0, 1.0);
        src.set_background(DataId::Int(1), pha("b", 1.0, 1.0).into());
        let err = src
            .sum_background_data(|k, _| Err(DataError::MissingBackgroundModel { key: k.to_string() }))
            .unwrap_err();
        assert_eq!(err, DataError::MissingBackgroundModel { key: "1".into() });
    }

    #[test]
    fn subtraction_removes_scaled_background_counts() {
        let mut src = pha("src", 100.0, 1.0);
        src.set_background(DataId::Int(1), pha("b", 200.0, 1.0).into());
        assert_eq!(src.counts_for_plot().unwrap(), vec![1.0, 2.0, 3.0]);
        src.subtract().unwrap();
        assert_eq!(src.counts_for_plot().unwrap(), vec![0.5, 1.0, 1.5]);

        src.delete_background(&DataId::Int(1)).unwrap();
        assert!(!src.subtracted());
        assert!(src.subtract().is_err());
    }

    #[test]
    fn channel_edges_and_missing_response() {
        let src = pha("src", 1.0, 1.0);
        let (lo, hi) = src.bin_edges(AnalysisUnit::Channel, None).unwrap();
        assert_eq!(lo, vec![1.0, 2.0, 3.0]);
        assert_eq!(hi, vec![2.0, 3.0, 4.0]);
        assert!(matches!(src.response(), Err(DataError::NoResponse { .. })));
        assert!(src.bin_edges(AnalysisUnit::Energy, None).is_err());
    }

    #[test]
    fn wavelength_edges_are_reversed_energies() {
        let mut src = pha("src", 1.0, 1.0);
        src.set_rmf(DataRmf::ideal("r", vec![1.0, 2.0, 3.0], vec![2.0, 3.0, 4.0], 1).unwrap());
        let resp = src.response().unwrap();
        let (lo, hi) = src.bin_edges(AnalysisUnit::Wavelength, Some(&resp)).unwrap();
        assert!((lo[0] - HC_KEV_ANGSTROM / 2.0).abs() < 1e-12);
        assert!((hi[0] - HC_KEV_ANGSTROM).abs() < 1e-12);
        assert!(lo.iter().zip(&hi).all(|(l, h)| l < h));
    }
}
