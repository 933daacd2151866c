//! Simulated PHA counts.
//!
//! `fake_pha` replaces the counts of a dataset with a Poisson realisation of
//! its current full model (source + backgrounds, through the response). The
//! RNG is seeded explicitly so runs are reproducible.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Poisson;

use crate::domain::DataId;
use crate::error::DataError;
use crate::models::Grid;
use crate::session::Session;

/// Draw one Poisson sample per predicted channel value.
pub fn poisson_counts(predicted: &[f64], rng: &mut impl Rng) -> Result<Vec<f64>, DataError> {
    predicted
        .iter()
        .map(|&mu| {
            if !(mu.is_finite() && mu >= 0.0) {
                return Err(DataError::invalid("predicted counts", format!("{mu} is not a valid Poisson mean")));
            }
            if mu == 0.0 {
                return Ok(0.0);
            }
            let dist = Poisson::new(mu).map_err(|e| DataError::invalid("predicted counts", e.to_string()))?;
            Ok(dist.sample(&mut *rng))
        })
        .collect()
}

/// Replace the counts of dataset `id` with simulated counts.
pub fn fake_pha(session: &Session, id: &DataId, seed: u64) -> Result<(), DataError> {
    let data = session.get_data(id)?;
    let model = session.get_model(id)?;
    let channel = data.read().channel().to_vec();
    let predicted = model.eval(&Grid::Points(channel))?;

    let mut rng = StdRng::seed_from_u64(seed);
    let counts = poisson_counts(&predicted, &mut rng)?;
    log::info!(
        "simulated data set {id}: {} counts over {} channels",
        counts.iter().sum::<f64>(),
        counts.len()
    );
    data.write().set_counts(counts)
}
