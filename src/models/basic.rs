//! One-dimensional leaf models.
//!
//! On a `Grid::Points` grid each model returns its value at `x`; on a
//! `Grid::Integrated` grid it returns the analytic integral over each bin, which
//! is what the instrument response needs (photons per bin, not per keV).

use crate::error::DataError;
use crate::math::erf_diff;
use crate::models::{Grid, Model, Parameter};

fn check_pars(name: &str, pars: &[f64], n: usize) -> Result<(), DataError> {
    if pars.len() != n {
        return Err(DataError::invalid(
            "parameter values",
            format!("{name} expects {n} values, got {}", pars.len()),
        ));
    }
    Ok(())
}

/// `f(x) = c0`.
#[derive(Debug)]
pub struct Const1D {
    name: String,
    pub c0: Parameter,
}

impl Const1D {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            c0: Parameter::new(name, "c0", 1.0),
        }
    }
}

impl Model for Const1D {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn parameters(&self) -> Vec<&Parameter> {
        vec![&self.c0]
    }

    fn calc(&self, pars: &[f64], grid: &Grid) -> Result<Vec<f64>, DataError> {
        check_pars(&self.name, pars, 1)?;
        let c0 = pars[0];
        Ok(match grid {
            Grid::Points(x) => vec![c0; x.len()],
            Grid::Integrated { lo, hi } => lo.iter().zip(hi).map(|(l, h)| c0 * (h - l)).collect(),
        })
    }
}

/// `f(x) = ampl * (x / ref)^(-gamma)`.
#[derive(Debug)]
pub struct PowLaw1D {
    name: String,
    pub gamma: Parameter,
    pub reference: Parameter,
    pub ampl: Parameter,
}

impl PowLaw1D {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            gamma: Parameter::new(name, "gamma", 1.0),
            reference: Parameter::new(name, "ref", 1.0),
            ampl: Parameter::new(name, "ampl", 1.0),
        }
    }
}

impl Model for PowLaw1D {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn parameters(&self) -> Vec<&Parameter> {
        vec![&self.gamma, &self.reference, &self.ampl]
    }

    fn calc(&self, pars: &[f64], grid: &Grid) -> Result<Vec<f64>, DataError> {
        check_pars(&self.name, pars, 3)?;
        let (gamma, r, ampl) = (pars[0], pars[1], pars[2]);
        if r == 0.0 {
            return Err(DataError::invalid("powlaw1d ref", "must be non-zero"));
        }
        Ok(match grid {
            Grid::Points(x) => x.iter().map(|&x| ampl * (x / r).powf(-gamma)).collect(),
            Grid::Integrated { lo, hi } => {
                lo.iter()
                    .zip(hi)
                    .map(|(&l, &h)| {
                        if (gamma - 1.0).abs() < 1e-12 {
                            ampl * r * (h / l).ln()
                        } else {
                            let p = 1.0 - gamma;
                            ampl * r / p * ((h / r).powf(p) - (l / r).powf(p))
                        }
                    })
                    .collect()
            }
        })
    }
}

/// `f(x) = ampl * exp(-4 ln2 (x - pos)^2 / fwhm^2)`.
#[derive(Debug)]
pub struct Gauss1D {
    name: String,
    pub fwhm: Parameter,
    pub pos: Parameter,
    pub ampl: Parameter,
}

impl Gauss1D {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fwhm: Parameter::new(name, "fwhm", 10.0),
            pos: Parameter::new(name, "pos", 0.0),
            ampl: Parameter::new(name, "ampl", 1.0),
        }
    }
}

impl Model for Gauss1D {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn parameters(&self) -> Vec<&Parameter> {
        vec![&self.fwhm, &self.pos, &self.ampl]
    }

    fn calc(&self, pars: &[f64], grid: &Grid) -> Result<Vec<f64>, DataError> {
        check_pars(&self.name, pars, 3)?;
        let (fwhm, pos, ampl) = (pars[0], pars[1], pars[2]);
        if fwhm <= 0.0 {
            return Err(DataError::invalid("gauss1d fwhm", "must be positive"));
        }
        // f(x) = ampl * exp(-((x - pos) / s)^2)
        let s = fwhm / (2.0 * std::f64::consts::LN_2.sqrt());
        Ok(match grid {
            Grid::Points(x) => x
                .iter()
                .map(|&x| {
                    let u = (x - pos) / s;
                    ampl * (-u * u).exp()
                })
                .collect(),
            Grid::Integrated { lo, hi } => {
                let norm = ampl * s * std::f64::consts::PI.sqrt() / 2.0;
                lo.iter()
                    .zip(hi)
                    .map(|(&l, &h)| norm * erf_diff((l - pos) / s, (h - pos) / s))
                    .collect()
            }
        })
    }
}
