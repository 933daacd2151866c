//! The model interface and model-expression composition.
//!
//! Every model, from a single `const1d` component to a response-folded
//! source-plus-background expression, implements [`Model`]:
//! - `name()` renders the expression for display
//! - `parameters()` exposes the parameters it depends on
//! - `calc(pars, grid)` evaluates it on a grid
//!
//! [`ModelExpr`] is the shared handle used to build expressions. It implements
//! `+`, `-` and `*`, so composition is structurally recursive over the one
//! trait.

use std::fmt;
use std::ops::{Add, Mul, Sub};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::DataError;

/// An evaluation grid.
#[derive(Debug, Clone, PartialEq)]
pub enum Grid {
    /// Evaluate at points.
    Points(Vec<f64>),
    /// Integrate over `[lo, hi]` bins.
    Integrated { lo: Vec<f64>, hi: Vec<f64> },
}

impl Grid {
    pub fn integrated(lo: Vec<f64>, hi: Vec<f64>) -> Result<Self, DataError> {
        if lo.len() != hi.len() {
            return Err(DataError::SizeMismatch {
                what: "grid edges",
                left: lo.len(),
                right: hi.len(),
            });
        }
        Ok(Grid::Integrated { lo, hi })
    }

    pub fn len(&self) -> usize {
        match self {
            Grid::Points(x) => x.len(),
            Grid::Integrated { lo, .. } => lo.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named model parameter.
///
/// Values live behind an atomic so that a shared model can have its
/// parameters updated in place (e.g. by an optimiser or a session file)
/// while other expressions hold handles to it.
#[derive(Debug)]
pub struct Parameter {
    model: String,
    name: String,
    bits: AtomicU64,
}

impl Parameter {
    pub fn new(model: &str, name: &str, value: f64) -> Self {
        Self {
            model: model.to_string(),
            name: name.to_string(),
            bits: AtomicU64::new(value.to_bits()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `"<model>.<name>"`.
    pub fn fullname(&self) -> String {
        format!("{}.{}", self.model, self.name)
    }

    pub fn val(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    pub fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// A model that can be evaluated on a grid.
pub trait Model: Send + Sync + fmt::Debug {
    /// Display name (for composites, the rendered expression).
    fn name(&self) -> String;

    /// Parameters in evaluation order.
    fn parameters(&self) -> Vec<&Parameter>;

    /// Evaluate with explicit parameter values.
    ///
    /// `pars` must have one value per entry of `parameters()`.
    fn calc(&self, pars: &[f64], grid: &Grid) -> Result<Vec<f64>, DataError>;

    /// Current parameter values.
    fn pars(&self) -> Vec<f64> {
        self.parameters().iter().map(|p| p.val()).collect()
    }

    fn npars(&self) -> usize {
        self.parameters().len()
    }
}

/// Shared, cloneable handle to a model.
#[derive(Clone)]
pub struct ModelExpr(Arc<dyn Model>);

impl ModelExpr {
    pub fn new(model: impl Model + 'static) -> Self {
        ModelExpr(Arc::new(model))
    }

    pub fn name(&self) -> String {
        self.0.name()
    }

    pub fn model(&self) -> &dyn Model {
        self.0.as_ref()
    }

    /// Evaluate using the current parameter values.
    pub fn eval(&self, grid: &Grid) -> Result<Vec<f64>, DataError> {
        self.0.calc(&self.0.pars(), grid)
    }

    pub fn calc(&self, pars: &[f64], grid: &Grid) -> Result<Vec<f64>, DataError> {
        self.0.calc(pars, grid)
    }

    /// Look up a parameter by full name (`"cpt.c0"`).
    pub fn find_parameter(&self, fullname: &str) -> Option<&Parameter> {
        self.0.parameters().into_iter().find(|p| p.fullname() == fullname)
    }

    /// Push values into the parameters, in `parameters()` order.
    pub fn set_pars(&self, values: &[f64]) -> Result<(), DataError> {
        let params = self.0.parameters();
        if params.len() != values.len() {
            return Err(DataError::SizeMismatch {
                what: "parameter values",
                left: params.len(),
                right: values.len(),
            });
        }
        for (p, v) in params.iter().zip(values) {
            p.set(*v);
        }
        Ok(())
    }

    /// Whether both handles point at the same model instance.
    pub fn ptr_eq(&self, other: &ModelExpr) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<M: Model + 'static> From<Arc<M>> for ModelExpr {
    fn from(value: Arc<M>) -> Self {
        ModelExpr(value)
    }
}

impl fmt::Debug for ModelExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModelExpr").field(&self.name()).finish()
    }
}

impl fmt::Display for ModelExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
}

impl BinOp {
    fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
        }
    }

    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinOp::Add => a + b,
            BinOp::Sub => a - b,
            BinOp::Mul => a * b,
        }
    }
}

/// `lhs <op> rhs`, evaluated bin by bin.
#[derive(Debug)]
pub struct BinaryOpModel {
    op: BinOp,
    lhs: ModelExpr,
    rhs: ModelExpr,
}

impl BinaryOpModel {
    pub fn new(op: BinOp, lhs: ModelExpr, rhs: ModelExpr) -> Self {
        Self { op, lhs, rhs }
    }

    pub fn parts(&self) -> (&ModelExpr, &ModelExpr) {
        (&self.lhs, &self.rhs)
    }
}

impl Model for BinaryOpModel {
    fn name(&self) -> String {
        format!("({} {} {})", self.lhs.name(), self.op.symbol(), self.rhs.name())
    }

    fn parameters(&self) -> Vec<&Parameter> {
        let mut out = self.lhs.model().parameters();
        out.extend(self.rhs.model().parameters());
        out
    }

    fn calc(&self, pars: &[f64], grid: &Grid) -> Result<Vec<f64>, DataError> {
        let nl = self.lhs.model().npars();
        if pars.len() < nl {
            return Err(DataError::SizeMismatch {
                what: "parameter values",
                left: self.npars(),
                right: pars.len(),
            });
        }
        let (pl, pr) = pars.split_at(nl);
        let a = self.lhs.calc(pl, grid)?;
        let b = self.rhs.calc(pr, grid)?;
        if a.len() != b.len() {
            return Err(DataError::SizeMismatch {
                what: "model operands",
                left: a.len(),
                right: b.len(),
            });
        }
        Ok(a.iter().zip(&b).map(|(&x, &y)| self.op.apply(x, y)).collect())
    }
}

/// `factor * model`.
#[derive(Debug)]
pub struct ScaledModel {
    factor: f64,
    model: ModelExpr,
}

impl ScaledModel {
    pub fn new(factor: f64, model: ModelExpr) -> Self {
        Self { factor, model }
    }
}

impl Model for ScaledModel {
    fn name(&self) -> String {
        format!("({} * {})", crate::report::format_g(self.factor), self.model.name())
    }

    fn parameters(&self) -> Vec<&Parameter> {
        self.model.model().parameters()
    }

    fn calc(&self, pars: &[f64], grid: &Grid) -> Result<Vec<f64>, DataError> {
        Ok(self
            .model
            .calc(pars, grid)?
            .into_iter()
            .map(|v| v * self.factor)
            .collect())
    }
}

impl Add for ModelExpr {
    type Output = ModelExpr;

    fn add(self, rhs: ModelExpr) -> ModelExpr {
        ModelExpr::new(BinaryOpModel::new(BinOp::Add, self, rhs))
    }
}

impl Sub for ModelExpr {
    type Output = ModelExpr;

    fn sub(self, rhs: ModelExpr) -> ModelExpr {
        ModelExpr::new(BinaryOpModel::new(BinOp::Sub, self, rhs))
    }
}

impl Mul for ModelExpr {
    type Output = ModelExpr;

    fn mul(self, rhs: ModelExpr) -> ModelExpr {
        ModelExpr::new(BinaryOpModel::new(BinOp::Mul, self, rhs))
    }
}

impl Mul<ModelExpr> for f64 {
    type Output = ModelExpr;

    fn mul(self, rhs: ModelExpr) -> ModelExpr {
        ModelExpr::new(ScaledModel::new(self, rhs))
    }
}
