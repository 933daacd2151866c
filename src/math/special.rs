//! Special functions needed by the analytic model integrals.
//!
//! `erf(x) - erf(y)` for two large arguments of the same sign loses all
//! precision; `erf_diff` switches to `erfc` differences in the tails.

use statrs::function::erf::{erf, erfc};

/// `erf(hi) - erf(lo)` computed without cancellation in the tails.
pub fn erf_diff(lo: f64, hi: f64) -> f64 {
    if lo >= 0.0 {
        erfc(lo) - erfc(hi)
    } else if hi <= 0.0 {
        erfc(-hi) - erfc(-lo)
    } else {
        erf(hi) - erf(lo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn erf_diff_matches_erf_in_the_core() {
        assert!((erf_diff(-1.0, 1.0) - 2.0 * 0.842_700_792_949_715).abs() < 1e-14);
        assert!((erf_diff(0.0, 3.0) - 0.999_977_909_503_001).abs() < 1e-14);
        assert!((erf_diff(-3.0, 0.0) - 0.999_977_909_503_001).abs() < 1e-14);
    }

    #[test]
    fn erf_diff_is_stable_in_the_tail() {
        // erfc(6) - erfc(7), both far below the f64 resolution of erf near 1
        let d = erf_diff(6.0, 7.0);
        let want = 2.151_973_671_249_891e-17 - 4.183_825_607_779_414e-23;
        assert!((d - want).abs() < 1e-12 * want, "got {d}");
        assert!((erf_diff(-7.0, -6.0) - d).abs() < 1e-30);
    }
}
