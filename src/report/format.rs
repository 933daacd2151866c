//! Terminal formatting for plot products and statistics.
//!
//! Numbers are rendered with [`format_g`] everywhere, including model names,
//! so a scale factor prints the same in a table and in an expression.

use crate::domain::PlotData;
use crate::session::StatInfo;

/// Format a number like C's `%g`: six significant digits, trailing zeros
/// removed, exponent notation outside `[1e-4, 1e6)`.
pub fn format_g(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return if value.is_nan() {
            "nan".to_string()
        } else if value > 0.0 {
            "inf".to_string()
        } else {
            "-inf".to_string()
        };
    }

    const PRECISION: i32 = 6;
    // Round to the target precision first: the exponent can change (9.999999 -> 10).
    let sci = format!("{:.*e}", (PRECISION - 1) as usize, value);
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);

    if exp < -4 || exp >= PRECISION {
        let mantissa = trim_zeros(mantissa);
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exp.abs())
    } else {
        let decimals = (PRECISION - 1 - exp).max(0) as usize;
        trim_zeros(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Format a plot as a fixed-width table.
pub fn format_plot_table(plot: &PlotData) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== {} ===\n", plot.title));
    out.push_str(&format!("x: {} | y: {}\n", plot.xlabel, plot.ylabel));

    let has_bins = plot.xlo.is_some() && plot.xhi.is_some();
    let has_err = plot.yerr.is_some();

    out.push_str(&format!("{:>14}", "x"));
    if has_bins {
        out.push_str(&format!(" {:>14} {:>14}", "xlo", "xhi"));
    }
    out.push_str(&format!(" {:>14}", "y"));
    if has_err {
        out.push_str(&format!(" {:>14}", "yerr"));
    }
    out.push('\n');

    for i in 0..plot.y.len() {
        let cell = |v: Option<&f64>| v.map(|v| format_g(*v)).unwrap_or_default();
        out.push_str(&format!("{:>14}", cell(plot.x.get(i))));
        if let (Some(lo), Some(hi)) = (&plot.xlo, &plot.xhi) {
            out.push_str(&format!(" {:>14} {:>14}", cell(lo.get(i)), cell(hi.get(i))));
        }
        out.push_str(&format!(" {:>14}", cell(plot.y.get(i))));
        if let Some(err) = &plot.yerr {
            out.push_str(&format!(" {:>14}", cell(err.get(i))));
        }
        out.push('\n');
    }
    out
}

/// Format per-dataset statistics and their total.
pub fn format_stat_summary(info: &[StatInfo]) -> String {
    let mut out = String::new();
    out.push_str("=== Chi-square (Gehrels) ===\n");
    for s in info {
        out.push_str(&format!(
            "Dataset {:<8} statval = {:<14} n = {}\n",
            s.id.to_string(),
            format_g(s.statval),
            s.numpoints
        ));
    }
    let total: f64 = info.iter().map(|s| s.statval).sum();
    let n: usize = info.iter().map(|s| s.numpoints).sum();
    out.push_str(&format!("Total: statval = {} | n = {}\n", format_g(total), n));
    out
}
