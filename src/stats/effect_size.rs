// Paired Cohen's d and its bootstrap confidence interval.
//
// The two conditions are repeated measures on the same users, so the effect
// size is computed on per-user differences (A - B):
//
//   d = mean(diff) / sd(diff)          (sample sd, n - 1)
//
// The bootstrap resamples users, i.e. whole differences, with replacement.
// Both conditions of a user always travel together.

use rand::Rng;

use super::normal;
use crate::config::CiMethod;

/// Per-user differences `a[i] - b[i]`.
pub fn paired_differences(a: &[f64], b: &[f64]) -> Vec<f64> {
    debug_assert_eq!(a.len(), b.len(), "paired vectors must be aligned");
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}

/// Standardized mean of a set of paired differences.
///
/// `None` when there are fewer than two values or the differences have no
/// spread (the ratio is undefined).
pub fn standardized_mean(diffs: &[f64]) -> Option<f64> {
    let n = diffs.len();
    if n < 2 {
        return None;
    }
    let mean = diffs.iter().sum::<f64>() / n as f64;
    let ss: f64 = diffs.iter().map(|d| (d - mean) * (d - mean)).sum();
    let sd = (ss / (n - 1) as f64).sqrt();
    if sd == 0.0 || !sd.is_finite() {
        return None;
    }
    let d = mean / sd;
    d.is_finite().then_some(d)
}

/// Paired Cohen's d for two aligned vectors.
pub fn paired_cohen_d(a: &[f64], b: &[f64]) -> Option<f64> {
    standardized_mean(&paired_differences(a, b))
}

/// Round to 4 decimal places, half away from zero.
pub fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Linear-interpolated quantile of an ascending slice (numpy's default).
pub fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = p.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            let frac = pos - lo as f64;
            sorted[lo] + frac * (sorted[hi] - sorted[lo])
        }
    }
}

/// Upper-tail quantile: `-Q(-x, p)`, i.e. the value with `p` of the mass above it.
///
/// Reading the upper bound this way makes intervals exactly antisymmetric
/// when the sign of every statistic is flipped.
fn upper_quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    let mirrored: Vec<f64> = sorted.iter().rev().map(|x| -x).collect();
    -quantile_sorted(&mirrored, p)
}

/// Resampling settings for one bootstrap run.
#[derive(Debug, Clone, Copy)]
pub struct BootstrapSpec {
    pub n_boot: usize,
    pub confidence: f64,
    pub method: CiMethod,
    /// Fewer valid draws than this and the interval is reported unavailable
    pub min_valid: usize,
}

/// Result of resampling one token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BootstrapInterval {
    /// (low, high), rounded to 4 decimals; `None` if too few draws were valid
    pub bounds: Option<(f64, f64)>,
    /// Draws that produced a defined statistic
    pub valid: usize,
}

/// Bootstrap the paired Cohen's d of `diffs`.
///
/// `estimate` is the full-sample statistic; the bias-corrected method needs it
/// and can't run without it. Draws with zero spread are skipped.
pub fn bootstrap_interval<R: Rng>(
    diffs: &[f64],
    estimate: Option<f64>,
    spec: &BootstrapSpec,
    rng: &mut R,
) -> BootstrapInterval {
    let n = diffs.len();
    if n < 2 || spec.n_boot == 0 {
        return BootstrapInterval {
            bounds: None,
            valid: 0,
        };
    }

    let mut stats = Vec::with_capacity(spec.n_boot);
    let mut sample = vec![0.0; n];
    for _ in 0..spec.n_boot {
        for slot in sample.iter_mut() {
            *slot = diffs[rng.random_range(0..n)];
        }
        if let Some(d) = standardized_mean(&sample) {
            stats.push(d);
        }
    }

    let valid = stats.len();
    if valid == 0 || valid < spec.min_valid {
        return BootstrapInterval {
            bounds: None,
            valid,
        };
    }
    stats.sort_by(|a, b| a.total_cmp(b));

    let alpha = 1.0 - spec.confidence;
    let (p_lo, p_hi) = match (spec.method, estimate) {
        (CiMethod::Percentile, _) => (alpha / 2.0, alpha / 2.0),
        (CiMethod::BiasCorrected, Some(theta)) => {
            let below = stats.iter().filter(|&&s| s < theta).count() as f64;
            let ties = stats.iter().filter(|&&s| s == theta).count() as f64;
            let edge = 0.5 / valid as f64;
            let share = ((below + 0.5 * ties) / valid as f64).clamp(edge, 1.0 - edge);
            let z0 = normal::quantile(share);
            let z = normal::quantile(alpha / 2.0);
            // lower level uses z_{α/2}, upper uses z_{1-α/2} = -z_{α/2}
            (normal::cdf(2.0 * z0 + z), 1.0 - normal::cdf(2.0 * z0 - z))
        }
        (CiMethod::BiasCorrected, None) => {
            return BootstrapInterval {
                bounds: None,
                valid,
            }
        }
    };

    let low = quantile_sorted(&stats, p_lo);
    let high = upper_quantile_sorted(&stats, p_hi);
    BootstrapInterval {
        bounds: Some((round4(low), round4(high))),
        valid,
    }
}
