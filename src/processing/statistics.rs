use serde::ser::{Serialize, SerializeSeq, Serializer};
use serde::Deserialize;

/// Marker written when a statistic is not applicable (ambiguous mode).
pub const NOT_APPLICABLE: &str = "#N/A";

/// Divisor used for the squared-deviation sum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum VariancePolicy {
    /// Divide by `n`.
    #[default]
    Population,
    /// Divide by `n - 1`. Undefined below two values.
    Sample,
}

/// What to report when several values share the highest frequency.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum ModeTiePolicy {
    #[default]
    ReturnAll,
    Sentinel,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StatsOptions {
    pub variance: VariancePolicy,
    pub mode_ties: ModeTiePolicy,
    /// Divide every value by this factor before summing, then rescale.
    /// Only needed for magnitudes whose squares overflow `f64`.
    pub precision_scale: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Single(f64),
    /// Tied values in ascending order. Callers should not depend on the order.
    Tied(Vec<f64>),
    NotApplicable,
}

impl Mode {
    pub fn values(&self) -> &[f64] {
        match self {
            Mode::Single(v) => std::slice::from_ref(v),
            Mode::Tied(vs) => vs,
            Mode::NotApplicable => &[],
        }
    }
}

impl Serialize for Mode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Mode::Single(v) => serializer.serialize_f64(*v),
            Mode::Tied(vs) => {
                let mut seq = serializer.serialize_seq(Some(vs.len()))?;
                for v in vs {
                    seq.serialize_element(v)?;
                }
                seq.end()
            }
            Mode::NotApplicable => serializer.serialize_str(NOT_APPLICABLE),
        }
    }
}

/// Descriptive statistics for one numeric sample.
///
/// Every field except `count` is `None` exactly when the sample is empty,
/// apart from `variance`/`standard_deviation` under the sample policy with a
/// single value.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StatisticsResult {
    pub count: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub mode: Option<Mode>,
    pub variance: Option<f64>,
    pub standard_deviation: Option<f64>,
}

impl StatisticsResult {
    pub fn empty() -> Self {
        Self {
            count: 0,
            mean: None,
            median: None,
            mode: None,
            variance: None,
            standard_deviation: None,
        }
    }
}

/// Compute count, mean, median, mode, variance and standard deviation.
pub fn compute(values: &[f64], opts: &StatsOptions) -> StatisticsResult {
    if values.is_empty() {
        return StatisticsResult::empty();
    }

    let count = values.len();
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let median = if count % 2 == 0 {
        sorted[count / 2 - 1] / 2.0 + sorted[count / 2] / 2.0
    } else {
        sorted[count / 2]
    };
    let mode = mode_of_sorted(&sorted, opts.mode_ties);

    let factor = opts.precision_scale.unwrap_or(1.0);
    let scaled: Vec<f64> = values.iter().map(|v| v / factor).collect();
    let scaled_mean = mean_of(&scaled);
    let divisor = match opts.variance {
        VariancePolicy::Population => count,
        VariancePolicy::Sample => count - 1,
    };
    let scaled_variance = (divisor > 0).then(|| {
        compensated_sum(scaled.iter().map(|v| (v - scaled_mean).powi(2))) / divisor as f64
    });

    tracing::debug!(
        "count={} scale={} divisor={} ties={:?}",
        count,
        factor,
        divisor,
        opts.mode_ties
    );

    StatisticsResult {
        count,
        mean: Some(scaled_mean * factor),
        median: Some(median),
        mode: Some(mode),
        variance: scaled_variance.map(|v| v * factor * factor),
        standard_deviation: scaled_variance.map(|v| v.sqrt() * factor),
    }
}

/// Group equal neighbours of an ascending slice and keep the most frequent.
fn mode_of_sorted(sorted: &[f64], ties: ModeTiePolicy) -> Mode {
    let mut best: Vec<f64> = Vec::new();
    let mut best_freq = 0usize;
    let mut i = 0;
    while i < sorted.len() {
        let v = sorted[i];
        // 0.0 == -0.0, so both zeros land in one run.
        let run = sorted[i..].iter().take_while(|&&x| x == v).count();
        if run > best_freq {
            best_freq = run;
            best.clear();
            best.push(v);
        } else if run == best_freq {
            best.push(v);
        }
        i += run;
    }

    match (best.len(), ties) {
        (1, _) => Mode::Single(best[0]),
        (_, ModeTiePolicy::ReturnAll) => Mode::Tied(best),
        (_, ModeTiePolicy::Sentinel) => Mode::NotApplicable,
    }
}

/// Arithmetic mean. Falls back to summing `v / n` when the plain total overflows.
fn mean_of(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let total = compensated_sum(values.iter().copied());
    if total.is_finite() {
        total / n
    } else {
        compensated_sum(values.iter().map(|v| v / n))
    }
}

/// Neumaier compensated summation.
///
/// Once the running sum overflows it can never become finite again, and the
/// compensation term would turn into `inf - inf`, so it is dropped.
fn compensated_sum<I: IntoIterator<Item = f64>>(data: I) -> f64 {
    let mut sum = 0.0_f64;
    let mut c = 0.0_f64;
    for x in data {
        let t = sum + x;
        if !t.is_finite() {
            sum = t;
            continue;
        }
        if sum.abs() >= x.abs() {
            c += (sum - t) + x;
        } else {
            c += (x - t) + sum;
        }
        sum = t;
    }
    if sum.is_finite() {
        sum + c
    } else {
        sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    fn opts(variance: VariancePolicy, mode_ties: ModeTiePolicy) -> StatsOptions {
        StatsOptions {
            variance,
            mode_ties,
            precision_scale: None,
        }
    }

    #[test]
    fn test_empty_sample() {
        let r = compute(&[], &StatsOptions::default());
        assert_eq!(r, StatisticsResult::empty());
        assert_eq!(r.count, 0);
    }

    #[test]
    fn test_single_value() {
        let pop = compute(
            &[5.0],
            &opts(VariancePolicy::Population, ModeTiePolicy::ReturnAll),
        );
        assert_eq!(pop.mean, Some(5.0));
        assert_eq!(pop.median, Some(5.0));
        assert_eq!(pop.mode, Some(Mode::Single(5.0)));
        assert_eq!(pop.variance, Some(0.0));
        assert_eq!(pop.standard_deviation, Some(0.0));

        let sample = compute(&[5.0], &opts(VariancePolicy::Sample, ModeTiePolicy::ReturnAll));
        assert_eq!(sample.mean, Some(5.0));
        assert_eq!(sample.variance, None);
        assert_eq!(sample.standard_deviation, None);
    }

    #[test]
    fn test_two_values_both_policies() {
        let pop = compute(
            &[1.0, 3.0],
            &opts(VariancePolicy::Population, ModeTiePolicy::ReturnAll),
        );
        assert_eq!(pop.mean, Some(2.0));
        assert_eq!(pop.median, Some(2.0));
        assert_eq!(pop.variance, Some(1.0));
        assert_eq!(pop.standard_deviation, Some(1.0));

        let sample = compute(
            &[1.0, 3.0],
            &opts(VariancePolicy::Sample, ModeTiePolicy::ReturnAll),
        );
        assert_eq!(sample.variance, Some(2.0));
        assert!(approx(sample.standard_deviation.unwrap(), 2.0_f64.sqrt()));
    }

    #[test]
    fn test_unique_mode_and_even_median() {
        let r = compute(&[1.0, 1.0, 2.0, 3.0], &StatsOptions::default());
        assert_eq!(r.mode, Some(Mode::Single(1.0)));
        assert_eq!(r.median, Some(1.5));
    }

    #[test]
    fn test_mode_ties_sentinel() {
        let r = compute(
            &[1.0, 1.0, 2.0, 2.0],
            &opts(VariancePolicy::Population, ModeTiePolicy::Sentinel),
        );
        assert_eq!(r.mode, Some(Mode::NotApplicable));
    }

    #[test]
    fn test_mode_ties_return_all() {
        let r = compute(
            &[2.0, 1.0, 2.0, 1.0],
            &opts(VariancePolicy::Population, ModeTiePolicy::ReturnAll),
        );
        let mut tied = r.mode.unwrap().values().to_vec();
        tied.sort_by(f64::total_cmp);
        assert_eq!(tied, vec![1.0, 2.0]);
    }

    #[test]
    fn test_all_distinct_is_a_tie() {
        let r = compute(
            &[3.0, 1.0, 2.0],
            &opts(VariancePolicy::Population, ModeTiePolicy::Sentinel),
        );
        assert_eq!(r.mode, Some(Mode::NotApplicable));
    }

    #[test]
    fn test_signed_zeros_count_as_one_value() {
        let r = compute(&[-0.0, 0.0, 4.0], &StatsOptions::default());
        match r.mode {
            Some(Mode::Single(v)) => assert_eq!(v, 0.0),
            other => panic!("expected single mode, got {other:?}"),
        }
    }

    #[test]
    fn test_order_does_not_change_result() {
        let a = compute(&[4.0, 1.0, 3.0, 2.0, 2.0], &StatsOptions::default());
        let b = compute(&[2.0, 2.0, 1.0, 3.0, 4.0], &StatsOptions::default());
        assert_eq!(a, b);
        assert_eq!(a.median, Some(2.0));
    }

    #[test]
    fn test_precision_scale_handles_huge_magnitudes() {
        let values = [1e200, 3e200];
        let plain = compute(&values, &StatsOptions::default());
        // (1e200)^2 overflows without scaling.
        assert_eq!(plain.variance, Some(f64::INFINITY));

        let guarded = compute(
            &values,
            &StatsOptions {
                precision_scale: Some(1e100),
                ..Default::default()
            },
        );
        assert!(approx(guarded.mean.unwrap(), 2e200));
        assert!(approx(guarded.standard_deviation.unwrap(), 1e200));
        assert!(approx(guarded.median.unwrap(), 2e200));
    }

    #[test]
    fn test_precision_scale_is_invisible() {
        let values = [12.5, 7.0, 3.25, 7.0, 99.0, -4.0];
        let plain = compute(&values, &StatsOptions::default());
        let scaled = compute(
            &values,
            &StatsOptions {
                precision_scale: Some(1e18),
                ..Default::default()
            },
        );
        assert!(approx(plain.mean.unwrap(), scaled.mean.unwrap()));
        assert!(approx(plain.variance.unwrap(), scaled.variance.unwrap()));
        assert_eq!(plain.median, scaled.median);
        assert_eq!(plain.mode, scaled.mode);
    }

    #[test]
    fn test_compensated_sum_recovers_small_terms() {
        let data = [1e16, 1.0, -1e16];
        assert_eq!(compensated_sum(data), 1.0);
    }

    #[test]
    fn test_compensated_sum_overflow_is_infinite() {
        assert_eq!(compensated_sum([f64::MAX, f64::MAX]), f64::INFINITY);
        assert_eq!(compensated_sum([f64::MAX, f64::MAX, -1.0]), f64::INFINITY);
        assert_eq!(compensated_sum([-f64::MAX, -f64::MAX]), f64::NEG_INFINITY);
    }

    #[test]
    fn test_near_max_values_without_scale() {
        let r = compute(&[f64::MAX, f64::MAX], &StatsOptions::default());
        assert_eq!(r.mean, Some(f64::MAX));
        assert_eq!(r.median, Some(f64::MAX));
        assert_eq!(r.variance, Some(0.0));
        assert_eq!(r.standard_deviation, Some(0.0));

        let r = compute(&[1e308, 1e308, -1e308, 5e307], &StatsOptions::default());
        for v in [r.mean, r.median, r.variance, r.standard_deviation] {
            assert!(!v.unwrap().is_nan(), "{r:?}");
        }

        let r = compute(&[f64::MAX, -f64::MAX], &StatsOptions::default());
        assert_eq!(r.mean, Some(0.0));
        assert_eq!(r.variance, Some(f64::INFINITY));
        assert_eq!(r.standard_deviation, Some(f64::INFINITY));
    }

    #[test]
    fn test_squares_overflow_to_infinity_not_nan() {
        let r = compute(&[1e200, 3e200], &StatsOptions::default());
        assert!(approx(r.mean.unwrap(), 2e200));
        assert_eq!(r.variance, Some(f64::INFINITY));
        assert_eq!(r.standard_deviation, Some(f64::INFINITY));
    }

    #[test]
    fn test_mode_serializes_as_json() {
        assert_eq!(serde_json::to_string(&Mode::Single(1.5)).unwrap(), "1.5");
        assert_eq!(
            serde_json::to_string(&Mode::Tied(vec![1.0, 2.0])).unwrap(),
            "[1.0,2.0]"
        );
        assert_eq!(
            serde_json::to_string(&Mode::NotApplicable).unwrap(),
            "\"#N/A\""
        );
    }
}
