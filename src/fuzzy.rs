//! Fuzzy confidence classification
//!
//! R² is mapped onto a confidence level in `[0, 5]` by a static Mamdani
//! system: five input sets sampled over `[-12, 2)` in steps of 0.1, one rule
//! per set onto the output set of the same name, min-clipping, max
//! aggregation and a piecewise-linear centroid over the output universe
//! `0..=5`. The level is then bucketed into a [`ConfidenceBucket`].
//!
//! | R² | level | bucket |
//! |----|-------|--------|
//! | ≤ -12 or NaN | 0 | `NEGATIVE` |
//! | -6 | 1.5 | `PRESUMED_LOW` |
//! | 0.5 | ≈4.22 | `PRESUMED_VERY_HIGH` |

use std::fmt;

use serde::{Deserialize, Serialize};

/// R² at or below which a comparison is treated as no match at all
pub const GATE_FLOOR: f64 = -12.0;

/// Triangular membership function sampled on `x`, vertices `[a, b, c]`
pub fn trimf(x: &[f64], [a, b, c]: [f64; 3]) -> Vec<f64> {
    x.iter()
        .map(|&v| {
            if v == b {
                1.0
            } else if a != b && a < v && v < b {
                (v - a) / (b - a)
            } else if b != c && b < v && v < c {
                (c - v) / (c - b)
            } else {
                0.0
            }
        })
        .collect()
}

/// Trapezoidal membership function sampled on `x`, vertices `[a, b, c, d]`
pub fn trapmf(x: &[f64], [a, b, c, d]: [f64; 4]) -> Vec<f64> {
    x.iter()
        .map(|&v| {
            if v < a || v > d {
                0.0
            } else if v >= c {
                trimf(&[v], [c, c, d])[0]
            } else if v <= b {
                trimf(&[v], [a, b, b])[0]
            } else {
                1.0
            }
        })
        .collect()
}

/// Degree of `value` in a sampled set, interpolated linearly between
/// samples and clamped to the end samples outside the universe
pub fn interp_membership(universe: &[f64], set: &[f64], value: f64) -> f64 {
    let (Some(&first), Some(&last)) = (universe.first(), universe.last()) else {
        return 0.0;
    };
    if value <= first {
        return set[0];
    }
    if value >= last {
        return set[set.len() - 1];
    }
    let i = universe.partition_point(|&x| x <= value);
    let (x0, x1) = (universe[i - 1], universe[i]);
    let (y0, y1) = (set[i - 1], set[i]);
    y0 + (y1 - y0) * (value - x0) / (x1 - x0)
}

/// Centroid of a piecewise-linear membership curve.
///
/// Each segment between samples is integrated exactly as a rectangle,
/// triangle or trapezoid.
pub fn centroid(x: &[f64], mfx: &[f64]) -> f64 {
    if x.len() == 1 {
        return x[0] * mfx[0] / mfx[0].max(f64::EPSILON);
    }
    let mut sum_moment_area = 0.0;
    let mut sum_area = 0.0;
    for i in 1..x.len() {
        let (x1, x2) = (x[i - 1], x[i]);
        let (y1, y2) = (mfx[i - 1], mfx[i]);
        if (y1 == 0.0 && y2 == 0.0) || x1 == x2 {
            continue;
        }
        let dx = x2 - x1;
        let (moment, area) = if y1 == y2 {
            (0.5 * (x1 + x2), dx * y1)
        } else if y1 == 0.0 {
            (2.0 / 3.0 * dx + x1, 0.5 * dx * y2)
        } else if y2 == 0.0 {
            (1.0 / 3.0 * dx + x1, 0.5 * dx * y1)
        } else {
            (
                2.0 / 3.0 * dx * (y2 + 0.5 * y1) / (y1 + y2) + x1,
                0.5 * dx * (y1 + y2),
            )
        };
        sum_moment_area += moment * area;
        sum_area += area;
    }
    sum_moment_area / sum_area.max(f64::EPSILON)
}

/// A named fuzzy set sampled on its universe
#[derive(Debug, Clone, PartialEq)]
pub struct MembershipSet {
    /// Set name (`very_low` ... `very_high`)
    pub name: &'static str,
    /// Degrees at each universe sample
    pub values: Vec<f64>,
}

/// Static R² → confidence level rule system
#[derive(Debug, Clone)]
pub struct FuzzyClassifier {
    input_universe: Vec<f64>,
    output_universe: Vec<f64>,
    input_sets: Vec<MembershipSet>,
    output_sets: Vec<MembershipSet>,
    /// (input set, output set) index pairs
    rules: Vec<(usize, usize)>,
}

impl Default for FuzzyClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl FuzzyClassifier {
    /// Build the screening rule system
    pub fn new() -> Self {
        // -12.0, -11.9, ..., 1.9
        let input_universe: Vec<f64> = (0..140).map(|i| -12.0 + i as f64 * 0.1).collect();
        let output_universe: Vec<f64> = (0..6).map(f64::from).collect();

        let input_sets = vec![
            MembershipSet {
                name: "very_low",
                values: trapmf(&input_universe, [-12.0, -12.0, -8.0, -4.0]),
            },
            MembershipSet {
                name: "low",
                values: trimf(&input_universe, [-8.0, -4.0, -2.0]),
            },
            MembershipSet {
                name: "medium",
                values: trimf(&input_universe, [-4.0, -2.0, 0.0]),
            },
            MembershipSet {
                name: "high",
                values: trimf(&input_universe, [-2.0, 0.0, 1.0]),
            },
            MembershipSet {
                name: "very_high",
                values: trimf(&input_universe, [0.0, 1.0, 2.0]),
            },
        ];

        let output_sets: Vec<MembershipSet> = [
            ("negative", 0.0),
            ("very_low", 1.0),
            ("low", 2.0),
            ("medium", 3.0),
            ("high", 4.0),
            ("very_high", 5.0),
        ]
        .into_iter()
        .map(|(name, peak)| MembershipSet {
            name,
            values: trimf(&output_universe, [peak, peak, peak + 1.0]),
        })
        .collect();

        // each input set fires the output set of the same name
        let rules = input_sets
            .iter()
            .enumerate()
            .filter_map(|(i, input)| {
                output_sets
                    .iter()
                    .position(|o| o.name == input.name)
                    .map(|o| (i, o))
            })
            .collect();

        Self {
            input_universe,
            output_universe,
            input_sets,
            output_sets,
            rules,
        }
    }

    /// Degree of `r2` in each input set
    pub fn memberships(&self, r2: f64) -> Vec<(&'static str, f64)> {
        self.input_sets
            .iter()
            .map(|set| {
                let degree = if r2.is_nan() || r2 <= GATE_FLOOR {
                    0.0
                } else {
                    interp_membership(&self.input_universe, &set.values, r2)
                };
                (set.name, degree)
            })
            .collect()
    }

    /// Aggregated output curve for `r2`
    fn aggregate(&self, r2: f64) -> Vec<f64> {
        let degrees = self.memberships(r2);
        let mut aggregate = vec![0.0f64; self.output_universe.len()];
        for &(input, output) in &self.rules {
            let degree = degrees[input].1;
            for (agg, &v) in aggregate.iter_mut().zip(&self.output_sets[output].values) {
                *agg = agg.max(v.min(degree));
            }
        }
        aggregate
    }

    /// Confidence level in `[0, 5]`; 0 when no rule fires
    pub fn classify(&self, r2: f64) -> f64 {
        let aggregate = self.aggregate(r2);
        if aggregate.iter().sum::<f64>() == 0.0 {
            return 0.0;
        }
        centroid(&self.output_universe, &aggregate)
    }

    /// Level and bucket for `r2`
    pub fn classify_bucket(&self, r2: f64) -> (f64, ConfidenceBucket) {
        let level = self.classify(r2);
        (level, ConfidenceBucket::from_level(level))
    }
}

/// Screening conclusion for one substance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceBucket {
    /// No rule fired
    Negative,
    /// Level in (0, 1]
    PresumedVeryLow,
    /// Level in (1, 2]
    PresumedLow,
    /// Level in (2, 3]
    PresumedMedium,
    /// Level in (3, 4]
    PresumedHigh,
    /// Level in (4, 5]
    PresumedVeryHigh,
    /// Level above 5: the positive control was not fortified
    ControlNotFortified,
}

impl ConfidenceBucket {
    /// Bucket a confidence level
    pub fn from_level(level: f64) -> Self {
        if level.is_nan() || level == 0.0 {
            Self::Negative
        } else if level <= 1.0 {
            Self::PresumedVeryLow
        } else if level <= 2.0 {
            Self::PresumedLow
        } else if level <= 3.0 {
            Self::PresumedMedium
        } else if level <= 4.0 {
            Self::PresumedHigh
        } else if level <= 5.0 {
            Self::PresumedVeryHigh
        } else {
            Self::ControlNotFortified
        }
    }

    /// Report label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Negative => "NEGATIVE",
            Self::PresumedVeryLow => "PRESUMED_VERY_LOW",
            Self::PresumedLow => "PRESUMED_LOW",
            Self::PresumedMedium => "PRESUMED_MEDIUM",
            Self::PresumedHigh => "PRESUMED_HIGH",
            Self::PresumedVeryHigh => "PRESUMED_VERY_HIGH",
            Self::ControlNotFortified => "CONTROL_NOT_FORTIFIED",
        }
    }
}

impl fmt::Display for ConfidenceBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
