// ============================================================
// Layer 3 - Parameter / Gradient Summaries
// ============================================================
// "Watching" a model means periodically recording what its
// weights and gradients look like. Storing every value of every
// tensor would be huge, so each tensor is reduced to a handful
// of statistics instead.
//
// The statistics are computed from a plain f32 slice, so this
// module stays free of Burn types. The ML layer pulls the values
// out of the tensors and hands them over.

use serde::{Deserialize, Serialize};

/// Whether a summary describes a weight tensor or its gradient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Parameter,
    Gradient,
}

/// Descriptive statistics of one named tensor at one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSummary {
    /// Dotted parameter path, e.g. "hidden.weight"
    pub name:  String,
    pub kind:  ParamKind,
    pub shape: Vec<usize>,
    pub mean:  f64,
    pub std:   f64,
    pub min:   f64,
    pub max:   f64,
    /// L2 norm of the flattened tensor
    pub norm:  f64,
}

impl ParamSummary {
    /// Reduce `values` to summary statistics.
    ///
    /// An empty slice gives all-zero statistics rather than NaN so
    /// the JSON output stays valid.
    pub fn from_values(
        name:   impl Into<String>,
        kind:   ParamKind,
        shape:  Vec<usize>,
        values: &[f32],
    ) -> Self {
        let name = name.into();
        if values.is_empty() {
            return Self { name, kind, shape, mean: 0.0, std: 0.0, min: 0.0, max: 0.0, norm: 0.0 };
        }

        let n = values.len() as f64;
        let mut sum    = 0.0f64;
        let mut sum_sq = 0.0f64;
        let mut min    = f64::INFINITY;
        let mut max    = f64::NEG_INFINITY;
        for &v in values {
            let v = v as f64;
            sum    += v;
            sum_sq += v * v;
            min = min.min(v);
            max = max.max(v);
        }

        let mean = sum / n;
        // Population variance; clamp tiny negatives from rounding
        let var  = (sum_sq / n - mean * mean).max(0.0);

        Self {
            name,
            kind,
            shape,
            mean,
            std: var.sqrt(),
            min,
            max,
            norm: sum_sq.sqrt(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_statistics() {
        let s = ParamSummary::from_values(
            "output.bias", ParamKind::Parameter, vec![4], &[1.0, -1.0, 3.0, -3.0],
        );
        assert_eq!(s.mean, 0.0);
        assert_eq!(s.min,  -3.0);
        assert_eq!(s.max,  3.0);
        // sqrt(1 + 1 + 9 + 9)
        assert!((s.norm - 20f64.sqrt()).abs() < 1e-9);
        assert!((s.std  - 5f64.sqrt()).abs()  < 1e-9);
    }

    #[test]
    fn test_empty_values_are_zeroed() {
        let s = ParamSummary::from_values("x", ParamKind::Gradient, vec![0], &[]);
        assert_eq!(s.mean, 0.0);
        assert_eq!(s.norm, 0.0);
        assert_eq!(s.kind, ParamKind::Gradient);
    }

    #[test]
    fn test_kind_serialises_lowercase() {
        let json = serde_json::to_string(&ParamKind::Gradient).unwrap();
        assert_eq!(json, "\"gradient\"");
    }
}
