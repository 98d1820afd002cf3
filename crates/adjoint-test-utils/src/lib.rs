//! Test utilities for adjoint development.
//!
//! Numerical reference derivatives ([`central_difference`]), tolerance
//! assertions ([`assert_close`]), a per-input comparison table
//! ([`GradientReport`]) and seeded input [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::fmt;

use indexmap::IndexMap;

pub mod fixtures;

/// Default step for [`central_difference`].
pub const DEFAULT_STEP: f64 = 1e-6;

/// Numerical gradient of `f` at `at` by central differences:
/// `(f(x + h·eᵢ) − f(x − h·eᵢ)) / 2h` for every coordinate `i`.
pub fn central_difference(f: impl Fn(&[f64]) -> f64, at: &[f64], h: f64) -> Vec<f64> {
    let mut probe = at.to_vec();
    (0..at.len())
        .map(|i| {
            probe[i] = at[i] + h;
            let up = f(&probe);
            probe[i] = at[i] - h;
            let down = f(&probe);
            probe[i] = at[i];
            (up - down) / (2.0 * h)
        })
        .collect()
}

/// Whether `actual` is within `tol` of `expected`, relative to the larger
/// magnitude once that exceeds one.
pub fn is_close(actual: f64, expected: f64, tol: f64) -> bool {
    if actual == expected {
        return true;
    }
    let scale = actual.abs().max(expected.abs()).max(1.0);
    (actual - expected).abs() <= tol * scale
}

/// Panic with both values if they are not [`is_close`].
#[track_caller]
pub fn assert_close(actual: f64, expected: f64, tol: f64) {
    assert!(
        is_close(actual, expected, tol),
        "expected {expected}, got {actual} (tol {tol})"
    );
}

/// Element-wise [`assert_close`] over two slices of equal length.
#[track_caller]
pub fn assert_all_close(actual: &[f64], expected: &[f64], tol: f64) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            is_close(*a, *e, tol),
            "element {i}: expected {e}, got {a} (tol {tol})"
        );
    }
}

/// Analytic and numeric derivative for one input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GradientEntry {
    pub analytic: f64,
    pub numeric: f64,
}

impl GradientEntry {
    pub fn abs_error(&self) -> f64 {
        (self.analytic - self.numeric).abs()
    }
}

/// Side-by-side comparison of reverse-mode and numerical gradients, kept in
/// the order inputs were recorded so failure messages read like the
/// function signature.
#[derive(Clone, Debug, Default)]
pub struct GradientReport {
    entries: IndexMap<String, GradientEntry>,
}

impl GradientReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a report from parallel slices, naming inputs `x0`, `x1`, ...
    pub fn from_slices(analytic: &[f64], numeric: &[f64]) -> Self {
        let mut report = Self::new();
        for (i, (a, n)) in analytic.iter().zip(numeric).enumerate() {
            report.record(format!("x{i}"), *a, *n);
        }
        report
    }

    /// Record (or overwrite) one input.
    pub fn record(&mut self, name: impl Into<String>, analytic: f64, numeric: f64) {
        self.entries
            .insert(name.into(), GradientEntry { analytic, numeric });
    }

    pub fn get(&self, name: &str) -> Option<&GradientEntry> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Input with the largest absolute disagreement.
    pub fn worst(&self) -> Option<(&str, &GradientEntry)> {
        self.entries
            .iter()
            .max_by(|a, b| a.1.abs_error().total_cmp(&b.1.abs_error()))
            .map(|(k, v)| (k.as_str(), v))
    }

    /// Panic, printing the whole table, if any input disagrees beyond `tol`.
    #[track_caller]
    pub fn assert_within(&self, tol: f64) {
        let failed = self
            .entries
            .values()
            .any(|e| !is_close(e.analytic, e.numeric, tol));
        assert!(!failed, "gradient check failed (tol {tol}):\n{self}");
    }
}

impl fmt::Display for GradientReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, e) in &self.entries {
            writeln!(
                f,
                "  {name:>8}: analytic {:>14.8e}  numeric {:>14.8e}  |err| {:.3e}",
                e.analytic,
                e.numeric,
                e.abs_error()
            )?;
        }
        Ok(())
    }
}
