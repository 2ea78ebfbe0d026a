//! Numeric ranges over a fixed numeric kind.
//!
//! A range is `[min, max]` where either bound may be absent (unbounded).
//! Ranges of different kinds never relate; float ranges reject NaN at
//! construction so bound comparisons are total.

use serde::{Deserialize, Serialize};

use crate::error::{KbResult, ModelError};

/// The numeric kind a range is defined over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumberKind {
    Integer,
    Float,
}

/// A single numeric value of either kind.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    pub fn kind(&self) -> NumberKind {
        match self {
            Num::Int(_) => NumberKind::Integer,
            Num::Float(_) => NumberKind::Float,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Num::Int(v) => *v as f64,
            Num::Float(v) => *v,
        }
    }
}

impl std::fmt::Display for Num {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Num::Int(v) => write!(f, "{v}"),
            Num::Float(v) => write!(f, "{v}"),
        }
    }
}

/// An inclusive numeric range with optional bounds.
///
/// An absent bound means unbounded on that side. A range with `min == max`
/// is "exact" and stands for a single definite value; anything wider is an
/// indefinite range-as-value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumberRange {
    kind: NumberKind,
    min: Option<Num>,
    max: Option<Num>,
}

impl NumberRange {
    /// Build a range, validating kind agreement, NaN bounds, and ordering.
    pub fn new(kind: NumberKind, min: Option<Num>, max: Option<Num>) -> KbResult<Self> {
        for bound in [min, max].into_iter().flatten() {
            if bound.kind() != kind {
                return Err(ModelError::InvalidNumberRange {
                    detail: format!("bound {bound} does not match kind {kind:?}"),
                }
                .into());
            }
            if let Num::Float(v) = bound {
                if v.is_nan() {
                    return Err(ModelError::InvalidNumberRange {
                        detail: "NaN is not a valid bound".into(),
                    }
                    .into());
                }
            }
        }
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo.as_f64() > hi.as_f64() {
                return Err(ModelError::InvalidNumberRange {
                    detail: format!("min {lo} exceeds max {hi}"),
                }
                .into());
            }
        }
        Ok(Self { kind, min, max })
    }

    /// A range holding exactly one integer.
    pub fn exact_int(value: i64) -> Self {
        Self {
            kind: NumberKind::Integer,
            min: Some(Num::Int(value)),
            max: Some(Num::Int(value)),
        }
    }

    /// A range holding exactly one float. Errors on NaN.
    pub fn exact_float(value: f64) -> KbResult<Self> {
        Self::new(
            NumberKind::Float,
            Some(Num::Float(value)),
            Some(Num::Float(value)),
        )
    }

    /// An integer range; `None` bounds are unbounded.
    pub fn int_range(min: Option<i64>, max: Option<i64>) -> KbResult<Self> {
        Self::new(NumberKind::Integer, min.map(Num::Int), max.map(Num::Int))
    }

    /// A float range; `None` bounds are unbounded.
    pub fn float_range(min: Option<f64>, max: Option<f64>) -> KbResult<Self> {
        Self::new(NumberKind::Float, min.map(Num::Float), max.map(Num::Float))
    }

    pub fn kind(&self) -> NumberKind {
        self.kind
    }

    pub fn min(&self) -> Option<Num> {
        self.min
    }

    pub fn max(&self) -> Option<Num> {
        self.max
    }

    /// Whether this range stands for a single definite value.
    pub fn is_exact(&self) -> bool {
        matches!((self.min, self.max), (Some(lo), Some(hi)) if lo.as_f64() == hi.as_f64())
    }

    /// The single value of an exact range, erroring on indefinite ranges.
    pub fn definite(&self, context: &str) -> KbResult<Num> {
        match (self.min, self.max) {
            (Some(lo), Some(hi)) if lo.as_f64() == hi.as_f64() => Ok(lo),
            _ => Err(ModelError::IndefiniteBound {
                context: context.into(),
            }
            .into()),
        }
    }

    /// Whether a single value falls inside this range.
    pub fn contains(&self, value: Num) -> bool {
        if value.kind() != self.kind {
            return false;
        }
        let v = value.as_f64();
        self.min.is_none_or(|lo| lo.as_f64() <= v)
            && self.max.is_none_or(|hi| v <= hi.as_f64())
    }

    /// Range containment: same kind, and `other` lies entirely inside.
    pub fn subsumes(&self, other: &NumberRange) -> bool {
        if self.kind != other.kind {
            return false;
        }
        let lower_ok = match (self.min, other.min) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(a), Some(b)) => a.as_f64() <= b.as_f64(),
        };
        let upper_ok = match (self.max, other.max) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(a), Some(b)) => a.as_f64() >= b.as_f64(),
        };
        lower_ok && upper_ok
    }

    /// Range intersection via max-of-mins and min-of-maxes.
    ///
    /// Returns `None` for kind mismatches and empty intersections.
    pub fn intersect(&self, other: &NumberRange) -> Option<NumberRange> {
        if self.kind != other.kind {
            return None;
        }
        let min = match (self.min, other.min) {
            (None, b) => b,
            (a, None) => a,
            (Some(a), Some(b)) => Some(if a.as_f64() >= b.as_f64() { a } else { b }),
        };
        let max = match (self.max, other.max) {
            (None, b) => b,
            (a, None) => a,
            (Some(a), Some(b)) => Some(if a.as_f64() <= b.as_f64() { a } else { b }),
        };
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo.as_f64() > hi.as_f64() {
                return None;
            }
        }
        Some(NumberRange {
            kind: self.kind,
            min,
            max,
        })
    }
}

impl std::fmt::Display for NumberRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lo = self
            .min
            .map_or_else(|| "-inf".to_string(), |n| n.to_string());
        let hi = self
            .max
            .map_or_else(|| "+inf".to_string(), |n| n.to_string());
        write!(f, "[{lo}, {hi}]")
    }
}
