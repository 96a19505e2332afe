//! Parameter expressions for parameterized circuits.
//!
//! Test circuits handed to the reward pipeline carry symbolic angles that are
//! only resolved when a probe is executed against a row of a parameter batch.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::f64::consts::PI;
use std::fmt;

use crate::error::{IrError, IrResult};

/// A symbolic or concrete parameter expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterExpression {
    /// A constant numeric value.
    Constant(f64),
    /// A symbolic parameter.
    Symbol(String),
    /// The constant π.
    Pi,
    /// Negation.
    Neg(Box<ParameterExpression>),
    /// Addition.
    Add(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Subtraction.
    Sub(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Multiplication.
    Mul(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Division.
    Div(Box<ParameterExpression>, Box<ParameterExpression>),
}

impl ParameterExpression {
    /// Create a constant parameter.
    pub fn constant(value: f64) -> Self {
        ParameterExpression::Constant(value)
    }

    /// Create a symbolic parameter.
    pub fn symbol(name: impl Into<String>) -> Self {
        ParameterExpression::Symbol(name.into())
    }

    /// Create a π constant.
    pub fn pi() -> Self {
        ParameterExpression::Pi
    }

    /// Check if this expression contains any symbols.
    pub fn is_symbolic(&self) -> bool {
        match self {
            ParameterExpression::Symbol(_) => true,
            ParameterExpression::Constant(_) | ParameterExpression::Pi => false,
            ParameterExpression::Neg(e) => e.is_symbolic(),
            ParameterExpression::Add(a, b)
            | ParameterExpression::Sub(a, b)
            | ParameterExpression::Mul(a, b)
            | ParameterExpression::Div(a, b) => a.is_symbolic() || b.is_symbolic(),
        }
    }

    /// Try to evaluate as a concrete f64 value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterExpression::Constant(v) => Some(*v),
            ParameterExpression::Symbol(_) => None,
            ParameterExpression::Pi => Some(PI),
            ParameterExpression::Neg(e) => e.as_f64().map(|v| -v),
            ParameterExpression::Add(a, b) => Some(a.as_f64()? + b.as_f64()?),
            ParameterExpression::Sub(a, b) => Some(a.as_f64()? - b.as_f64()?),
            ParameterExpression::Mul(a, b) => Some(a.as_f64()? * b.as_f64()?),
            ParameterExpression::Div(a, b) => {
                let divisor = b.as_f64()?;
                if divisor == 0.0 {
                    return None;
                }
                Some(a.as_f64()? / divisor)
            }
        }
    }

    /// Evaluate to a number, naming the first unbound symbol on failure.
    pub fn value(&self) -> IrResult<f64> {
        self.as_f64().ok_or_else(|| {
            let name = self
                .symbols()
                .into_iter()
                .next()
                .unwrap_or_else(|| self.to_string());
            IrError::UnboundParameter(name)
        })
    }

    /// Get all symbol names in this expression, sorted.
    pub fn symbols(&self) -> BTreeSet<String> {
        let mut set = BTreeSet::new();
        self.collect_symbols(&mut set);
        set
    }

    pub(crate) fn collect_symbols(&self, set: &mut BTreeSet<String>) {
        match self {
            ParameterExpression::Constant(_) | ParameterExpression::Pi => {}
            ParameterExpression::Symbol(name) => {
                set.insert(name.clone());
            }
            ParameterExpression::Neg(e) => e.collect_symbols(set),
            ParameterExpression::Add(a, b)
            | ParameterExpression::Sub(a, b)
            | ParameterExpression::Mul(a, b)
            | ParameterExpression::Div(a, b) => {
                a.collect_symbols(set);
                b.collect_symbols(set);
            }
        }
    }

    /// Bind a symbol to a value, returning a new expression.
    pub fn bind(&self, name: &str, value: f64) -> Self {
        self.map_symbols(&|n| (n == name).then_some(value))
    }

    /// Bind every symbol found in `bindings`; unknown symbols stay symbolic.
    ///
    /// The result is simplified, so a fully bound expression is a constant.
    pub fn bind_all(&self, bindings: &FxHashMap<String, f64>) -> Self {
        if !self.is_symbolic() {
            return self.clone();
        }
        self.map_symbols(&|n| bindings.get(n).copied()).simplify()
    }

    fn map_symbols(&self, lookup: &dyn Fn(&str) -> Option<f64>) -> Self {
        let rebuild = |e: &ParameterExpression| Box::new(e.map_symbols(lookup));
        match self {
            ParameterExpression::Symbol(n) => match lookup(n) {
                Some(v) => ParameterExpression::Constant(v),
                None => self.clone(),
            },
            ParameterExpression::Constant(_) | ParameterExpression::Pi => self.clone(),
            ParameterExpression::Neg(e) => ParameterExpression::Neg(rebuild(e)),
            ParameterExpression::Add(a, b) => ParameterExpression::Add(rebuild(a), rebuild(b)),
            ParameterExpression::Sub(a, b) => ParameterExpression::Sub(rebuild(a), rebuild(b)),
            ParameterExpression::Mul(a, b) => ParameterExpression::Mul(rebuild(a), rebuild(b)),
            ParameterExpression::Div(a, b) => ParameterExpression::Div(rebuild(a), rebuild(b)),
        }
    }

    /// Negated expression, folded to a constant when possible.
    pub fn negated(&self) -> Self {
        match self.as_f64() {
            Some(v) => ParameterExpression::Constant(-v),
            None => -self.clone(),
        }
    }

    /// Simplify the expression by evaluating constant subexpressions.
    pub fn simplify(&self) -> Self {
        if let Some(v) = self.as_f64() {
            return ParameterExpression::Constant(v);
        }
        let fold = |a: &ParameterExpression,
                    b: &ParameterExpression,
                    op: fn(f64, f64) -> Option<f64>,
                    make: fn(Box<Self>, Box<Self>) -> Self| {
            let a = a.simplify();
            let b = b.simplify();
            match (a.as_f64(), b.as_f64()) {
                (Some(av), Some(bv)) => match op(av, bv) {
                    Some(v) => ParameterExpression::Constant(v),
                    None => make(Box::new(a), Box::new(b)),
                },
                _ => make(Box::new(a), Box::new(b)),
            }
        };
        match self {
            ParameterExpression::Neg(e) => {
                let e = e.simplify();
                match e.as_f64() {
                    Some(v) => ParameterExpression::Constant(-v),
                    None => ParameterExpression::Neg(Box::new(e)),
                }
            }
            ParameterExpression::Add(a, b) => fold(a, b, |x, y| Some(x + y), ParameterExpression::Add),
            ParameterExpression::Sub(a, b) => fold(a, b, |x, y| Some(x - y), ParameterExpression::Sub),
            ParameterExpression::Mul(a, b) => fold(a, b, |x, y| Some(x * y), ParameterExpression::Mul),
            ParameterExpression::Div(a, b) => fold(
                a,
                b,
                |x, y| (y != 0.0).then(|| x / y),
                ParameterExpression::Div,
            ),
            _ => self.clone(),
        }
    }
}

impl fmt::Display for ParameterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterExpression::Constant(v) => write!(f, "{v}"),
            ParameterExpression::Symbol(name) => write!(f, "{name}"),
            ParameterExpression::Pi => write!(f, "π"),
            ParameterExpression::Neg(e) => write!(f, "-({e})"),
            ParameterExpression::Add(a, b) => write!(f, "({a} + {b})"),
            ParameterExpression::Sub(a, b) => write!(f, "({a} - {b})"),
            ParameterExpression::Mul(a, b) => write!(f, "({a} * {b})"),
            ParameterExpression::Div(a, b) => write!(f, "({a} / {b})"),
        }
    }
}

impl From<f64> for ParameterExpression {
    fn from(value: f64) -> Self {
        ParameterExpression::Constant(value)
    }
}

impl From<i32> for ParameterExpression {
    fn from(value: i32) -> Self {
        ParameterExpression::Constant(f64::from(value))
    }
}

impl std::ops::Add for ParameterExpression {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        ParameterExpression::Add(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Sub for ParameterExpression {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        ParameterExpression::Sub(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Mul for ParameterExpression {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        ParameterExpression::Mul(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Div for ParameterExpression {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        ParameterExpression::Div(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Neg for ParameterExpression {
    type Output = Self;

    fn neg(self) -> Self::Output {
        ParameterExpression::Neg(Box::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol() {
        let p = ParameterExpression::symbol("theta");
        assert!(p.is_symbolic());
        assert_eq!(p.as_f64(), None);
        assert!(p.symbols().contains("theta"));
        assert!(matches!(p.value(), Err(IrError::UnboundParameter(name)) if name == "theta"));
    }

    #[test]
    fn test_bind_all_partial() {
        let expr = ParameterExpression::symbol("a") * ParameterExpression::constant(2.0)
            + ParameterExpression::symbol("b");
        let mut bindings = FxHashMap::default();
        bindings.insert("a".to_string(), 1.5);

        let partial = expr.bind_all(&bindings);
        assert!(partial.is_symbolic());
        assert_eq!(partial.symbols().into_iter().collect::<Vec<_>>(), vec!["b"]);

        bindings.insert("b".to_string(), 0.5);
        let full = expr.bind_all(&bindings);
        assert_eq!(full, ParameterExpression::Constant(3.5));
    }

    #[test]
    fn test_negated() {
        assert_eq!(
            ParameterExpression::pi().negated(),
            ParameterExpression::Constant(-PI)
        );
        let sym = ParameterExpression::symbol("x").negated();
        let bound = sym.bind("x", 0.25);
        assert!((bound.value().unwrap() + 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_simplify_keeps_division_by_zero_symbolic() {
        let expr = ParameterExpression::constant(1.0) / ParameterExpression::constant(0.0);
        assert!(matches!(expr.simplify(), ParameterExpression::Div(_, _)));
    }
}
