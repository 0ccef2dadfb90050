//! Band-math expressions
//!
//! Index formulas are assembled locally as a small arithmetic AST and shipped
//! to the raster service in their textual form, e.g.
//! `((B8 * 0.0001) - (B4 * 0.0001)) / ((B8 * 0.0001) + (B4 * 0.0001))`.
//! [`evaluate_grid`] evaluates an expression over in-memory band grids.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops;

use ndarray::{Array2, Zip};
use verdex_core::{Error, Result};

/// Denominators smaller than this produce NaN instead of a huge ratio.
const DIV_EPSILON: f64 = 1e-10;

/// Binary arithmetic operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    pub fn symbol(&self) -> char {
        match self {
            Self::Add => '+',
            Self::Sub => '-',
            Self::Mul => '*',
            Self::Div => '/',
        }
    }

    fn apply(&self, l: f64, r: f64) -> f64 {
        match self {
            Self::Add => l + r,
            Self::Sub => l - r,
            Self::Mul => l * r,
            Self::Div => {
                if r.abs() < DIV_EPSILON {
                    f64::NAN
                } else {
                    l / r
                }
            }
        }
    }
}

/// A node in the expression AST
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Band(String),
    BinOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Neg(Box<Expr>),
}

impl Expr {
    pub fn num(value: f64) -> Self {
        Expr::Num(value)
    }

    pub fn band(name: impl Into<String>) -> Self {
        Expr::Band(name.into())
    }

    fn binop(op: BinOp, left: Expr, right: Expr) -> Self {
        Expr::BinOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Distinct band names referenced by the expression.
    pub fn bands(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        self.collect_bands(&mut names);
        names
    }

    fn collect_bands<'a>(&'a self, names: &mut BTreeSet<&'a str>) {
        match self {
            Expr::Band(name) => {
                names.insert(name.as_str());
            }
            Expr::BinOp { left, right, .. } => {
                left.collect_bands(names);
                right.collect_bands(names);
            }
            Expr::Neg(inner) => inner.collect_bands(names),
            Expr::Num(_) => {}
        }
    }

    /// Evaluate with band values supplied by `lookup`.
    ///
    /// Unknown bands evaluate to NaN.
    pub fn eval<F>(&self, lookup: &F) -> f64
    where
        F: Fn(&str) -> Option<f64>,
    {
        match self {
            Expr::Num(n) => *n,
            Expr::Band(name) => lookup(name).unwrap_or(f64::NAN),
            Expr::BinOp { op, left, right } => op.apply(left.eval(lookup), right.eval(lookup)),
            Expr::Neg(inner) => -inner.eval(lookup),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Num(n) if *n < 0.0 => write!(f, "(-{})", -n),
            Expr::Num(n) => write!(f, "{n}"),
            Expr::Band(name) => f.write_str(name),
            Expr::BinOp { op, left, right } => write!(f, "({left} {} {right})", op.symbol()),
            Expr::Neg(inner) => write!(f, "(-{inner})"),
        }
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::Num(value)
    }
}

macro_rules! impl_expr_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<R: Into<Expr>> ops::$trait<R> for Expr {
            type Output = Expr;
            fn $method(self, rhs: R) -> Expr {
                Expr::binop($op, self, rhs.into())
            }
        }
    };
}

impl_expr_op!(Add, add, BinOp::Add);
impl_expr_op!(Sub, sub, BinOp::Sub);
impl_expr_op!(Mul, mul, BinOp::Mul);
impl_expr_op!(Div, div, BinOp::Div);

impl ops::Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::Neg(Box::new(self))
    }
}

// ---------------------------------------------------------------------------
// Grid evaluation
// ---------------------------------------------------------------------------

/// Evaluate `expr` pixel by pixel over same-shaped band grids.
///
/// Pixels where any referenced band is NaN stay NaN.
pub fn evaluate_grid(expr: &Expr, bands: &BTreeMap<String, Array2<f64>>) -> Result<Array2<f64>> {
    let referenced: Vec<&str> = expr.bands().into_iter().collect();
    let mut grids = Vec::with_capacity(referenced.len());
    for name in &referenced {
        let grid = bands.get(*name).ok_or_else(|| {
            Error::Other(format!(
                "band '{}' not found, available: {:?}",
                name,
                bands.keys().collect::<Vec<_>>()
            ))
        })?;
        grids.push(grid);
    }

    let shape = match grids.first() {
        Some(g) => g.dim(),
        // Constant expression: take the shape of any band in the image.
        None => bands
            .values()
            .next()
            .map(|g| g.dim())
            .ok_or_else(|| Error::Other("image has no bands".into()))?,
    };
    for (name, grid) in referenced.iter().zip(&grids) {
        if grid.dim() != shape {
            return Err(Error::Other(format!(
                "band '{}' has shape {:?}, expected {:?}",
                name,
                grid.dim(),
                shape
            )));
        }
    }

    let mut output = Array2::from_elem(shape, f64::NAN);
    Zip::indexed(&mut output).for_each(|(row, col), out| {
        let mut values = Vec::with_capacity(grids.len());
        for grid in &grids {
            let v = grid[(row, col)];
            if v.is_nan() {
                return;
            }
            values.push(v);
        }
        *out = expr.eval(&|name: &str| {
            referenced
                .iter()
                .position(|r| *r == name)
                .map(|i| values[i])
        });
    });

    Ok(output)
}
