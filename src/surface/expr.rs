//! Expression trees for surface formulas `z = f(x, y)`
//!
//! Trees are built through the smart constructors on [`Expr`] (`add`, `mul`,
//! `pow`, ...), which fold constants and drop identity terms as they go.
//! Symbolic derivatives are assembled from the same constructors, so they
//! come out already simplified

use std::f64::consts::{E, PI};
use std::fmt;

/// Independent variable of the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Var {
    X,
    Y,
}

/// Unary functions accepted in formulas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Asinh,
    Acosh,
    Atanh,
    Sqrt,
    Exp,
    Ln,
    Abs,
    Sign,
    Ceil,
    Floor,
}

impl Func {
    /// Look up a function by the name used in formulas
    pub fn from_name(name: &str) -> Option<Func> {
        let func = match name {
            "sin" => Func::Sin,
            "cos" => Func::Cos,
            "tan" => Func::Tan,
            "asin" => Func::Asin,
            "acos" => Func::Acos,
            "atan" => Func::Atan,
            "sinh" => Func::Sinh,
            "cosh" => Func::Cosh,
            "tanh" => Func::Tanh,
            "asinh" => Func::Asinh,
            "acosh" => Func::Acosh,
            "atanh" => Func::Atanh,
            "sqrt" => Func::Sqrt,
            "exp" => Func::Exp,
            "ln" | "log" => Func::Ln,
            "abs" => Func::Abs,
            "sign" => Func::Sign,
            "ceil" => Func::Ceil,
            "floor" => Func::Floor,
            _ => return None,
        };
        Some(func)
    }

    pub fn name(self) -> &'static str {
        match self {
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Tan => "tan",
            Func::Asin => "asin",
            Func::Acos => "acos",
            Func::Atan => "atan",
            Func::Sinh => "sinh",
            Func::Cosh => "cosh",
            Func::Tanh => "tanh",
            Func::Asinh => "asinh",
            Func::Acosh => "acosh",
            Func::Atanh => "atanh",
            Func::Sqrt => "sqrt",
            Func::Exp => "exp",
            Func::Ln => "ln",
            Func::Abs => "abs",
            Func::Sign => "sign",
            Func::Ceil => "ceil",
            Func::Floor => "floor",
        }
    }

    pub fn apply(self, v: f64) -> f64 {
        match self {
            Func::Sin => v.sin(),
            Func::Cos => v.cos(),
            Func::Tan => v.tan(),
            Func::Asin => v.asin(),
            Func::Acos => v.acos(),
            Func::Atan => v.atan(),
            Func::Sinh => v.sinh(),
            Func::Cosh => v.cosh(),
            Func::Tanh => v.tanh(),
            Func::Asinh => v.asinh(),
            Func::Acosh => v.acosh(),
            Func::Atanh => v.atanh(),
            Func::Sqrt => v.sqrt(),
            Func::Exp => v.exp(),
            Func::Ln => v.ln(),
            Func::Abs => v.abs(),
            // f64::signum maps 0 to 1, the derivative of |u| needs 0 there
            Func::Sign => {
                if v == 0.0 {
                    0.0
                } else {
                    v.signum()
                }
            }
            Func::Ceil => v.ceil(),
            Func::Floor => v.floor(),
        }
    }
}

/// Node of a formula tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Const(f64),
    Var(Var),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Call(Func, Box<Expr>),
}

impl Expr {
    pub fn x() -> Expr {
        Expr::Var(Var::X)
    }

    pub fn y() -> Expr {
        Expr::Var(Var::Y)
    }

    pub fn constant(c: f64) -> Expr {
        Expr::Const(c)
    }

    fn as_const(&self) -> Option<f64> {
        match self {
            Expr::Const(c) => Some(*c),
            _ => None,
        }
    }

    fn is_value(&self, v: f64) -> bool {
        self.as_const() == Some(v)
    }

    pub fn is_zero(&self) -> bool {
        self.is_value(0.0)
    }

    /// True when the tree does not reference `x` or `y`
    pub fn is_constant(&self) -> bool {
        match self {
            Expr::Const(_) => true,
            Expr::Var(_) => false,
            Expr::Neg(a) | Expr::Call(_, a) => a.is_constant(),
            Expr::Add(a, b)
            | Expr::Sub(a, b)
            | Expr::Mul(a, b)
            | Expr::Div(a, b)
            | Expr::Pow(a, b) => a.is_constant() && b.is_constant(),
        }
    }

    /// Number of nodes in the tree
    pub fn size(&self) -> usize {
        match self {
            Expr::Const(_) | Expr::Var(_) => 1,
            Expr::Neg(a) | Expr::Call(_, a) => 1 + a.size(),
            Expr::Add(a, b)
            | Expr::Sub(a, b)
            | Expr::Mul(a, b)
            | Expr::Div(a, b)
            | Expr::Pow(a, b) => 1 + a.size() + b.size(),
        }
    }

    /// Longest root-to-leaf path, walked with an explicit stack
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1usize)];

        while let Some((node, d)) = stack.pop() {
            deepest = deepest.max(d);
            match node {
                Expr::Const(_) | Expr::Var(_) => {}
                Expr::Neg(a) | Expr::Call(_, a) => stack.push((a.as_ref(), d + 1)),
                Expr::Add(a, b)
                | Expr::Sub(a, b)
                | Expr::Mul(a, b)
                | Expr::Div(a, b)
                | Expr::Pow(a, b) => {
                    stack.push((a.as_ref(), d + 1));
                    stack.push((b.as_ref(), d + 1));
                }
            }
        }
        deepest
    }

    /// Evaluate at a single point
    pub fn eval(&self, x: f64, y: f64) -> f64 {
        match self {
            Expr::Const(c) => *c,
            Expr::Var(Var::X) => x,
            Expr::Var(Var::Y) => y,
            Expr::Neg(a) => -a.eval(x, y),
            Expr::Add(a, b) => a.eval(x, y) + b.eval(x, y),
            Expr::Sub(a, b) => a.eval(x, y) - b.eval(x, y),
            Expr::Mul(a, b) => a.eval(x, y) * b.eval(x, y),
            Expr::Div(a, b) => a.eval(x, y) / b.eval(x, y),
            Expr::Pow(a, b) => a.eval(x, y).powf(b.eval(x, y)),
            Expr::Call(func, a) => func.apply(a.eval(x, y)),
        }
    }

    // ---------------------------------------------------------------------
    // simplifying constructors
    // ---------------------------------------------------------------------

    pub fn neg(a: Expr) -> Expr {
        match a {
            Expr::Const(c) => Expr::Const(-c),
            Expr::Neg(inner) => *inner,
            other => Expr::Neg(Box::new(other)),
        }
    }

    pub fn add(a: Expr, b: Expr) -> Expr {
        match (a.as_const(), b.as_const()) {
            (Some(ca), Some(cb)) => Expr::Const(ca + cb),
            (Some(ca), _) if ca == 0.0 => b,
            (_, Some(cb)) if cb == 0.0 => a,
            _ => match b {
                Expr::Neg(inner) => Expr::Sub(Box::new(a), inner),
                b => Expr::Add(Box::new(a), Box::new(b)),
            },
        }
    }

    pub fn sub(a: Expr, b: Expr) -> Expr {
        match (a.as_const(), b.as_const()) {
            (Some(ca), Some(cb)) => Expr::Const(ca - cb),
            (Some(ca), _) if ca == 0.0 => Expr::neg(b),
            (_, Some(cb)) if cb == 0.0 => a,
            // `x - (-2)` is `x + 2`
            (_, Some(cb)) if cb < 0.0 => Expr::Add(Box::new(a), Box::new(Expr::Const(-cb))),
            _ if a == b => Expr::Const(0.0),
            _ => match b {
                Expr::Neg(inner) => Expr::Add(Box::new(a), inner),
                b => Expr::Sub(Box::new(a), Box::new(b)),
            },
        }
    }

    pub fn mul(a: Expr, b: Expr) -> Expr {
        match (a.as_const(), b.as_const()) {
            (Some(ca), Some(cb)) => Expr::Const(ca * cb),
            (Some(c), _) | (_, Some(c)) if c == 0.0 => Expr::Const(0.0),
            (Some(ca), _) if ca == 1.0 => b,
            (_, Some(cb)) if cb == 1.0 => a,
            (Some(ca), _) if ca == -1.0 => Expr::neg(b),
            (_, Some(cb)) if cb == -1.0 => Expr::neg(a),
            // keep constant factors on the left: `2*x` rather than `x*2`
            (None, Some(_)) => Expr::Mul(Box::new(b), Box::new(a)),
            _ => Expr::Mul(Box::new(a), Box::new(b)),
        }
    }

    pub fn div(a: Expr, b: Expr) -> Expr {
        match (a.as_const(), b.as_const()) {
            (Some(ca), Some(cb)) if cb != 0.0 => Expr::Const(ca / cb),
            (Some(ca), _) if ca == 0.0 => Expr::Const(0.0),
            (_, Some(cb)) if cb == 1.0 => a,
            _ => Expr::Div(Box::new(a), Box::new(b)),
        }
    }

    pub fn pow(base: Expr, exponent: Expr) -> Expr {
        match (base.as_const(), exponent.as_const()) {
            (Some(cb), Some(ce)) if cb.powf(ce).is_finite() => Expr::Const(cb.powf(ce)),
            (_, Some(ce)) if ce == 0.0 => Expr::Const(1.0),
            (_, Some(ce)) if ce == 1.0 => base,
            (Some(cb), _) if cb == 1.0 => Expr::Const(1.0),
            _ => Expr::Pow(Box::new(base), Box::new(exponent)),
        }
    }

    pub fn call(func: Func, a: Expr) -> Expr {
        if let Some(c) = a.as_const() {
            let folded = func.apply(c);
            // `sqrt(-1)` and friends stay symbolic
            if folded.is_finite() {
                return Expr::Const(folded);
            }
        }
        Expr::Call(func, Box::new(a))
    }

    // ---------------------------------------------------------------------
    // pretty printing
    // ---------------------------------------------------------------------

    fn precedence(&self) -> u8 {
        match self {
            Expr::Add(..) | Expr::Sub(..) => 1,
            Expr::Mul(..) | Expr::Div(..) => 2,
            Expr::Neg(_) => 3,
            Expr::Const(c) if *c < 0.0 => 3,
            Expr::Pow(..) => 4,
            Expr::Const(_) | Expr::Var(_) | Expr::Call(..) => 5,
        }
    }

    fn fmt_prec(&self, f: &mut fmt::Formatter<'_>, parent: u8) -> fmt::Result {
        let own = self.precedence();
        if own < parent {
            write!(f, "(")?;
        }
        match self {
            Expr::Const(c) => write_number(f, *c)?,
            Expr::Var(Var::X) => write!(f, "x")?,
            Expr::Var(Var::Y) => write!(f, "y")?,
            Expr::Neg(a) => {
                write!(f, "-")?;
                a.fmt_prec(f, 3)?;
            }
            Expr::Add(a, b) => {
                a.fmt_prec(f, 1)?;
                match b.as_const() {
                    Some(c) if c < 0.0 => {
                        write!(f, " - ")?;
                        write_number(f, -c)?;
                    }
                    _ => {
                        write!(f, " + ")?;
                        b.fmt_prec(f, 1)?;
                    }
                }
            }
            Expr::Sub(a, b) => {
                a.fmt_prec(f, 1)?;
                write!(f, " - ")?;
                b.fmt_prec(f, 2)?;
            }
            Expr::Mul(a, b) => {
                a.fmt_prec(f, 2)?;
                write!(f, "*")?;
                b.fmt_prec(f, 4)?;
            }
            Expr::Div(a, b) => {
                a.fmt_prec(f, 2)?;
                write!(f, "/")?;
                b.fmt_prec(f, 4)?;
            }
            Expr::Pow(a, b) => {
                a.fmt_prec(f, 5)?;
                write!(f, "^")?;
                b.fmt_prec(f, 4)?;
            }
            Expr::Call(func, a) => {
                write!(f, "{}(", func.name())?;
                a.fmt_prec(f, 0)?;
                write!(f, ")")?;
            }
        }
        if own < parent {
            write!(f, ")")?;
        }
        Ok(())
    }
}

fn write_number(f: &mut fmt::Formatter<'_>, c: f64) -> fmt::Result {
    if c == PI {
        write!(f, "pi")
    } else if c == E {
        write!(f, "e")
    } else if c.fract() == 0.0 && c.abs() < 1e15 {
        write!(f, "{}", c as i64)
    } else {
        write!(f, "{}", c)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_prec(f, 0)
    }
}
