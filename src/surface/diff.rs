//! Symbolic partial derivatives of [`Expr`] trees

use crate::surface::expr::{Expr, Func, Var};

/// ∂expr/∂var, simplified by the constructors on [`Expr`]
pub fn derivative(expr: &Expr, var: Var) -> Expr {
    match expr {
        Expr::Const(_) => Expr::constant(0.0),
        Expr::Var(v) => Expr::constant(if *v == var { 1.0 } else { 0.0 }),
        Expr::Neg(a) => Expr::neg(derivative(a, var)),
        Expr::Add(a, b) => Expr::add(derivative(a, var), derivative(b, var)),
        Expr::Sub(a, b) => Expr::sub(derivative(a, var), derivative(b, var)),

        // (ab)' = a'b + ab'
        Expr::Mul(a, b) => Expr::add(
            Expr::mul(derivative(a, var), (**b).clone()),
            Expr::mul((**a).clone(), derivative(b, var)),
        ),

        // (a/b)' = (a'b - ab') / b^2
        Expr::Div(a, b) => {
            let da = derivative(a, var);
            let db = derivative(b, var);
            if db.is_zero() {
                return Expr::div(da, (**b).clone());
            }
            Expr::div(
                Expr::sub(Expr::mul(da, (**b).clone()), Expr::mul((**a).clone(), db)),
                Expr::pow((**b).clone(), Expr::constant(2.0)),
            )
        }

        Expr::Pow(base, exponent) => power_rule(base, exponent, var),

        // chain rule: f(u)' = f'(u) u'
        Expr::Call(func, a) => {
            let da = derivative(a, var);
            if da.is_zero() {
                return Expr::constant(0.0);
            }
            Expr::mul(outer_derivative(*func, a), da)
        }
    }
}

fn power_rule(base: &Expr, exponent: &Expr, var: Var) -> Expr {
    let db = derivative(base, var);
    let de = derivative(exponent, var);

    if de.is_zero() {
        // u^c -> c u^(c-1) u'
        let lowered = Expr::pow(base.clone(), Expr::sub(exponent.clone(), Expr::constant(1.0)));
        return Expr::mul(Expr::mul(exponent.clone(), lowered), db);
    }

    let whole = Expr::pow(base.clone(), exponent.clone());
    let ln_base = Expr::call(Func::Ln, base.clone());

    if db.is_zero() {
        // c^v -> c^v ln(c) v'
        return Expr::mul(Expr::mul(whole, ln_base), de);
    }

    // u^v -> u^v (v' ln u + v u'/u)
    Expr::mul(
        whole,
        Expr::add(
            Expr::mul(de, ln_base),
            Expr::div(Expr::mul(exponent.clone(), db), base.clone()),
        ),
    )
}

/// f'(u) for the unary vocabulary; the caller multiplies by u'
fn outer_derivative(func: Func, u: &Expr) -> Expr {
    let u = u.clone();
    let one = || Expr::constant(1.0);
    let square = |e: Expr| Expr::pow(e, Expr::constant(2.0));

    match func {
        Func::Sin => Expr::call(Func::Cos, u),
        Func::Cos => Expr::neg(Expr::call(Func::Sin, u)),
        Func::Tan => Expr::div(one(), square(Expr::call(Func::Cos, u))),
        Func::Asin => Expr::div(one(), Expr::call(Func::Sqrt, Expr::sub(one(), square(u)))),
        Func::Acos => Expr::neg(Expr::div(
            one(),
            Expr::call(Func::Sqrt, Expr::sub(one(), square(u))),
        )),
        Func::Atan => Expr::div(one(), Expr::add(one(), square(u))),
        Func::Sinh => Expr::call(Func::Cosh, u),
        Func::Cosh => Expr::call(Func::Sinh, u),
        Func::Tanh => Expr::sub(one(), square(Expr::call(Func::Tanh, u))),
        Func::Asinh => Expr::div(one(), Expr::call(Func::Sqrt, Expr::add(square(u), one()))),
        Func::Acosh => Expr::div(one(), Expr::call(Func::Sqrt, Expr::sub(square(u), one()))),
        Func::Atanh => Expr::div(one(), Expr::sub(one(), square(u))),
        Func::Sqrt => Expr::div(one(), Expr::mul(Expr::constant(2.0), Expr::call(Func::Sqrt, u))),
        Func::Exp => Expr::call(Func::Exp, u),
        Func::Ln => Expr::div(one(), u),
        Func::Abs => Expr::call(Func::Sign, u),
        // piecewise constant, zero almost everywhere
        Func::Sign | Func::Ceil | Func::Floor => Expr::constant(0.0),
    }
}
