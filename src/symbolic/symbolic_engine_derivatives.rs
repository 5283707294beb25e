//! # Symbolic Engine Derivatives Module
//!
//! Analytical differentiation of `Expr` and the numerical checks built on it.
//!
//! ## Key Methods
//!
//! ### Differentiation
//! - `diff(var: &str)` - analytical derivative, raw (not simplified)
//!
//! ### Numerical Analysis
//! - `is_antiderivative_of()` - checks `d/dx self == integrand` on sample points; the
//!   integrator uses it to reject a result that does not differentiate back
//!
//! ## Interesting Code Features
//!
//! 1. **Recursive Differentiation Rules**: product rule, quotient rule and chain rule
//!    for all supported functions
//! 2. **Power rule split**: constant exponent, constant base and the general
//!    `f(x)**g(x)` case are differentiated separately so the common cases stay small

use crate::symbolic::symbolic_engine::Expr;

impl Expr {
    /// DIFFERENTIATION

    /// Computes the analytical derivative of the expression with respect to a variable.
    ///
    /// Implements the standard rules from calculus:
    /// - Power rule: d/dx(x^n) = n*x^(n-1)
    /// - Product rule: d/dx(f*g) = f'*g + f*g'
    /// - Quotient rule: d/dx(f/g) = (f'*g - f*g')/g^2
    /// - Chain rule: d/dx(f(g(x))) = f'(g(x))*g'(x)
    ///
    /// # Examples
    /// ```rust, ignore
    /// let x = Expr::Var("x".to_string());
    /// let f = x.clone().pow(Expr::Const(2.0)); // x^2
    /// let df_dx = f.diff("x"); // 2*x
    /// ```
    pub fn diff(&self, var: &str) -> Expr {
        match self {
            Expr::Var(name) => {
                if name == var {
                    Expr::Const(1.0)
                } else {
                    Expr::Const(0.0)
                }
            }
            Expr::Const(_) => Expr::Const(0.0),
            Expr::Add(lhs, rhs) => Expr::Add(Box::new(lhs.diff(var)), Box::new(rhs.diff(var))),
            Expr::Sub(lhs, rhs) => Expr::Sub(Box::new(lhs.diff(var)), Box::new(rhs.diff(var))),
            Expr::Mul(lhs, rhs) => Expr::Add(
                Box::new(Expr::Mul(Box::new(lhs.diff(var)), rhs.clone())),
                Box::new(Expr::Mul(lhs.clone(), Box::new(rhs.diff(var)))),
            ),
            Expr::Div(lhs, rhs) => Expr::Div(
                Box::new(Expr::Sub(
                    Box::new(Expr::Mul(Box::new(lhs.diff(var)), rhs.clone())),
                    Box::new(Expr::Mul(Box::new(rhs.diff(var)), lhs.clone())),
                )),
                Box::new(Expr::Pow(rhs.clone(), Box::new(Expr::Const(2.0)))),
            ),
            Expr::Pow(base, exp) => {
                if !exp.contains_variable(var) {
                    let reduced = match exp.as_ref() {
                        Expr::Const(n) => Expr::Const(n - 1.0),
                        _ => Expr::Sub(exp.clone(), Box::new(Expr::Const(1.0))),
                    };
                    Expr::Mul(
                        Box::new(Expr::Mul(exp.clone(), Box::new(Expr::Pow(base.clone(), Box::new(reduced))))),
                        Box::new(base.diff(var)),
                    )
                } else if !base.contains_variable(var) {
                    // c^g(x) = exp(g(x) ln c)
                    Expr::Mul(
                        Box::new(Expr::Mul(Box::new(self.clone()), Box::new(Expr::Ln(base.clone())))),
                        Box::new(exp.diff(var)),
                    )
                } else {
                    // f^g * (g' ln f + g f'/f)
                    Expr::Mul(
                        Box::new(self.clone()),
                        Box::new(Expr::Add(
                            Box::new(Expr::Mul(Box::new(exp.diff(var)), Box::new(Expr::Ln(base.clone())))),
                            Box::new(Expr::Div(
                                Box::new(Expr::Mul(exp.clone(), Box::new(base.diff(var)))),
                                base.clone(),
                            )),
                        )),
                    )
                }
            }
            Expr::Exp(expr) => {
                Expr::Mul(Box::new(Expr::Exp(expr.clone())), Box::new(expr.diff(var)))
            }
            Expr::Ln(expr) => Expr::Div(Box::new(expr.diff(var)), expr.clone()),
            Expr::sin(expr) => {
                Expr::Mul(Box::new(Expr::cos(expr.clone())), Box::new(expr.diff(var)))
            }
            Expr::cos(expr) => Expr::Mul(
                Box::new(Expr::Mul(
                    Box::new(Expr::Const(-1.0)),
                    Box::new(Expr::sin(expr.clone())),
                )),
                Box::new(expr.diff(var)),
            ),
            Expr::tg(expr) => Expr::Mul(
                Box::new(Expr::Div(
                    Box::new(Expr::Const(1.0)),
                    Box::new(Expr::Pow(
                        Box::new(Expr::cos(expr.clone())),
                        Box::new(Expr::Const(2.0)),
                    )),
                )),
                Box::new(expr.diff(var)),
            ),
            Expr::ctg(expr) => Expr::Mul(
                Box::new(Expr::Div(
                    Box::new(Expr::Const(-1.0)),
                    Box::new(Expr::Pow(
                        Box::new(Expr::sin(expr.clone())),
                        Box::new(Expr::Const(2.0)),
                    )),
                )),
                Box::new(expr.diff(var)),
            ),
            Expr::arcsin(expr) => Expr::Div(
                Box::new(expr.diff(var)),
                Box::new(Expr::Pow(
                    Box::new(Expr::Sub(
                        Box::new(Expr::Const(1.0)),
                        Box::new(Expr::Pow(expr.clone(), Box::new(Expr::Const(2.0)))),
                    )),
                    Box::new(Expr::Const(0.5)),
                )),
            ),
            Expr::arccos(expr) => Expr::Div(
                Box::new(Expr::Mul(
                    Box::new(Expr::Const(-1.0)),
                    Box::new(expr.diff(var)),
                )),
                Box::new(Expr::Pow(
                    Box::new(Expr::Sub(
                        Box::new(Expr::Const(1.0)),
                        Box::new(Expr::Pow(expr.clone(), Box::new(Expr::Const(2.0)))),
                    )),
                    Box::new(Expr::Const(0.5)),
                )),
            ),
            Expr::arctg(expr) => Expr::Div(
                Box::new(expr.diff(var)),
                Box::new(Expr::Add(
                    Box::new(Expr::Const(1.0)),
                    Box::new(Expr::Pow(expr.clone(), Box::new(Expr::Const(2.0)))),
                )),
            ),
            Expr::arcctg(expr) => Expr::Div(
                Box::new(Expr::Mul(
                    Box::new(Expr::Const(-1.0)),
                    Box::new(expr.diff(var)),
                )),
                Box::new(Expr::Add(
                    Box::new(Expr::Const(1.0)),
                    Box::new(Expr::Pow(expr.clone(), Box::new(Expr::Const(2.0)))),
                )),
            ),
        }
    } // end of diff

    /// Checks that the derivative of `self` equals `integrand` at the given points.
    ///
    /// Points where either side is not finite (poles, domain gaps) are skipped, and an
    /// expression with symbols that have no value cannot be checked at all; only an
    /// actual mismatch makes this return `false`.
    pub fn is_antiderivative_of(&self, integrand: &Expr, var: &str, points: &[f64]) -> bool {
        let (Ok(derivative), Ok(integrand)) =
            (self.diff(var).lambdify1D(var), integrand.lambdify1D(var))
        else {
            return true;
        };
        points.iter().all(|&x| {
            let (d, f) = (derivative(x), integrand(x));
            !d.is_finite() || !f.is_finite() || (d - f).abs() <= 1e-6 * f.abs().max(1.0)
        })
    }
}
