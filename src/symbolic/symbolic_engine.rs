//! # Symbolic Engine Module
//!
//! Core expression tree used by the integral service. Expressions are parsed from the
//! user's text (see `parse_expr`), simplified, integrated, differentiated and finally
//! turned into closures for sampling.
//!
//! ## Main Structures and Methods
//!
//! ### `Expr` Enum
//! - **Variables**: `Var(String)` - symbolic variables like "x"; `pi` and `E` are
//!   kept as named symbols and only become numbers at evaluation time
//! - **Constants**: `Const(f64)` - numerical constants
//! - **Operations**: `Add`, `Sub`, `Mul`, `Div`, `Pow` - basic arithmetic
//! - **Functions**: `Exp`, `Ln`, `sin`, `cos`, `tg`, `ctg` and the inverse trigonometric ones
//!
//! ### Printing
//! `Display` prints in the same notation the user typed: `**` for powers, `*` for
//! products, `log` for the natural logarithm, minimal parentheses. For example the
//! antiderivative of `x**2` prints as `x**3/3`.
//!
//! ## Interesting Code Features
//!
//! 1. **Recursive Expression Tree**: Uses Box<Expr> for nested expressions
//! 2. **Operator Overloading**: `std::ops` traits give natural syntax: `x.clone() * y`
//! 3. **Rational coefficients**: constants that are close to a small fraction print as
//!    `p/q`, so `x**3/3` does not turn into `0.333333333333333*x**3`

#![allow(non_camel_case_types)]

use std::f64::consts::{E, PI};
use std::fmt;

/// Core symbolic expression enum representing mathematical expressions as an abstract syntax tree.
///
/// # Examples
/// ```rust, ignore
/// use symbolic_engine::Expr;
/// let x = Expr::Var("x".to_string());
/// let expr = Expr::Add(Box::new(x), Box::new(Expr::Const(2.0)));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Symbolic variable with a name (e.g., "x", "y", "pi")
    Var(String),
    /// Numerical constant value
    Const(f64),
    /// Addition operation: left + right
    Add(Box<Expr>, Box<Expr>),
    /// Subtraction operation: left - right
    Sub(Box<Expr>, Box<Expr>),
    /// Multiplication operation: left * right
    Mul(Box<Expr>, Box<Expr>),
    /// Division operation: left / right
    Div(Box<Expr>, Box<Expr>),
    /// Power operation: base ** exponent
    Pow(Box<Expr>, Box<Expr>),
    /// Exponential function: e^x
    Exp(Box<Expr>),
    /// Natural logarithm, printed as `log(x)`
    Ln(Box<Expr>),
    /// Sine function: sin(x)
    sin(Box<Expr>),
    /// Cosine function: cos(x)
    cos(Box<Expr>),
    /// Tangent function, printed as `tan(x)`
    tg(Box<Expr>),
    /// Cotangent function, printed as `cot(x)`
    ctg(Box<Expr>),
    /// Arcsine function, printed as `asin(x)`
    arcsin(Box<Expr>),
    /// Arccosine function, printed as `acos(x)`
    arccos(Box<Expr>),
    /// Arctangent function, printed as `atan(x)`
    arctg(Box<Expr>),
    /// Arccotangent function, printed as `acot(x)`
    arcctg(Box<Expr>),
}

impl std::ops::Add for Expr {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Expr::Add(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Sub for Expr {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Expr::Sub(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Mul for Expr {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Expr::Mul(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Div for Expr {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        Expr::Div(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Neg for Expr {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Expr::Mul(Box::new(Expr::Const(-1.0)), Box::new(self))
    }
}

/// Symbols that are numbers in disguise. They stay symbolic in printed results
/// (`pi*x`) and are replaced by their value when the expression is evaluated.
pub fn named_constant(name: &str) -> Option<f64> {
    match name {
        "pi" => Some(PI),
        "E" => Some(E),
        _ => None,
    }
}

impl Expr {
    /// BASIC FEATURES

    /// Creates a symbolic variable.
    pub fn var(name: &str) -> Expr {
        Expr::Var(name.to_string())
    }

    /// Convenience method to wrap expression in Box for recursive structures.
    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    /// Creates exponential function e^(self).
    pub fn exp(self) -> Expr {
        Expr::Exp(self.boxed())
    }

    /// Creates natural logarithm ln(self).
    pub fn ln(self) -> Expr {
        Expr::Ln(self.boxed())
    }

    /// Creates power expression self^rhs.
    pub fn pow(self, rhs: Expr) -> Expr {
        Expr::Pow(self.boxed(), rhs.boxed())
    }

    /// Checks if expression is exactly zero (constant 0.0).
    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Const(val) if *val == 0.0)
    }

    /// Argument of a one-argument function node (exp, ln, trigonometric ones).
    pub fn function_argument(&self) -> Option<&Expr> {
        match self {
            Expr::Exp(e)
            | Expr::Ln(e)
            | Expr::sin(e)
            | Expr::cos(e)
            | Expr::tg(e)
            | Expr::ctg(e)
            | Expr::arcsin(e)
            | Expr::arccos(e)
            | Expr::arctg(e)
            | Expr::arcctg(e) => Some(e),
            _ => None,
        }
    }

    /// Rebuilds a one-argument function node around a new argument.
    /// Non-function nodes are returned unchanged.
    pub fn with_argument(&self, arg: Expr) -> Expr {
        let arg = Box::new(arg);
        match self {
            Expr::Exp(_) => Expr::Exp(arg),
            Expr::Ln(_) => Expr::Ln(arg),
            Expr::sin(_) => Expr::sin(arg),
            Expr::cos(_) => Expr::cos(arg),
            Expr::tg(_) => Expr::tg(arg),
            Expr::ctg(_) => Expr::ctg(arg),
            Expr::arcsin(_) => Expr::arcsin(arg),
            Expr::arccos(_) => Expr::arccos(arg),
            Expr::arctg(_) => Expr::arctg(arg),
            Expr::arcctg(_) => Expr::arcctg(arg),
            _ => self.clone(),
        }
    }

    /// check if the expression contains a variable
    pub fn contains_variable(&self, var_name: &str) -> bool {
        match self {
            Expr::Var(name) => name == var_name,
            Expr::Const(_) => false,
            Expr::Add(left, right)
            | Expr::Sub(left, right)
            | Expr::Mul(left, right)
            | Expr::Div(left, right)
            | Expr::Pow(left, right) => {
                left.contains_variable(var_name) || right.contains_variable(var_name)
            }
            _ => self
                .function_argument()
                .is_some_and(|arg| arg.contains_variable(var_name)),
        }
    }

    /// substitute a variable with an expression
    pub fn substitute_variable(&self, var: &str, expr: &Expr) -> Expr {
        match self {
            Expr::Var(name) if name == var => expr.clone(),
            Expr::Var(_) | Expr::Const(_) => self.clone(),
            Expr::Add(lhs, rhs) => Expr::Add(
                Box::new(lhs.substitute_variable(var, expr)),
                Box::new(rhs.substitute_variable(var, expr)),
            ),
            Expr::Sub(lhs, rhs) => Expr::Sub(
                Box::new(lhs.substitute_variable(var, expr)),
                Box::new(rhs.substitute_variable(var, expr)),
            ),
            Expr::Mul(lhs, rhs) => Expr::Mul(
                Box::new(lhs.substitute_variable(var, expr)),
                Box::new(rhs.substitute_variable(var, expr)),
            ),
            Expr::Div(lhs, rhs) => Expr::Div(
                Box::new(lhs.substitute_variable(var, expr)),
                Box::new(rhs.substitute_variable(var, expr)),
            ),
            Expr::Pow(base, exp) => Expr::Pow(
                Box::new(base.substitute_variable(var, expr)),
                Box::new(exp.substitute_variable(var, expr)),
            ),
            _ => match self.function_argument() {
                Some(arg) => self.with_argument(arg.substitute_variable(var, expr)),
                None => self.clone(),
            },
        }
    }

    /// Returns sorted, deduplicated names of all symbols in the expression,
    /// named constants (`pi`, `E`) excluded.
    pub fn all_arguments_are_variables(&self) -> Vec<String> {
        let mut vars = Vec::new();
        self.collect_variables(&mut vars);
        vars.sort();
        vars.dedup();
        vars
    }

    fn collect_variables(&self, vars: &mut Vec<String>) {
        match self {
            Expr::Var(name) => {
                if named_constant(name).is_none() {
                    vars.push(name.clone())
                }
            }
            Expr::Const(_) => {}
            Expr::Add(lhs, rhs)
            | Expr::Sub(lhs, rhs)
            | Expr::Mul(lhs, rhs)
            | Expr::Div(lhs, rhs)
            | Expr::Pow(lhs, rhs) => {
                lhs.collect_variables(vars);
                rhs.collect_variables(vars);
            }
            _ => {
                if let Some(arg) = self.function_argument() {
                    arg.collect_variables(vars)
                }
            }
        }
    }

    /// Evaluates an expression that contains no free variables.
    pub fn as_number(&self) -> Option<f64> {
        if self.all_arguments_are_variables().is_empty() {
            self.eval_expression(&[], &[]).ok()
        } else {
            None
        }
    }

    /// Rendering precedence, used by `Display` to decide on parentheses.
    fn precedence(&self) -> u8 {
        match self {
            Expr::Add(..) | Expr::Sub(..) => 1,
            Expr::Mul(..) | Expr::Div(..) => 2,
            Expr::Const(val) if *val < 0.0 => 2,
            Expr::Const(val) if !is_integer(*val) && rational_approximation(*val).1 != 1.0 => 2,
            Expr::Pow(_, exp) if is_half(exp) => 4,
            Expr::Pow(..) => 3,
            _ => 4,
        }
    }
}

fn is_half(expr: &Expr) -> bool {
    matches!(expr, Expr::Const(val) if *val == 0.5)
}

pub(crate) fn is_integer(val: f64) -> bool {
    val.is_finite() && val.fract() == 0.0 && val.abs() < 1e15
}

/// Best fraction p/q with q <= 1000 that reproduces `val` to 1e-12 relative precision.
/// Falls back to (val, 1) when no such fraction exists.
pub(crate) fn rational_approximation(val: f64) -> (f64, f64) {
    if is_integer(val) || !val.is_finite() {
        return (val, 1.0);
    }
    for q in 2..=1000 {
        let p = (val * q as f64).round();
        if ((p / q as f64) - val).abs() <= 1e-12 * val.abs().max(1.0) {
            return (p, q as f64);
        }
    }
    (val, 1.0)
}

/// Prints a constant the way the user would type it: `3`, `-2`, `0.25` is `1/4`.
/// Magnitudes from 1e15 up have no fractional digits worth a fraction and may not fit
/// an `i64`, they print as they are.
fn format_constant(val: f64) -> String {
    if !val.is_finite() || val.abs() >= 1e15 {
        return format!("{}", val);
    }
    if is_integer(val) {
        return format!("{}", val as i64);
    }
    let (p, q) = rational_approximation(val);
    if q != 1.0 {
        format!("{}/{}", p as i64, q as i64)
    } else {
        format!("{}", val)
    }
}

/// Splits off a leading minus sign: `-3*x` gives `3*x`, `-1*cos(x)` gives `cos(x)`.
pub(crate) fn strip_negative(expr: &Expr) -> Option<Expr> {
    match expr {
        Expr::Const(val) if *val < 0.0 => Some(Expr::Const(-val)),
        Expr::Mul(lhs, rhs) => match lhs.as_ref() {
            Expr::Const(val) if *val == -1.0 => Some(*rhs.clone()),
            Expr::Const(val) if *val < 0.0 => Some(Expr::Mul(Box::new(Expr::Const(-val)), rhs.clone())),
            _ => strip_negative(lhs).map(|l| Expr::Mul(Box::new(l), rhs.clone())),
        },
        Expr::Div(lhs, rhs) => strip_negative(lhs).map(|l| Expr::Div(Box::new(l), rhs.clone())),
        _ => None,
    }
}

fn wrap(expr: &Expr, parenthesize: bool) -> String {
    if parenthesize {
        format!("({})", expr)
    } else {
        format!("{}", expr)
    }
}

/// Display implementation for pretty printing symbolic expressions.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Var(name) => write!(f, "{}", name),
            Expr::Const(val) => write!(f, "{}", format_constant(*val)),
            Expr::Add(lhs, rhs) => match strip_negative(rhs) {
                Some(positive) => write!(f, "{} - {}", lhs, wrap(&positive, positive.precedence() < 2)),
                None => write!(f, "{} + {}", lhs, rhs),
            },
            Expr::Sub(lhs, rhs) => match strip_negative(rhs) {
                Some(positive) => write!(f, "{} + {}", lhs, positive),
                None => write!(f, "{} - {}", lhs, wrap(rhs, rhs.precedence() < 2)),
            },
            Expr::Mul(lhs, rhs) => {
                if let Expr::Const(val) = lhs.as_ref() {
                    if *val == -1.0 {
                        return write!(f, "-{}", wrap(rhs, rhs.precedence() < 2));
                    }
                }
                write!(
                    f,
                    "{}*{}",
                    wrap(lhs, lhs.precedence() < 2 && !matches!(lhs.as_ref(), Expr::Const(v) if *v < 0.0)),
                    wrap(rhs, rhs.precedence() < 2 || matches!(rhs.as_ref(), Expr::Const(v) if *v < 0.0))
                )
            }
            Expr::Div(lhs, rhs) => write!(
                f,
                "{}/{}",
                wrap(lhs, lhs.precedence() < 2),
                wrap(rhs, rhs.precedence() <= 2)
            ),
            Expr::Pow(base, exp) => {
                if is_half(exp) {
                    return write!(f, "sqrt({})", base);
                }
                write!(
                    f,
                    "{}**{}",
                    wrap(base, base.precedence() <= 3),
                    wrap(exp, exp.precedence() <= 3)
                )
            }
            Expr::Exp(expr) => write!(f, "exp({})", expr),
            Expr::Ln(expr) => write!(f, "log({})", expr),
            Expr::sin(expr) => write!(f, "sin({})", expr),
            Expr::cos(expr) => write!(f, "cos({})", expr),
            Expr::tg(expr) => write!(f, "tan({})", expr),
            Expr::ctg(expr) => write!(f, "cot({})", expr),
            Expr::arcsin(expr) => write!(f, "asin({})", expr),
            Expr::arccos(expr) => write!(f, "acos({})", expr),
            Expr::arctg(expr) => write!(f, "atan({})", expr),
            Expr::arcctg(expr) => write!(f, "acot({})", expr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Expr {
        Expr::var("x")
    }

    #[test]
    fn test_display_power_over_integer() {
        let expr = x().pow(Expr::Const(3.0)) / Expr::Const(3.0);
        assert_eq!(expr.to_string(), "x**3/3");
    }

    #[test]
    fn test_display_negative_function() {
        let expr = -Expr::cos(x().boxed());
        assert_eq!(expr.to_string(), "-cos(x)");
    }

    #[test]
    fn test_display_sum_with_negative_term() {
        let expr = x().pow(Expr::Const(3.0)) / Expr::Const(3.0) + -Expr::cos(x().boxed());
        assert_eq!(expr.to_string(), "x**3/3 - cos(x)");
    }

    #[test]
    fn test_display_parenthesizes_sums() {
        let expr = (x() + Expr::Const(1.0)) * (x() - Expr::Const(1.0));
        assert_eq!(expr.to_string(), "(x + 1)*(x - 1)");
        let expr = (x() + Expr::Const(1.0)).pow(Expr::Const(2.0));
        assert_eq!(expr.to_string(), "(x + 1)**2");
        let expr = x() / (Expr::Const(2.0) * x());
        assert_eq!(expr.to_string(), "x/(2*x)");
    }

    #[test]
    fn test_display_sqrt_and_functions() {
        let expr = (Expr::Const(1.0) - x().pow(Expr::Const(2.0))).pow(Expr::Const(0.5));
        assert_eq!(expr.to_string(), "sqrt(1 - x**2)");
        assert_eq!(Expr::Ln(x().boxed()).to_string(), "log(x)");
        assert_eq!(Expr::tg(x().boxed()).to_string(), "tan(x)");
        assert_eq!(Expr::arctg(x().boxed()).to_string(), "atan(x)");
    }

    #[test]
    fn test_rational_constants() {
        assert_eq!(format_constant(0.25), "1/4");
        assert_eq!(format_constant(-2.0), "-2");
        assert_eq!(format_constant(std::f64::consts::PI), format!("{}", std::f64::consts::PI));
    }

    #[test]
    fn test_large_constants_print_plainly() {
        assert_eq!(format_constant(1e16 + 2.0), "10000000000000002");
        assert_eq!(format_constant(-1e20), "-100000000000000000000");
        assert!(!format_constant(2.5e15).contains('/'));
    }

    #[test]
    fn test_contains_and_substitute() {
        let expr = Expr::sin(Box::new(Expr::Const(2.0) * x()));
        assert!(expr.contains_variable("x"));
        assert!(!expr.contains_variable("y"));
        let substituted = expr.substitute_variable("x", &Expr::var("t"));
        assert_eq!(substituted.to_string(), "sin(2*t)");
    }

    #[test]
    fn test_named_constants_are_not_variables() {
        let expr = Expr::var("pi") * x() + Expr::var("y");
        assert_eq!(expr.all_arguments_are_variables(), vec!["x", "y"]);
        assert!(Expr::var("pi").as_number().is_some());
    }
}
