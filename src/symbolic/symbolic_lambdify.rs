use crate::symbolic::symbolic_engine::{Expr, named_constant};
use ndarray::Array1;
use std::f64::consts::PI;

/// Closure tree produced from an `Expr` once the variable order is fixed.
/// Variables are resolved to slot indices at compile time, so evaluation does no lookups.
#[derive(Clone, Debug)]
pub enum Lambda {
    Var(usize),
    Const(f64),
    Add(Box<Lambda>, Box<Lambda>),
    Sub(Box<Lambda>, Box<Lambda>),
    Mul(Box<Lambda>, Box<Lambda>),
    Div(Box<Lambda>, Box<Lambda>),
    Pow(Box<Lambda>, Box<Lambda>),
    Exp(Box<Lambda>),
    Ln(Box<Lambda>),
    /// `ln(|v|)`
    LnAbs(Box<Lambda>),
    Sin(Box<Lambda>),
    Cos(Box<Lambda>),
    Tg(Box<Lambda>),
    Ctg(Box<Lambda>),
    ArcSin(Box<Lambda>),
    ArcCos(Box<Lambda>),
    ArcTg(Box<Lambda>),
    ArcCtg(Box<Lambda>),
}

impl Expr {
    /// Compiles the expression against an ordered list of variable names.
    ///
    /// `pi` and `E` compile to their numeric values unless they are listed in `vars`.
    /// Any other symbol missing from `vars` is an error.
    pub fn compile(&self, vars: &[&str]) -> Result<Lambda, String> {
        self.compile_with(vars, false)
    }

    /// With `abs_log` every logarithm is compiled as `ln(|v|)`, the real antiderivative
    /// form of `1/v` on either side of zero.
    fn compile_with(&self, vars: &[&str], abs_log: bool) -> Result<Lambda, String> {
        let one = |e: &Expr| -> Result<Box<Lambda>, String> {
            Ok(Box::new(e.compile_with(vars, abs_log)?))
        };
        let bin = |a: &Expr, b: &Expr| -> Result<(Box<Lambda>, Box<Lambda>), String> {
            Ok((one(a)?, one(b)?))
        };
        let lambda = match self {
            Expr::Var(name) => match vars.iter().position(|v| v == name) {
                Some(idx) => Lambda::Var(idx),
                None => match named_constant(name) {
                    Some(val) => Lambda::Const(val),
                    None => return Err(format!("la variable '{}' no está definida", name)),
                },
            },
            Expr::Const(v) => Lambda::Const(*v),
            Expr::Add(a, b) => {
                let (a, b) = bin(a, b)?;
                Lambda::Add(a, b)
            }
            Expr::Sub(a, b) => {
                let (a, b) = bin(a, b)?;
                Lambda::Sub(a, b)
            }
            Expr::Mul(a, b) => {
                let (a, b) = bin(a, b)?;
                Lambda::Mul(a, b)
            }
            Expr::Div(a, b) => {
                let (a, b) = bin(a, b)?;
                Lambda::Div(a, b)
            }
            Expr::Pow(a, b) => {
                let (a, b) = bin(a, b)?;
                Lambda::Pow(a, b)
            }
            Expr::Exp(e) => Lambda::Exp(one(e)?),
            Expr::Ln(e) if abs_log => Lambda::LnAbs(one(e)?),
            Expr::Ln(e) => Lambda::Ln(one(e)?),
            Expr::sin(e) => Lambda::Sin(one(e)?),
            Expr::cos(e) => Lambda::Cos(one(e)?),
            Expr::tg(e) => Lambda::Tg(one(e)?),
            Expr::ctg(e) => Lambda::Ctg(one(e)?),
            Expr::arcsin(e) => Lambda::ArcSin(one(e)?),
            Expr::arccos(e) => Lambda::ArcCos(one(e)?),
            Expr::arctg(e) => Lambda::ArcTg(one(e)?),
            Expr::arcctg(e) => Lambda::ArcCtg(one(e)?),
        };
        Ok(lambda)
    }

    /// LAMBDIFICATION - Converting Symbolic Expressions to Executable Functions

    /// Converts the expression into a closure of one variable.
    ///
    /// Expressions without free symbols become constant closures. Any symbol other than
    /// `var` (and the named constants) makes this fail, because it would have no value.
    ///
    /// # Examples
    /// ```rust, ignore
    /// let f = Expr::parse_expression("x**2").unwrap();
    /// let func = f.lambdify1D("x").unwrap();
    /// assert_eq!(func(3.0), 9.0);
    /// ```
    pub fn lambdify1D(&self, var: &str) -> Result<Box<dyn Fn(f64) -> f64 + Send + Sync>, String> {
        let compiled = self.compile(&[var])?;
        Ok(Box::new(move |x| compiled.eval(&[x])))
    }

    /// Like `lambdify1D`, but logarithms take the absolute value of their argument.
    /// Used to evaluate antiderivatives such as `log(x)` or `-log(cos(x))` on intervals
    /// where the argument is negative.
    pub fn lambdify1D_abs_log(&self, var: &str) -> Result<Box<dyn Fn(f64) -> f64 + Send + Sync>, String> {
        let compiled = self.compile_with(&[var], true)?;
        Ok(Box::new(move |x| compiled.eval(&[x])))
    }

    /// Evaluates the expression with the given values bound to `vars` (same order).
    pub fn eval_expression(&self, vars: &[&str], values: &[f64]) -> Result<f64, String> {
        if vars.len() != values.len() {
            return Err(format!(
                "{} variables but {} values were given",
                vars.len(),
                values.len()
            ));
        }
        Ok(self.compile(vars)?.eval(values))
    }

    /// Samples the expression on a grid. Non-finite samples are kept as they are;
    /// callers decide what to do with poles and domain gaps.
    pub fn eval_on(&self, var: &str, grid: &Array1<f64>) -> Result<Array1<f64>, String> {
        let compiled = self.compile(&[var])?;
        Ok(grid.mapv(|x| compiled.eval(&[x])))
    }
}

impl Lambda {
    #[inline(always)]
    pub fn eval(&self, args: &[f64]) -> f64 {
        match self {
            Lambda::Var(i) => args[*i],
            Lambda::Const(v) => *v,
            Lambda::Add(a, b) => a.eval(args) + b.eval(args),
            Lambda::Sub(a, b) => a.eval(args) - b.eval(args),
            Lambda::Mul(a, b) => a.eval(args) * b.eval(args),
            Lambda::Div(a, b) => a.eval(args) / b.eval(args),
            Lambda::Pow(a, b) => pow(a.eval(args), b.eval(args)),
            Lambda::Exp(e) => e.eval(args).exp(),
            Lambda::Ln(e) => e.eval(args).ln(),
            Lambda::LnAbs(e) => e.eval(args).abs().ln(),
            Lambda::Sin(e) => e.eval(args).sin(),
            Lambda::Cos(e) => e.eval(args).cos(),
            Lambda::Tg(e) => e.eval(args).tan(),
            Lambda::Ctg(e) => 1.0 / e.eval(args).tan(),
            Lambda::ArcSin(e) => e.eval(args).asin(),
            Lambda::ArcCos(e) => e.eval(args).acos(),
            Lambda::ArcTg(e) => e.eval(args).atan(),
            // acot(x) = atan(1/x), so acot(0) = pi/2 and the branch is odd
            Lambda::ArcCtg(e) => {
                let v = e.eval(args);
                if v == 0.0 { PI / 2.0 } else { (1.0 / v).atan() }
            }
        }
    }
}

/// Integer exponents go through `powi`, which is exact for small powers of negative bases.
#[inline(always)]
fn pow(base: f64, exp: f64) -> f64 {
    if exp.fract() == 0.0 && exp.abs() <= i32::MAX as f64 {
        base.powi(exp as i32)
    } else {
        base.powf(exp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::E;

    #[test]
    fn test_lambdify1d_single_variable() {
        let x = Expr::Var("x".to_string());
        let func = x.lambdify1D("x").unwrap();
        assert_eq!(func(5.0), 5.0);
    }

    #[test]
    fn test_lambdify1d_constant() {
        let c = Expr::Const(42.0);
        let func = c.lambdify1D("x").unwrap();
        assert_eq!(func(100.0), 42.0);
    }

    #[test]
    fn test_lambdify1d_polynomial() {
        let x = Expr::Var("x".to_string());
        let expr = x.clone() * x.clone() + x.clone() * Expr::Const(2.0) + Expr::Const(1.0); // x^2 + 2x + 1
        let func = expr.lambdify1D("x").unwrap();
        assert_eq!(func(3.0), 16.0);
    }

    #[test]
    fn test_lambdify1d_trigonometric() {
        let expr = Expr::sin(Box::new(Expr::Var("x".to_string())));
        let func = expr.lambdify1D("x").unwrap();
        assert_relative_eq!(func(0.0), 0.0, epsilon = 1e-10);
        assert_relative_eq!(func(PI / 2.0), 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_lambdify1d_exponential() {
        let expr = Expr::Exp(Box::new(Expr::Var("x".to_string())));
        let func = expr.lambdify1D("x").unwrap();
        assert_relative_eq!(func(0.0), 1.0, epsilon = 1e-10);
        assert_relative_eq!(func(1.0), E, epsilon = 1e-10);
    }

    #[test]
    fn test_lambdify1d_foreign_variable_is_error() {
        let expr = Expr::Var("x".to_string()) + Expr::Var("y".to_string());
        let err = expr.lambdify1D("x").err().unwrap();
        assert!(err.contains("'y'"));
    }

    #[test]
    fn test_named_constants_evaluate() {
        let expr = Expr::Var("pi".to_string()) * Expr::Var("x".to_string());
        let func = expr.lambdify1D("x").unwrap();
        assert_relative_eq!(func(2.0), 2.0 * PI, epsilon = 1e-12);
        assert_relative_eq!(Expr::Var("E".to_string()).as_number().unwrap(), E);
    }

    #[test]
    fn test_eval_expression() {
        let expr = Expr::Var("x".to_string()).pow(Expr::Const(3.0)) / Expr::Const(3.0);
        assert_relative_eq!(expr.eval_expression(&["x"], &[1.0]).unwrap(), 1.0 / 3.0);
        assert!(expr.eval_expression(&["x"], &[]).is_err());
    }

    #[test]
    fn test_negative_base_integer_power() {
        let expr = Expr::Var("x".to_string()).pow(Expr::Const(3.0));
        assert_eq!(expr.eval_expression(&["x"], &[-2.0]).unwrap(), -8.0);
        let root = Expr::Var("x".to_string()).pow(Expr::Const(0.5));
        assert!(root.eval_expression(&["x"], &[-1.0]).unwrap().is_nan());
    }

    #[test]
    fn test_eval_on_grid() {
        let grid = Array1::linspace(-1.0, 1.0, 5);
        let expr = Expr::Ln(Box::new(Expr::Var("x".to_string())));
        let values = expr.eval_on("x", &grid).unwrap();
        assert!(values[0].is_nan());
        assert!(values[2].is_infinite());
        assert_relative_eq!(values[4], 0.0);
    }

    #[test]
    fn test_abs_log_on_negative_arguments() {
        let expr = Expr::Ln(Box::new(Expr::Var("x".to_string())));
        let real = expr.lambdify1D("x").unwrap();
        let abs = expr.lambdify1D_abs_log("x").unwrap();
        assert!(real(-2.0).is_nan());
        assert_relative_eq!(abs(-2.0), 2.0_f64.ln(), epsilon = 1e-15);
        assert_relative_eq!(abs(2.0), real(2.0));
        assert!(abs(0.0).is_infinite());
    }

    #[test]
    fn test_arccot_branch() {
        let expr = Expr::arcctg(Box::new(Expr::Var("x".to_string())));
        let func = expr.lambdify1D("x").unwrap();
        assert_relative_eq!(func(1.0), PI / 4.0, epsilon = 1e-12);
        assert_relative_eq!(func(-1.0), -PI / 4.0, epsilon = 1e-12);
    }
}
