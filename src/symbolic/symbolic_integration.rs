use crate::symbolic::symbolic_engine::{Expr, is_integer};
use crate::symbolic::symbolic_simplify::Term;
use log::{debug, warn};
use ndarray::Array1;

/// How many times the integrator may recurse into substitution or expansion.
const MAX_DEPTH: usize = 6;
/// Largest power of x the repeated by-parts rules expand; every power is one level of
/// recursion.
const MAX_BY_PARTS_POWER: f64 = 50.0;
/// Points where a candidate antiderivative is differentiated back and compared.
const VERIFICATION_POINTS: [f64; 11] = [
    -7.3, -2.7, -1.3, -0.45, 0.35, 0.8, 1.9, 3.1, 5.6, 9.2, 13.7,
];
/// Distances from a bound at which a one-sided limit of the antiderivative is taken;
/// the two values must agree within `LIMIT_TOLERANCE`.
const LIMIT_STEP: f64 = 1e-8;
const LIMIT_STEP_FINE: f64 = 1e-12;
const LIMIT_TOLERANCE: f64 = 1e-5;
/// Name of the substitution variable; the parser never produces it from user text
/// that does not spell it out.
const SUBSTITUTION_SYMBOL: &str = "__u";

fn var_expr(var: &str) -> Expr {
    Expr::Var(var.to_string())
}

fn c(val: f64) -> Expr {
    Expr::Const(val)
}

fn power_expr(base: Expr, exp: &Expr) -> Expr {
    match exp {
        Expr::Const(n) if *n == 1.0 => base,
        _ => base.pow(exp.clone()),
    }
}

fn product_expr(factors: &[(Expr, Expr)]) -> Expr {
    Term { coeff: 1.0, factors: factors.to_vec() }.to_expr()
}

fn product_without(factors: &[(Expr, Expr)], skip: usize) -> Expr {
    let rest: Vec<(Expr, Expr)> = factors
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != skip)
        .map(|(_, f)| f.clone())
        .collect();
    product_expr(&rest)
}

impl Expr {
    /// SYMBOLIC INTEGRATION

    /// Main integration method - integrates with respect to a variable
    /// Returns the simplified indefinite integral (without constant of integration).
    ///
    /// The integrand is simplified and split into terms; every term is a constant times a
    /// product of factors, and the product is matched against the rule table. Whatever
    /// comes out is differentiated back and compared with the integrand before it is
    /// returned.
    pub fn integrate(&self, var: &str) -> Result<Expr, String> {
        let integrand = self.simplify();
        let antiderivative = integrate_expr(&integrand, var, 0)?.simplify();
        if !antiderivative.is_antiderivative_of(&integrand, var, &VERIFICATION_POINTS) {
            return Err(format!(
                "Cannot integrate {}: candidate {} does not differentiate back",
                integrand, antiderivative
            ));
        }
        debug!("∫ {} d{} = {}", integrand, var, antiderivative);
        Ok(antiderivative)
    }

    /// Definite integration using the fundamental theorem of calculus
    pub fn definite_integrate(
        &self,
        var: &str,
        lower: f64,
        upper: f64,
        intervals: usize,
    ) -> Result<f64, String> {
        let antiderivative = self.integrate(var)?;
        self.definite_from_antiderivative(&antiderivative, var, lower, upper, intervals)
    }

    /// F(upper) - F(lower) for an already known antiderivative F of `self`.
    ///
    /// The fundamental theorem only holds when F is continuous on the interval, so both
    /// functions are sampled on `intervals + 1` points first:
    /// - the integrand and F must be finite strictly inside the interval;
    /// - F must move in the direction the integrand points to; a step against it is a
    ///   jump over a pole (`-1/x` across 0);
    /// - where the integrand changes sign between two points, the sign change is
    ///   bisected and must be a root, not a pole (`1/x` across 0).
    ///
    /// Logarithms in F are evaluated as `ln|u|`, so `log(x)` works for negative x; the
    /// checks above keep the interval on one side of every zero of `u`.
    ///
    /// When F is not finite at a bound (`x*log(x)` at 0) its one-sided limit is used
    /// instead, and a limit that does not settle is a divergent integral. The result is
    /// cross-checked against Simpson's rule, a mismatch is logged.
    pub fn definite_from_antiderivative(
        &self,
        antiderivative: &Expr,
        var: &str,
        lower: f64,
        upper: f64,
        intervals: usize,
    ) -> Result<f64, String> {
        if !lower.is_finite() || !upper.is_finite() {
            return Err(format!("the bounds must be finite numbers, got {} and {}", lower, upper));
        }
        if lower == upper {
            return Ok(0.0);
        }
        let intervals = intervals.max(2);
        let integrand = self.lambdify1D(var)?;
        let primitive = antiderivative.lambdify1D_abs_log(var)?;
        let diverges = || format!("the integral of {} does not converge on [{}, {}]", self, lower, upper);
        let grid = Array1::linspace(lower, upper, intervals + 1);
        let integrand_values = grid.mapv(|x| integrand(x));
        let primitive_values = grid.mapv(|x| primitive(x));
        for i in 1..intervals {
            if !integrand_values[i].is_finite() {
                return Err(format!(
                    "the integrand {} is not finite at {} = {}, inside [{}, {}]",
                    self, var, grid[i], lower, upper
                ));
            }
            if !primitive_values[i].is_finite() {
                return Err(format!(
                    "the antiderivative {} is not defined at {} = {}, inside [{}, {}]",
                    antiderivative, var, grid[i], lower, upper
                ));
            }
        }
        let direction = (upper - lower).signum();
        for i in 0..intervals {
            let (x0, x1) = (grid[i], grid[i + 1]);
            let (f0, f1) = (integrand_values[i], integrand_values[i + 1]);
            let (p0, p1) = (primitive_values[i], primitive_values[i + 1]);
            if ![f0, f1, p0, p1].iter().all(|v| v.is_finite()) {
                continue;
            }
            let step = p1 - p0;
            let against_integrand = f0 * f1 > 0.0 && step * f0 * direction < 0.0;
            if against_integrand && step.abs() > 1e-9 * (1.0 + p0.abs() + p1.abs()) {
                return Err(format!("{}: discontinuity between {} and {}", diverges(), x0, x1));
            }
            if f0 * f1 < 0.0 && is_pole_between(&integrand, (x0, f0), (x1, f1)) {
                return Err(format!("{}: pole between {} and {}", diverges(), x0, x1));
            }
        }
        let (at_upper, upper_is_limit) =
            one_sided_value(&primitive, upper, -direction).ok_or_else(diverges)?;
        let (at_lower, lower_is_limit) =
            one_sided_value(&primitive, lower, direction).ok_or_else(diverges)?;
        let mut value = at_upper - at_lower;
        if !value.is_finite() {
            return Err(diverges());
        }
        if upper_is_limit || lower_is_limit {
            value = (value * 1e10).round() / 1e10;
        }
        let simpson = self.numerical_integrate(var, lower, upper, intervals)?;
        if simpson.is_finite() && (simpson - value).abs() > 1e-6 * value.abs().max(1.0) {
            warn!(
                "definite integral of {} on [{}, {}]: analytical {} but Simpson gives {}",
                self, lower, upper, value, simpson
            );
        }
        Ok(value)
    }

    /// Numerical integration using Simpson's rule; an odd interval count is rounded up.
    pub fn numerical_integrate(&self, var: &str, lower: f64, upper: f64, n: usize) -> Result<f64, String> {
        let n = if n % 2 == 0 { n.max(2) } else { n + 1 };
        let h = (upper - lower) / (n as f64);
        let f = self.lambdify1D(var)?;

        let mut sum = f(lower) + f(upper);

        for i in 1..n {
            let x = lower + (i as f64) * h;
            if i % 2 == 0 {
                sum += 2.0 * f(x);
            } else {
                sum += 4.0 * f(x);
            }
        }

        Ok(sum * h / 3.0)
    }
}

/// Value of F at `point`, or its limit when approaching from `direction`.
/// The flag tells whether the limit was needed. `None` when the limit does not exist:
/// F taken at two distances from the point must agree.
fn one_sided_value(primitive: &dyn Fn(f64) -> f64, point: f64, direction: f64) -> Option<(f64, bool)> {
    let value = primitive(point);
    if value.is_finite() {
        return Some((value, false));
    }
    let scale = 1.0 + point.abs();
    let near = primitive(point + direction * LIMIT_STEP * scale);
    let nearer = primitive(point + direction * LIMIT_STEP_FINE * scale);
    let settled = near.is_finite()
        && nearer.is_finite()
        && (near - nearer).abs() <= LIMIT_TOLERANCE * (1.0 + nearer.abs());
    settled.then_some((nearer, true))
}

/// Bisects a sign change of the integrand between `a` and `b`. At a root the values
/// shrink towards zero; at a pole they grow (or stop being finite).
fn is_pole_between(integrand: &dyn Fn(f64) -> f64, a: (f64, f64), b: (f64, f64)) -> bool {
    let start = a.1.abs().max(b.1.abs());
    let ((mut xa, mut fa), (mut xb, mut fb)) = (a, b);
    for _ in 0..60 {
        let xm = 0.5 * (xa + xb);
        if xm == xa || xm == xb {
            break;
        }
        let fm = integrand(xm);
        if !fm.is_finite() {
            return true;
        }
        if fm == 0.0 {
            return false;
        }
        if fa * fm < 0.0 {
            (xb, fb) = (xm, fm);
        } else {
            (xa, fa) = (xm, fm);
        }
    }
    fa.abs().min(fb.abs()) > start
}

fn integrate_expr(expr: &Expr, var: &str, depth: usize) -> Result<Expr, String> {
    let terms = expr.terms();
    let mut integral = Expr::Const(0.0);
    for term in &terms {
        integral = integral + integrate_term(term, var, depth)?;
    }
    Ok(integral)
}

/// ∫ c * f(x) dx = c * ∫ f(x) dx
fn integrate_term(term: &Term, var: &str, depth: usize) -> Result<Expr, String> {
    let (constant, dependent) = term.split(var);
    let factor = constant.to_expr();
    if dependent.is_constant() {
        return Ok(factor * var_expr(var));
    }
    Ok(factor * integrate_product(&dependent.factors, var, depth)?)
}

fn integrate_product(factors: &[(Expr, Expr)], var: &str, depth: usize) -> Result<Expr, String> {
    if depth > MAX_DEPTH {
        return Err(format!("Cannot integrate {}: too many nested rules", product_expr(factors)));
    }
    if let [(base, exp)] = factors {
        if let Some(result) = integrate_factor(base, exp, var) {
            return Ok(result);
        }
    }
    if let [first, second] = factors {
        let pair = integrate_pair(first, second, var).or_else(|| integrate_pair(second, first, var));
        if let Some(result) = pair {
            return Ok(result);
        }
    }
    if let Some(result) = integrate_logarithmic_derivative(factors, var) {
        return Ok(result);
    }
    if let Some(result) = integrate_by_substitution(factors, var, depth) {
        return Ok(result);
    }
    if let Some(result) = integrate_expanded(factors, var, depth) {
        return Ok(result);
    }
    Err(format!("Cannot integrate {}", product_expr(factors)))
}

/// A single factor `base**exp` that depends on the variable.
fn integrate_factor(base: &Expr, exp: &Expr, var: &str) -> Option<Expr> {
    match exp {
        Expr::Const(n) => {
            let n = *n;
            // ∫ (ax + b)^n dx = (ax + b)^(n+1) / ((n+1) a),  ∫ (ax + b)^-1 dx = ln(ax + b) / a
            if let Some((a, _)) = base.linear_coeffs(var) {
                let u = base.clone();
                if n == -1.0 {
                    return Some(u.ln() / a);
                }
                return Some(u.pow(c(n + 1.0)) / (c(n + 1.0) * a));
            }
            if let Some(arg) = base.function_argument() {
                let (a, _) = arg.linear_coeffs(var)?;
                return integrate_function_power(base, arg, n).map(|int| int / a);
            }
            integrate_quadratic_power(base, n, var)
        }
        // ∫ c^(ax + b) dx = c^(ax + b) / (a ln(c))
        _ if !base.contains_variable(var) => {
            let (a, _) = exp.linear_coeffs(var)?;
            Some(base.clone().pow(exp.clone()) / (a * base.clone().ln()))
        }
        _ => None,
    }
}

/// ∫ f(u)^n du for the elementary functions, u being the (linear) argument.
fn integrate_function_power(f: &Expr, u: &Expr, n: f64) -> Option<Expr> {
    let u = u.clone();
    let sin = || Expr::sin(Box::new(u.clone()));
    let cos = || Expr::cos(Box::new(u.clone()));
    let tan = || Expr::tg(Box::new(u.clone()));
    let cot = || Expr::ctg(Box::new(u.clone()));
    let one_minus_u2 = || c(1.0) - u.clone().pow(c(2.0));
    let u2_plus_one = || u.clone().pow(c(2.0)) + c(1.0);
    if let Expr::Exp(_) = f {
        // exp(u)^n = exp(n u)
        return Some(Expr::Exp(Box::new(c(n) * u.clone())) / c(n));
    }
    if !is_integer(n) {
        return None;
    }
    let integral = match (f, n as i32) {
        (Expr::Ln(_), 1) => u.clone() * u.clone().ln() - u.clone(),
        (Expr::sin(_), 1) => -cos(),
        (Expr::cos(_), 1) => sin(),
        (Expr::tg(_), 1) => -cos().ln(),
        (Expr::ctg(_), 1) => sin().ln(),
        (Expr::arcsin(_), 1) => u.clone() * f.clone() + one_minus_u2().pow(c(0.5)),
        (Expr::arccos(_), 1) => u.clone() * f.clone() - one_minus_u2().pow(c(0.5)),
        (Expr::arctg(_), 1) => u.clone() * f.clone() - u2_plus_one().ln() / c(2.0),
        (Expr::arcctg(_), 1) => u.clone() * f.clone() + u2_plus_one().ln() / c(2.0),
        (Expr::sin(_), 2) => u.clone() / c(2.0) - sin() * cos() / c(2.0),
        (Expr::cos(_), 2) => u.clone() / c(2.0) + sin() * cos() / c(2.0),
        (Expr::tg(_), 2) => tan() - u.clone(),
        (Expr::ctg(_), 2) => -cot() - u.clone(),
        // sec and csc
        (Expr::cos(_), -1) => (tan() + c(1.0) / cos()).ln(),
        (Expr::sin(_), -1) => Expr::tg(Box::new(u.clone() / c(2.0))).ln(),
        (Expr::cos(_), -2) => tan(),
        (Expr::sin(_), -2) => -cot(),
        _ => return None,
    };
    Some(integral)
}

/// `a x^2 + b` with numeric coefficients.
fn quadratic_coeffs(base: &Expr, var: &str) -> Option<(f64, f64)> {
    let square = [(var_expr(var), c(2.0))];
    let (mut a, mut b) = (0.0, 0.0);
    for term in base.terms() {
        if term.is_constant() {
            b += term.coeff;
        } else if term.factors == square {
            a += term.coeff;
        } else {
            return None;
        }
    }
    Some((a, b))
}

/// ∫ dx/(a x^2 + b) = atan(x sqrt(a/b)) / sqrt(a b)
/// ∫ dx/sqrt(b - a x^2) = asin(x sqrt(a/b)) / sqrt(a)
fn integrate_quadratic_power(base: &Expr, n: f64, var: &str) -> Option<Expr> {
    let (a, b) = quadratic_coeffs(base, var)?;
    let x = var_expr(var);
    if n == -1.0 && a > 0.0 && b > 0.0 {
        let scaled = c(a / b).pow(c(0.5)) * x;
        return Some(Expr::arctg(Box::new(scaled)) / c(a * b).pow(c(0.5)));
    }
    if n == -0.5 && a < 0.0 && b > 0.0 {
        let scaled = c(-a / b).pow(c(0.5)) * x;
        return Some(Expr::arcsin(Box::new(scaled)) / c(-a).pow(c(0.5)));
    }
    None
}

/// Products of two factors handled by (repeated) integration by parts.
fn integrate_pair(first: &(Expr, Expr), second: &(Expr, Expr), var: &str) -> Option<Expr> {
    let x = var_expr(var);
    let is_one = |e: &Expr| *e == c(1.0);
    if let (Expr::Var(name), Expr::Const(n)) = first {
        if name == var {
            let whole_power = is_integer(*n) && *n >= 1.0 && *n <= MAX_BY_PARTS_POWER;
            match second {
                // x^n * exp(ax + b)
                (Expr::Exp(u), k) if whole_power && is_one(k) => {
                    let (a, _) = u.linear_coeffs(var)?;
                    return Some(integrate_xn_times_exp_recursive(*n as i32, u, &a, var));
                }
                // x^n * sin(ax + b), x^n * cos(ax + b)
                (Expr::sin(u) | Expr::cos(u), k) if whole_power && is_one(k) => {
                    let (a, _) = u.linear_coeffs(var)?;
                    let sine = matches!(second.0, Expr::sin(_));
                    return Some(integrate_xn_times_trig_recursive(*n as i32, sine, u, &a, var));
                }
                // x^n * ln(x)
                (Expr::Ln(u), k) if **u == x && is_one(k) => {
                    return Some(integrate_xn_times_ln_x(*n, var));
                }
                _ => {}
            }
        }
    }
    // exp(ax + b) * sin(cx + d), exp(ax + b) * cos(cx + d)
    if let ((Expr::Exp(u), k1), (Expr::sin(v) | Expr::cos(v), k2)) = (first, second) {
        if is_one(k1) && is_one(k2) {
            let (a, _) = u.linear_coeffs(var)?;
            let (b, _) = v.linear_coeffs(var)?;
            let exp_u = Expr::Exp(u.clone());
            let sin_v = Expr::sin(v.clone());
            let cos_v = Expr::cos(v.clone());
            let norm = a.clone().pow(c(2.0)) + b.clone().pow(c(2.0));
            let bracket = if matches!(second.0, Expr::sin(_)) {
                a * sin_v - b * cos_v
            } else {
                a * cos_v + b * sin_v
            };
            return Some(exp_u * bracket / norm);
        }
    }
    None
}

/// ∫ x^n e^u dx = x^n e^u / a - (n/a) ∫ x^(n-1) e^u dx,  u = ax + b
fn integrate_xn_times_exp_recursive(n: i32, u: &Expr, a: &Expr, var: &str) -> Expr {
    let exp_u = Expr::Exp(Box::new(u.clone()));
    if n == 0 {
        return exp_u / a.clone();
    }
    let xn = var_expr(var).pow(c(n as f64));

    // First term: (1/a) * x^n * e^u
    let first_term = (xn * exp_u) / a.clone();

    // Second term: -(n/a) * ∫ x^(n-1) * e^u dx
    let second_term =
        (c(n as f64) / a.clone()) * integrate_xn_times_exp_recursive(n - 1, u, a, var);

    first_term - second_term
}

/// ∫ x^n sin(u) dx = -x^n cos(u)/a + (n/a) ∫ x^(n-1) cos(u) dx
/// ∫ x^n cos(u) dx =  x^n sin(u)/a - (n/a) ∫ x^(n-1) sin(u) dx
fn integrate_xn_times_trig_recursive(n: i32, sine: bool, u: &Expr, a: &Expr, var: &str) -> Expr {
    let sin_u = Expr::sin(Box::new(u.clone()));
    let cos_u = Expr::cos(Box::new(u.clone()));
    if n == 0 {
        return if sine { -cos_u / a.clone() } else { sin_u / a.clone() };
    }
    let xn = var_expr(var).pow(c(n as f64));
    let reduced = (c(n as f64) / a.clone()) * integrate_xn_times_trig_recursive(n - 1, !sine, u, a, var);
    if sine {
        -(xn * cos_u) / a.clone() + reduced
    } else {
        (xn * sin_u) / a.clone() - reduced
    }
}

/// Integrate x^n * ln(x) using integration by parts
/// ∫ x^n * ln(x) dx = x^(n+1) * [ln(x)/(n+1) - 1/(n+1)²]
fn integrate_xn_times_ln_x(n: f64, var: &str) -> Expr {
    let x = var_expr(var);
    if n == -1.0 {
        // ∫ ln(x)/x dx = (ln(x))²/2
        return x.ln().pow(c(2.0)) / c(2.0);
    }
    let n_plus_1 = n + 1.0;
    let term1 = x.clone().ln() / c(n_plus_1);
    let term2 = c(1.0) / c(n_plus_1 * n_plus_1);
    x.pow(c(n_plus_1)) * (term1 - term2)
}

/// ∫ k g'(x)/g(x) dx = k ln(g(x))
fn integrate_logarithmic_derivative(factors: &[(Expr, Expr)], var: &str) -> Option<Expr> {
    for (i, (g, exp)) in factors.iter().enumerate() {
        if *exp != c(-1.0) || !g.contains_variable(var) {
            continue;
        }
        let dg = g.diff(var).simplify();
        if dg.is_zero() {
            continue;
        }
        let ratio = (product_without(factors, i) / dg).simplify();
        if !ratio.contains_variable(var) {
            return Some(ratio * g.clone().ln());
        }
    }
    None
}

/// ∫ k f(u(x)) u'(x) dx = k F(u(x)). A factor either is `f(u)**n` (the argument is
/// substituted) or is itself `u**n`; the rest of the product must be a constant
/// multiple of u'.
fn integrate_by_substitution(factors: &[(Expr, Expr)], var: &str, depth: usize) -> Option<Expr> {
    let t = var_expr(SUBSTITUTION_SYMBOL);
    for (i, (base, exp)) in factors.iter().enumerate() {
        let rest = product_without(factors, i);
        let mut candidates = Vec::with_capacity(2);
        if let Some(arg) = base.function_argument() {
            candidates.push((arg.clone(), power_expr(base.with_argument(t.clone()), exp)));
        }
        candidates.push((base.clone(), power_expr(t.clone(), exp)));
        for (inner, outer) in candidates {
            if !inner.contains_variable(var) || inner == var_expr(var) || exp.contains_variable(var) {
                continue;
            }
            let du = inner.diff(var).simplify();
            if du.is_zero() {
                continue;
            }
            let ratio = (rest.clone() / du).simplify();
            if ratio.contains_variable(var) {
                continue;
            }
            if let Ok(outer_integral) = integrate_expr(&outer, SUBSTITUTION_SYMBOL, depth + 1) {
                debug!("substitution {} = {} in {}", SUBSTITUTION_SYMBOL, inner, product_expr(factors));
                return Some(ratio * outer_integral.substitute_variable(SUBSTITUTION_SYMBOL, &inner));
            }
        }
    }
    None
}

/// Multiplies out sums raised to small whole powers and integrates term by term.
fn integrate_expanded(factors: &[(Expr, Expr)], var: &str, depth: usize) -> Option<Expr> {
    let has_sum = factors.iter().any(|(base, exp)| {
        matches!(base, Expr::Add(..) | Expr::Sub(..))
            && matches!(exp, Expr::Const(n) if is_integer(*n) && *n >= 1.0 && *n <= 10.0)
    });
    if !has_sum {
        return None;
    }
    let expanded = product_expr(factors).expand();
    if expanded.terms().len() <= 1 {
        return None;
    }
    integrate_expr(&expanded, var, depth + 1).ok()
}
