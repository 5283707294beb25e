//! # Symbolic Expression Simplification Module
//!
//! Brings expressions into a canonical sum-of-terms form so that results print the way
//! a user expects (`x**3/3 - cos(x)`, not `(1/3)*(x^3) + (-1)*(cos(x))`).
//!
//! ## Simplification Strategy
//!
//! 1. **Flattening**: sums become a list of `Term`s, products and quotients become
//!    a coefficient times a list of `(base, exponent)` factors
//! 2. **Constant Folding**: numeric coefficients are multiplied out, integer powers of
//!    numbers are evaluated, `exp(0)`, `log(1)`, `sin(0)` and friends become numbers
//! 3. **Power Rules**: equal bases merge (`x*x**2` is `x**3`), `x**0` is `1`, `x**1` is `x`
//! 4. **Like Term Collection**: `3*x + 2*x` is `5*x`, zero terms are dropped
//! 5. **Symmetry**: `sin(-u)` is `-sin(u)`, `cos(-u)` is `cos(u)`
//!
//! Numbers distribute over sums (`2*(x + 1)` is `2*x + 2`), products of sums are kept
//! factored unless `expand` is asked for.
//!
//! ## Ordering
//!
//! Terms are ordered by descending degree in the free symbols, constants go last, and
//! ties are broken by reverse text order (`x*log(x) - x`, `sin(x) + cos(x)`).
//! Inside a term, symbols come first, then numeric bases, then compound bases, then
//! function calls.

use crate::symbolic::symbolic_engine::{Expr, is_integer, named_constant, rational_approximation, strip_negative};
use std::cmp::Ordering;

/// Coefficients this close to zero are treated as cancelled.
const ZERO_TOLERANCE: f64 = 1e-14;

/// One additive term: `coeff * base_1**exp_1 * base_2**exp_2 * ...`
///
/// Bases are simplified expressions; equal bases are merged, so each base appears once.
#[derive(Clone, Debug, PartialEq)]
pub struct Term {
    pub coeff: f64,
    pub factors: Vec<(Expr, Expr)>,
}

impl Term {
    pub fn constant(coeff: f64) -> Term {
        Term { coeff, factors: Vec::new() }
    }

    fn factor(base: Expr, exp: Expr) -> Term {
        Term { coeff: 1.0, factors: vec![(base, exp)] }
    }

    pub fn is_constant(&self) -> bool {
        self.factors.is_empty()
    }

    fn mul(&self, other: &Term) -> Term {
        let mut product = self.clone();
        product.coeff *= other.coeff;
        for (base, exp) in &other.factors {
            product.push_factor(base.clone(), exp.clone());
        }
        product
    }

    fn push_factor(&mut self, base: Expr, exp: Expr) {
        match self.factors.iter().position(|(b, _)| *b == base) {
            Some(pos) => {
                let merged = add_exponents(&self.factors[pos].1, &exp);
                if merged.is_zero() {
                    self.factors.remove(pos);
                } else {
                    self.factors[pos].1 = merged;
                }
            }
            None => {
                if !exp.is_zero() {
                    self.factors.push((base, exp))
                }
            }
        }
    }

    fn powi(&self, n: f64) -> Term {
        Term {
            coeff: self.coeff.powi(n as i32),
            factors: self
                .factors
                .iter()
                .map(|(b, e)| (b.clone(), scale_exponent(e, n)))
                .collect(),
        }
    }

    fn invert(&self) -> Term {
        self.powi(-1.0)
    }

    /// Folds numeric powers into the coefficient and sorts the factors.
    fn canonicalize(mut self) -> Term {
        let mut coeff = self.coeff;
        self.factors.retain(|(base, exp)| match (base, exp) {
            (Expr::Const(b), _) if *b == 1.0 => false,
            (Expr::Const(b), Expr::Const(e)) if is_integer(*e) && (*b != 0.0 || *e > 0.0) => {
                coeff *= b.powi(*e as i32);
                false
            }
            _ => true,
        });
        self.coeff = coeff;
        self.factors
            .sort_by(|a, b| factor_rank(&a.0).cmp(&factor_rank(&b.0)).then_with(|| a.0.to_string().cmp(&b.0.to_string())));
        self
    }

    /// Sum of the numeric exponents of the free symbols, used for ordering.
    fn degree(&self) -> f64 {
        self.factors
            .iter()
            .filter_map(|(base, exp)| match (base, exp) {
                (Expr::Var(name), Expr::Const(e)) if named_constant(name).is_none() => Some(*e),
                _ => None,
            })
            .sum()
    }

    /// Splits the term into the part that does not depend on `var` and the part that does.
    /// The dependent part always has coefficient 1.
    pub fn split(&self, var: &str) -> (Term, Term) {
        let (dependent, independent): (Vec<_>, Vec<_>) = self
            .factors
            .iter()
            .cloned()
            .partition(|(b, e)| b.contains_variable(var) || e.contains_variable(var));
        (
            Term { coeff: self.coeff, factors: independent },
            Term { coeff: 1.0, factors: dependent },
        )
    }

    /// The term as an expression, sign included.
    pub fn to_expr(&self) -> Expr {
        let magnitude = self.magnitude_expr();
        if self.coeff < 0.0 {
            match magnitude {
                Expr::Const(v) => Expr::Const(-v),
                other => Expr::Mul(Box::new(Expr::Const(-1.0)), Box::new(other)),
            }
        } else {
            magnitude
        }
    }

    /// The term without its sign: rational coefficient split into numerator and
    /// denominator, negative numeric exponents moved below the fraction bar.
    fn magnitude_expr(&self) -> Expr {
        let abs = self.coeff.abs();
        let (p, q) = rational_approximation(abs);
        let mut numerator = Vec::new();
        let mut denominator = Vec::new();
        if q != 1.0 {
            denominator.push(Expr::Const(q));
        }
        for (base, exp) in &self.factors {
            match exp {
                Expr::Const(e) if *e < 0.0 => denominator.push(power_expr(base, &Expr::Const(-e))),
                _ => numerator.push(power_expr(base, exp)),
            }
        }
        let numerator = match (product(numerator), p == 1.0) {
            (Some(n), true) => n,
            (Some(n), false) => Expr::Mul(Box::new(Expr::Const(p)), Box::new(n)),
            (None, _) => Expr::Const(p),
        };
        match product(denominator) {
            Some(d) => Expr::Div(Box::new(numerator), Box::new(d)),
            None => numerator,
        }
    }
}

fn power_expr(base: &Expr, exp: &Expr) -> Expr {
    match exp {
        Expr::Const(e) if *e == 1.0 => base.clone(),
        _ => Expr::Pow(Box::new(base.clone()), Box::new(exp.clone())),
    }
}

fn product(factors: Vec<Expr>) -> Option<Expr> {
    factors
        .into_iter()
        .reduce(|acc, f| Expr::Mul(Box::new(acc), Box::new(f)))
}

fn factor_rank(base: &Expr) -> u8 {
    match base {
        Expr::Var(_) => 0,
        Expr::Const(_) => 1,
        Expr::Add(..) | Expr::Sub(..) | Expr::Mul(..) | Expr::Div(..) | Expr::Pow(..) => 2,
        _ => 3,
    }
}

fn add_exponents(a: &Expr, b: &Expr) -> Expr {
    match (a, b) {
        (Expr::Const(x), Expr::Const(y)) => Expr::Const(x + y),
        _ => Expr::Add(Box::new(a.clone()), Box::new(b.clone())).simplify(),
    }
}

fn scale_exponent(e: &Expr, n: f64) -> Expr {
    match e {
        Expr::Const(x) => Expr::Const(x * n),
        _ => Expr::Mul(Box::new(Expr::Const(n)), Box::new(e.clone())).simplify(),
    }
}

/// Merges terms with equal factor lists and drops the ones that cancel.
fn collect_like_terms(terms: Vec<Term>) -> Vec<Term> {
    let mut collected: Vec<Term> = Vec::new();
    for term in terms.into_iter().map(Term::canonicalize) {
        match collected.iter_mut().find(|t| t.factors == term.factors) {
            Some(existing) => existing.coeff += term.coeff,
            None => collected.push(term),
        }
    }
    collected.retain(|t| t.coeff.is_nan() || t.coeff.abs() > ZERO_TOLERANCE);
    collected
}

fn negate(terms: Vec<Term>) -> Vec<Term> {
    terms
        .into_iter()
        .map(|mut t| {
            t.coeff = -t.coeff;
            t
        })
        .collect()
}

/// Turns a list of terms that stays a sum into a single opaque factor.
fn as_single_term(terms: Vec<Term>) -> Term {
    if terms.len() == 1 {
        terms.into_iter().next().unwrap_or_else(|| Term::constant(0.0))
    } else {
        Term::factor(rebuild_sum(terms), Expr::Const(1.0))
    }
}

fn multiply_sums(lhs: Vec<Term>, rhs: Vec<Term>, expand: bool) -> Vec<Term> {
    if lhs.is_empty() || rhs.is_empty() {
        return Vec::new();
    }
    let scalar = |t: &Vec<Term>| t.len() == 1 && t[0].is_constant();
    if expand || lhs.len() == 1 && rhs.len() == 1 || scalar(&lhs) || scalar(&rhs) {
        let mut out = Vec::with_capacity(lhs.len() * rhs.len());
        for a in &lhs {
            for b in &rhs {
                out.push(a.mul(b));
            }
        }
        return collect_like_terms(out);
    }
    vec![as_single_term(lhs).mul(&as_single_term(rhs))]
}

fn invert_sum(terms: Vec<Term>) -> Vec<Term> {
    match terms.len() {
        0 => vec![Term::factor(Expr::Const(0.0), Expr::Const(-1.0))],
        1 => vec![terms[0].invert()],
        _ => vec![Term::factor(rebuild_sum(terms), Expr::Const(-1.0))],
    }
}

fn power_terms(base: &Expr, exp: &Expr, expand: bool) -> Vec<Term> {
    let exp = exp.simplify();
    let base_terms = to_terms(base, expand);
    let n = match exp {
        Expr::Const(n) => n,
        _ => {
            let base = rebuild_sum(base_terms);
            if base == Expr::Var("E".to_string()) {
                return function_terms(&Expr::Exp(Box::new(exp)), expand);
            }
            return vec![Term::factor(base, exp)];
        }
    };
    if n == 0.0 {
        return vec![Term::constant(1.0)];
    }
    if n == 1.0 {
        return base_terms;
    }
    match base_terms.len() {
        0 if n > 0.0 => Vec::new(),
        0 => vec![Term::factor(Expr::Const(0.0), Expr::Const(n))],
        1 => {
            let term = &base_terms[0];
            if is_integer(n) {
                return vec![term.powi(n)];
            }
            if term.is_constant() {
                let value = term.coeff.powf(n);
                if term.coeff > 0.0 && is_integer(value) {
                    return vec![Term::constant(value)];
                }
                return vec![Term::factor(Expr::Const(term.coeff), Expr::Const(n))];
            }
            if term.coeff == 1.0 && term.factors.len() == 1 {
                let (b, e) = &term.factors[0];
                if *e == Expr::Const(1.0) {
                    return vec![Term::factor(b.clone(), Expr::Const(n))];
                }
            }
            vec![Term::factor(term.to_expr(), Expr::Const(n))]
        }
        _ => {
            if expand && is_integer(n) && n > 1.0 && n <= 10.0 {
                let mut result = base_terms.clone();
                for _ in 1..(n as usize) {
                    result = multiply_sums(result, base_terms.clone(), true);
                }
                return result;
            }
            vec![Term::factor(rebuild_sum(base_terms), Expr::Const(n))]
        }
    }
}

/// Exact values and symmetries of the elementary functions.
/// Returns `None` when the call stays as it is.
fn fold_function(f: &Expr) -> Option<Expr> {
    let arg = f.function_argument()?;
    if let Expr::Const(v) = arg {
        let v = *v;
        let exact = match f {
            Expr::Exp(_) if v == 0.0 => Some(1.0),
            Expr::Ln(_) if v == 1.0 => Some(0.0),
            Expr::sin(_) | Expr::tg(_) | Expr::arcsin(_) | Expr::arctg(_) if v == 0.0 => Some(0.0),
            Expr::cos(_) if v == 0.0 => Some(1.0),
            Expr::arccos(_) if v == 1.0 => Some(0.0),
            _ => None,
        };
        if exact.is_some() {
            return exact.map(Expr::Const);
        }
    }
    if let (Expr::Exp(_), Expr::Ln(inner)) = (f, arg) {
        return Some(*inner.clone());
    }
    let positive = strip_negative(arg)?;
    match f {
        Expr::sin(_) | Expr::tg(_) | Expr::ctg(_) | Expr::arcsin(_) | Expr::arctg(_) => {
            Some(-f.with_argument(positive))
        }
        Expr::cos(_) => Some(f.with_argument(positive)),
        _ => None,
    }
}

fn function_terms(f: &Expr, expand: bool) -> Vec<Term> {
    let arg = match f.function_argument() {
        Some(arg) => arg.simplify(),
        None => return vec![Term::factor(f.clone(), Expr::Const(1.0))],
    };
    let call = f.with_argument(arg);
    match fold_function(&call) {
        Some(folded) => to_terms(&folded, expand),
        None => vec![Term::factor(call, Expr::Const(1.0))],
    }
}

/// Flattens an expression into canonical terms. With `expand` products of sums and
/// small integer powers of sums are multiplied out.
pub fn to_terms(expr: &Expr, expand: bool) -> Vec<Term> {
    let terms = match expr {
        Expr::Const(c) if *c == 0.0 => Vec::new(),
        Expr::Const(c) => vec![Term::constant(*c)],
        Expr::Var(_) => vec![Term::factor(expr.clone(), Expr::Const(1.0))],
        Expr::Add(a, b) => {
            let mut terms = to_terms(a, expand);
            terms.extend(to_terms(b, expand));
            terms
        }
        Expr::Sub(a, b) => {
            let mut terms = to_terms(a, expand);
            terms.extend(negate(to_terms(b, expand)));
            terms
        }
        Expr::Mul(a, b) => multiply_sums(to_terms(a, expand), to_terms(b, expand), expand),
        Expr::Div(a, b) => multiply_sums(to_terms(a, expand), invert_sum(to_terms(b, expand)), expand),
        Expr::Pow(base, exp) => power_terms(base, exp, expand),
        _ => function_terms(expr, expand),
    };
    collect_like_terms(terms)
}

fn term_order(a: &Term, b: &Term) -> Ordering {
    b.degree()
        .partial_cmp(&a.degree())
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.is_constant().cmp(&b.is_constant()))
        .then_with(|| b.magnitude_expr().to_string().cmp(&a.magnitude_expr().to_string()))
}

/// Builds the expression of a sum of terms, in display order.
pub fn rebuild_sum(mut terms: Vec<Term>) -> Expr {
    terms.sort_by(term_order);
    let mut iter = terms.into_iter();
    let Some(first) = iter.next() else {
        return Expr::Const(0.0);
    };
    iter.fold(first.to_expr(), |acc, term| {
        if term.coeff < 0.0 {
            Expr::Sub(Box::new(acc), Box::new(term.magnitude_expr()))
        } else {
            Expr::Add(Box::new(acc), Box::new(term.to_expr()))
        }
    })
}

impl Expr {
    //___________________________________SIMPLIFICATION____________________________________

    /// Canonical simplified form of the expression.
    ///
    /// # Examples
    /// ```rust, ignore
    /// let expr = Expr::parse_expression("x*x + 2*x - x").unwrap();
    /// assert_eq!(expr.simplify().to_string(), "x**2 + x");
    /// ```
    pub fn simplify(&self) -> Expr {
        rebuild_sum(to_terms(self, false))
    }

    /// Like `simplify`, but products of sums and integer powers (up to 10) of sums are
    /// multiplied out: `(x + 1)**2` becomes `x**2 + 2*x + 1`.
    pub fn expand(&self) -> Expr {
        rebuild_sum(to_terms(self, true))
    }

    /// Additive terms of the simplified expression.
    pub fn terms(&self) -> Vec<Term> {
        to_terms(self, false)
    }

    /// Writes the expression as `a*var + b` with `a` and `b` free of `var` and `a != 0`.
    /// Returns `None` for anything that is not linear in `var`.
    pub fn linear_coeffs(&self, var: &str) -> Option<(Expr, Expr)> {
        let mut slope = Vec::new();
        let mut intercept = Vec::new();
        for term in self.terms() {
            let (independent, dependent) = term.split(var);
            if dependent.is_constant() {
                intercept.push(independent);
            } else if dependent.factors == [(Expr::Var(var.to_string()), Expr::Const(1.0))] {
                slope.push(independent);
            } else {
                return None;
            }
        }
        let slope = collect_like_terms(slope);
        if slope.is_empty() {
            return None;
        }
        Some((rebuild_sum(slope), rebuild_sum(intercept)))
    }
}
