#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
/// a module turns a String expression into a symbolic expression
///
///# Example
/// ```
/// use RustedIntegrals::symbolic::symbolic_engine::Expr;
/// let parsed = Expr::parse_expression("x**2 + e**x").unwrap();
/// assert_eq!(parsed.to_string(), "x**2 + exp(x)");
///  ```
/// ________________________________________________________________________________________________________________________________
pub mod parse_expr;
///____________________________________________________________________________________________________________________________
/// # Symbolic engine
/// a module
/// 1) holds the expression tree and its arithmetic
/// 2) prints an expression back in the usual `x**2/2` notation
///# Example#
/// ```
/// use RustedIntegrals::symbolic::symbolic_engine::Expr;
/// let x = Expr::Var("x".to_string());
/// let f = x.clone() * x + Expr::Const(1.0);
/// let df_dx = f.diff("x").simplify();
/// assert_eq!(df_dx.to_string(), "2*x");
/// ```
/// ________________________________________________________________________________________________________________________________________________
pub mod symbolic_engine;
pub mod symbolic_engine_derivatives;
/// closures and vectorised evaluation of expressions
pub mod symbolic_lambdify;
///______________________________________________________________________________________________________________________________________________
/// algebraic simplification: constant folding, like terms, powers of products
/// _____________________________________________________________________________________________________________________________________________
pub mod symbolic_simplify;
///______________________________________________________________________________________________________________________________________________
/// indefinite integration by a rule table, definite integration and Simpson quadrature
///# Example#
/// ```
/// use RustedIntegrals::symbolic::symbolic_engine::Expr;
/// let f = Expr::parse_expression("x**2").unwrap();
/// assert_eq!(f.integrate("x").unwrap().to_string(), "x**3/3");
/// let value = f.definite_integrate("x", 0.0, 3.0, 1000).unwrap();
/// assert!((value - 9.0).abs() < 1e-12);
/// ```
/// _____________________________________________________________________________________________________________________________________________
pub mod symbolic_integration;
