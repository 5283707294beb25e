use crate::symbolic::symbolic_engine::Expr;
use log::debug;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, digit0, digit1, multispace0, one_of},
    combinator::{all_consuming, map, map_res, not, opt, recognize},
    error::{Error, ErrorKind},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated},
};
use regex::Regex;
use std::sync::OnceLock;
/// a module turns a String expression into a symbolic expression
///# Example
/// ```
/// use RustedIntegrals::symbolic::symbolic_engine::Expr;
/// let parsed_expression = Expr::parse_expression("x**2 + sin(x)").unwrap();
/// assert_eq!(parsed_expression.to_string(), "x**2 + sin(x)");
/// ```
//                  precedence ladder (loosest first)
//                |  expr    := term (('+' | '-') term)*        |
//                |  term    := unary (('*' | '/') unary)*      |
//                |  unary   := ('-' | '+') unary | power       |
//                |  power   := primary (('**' | '^') unary)?   |
//                |  primary := number | name '(' expr ')'      |
//                |             | name | '(' expr ')'           |
// unary minus binds looser than the power, so -x**2 is -(x**2), and the
// exponent itself may carry a sign: x**-1

/// `e` written as a standalone token right before `**`.
fn euler_power_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(^|[^A-Za-z0-9_.])e\*\*").expect("valid regex"))
}

/// Rewrites `e**<operand>` into `exp(<operand>)` so that Euler's number written as a
/// power reaches the parser as the exponential function. The operand is everything the
/// right-associative power takes: `e**x**2` is `exp(x**2)`. A single parenthesized
/// operand is reused as is, anything else (`x`, `2`, `-x`, `sin(x)`) gets wrapped.
pub fn normalize_input(input: &str) -> String {
    let mut output = String::with_capacity(input.len() + 8);
    let mut rest = input;
    while let Some(captures) = euler_power_pattern().captures(rest) {
        let whole = captures.get(0).map(|m| (m.start(), m.end()));
        let prefix = captures.get(1).map_or("", |m| m.as_str());
        let Some((start, end)) = whole else { break };
        output.push_str(&rest[..start]);
        output.push_str(prefix);
        output.push_str("exp");
        let trimmed = rest[end..].trim_start();
        let operand_len = operand_length(trimmed);
        let operand = &trimmed[..operand_len];
        if trimmed.starts_with('(') && atom_length(trimmed) == operand_len {
            output.push_str(operand);
        } else {
            output.push('(');
            output.push_str(operand);
            output.push(')');
        }
        rest = &trimmed[operand_len..];
    }
    output.push_str(rest);
    output
}

/// Length of one power operand: an optional sign, then a parenthesized group or a
/// number/name with an optional call `(...)`.
fn atom_length(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = 0;
    if i < bytes.len() && (bytes[i] == b'-' || bytes[i] == b'+') {
        i += 1;
    }
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'.') {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'(' {
        let mut depth = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return i + 1;
                    }
                }
                _ => {}
            }
            i += 1;
        }
    }
    i
}

/// Length of the operand that follows `e**`: an atom and any `**`/`^` chain after it.
fn operand_length(s: &str) -> usize {
    let mut len = atom_length(s);
    loop {
        let rest = &s[len..];
        let after_space = rest.trim_start();
        let op_len = if after_space.starts_with("**") {
            2
        } else if after_space.starts_with('^') {
            1
        } else {
            break;
        };
        let exponent = &after_space[op_len..];
        let exponent_trimmed = exponent.trim_start();
        let atom = atom_length(exponent_trimmed);
        if atom == 0 {
            break;
        }
        len += (rest.len() - after_space.len()) + op_len + (exponent.len() - exponent_trimmed.len()) + atom;
    }
    len
}

fn number(input: &str) -> IResult<&str, Expr> {
    let mantissa = alt((
        recognize(pair(digit1, opt(pair(char('.'), digit0)))),
        recognize(pair(char('.'), digit1)),
    ));
    let exponent = opt((one_of("eE"), opt(one_of("+-")), digit1));
    map_res(recognize(pair(mantissa, exponent)), |s: &str| {
        s.parse::<f64>().map(Expr::Const)
    })
    .parse(input)
}

/// Parses a name (word characters without spaces)
fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))
    .parse(input)
}

/// Maps a function name to the expression node. `None` for unknown names.
fn apply_function(name: &str, arg: Expr) -> Option<Expr> {
    let arg = Box::new(arg);
    let expr = match name {
        "sin" => Expr::sin(arg),
        "cos" => Expr::cos(arg),
        "tan" | "tg" => Expr::tg(arg),
        "cot" | "ctg" => Expr::ctg(arg),
        "sec" => Expr::Div(Box::new(Expr::Const(1.0)), Box::new(Expr::cos(arg))),
        "csc" => Expr::Div(Box::new(Expr::Const(1.0)), Box::new(Expr::sin(arg))),
        "asin" | "arcsin" => Expr::arcsin(arg),
        "acos" | "arccos" => Expr::arccos(arg),
        "atan" | "arctan" | "arctg" => Expr::arctg(arg),
        "acot" | "arccot" | "arcctg" => Expr::arcctg(arg),
        "exp" => Expr::Exp(arg),
        "log" | "ln" => Expr::Ln(arg),
        "sqrt" => Expr::Pow(arg, Box::new(Expr::Const(0.5))),
        _ => return None,
    };
    Some(expr)
}

fn call_or_symbol(input: &str) -> IResult<&str, Expr> {
    let (rest, name) = identifier(input)?;
    let call: IResult<&str, Expr> = delimited(
        preceded(multispace0, char('(')),
        expression,
        preceded(multispace0, char(')')),
    )
    .parse(rest);
    match call {
        Ok((after_call, arg)) => match apply_function(name, arg) {
            Some(expr) => Ok((after_call, expr)),
            // an unknown function is a hard error, not a reason to backtrack
            None => Err(nom::Err::Failure(Error::new(input, ErrorKind::Verify))),
        },
        Err(nom::Err::Failure(e)) => Err(nom::Err::Failure(e)),
        Err(_) => Ok((rest, Expr::Var(name.to_string()))),
    }
}

fn parenthesized(input: &str) -> IResult<&str, Expr> {
    delimited(char('('), expression, preceded(multispace0, char(')'))).parse(input)
}

fn primary(input: &str) -> IResult<&str, Expr> {
    preceded(multispace0, alt((number, call_or_symbol, parenthesized))).parse(input)
}

fn power(input: &str) -> IResult<&str, Expr> {
    let (input, base) = primary(input)?;
    let (input, exponent) = opt(preceded(
        pair(multispace0, alt((tag("**"), tag("^")))),
        unary,
    ))
    .parse(input)?;
    Ok(match exponent {
        Some(exponent) => (input, base.pow(exponent)),
        None => (input, base),
    })
}

fn unary(input: &str) -> IResult<&str, Expr> {
    preceded(
        multispace0,
        alt((
            map(preceded(char('-'), unary), |inner| match inner {
                Expr::Const(val) => Expr::Const(-val),
                other => -other,
            }),
            preceded(char('+'), unary),
            power,
        )),
    )
    .parse(input)
}

fn term(input: &str) -> IResult<&str, Expr> {
    let (input, first) = unary(input)?;
    let (input, rest) = many0(pair(
        preceded(
            multispace0,
            alt((terminated(char('*'), not(char('*'))), char('/'))),
        ),
        unary,
    ))
    .parse(input)?;
    let folded = rest.into_iter().fold(first, |acc, (op, rhs)| match op {
        '*' => acc * rhs,
        _ => acc / rhs,
    });
    Ok((input, folded))
}

fn expression(input: &str) -> IResult<&str, Expr> {
    let (input, first) = term(input)?;
    let (input, rest) = many0(pair(preceded(multispace0, one_of("+-")), term)).parse(input)?;
    let folded = rest.into_iter().fold(first, |acc, (op, rhs)| match op {
        '+' => acc + rhs,
        _ => acc - rhs,
    });
    Ok((input, folded))
}

/// Parses the whole input; anything left unparsed is an error.
pub fn parse_expression_func(input: &str) -> Result<Expr, String> {
    match all_consuming(terminated(expression, multispace0)).parse(input) {
        Ok((_, expr)) => Ok(expr),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(format!(
            "cannot parse '{}': unexpected input at '{}'",
            input, e.input
        )),
        Err(nom::Err::Incomplete(_)) => Err(format!("cannot parse '{}': incomplete input", input)),
    }
}

impl Expr {
    /// EXPRESSION PARSING FROM STRINGS

    /// Parses a mathematical expression from its textual form.
    ///
    /// The text is normalized first (`e**x` becomes `exp(x)`), then parsed.
    ///
    /// # Supported Syntax
    /// - Variables: x, y, var_name; `pi` and `E` are constants
    /// - Constants: 3.14, .5, 1e-6
    /// - Operators: +, -, *, /, ** (or ^)
    /// - Functions: sin, cos, tan, cot, sec, csc, asin, acos, atan, acot, exp, log (ln), sqrt
    /// - Parentheses for grouping
    pub fn parse_expression(input: &str) -> Result<Expr, String> {
        let normalized = normalize_input(input);
        let parsed = parse_expression_func(&normalized);
        match &parsed {
            Ok(expr) => debug!("parsed '{}' as {}", normalized, expr),
            Err(err) => debug!("failed to parse '{}': {}", normalized, err),
        }
        parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Box<Expr> {
        Box::new(Expr::Var("x".to_string()))
    }

    #[test]
    fn test_parse_constant() {
        assert_eq!(parse_expression_func("42").unwrap(), Expr::Const(42.0));
        assert_eq!(parse_expression_func(".5").unwrap(), Expr::Const(0.5));
        assert_eq!(parse_expression_func("1e-3").unwrap(), Expr::Const(0.001));
    }

    #[test]
    fn test_parse_variable() {
        assert_eq!(parse_expression_func("x").unwrap(), Expr::Var("x".to_string()));
    }

    #[test]
    fn test_parse_addition() {
        let expr = parse_expression_func("x + 2").unwrap();
        assert_eq!(expr, Expr::Add(x(), Box::new(Expr::Const(2.0))));
    }

    #[test]
    fn test_parse_power_operators() {
        let expected = Expr::Pow(x(), Box::new(Expr::Const(2.0)));
        assert_eq!(parse_expression_func("x**2").unwrap(), expected);
        assert_eq!(parse_expression_func("x^2").unwrap(), expected);
    }

    #[test]
    fn test_power_is_right_associative() {
        let expr = parse_expression_func("2**3**2").unwrap();
        assert_eq!(
            expr,
            Expr::Pow(
                Box::new(Expr::Const(2.0)),
                Box::new(Expr::Pow(Box::new(Expr::Const(3.0)), Box::new(Expr::Const(2.0))))
            )
        );
    }

    #[test]
    fn test_unary_minus_binds_looser_than_power() {
        let expr = parse_expression_func("-x**2").unwrap();
        assert_eq!(expr, -Expr::Pow(x(), Box::new(Expr::Const(2.0))));
        let expr = parse_expression_func("x**-1").unwrap();
        assert_eq!(expr, Expr::Pow(x(), Box::new(Expr::Const(-1.0))));
    }

    #[test]
    fn test_multiplication_before_addition() {
        let expr = parse_expression_func("2*x + 3*x**2").unwrap();
        let expected = Expr::Const(2.0) * Expr::Var("x".to_string())
            + Expr::Const(3.0) * Expr::Pow(x(), Box::new(Expr::Const(2.0)));
        assert_eq!(expr, expected);
    }

    #[test]
    fn test_left_associative_subtraction() {
        let expr = parse_expression_func("x - x - 1").unwrap();
        let expected = (Expr::Var("x".to_string()) - Expr::Var("x".to_string())) - Expr::Const(1.0);
        assert_eq!(expr, expected);
    }

    #[test]
    fn test_parse_functions() {
        assert_eq!(parse_expression_func("sin(x)").unwrap(), Expr::sin(x()));
        assert_eq!(parse_expression_func("tan(x)").unwrap(), Expr::tg(x()));
        assert_eq!(parse_expression_func("ln(x)").unwrap(), Expr::Ln(x()));
        assert_eq!(parse_expression_func("log(x)").unwrap(), Expr::Ln(x()));
        assert_eq!(parse_expression_func("asin(x)").unwrap(), Expr::arcsin(x()));
        assert_eq!(
            parse_expression_func("sqrt(x)").unwrap(),
            Expr::Pow(x(), Box::new(Expr::Const(0.5)))
        );
    }

    #[test]
    fn test_parse_nested_functions_with_spaces() {
        let expr = parse_expression_func(" sin( cos( x ) ) ").unwrap();
        assert_eq!(expr, Expr::sin(Box::new(Expr::cos(x()))));
    }

    #[test]
    fn test_parse_brackets() {
        let expr = parse_expression_func("(x + y) * z").unwrap();
        let expected = (Expr::Var("x".to_string()) + Expr::Var("y".to_string())) * Expr::Var("z".to_string());
        assert_eq!(expr, expected);
    }

    #[test]
    fn test_invalid_expressions() {
        assert!(parse_expression_func("x+*").is_err());
        assert!(parse_expression_func("(x + y").is_err());
        assert!(parse_expression_func("").is_err());
        assert!(parse_expression_func("2x").is_err());
        assert!(parse_expression_func("x**").is_err());
        assert!(parse_expression_func("foo(x)").is_err());
    }

    #[test]
    fn test_normalize_euler_power() {
        assert_eq!(normalize_input("e**x"), "exp(x)");
        assert_eq!(normalize_input("e**(2*x)"), "exp(2*x)");
        assert_eq!(normalize_input("3*e**-x + 1"), "3*exp(-x) + 1");
        assert_eq!(normalize_input("e**sin(x)"), "exp(sin(x))");
        assert_eq!(normalize_input("x**2 + e**x"), "x**2 + exp(x)");
        assert_eq!(normalize_input("e**x**2"), "exp(x**2)");
        assert_eq!(normalize_input("e**-x**2 + 1"), "exp(-x**2) + 1");
        assert_eq!(normalize_input("e**(x)^2*x"), "exp((x)^2)*x");
    }

    #[test]
    fn test_euler_power_tower_parses_as_exp_of_power() {
        assert_eq!(Expr::parse_expression("e**x**2").unwrap().to_string(), "exp(x**2)");
        assert_eq!(Expr::parse_expression("e**-x**2").unwrap().to_string(), "exp(-x**2)");
    }

    #[test]
    fn test_normalize_leaves_identifiers_alone() {
        assert_eq!(normalize_input("the**2"), "the**2");
        assert_eq!(normalize_input("x**2"), "x**2");
    }

    #[test]
    fn test_parse_expression_normalizes_first() {
        let expr = Expr::parse_expression("e**x").unwrap();
        assert_eq!(expr, Expr::Exp(x()));
    }
}
