//! Step-by-step explanation shown next to the result.
//!
//! The steps are a keyword heuristic over the raw input text, not a trace of the
//! integrator: the input is split on `+`, every piece is classified by the substrings it
//! contains and a canned rule is printed for it. Only the final result and the definite
//! value come from the actual computation. All strings are LaTeX for MathJax.

use strum_macros::{Display, EnumIter};

/// `x**2*sin(x)` -> `x^2\,sin(x)`
pub fn latex_form(text: &str) -> String {
    text.replace("**", "^").replace('*', r"\,")
}

/// Rule announced for one term. Classification is by substring, first match wins, in
/// declaration order (the three trigonometric variants share one caption).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum TermRule {
    Sine,
    Cosine,
    Tangent,
    Logarithm,
    Exponential,
    Power,
    Linear,
    Constant,
}

impl TermRule {
    pub fn classify(term: &str) -> TermRule {
        let has = |needle: &str| term.contains(needle);
        if has("sin") || has("cos") || has("tan") {
            if has("sin") {
                TermRule::Sine
            } else if has("cos") {
                TermRule::Cosine
            } else {
                TermRule::Tangent
            }
        } else if has("log") || has("ln") {
            TermRule::Logarithm
        } else if has("exp") || has("e^") {
            TermRule::Exponential
        } else if has("x**") {
            TermRule::Power
        } else if has("x") {
            TermRule::Linear
        } else {
            TermRule::Constant
        }
    }

    pub fn caption(&self) -> &'static str {
        match self {
            TermRule::Sine | TermRule::Cosine | TermRule::Tangent => {
                "la regla de integración trigonométrica"
            }
            TermRule::Logarithm => "la integración por partes",
            TermRule::Exponential => "la regla de integración exponencial",
            TermRule::Power => "la regla de integración de potencias",
            TermRule::Linear => "la regla de integración lineal",
            TermRule::Constant => "la regla para constantes",
        }
    }

    pub fn fact(&self) -> &'static str {
        match self {
            TermRule::Sine => r"   \( \int \sin(x) \, dx = -\cos(x) \)",
            TermRule::Cosine => r"   \( \int \cos(x) \, dx = \sin(x) \)",
            TermRule::Tangent => r"   \( \int \tan(x) \, dx = \ln(\cos(x)) \)",
            TermRule::Logarithm => r"   \( \int \ln(x) \, dx = x \ln(x) - x + C \)",
            TermRule::Exponential => r"   \( \int e^x \, dx = e^x \)",
            TermRule::Power => r"   \( \int x^n \, dx = \frac{x^{n+1}}{n+1} \)",
            TermRule::Linear => r"   \( \int ax \, dx = \frac{ax^2}{2} \)",
            TermRule::Constant => r"   \( \int a \, dx = ax \)",
        }
    }
}

/// Steps for the indefinite integral. `indefinite` is the already formatted result.
pub fn explain(expression: &str, indefinite: &str) -> Vec<String> {
    let whole = latex_form(expression);
    let mut steps = vec![format!(r"Problema: \( \int {} \, dx \)", whole)];
    let terms: Vec<&str> = expression.split('+').map(str::trim).collect();
    if terms.len() > 1 {
        steps.push("1. Descomponer la integral en términos:".to_string());
        for term in &terms {
            steps.push(format!(r"   \( \int {} \, dx \)", latex_form(term)));
        }
    } else {
        steps.push(format!(
            r"1. Resolver la integral directamente para \( \int {} \, dx \)",
            whole
        ));
    }
    for term in &terms {
        let rule = TermRule::classify(term);
        steps.push(format!(r"2. Aplicar {} a \( {} \):", rule.caption(), latex_form(term)));
        steps.push(rule.fact().to_string());
    }
    steps.push("3. Sumar los resultados parciales:".to_string());
    steps.push(format!(r"   Resultado final: \( {} + C \)", indefinite));
    steps
}

/// The two lines appended when both bounds were given. Bounds keep their decimal point
/// (`0.0`, `1.0`); the value is printed in its shortest form (`0.5`, `2`).
pub fn definite_steps(expression: &str, lower: f64, upper: f64, value: f64) -> [String; 2] {
    [
        format!(
            r"4. Valor de la integral definida con límites \( {:?} \) y \( {:?} \):",
            lower, upper
        ),
        format!(
            r"   \( \int_{{{:?}}}^{{{:?}}} {} \, dx = {} \)",
            lower,
            upper,
            latex_form(expression),
            value
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_classify_precedence() {
        assert_eq!(TermRule::classify("sin(x)*cos(x)"), TermRule::Sine);
        assert_eq!(TermRule::classify("cos(x)"), TermRule::Cosine);
        assert_eq!(TermRule::classify("tan(x)"), TermRule::Tangent);
        assert_eq!(TermRule::classify("x*log(x)"), TermRule::Logarithm);
        assert_eq!(TermRule::classify("exp(2*x)"), TermRule::Exponential);
        assert_eq!(TermRule::classify("x**3"), TermRule::Power);
        assert_eq!(TermRule::classify("3*x"), TermRule::Linear);
        assert_eq!(TermRule::classify("7"), TermRule::Constant);
        // substring match: "asin" is trigonometric, "ln" inside a name counts too
        assert_eq!(TermRule::classify("asin(x)"), TermRule::Sine);
    }

    #[test]
    fn test_every_rule_has_text() {
        for rule in TermRule::iter() {
            assert!(rule.caption().starts_with("la "), "{}", rule);
            assert!(rule.fact().starts_with(r"   \( \int"), "{}", rule);
        }
    }

    #[test]
    fn test_single_term() {
        let steps = explain("x**2", "x^3/3");
        assert_eq!(
            steps,
            vec![
                r"Problema: \( \int x^2 \, dx \)".to_string(),
                r"1. Resolver la integral directamente para \( \int x^2 \, dx \)".to_string(),
                r"2. Aplicar la regla de integración de potencias a \( x^2 \):".to_string(),
                r"   \( \int x^n \, dx = \frac{x^{n+1}}{n+1} \)".to_string(),
                "3. Sumar los resultados parciales:".to_string(),
                r"   Resultado final: \( x^3/3 + C \)".to_string(),
            ]
        );
    }

    #[test]
    fn test_sum_is_decomposed() {
        let steps = explain("sin(x)+x**2", r"x^3/3 - cos(x)");
        assert_eq!(steps[1], "1. Descomponer la integral en términos:");
        assert_eq!(steps[2], r"   \( \int sin(x) \, dx \)");
        assert_eq!(steps[3], r"   \( \int x^2 \, dx \)");
        let applied: Vec<&String> = steps.iter().filter(|s| s.starts_with("2. Aplicar")).collect();
        assert_eq!(applied.len(), 2);
        assert!(applied[0].contains("trigonométrica"));
        assert!(applied[1].contains("potencias"));
    }

    #[test]
    fn test_definite_steps_format() {
        let [caption, value] = definite_steps("x", 0.0, 1.0, 0.5);
        assert_eq!(caption, r"4. Valor de la integral definida con límites \( 0.0 \) y \( 1.0 \):");
        assert_eq!(value, r"   \( \int_{0.0}^{1.0} x \, dx = 0.5 \)");
        let [_, value] = definite_steps("3*x**2", 0.0, 2.5, 2.0);
        assert!(value.ends_with(r"3\,x^2 \, dx = 2 \)"));
    }
}
