use thiserror::Error;

/// Everything that can go wrong while answering `POST /calculate-integral`.
/// The `Display` text is what the client receives in `{"error": ...}`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntegralError {
    /// The reason is only logged; the client gets the fixed message.
    #[error("Error en la expresión matemática proporcionada.")]
    Parse(String),
    #[error("No se pudo calcular la integral indefinida: {0}")]
    Integration(String),
    #[error("Error al calcular la integral definida: {0}")]
    DefiniteIntegral(String),
    #[error("Error al evaluar la función: {0}")]
    Evaluation(String),
    #[error("Error al generar la gráfica: {0}")]
    Plot(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            IntegralError::Parse("unexpected '*'".into()).to_string(),
            "Error en la expresión matemática proporcionada."
        );
        assert_eq!(
            IntegralError::DefiniteIntegral("diverges".into()).to_string(),
            "Error al calcular la integral definida: diverges"
        );
        assert_eq!(
            IntegralError::Evaluation("la variable 'y' no está definida".into()).to_string(),
            "Error al evaluar la función: la variable 'y' no está definida"
        );
    }
}
