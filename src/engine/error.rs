//! # Errores del Entorno de Scripts
//! src/engine/error.rs
//!
//! Taxonomía de errores en la frontera con el entorno de scripts:
//!
//! - `Arity`: cantidad incorrecta de argumentos a una primitiva (`print`,
//!   `syncCallBack`). Es un error *atrapable* por el caller, nunca tumba el
//!   proceso.
//! - `Callback`: error levantado dentro de un callback del script. El
//!   Callback Gate lo atrapa en la frontera: los servidores HTTP lo
//!   convierten en una respuesta 5xx y los modelos raw/timer lo loguean y
//!   siguen.
//! - `NoHandler`: se intentó despachar sin que el script registrara un
//!   callback para ese rol.

/// Error en la frontera del entorno de scripts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// Cantidad incorrecta de argumentos a una primitiva
    Arity { expected: usize, got: usize },

    /// Error producido dentro de un callback del script
    Callback(String),

    /// No hay callback registrado para el rol solicitado
    NoHandler,
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScriptError::Arity { expected, got } => {
                write!(f, "expected exactly {} argument(s), got {}", expected, got)
            }
            ScriptError::Callback(msg) => write!(f, "callback error: {}", msg),
            ScriptError::NoHandler => write!(f, "no script callback registered"),
        }
    }
}

impl std::error::Error for ScriptError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_arity() {
        let err = ScriptError::Arity {
            expected: 1,
            got: 3,
        };
        assert_eq!(err.to_string(), "expected exactly 1 argument(s), got 3");
    }

    #[test]
    fn test_display_callback() {
        let err = ScriptError::Callback("boom".to_string());
        assert!(err.to_string().contains("boom"));
    }
}
