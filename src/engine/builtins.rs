//! # Primitivas del Entorno de Scripts
//! src/engine/builtins.rs
//!
//! Primitivas que el runtime ofrece al script embebido:
//!
//! - `print(valor)`: imprime exactamente un valor por stdout. Llamarla con
//!   cero o más de un argumento falla con un error de aridad atrapable.
//! - `sync_call_back(cb, valor)`: invoca el callback inmediatamente (de
//!   forma síncrona) pasándole exactamente un valor auxiliar, y devuelve lo
//!   que el callback retorne.
//!
//! Estas primitivas se ejecutan en el contexto del script (durante la fase
//! de registro, antes de arrancar cualquier servidor), así que no pasan por
//! el Callback Gate.

use super::error::ScriptError;
use super::value::Value;

/// Valida la cantidad exacta de argumentos de una primitiva
pub fn check_arity(expected: usize, got: usize) -> Result<(), ScriptError> {
    if expected != got {
        return Err(ScriptError::Arity { expected, got });
    }
    Ok(())
}

/// Primitiva de logging: imprime un único valor, de cualquier tipo
///
/// # Errores
///
/// `ScriptError::Arity` si `args` no tiene exactamente un elemento.
///
/// # Ejemplo
/// ```
/// use script_server::engine::{builtins, Value};
///
/// builtins::print(&[Value::from("hola")]).unwrap();
/// assert!(builtins::print(&[]).is_err());
/// ```
pub fn print(args: &[Value]) -> Result<(), ScriptError> {
    check_arity(1, args.len())?;
    println!("{}", args[0]);
    Ok(())
}

/// Primitiva de notificación síncrona one-shot
///
/// Invoca `callback` inmediatamente, pasándole solo el valor auxiliar, y
/// retorna su resultado al caller.
///
/// # Errores
///
/// `ScriptError::Arity` si `args` no tiene exactamente un valor auxiliar.
/// Un error del propio callback se propaga tal cual (es atrapable).
pub fn sync_call_back<F>(mut callback: F, args: &[Value]) -> Result<Value, ScriptError>
where
    F: FnMut(&Value) -> Result<Value, ScriptError>,
{
    check_arity(1, args.len())?;
    callback(&args[0])
}
