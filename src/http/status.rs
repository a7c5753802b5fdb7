//! # Códigos de Estado HTTP
//! src/http/status.rs
//!
//! Los callbacks del entorno de scripts devuelven el código de estado como
//! un entero arbitrario (convencionalmente 100-599), así que este módulo no
//! define un enum cerrado: trabaja con `u16` y mapea cada código a su
//! reason phrase estándar.

/// Retorna el texto de razón (reason phrase) asociado a un código de estado
///
/// Los códigos conocidos usan el texto definido en los RFC. Para códigos
/// desconocidos se usa un texto genérico según la clase (2xx, 4xx, etc.).
///
/// # Ejemplo
/// ```
/// use script_server::http::status::reason_phrase;
/// assert_eq!(reason_phrase(200), "OK");
/// assert_eq!(reason_phrase(404), "Not Found");
/// assert_eq!(reason_phrase(599), "Server Error");
/// ```
pub fn reason_phrase(code: u16) -> &'static str {
    match code {
        100 => "Continue",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        409 => "Conflict",
        411 => "Length Required",
        413 => "Payload Too Large",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        503 => "Service Unavailable",
        _ => match code / 100 {
            1 => "Informational",
            2 => "Success",
            3 => "Redirection",
            4 => "Client Error",
            5 => "Server Error",
            _ => "Unknown",
        },
    }
}

/// Verifica si un código indica éxito (2xx)
pub fn is_success(code: u16) -> bool {
    (200..300).contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(reason_phrase(200), "OK");
        assert_eq!(reason_phrase(400), "Bad Request");
        assert_eq!(reason_phrase(500), "Internal Server Error");
    }

    #[test]
    fn test_unknown_codes_fall_back_to_class() {
        assert_eq!(reason_phrase(299), "Success");
        assert_eq!(reason_phrase(455), "Client Error");
        assert_eq!(reason_phrase(999), "Unknown");
    }

    #[test]
    fn test_is_success() {
        assert!(is_success(200));
        assert!(is_success(204));
        assert!(!is_success(404));
    }
}
