//! # Configuración del Servidor
//! src/config.rs
//!
//! Este módulo define la configuración del runtime con soporte para
//! argumentos CLI y variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./script_server --app event-loop \
//!   --port 8080 \
//!   --pool-workers 4 \
//!   --queue-capacity 128
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! SRV_PORT=8080 SRV_HOST=0.0.0.0 ./script_server --app pool
//! ```

use clap::Parser;

/// Configuración del runtime de servidores
#[derive(Debug, Clone, Parser)]
#[command(name = "script_server")]
#[command(about = "Runtime embebido con primitivas de red para un entorno de scripts")]
#[command(version = "0.1.0")]
pub struct Config {
    /// App de ejemplo a registrar (print, raw, pool, event-loop, telemetry)
    #[arg(long, default_value = "event-loop", env = "SRV_APP")]
    pub app: String,

    /// Puerto en el que escucha el servidor registrado
    #[arg(short, long, default_value = "8080", env = "SRV_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "SRV_HOST")]
    pub host: String,

    // === Pool de threads (modelo thread pool) ===
    /// Número de threads del pool; acota las conexiones atendidas en paralelo
    #[arg(long = "pool-workers", default_value = "4", env = "SRV_POOL_WORKERS")]
    pub pool_workers: usize,

    /// Capacidad de la cola de conexiones pendientes del pool
    #[arg(long = "queue-capacity", default_value = "128", env = "SRV_QUEUE_CAPACITY")]
    pub queue_capacity: usize,

    /// Timeout de lectura por conexión en el pool (milisegundos)
    #[arg(long = "read-timeout-ms", default_value = "5000", env = "SRV_READ_TIMEOUT_MS")]
    pub read_timeout_ms: u64,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<(), String> {
        if self.pool_workers == 0 {
            return Err("pool-workers debe ser al menos 1".to_string());
        }
        if self.queue_capacity == 0 {
            return Err("queue-capacity debe ser al menos 1".to_string());
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: "event-loop".to_string(),
            port: 8080,
            host: "127.0.0.1".to_string(),
            pool_workers: 4,
            queue_capacity: 128,
            read_timeout_ms: 5000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_address() {
        let config = Config::default();
        assert_eq!(config.address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let config = Config {
            pool_workers: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(Config::default().validate().is_ok());
    }
}
