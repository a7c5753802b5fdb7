//! # Script Server
//! src/lib.rs
//!
//! Runtime embebido que expone primitivas de red a un entorno de scripts.
//! El script registra callbacks para responder streams de socket crudo,
//! requests HTTP despachados a un pool de threads, o requests HTTP en un
//! event loop de un solo thread con timers integrados. El entorno de
//! scripts no tolera entrada concurrente: toda invocación pasa por un único
//! punto de serialización (el Callback Gate).
//!
//! ## Arquitectura
//!
//! El runtime está dividido en módulos especializados:
//! - `http`: framing de mensajes, parsing HTTP/1.1 y serialización de
//!   responses (componentes puros, compartidos por los servidores)
//! - `engine`: la frontera con el entorno de scripts (valores, primitivas
//!   `print`/`syncCallBack`, registro de callbacks y el Callback Gate)
//! - `server`: los tres modelos de servicio (socket crudo, pool de threads,
//!   event loop con timers)
//! - `telemetry`: contadores de proceso y el payload de `/telemetry`
//! - `config`: configuración CLI/env
//! - `apps`: aplicaciones de ejemplo que ejercitan la API de registro
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use script_server::config::Config;
//! use script_server::engine::Engine;
//! use script_server::{apps, server};
//!
//! let config = Config::default();
//! let engine = Engine::new();
//! apps::register_raw_echo(&engine, config.port).expect("registro");
//! server::start(&engine, &config).expect("Error al iniciar servidor");
//! ```

pub mod apps;
pub mod config;
pub mod engine;
pub mod http;
pub mod server;
pub mod telemetry;
