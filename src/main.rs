//! # Script Server - Entry Point
//! src/main.rs
//!
//! Punto de entrada del runtime. Registra la app de ejemplo elegida por
//! `--app` (el análogo de ejecutar el script del usuario) y arranca el
//! modelo de servidor que la app haya dejado registrado.

use script_server::apps;
use script_server::config::Config;
use script_server::engine::Engine;
use script_server::server;

fn main() {
    println!("=================================");
    println!("  Script Server");
    println!("  Runtime embebido de servidores");
    println!("=================================\n");

    let config = Config::new();
    if let Err(e) = config.validate() {
        eprintln!("💥 Configuración inválida: {}", e);
        std::process::exit(1);
    }

    println!("⚙️  Configuración:");
    println!("   App: {}", config.app);
    println!("   Puerto: {}", config.port);
    println!("   Host: {}", config.host);
    println!();

    // Fase de script: registrar callbacks en el engine
    let engine = Engine::new();
    let registered = match config.app.as_str() {
        "print" => apps::run_print_demo(&engine),
        "raw" => apps::register_raw_echo(&engine, config.port),
        "pool" => apps::register_pool_app(&engine, config.port),
        "event-loop" => apps::register_event_loop_app(&engine, config.port),
        "telemetry" => apps::register_telemetry_app(&engine, config.port),
        other => {
            eprintln!(
                "💥 App desconocida: {} (opciones: print, raw, pool, event-loop, telemetry)",
                other
            );
            std::process::exit(1);
        }
    };

    if let Err(e) = registered {
        eprintln!("💥 Error ejecutando la app: {}", e);
        std::process::exit(1);
    }

    // Fase de servicio: arrancar el modelo registrado (bloquea el thread)
    if let Err(e) = server::start(&engine, &config) {
        eprintln!("💥 Error fatal: {}", e);
        std::process::exit(1);
    }
}
