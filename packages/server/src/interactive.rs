//! Interactive mode for the server.
//!
//! Prompts for bind address and port (and the API key when it is not set)
//! before starting the server.

use dialoguer::{Confirm, Input};

/// Runs the server in interactive mode, prompting for configuration.
///
/// Asks for a bind address and port, sets `BIND_ADDR` and `PORT`, and
/// delegates to [`super::run_server`]. Defaults come from those variables
/// when already set.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the underlying server fails to
/// start.
#[allow(clippy::future_not_send)]
pub async fn run() -> std::io::Result<()> {
    println!("Visitor Map Server");
    println!();

    let default_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let bind_addr: String = Input::new()
        .with_prompt("Bind address")
        .default(default_addr.clone())
        .interact_text()
        .unwrap_or(default_addr);

    let default_port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let port_str: String = Input::new()
        .with_prompt("Port")
        .validate_with(|input: &String| {
            input
                .parse::<u16>()
                .map(|_| ())
                .map_err(|_| "Port must be a number between 0 and 65535")
        })
        .default(default_port.clone())
        .interact_text()
        .unwrap_or(default_port);

    if std::env::var("SEOUL_API_KEY").is_err() {
        let api_key: String = Input::new()
            .with_prompt("Seoul open-data API key")
            .interact_text()
            .unwrap_or_default();
        // SAFETY: single-threaded at this point; read once during startup.
        unsafe {
            std::env::set_var("SEOUL_API_KEY", api_key);
        }
    }

    // SAFETY: single-threaded at this point; read once during startup.
    unsafe {
        std::env::set_var("BIND_ADDR", &bind_addr);
        std::env::set_var("PORT", &port_str);
    }

    if !Confirm::new()
        .with_prompt(format!("Start server on {bind_addr}:{port_str}?"))
        .default(true)
        .interact()
        .unwrap_or(true)
    {
        println!("Cancelled.");
        return Ok(());
    }

    super::run_server().await
}
