#![deny(missing_docs)]

//! # RPC REST Web Binary
//!
//! Serves the demo procedures and their OpenAPI document over actix-web.

use actix_web::{App, HttpServer};
use rpc_rest_web::{config::ServerConfig, logging, AppState};
use std::net::TcpListener;
use tracing_actix_web::TracingLogger;

fn build_server(
    listener: TcpListener,
    config: &ServerConfig,
) -> std::io::Result<actix_web::dev::Server> {
    let state = AppState::new(config).map_err(std::io::Error::other)?;
    Ok(HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .configure(state.clone().configure())
    })
    .listen(listener)?
    .run())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    logging::init();

    let config = ServerConfig::from_env().map_err(std::io::Error::other)?;
    let listener = TcpListener::bind(&config.bind)?;
    tracing::info!(bind = %config.bind, endpoint = ?config.handler.endpoint, "Starting server");
    let server = build_server(listener, &config)?;

    if config.oneshot {
        server.handle().stop(true).await;
    }

    server.await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_oneshot() {
        std::env::set_var("RPC_REST_BIND", "127.0.0.1:0");
        std::env::set_var("RPC_REST_ONESHOT", "1");

        let res = main();

        std::env::remove_var("RPC_REST_BIND");
        std::env::remove_var("RPC_REST_ONESHOT");

        assert!(res.is_ok());
    }

    #[actix_web::test]
    async fn test_build_server_start_stop() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let server = build_server(listener, &ServerConfig::default()).unwrap();
        let handle = server.handle();
        actix_web::rt::spawn(server);
        handle.stop(true).await;
    }
}
