//! # pool_httpd - Entry Point
//! src/main.rs
//!
//! Parsea la CLI, enlaza el socket y corre el accept loop hasta SIGINT.

use clap::error::ErrorKind;
use clap::CommandFactory;
use pool_httpd::config::Config;
use pool_httpd::error::ConfigError;
use pool_httpd::logging;
use pool_httpd::server::Server;
use std::process;
use tracing::{error, info};

fn main() {
    logging::init();

    let server_config = match Config::new().into_server_config() {
        Ok(config) => config,
        Err(e) => {
            let kind = match &e {
                ConfigError::MissingService => ErrorKind::MissingRequiredArgument,
                _ => ErrorKind::ValueValidation,
            };
            Config::command().error(kind, e).exit();
        }
    };

    server_config.print_summary();

    let server = match Server::bind(server_config) {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "startup failed");
            process::exit(1);
        }
    };

    // ctrlc corre el closure en su propio thread, fuera del signal handler
    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || shutdown.trigger()) {
        error!(error = %e, "failed to install SIGINT handler");
        process::exit(1);
    }

    let metrics = server.metrics();
    if let Err(e) = server.run() {
        error!(error = %e, "server failed");
        process::exit(1);
    }

    info!(metrics = %metrics.to_json(), "server stopped");
    process::exit(0);
}
