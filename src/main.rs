//! Binary entry point: configuration, daemon transition, logging, and the
//! accept loop, in that order.

use std::process;

use clap::Parser;
use log::{debug, error, info};

use emberd::config::ServerConfig;
use emberd::http::ServerContext;
use emberd::listener::Listener;
use emberd::pool::ThreadPool;
use emberd::server::{spawn_signal_listener, Server};
use emberd::{daemon, logger};

#[derive(Debug, Parser)]
#[command(name = "emberd", version, about = "Threaded HTTP/1.1 file and CGI server")]
struct Args {
    /// Path to the INI configuration file.
    #[arg(short, long, default_value = "server.ini")]
    config: String,
}

fn main() {
    let args = Args::parse();

    let config = match ServerConfig::load(&args.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error reading the configuration file: {err}");
            process::exit(1);
        }
    };

    if config.daemon {
        println!("Running the server as a daemon process...");
        if let Err(err) = daemon::daemonize() {
            eprintln!("{err}");
            process::exit(1);
        }
    }

    if let Err(err) = logger::init(config.daemon, config.debug) {
        eprintln!("{err}");
        process::exit(1);
    }

    debug!("Initializing the socket");
    let listener = match Listener::bind(config.listen_port, config.max_clients) {
        Ok(listener) => listener,
        Err(err) => {
            error!("Error initializing the socket: {err}");
            process::exit(1);
        }
    };

    debug!("Initializing the worker pool");
    let pool = ThreadPool::new(config.num_threads);

    let ctx = ServerContext {
        document_root: config.server_root,
        server_signature: config.server_signature,
    };

    let server = match Server::new(listener, pool, ctx) {
        Ok(server) => server,
        Err(err) => {
            error!("Error initializing the acceptor: {err}");
            process::exit(1);
        }
    };

    if let Err(err) = spawn_signal_listener(server.shutdown_handle()) {
        error!("Error installing the signal handlers: {err}");
        process::exit(1);
    }

    info!("Server ready to accept connections");

    match server.run() {
        Ok(()) => info!("Shutdown complete"),
        Err(err) => {
            error!("Server terminated abnormally: {err}");
            process::exit(1);
        }
    }
}
