//! Binary entry point: parse [Config], bind the listener, run the event
//! loop. Exit code is 0 on a clean shutdown, non-zero on bind/listen
//! failure (spec.md §6).

use std::process;

use log::{error, info};
use structopt::StructOpt;

use vertree::{Config, Server};

fn main() {
    env_logger::init();

    let config = Config::from_args();
    let addr = config.addr();

    let mut server = match Server::bind(&addr, config.save_dir.clone()) {
        Ok(server) => server,
        Err(err) => {
            error!(target: "vertree-server", "failed to bind {}: {}", addr, err);
            process::exit(1);
        }
    };

    info!(target: "vertree-server", "listening on {}", addr);
    if let Err(err) = server.run() {
        error!(target: "vertree-server", "event loop exited with error: {}", err);
        process::exit(1);
    }
}
