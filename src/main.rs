mod app;
mod cli;
mod config;
mod core;
mod credentials;
mod executors;
mod fingerprint;
mod plugins;
mod reporters;
mod targets;
#[cfg(test)]
mod test_support;
mod ui;
mod utils;

use clap::Parser;

#[tokio::main]
async fn main() {
    human_panic::setup_panic!();

    let cli = cli::Cli::parse();
    if let Err(err) = app::run(cli).await {
        eprintln!("fatal: {:#}", err);
        let setup = err
            .downcast_ref::<core::errors::ScanError>()
            .is_some_and(core::errors::ScanError::is_setup);
        std::process::exit(if setup { 2 } else { 1 });
    }
}
