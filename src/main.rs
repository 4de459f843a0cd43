//! Provides the main entry point to the program.
use human_panic::{Metadata, setup_panic};
use smartroi::cli::run_cli;
use smartroi::log::is_logger_initialised;

fn main() {
    setup_panic!(Metadata::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")));

    if let Err(err) = run_cli() {
        if is_logger_initialised() {
            ::log::error!("{err:?}");
        } else {
            eprintln!("Error: {err:?}");
        }

        std::process::exit(1);
    }
}
