//! Packsmith - builds native installer packages from a descriptor file.

use std::process;

use packsmith::cli;

#[tokio::main]
async fn main() {
    env_logger::init();

    match cli::run().await {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
