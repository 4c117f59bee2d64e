use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use crate::cli::app::App;
use crate::utils::ui::Ui;

mod cli;
mod env;
mod jobs;
mod utils;

fn main() -> ExitCode {
    let app = App::parse();

    let ui = Ui::new(!app.no_progress && !app.quiet);
    utils::log::init(app.log_level(), ui.multi());

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(app.run(&ui)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
