//! The `pynta` binary
use std::io::Write;

use colored::{control, Colorize};
use env_logger::Env;
use log::error;
use pynta_runner::error::Error;
use pynta_runner::runner::envs;

/// The main function of the `pynta` binary
///
/// We initialize the logging interface and configure the usage of colors as early as possible here.
/// Then we call the main [`pynta_runner::runner::run`] library function catching and printing
/// [`pynta_runner::error::Error`]s.
fn main() {
    // Configure the colored crate to respect PYNTA_COLOR and CARGO_TERM_COLOR
    let pynta_color = std::env::var(envs::PYNTA_COLOR).ok();
    if let Some(var) = pynta_color
        .clone()
        .or_else(|| std::env::var(envs::CARGO_TERM_COLOR).ok())
    {
        if var == "never" {
            control::set_override(false);
        } else if var == "always" {
            control::set_override(true);
        } else {
            // do nothing
        }
    }

    // Configure the env_logger crate to respect PYNTA_COLOR and CARGO_TERM_COLOR
    env_logger::Builder::from_env(
        Env::default()
            .filter_or(envs::PYNTA_LOG, "warn")
            .write_style(pynta_color.map_or_else(|| envs::CARGO_TERM_COLOR, |_| envs::PYNTA_COLOR)),
    )
    .format(|buf, record| {
        writeln!(
            buf,
            "{}: {:<5}: {}",
            record
                .module_path()
                .unwrap_or_else(|| record.module_path_static().unwrap_or("???")),
            match record.level() {
                log::Level::Error => "Error".red().bold(),
                log::Level::Warn => "Warn".yellow().bold(),
                log::Level::Info => "Info".green().bold(),
                log::Level::Debug => "Debug".blue().bold(),
                log::Level::Trace => "Trace".cyan().bold(),
            },
            record.args()
        )
    })
    .init();

    match pynta_runner::runner::run() {
        Ok(()) => {}
        Err(error) => {
            error!("{error:#}");
            if let Some(Error::ChecksFailed(_)) = error.downcast_ref::<Error>() {
                std::process::exit(3)
            } else {
                std::process::exit(1)
            }
        }
    }
}
