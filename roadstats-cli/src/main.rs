//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_target(false)
        .target(env_logger::Target::Stderr)
        .init();

    if let Err(err) = roadstats_cli::run() {
        if let roadstats_cli::CliError::ArgumentParsing(clap_err) = &err {
            clap_err.exit();
        }
        log::error!("{err}");
        std::process::exit(1);
    }
}
