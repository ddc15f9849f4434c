use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    match econ_calib::app::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err.message());
            ExitCode::from(err.exit_code())
        }
    }
}
