use std::sync::Once;

static LOGGER_INIT: Once = Once::new();

const CONFIG_FILE: &str = "logging_config.yaml";

/// Initializes the `log4rs` logger from `logging_config.yaml`, falling back
/// to a console logger at `Info` level. Only the first call has an effect.
pub fn init() {
    LOGGER_INIT.call_once(|| {
        match log4rs::init_file(CONFIG_FILE, Default::default()) {
            Ok(_) => {
                log::info!("ara_denoise logging initialized from {CONFIG_FILE}.");
            }
            Err(e) => {
                // Logging not set up, stderr
                eprintln!("ERROR: Failed to initialize logger from {CONFIG_FILE}: {e}");
                eprintln!("Falling back to basic stdout logging (Info level).");
                init_console_fallback();
            }
        }
    });
}

fn init_console_fallback() {
    let stdout_appender = log4rs::append::console::ConsoleAppender::builder()
        .encoder(Box::new(log4rs::encode::pattern::PatternEncoder::new(
            "{h({d(%Y-%m-%d %H:%M:%S)(utc)} - {l}: {m}{n})}",
        )))
        .build();

    let config = log4rs::config::Config::builder()
        .appender(
            log4rs::config::Appender::builder()
                .build("stdout", Box::new(stdout_appender)),
        )
        .build(
            log4rs::config::Root::builder()
                .appender("stdout")
                .build(log::LevelFilter::Info),
        );

    match config {
        Ok(config) => {
            if let Err(init_err) = log4rs::init_config(config) {
                eprintln!(
                    "ERROR: Failed to initialize fallback logger: {init_err}. No logging will be available."
                );
            } else {
                log::warn!("ara_denoise logging initialized using basic fallback (stdout, Info level).");
            }
        }
        Err(build_err) => {
            eprintln!(
                "ERROR: Failed to build fallback logging configuration: {build_err}. No logging will be available."
            );
        }
    }
}
