use std::sync::Once;

static LOGGER_INIT: Once = Once::new();

#[allow(unused)] // used in tests
pub fn init_default_logging() {
    LOGGER_INIT.call_once(|| {
        if let Err(e) = log4rs::init_file("log4rs.yaml", Default::default()) {
            eprintln!("Failed to initialize test logging from log4rs.yaml: {e}");
        }
    });
}
