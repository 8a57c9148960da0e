mod app_runtime;
mod carousel;
mod catalog;
mod config;
mod config_persistence;
mod db_manager;
mod favorites;
mod protocol;
mod viewport;

use app_runtime::AppRuntime;

const LOG_FILTER_ENV: &str = "MARQUEE_LOG";

fn init_logging() {
    let mut clog = colog::default_builder();
    clog.filter(None, log::LevelFilter::Debug);
    if let Ok(filters) = std::env::var(LOG_FILTER_ENV) {
        clog.parse_filters(&filters);
    }
    clog.init();

    std::panic::set_hook(Box::new(|panic_info| {
        let current_thread = std::thread::current();
        let thread_name = current_thread.name().unwrap_or("unnamed");
        log::error!("panic in thread '{}': {}", thread_name, panic_info);
    }));
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let runtime = AppRuntime::build()?;
    runtime.run()
}
