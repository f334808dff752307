use tracing::Level;
use tracing_subscriber::FmtSubscriber;

pub const LOG_LEVEL_ENV: &str = "SNDHW_LOG";

fn level_from_env() -> Level {
    match std::env::var(LOG_LEVEL_ENV)
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    }
}

pub fn init() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level_from_env())
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install log subscriber: {e}");
    }
}
