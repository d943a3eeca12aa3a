//! helpers for logging.

/// The filter used when `RUST_LOG` isn't set.
const DEFAULT_FILTER: &str = "info";

/// Log to stderr.
///
/// Lines carry the name of the thread which logged them.  If called multiple times in the same process, only applies
/// once.
pub fn log_to_stderr() {
    static ONCE: std::sync::Once = std::sync::Once::new();

    ONCE.call_once(|| {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(DEFAULT_FILTER))
            .format(|buf, record| {
                use std::io::Write;

                let now = time::OffsetDateTime::now_utc();
                let thread = std::thread::current();

                writeln!(
                    buf,
                    "{} {} time={} target={} thread={}",
                    record.level(),
                    record.args(),
                    now,
                    record.target(),
                    thread.name().unwrap_or("unnamed"),
                )
            })
            .is_test(cfg!(test))
            .try_init();
    });
}
