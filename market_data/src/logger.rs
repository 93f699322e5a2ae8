use chrono::Local;
use env_logger::{Builder, Env};
use std::io::Write;

/// Initialise the global logger. `RUST_LOG` overrides the default `info` level.
/// Calling this more than once is harmless.
pub fn init_logger() {
    let _ = Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}: {}",
                Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .try_init();
}
