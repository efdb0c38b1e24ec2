//! Logger installation for the binary.
//!
//! The library only talks to the `log` facade; this is the one place a
//! concrete logger is chosen.

use std::io::Write;

use console::style;
use log::{Level, LevelFilter};

/// Install an `env_logger` writing `LEVEL[time] message` lines to stderr.
pub fn init(level: LevelFilter) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).format(|buf, record| {
        let tag = match record.level() {
            Level::Error => style("ERRO").red(),
            Level::Warn => style("WARN").yellow(),
            Level::Info => style("INFO").cyan(),
            Level::Debug => style("DEBU").dim(),
            Level::Trace => style("TRAC").dim(),
        };
        writeln!(
            buf,
            "{}[{}] {}",
            tag.for_stderr(),
            buf.timestamp_seconds(),
            record.args()
        )
    });

    // A logger may already be installed when embedded in tests.
    let _ = builder.try_init();
}
