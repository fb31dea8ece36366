use std::sync::LazyLock;
use std::time::Instant;

pub mod cli;
pub mod io;
pub mod output;

/// Process start time, log lines are stamped relative to it.
pub static EPOCH: LazyLock<Instant> = LazyLock::new(Instant::now);
