//! Periodically report the CPU core each thread of a process last ran on.
//!
//! Every period the watcher prints one block to stdout:
//!
//! ```text
//! @<millis-since-start>
//! -<tid>:<core>
//! -<tid>:<core>
//! ```
//!
//! The watch ends successfully when the target process disappears or on
//! SIGINT. A single unreadable thread (it exited mid-scan) is only a
//! warning.

use std::io::{self, Write};
use std::process::exit;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use colored::Colorize;

use cpupin_core::procfs::{self, Pid};

#[derive(Parser)]
#[command(
    name = "cpupin-monitor",
    version,
    about = "Periodically report the CPU core each thread of a process last ran on"
)]
struct Cli {
    /// Sampling period in milliseconds
    #[arg(
        short = 'p',
        long = "period",
        default_value_t = 100,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    period: u64,

    /// Process id to watch
    pid: Pid,
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = ctrlc::set_handler(|| {
        // Piped output is block-buffered; do not lose the last sample block.
        let _ = io::stdout().flush();
        exit(0)
    }) {
        eprintln!("{} {err}", "error:".red().bold());
        exit(1);
    }

    let period = Duration::from_millis(cli.period);
    let start = Instant::now();
    let mut next = start;

    loop {
        // Absolute schedule: a slow scan drops periods instead of letting
        // them bunch up.
        let now = Instant::now();
        while next <= now {
            next += period;
        }
        if let Some(wait) = next.checked_duration_since(Instant::now()) {
            thread::sleep(wait);
        }

        let tids = match procfs::thread_ids(cli.pid) {
            Ok(tids) => tids,
            // The watched process is gone; the watch is over.
            Err(_) => break,
        };

        println!("@{}", start.elapsed().as_millis());
        for tid in tids {
            match procfs::task_stat(cli.pid, tid) {
                Ok(stat) => println!("-{tid}:{}", stat.last_cpu),
                // Threads can exit between the directory scan and the read.
                Err(err) => {
                    eprintln!("{} cannot read thread {tid}: {err}", "warning:".yellow().bold())
                }
            }
        }
    }
}
