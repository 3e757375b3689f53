//! Channel writer example
//!
//! Demonstrates multi-threaded logging through a ChannelWriter, which keeps
//! file I/O off the logging threads.
//!
//! Run with: cargo run --example async_logging

use repo_logger::prelude::*;
use repo_logger::{JsonFormatter, OverflowPolicy, RotatingFileWriter};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() -> Result<()> {
    println!("=== Repo Logger - Channel Writer Example ===\n");

    let file = RotatingFileWriter::new("async_test.log")?;
    let writer = ChannelWriter::builder()
        .capacity(1000)
        .flush_interval(Duration::from_millis(100))
        .overflow_policy(OverflowPolicy::Block)
        .build(file)?;

    let registry = Registry::with_formatter(Arc::new(JsonFormatter::new(writer.clone())));

    println!("1. Logging 100 messages:");
    let main_logger = registry.package_logger("github.com/acme/shop", "main");
    for i in 0..100 {
        main_logger.infof(format_args!("message #{}", i));
    }

    println!("\n2. Multi-threaded logging:");
    let handles: Vec<_> = (0..5)
        .map(|thread_id| {
            let logger = registry
                .package_logger("github.com/acme/shop", "worker")
                .with_values(&["thread".into(), thread_id.into()]);
            thread::spawn(move || {
                for i in 0..20 {
                    logger.kv(LogLevel::Info, &["seq".into(), i.into()]);
                    thread::sleep(Duration::from_millis(1));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker thread panicked");
    }

    // Drains the queue and flushes the file
    writer.stop();

    let metrics = writer.metrics();
    println!(
        "   written={} bytes={} failed={} blocked={}",
        metrics.written_count(),
        metrics.written_bytes(),
        metrics.failed_count(),
        metrics.block_events()
    );

    println!("\n=== Example completed successfully! ===");
    println!("Check 'async_test.log' for the JSON lines");
    Ok(())
}
