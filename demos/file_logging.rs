//! File logging example
//!
//! Demonstrates routing the registry into a rotated file, teed to stderr.
//!
//! Run with: cargo run --example file_logging

use repo_logger::prelude::*;
use repo_logger::RotationPolicy;

fn main() -> Result<()> {
    println!("=== Repo Logger - File Logging Example ===\n");

    let registry = Registry::new();
    let logger = registry.package_logger("github.com/acme/shop", "importer");

    let config = RotateConfig::new("logs", "importer")
        .with_policy(
            RotationPolicy::new()
                .with_max_size(16 * 1024)
                .with_max_backups(3)
                .with_compression(true),
        )
        .with_max_age_days(7)
        .with_extra_sink(std::io::stderr());
    let rotator = LogRotator::initialize(&registry, config)?;
    println!("1. Logging to {} and stderr:", rotator.path().display());

    logger.info(&["import started".into()]);
    for i in 1..=5 {
        logger.infof(format_args!("processing batch {}/5", i));
        if i == 3 {
            logger.warning(&["batch 3 took longer than expected".into()]);
        }
    }
    logger.notice(&["import finished".into()]);

    rotator.close()?;
    // The previous formatter is back
    logger.info(&["after close, stderr only".into()]);

    if let Err(e) = rotator.close() {
        println!("\n2. Closing twice is reported: {}", e);
    }

    println!("\n=== Example completed successfully! ===");
    println!("Check 'logs/importer.log' for the file output");
    Ok(())
}
