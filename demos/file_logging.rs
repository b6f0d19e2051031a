//! File logging example
//!
//! Demonstrates batched rolling file output alongside the console, and a
//! live change of the rotation threshold.
//!
//! Run with: cargo run --example file_logging

use rust_batch_logger::prelude::*;
use rust_batch_logger::sinks::log_folder;
use std::time::Duration;

fn main() -> Result<()> {
    println!("=== Rust Batch Logger - File Logging Example ===\n");

    let log_dir = std::env::temp_dir().join("rust_batch_logger_demo");
    let mut logger = Logger::builder()
        .level(LogLevel::Debug)
        .log_dir(&log_dir)
        .batch_size(50)
        .drain_interval(Duration::from_millis(200))
        .build()?;

    println!("1. Logging to both console and file:");
    logger.info("Application started");
    logger.debug("Loading configuration...");
    logger.info("Configuration loaded successfully");
    logger.warn("Using default settings for some options");
    logger.error("Failed to load optional plugin");

    println!("\n2. File-only entries skip the console:");
    for i in 1..=5 {
        logger.info_to_file(format!("Processing item {}/5", i));
    }
    logger.flush_all()?;

    println!("\n3. Small rotation threshold rolls over to numbered files:");
    logger.config().set_max_file_size_bytes(256);
    for batch in 1..=3 {
        logger.info_to_file(format!("Rollover batch {}", batch));
        logger.flush_all()?;
    }

    logger.info("All operations completed");
    logger.shutdown(Duration::from_secs(5));

    let folder = log_folder(&log_dir);
    println!("\n=== Example completed successfully! ===");
    println!("Log files in {}:", folder.display());
    for entry in std::fs::read_dir(&folder)? {
        let entry = entry?;
        println!("  {} ({} bytes)", entry.file_name().to_string_lossy(), entry.metadata()?.len());
    }

    Ok(())
}
