//! Display sink example
//!
//! Demonstrates feeding a user-facing view: a renderer thread receives
//! coalesced batches of display items while the file keeps the full text.
//!
//! Run with: cargo run --example display_sink

use rust_batch_logger::prelude::*;
use std::thread;
use std::time::Duration;

fn main() -> Result<()> {
    println!("=== Rust Batch Logger - Display Sink Example ===\n");

    let (display, items) = ChannelDisplaySink::new();
    let mut logger = Logger::builder()
        .log_dir(std::env::temp_dir().join("rust_batch_logger_demo"))
        .console_enabled(false)
        .display_sink(display)
        .display_refresh_interval(Duration::from_millis(250))
        .drain_interval(Duration::from_millis(50))
        .build()?;

    let renderer = thread::spawn(move || {
        for batch in items.iter() {
            println!("-- refresh ({} items)", batch.len());
            for item in batch {
                println!(
                    "   [{}] {:5} {}",
                    item.timestamp.format("%H:%M:%S"),
                    item.level.to_str(),
                    item.message
                );
            }
        }
    });

    logger.info("Sync started");
    for page in 1..=4 {
        logger.log_with(
            LogLevel::Info,
            format!("GET /api/items?page={} -> 200 (412 items)", page),
            LogOptions::new().display_message(format!("Downloaded page {} of 4", page)),
        );
        thread::sleep(Duration::from_millis(100));
    }
    logger.warn_to_display("Some items were skipped");
    logger.info_to_file("skipped ids: 1042, 1077, 1093");
    logger.info("Sync finished");

    // Shutting down closes the display lane, which ends the renderer loop.
    logger.shutdown(Duration::from_secs(5));
    drop(logger);
    let _ = renderer.join();

    println!("\n=== Example completed successfully! ===");
    Ok(())
}
