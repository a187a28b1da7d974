//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `memos_core` linkage with a deterministic probe.
//! - Decode an exported annotation payload file for quick inspection.

use memos_core::{decode_payload, SystemClock};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("memos_core ping={}", memos_core::ping());
    println!("memos_core version={}", memos_core::core_version());

    let Some(path) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };

    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(err) => {
            eprintln!("failed to read `{path}`: {err}");
            return ExitCode::FAILURE;
        }
    };

    match decode_payload(&bytes, &SystemClock) {
        Ok(decoded) => {
            let version = decoded
                .version
                .map(|value| value.to_string())
                .unwrap_or_else(|| "none".to_string());
            println!(
                "payload version={} memos={} skipped={}",
                version,
                decoded.memos.len(),
                decoded.skipped
            );
            for memo in &decoded.memos {
                println!(
                    "{} modified={} chars={} tags={}",
                    memo.uid(),
                    memo.modified().to_rfc3339(),
                    memo.content().chars().count(),
                    memo.hashtags().join(",")
                );
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("payload error: {err}");
            ExitCode::FAILURE
        }
    }
}
