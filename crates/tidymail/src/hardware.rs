//! Memory gate for the local model.
//!
//! Large local models refuse to load (or thrash) without enough free RAM,
//! so the AI strategy checks available memory up front and asks before
//! proceeding on a short machine.

use std::io::{self, BufRead, Write};

use sysinfo::System;
use tracing::info;

const GIB: u64 = 1024 * 1024 * 1024;

/// Snapshot of system memory.
#[derive(Debug, Clone, Copy)]
pub struct MemoryStatus {
    pub available_bytes: u64,
    pub total_bytes: u64,
}

impl MemoryStatus {
    /// Whether `required_gb` of RAM is currently available.
    pub fn has_headroom(&self, required_gb: u64) -> bool {
        self.available_bytes >= required_gb * GIB
    }
}

/// Probe current memory state.
pub fn probe_memory() -> MemoryStatus {
    let mut sys = System::new();
    sys.refresh_memory();
    MemoryStatus {
        available_bytes: sys.available_memory(),
        total_bytes: sys.total_memory(),
    }
}

/// Check the memory gate for `model`; on a shortfall, ask on stdin whether
/// to continue anyway. Returns whether the run should proceed.
pub fn confirm_memory_for_model(model: &str, required_gb: u64) -> bool {
    let status = probe_memory();
    if status.has_headroom(required_gb) {
        info!(
            "Memory check passed: {} available, {} required for {}",
            format_gb(status.available_bytes),
            required_gb,
            model
        );
        return true;
    }

    println!("There isn't enough RAM to use {}", model);
    println!(
        "You got: {} of {} free and you'll need at least {} GB free",
        format_gb(status.available_bytes),
        format_gb(status.total_bytes),
        required_gb
    );
    print!("Do you want to run the categorizer anyway? (y/n): ");
    let _ = io::stdout().flush();

    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    answer.trim() == "y"
}

fn format_gb(bytes: u64) -> String {
    format!("{:.2} GB", bytes as f64 / GIB as f64)
}
