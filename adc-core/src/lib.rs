#![no_std]

// Arbitration core for a shared analog-to-digital converter.
//
// This crate stays portable across MCU firmware and host tooling by avoiding the
// Rust standard library. Hardware access goes through the `RegisterBlock` and
// `Platform` seams so the same scheduler runs against MMIO or an in-memory
// register file.

pub mod arbiter;
pub mod client;
pub mod config;
pub mod consumers;
pub mod conversion;
pub mod error;
pub mod history;
pub mod platform;
pub mod queue;
pub mod read;
pub mod registers;

mod diag;

pub use arbiter::{Device, DeviceStatus};
pub use client::{Client, ClientId, ClientRole, Completion, ConversionClient, MAX_CLIENTS};
pub use config::AdcConfig;
pub use conversion::IrqReturn;
pub use error::{AdcError, Resource};
pub use platform::{HostPlatform, Platform};
pub use registers::{Bank, MmioRegisters, Register, RegisterBlock, RegisterFile, Revision};
