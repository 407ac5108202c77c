//! Systemd unit generation and service control.
//!
//! - `unit` - unit file generation and atomic installation
//! - `control` - service control operations (daemon-reload, enable, start)

pub mod control;
pub mod unit;

pub use unit::{UnitConfig, generate_unit_content, write_unit_file};
