//! Output generation.
//!
//! - [`json`]: writes an [`Edition`](crate::models::Edition) to a dated JSON
//!   file for API consumption.
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! ├── 2025-05-06/
//! │   ├── morning.json
//! │   ├── afternoon.json
//! │   └── evening.json
//! ```

pub mod json;
