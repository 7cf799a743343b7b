//! CLI Commands

pub mod lint;
pub mod qc;
pub mod ticker;
