//! Fixed-layout ABI records.
//!
//! Every record crossing the C boundary is `#[repr(C)]`, host-endian,
//! padded explicitly and `Pod`, so a caller buffer can be viewed as a
//! record slice without parsing.

#![no_std]

pub mod records;
pub mod parser;

pub use records::*;
pub use parser::*;
