//! Risk engine: batch pre-trade validation and portfolio VaR.
//!
//! Both halves are pure functions of their inputs.

pub mod check;
pub mod var;

pub use check::{BatchVerdict, RejectReason, RiskEngine, MASK_BITS};
pub use var::{portfolio_variance, VarModel, MAX_STACK_ASSETS};
