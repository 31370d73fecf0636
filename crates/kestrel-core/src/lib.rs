//! # Kestrel Core
//!
//! Market-data and pre-trade risk engine.
//!
//! ## Design Principles
//! - Fixed-point prices and quantities (floats only in indicator kernels)
//! - No allocation on the hot path; scratch is stack-bounded or caller-owned
//! - Single writer per book, enforced by `&mut`
//! - Errors are small `Copy` enums mapped to status codes at the boundary

pub mod error;
pub mod fixed;
pub mod side;
pub mod level;
pub mod ladder;
pub mod book;
pub mod indicators;
pub mod tick;
pub mod risk;

pub use error::{status_of, EngineError, STATUS_OK};
pub use fixed::{Fixed, Price, Quantity, Scale};
pub use side::{Action, Side};
pub use level::{Level, PriceBand, SideState};
pub use ladder::{DenseLadder, Ladder, SortedLadder};
pub use book::{LevelUpdate, OrderBook, TopOfBook};
pub use tick::{process_tick_batch, BatchSummary, TickTranslator};
pub use risk::{BatchVerdict, RejectReason, RiskEngine, VarModel};
