pub mod levels;
pub mod order_blocks;
pub mod outlook;
pub mod supply_trend;

pub use levels::{PricePosition, TradePlan, compute_levels, distance_pct, stop_loss_pct};
pub use order_blocks::{OrderBlockDetector, OrderBlockScan, SkipReason, SkippedIndex};
pub use outlook::Outlook;
pub use supply_trend::{classify, classify_broad, flow_agreement};
