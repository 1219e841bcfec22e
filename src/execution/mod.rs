// Analysis, scheduling and the per-cycle run loop
pub mod alerts;
pub mod analysis;
pub mod cycle;
pub mod price_feed;
pub mod window;

pub use analysis::{analyze, decide};
pub use cycle::CycleRunner;
pub use price_feed::{PriceFeed, RetryPolicy};
pub use window::{is_within_daily_window, DailyWindow};
