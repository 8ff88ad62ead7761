pub mod cache;
pub mod csv_source;
pub mod mock;

pub use cache::{CachedMarketData, TtlCache};
pub use csv_source::CsvMarketData;
pub use mock::MockMarketData;
