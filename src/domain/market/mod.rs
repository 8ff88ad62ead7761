// Market analysis domain
pub mod candle;
pub mod flow;
pub mod order_block;
