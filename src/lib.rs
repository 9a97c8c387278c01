pub mod admission;
pub mod colorize;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod palette;
pub mod pool;
pub mod sampler;
pub mod shutdown;
