pub mod analyzer;
pub mod constants;
pub mod explorer;
pub mod percentiles;
pub mod retry;
pub mod rpc;
pub mod sampler;
pub mod server;
pub mod statistics;
pub mod utils;
