pub mod block;
pub mod engine;
