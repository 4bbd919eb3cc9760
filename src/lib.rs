pub mod sql;
pub mod router;
pub mod sequence;
pub mod execution;
pub mod result;
pub mod context;
pub mod config;
pub mod plan;
pub mod error;
