pub mod executor;
pub(crate) mod dispatch;

pub use executor::Executor;
