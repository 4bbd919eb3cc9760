use async_trait::async_trait;

use crate::error::ProxyResult;
use crate::result::ResultSet;

/// Backend side of the proxy: runs one physical statement on one physical
/// target. Implementations own the connection pool; a plan only borrows the
/// executor for the duration of `Plan::execute_in`.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, slice: &str, db: &str, sql: &str) -> ProxyResult<ResultSet>;
}
