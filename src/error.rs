use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("parse error: {0}")]
    Parse(String),
    #[error("nested explain")]
    NestedExplain,
    #[error("build plan to explain error: {0}")]
    ExplainBuild(#[source] Box<ProxyError>),
    #[error("unsupported plan to explain, type: {0}")]
    UnsupportedExplain(&'static str),
    #[error("route error: {0}")]
    Route(String),
    #[error("sequence error: {0}")]
    Sequence(String),
    #[error("unsupported statement: {0}")]
    Unsupported(String),
    #[error("sharding column '{0}' cannot be updated")]
    ShardKeyUpdate(String),
    #[error("insert into sharded table '{0}' requires an explicit column list")]
    MissingColumnList(String),
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("backend error on slice '{slice}' db '{db}': {message}")]
    Backend {
        slice: String,
        db: String,
        message: String,
    },
    #[error("execution cancelled")]
    Cancelled,
    #[error("execution timed out after {0} ms")]
    Timeout(u64),
}

pub type ProxyResult<T> = Result<T, ProxyError>;
