// shared/src/lib.rs

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("connection: {0}")]
    Connection(String),
    #[error("store: {0}")]
    Store(String),
    #[error("wrong type: operation against a key holding the wrong kind of value")]
    WrongType,
    #[error("serialization: {0}")]
    Serialization(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("config: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod config;
pub mod time;

pub use time::{TimeUnit, Ttl};
