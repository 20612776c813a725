pub mod codec;
pub mod domain;
pub mod facade;
pub mod ports;

pub use domain::{KeyTtl, Soft, SoftFailure};
pub use facade::CacheFacade;
pub use ports::CacheStore;
