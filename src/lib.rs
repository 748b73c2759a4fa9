// httpcache: a private HTTP response cache

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod storage;
pub mod transport;

pub use cache::{CacheEntry, CacheOptions, CachedClient};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{HttpCacheError, Result, StorageError, TransportError};
pub use storage::Storage;
pub use transport::{HyperTransport, ResponseBody, Transport};
