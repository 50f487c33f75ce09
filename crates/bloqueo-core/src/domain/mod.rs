//! Domain model (identifiers, status set, task records, cache entries, errors).

pub mod cache;
pub mod errors;
pub mod ids;
pub mod state;
pub mod task;

pub use self::cache::{CacheEntry, final_status_ttl, parse_utc};
pub use self::errors::{BlobError, BloqueoError, ErrorKind};
pub use self::ids::{CollectionKey, Tid, Vdom};
pub use self::state::TaskStatus;
pub use self::task::{APP_NAME, CreateTaskRequest, NewTask, Task, TaskStatusView};
