mod http;
#[cfg(feature = "test-helpers")]
pub mod test_helpers;
mod traits;

pub use http::{HttpService, SessionExpiredHook};
pub use traits::{AttachmentStore, LedgerService, ScanBackend, ServiceError};
