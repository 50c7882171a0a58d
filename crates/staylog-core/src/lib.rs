pub mod attachment;
pub mod booking;
pub mod earning;
pub mod error;
pub mod expense;
pub mod property;
pub mod scan;
pub mod stats;

pub use attachment::{AttachmentRef, UploadFile};
pub use error::StaylogError;
pub use property::Property;
pub use scan::{ScanModule, ScanStatus};
