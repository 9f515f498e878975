pub mod clock;
pub mod context;
pub mod error;
pub mod reconciler;
pub mod service;
pub mod validate;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{Context, Settings};
pub use error::{Error, Invalid};
pub use reconciler::{JobHandle, Reconciler, Tally};
pub use service::Service;
