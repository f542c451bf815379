pub mod calendar;
pub mod clock;
pub mod config;
pub mod error;
pub mod types;

pub use calendar::Calendar;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use error::{EngineError, Result};
