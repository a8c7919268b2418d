mod clock;
mod ordering;
mod scheduler;

pub use clock::{Clock, DEFAULT_TIME_SCALE, MAX_TIME_SCALE, SampleTimer};
pub use ordering::{DispatchClass, dispatch_order, sorts_before};
pub use scheduler::{DrainDue, ScheduledEventStore};

pub(crate) use clock::validate_scale;
