mod clock_driver;
mod progress_tracker;

pub use clock_driver::*;
pub use progress_tracker::*;
