mod meter;
mod period;
mod reading;

pub use meter::Meter;
pub use period::{Period, PeriodRange};
pub use reading::{MeterReadingRow, Reading};
