pub mod meter_queries;
pub mod reading_queries;
