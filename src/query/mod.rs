pub mod pagination;
pub mod service;

pub use pagination::{Page, PageRequest};
pub use service::{DailyFilter, QueryService, YearlyFilter};
