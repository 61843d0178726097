//! Domain types shared across the insight engine.

pub mod dates;
pub mod result;
pub mod series;

pub use dates::{calendar_day, calendar_day_opt, parse_calendar_day};
pub use result::{InputError, PortfolioResult};
pub use series::{FrontierPoint, SeriesPoint};
