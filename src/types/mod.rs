mod county;
mod election;
mod indicator;
mod level;

pub use county::{County, CountyId, CountySet, HistoricalId};
pub use election::{ElectionResult, Round};
pub use indicator::Indicator;
pub use level::Level;
