use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

/// Name of a socio-economic indicator (e.g. `gdp_per_capita`, `unemployment`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Indicator(Arc<str>);

impl Indicator {
    pub fn new(name: &str) -> Self { Self(Arc::from(name)) }

    #[inline] pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Indicator {
    fn from(name: &str) -> Self { Self::new(name) }
}
