use std::{collections::BTreeMap, sync::Arc};

use overlay::LayerIndex;
use smallvec::SmallVec;

use crate::config::ReconcileConfig;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::types::{CountyId, CountySet};

/// Weights below this are dropped after validation.
const WEIGHT_EPSILON: f64 = 1e-12;

/// Tolerance on the sum of a table crosswalk's weights per historical id.
pub(crate) const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Part of a historical unit attributed to one current county.
#[derive(Debug, Clone, PartialEq)]
pub struct Share {
    pub county: CountyId,
    pub weight: f64,
}

/// Most historical units map onto one or two current counties.
pub type Shares = SmallVec<[Share; 2]>;

/// Mapping of every unit of one boundary vintage onto current counties.
/// Each unit's share weights sum to 1.0 and are ordered by county id.
#[derive(Debug, Clone, Default)]
pub struct Crosswalk {
    vintage: i32,
    map: BTreeMap<Arc<str>, Shares>,
}

impl Crosswalk {
    pub fn new(vintage: i32) -> Self {
        Self { vintage, map: BTreeMap::new() }
    }

    #[inline] pub fn vintage(&self) -> i32 { self.vintage }

    #[inline] pub fn len(&self) -> usize { self.map.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.map.is_empty() }

    pub fn shares(&self, id: &str) -> Option<&[Share]> {
        self.map.get(id).map(|s| s.as_slice())
    }

    /// Units in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Share])> {
        self.map.iter().map(|(id, shares)| (id.as_ref(), shares.as_slice()))
    }

    /// Insert `shares` for `id`, normalizing weights to sum to 1.0 and
    /// sorting by county. Replaces any previous entry.
    pub(crate) fn insert(&mut self, id: Arc<str>, shares: impl IntoIterator<Item = Share>) {
        let mut shares: Shares = shares.into_iter().filter(|s| s.weight > WEIGHT_EPSILON).collect();
        shares.sort_by(|a, b| a.county.cmp(&b.county));
        shares.dedup_by(|b, a| {
            if a.county == b.county { a.weight += b.weight; true } else { false }
        });
        let total: f64 = shares.iter().map(|s| s.weight).sum();
        if shares.is_empty() || !(total > 0.0) { return }
        for share in &mut shares {
            share.weight /= total;
        }
        self.map.insert(id, shares);
    }
}

/// One historical unit to reconcile.
pub struct HistoricalUnit<'a> {
    pub id: &'a Arc<str>,
    pub geometry: &'a geo::MultiPolygon<f64>,
}

/// Area-overlap reconciliation of historical units against the current counties.
pub struct Reconciler<'a> {
    config: &'a ReconcileConfig,
    counties: &'a CountySet,
    index: &'a LayerIndex,
}

impl<'a> Reconciler<'a> {
    /// `index` must hold the geometries of `counties`, in the same order.
    pub fn new(config: &'a ReconcileConfig, counties: &'a CountySet, index: &'a LayerIndex) -> Self {
        debug_assert_eq!(index.len(), counties.len());
        Self { config, counties, index }
    }

    /// Build the crosswalk of one vintage. Units overlapping nothing are
    /// reported and left out; partly covered units are reported and kept.
    pub fn reconcile<'u>(
        &self,
        vintage: i32,
        units: impl IntoIterator<Item = HistoricalUnit<'u>>,
        diagnostics: &mut Diagnostics,
    ) -> Crosswalk {
        let mut crosswalk = Crosswalk::new(vintage);
        let counties = self.counties.as_slice();

        for unit in units {
            let overlaps = self.index.overlaps(unit.geometry);
            let retained: Vec<_> = overlaps.iter()
                .filter(|o| o.fraction >= self.config.sliver_tolerance)
                .collect();

            if retained.is_empty() {
                diagnostics.push(Diagnostic::UnreconciledUnit { vintage, id: unit.id.to_string() });
                continue;
            }

            let coverage: f64 = retained.iter().map(|o| o.fraction).sum();
            if coverage < self.config.min_coverage {
                diagnostics.push(Diagnostic::PartialCoverage { vintage, id: unit.id.to_string(), coverage });
            }

            // First maximum wins, so ties go to the lower county id.
            let dominant = retained.iter()
                .copied()
                .reduce(|best, o| if o.fraction > best.fraction { o } else { best });

            let wholesale = match (self.config.dominance_threshold, dominant) {
                (Some(threshold), Some(d)) if d.fraction >= threshold => Some(d.target),
                _ => None,
            };

            match wholesale {
                Some(target) => crosswalk.insert(unit.id.clone(), [
                    Share { county: counties[target].id.clone(), weight: 1.0 },
                ]),
                None => crosswalk.insert(unit.id.clone(), retained.iter().map(|o| Share {
                    county: counties[o.target].id.clone(),
                    weight: o.area,
                })),
            }
        }

        crosswalk
    }
}
