use ahash::AHashMap;

use crate::common::normalize_county_name;
use crate::types::{CountyId, CountySet};

/// Outcome of looking up a county by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameMatch {
    Unique(CountyId),
    /// Several counties share the name, even after the voivodeship tie-break.
    Ambiguous(Vec<CountyId>),
    Unknown,
}

/// Normalized county name -> counties carrying it.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    by_name: AHashMap<String, Vec<CountyId>>,
}

impl NameIndex {
    pub fn new(counties: &CountySet) -> Self {
        let mut by_name: AHashMap<String, Vec<CountyId>> = AHashMap::new();
        for county in counties.iter() {
            by_name.entry(normalize_county_name(&county.name)).or_default().push(county.id.clone());
        }
        Self { by_name }
    }

    /// Resolve `name`; among several candidates, the one in `voivodeship`
    /// (a 2-digit TERC prefix) wins.
    pub fn resolve(&self, name: &str, voivodeship: Option<&str>) -> NameMatch {
        let Some(candidates) = self.by_name.get(&normalize_county_name(name)) else {
            return NameMatch::Unknown
        };
        if let [only] = candidates.as_slice() {
            return NameMatch::Unique(only.clone());
        }
        let narrowed: Vec<&CountyId> = match voivodeship {
            Some(v) => candidates.iter().filter(|c| c.voivodeship() == v).collect(),
            None => Vec::new(),
        };
        match narrowed.as_slice() {
            [only] => NameMatch::Unique((*only).clone()),
            _ => NameMatch::Ambiguous(candidates.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use geo::MultiPolygon;

    use super::*;
    use crate::types::County;

    fn index() -> NameIndex {
        let county = |id: &str, name: &str| County {
            id: CountyId::new(id),
            name: name.into(),
            geometry: MultiPolygon(vec![]),
            historical: vec![],
        };
        let (set, _) = CountySet::new(vec![
            county("1202", "brzeski"),
            county("1601", "brzeski"),
            county("1261", "Kraków"),
            county("1206", "krakowski"),
        ]);
        NameIndex::new(&set)
    }

    #[test]
    fn unique_names_resolve_directly() {
        assert_eq!(index().resolve("Powiat krakowski", None), NameMatch::Unique(CountyId::new("1206")));
        assert_eq!(index().resolve("kraków", Some("02")), NameMatch::Unique(CountyId::new("1261")));
        assert_eq!(index().resolve("gdański", None), NameMatch::Unknown);
    }

    #[test]
    fn voivodeship_breaks_name_ties() {
        assert_eq!(index().resolve("brzeski", Some("16")), NameMatch::Unique(CountyId::new("1601")));
        assert_eq!(
            index().resolve("brzeski", None),
            NameMatch::Ambiguous(vec![CountyId::new("1202"), CountyId::new("1601")]),
        );
    }
}
