//! Crosswalks supplied as `historical_id,current_id,weight` tables.

use std::{collections::BTreeMap, path::Path, sync::Arc};

use anyhow::Result;

use crate::common::parse_number;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::io::csv::TextTable;
use crate::types::{CountyId, CountySet, Level};

use super::crosswalk::{Crosswalk, Share, WEIGHT_SUM_TOLERANCE};
use super::normalize_unit_id;

/// Read a crosswalk table. Rows naming unknown current counties or carrying
/// bad weights, and units whose weights do not sum to 1.0, are reported as
/// `InvalidCrosswalk` and left out.
pub fn read_crosswalk_table(
    vintage: i32,
    path: &Path,
    counties: &CountySet,
    diagnostics: &mut Diagnostics,
) -> Result<Crosswalk> {
    let table = TextTable::read(path, ',')?;
    let historical = table.column("historical_id")?;
    let current = table.column("current_id")?;
    let weights = table.column("weight")?;

    let invalid = |line: usize, reason: String| Diagnostic::InvalidCrosswalk {
        table: table.name().to_string(),
        reason: format!("line {line}: {reason}"),
    };

    let mut grouped: BTreeMap<Arc<str>, Vec<Share>> = BTreeMap::new();
    for row in 0..table.height() {
        let line = TextTable::line(row);
        let Some(hist) = historical.get(row).map(normalize_unit_id).filter(|h| !h.is_empty()) else {
            diagnostics.push(invalid(line, "empty historical_id".into()));
            continue;
        };
        let raw_current = current.get(row).unwrap_or_default();
        let Some(county) = CountyId::parse(raw_current, Level::County).filter(|c| counties.contains(c)) else {
            diagnostics.push(invalid(line, format!("unknown current county `{raw_current}`")));
            continue;
        };
        let weight = match parse_number(weights.get(row).unwrap_or_default(), false) {
            Ok(Some(w)) if w >= 0.0 => w,
            Ok(Some(w)) => { diagnostics.push(invalid(line, format!("negative weight {w}"))); continue }
            Ok(None) => { diagnostics.push(invalid(line, "missing weight".into())); continue }
            Err(e) => { diagnostics.push(invalid(line, e)); continue }
        };
        grouped.entry(Arc::from(hist)).or_default().push(Share { county, weight });
    }

    let mut crosswalk = Crosswalk::new(vintage);
    for (id, shares) in grouped {
        let total: f64 = shares.iter().map(|s| s.weight).sum();
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            diagnostics.push(Diagnostic::InvalidCrosswalk {
                table: table.name().to_string(),
                reason: format!("weights of `{id}` sum to {total}, not 1"),
            });
            continue;
        }
        crosswalk.insert(id, shares);
    }
    Ok(crosswalk)
}

#[cfg(test)]
mod tests {
    use geo::{MultiPolygon, polygon};

    use super::*;
    use crate::types::County;

    fn counties() -> CountySet {
        let square = MultiPolygon(vec![polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)]]);
        let county = |id: &str| County { id: CountyId::new(id), name: id.into(), geometry: square.clone(), historical: vec![] };
        CountySet::new(vec![county("0201"), county("0202")]).0
    }

    #[test]
    fn validates_and_normalizes_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crosswalk_1999.csv");
        std::fs::write(&path, "historical_id,current_id,weight\n\
            0261,0201,0.4\n\
            0261,0202,0.6\n\
            262,0202,1\n\
            0263,0201,0.5\n\
            0264,9999,1\n\
            0265,0201,-1\n").unwrap();

        let mut diags = Diagnostics::new();
        let cw = read_crosswalk_table(1999, &path, &counties(), &mut diags).unwrap();

        assert_eq!(cw.len(), 2);
        assert_eq!(cw.shares("0261").unwrap().len(), 2);
        // Numeric-looking ids regain their leading zero.
        assert_eq!(cw.shares("0262").unwrap()[0].county, CountyId::new("0202"));
        // 0263 sums to 0.5, 0264 names an unknown county, 0265 has a negative weight.
        assert_eq!(diags.len(), 3);
        assert!(diags.iter().all(|d| matches!(d, Diagnostic::InvalidCrosswalk { .. })));
    }
}
