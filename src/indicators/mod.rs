//! Indicator loading and normalization into `(county, year)` series.

mod loader;
mod normalize;
mod series;

pub use normalize::PriceIndex;
pub use series::{Cell, IndicatorSeries, IndicatorTable, Method, Provenance};

use anyhow::Result;
use tracing::{debug, info};

use crate::config::IndicatorConfig;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::reconcile::Reconciliation;

/// Load every configured source into one table holding a series for each
/// current county and indicator (empty when nothing was observed).
///
/// Sources are applied in configuration order; a later source only fills
/// cells the earlier ones left empty. Monetary indicators are deflated to
/// `base_year` prices after combination.
pub fn load_indicators(
    config: &IndicatorConfig,
    reconciliation: &Reconciliation,
    diagnostics: &mut Diagnostics,
) -> Result<IndicatorTable> {
    let price_index = config.price_index.as_deref()
        .map(|path| PriceIndex::read(path, diagnostics))
        .transpose()?;

    let mut table = IndicatorTable::new();
    for county in reconciliation.counties.iter() {
        for indicator in &config.order {
            table.insert(county.id.clone(), indicator.clone(), IndicatorSeries::new());
        }
    }

    for source in &config.sources {
        let values = loader::load_source(source, reconciliation, &config.extensive, diagnostics)?;
        let mut filled = 0usize;
        for ((county, indicator, year), value) in values {
            let value = match (&price_index, config.base_year) {
                (Some(cpi), Some(base)) if config.monetary.contains(&indicator) => {
                    match cpi.deflate(value, year, base) {
                        Some(real) => real,
                        None => {
                            diagnostics.push(Diagnostic::SchemaViolation {
                                table: cpi.name().to_string(),
                                line: 0,
                                column: "index".into(),
                                reason: format!("no price index for {year} or base year {base}; {indicator} for {county} left missing"),
                            });
                            continue;
                        }
                    }
                }
                _ => value,
            };
            let series = table.entry(county, indicator);
            if series.value(year).is_none() {
                series.set(year, Cell::observed(value));
                filled += 1;
            }
        }
        debug!("[indicators] {}: {filled} cells", source.path.display());
    }

    info!("[indicators] {} series, {} observed cells", table.len(), table.provenance_counts().get("observed").copied().unwrap_or(0));
    Ok(table)
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, path::Path, sync::Arc};

    use geo::{MultiPolygon, polygon};

    use super::*;
    use crate::config::IndicatorSource;
    use crate::reconcile::{Crosswalk, Share};
    use crate::types::{County, CountyId, CountySet, Indicator, Level};

    fn reconciliation() -> Reconciliation {
        let square = MultiPolygon(vec![polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)]]);
        let county = |id: &str| County { id: CountyId::new(id), name: id.into(), geometry: square.clone(), historical: vec![] };
        let (set, _) = CountySet::new(vec![county("0201"), county("0202"), county("1401")]);
        let mut cw = Crosswalk::new(1999);
        cw.insert(Arc::from("0261"), [
            Share { county: CountyId::new("0201"), weight: 0.25 },
            Share { county: CountyId::new("0202"), weight: 0.75 },
        ]);
        cw.insert(Arc::from("0201"), [Share { county: CountyId::new("0201"), weight: 1.0 }]);
        Reconciliation::new(set, BTreeMap::from([(1999, cw)]))
    }

    fn source(path: &Path, columns: &[(&str, &str)]) -> IndicatorSource {
        IndicatorSource {
            path: path.to_path_buf(),
            columns: columns.iter().map(|(r, i)| (r.to_string(), Indicator::new(i))).collect(),
            id_column: "terc_code".into(),
            year_column: "year".into(),
            year: None,
            vintage: None,
            level: Level::County,
            scale: 1.0,
            separator: ';',
            decimal_comma: true,
        }
    }

    fn config(sources: Vec<IndicatorSource>) -> IndicatorConfig {
        IndicatorConfig {
            order: vec![Indicator::new("salary"), Indicator::new("pop70")],
            extensive: vec![Indicator::new("pop70")],
            monetary: vec![],
            price_index: None,
            base_year: None,
            sources,
        }
    }

    #[test]
    fn long_layout_with_decimal_commas_and_diagnostics() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("salary.csv");
        std::fs::write(&path, "terc_code;year;wynagrodzenie\n\
            0201;2010;3 500,50\n\
            201;2011;-\n\
            0202;2010;abc\n\
            9999;2010;1\n\
            0201;2010;3600\n").unwrap();

        let mut diags = Diagnostics::new();
        let cfg = config(vec![source(&path, &[("wynagrodzenie", "salary")])]);
        let table = load_indicators(&cfg, &reconciliation(), &mut diags).unwrap();

        let salary = Indicator::new("salary");
        assert_eq!(table.cell(&CountyId::new("0201"), &salary, 2010).value(), Some(3500.5));
        assert_eq!(table.cell(&CountyId::new("0201"), &salary, 2011), Cell::Missing);
        // Every county/indicator pair has a series, even when empty.
        assert_eq!(table.len(), 6);
        assert!(table.get(&CountyId::new("1401"), &salary).unwrap().is_empty());
        // abc, unknown 9999, duplicate 0201/2010.
        assert_eq!(diags.len(), 3);
        assert_eq!(diags.count(crate::diagnostics::Category::Schema), 3);
    }

    #[test]
    fn historical_units_are_apportioned_or_averaged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo_2000.csv");
        std::fs::write(&path, "terc_code;pop;wage\n0261;1000;10\n0201;200;30\n").unwrap();

        let mut src = source(&path, &[("pop", "pop70"), ("wage", "salary")]);
        src.vintage = Some(1999);
        let mut diags = Diagnostics::new();
        let table = load_indicators(&config(vec![src]), &reconciliation(), &mut diags).unwrap();

        let (pop, wage) = (Indicator::new("pop70"), Indicator::new("salary"));
        let (a, b) = (CountyId::new("0201"), CountyId::new("0202"));
        // Year comes from the file name.
        assert_eq!(table.cell(&a, &pop, 2000).value(), Some(450.0));
        assert_eq!(table.cell(&b, &pop, 2000).value(), Some(750.0));
        // (10 * 0.25 + 30 * 1.0) / 1.25
        assert_eq!(table.cell(&a, &wage, 2000).value(), Some(26.0));
        assert_eq!(table.cell(&b, &wage, 2000).value(), Some(10.0));
        assert!(diags.is_empty());
    }

    #[test]
    fn voivodeship_values_broadcast_and_fill_gaps_only() {
        let dir = tempfile::tempdir().unwrap();
        let county_path = dir.path().join("county.csv");
        std::fs::write(&county_path, "terc_code;year;w\n0201;2010;5\n").unwrap();
        let voiv_path = dir.path().join("voiv.csv");
        std::fs::write(&voiv_path, "terc_code;year;w\n02;2010;7\n14;2010;9\n").unwrap();

        let mut voiv = source(&voiv_path, &[("w", "salary")]);
        voiv.level = Level::Voivodeship;
        let cfg = config(vec![source(&county_path, &[("w", "salary")]), voiv]);
        let table = load_indicators(&cfg, &reconciliation(), &mut Diagnostics::new()).unwrap();

        let salary = Indicator::new("salary");
        assert_eq!(table.cell(&CountyId::new("0201"), &salary, 2010).value(), Some(5.0));
        assert_eq!(table.cell(&CountyId::new("0202"), &salary, 2010).value(), Some(7.0));
        assert_eq!(table.cell(&CountyId::new("1401"), &salary, 2010).value(), Some(9.0));
    }

    #[test]
    fn directory_of_yearly_files_with_scale_and_deflation() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("salary");
        std::fs::create_dir(&raw).unwrap();
        std::fs::write(raw.join("wages_2015.csv"), "terc_code;w\n0201;2\n").unwrap();
        std::fs::write(raw.join("wages_2016.csv"), "terc_code;w\n0201;3\n").unwrap();
        std::fs::write(raw.join("notes.md"), "ignored").unwrap();
        let cpi = dir.path().join("cpi.csv");
        std::fs::write(&cpi, "year,index\n2015,100\n2016,125\n").unwrap();

        let mut src = source(&raw, &[("w", "salary")]);
        src.scale = 1000.0;
        let mut cfg = config(vec![src]);
        cfg.monetary = vec![Indicator::new("salary")];
        cfg.price_index = Some(cpi);
        cfg.base_year = Some(2016);

        let table = load_indicators(&cfg, &reconciliation(), &mut Diagnostics::new()).unwrap();
        let series = table.get(&CountyId::new("0201"), &Indicator::new("salary")).unwrap();
        assert_eq!(series.observed(), vec![(2015, 2500.0), (2016, 3000.0)]);
    }
}
