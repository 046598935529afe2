//! Feature table construction: lagged indicators, multi-horizon deltas and
//! turnout targets per `(county, year, round)`.

mod builder;
mod elections;
mod table;

pub use builder::FeatureBuilder;
pub use elections::load_elections;
pub use table::{FeatureRow, FeatureTable, RowStatus};

use serde::{Deserialize, Serialize};

/// What to do with a delta whose reference year precedes the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirstYearPolicy {
    /// Leave the delta missing; the row becomes incomplete.
    #[default]
    Exclude,
    /// Use a delta of zero, counted as an imputed cell.
    ZeroDelta,
}

#[cfg(test)]
mod tests {
    use geo::MultiPolygon;

    use super::*;
    use crate::config::FeatureConfig;
    use crate::diagnostics::Diagnostics;
    use crate::indicators::{Cell, IndicatorSeries, IndicatorTable, Provenance};
    use crate::types::{County, CountyId, CountySet, ElectionResult, Indicator, Round};

    fn table() -> IndicatorTable {
        let mut table = IndicatorTable::new();
        let mut salary = IndicatorSeries::from_observed((2010..=2019).map(|y| (y, f64::from(y - 2000))));
        salary.set(2020, Cell::Present { value: 21.0, provenance: Provenance::Interpolated });
        table.insert(CountyId::new("0201"), Indicator::new("salary"), salary);
        table.insert(CountyId::new("0202"), Indicator::new("salary"), IndicatorSeries::from_observed([(2019, 1.0)]));
        table
    }

    fn builder_config(policy: FirstYearPolicy) -> FeatureConfig {
        FeatureConfig { lag_years: 1, delta_horizons: vec![1, 5], first_year_policy: policy }
    }

    #[test]
    fn lagged_values_and_deltas() {
        let indicators = [Indicator::new("salary")];
        let cfg = builder_config(FirstYearPolicy::Exclude);
        let builder = FeatureBuilder::new(&indicators, &cfg);
        assert_eq!(builder.columns(), vec!["salary", "salary_d1", "salary_d5"]);

        let row = builder.row(&table(), &CountyId::new("0201"), 2020, Round::First, Some(0.6));
        assert_eq!(row.values, vec![Some(19.0), Some(1.0), Some(5.0)]);
        assert!(row.is_complete());
        assert_eq!(row.imputed, 0);
        assert_eq!(row.model_input(), Some(vec![19.0, 1.0, 5.0, 0.0]));

        // Reading the interpolated 2020 value counts it and both deltas as imputed.
        let row = builder.row(&table(), &CountyId::new("0201"), 2021, Round::Runoff, None);
        assert_eq!(row.imputed, 3);
        assert_eq!(row.model_input().unwrap().last(), Some(&1.0));
    }

    #[test]
    fn first_year_delta_policy() {
        let indicators = [Indicator::new("salary")];
        let exclude = builder_config(FirstYearPolicy::Exclude);
        let row = FeatureBuilder::new(&indicators, &exclude)
            .row(&table(), &CountyId::new("0201"), 2012, Round::First, Some(0.5));
        assert_eq!(row.status, RowStatus::Incomplete { missing: vec!["salary_d5".into()] });
        assert_eq!(row.model_input(), None);

        let zero = builder_config(FirstYearPolicy::ZeroDelta);
        let row = FeatureBuilder::new(&indicators, &zero)
            .row(&table(), &CountyId::new("0201"), 2012, Round::First, Some(0.5));
        assert!(row.is_complete());
        assert_eq!(row.values[2], Some(0.0));
        assert_eq!(row.imputed, 1);
    }

    #[test]
    fn complete_rows_never_have_missing_values() {
        let indicators = [Indicator::new("salary")];
        let cfg = builder_config(FirstYearPolicy::Exclude);
        let county = |id: &str| County { id: CountyId::new(id), name: id.into(), geometry: MultiPolygon(vec![]), historical: vec![] };
        let (counties, _) = CountySet::new(vec![county("0201"), county("0202")]);
        let elections = vec![
            ElectionResult::new(CountyId::new("0201"), 2016, Round::First, 100, 50).unwrap(),
            ElectionResult::new(CountyId::new("0202"), 2020, Round::First, 100, 60).unwrap(),
        ];

        let mut diags = Diagnostics::new();
        let features = FeatureBuilder::new(&indicators, &cfg)
            .build(&table(), &elections, &counties, 2021, Round::First, &mut diags);

        assert_eq!(features.rows.len(), 4);
        for row in &features.rows {
            assert_eq!(row.is_complete(), row.values.iter().all(Option::is_some));
        }
        assert_eq!(features.training_rows().count(), 1);
        assert_eq!(features.forecast_rows().count(), 2);
        // 0202 has a single point: its training and forecast rows are incomplete.
        assert_eq!(features.incomplete_count(), 2);
        assert_eq!(diags.len(), 2);
    }

    #[test]
    fn writes_feature_csv() {
        let indicators = [Indicator::new("salary")];
        let cfg = builder_config(FirstYearPolicy::Exclude);
        let builder = FeatureBuilder::new(&indicators, &cfg);
        let features = FeatureTable {
            columns: builder.columns(),
            rows: vec![builder.row(&table(), &CountyId::new("0201"), 2020, Round::First, Some(0.6))],
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.csv");
        features.write_csv(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text.lines().next(),
            Some("terc_code,year,round,salary,salary_d1,salary_d5,turnout,imputed_cells,status"),
        );
        let fields: Vec<&str> = text.lines().nth(1).unwrap().split(',').collect();
        assert_eq!(&fields[..3], &["0201", "2020", "1"]);
        assert_eq!(fields[3].parse::<f64>().unwrap(), 19.0);
        assert_eq!(fields[5].parse::<f64>().unwrap(), 5.0);
        assert_eq!(fields[8], "complete");
    }
}
