//! The `series` command: wide dated-column tables in, one tidy row per
//! (group, date, metric) out.

use crate::io::{open_input, write_output};
use anyhow::Context;
use log::info;
use std::path::{Path, PathBuf};
use tidyts_core::lookup::LookupTable;
use tidyts_core::reshape::{melt, WideSchema};
use tidyts_core::wide_table::WideTable;
use tidyts_core::MetricSeries;
use tidyts_data::pipeline::{OutputRow, Pipeline, PipelineConfig};

/// A lookup file and how its columns line up with the identity fields.
#[derive(Debug, Clone)]
pub struct LookupSource {
    pub path: PathBuf,
    /// `(lookup column, identity field)`
    pub keys: Vec<(String, String)>,
    pub value_column: String,
}

/// Read each `metric=path` source and melt it with `schema`.
pub fn load_sources(
    sources: &[(String, PathBuf)],
    schema: &WideSchema,
) -> anyhow::Result<Vec<MetricSeries>> {
    sources
        .iter()
        .map(|(metric, path)| {
            let table = WideTable::from_reader(open_input(path)?)
                .with_context(|| format!("reading {}", path.display()))?;
            info!("Loaded {} rows of {} from {}", table.len(), metric, path.display());
            let series = melt(&table, schema, metric)
                .with_context(|| format!("reshaping {}", path.display()))?;
            Ok(series)
        })
        .collect()
}

pub fn load_lookup(lookup: &LookupSource) -> anyhow::Result<LookupTable> {
    let reader = open_input(&lookup.path)?;
    let table = LookupTable::from_reader(reader, &lookup.keys, &lookup.value_column)
        .with_context(|| format!("reading lookup {}", lookup.path.display()))?;
    Ok(table)
}

pub fn run_series(
    sources: &[(String, PathBuf)],
    schema: &WideSchema,
    lookup: Option<&LookupSource>,
    config: PipelineConfig,
    output: &Path,
) -> anyhow::Result<()> {
    let series = load_sources(sources, schema)?;
    let lookup = lookup.map(load_lookup).transpose()?;

    let reports = Pipeline::new(config).run(&series, lookup.as_ref())?;
    for report in &reports {
        for (metric, fit) in &report.trends {
            if let Ok(model) = fit {
                info!(
                    "{} {}: slope {:.3}/day, r2 {:.3}",
                    report.group_key, metric, model.slope, model.r_squared
                );
            }
        }
    }

    let rows = reports
        .into_iter()
        .flat_map(|r| r.rows)
        .collect::<Vec<OutputRow>>();
    write_output(output, &rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIRMED: &str = "Province/State,Country/Region,Lat,Long,1/22/20,1/23/20,1/24/20
,A,1.0,2.0,1,3,6
Hubei,B,3.0,4.0,0,2,2
";

    const POPULATION: &str = "Province_State,Country_Region,Population
,A,1000
Hubei,B,
";

    #[test]
    fn test_series_end_to_end_csv() {
        let dir = std::env::temp_dir();
        let tag = std::process::id();
        let cases = dir.join(format!("tidyts-series-{tag}-cases.csv"));
        let population = dir.join(format!("tidyts-series-{tag}-population.csv"));
        let output = dir.join(format!("tidyts-series-{tag}-out.csv"));
        std::fs::write(&cases, CONFIRMED).unwrap();
        std::fs::write(&population, POPULATION).unwrap();

        let lookup = LookupSource {
            path: population.clone(),
            keys: vec![
                ("Province_State".to_string(), "Province/State".to_string()),
                ("Country_Region".to_string(), "Country/Region".to_string()),
            ],
            value_column: "Population".to_string(),
        };
        run_series(
            &[("cases".to_string(), cases.clone())],
            &WideSchema::global(),
            Some(&lookup),
            PipelineConfig::default(),
            &output,
        )
        .unwrap();

        let written = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(
            lines[0],
            "group,date,metric,cumulative,incremental,smoothed,trend,per_capita"
        );
        assert_eq!(lines.len(), 4);
        // day 1 has only A (B is filtered out), so the population is known
        assert!(lines[1].starts_with("ALL,2020-01-22,cases,1.0,,,"));
        assert!(lines[1].ends_with(",100.0"));
        // from day 2 B has no population, so the group total is unknown
        assert!(lines[2].starts_with("ALL,2020-01-23,cases,5.0,4.0,"));
        assert!(lines[2].ends_with(','));

        for path in [cases, population, output] {
            std::fs::remove_file(path).unwrap();
        }
    }

    #[test]
    fn test_missing_source_file() {
        let result = load_sources(
            &[("cases".to_string(), PathBuf::from("/nonexistent/tidyts/cases.csv"))],
            &WideSchema::global(),
        );
        assert!(result.is_err());
    }
}
