//! Command implementations for the tidyts CLI.
//!
//! `series` reshapes wide dated-column tables, joins them, and writes grouped
//! cumulative, incremental, smoothed, trend and per-capita values.
//! `incidents` turns an event log into daily counts normalized per year.

use anyhow::Context;
use clap::{Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tidyts_core::incident::IncidentFilter;
use tidyts_core::reshape::WideSchema;
use tidyts_data::aggregate::GroupBy;
use tidyts_data::pipeline::PipelineConfig;

pub mod incidents;
pub mod io;
pub mod series;

/// Column layouts of the known wide tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SchemaPreset {
    /// Province/State, Country/Region, Lat, Long
    #[default]
    Global,
    /// Admin2, Province_State, Country_Region plus US id and location columns
    UsCounties,
}

impl SchemaPreset {
    pub fn schema(self) -> WideSchema {
        match self {
            SchemaPreset::Global => WideSchema::global(),
            SchemaPreset::UsCounties => WideSchema::us_counties(),
        }
    }

    /// The preset's schema, or `identity` in its place when given. `drop`
    /// columns are added either way.
    pub fn with_columns(self, identity: Vec<String>, drop: Vec<String>) -> WideSchema {
        let mut schema = if identity.is_empty() {
            self.schema()
        } else {
            WideSchema {
                identity,
                drop: Vec::new(),
            }
        };
        schema.drop.extend(drop);
        schema
    }
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() && !value.is_empty() => {
            Ok((key.to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got {s:?}")),
    }
}

fn parse_source(s: &str) -> Result<(String, PathBuf), String> {
    parse_pair(s).map(|(metric, path)| (metric, PathBuf::from(path)))
}

#[derive(Subcommand)]
pub enum Command {
    /// Reshape, join and aggregate wide dated-column tables
    Series {
        /// Source table as metric=path, e.g. cases=confirmed_global.csv (repeatable)
        #[arg(short = 's', long = "source", value_parser = parse_source, required = true)]
        sources: Vec<(String, PathBuf)>,

        /// Built-in column layout, used when --identity is not given
        #[arg(long, value_enum, default_value_t = SchemaPreset::Global)]
        preset: SchemaPreset,

        /// Identity column, in key order (repeatable)
        #[arg(long = "identity")]
        identity: Vec<String>,

        /// Column to discard before reshaping, on top of the preset's (repeatable)
        #[arg(long = "drop")]
        drop: Vec<String>,

        /// Lookup table with a per-identity value such as population
        #[arg(long)]
        lookup: Option<PathBuf>,

        /// Lookup column mapped to an identity field, as column=field (repeatable)
        #[arg(long = "lookup-key", value_parser = parse_pair)]
        lookup_keys: Vec<(String, String)>,

        /// Lookup column holding the value
        #[arg(long, default_value = "Population")]
        lookup_value: String,

        /// all, identity, or an identity field name
        #[arg(short = 'g', long)]
        group_by: Option<GroupBy>,

        /// Metric to report (repeatable, default: every source)
        #[arg(long = "metric")]
        metrics: Vec<String>,

        /// Moving-average window in days
        #[arg(short = 'w', long)]
        window: Option<usize>,

        /// Metric used for filtering and ranking
        #[arg(long)]
        primary: Option<String>,

        /// Keep records whose primary metric is zero or negative
        #[arg(long)]
        keep_non_positive: bool,

        /// Fit trends over the last N dates only
        #[arg(long)]
        trend_window: Option<usize>,

        /// Per-capita multiplier
        #[arg(long)]
        per_capita_scale: Option<f64>,

        /// Keep only the N largest groups
        #[arg(long)]
        top: Option<usize>,

        /// JSON pipeline config; flags override it
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,

        /// Output path, .csv or .json
        #[arg(short = 'o', long)]
        output: PathBuf,
    },

    /// Daily counts of an incident log, normalized within each year
    Incidents {
        /// Incident CSV, optionally .gz
        #[arg(short = 'i', long)]
        input: PathBuf,

        /// Column holding the occurrence date
        #[arg(long, default_value = "OCCUR_DATE")]
        date_column: String,

        /// Only count rows where column=value
        #[arg(short = 'f', long)]
        filter: Option<IncidentFilter>,

        /// Moving-average window in days
        #[arg(short = 'w', long)]
        window: Option<usize>,

        /// JSON pipeline config; flags override it
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,

        /// Output path, .csv or .json
        #[arg(short = 'o', long)]
        output: PathBuf,
    },
}

/// Load a config file, or the defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read config {}", path.display()))?;
            let config = serde_json::from_str(&text)
                .with_context(|| format!("invalid config {}", path.display()))?;
            Ok(config)
        }
        None => Ok(PipelineConfig::default()),
    }
}

pub fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Series {
            sources,
            preset,
            identity,
            drop,
            lookup,
            lookup_keys,
            lookup_value,
            group_by,
            metrics,
            window,
            primary,
            keep_non_positive,
            trend_window,
            per_capita_scale,
            top,
            config,
            output,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(group_by) = group_by {
                config.group_by = group_by;
            }
            if !metrics.is_empty() {
                config.metrics = metrics;
            }
            if let Some(window) = window {
                config.window = window;
            }
            if primary.is_some() {
                config.primary_metric = primary;
            }
            if keep_non_positive {
                config.filter_non_positive = false;
            }
            if trend_window.is_some() {
                config.trend_window = trend_window;
            }
            if let Some(scale) = per_capita_scale {
                config.per_capita_scale = scale;
            }
            if top.is_some() {
                config.top = top;
            }

            let schema = preset.with_columns(identity, drop);
            let lookup = match lookup {
                Some(path) => {
                    if lookup_keys.is_empty() {
                        anyhow::bail!("--lookup needs at least one --lookup-key column=field");
                    }
                    Some(series::LookupSource {
                        path,
                        keys: lookup_keys,
                        value_column: lookup_value,
                    })
                }
                None => None,
            };
            series::run_series(&sources, &schema, lookup.as_ref(), config, &output)
        }
        Command::Incidents {
            input,
            date_column,
            filter,
            window,
            config,
            output,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(window) = window {
                config.window = window;
            }
            incidents::run_incidents(&input, &date_column, filter.as_ref(), config, &output)
        }
    }
}
