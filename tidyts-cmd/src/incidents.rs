//! The `incidents` command: an event log in, daily counts normalized within
//! each calendar year out.

use crate::io::{open_input, write_output};
use anyhow::Context;
use log::info;
use std::path::Path;
use tidyts_core::incident::{IncidentFilter, IncidentLog};
use tidyts_data::pipeline::{Pipeline, PipelineConfig};

pub fn run_incidents(
    input: &Path,
    date_column: &str,
    filter: Option<&IncidentFilter>,
    config: PipelineConfig,
    output: &Path,
) -> anyhow::Result<()> {
    let events = IncidentLog::from_reader(open_input(input)?, date_column)
        .with_context(|| format!("reading {}", input.display()))?;
    if let Some((first, last)) = events.date_span() {
        info!("{} events from {} to {}", events.len(), first, last);
    }
    let points = Pipeline::new(config).incidents(&events, filter)?;
    write_output(output, &points)
}
