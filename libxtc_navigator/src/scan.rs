// Scan tables. During a scan the DAQ holds a set of control PVs fixed for each step
// and records the values (and monitored PV limits) in the step's ControlData record.
// The aggregator walks a run step by step, keeps the control data of each step and the
// time of its first event, and places every step on the run's global event index
// through a second, indexed view of the same run.
use ndarray::Array1;
use std::collections::BTreeMap;

use super::error::ScanError;
use super::event_time::EventTime;
use super::graph::SourceGraph;
use super::record::{ControlDataConfig, PvControl, PvMonitor};
use super::resolver::ConfigResolver;
use super::source::sanitize_alias;
use super::store::{IndexedStore, StepStore};

/// One step of a scan
#[derive(Debug, Clone, PartialEq)]
pub struct ScanStep {
    pub step: usize,
    /// Global index of the first event of the step
    pub start_index: usize,
    /// Global index of the last event of the step (inclusive)
    pub end_index: usize,
    pub start_time: EventTime,
    pub end_time: EventTime,
    pub controls: Vec<PvControl>,
    pub monitors: Vec<PvMonitor>,
}

impl ScanStep {
    pub fn nevents(&self) -> usize {
        (self.end_index + 1).saturating_sub(self.start_index)
    }

    /// Seconds between the first and last event of the step
    pub fn duration(&self) -> f64 {
        self.end_time.as_f64() - self.start_time.as_f64()
    }

    pub fn control_value(&self, pv: &str) -> Option<f64> {
        self.controls
            .iter()
            .find(|control| control.name == pv)
            .map(|control| control.value)
    }
}

/// Per-variable arrays of a simple scan, one entry per step
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleScan {
    /// (control PV, alias) in control order
    pub pv_aliases: Vec<(String, String)>,
    /// Control values by alias
    pub control_values: BTreeMap<String, Array1<f64>>,
    /// Monitor limits by PV name
    pub monitor_lo: BTreeMap<String, Array1<f64>>,
    pub monitor_hi: BTreeMap<String, Array1<f64>>,
}

impl SimpleScan {
    pub fn alias_of(&self, pv: &str) -> Option<&str> {
        self.pv_aliases
            .iter()
            .find(|(name, _)| name == pv)
            .map(|(_, alias)| alias.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanTable {
    pub run: i32,
    pub steps: Vec<ScanStep>,
    pub uses_duration: bool,
    pub uses_events: bool,
    pub uses_l3t_events: bool,
    pub simple: Option<SimpleScan>,
}

impl ScanTable {
    pub fn nsteps(&self) -> usize {
        self.steps.len()
    }

    pub fn nevents(&self) -> Vec<usize> {
        self.steps.iter().map(|step| step.nevents()).collect()
    }

    pub fn start_times(&self) -> Array1<f64> {
        self.steps.iter().map(|step| step.start_time.as_f64()).collect()
    }

    pub fn end_times(&self) -> Array1<f64> {
        self.steps.iter().map(|step| step.end_time.as_f64()).collect()
    }

    pub fn step_durations(&self) -> Array1<f64> {
        self.steps.iter().map(|step| step.duration()).collect()
    }

    pub fn is_simple(&self) -> bool {
        self.simple.is_some()
    }

    /// Values of a control variable across the steps, by alias
    pub fn control(&self, alias: &str) -> Option<&Array1<f64>> {
        self.simple
            .as_ref()
            .and_then(|simple| simple.control_values.get(alias))
    }
}

/// What is kept from each step while walking the run
struct CapturedStep {
    step: usize,
    start_index: usize,
    start_time: EventTime,
    control: ControlDataConfig,
    graph: SourceGraph,
}

/// ScanAggregator builds the ScanTable of a run
#[derive(Debug, Clone)]
pub struct ScanAggregator {
    resolver: ConfigResolver,
}

impl ScanAggregator {
    pub fn new(resolver: ConfigResolver) -> Self {
        Self { resolver }
    }

    /// Build the table from a fresh step stream and an indexed view of the same run.
    ///
    /// Steps without events cannot be placed on the event index and are skipped.
    pub fn build(
        &self,
        stream: &mut dyn StepStore,
        index: &dyn IndexedStore,
    ) -> Result<ScanTable, ScanError> {
        let total = index.event_count();
        if total == 0 {
            return Err(ScanError::EmptyRun);
        }

        let mut captured: Vec<CapturedStep> = Vec::new();
        let mut step = 0;
        while let Some(config) = stream.next_step_snapshot()? {
            let graph = self.resolver.resolve(&config)?;
            match stream.next_event_in_step()? {
                Some(first) => captured.push(CapturedStep {
                    step,
                    start_index: index.time_index_of(&first.time)?,
                    start_time: first.time,
                    control: graph.control_data().cloned().unwrap_or_default(),
                    graph,
                }),
                None => log::warn!(
                    "Step {step} of run {} has no events and is left out of the scan table",
                    stream.run_number()
                ),
            }
            step += 1;
        }
        if captured.is_empty() {
            return Err(ScanError::EmptyRun);
        }

        let mut steps: Vec<ScanStep> = Vec::with_capacity(captured.len());
        for (i, capture) in captured.iter().enumerate() {
            let end_index = match captured.get(i + 1) {
                Some(next) => next.start_index.saturating_sub(1),
                None => total - 1,
            };
            steps.push(ScanStep {
                step: capture.step,
                start_index: capture.start_index,
                end_index,
                start_time: capture.start_time,
                end_time: index.event_time_at(end_index as i64)?,
                controls: capture.control.pv_controls.clone(),
                monitors: capture.control.pv_monitors.clone(),
            });
        }

        let controls: Vec<&ControlDataConfig> = captured.iter().map(|c| &c.control).collect();
        let table = ScanTable {
            run: index.run_number(),
            uses_duration: controls.iter().all(|c| c.uses_duration),
            uses_events: controls.iter().all(|c| c.uses_events),
            uses_l3t_events: controls.iter().all(|c| c.uses_l3t_events),
            simple: Self::simple_scan(&captured, &steps),
            steps,
        };
        log::info!(
            "Built scan table for run {} with {} steps ({})",
            table.run,
            table.nsteps(),
            if table.is_simple() { "simple" } else { "not simple" }
        );
        Ok(table)
    }

    /// A scan is simple when every step has the same number of controls and monitors
    fn simple_scan(captured: &[CapturedStep], steps: &[ScanStep]) -> Option<SimpleScan> {
        let first = captured.first()?;
        let n_controls = first.control.pv_controls.len();
        let n_monitors = first.control.pv_monitors.len();
        if !captured.iter().all(|c| {
            c.control.pv_controls.len() == n_controls && c.control.pv_monitors.len() == n_monitors
        }) {
            return None;
        }

        let mut scan = SimpleScan {
            pv_aliases: Vec::new(),
            control_values: BTreeMap::new(),
            monitor_lo: BTreeMap::new(),
            monitor_hi: BTreeMap::new(),
        };
        for control in first.control.pv_controls.iter() {
            let alias = Self::control_alias(&control.name, &first.control, &first.graph);
            let values: Array1<f64> = steps
                .iter()
                .map(|step| step.control_value(&control.name).unwrap_or(f64::NAN))
                .collect();
            scan.control_values.insert(alias.clone(), values);
            scan.pv_aliases.push((control.name.clone(), alias));
        }
        for monitor in first.control.pv_monitors.iter() {
            let limits = |step: &ScanStep| {
                step.monitors
                    .iter()
                    .find(|m| m.name == monitor.name)
                    .map_or((f64::NAN, f64::NAN), |m| (m.lo_value, m.hi_value))
            };
            scan.monitor_lo.insert(
                monitor.name.clone(),
                steps.iter().map(|step| limits(step).0).collect(),
            );
            scan.monitor_hi.insert(
                monitor.name.clone(),
                steps.iter().map(|step| limits(step).1).collect(),
            );
        }
        Some(scan)
    }

    /// Control label, else EPICS alias, else the PV name itself
    fn control_alias(pv: &str, control: &ControlDataConfig, graph: &SourceGraph) -> String {
        let label = control
            .pv_labels
            .iter()
            .find(|label| label.name == pv && !label.value.is_empty())
            .map(|label| label.value.as_str());
        sanitize_alias(label.or_else(|| graph.pv_alias(pv)).unwrap_or(pv))
    }
}
