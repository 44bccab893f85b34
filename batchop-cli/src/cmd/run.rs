use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use batchop_core::{ExecutionStrategy, OperationReport, OperationStatus};
use batchop_exec::executor::events::{EventSink, NoOpEventSink, StdoutEventSink, TracingEventSink};
use batchop_exec::executor::metrics::{MetricsCollector, MetricsEventSink};
use batchop_exec::{CompositeOperation, Engine, LeafOperation, Operation};
use serde::Serialize;
use tracing::debug;

use crate::commands::EventsMode;
use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::{OutputArgs, PoolArgs, SimulationArgs};

use super::config::{build_engine_config, parse_groups, parse_payloads};
use super::progress::ProgressReporter;
use super::simulate::SimulatedAction;

const DEFAULT_OPS: [&str; 3] = ["user-service", "inventory-service", "billing-service"];

pub struct RunRequest {
    pub name: String,
    pub ops: Vec<String>,
    pub fail: Vec<String>,
    pub payloads: Vec<String>,
    pub groups: Vec<String>,
    pub parallel: bool,
    pub deadline_ms: Option<u64>,
    pub events: EventsMode,
    pub progress: bool,
    pub metrics: bool,
    pub output: OutputArgs,
    pub pool: PoolArgs,
    pub simulation: SimulationArgs,
}

#[derive(Serialize)]
struct RunOutput<'a> {
    #[serde(flatten)]
    report: &'a OperationReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics: Option<serde_json::Value>,
}

pub async fn run_cmd(req: RunRequest) -> i32 {
    let output = req.output.clone();

    let (config, _) = match build_engine_config(&req.pool) {
        Ok(v) => v,
        Err(e) => {
            print_error(output.format, output.quiet, &e);
            return exit_codes::INVALID_ARGUMENTS;
        }
    };
    let root = match build_tree(&req) {
        Ok(root) => Arc::new(root),
        Err(e) => {
            print_error(output.format, output.quiet, &e);
            return exit_codes::INVALID_ARGUMENTS;
        }
    };

    let base: Arc<dyn EventSink> = match req.events {
        EventsMode::None => Arc::new(NoOpEventSink),
        EventsMode::Stdout => Arc::new(StdoutEventSink),
        EventsMode::Log => Arc::new(TracingEventSink),
    };
    let collector = req.metrics.then(|| Arc::new(MetricsCollector::new()));
    let sink: Arc<dyn EventSink> = match &collector {
        Some(collector) => Arc::new(MetricsEventSink::new(collector.clone(), base)),
        None => base,
    };

    let engine = match Engine::new(config) {
        Ok(engine) => engine.with_event_sink(sink),
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            return exit_codes::INVALID_ARGUMENTS;
        }
    };

    let progress = (req.progress && !output.quiet).then(|| ProgressReporter::spawn(root.clone()));
    let result = match req.deadline_ms {
        Some(ms) => {
            engine
                .execute_with_deadline(root.as_ref(), Duration::from_millis(ms))
                .await
        }
        None => engine.execute(root.as_ref()).await,
    };
    if let Some(progress) = progress {
        progress.finish();
    }

    let metrics = match &collector {
        Some(collector) => Some(collector.get_metrics().await.to_json()),
        None => None,
    };
    let report = root.report();
    print_result(
        output.format,
        output.quiet,
        &RunOutput {
            report: &report,
            metrics,
        },
    );
    if output.format == OutputFormat::Text && !output.quiet {
        print_summary(&report);
    }

    if result.status == OperationStatus::Success {
        exit_codes::SUCCESS
    } else {
        exit_codes::BATCH_FAILED
    }
}

fn print_summary(report: &OperationReport) {
    let counts = report.count_by_status();
    println!(
        "{}: {} ({}/{} succeeded, {} errors)",
        report.name,
        report.status,
        counts.success,
        counts.total(),
        report.errors.len()
    );
    for failure in &report.errors {
        println!("  - {failure}");
    }
}

/// Builds the root composite. Ops named by a group are nested in a child
/// composite of the same strategy; the rest sit directly under the root,
/// ahead of the groups.
fn build_tree(req: &RunRequest) -> Result<CompositeOperation, String> {
    let groups = parse_groups(&req.groups)?;
    let mut payloads = parse_payloads(&req.payloads)?;
    let strategy = if req.parallel {
        ExecutionStrategy::Parallel
    } else {
        ExecutionStrategy::Sequential
    };

    let ops: Vec<String> = if req.ops.is_empty() && groups.is_empty() {
        DEFAULT_OPS.iter().map(|s| s.to_string()).collect()
    } else {
        req.ops.clone()
    };

    let mut known = BTreeSet::new();
    let mut grouped = BTreeSet::new();
    for (_, members) in &groups {
        for op in members {
            if !grouped.insert(op.clone()) {
                return Err(format!("operation {op} appears in more than one group"));
            }
            known.insert(op.clone());
        }
    }
    let mut top_level = Vec::new();
    let mut seen = BTreeSet::new();
    for op in &ops {
        if !seen.insert(op.clone()) {
            return Err(format!("duplicate --op {op}"));
        }
        known.insert(op.clone());
        if !grouped.contains(op) {
            top_level.push(op.clone());
        }
    }

    let fail: BTreeSet<&str> = req.fail.iter().map(String::as_str).collect();
    if let Some(op) = fail.iter().find(|op| !known.contains(**op)) {
        return Err(format!("--fail names unknown operation {op}"));
    }
    if let Some(op) = payloads.keys().find(|op| !known.contains(op.as_str())) {
        return Err(format!("--payload names unknown operation {op}"));
    }

    let mut leaf = |op: &str| -> Arc<dyn Operation> {
        let payload = payloads.remove(op).unwrap_or_else(|| serde_json::json!({}));
        let action = SimulatedAction::new(op, &req.simulation, fail.contains(op));
        Arc::new(LeafOperation::new(op, payload, action))
    };

    let mut children: Vec<Arc<dyn Operation>> =
        top_level.iter().map(|op| leaf(op.as_str())).collect();
    for (name, members) in &groups {
        let group = CompositeOperation::new(name.clone(), strategy)
            .with_children(members.iter().map(|op| leaf(op.as_str())).collect::<Vec<_>>());
        children.push(Arc::new(group));
    }

    debug!(
        batch = %req.name,
        strategy = strategy.as_str(),
        operations = known.len(),
        groups = groups.len(),
        "built operation tree"
    );
    Ok(CompositeOperation::new(req.name.clone(), strategy).with_children(children))
}
