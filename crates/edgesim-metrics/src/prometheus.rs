//! Prometheus text exposition format.
//!
//! Renders a metric frame into the text format node-exporter's textfile
//! collector and most scrapers accept. Node metrics become labelled
//! gauges, cluster counts plain gauges, and policy scores one gauge
//! family labelled by score name.

use std::fmt::Write;

use crate::collector::{CLUSTER_PENDING, CLUSTER_TOTAL, MetricFrame, NODE_METRICS, SCORE_PREFIX, split_node_key};

fn help(metric: &str) -> &'static str {
    match metric {
        "cpu" => "CPU requested by running workloads, in millicores.",
        "memory" => "Memory requested by running workloads, in bytes.",
        "power" => "Estimated power draw in watts.",
        "power_moving_average" => "Moving average of power draw over the last three ticks.",
        "energy" => "Energy consumed since the start of the run, in watt-ticks.",
        "finished_workloads" => "Workloads finished on the node since the start of the run.",
        "running_workloads" => "Workloads currently running on the node.",
        _ => "",
    }
}

/// Escape a label value: backslash, double quote and newline.
fn escape_label(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Render `frame`, recorded at `step`, in Prometheus text format.
pub fn render_prometheus(frame: &MetricFrame, step: u64) -> String {
    let mut out = String::new();

    out.push_str("# HELP edgesim_step Simulation step the metrics were recorded at.\n");
    out.push_str("# TYPE edgesim_step gauge\n");
    let _ = writeln!(out, "edgesim_step {step}");

    for metric in NODE_METRICS {
        let _ = writeln!(out, "# HELP edgesim_node_{metric} {}", help(metric));
        let _ = writeln!(out, "# TYPE edgesim_node_{metric} gauge");
        for (key, value) in frame {
            if let Some((node, m)) = split_node_key(key) {
                if m == metric {
                    let _ = writeln!(out, "edgesim_node_{metric}{{node=\"{}\"}} {value}", escape_label(node));
                }
            }
        }
    }

    for (key, help) in [
        (CLUSTER_PENDING, "Workloads waiting for placement."),
        (CLUSTER_TOTAL, "Workloads created since the start of the run."),
    ] {
        let _ = writeln!(out, "# HELP edgesim_{key} {help}");
        let _ = writeln!(out, "# TYPE edgesim_{key} gauge");
        if let Some(value) = frame.get(key) {
            let _ = writeln!(out, "edgesim_{key} {value}");
        }
    }

    let scores: Vec<(&str, f64)> = frame
        .iter()
        .filter_map(|(k, v)| k.strip_prefix(SCORE_PREFIX).map(|name| (name, *v)))
        .collect();
    if !scores.is_empty() {
        out.push_str("# HELP edgesim_scheduler_score Scores reported by the scheduling policy.\n");
        out.push_str("# TYPE edgesim_scheduler_score gauge\n");
        for (name, value) in scores {
            let _ = writeln!(out, "edgesim_scheduler_score{{score=\"{}\"}} {value}", escape_label(name));
        }
    }

    out
}
