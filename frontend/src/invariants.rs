//! Append-only log of invariant violations reported through INV frames.
//!
//! Storage keeps arrival order. Every read-time view sorts a copy by duration,
//! longest first, so repeated reads never reorder what was stored.

use crate::visualizer::timeline::time_domain::{DurationNs, NS_PER_MILLISECOND};
use shared::{
    EpochViolation, InvariantKind, InvariantReport, MessageViolation, OperatorViolation,
};

pub const NO_VIOLATIONS: &str = "No invariants violated.";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvariantLog {
    epochs: Vec<EpochViolation>,
    operators: Vec<OperatorViolation>,
    messages: Vec<MessageViolation>,
    epoch_max_ns: Option<u64>,
    operator_max_ns: Option<u64>,
    message_max_ns: Option<u64>,
}

impl InvariantLog {
    /// Append one INV payload. The first threshold seen per kind is kept for
    /// the rest of the session.
    pub fn ingest(&mut self, reports: Vec<InvariantReport>) {
        for report in reports {
            let max_ns = report.max_ns();
            match report {
                InvariantReport::Epoch(violation) => {
                    self.epoch_max_ns.get_or_insert(max_ns);
                    self.epochs.push(violation);
                }
                InvariantReport::Operator(violation) => {
                    self.operator_max_ns.get_or_insert(max_ns);
                    self.operators.push(violation);
                }
                InvariantReport::Message(violation) => {
                    self.message_max_ns.get_or_insert(max_ns);
                    self.messages.push(violation);
                }
            }
        }
    }

    pub fn threshold_ns(&self, kind: InvariantKind) -> Option<u64> {
        match kind {
            InvariantKind::Epoch => self.epoch_max_ns,
            InvariantKind::Operator => self.operator_max_ns,
            InvariantKind::Message => self.message_max_ns,
        }
    }

    pub fn len(&self, kind: InvariantKind) -> usize {
        match kind {
            InvariantKind::Epoch => self.epochs.len(),
            InvariantKind::Operator => self.operators.len(),
            InvariantKind::Message => self.messages.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty() && self.operators.is_empty() && self.messages.is_empty()
    }

    pub fn sorted_epochs(&self) -> Vec<&EpochViolation> {
        sorted_by_duration(&self.epochs, EpochViolation::duration_ns)
    }

    pub fn sorted_operators(&self) -> Vec<&OperatorViolation> {
        sorted_by_duration(&self.operators, OperatorViolation::duration_ns)
    }

    pub fn sorted_messages(&self) -> Vec<&MessageViolation> {
        sorted_by_duration(&self.messages, MessageViolation::duration_ns)
    }

    pub fn panel(&self) -> InvariantPanel {
        InvariantPanel {
            epochs: InvariantSection {
                title: "Epoch Duration",
                threshold: self.epoch_max_ns.map(format_threshold),
                lines: self.sorted_epochs().into_iter().map(format_epoch).collect(),
            },
            operators: InvariantSection {
                title: "Operator Duration",
                threshold: self.operator_max_ns.map(format_threshold),
                lines: self
                    .sorted_operators()
                    .into_iter()
                    .map(format_operator)
                    .collect(),
            },
            messages: InvariantSection {
                title: "Message Duration",
                threshold: self.message_max_ns.map(format_threshold),
                lines: self
                    .sorted_messages()
                    .into_iter()
                    .map(format_message)
                    .collect(),
            },
        }
    }
}

fn sorted_by_duration<T>(items: &[T], duration_ns: impl Fn(&T) -> u64) -> Vec<&T> {
    let mut sorted: Vec<&T> = items.iter().collect();
    sorted.sort_by(|a, b| duration_ns(b).cmp(&duration_ns(a)));
    sorted
}

/// Rendered form of the log, one section per violation kind.
#[derive(Debug, Clone, PartialEq)]
pub struct InvariantPanel {
    pub epochs: InvariantSection,
    pub operators: InvariantSection,
    pub messages: InvariantSection,
}

impl InvariantPanel {
    pub fn sections(&self) -> [&InvariantSection; 3] {
        [&self.epochs, &self.operators, &self.messages]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvariantSection {
    pub title: &'static str,
    pub threshold: Option<String>,
    pub lines: Vec<String>,
}

impl InvariantSection {
    pub fn heading(&self) -> String {
        match &self.threshold {
            Some(threshold) => format!("{} {}", self.title, threshold),
            None => self.title.to_string(),
        }
    }

    pub fn body(&self) -> String {
        if self.lines.is_empty() {
            NO_VIOLATIONS.to_string()
        } else {
            self.lines.join("\n")
        }
    }
}

fn millis(duration_ns: u64) -> f64 {
    DurationNs::from_nanos(duration_ns).display_millis()
}

fn format_threshold(max_ns: u64) -> String {
    format!("(max: {}ms)", max_ns as f64 / NS_PER_MILLISECOND)
}

fn format_epoch(violation: &EpochViolation) -> String {
    format!(
        "Epoch {} took {:.2}ms.",
        violation.from.epoch,
        millis(violation.duration_ns())
    )
}

fn format_operator(violation: &OperatorViolation) -> String {
    let edge = &violation.from;
    let operator = edge
        .operator_id
        .map_or_else(|| "?".to_string(), |id| id.to_string());
    format!(
        "Epoch {} | w{} @ {}: Operator {} ({}) took {:.2}ms.",
        edge.source.epoch,
        edge.source.worker_id,
        edge.source.timestamp.as_nanos(),
        operator,
        edge.edge_type,
        millis(violation.duration_ns())
    )
}

fn format_message(violation: &MessageViolation) -> String {
    let msg = &violation.msg;
    format!(
        "Epoch {} | w{} @ {} -> w{} @ {}: {} took {:.2}ms.",
        msg.source.epoch,
        msg.source.worker_id,
        msg.source.timestamp.as_nanos(),
        msg.destination.worker_id,
        msg.destination.timestamp.as_nanos(),
        msg.edge_type,
        millis(violation.duration_ns())
    )
}
