//! Chart projections over the AGG and MET stores.
//!
//! All eight charts are produced by the same filter-and-fold [`reduce`],
//! parameterised by which value column is summed and which column groups rows.

use crate::view_settings::ViewSettings;
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use shared::{ActivityKind, AggregateRecord, MetricRecord};
use std::fmt;
use std::hash::Hash;

/// Worker column of a chart row. Folded rows carry [`WorkerLabel::All`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerLabel {
    Worker(u64),
    All,
}

impl fmt::Display for WorkerLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerLabel::Worker(id) => write!(f, "{}", id),
            WorkerLabel::All => f.write_str("all"),
        }
    }
}

impl Serialize for WorkerLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            WorkerLabel::Worker(id) => serializer.serialize_u64(*id),
            WorkerLabel::All => serializer.serialize_str("all"),
        }
    }
}

/// One row handed to the renderer, keeping the backend's short column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChartRow {
    #[serde(rename = "a")]
    pub activity: ActivityKind,
    #[serde(rename = "wf")]
    pub worker_from: WorkerLabel,
    #[serde(rename = "wt", skip_serializing_if = "Option::is_none")]
    pub worker_to: Option<WorkerLabel>,
    #[serde(rename = "ac")]
    pub count: u64,
    #[serde(rename = "wac")]
    pub weighted_count: u64,
    #[serde(rename = "at")]
    pub activity_time_ns: u64,
    #[serde(rename = "rc")]
    pub record_count: u64,
}

impl From<&AggregateRecord> for ChartRow {
    fn from(record: &AggregateRecord) -> Self {
        ChartRow {
            activity: record.activity,
            worker_from: WorkerLabel::Worker(record.worker),
            worker_to: None,
            count: record.count,
            weighted_count: record.weighted_count,
            activity_time_ns: 0,
            record_count: 0,
        }
    }
}

impl From<&MetricRecord> for ChartRow {
    fn from(record: &MetricRecord) -> Self {
        ChartRow {
            activity: record.activity,
            worker_from: WorkerLabel::Worker(record.worker_from),
            worker_to: record.worker_to.map(WorkerLabel::Worker),
            count: record.activity_count,
            weighted_count: 0,
            activity_time_ns: record.activity_time_ns,
            record_count: record.record_count,
        }
    }
}

impl ChartRow {
    pub fn x_label(&self, axis: XAxis) -> String {
        match axis {
            XAxis::ActivityWorker => match self.worker_from {
                WorkerLabel::All => self.activity.to_string(),
                worker => format!("{},{}", self.activity, worker),
            },
            XAxis::Worker => self.worker_from.to_string(),
            XAxis::WorkerPair => match (self.worker_from, self.worker_to) {
                (WorkerLabel::All, _) => WorkerLabel::All.to_string(),
                (from, Some(to)) => format!("{},{}", from, to),
                (from, None) => from.to_string(),
            },
        }
    }
}

/// Column summed by the fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueField {
    Count,
    WeightedCount,
    ActivityTime,
    RecordCount,
}

impl ValueField {
    pub const ALL: [ValueField; 4] = [
        ValueField::Count,
        ValueField::WeightedCount,
        ValueField::ActivityTime,
        ValueField::RecordCount,
    ];

    pub fn get(self, row: &ChartRow) -> u64 {
        match self {
            ValueField::Count => row.count,
            ValueField::WeightedCount => row.weighted_count,
            ValueField::ActivityTime => row.activity_time_ns,
            ValueField::RecordCount => row.record_count,
        }
    }

    pub fn get_mut(self, row: &mut ChartRow) -> &mut u64 {
        match self {
            ValueField::Count => &mut row.count,
            ValueField::WeightedCount => &mut row.weighted_count,
            ValueField::ActivityTime => &mut row.activity_time_ns,
            ValueField::RecordCount => &mut row.record_count,
        }
    }
}

/// First row of a new group: worker columns become `All`, value columns
/// other than the summed one are cleared.
fn seed(mut row: ChartRow, value: ValueField) -> ChartRow {
    row.worker_from = WorkerLabel::All;
    row.worker_to = row.worker_to.map(|_| WorkerLabel::All);
    let kept = value.get(&row);
    for field in ValueField::ALL {
        *field.get_mut(&mut row) = 0;
    }
    *value.get_mut(&mut row) = kept;
    row
}

/// Filter idle activity kinds unless `show_waiting`, then either pass rows
/// through (`split_worker`) or sum `value` per `group_key` in order of first
/// appearance.
pub fn reduce<K>(
    rows: impl IntoIterator<Item = ChartRow>,
    value: ValueField,
    show_waiting: bool,
    split_worker: bool,
    group_key: impl Fn(&ChartRow) -> K,
) -> Vec<ChartRow>
where
    K: Hash + Eq,
{
    let filtered = rows
        .into_iter()
        .filter(|row| show_waiting || !row.activity.is_idle());

    if split_worker {
        return filtered.collect();
    }

    let mut groups: IndexMap<K, ChartRow> = IndexMap::new();
    for row in filtered {
        let addend = value.get(&row);
        groups
            .entry(group_key(&row))
            .and_modify(|existing| {
                let total = value.get_mut(existing);
                *total = total.saturating_add(addend);
            })
            .or_insert_with(|| seed(row, value));
    }
    groups.into_values().collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Aggregates,
    Metrics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XAxis {
    ActivityWorker,
    Worker,
    WorkerPair,
}

/// Presentation hints for one chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartSpec {
    pub title: &'static str,
    pub x_axis: XAxis,
    pub x_title: &'static str,
    pub y_title: &'static str,
    pub color_by_activity: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Projection {
    KHopCount,
    KHopWeightedCount,
    ActivityCount,
    ActivityDuration,
    MessageCount,
    MessageDuration,
    RecordsSent,
    RecordsProcessed,
}

impl Projection {
    pub const ALL: [Projection; 8] = [
        Projection::KHopCount,
        Projection::KHopWeightedCount,
        Projection::ActivityCount,
        Projection::ActivityDuration,
        Projection::MessageCount,
        Projection::MessageDuration,
        Projection::RecordsSent,
        Projection::RecordsProcessed,
    ];

    pub fn source(self) -> Source {
        match self {
            Projection::KHopCount | Projection::KHopWeightedCount => Source::Aggregates,
            _ => Source::Metrics,
        }
    }

    /// Rows of the source store this chart considers at all.
    pub fn selects(self, activity: ActivityKind) -> bool {
        match self {
            Projection::MessageCount | Projection::MessageDuration => activity.is_message(),
            Projection::RecordsSent => activity == ActivityKind::DataMessage,
            Projection::RecordsProcessed => activity == ActivityKind::Processing,
            _ => true,
        }
    }

    pub fn value_field(self) -> ValueField {
        match self {
            Projection::KHopCount | Projection::ActivityCount | Projection::MessageCount => {
                ValueField::Count
            }
            Projection::KHopWeightedCount => ValueField::WeightedCount,
            Projection::ActivityDuration | Projection::MessageDuration => ValueField::ActivityTime,
            Projection::RecordsSent | Projection::RecordsProcessed => ValueField::RecordCount,
        }
    }

    /// Every chart folds by activity kind.
    pub fn group_key(row: &ChartRow) -> ActivityKind {
        row.activity
    }

    pub fn chart(self) -> ChartSpec {
        let (title, x_axis, y_title) = match self {
            Projection::KHopCount => ("K-Hops", XAxis::ActivityWorker, "count"),
            Projection::KHopWeightedCount => ("Weighted K-Hops", XAxis::ActivityWorker, "count"),
            Projection::ActivityCount => ("Activity Count", XAxis::Worker, "# activities"),
            Projection::ActivityDuration => {
                ("Activity Duration", XAxis::Worker, "t activities (ns)")
            }
            Projection::MessageCount => ("Message Count", XAxis::WorkerPair, "# activities"),
            Projection::MessageDuration => {
                ("Message Duration", XAxis::WorkerPair, "t activities (ns)")
            }
            Projection::RecordsSent => ("Records Sent", XAxis::WorkerPair, "# records"),
            Projection::RecordsProcessed => ("Records Processed", XAxis::Worker, "# records"),
        };
        let x_title = match x_axis {
            XAxis::ActivityWorker => "activity type",
            XAxis::Worker => "worker id",
            XAxis::WorkerPair => "worker ids",
        };
        ChartSpec {
            title,
            x_axis,
            x_title,
            y_title,
            color_by_activity: matches!(
                self,
                Projection::ActivityCount
                    | Projection::ActivityDuration
                    | Projection::MessageCount
                    | Projection::MessageDuration
            ),
        }
    }

    pub fn project(
        self,
        aggregates: &[AggregateRecord],
        metrics: &[MetricRecord],
        settings: &ViewSettings,
    ) -> Vec<ChartRow> {
        let rows: Vec<ChartRow> = match self.source() {
            Source::Aggregates => aggregates
                .iter()
                .filter(|record| self.selects(record.activity))
                .map(ChartRow::from)
                .collect(),
            Source::Metrics => metrics
                .iter()
                .filter(|record| self.selects(record.activity))
                .map(ChartRow::from)
                .collect(),
        };
        reduce(
            rows,
            self.value_field(),
            settings.show_waiting,
            settings.split_worker,
            Projection::group_key,
        )
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.chart().title)
    }
}
