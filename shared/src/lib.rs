use serde::{Deserialize, Serialize};
use std::fmt;

// ===== MESSAGE TYPES =====

/// Requests sent to the trace backend, serialized as `{"type": .., "epoch": ..}`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum UpMsg {
    #[serde(rename = "PAG")]
    ActivityEdges { epoch: Epoch },
    #[serde(rename = "AGG")]
    Aggregates { epoch: Epoch },
    #[serde(rename = "ALL")]
    Correlations { epoch: Epoch },
    #[serde(rename = "MET")]
    Metrics { epoch: Epoch },
    #[serde(rename = "INV")]
    Invariants,
}

impl UpMsg {
    /// The four epoch-scoped requests issued together whenever the epoch changes.
    pub fn epoch_batch(epoch: Epoch) -> [UpMsg; 4] {
        [
            UpMsg::ActivityEdges { epoch },
            UpMsg::Aggregates { epoch },
            UpMsg::Correlations { epoch },
            UpMsg::Metrics { epoch },
        ]
    }

    pub fn kind(&self) -> FrameKind {
        match self {
            UpMsg::ActivityEdges { .. } => FrameKind::Pag,
            UpMsg::Aggregates { .. } => FrameKind::Agg,
            UpMsg::Correlations { .. } => FrameKind::All,
            UpMsg::Metrics { .. } => FrameKind::Met,
            UpMsg::Invariants => FrameKind::Inv,
        }
    }

    pub fn epoch(&self) -> Option<Epoch> {
        match *self {
            UpMsg::ActivityEdges { epoch }
            | UpMsg::Aggregates { epoch }
            | UpMsg::Correlations { epoch }
            | UpMsg::Metrics { epoch } => Some(epoch),
            UpMsg::Invariants => None,
        }
    }
}

/// Frames pushed by the backend, serialized as `{"type": .., "payload": ..}`.
///
/// Decoding goes through [`DownMsg::decode`] so that an unknown `type` and a
/// payload of the wrong shape are reported separately.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum DownMsg {
    #[serde(rename = "PAG")]
    ActivityEdges(Vec<ActivityEdge>),
    #[serde(rename = "AGG")]
    Aggregates(Vec<AggregateRecord>),
    #[serde(rename = "ALL")]
    Correlations(Vec<CorrelationPair>),
    #[serde(rename = "MET")]
    Metrics(Vec<MetricRecord>),
    #[serde(rename = "INV")]
    Invariants(Vec<InvariantReport>),
}

#[derive(Deserialize)]
struct FrameEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: serde_json::Value,
}

impl DownMsg {
    pub fn decode(text: &str) -> Result<Self, FrameError> {
        let envelope: FrameEnvelope = serde_json::from_str(text).map_err(FrameError::Malformed)?;
        let Some(kind) = FrameKind::from_wire(&envelope.kind) else {
            return Err(FrameError::UnknownKind(envelope.kind));
        };

        let payload = envelope.payload;
        let decoded = match kind {
            FrameKind::Pag => serde_json::from_value(payload).map(DownMsg::ActivityEdges),
            FrameKind::Agg => serde_json::from_value(payload).map(DownMsg::Aggregates),
            FrameKind::All => serde_json::from_value(payload).map(DownMsg::Correlations),
            FrameKind::Met => serde_json::from_value(payload).map(DownMsg::Metrics),
            FrameKind::Inv => serde_json::from_value(payload).map(DownMsg::Invariants),
        };
        decoded.map_err(|source| FrameError::Payload { kind, source })
    }

    pub fn kind(&self) -> FrameKind {
        match self {
            DownMsg::ActivityEdges(_) => FrameKind::Pag,
            DownMsg::Aggregates(_) => FrameKind::Agg,
            DownMsg::Correlations(_) => FrameKind::All,
            DownMsg::Metrics(_) => FrameKind::Met,
            DownMsg::Invariants(_) => FrameKind::Inv,
        }
    }
}

/// Wire tag shared by requests and frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Pag,
    Agg,
    All,
    Met,
    Inv,
}

impl FrameKind {
    pub fn from_wire(tag: &str) -> Option<Self> {
        match tag {
            "PAG" => Some(FrameKind::Pag),
            "AGG" => Some(FrameKind::Agg),
            "ALL" => Some(FrameKind::All),
            "MET" => Some(FrameKind::Met),
            "INV" => Some(FrameKind::Inv),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FrameKind::Pag => "PAG",
            FrameKind::Agg => "AGG",
            FrameKind::All => "ALL",
            FrameKind::Met => "MET",
            FrameKind::Inv => "INV",
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("unknown frame type '{0}'")]
    UnknownKind(String),
    #[error("{kind} payload has an unexpected shape: {source}")]
    Payload {
        kind: FrameKind,
        #[source]
        source: serde_json::Error,
    },
}

// ===== EPOCH =====

/// Request-correlation token selected by the user.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(transparent)]
pub struct Epoch(pub u64);

impl Epoch {
    /// Parses raw text input. Anything that is not a plain non-negative
    /// integer (after trimming whitespace) is rejected.
    pub fn parse_input(raw: &str) -> Option<Epoch> {
        raw.trim().parse::<u64>().ok().map(Epoch)
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ===== ACTIVITY TYPES =====

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActivityKind {
    Processing,
    Spinning,
    ControlMessage,
    DataMessage,
    Waiting,
    Busy,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 6] = [
        ActivityKind::Processing,
        ActivityKind::Spinning,
        ActivityKind::ControlMessage,
        ActivityKind::DataMessage,
        ActivityKind::Waiting,
        ActivityKind::Busy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActivityKind::Processing => "Processing",
            ActivityKind::Spinning => "Spinning",
            ActivityKind::ControlMessage => "ControlMessage",
            ActivityKind::DataMessage => "DataMessage",
            ActivityKind::Waiting => "Waiting",
            ActivityKind::Busy => "Busy",
        }
    }

    /// Display color used by every chart and the timeline.
    pub fn color(self) -> &'static str {
        match self {
            ActivityKind::Processing => "#0b6623",
            ActivityKind::Spinning => "#e48282",
            ActivityKind::ControlMessage => "#4b5f53",
            ActivityKind::DataMessage => "#971757",
            ActivityKind::Waiting => "#FF0000",
            ActivityKind::Busy => "#059dc0",
        }
    }

    /// Waiting and Busy, the kinds hidden by the "show waiting" toggle.
    pub fn is_idle(self) -> bool {
        matches!(self, ActivityKind::Waiting | ActivityKind::Busy)
    }

    pub fn is_message(self) -> bool {
        matches!(self, ActivityKind::ControlMessage | ActivityKind::DataMessage)
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Traversal {
    #[default]
    Undefined,
    Block,
    Unbounded,
}

// ===== PAG TYPES =====

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    #[serde(rename = "w")]
    pub worker: u64,
    #[serde(rename = "t")]
    pub timestamp_ns: u64,
    #[serde(rename = "e", default)]
    pub epoch: u64,
}

/// One edge of the activity graph for the selected epoch.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ActivityEdge {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    #[serde(rename = "o", default)]
    pub operator_id: u64,
    #[serde(rename = "l", default)]
    pub length: i64,
    #[serde(rename = "tr", default)]
    pub traversal: Traversal,
    pub src: Endpoint,
    pub dst: Endpoint,
}

impl ActivityEdge {
    pub fn is_cross_worker(&self) -> bool {
        self.src.worker != self.dst.worker
    }

    pub fn duration_ns(&self) -> u64 {
        self.dst.timestamp_ns.saturating_sub(self.src.timestamp_ns)
    }

    pub fn correlation_key(&self) -> CorrelationKey {
        CorrelationKey::from_timestamps(self.src.timestamp_ns, self.dst.timestamp_ns)
    }
}

/// `[srcTimestamp, dstTimestamp]` pair carried by ALL frames.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationPair(pub u64, pub u64);

/// Both timestamps concatenated verbatim, source first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationKey(String);

impl CorrelationKey {
    pub fn from_timestamps(src_ns: u64, dst_ns: u64) -> Self {
        CorrelationKey(format!("{}{}", src_ns, dst_ns))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<CorrelationPair> for CorrelationKey {
    fn from(pair: CorrelationPair) -> Self {
        CorrelationKey::from_timestamps(pair.0, pair.1)
    }
}

// ===== AGGREGATE TYPES =====

/// K-hop summary row, one per (activity, worker).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateRecord {
    #[serde(rename = "a")]
    pub activity: ActivityKind,
    #[serde(rename = "wf")]
    pub worker: u64,
    #[serde(rename = "ac")]
    pub count: u64,
    #[serde(rename = "wac")]
    pub weighted_count: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricRecord {
    #[serde(rename = "a")]
    pub activity: ActivityKind,
    #[serde(rename = "wf")]
    pub worker_from: u64,
    #[serde(rename = "wt", default, skip_serializing_if = "Option::is_none")]
    pub worker_to: Option<u64>,
    #[serde(rename = "ac")]
    pub activity_count: u64,
    #[serde(rename = "at")]
    pub activity_time_ns: u64,
    #[serde(rename = "rc")]
    pub record_count: u64,
}

// ===== INVARIANT TYPES =====

/// Timestamp as the backend serializes a `Duration`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WireTimestamp {
    pub secs: u64,
    pub nanos: u32,
}

impl WireTimestamp {
    pub fn as_nanos(self) -> u64 {
        self.secs
            .saturating_mul(1_000_000_000)
            .saturating_add(u64::from(self.nanos))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceNode {
    pub timestamp: WireTimestamp,
    #[serde(default)]
    pub worker_id: u64,
    #[serde(default)]
    pub epoch: u64,
    #[serde(default)]
    pub seq_no: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TraceEdge {
    pub source: TraceNode,
    pub destination: TraceNode,
    pub edge_type: ActivityKind,
    #[serde(default)]
    pub operator_id: Option<u64>,
    #[serde(default)]
    pub traverse: Traversal,
    #[serde(default)]
    pub length: Option<u64>,
}

impl TraceEdge {
    pub fn duration_ns(&self) -> u64 {
        self.destination
            .timestamp
            .as_nanos()
            .saturating_sub(self.source.timestamp.as_nanos())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EpochViolation {
    pub max: u64,
    pub from: TraceNode,
    pub to: TraceNode,
}

impl EpochViolation {
    pub fn duration_ns(&self) -> u64 {
        self.to
            .timestamp
            .as_nanos()
            .saturating_sub(self.from.timestamp.as_nanos())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OperatorViolation {
    pub max: u64,
    pub from: TraceEdge,
    pub to: TraceEdge,
}

impl OperatorViolation {
    pub fn duration_ns(&self) -> u64 {
        self.from.duration_ns()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MessageViolation {
    pub max: u64,
    pub msg: TraceEdge,
}

impl MessageViolation {
    pub fn duration_ns(&self) -> u64 {
        self.msg.duration_ns()
    }
}

/// One INV payload entry: `{"Epoch": ..}`, `{"Operator": ..}` or `{"Message": ..}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum InvariantReport {
    Epoch(EpochViolation),
    Operator(OperatorViolation),
    Message(MessageViolation),
}

impl InvariantReport {
    pub fn kind(&self) -> InvariantKind {
        match self {
            InvariantReport::Epoch(_) => InvariantKind::Epoch,
            InvariantReport::Operator(_) => InvariantKind::Operator,
            InvariantReport::Message(_) => InvariantKind::Message,
        }
    }

    pub fn max_ns(&self) -> u64 {
        match self {
            InvariantReport::Epoch(violation) => violation.max,
            InvariantReport::Operator(violation) => violation.max,
            InvariantReport::Message(violation) => violation.max,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvariantKind {
    Epoch,
    Operator,
    Message,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(secs: u64, nanos: u32, worker_id: u64) -> serde_json::Value {
        json!({
            "timestamp": { "secs": secs, "nanos": nanos },
            "worker_id": worker_id,
            "epoch": 4,
            "seq_no": 0
        })
    }

    #[test]
    fn requests_serialize_to_wire_shape() {
        let pag = serde_json::to_value(UpMsg::ActivityEdges { epoch: Epoch(3) }).unwrap();
        assert_eq!(pag, json!({ "type": "PAG", "epoch": 3 }));

        let inv = serde_json::to_value(UpMsg::Invariants).unwrap();
        assert_eq!(inv, json!({ "type": "INV" }));
    }

    #[test]
    fn epoch_batch_covers_every_epoch_scoped_kind() {
        let kinds: Vec<_> = UpMsg::epoch_batch(Epoch(9)).iter().map(UpMsg::kind).collect();
        assert_eq!(kinds, vec![FrameKind::Pag, FrameKind::Agg, FrameKind::All, FrameKind::Met]);
        assert!(UpMsg::epoch_batch(Epoch(9)).iter().all(|msg| msg.epoch() == Some(Epoch(9))));
    }

    #[test]
    fn epoch_input_parsing() {
        assert_eq!(Epoch::parse_input("12"), Some(Epoch(12)));
        assert_eq!(Epoch::parse_input(" 7 "), Some(Epoch(7)));
        assert_eq!(Epoch::parse_input("0"), Some(Epoch(0)));
        assert_eq!(Epoch::parse_input(""), None);
        assert_eq!(Epoch::parse_input("1a"), None);
        assert_eq!(Epoch::parse_input("-3"), None);
    }

    #[test]
    fn decodes_activity_edges() {
        let text = json!({
            "type": "PAG",
            "payload": [{
                "type": "DataMessage",
                "o": 0,
                "l": 12,
                "tr": "Unbounded",
                "src": { "w": 0, "t": 10 },
                "dst": { "w": 1, "t": 30, "e": 2 }
            }]
        })
        .to_string();

        let DownMsg::ActivityEdges(edges) = DownMsg::decode(&text).unwrap() else {
            panic!("expected PAG frame");
        };
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].kind, ActivityKind::DataMessage);
        assert_eq!(edges[0].src.epoch, 0);
        assert_eq!(edges[0].dst.epoch, 2);
        assert!(edges[0].is_cross_worker());
        assert_eq!(edges[0].correlation_key().as_str(), "1030");
    }

    #[test]
    fn decodes_correlation_pairs_and_metrics() {
        let all = DownMsg::decode(r#"{"type":"ALL","payload":[[1,2],[30,40]]}"#).unwrap();
        assert_eq!(all, DownMsg::Correlations(vec![CorrelationPair(1, 2), CorrelationPair(30, 40)]));

        let met = DownMsg::decode(
            r#"{"type":"MET","payload":[{"wf":0,"wt":1,"a":"DataMessage","ac":2,"at":300,"rc":17}]}"#,
        )
        .unwrap();
        let DownMsg::Metrics(rows) = met else {
            panic!("expected MET frame");
        };
        assert_eq!(rows[0].worker_to, Some(1));
        assert_eq!(rows[0].record_count, 17);
    }

    #[test]
    fn decodes_invariants_as_tagged_union() {
        let text = json!({
            "type": "INV",
            "payload": [
                { "Epoch": { "max": 12000000, "from": node(1, 0, 0), "to": node(1, 500, 0) } },
                { "Message": { "max": 5, "msg": {
                    "source": node(0, 100, 0),
                    "destination": node(0, 400, 1),
                    "edge_type": "DataMessage",
                    "operator_id": null,
                    "traverse": "Unbounded",
                    "length": 3
                } } }
            ]
        })
        .to_string();

        let DownMsg::Invariants(reports) = DownMsg::decode(&text).unwrap() else {
            panic!("expected INV frame");
        };
        assert_eq!(reports[0].kind(), InvariantKind::Epoch);
        assert_eq!(reports[0].max_ns(), 12_000_000);
        let InvariantReport::Message(message) = &reports[1] else {
            panic!("expected message violation");
        };
        assert_eq!(message.duration_ns(), 300);
    }

    #[test]
    fn rejects_unknown_frame_type() {
        let error = DownMsg::decode(r#"{"type":"XYZ","payload":[]}"#).unwrap_err();
        assert!(matches!(error, FrameError::UnknownKind(kind) if kind == "XYZ"));
    }

    #[test]
    fn rejects_malformed_json() {
        let error = DownMsg::decode("{not json").unwrap_err();
        assert!(matches!(error, FrameError::Malformed(_)));
    }

    #[test]
    fn reports_payload_shape_mismatch_with_kind() {
        let error = DownMsg::decode(r#"{"type":"AGG","payload":[{"a":"Processing"}]}"#).unwrap_err();
        assert!(matches!(error, FrameError::Payload { kind: FrameKind::Agg, .. }));
    }

    #[test]
    fn encoded_frames_decode_back() {
        let frame = DownMsg::Aggregates(vec![AggregateRecord {
            activity: ActivityKind::Busy,
            worker: 2,
            count: 4,
            weighted_count: 9,
        }]);
        let text = serde_json::to_string(&frame).unwrap();
        assert_eq!(DownMsg::decode(&text).unwrap(), frame);
    }

    #[test]
    fn idle_and_message_kinds() {
        let idle: Vec<_> = ActivityKind::ALL.into_iter().filter(|kind| kind.is_idle()).collect();
        assert_eq!(idle, vec![ActivityKind::Waiting, ActivityKind::Busy]);
        assert!(ActivityKind::ControlMessage.is_message());
        assert!(!ActivityKind::Spinning.is_message());
    }
}
