use bytes::Bytes;

/// The kind of physical change a raw mutation applies to its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// The key is written with a new value.
    Put,
    /// The key is removed.
    Delete,
}

/// One physical key-value change emitted by the upstream store.
///
/// Mutations arrive unordered and interleaved across transactions; the commit
/// timestamp is the only grouping key. A mutation is immutable once pulled and
/// is consumed exactly once by the collector.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMutation {
    /// Whether the key was written or removed.
    pub kind: MutationKind,
    /// The raw key bytes, in the upstream store's key layout.
    pub key: Bytes,
    /// The raw value bytes; may be empty for deletes.
    pub value: Bytes,
    /// Logical time at which the enclosing transaction's writes became visible.
    pub commit_ts: u64,
}

/// A watermark certifying stream progress.
///
/// After a watermark with timestamp `T` is observed, no further mutation will
/// arrive with `commit_ts <= T`. Watermarks are non-decreasing across the
/// stream; the collector relies on this without enforcing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermark {
    /// The certified timestamp.
    pub timestamp: u64,
}

/// The unit pulled from the upstream feed.
///
/// Exactly one of a mutation or a watermark; the enum makes the invariant
/// structural instead of relying on nullable alternative fields.
#[derive(Debug, Clone, PartialEq)]
pub enum BufferedEvent {
    /// A raw key-value mutation.
    Mutation(RawMutation),
    /// A watermark marker.
    Watermark(Watermark),
}

/// A complete raw transaction, released by the collector once a watermark has
/// certified that no further mutation can join it.
///
/// `mutations` preserves arrival order from the feed; downstream
/// index-retraction logic depends on the relative ordering of mutations that
/// touch the same row.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTransaction {
    /// The commit timestamp shared by every mutation in the transaction.
    pub commit_ts: u64,
    /// The transaction's mutations, in arrival order.
    pub mutations: Vec<RawMutation>,
}
