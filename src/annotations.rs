use std::collections::BTreeMap;
use std::fmt;

use swc_core::common::{BytePos, Span};

/// Property of the activation record a traced value is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TraceSlot(String);

impl TraceSlot {
    pub fn new(slot: impl Into<String>) -> Self {
        TraceSlot(slot.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TraceSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TraceSlot {
    fn from(slot: &str) -> Self {
        TraceSlot(slot.to_string())
    }
}

impl From<String> for TraceSlot {
    fn from(slot: String) -> Self {
        TraceSlot(slot)
    }
}

/// Side table of identifier references that must be traced.
///
/// Keyed by the identifier's source span, so the tree itself never carries
/// instrumentation state. Entries are consumed by the rewriter: once an
/// identifier has been rewritten its entry is gone and a second pass over the
/// same tree leaves it alone.
#[derive(Debug, Clone, Default)]
pub struct TraceAnnotations {
    slots: BTreeMap<(BytePos, BytePos), TraceSlot>,
}

impl TraceAnnotations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flags the identifier at `span`. Returns the slot it replaced, if any.
    pub fn mark(&mut self, span: Span, slot: impl Into<TraceSlot>) -> Option<TraceSlot> {
        self.slots.insert(key(span), slot.into())
    }

    pub fn get(&self, span: Span) -> Option<&TraceSlot> {
        self.slots.get(&key(span))
    }

    pub fn is_marked(&self, span: Span) -> bool {
        self.slots.contains_key(&key(span))
    }

    /// Removes and returns the flag for `span`.
    pub fn take(&mut self, span: Span) -> Option<TraceSlot> {
        self.slots.remove(&key(span))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Remaining flags in source order.
    pub fn iter(&self) -> impl Iterator<Item = (Span, &TraceSlot)> {
        self.slots
            .iter()
            .map(|(&(lo, hi), slot)| (Span::new(lo, hi), slot))
    }
}

fn key(span: Span) -> (BytePos, BytePos) {
    (span.lo, span.hi)
}
