//! # Envelope store for the work-queue half of the broker.
//!
//! [`QueueState`] owns the three homes an envelope can occupy:
//! - the **ready queue**: priority buckets, FIFO within each bucket;
//! - the **in-flight map**: envelopes handed to consumers, keyed by id,
//!   each with a visibility deadline;
//! - the **dead-letter store**: terminal failures, retained until drained.
//!
//! All methods are plain data operations; the exclusive lock lives in
//! [`WorkQueue`](crate::queue::WorkQueue), which is the only owner of a
//! `QueueState`.
//!
//! ## Ready queue structure
//! Priority buckets (`BTreeMap<i64, VecDeque<Envelope>>`) rather than a
//! re-sorted heap: insertion is O(log P) in the number of distinct
//! priorities, FIFO within a tier is structural, and a nacked envelope can
//! re-enter at the **front** of its own tier without disturbing others.

use std::collections::{BTreeMap, HashMap, VecDeque};

use tokio::time::Instant;

use crate::envelope::{Envelope, EnvelopeId};

/// An envelope handed to a consumer, hidden until its deadline.
///
/// Created on dequeue, destroyed on ack, nack, or sweeper-triggered requeue.
/// The sweeper only reads deadlines; requeue goes through
/// [`WorkQueue`](crate::queue::WorkQueue).
#[derive(Debug)]
pub(crate) struct InFlightRecord {
    /// The authoritative copy of the envelope.
    pub envelope: Envelope,
    /// When the envelope becomes eligible for requeue.
    pub visibility_deadline: Instant,
}

/// Ready queue, in-flight map, and dead-letter store.
#[derive(Debug, Default)]
pub(crate) struct QueueState {
    /// Id source; ids are unique for the owning broker's lifetime.
    next_id: u64,
    /// Priority buckets; iterated from the highest key on dequeue.
    ready: BTreeMap<i64, VecDeque<Envelope>>,
    /// Number of envelopes across all ready buckets.
    ready_len: usize,
    /// Envelopes currently hidden behind a visibility deadline.
    in_flight: HashMap<EnvelopeId, InFlightRecord>,
    /// Terminal failures, FIFO by dead-letter time.
    dead: VecDeque<Envelope>,
}

impl QueueState {
    /// Allocates the next envelope id.
    pub fn allocate_id(&mut self) -> EnvelopeId {
        let id = EnvelopeId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Appends an envelope to the back of its priority bucket.
    pub fn push_back(&mut self, env: Envelope) {
        self.ready.entry(env.priority).or_default().push_back(env);
        self.ready_len += 1;
    }

    /// Prepends an envelope to the front of its priority bucket.
    ///
    /// Used for nack/expiry requeue so retries are not starved behind newer
    /// work in the same tier.
    pub fn push_front(&mut self, env: Envelope) {
        self.ready.entry(env.priority).or_default().push_front(env);
        self.ready_len += 1;
    }

    /// Removes and returns the highest-priority, oldest ready envelope.
    pub fn pop_highest(&mut self) -> Option<Envelope> {
        let (&priority, _) = self.ready.iter().next_back()?;
        let bucket = self.ready.get_mut(&priority)?;
        let env = bucket.pop_front()?;
        if bucket.is_empty() {
            self.ready.remove(&priority);
        }
        self.ready_len -= 1;
        Some(env)
    }

    /// Registers an in-flight record.
    pub fn insert_in_flight(&mut self, record: InFlightRecord) {
        self.in_flight.insert(record.envelope.id, record);
    }

    /// Removes and returns the in-flight record for `id`, if present.
    pub fn remove_in_flight(&mut self, id: EnvelopeId) -> Option<InFlightRecord> {
        self.in_flight.remove(&id)
    }

    /// Ids of in-flight envelopes whose visibility deadline has elapsed.
    pub fn expired_ids(&self, now: Instant) -> Vec<EnvelopeId> {
        self.in_flight
            .values()
            .filter(|r| r.visibility_deadline <= now)
            .map(|r| r.envelope.id)
            .collect()
    }

    /// Parks an envelope in the dead-letter store.
    pub fn push_dead(&mut self, env: Envelope) {
        self.dead.push_back(env);
    }

    /// Removes and returns every dead-lettered envelope.
    pub fn drain_dead(&mut self) -> Vec<Envelope> {
        self.dead.drain(..).collect()
    }

    pub fn ready_len(&self) -> usize {
        self.ready_len
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn dead_len(&self) -> usize {
        self.dead.len()
    }
}
