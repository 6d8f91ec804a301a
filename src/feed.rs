//! The feed orchestrator.
//!
//! [`Feed`] is an iterator over [`FeedEvent`]s. Each call to `next` drives the
//! connection state machine until it has something to emit:
//!
//! ```text
//! Connecting ──open──▶ Streaming{FirstBatch} ──first batch done──▶ Streaming{Steady}
//!     ▲                        │                                         │
//!     │                        └──────── timeout / drop / revoke ────────┤
//!     └──────────── backoff ◀────────── Reconnecting ◀───────────────────┘
//! ```
//!
//! During the first batch of every connection ids are resolved and recorded
//! as seen, but nothing is emitted: a fresh connection replays the whole
//! current list of new stories and that backlog is not news.

use std::collections::VecDeque;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::FeedConfig;
use crate::dedup::SeenCache;
use crate::resolve::Resolver;
use crate::shutdown::Shutdown;
use crate::story::{FeedEvent, ItemId, Resolution};
use crate::stream::{Batches, StreamReader};
use crate::transport::{EventSource, HttpGet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Emission suppressed until the first batch of the epoch is done.
    FirstBatch,
    Steady,
}

enum State {
    Connecting,
    Streaming {
        batches: Batches,
        gate: Gate,
        pending: VecDeque<ItemId>,
    },
    Reconnecting,
    Stopped,
}

pub struct Feed<S, H> {
    stream: StreamReader<S>,
    resolver: Resolver<H>,
    seen: SeenCache,
    config: FeedConfig,
    shutdown: Shutdown,
    state: State,
    epoch: u64,
}

impl<S: EventSource, H: HttpGet> Feed<S, H> {
    pub fn new(source: S, http: H, config: FeedConfig, shutdown: Shutdown) -> Self {
        let resolver = Resolver::new(
            http,
            config.endpoints.clone(),
            config.retry,
            shutdown.clone(),
        );
        Self {
            stream: StreamReader::new(source),
            resolver,
            seen: SeenCache::new(config.cache_capacity),
            config,
            shutdown,
            state: State::Connecting,
            epoch: 0,
        }
    }

    pub fn seen(&self) -> &SeenCache {
        &self.seen
    }

    /// Number of connections opened so far.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Current gate, or `None` while not connected.
    pub fn gate(&self) -> Option<Gate> {
        match &self.state {
            State::Streaming { gate, .. } => Some(*gate),
            _ => None,
        }
    }

    fn step(&mut self, state: State) -> (State, Option<FeedEvent>) {
        match state {
            State::Connecting => match self.stream.open() {
                Ok(batches) => {
                    self.epoch += 1;
                    info!(epoch = self.epoch, "connected to event stream");
                    let streaming = State::Streaming {
                        batches,
                        gate: Gate::FirstBatch,
                        pending: VecDeque::new(),
                    };
                    (streaming, None)
                }
                Err(e) => {
                    warn!(error = %e, "event stream connection failed");
                    (State::Reconnecting, None)
                }
            },

            State::Reconnecting => {
                info!(backoff = ?self.config.reconnect_backoff, "reconnecting to event stream");
                if self.shutdown.sleep(self.config.reconnect_backoff) {
                    (State::Connecting, None)
                } else {
                    (State::Stopped, None)
                }
            }

            State::Streaming {
                mut batches,
                mut gate,
                mut pending,
            } => {
                if let Some(id) = pending.pop_front() {
                    let event = self.process(id, gate);
                    if pending.is_empty() && gate == Gate::FirstBatch {
                        debug!(epoch = self.epoch, "first batch done, opening gate");
                        gate = Gate::Steady;
                    }
                    let next = State::Streaming {
                        batches,
                        gate,
                        pending,
                    };
                    return (next, event);
                }

                match batches.next() {
                    Some(Ok(batch)) => {
                        debug!(epoch = self.epoch, size = batch.len(), ?gate, "received batch");
                        pending.extend(batch);
                        let next = State::Streaming {
                            batches,
                            gate,
                            pending,
                        };
                        (next, None)
                    }
                    Some(Err(e)) => {
                        warn!(epoch = self.epoch, error = %e, "event stream disrupted");
                        (State::Reconnecting, None)
                    }
                    None => {
                        info!(epoch = self.epoch, "event stream ended");
                        (State::Connecting, None)
                    }
                }
            }

            State::Stopped => (State::Stopped, None),
        }
    }

    fn process(&mut self, id: ItemId, gate: Gate) -> Option<FeedEvent> {
        if self.seen.seen_or_record(id) {
            debug!(id = %id, "already seen");
            return None;
        }

        let resolution = self.resolver.resolve(id, Utc::now().timestamp());
        if self.shutdown.is_triggered() {
            return None;
        }

        match (resolution, gate) {
            (Resolution::Exhausted, Gate::FirstBatch) => {
                warn!(id = %id, "could not resolve backlog item");
                None
            }
            (Resolution::Exhausted, Gate::Steady) => {
                warn!(id = %id, "could not resolve item");
                Some(FeedEvent::Invalid(id))
            }
            (_, Gate::FirstBatch) => None,
            (resolved, Gate::Steady) => resolved.into_story().map(FeedEvent::Story),
        }
    }
}

impl<S: EventSource, H: HttpGet> Iterator for Feed<S, H> {
    type Item = FeedEvent;

    fn next(&mut self) -> Option<FeedEvent> {
        loop {
            if self.shutdown.is_triggered() {
                self.state = State::Stopped;
            }
            let state = std::mem::replace(&mut self.state, State::Stopped);
            if matches!(state, State::Stopped) {
                return None;
            }
            let (next, event) = self.step(state);
            self.state = next;
            if event.is_some() {
                return event;
            }
        }
    }
}
