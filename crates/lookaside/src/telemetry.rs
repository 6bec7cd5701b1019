// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Counters and log events for cache groups.

use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(any(feature = "metrics", test))]
use opentelemetry::KeyValue;
#[cfg(any(feature = "metrics", test))]
use opentelemetry::metrics::{Counter, Meter};

/// Name of the counter that every group event is added to.
#[cfg(any(feature = "metrics", test))]
pub(crate) const EVENT_COUNT_NAME: &str = "lookaside.event.count";

/// Attribute carrying the group name.
#[cfg(any(feature = "metrics", test))]
pub(crate) const GROUP_NAME: &str = "lookaside.group";

/// Attribute carrying [`Event::as_str`].
#[cfg(any(feature = "metrics", test))]
pub(crate) const EVENT_NAME: &str = "lookaside.event";

/// A point-in-time copy of a group's counters.
///
/// Counters only ever grow. `loads` counts executions of the load path, so with stampede
/// protection a burst of concurrent misses for one key counts as a single load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct Stats {
    /// Calls to `get` with a non-empty key.
    pub gets: u64,
    /// Calls answered from the local store.
    pub hits: u64,
    /// Executions of the load path after a miss.
    pub loads: u64,
    /// Values fetched from a peer.
    pub peer_loads: u64,
    /// Failed peer fetches (each one fell back to a local load).
    pub peer_errors: u64,
    /// Values fetched from the backing source.
    pub local_loads: u64,
    /// Failed backing source calls.
    pub local_load_errors: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Event {
    Get,
    Hit,
    Load,
    PeerLoad,
    PeerError,
    LocalLoad,
    LocalLoadError,
}

impl Event {
    #[cfg(any(feature = "metrics", test))]
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "lookaside.get",
            Self::Hit => "lookaside.hit",
            Self::Load => "lookaside.load",
            Self::PeerLoad => "lookaside.peer_load",
            Self::PeerError => "lookaside.peer_error",
            Self::LocalLoad => "lookaside.local_load",
            Self::LocalLoadError => "lookaside.local_load_error",
        }
    }
}

#[cfg(any(feature = "metrics", test))]
pub(crate) fn create_event_counter(meter: &Meter) -> Counter<u64> {
    meter
        .u64_counter(EVENT_COUNT_NAME)
        .with_description("Cache group events")
        .with_unit("{event}")
        .build()
}

/// Per-group event recording: always into the [`Stats`] counters, and into an `OpenTelemetry`
/// counter when the group was built with a meter.
#[derive(Debug, Default)]
pub(crate) struct GroupTelemetry {
    gets: AtomicU64,
    hits: AtomicU64,
    loads: AtomicU64,
    peer_loads: AtomicU64,
    peer_errors: AtomicU64,
    local_loads: AtomicU64,
    local_load_errors: AtomicU64,
    #[cfg(any(feature = "metrics", test))]
    events: Option<EventCounter>,
}

#[cfg(any(feature = "metrics", test))]
#[derive(Debug)]
struct EventCounter {
    counter: Counter<u64>,
    group: KeyValue,
}

impl GroupTelemetry {
    #[cfg(any(feature = "metrics", test))]
    pub(crate) fn with_meter(group: &str, meter: Option<&Meter>) -> Self {
        Self {
            events: meter.map(|meter| EventCounter {
                counter: create_event_counter(meter),
                group: KeyValue::new(GROUP_NAME, group.to_owned()),
            }),
            ..Self::default()
        }
    }

    pub(crate) fn record(&self, event: Event) {
        let counter = match event {
            Event::Get => &self.gets,
            Event::Hit => &self.hits,
            Event::Load => &self.loads,
            Event::PeerLoad => &self.peer_loads,
            Event::PeerError => &self.peer_errors,
            Event::LocalLoad => &self.local_loads,
            Event::LocalLoadError => &self.local_load_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        #[cfg(any(feature = "metrics", test))]
        if let Some(events) = &self.events {
            events
                .counter
                .add(1, &[events.group.clone(), KeyValue::new(EVENT_NAME, event.as_str())]);
        }
    }

    pub(crate) fn snapshot(&self) -> Stats {
        Stats {
            gets: self.gets.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            peer_loads: self.peer_loads.load(Ordering::Relaxed),
            peer_errors: self.peer_errors.load(Ordering::Relaxed),
            local_loads: self.local_loads.load(Ordering::Relaxed),
            local_load_errors: self.local_load_errors.load(Ordering::Relaxed),
        }
    }
}
