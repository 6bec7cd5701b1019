// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The cache group: a named read-through cache over one backing source.

use std::fmt::{self, Debug};
use std::sync::{Arc, OnceLock};

use coalesce::Coalescer;
use lookaside_memory::MemoryStore;
use lookaside_tier::{ByteView, Store};
#[cfg(any(feature = "metrics", test))]
use opentelemetry::metrics::Meter;

use crate::telemetry::{Event, GroupTelemetry, Stats};
use crate::{Error, Getter, PeerPicker, Result};

/// A named, read-through cache over one backing source.
///
/// [`get`](Self::get) answers from the group's store when it can. On a miss the value is fetched
/// from the peer that owns the key (if peers are registered) or from the backing source, and
/// values fetched from the backing source are added to the store.
///
/// Groups are usually created through a [`Registry`](crate::Registry), which hands out shared
/// `Arc<Group>` handles.
///
/// # Examples
///
/// ```
/// use std::io;
///
/// use lookaside::Group;
///
/// let group = Group::builder("scores")
///     .cache_bytes(2 << 10)
///     .getter(|key: &str| -> Result<Vec<u8>, io::Error> {
///         match key {
///             "Tom" => Ok(b"630".to_vec()),
///             _ => Err(io::Error::other(format!("{key} not exist"))),
///         }
///     })
///     .build()?;
///
/// assert_eq!(group.get("Tom")?.to_string(), "630");
/// assert!(group.get("Sam").is_err());
/// # Ok::<(), lookaside::Error>(())
/// ```
pub struct Group {
    name: String,
    cache_bytes: u64,
    getter: Box<dyn Getter>,
    store: Box<dyn Store>,
    peers: OnceLock<Arc<dyn PeerPicker>>,
    /// Only present when stampede protection is enabled.
    loads: Option<Coalescer<String, Result<ByteView>>>,
    telemetry: GroupTelemetry,
}

impl Group {
    /// Creates a builder for a group named `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> GroupBuilder {
        GroupBuilder::new(name)
    }

    /// Returns the group's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the byte budget the group was configured with. Zero means unbounded.
    #[must_use]
    pub fn cache_bytes(&self) -> u64 {
        self.cache_bytes
    }

    /// Returns the store holding the group's cached values.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// Returns a snapshot of the group's counters.
    #[must_use]
    pub fn stats(&self) -> Stats {
        self.telemetry.snapshot()
    }

    /// Returns the value for `key`, loading it on a cache miss.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if `key` is empty, without touching the store or the
    /// backing source. Returns [`Error::Source`] if the backing source failed; failures are
    /// not cached, so the next call tries again.
    pub fn get(&self, key: &str) -> Result<ByteView> {
        if key.is_empty() {
            return Err(Error::InvalidKey);
        }

        self.telemetry.record(Event::Get);
        if let Some(view) = self.store.get(key) {
            self.telemetry.record(Event::Hit);
            tracing::debug!(lookaside.group = %self.name, lookaside.key = key, "cache hit");
            return Ok(view);
        }

        self.load(key)
    }

    /// Routes cache misses of this group through `picker`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if peers were already registered.
    pub fn register_peers(&self, picker: Arc<dyn PeerPicker>) -> Result<()> {
        if self.peers.set(picker).is_err() {
            return Err(Error::InvalidConfig(format!("peers already registered for group {:?}", self.name)));
        }
        Ok(())
    }

    fn load(&self, key: &str) -> Result<ByteView> {
        let Some(loads) = &self.loads else {
            return self.load_once(key);
        };

        loads.work(key.to_owned(), || {
            // A load that finished after our store lookup may have filled the store.
            if let Some(view) = self.store.get(key) {
                return Ok(view);
            }
            self.load_once(key)
        })
    }

    fn load_once(&self, key: &str) -> Result<ByteView> {
        self.telemetry.record(Event::Load);

        if let Some(peer) = self.peers.get().and_then(|picker| picker.pick_peer(key)) {
            match peer.fetch(&self.name, key) {
                Ok(view) => {
                    self.telemetry.record(Event::PeerLoad);
                    return Ok(view);
                }
                Err(error) => {
                    self.telemetry.record(Event::PeerError);
                    tracing::warn!(lookaside.group = %self.name, lookaside.key = key, %error, "peer fetch failed, loading locally");
                }
            }
        }

        self.get_locally(key)
    }

    fn get_locally(&self, key: &str) -> Result<ByteView> {
        let bytes = self.getter.get(key).map_err(|cause| {
            self.telemetry.record(Event::LocalLoadError);
            tracing::debug!(lookaside.group = %self.name, lookaside.key = key, error = %cause, "backing source failed");
            Error::source_failed(cause)
        })?;

        let view = ByteView::from(bytes);
        self.populate_cache(key, view.clone());
        self.telemetry.record(Event::LocalLoad);
        tracing::debug!(lookaside.group = %self.name, lookaside.key = key, bytes = view.len(), "loaded from backing source");

        Ok(view)
    }

    fn populate_cache(&self, key: &str, view: ByteView) {
        self.store.add(key, view);
    }
}

impl Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.name)
            .field("cache_bytes", &self.cache_bytes)
            .field("store", &self.store)
            .field("stampede_protection", &self.loads.is_some())
            .field("peers", &self.peers.get().is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for a [`Group`].
///
/// A backing source is required; everything else has a default. Without an explicit store the
/// group gets a [`MemoryStore`] bounded to [`cache_bytes`](Self::cache_bytes).
///
/// # Examples
///
/// ```
/// use std::io;
///
/// use lookaside::{Error, Group};
///
/// let missing = Group::builder("scores").build();
/// assert!(matches!(missing, Err(Error::InvalidConfig(_))));
///
/// let group = Group::builder("scores")
///     .cache_bytes(1 << 20)
///     .stampede_protection(false)
///     .getter(|key: &str| -> Result<Vec<u8>, io::Error> { Ok(key.as_bytes().to_vec()) })
///     .build()?;
/// assert_eq!(group.cache_bytes(), 1 << 20);
/// # Ok::<(), Error>(())
/// ```
pub struct GroupBuilder {
    name: String,
    cache_bytes: u64,
    getter: Option<Box<dyn Getter>>,
    store: Option<Box<dyn Store>>,
    stampede_protection: bool,
    #[cfg(any(feature = "metrics", test))]
    meter: Option<Meter>,
}

impl GroupBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cache_bytes: 0,
            getter: None,
            store: None,
            stampede_protection: true,
            #[cfg(any(feature = "metrics", test))]
            meter: None,
        }
    }

    /// Returns the name of the group being built.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the byte budget of the default store. Zero, the default, means unbounded.
    #[must_use]
    pub fn cache_bytes(mut self, cache_bytes: u64) -> Self {
        self.cache_bytes = cache_bytes;
        self
    }

    /// Sets the backing source.
    #[must_use]
    pub fn getter(mut self, getter: impl Getter + 'static) -> Self {
        self.getter = Some(Box::new(getter));
        self
    }

    /// Replaces the default [`MemoryStore`] with `store`.
    #[must_use]
    pub fn store(mut self, store: impl Store + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    /// Enables or disables coalescing of concurrent misses for the same key. Enabled by default.
    ///
    /// With protection enabled, threads missing the same key at the same time wait for a single
    /// load and share its result, errors included.
    #[must_use]
    pub fn stampede_protection(mut self, enabled: bool) -> Self {
        self.stampede_protection = enabled;
        self
    }

    /// Records every group event into the `lookaside.event.count` counter of `meter`.
    ///
    /// Each addition carries the group name as `lookaside.group` and the event kind as
    /// `lookaside.event`. [`Group::stats`] keeps working with or without a meter.
    #[cfg(any(feature = "metrics", test))]
    #[cfg_attr(docsrs, doc(cfg(feature = "metrics")))]
    #[must_use]
    pub fn meter(mut self, meter: &Meter) -> Self {
        self.meter = Some(meter.clone());
        self
    }

    /// Builds the group.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if no backing source was set.
    pub fn build(mut self) -> Result<Group> {
        let Some(getter) = self.getter.take() else {
            return Err(Error::InvalidConfig(format!("group {:?} has no backing source", self.name)));
        };

        Ok(self.build_with(getter))
    }

    pub(crate) fn build_with(self, getter: Box<dyn Getter>) -> Group {
        let store: Box<dyn Store> = match self.store {
            Some(store) => store,
            None => Box::new(MemoryStore::builder().max_bytes(self.cache_bytes).name(self.name.clone()).build()),
        };

        #[cfg(any(feature = "metrics", test))]
        let telemetry = GroupTelemetry::with_meter(&self.name, self.meter.as_ref());
        #[cfg(not(any(feature = "metrics", test)))]
        let telemetry = GroupTelemetry::default();

        Group {
            name: self.name,
            cache_bytes: self.cache_bytes,
            getter,
            store,
            peers: OnceLock::new(),
            loads: self.stampede_protection.then(Coalescer::new),
            telemetry,
        }
    }
}

impl Debug for GroupBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupBuilder")
            .field("name", &self.name)
            .field("cache_bytes", &self.cache_bytes)
            .field("getter", &self.getter.is_some())
            .field("store", &self.store)
            .field("stampede_protection", &self.stampede_protection)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use lookaside_tier::testing::{MockStore, StoreOp};
    use opentelemetry::KeyValue;
    use opentelemetry::metrics::MeterProvider;
    use testing_aids::MetricTester;

    use super::*;
    use crate::telemetry::{EVENT_NAME, GROUP_NAME};

    static_assertions::assert_impl_all!(Group: Send, Sync, Debug);

    fn echo_group(store: MockStore) -> Group {
        Group::builder("echo")
            .store(store)
            .getter(|key: &str| -> io::Result<Vec<u8>> { Ok(key.as_bytes().to_vec()) })
            .build()
            .unwrap()
    }

    #[test]
    fn builder_defaults() {
        let builder = Group::builder("scores");

        assert_eq!(builder.name(), "scores");
        assert!(builder.stampede_protection);
        assert_eq!(builder.cache_bytes, 0);
    }

    #[test]
    fn build_without_getter_fails() {
        let error = Group::builder("scores").cache_bytes(64).build().unwrap_err();

        assert_eq!(error.to_string(), "invalid configuration: group \"scores\" has no backing source");
    }

    #[test]
    fn empty_key_touches_nothing() {
        let store = MockStore::new();
        let group = echo_group(store.clone());

        assert!(matches!(group.get(""), Err(Error::InvalidKey)));
        assert!(store.operations().is_empty());
        assert_eq!(group.stats(), Stats::default());
    }

    #[test]
    fn miss_populates_store() {
        let store = MockStore::new();
        let group = echo_group(store.clone());

        assert_eq!(group.get("k").unwrap(), ByteView::from("k"));

        assert_eq!(
            store.operations(),
            vec![
                StoreOp::Get("k".to_string()),
                StoreOp::Get("k".to_string()),
                StoreOp::Add {
                    key: "k".to_string(),
                    value: ByteView::from("k"),
                },
            ]
        );
    }

    #[test]
    fn miss_without_stampede_protection_checks_store_once() {
        let store = MockStore::new();
        let group = Group::builder("echo")
            .store(store.clone())
            .stampede_protection(false)
            .getter(|key: &str| -> io::Result<Vec<u8>> { Ok(key.as_bytes().to_vec()) })
            .build()
            .unwrap();

        group.get("k").unwrap();

        assert_eq!(store.operations().len(), 2);
        assert_eq!(store.add_count(), 1);
    }

    #[test]
    fn hit_skips_getter() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let group = Group::builder("scores")
            .store(MockStore::with_data([("Tom", "630")]))
            .getter(move |_: &str| -> io::Result<Vec<u8>> {
                counted.fetch_add(1, Ordering::SeqCst);
                Ok(Vec::new())
            })
            .build()
            .unwrap();

        assert_eq!(group.get("Tom").unwrap().to_string(), "630");
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let stats = group.stats();
        assert_eq!((stats.gets, stats.hits, stats.loads), (1, 1, 0));
    }

    #[test]
    fn register_peers_only_once() {
        struct NoPeers;

        impl PeerPicker for NoPeers {
            fn pick_peer(&self, _key: &str) -> Option<Arc<dyn crate::PeerFetcher>> {
                None
            }
        }

        let group = echo_group(MockStore::new());

        group.register_peers(Arc::new(NoPeers)).unwrap();
        let error = group.register_peers(Arc::new(NoPeers)).unwrap_err();

        assert!(matches!(error, Error::InvalidConfig(_)));
        assert_eq!(group.get("k").unwrap().to_string(), "k");
    }

    #[test]
    fn debug_output() {
        let group = echo_group(MockStore::new());
        let debug = format!("{group:?}");

        assert!(debug.contains("name: \"echo\""));
        assert!(debug.contains("stampede_protection: true"));
        assert!(debug.contains("peers: false"));
    }

    #[test]
    fn events_are_recorded_on_meter() {
        let tester = MetricTester::new();
        let meter = tester.meter_provider().meter("lookaside");
        let group = Group::builder("scores")
            .store(MockStore::new())
            .meter(&meter)
            .getter(|key: &str| -> io::Result<Vec<u8>> {
                if key == "Tom" {
                    Ok(b"630".to_vec())
                } else {
                    Err(io::Error::other(format!("{key} not exist")))
                }
            })
            .build()
            .unwrap();

        group.get("Tom").unwrap();
        group.get("Tom").unwrap();
        group.get("Sam").unwrap_err();

        tester.assert_attributes_contain(&[
            KeyValue::new(GROUP_NAME, "scores"),
            KeyValue::new(EVENT_NAME, Event::Get.as_str()),
            KeyValue::new(EVENT_NAME, Event::Hit.as_str()),
            KeyValue::new(EVENT_NAME, Event::Load.as_str()),
            KeyValue::new(EVENT_NAME, Event::LocalLoad.as_str()),
            KeyValue::new(EVENT_NAME, Event::LocalLoadError.as_str()),
        ]);
        tester.assert_attributes_absent(&[KeyValue::new(EVENT_NAME, Event::PeerLoad.as_str())]);

        let stats = group.stats();
        assert_eq!((stats.gets, stats.hits, stats.local_loads, stats.local_load_errors), (3, 1, 1, 1));
    }
}
