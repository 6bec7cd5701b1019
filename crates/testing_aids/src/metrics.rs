// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use opentelemetry::KeyValue;
use opentelemetry_sdk::metrics::data::{AggregatedMetrics, Metric, MetricData, ResourceMetrics, ScopeMetrics};
use opentelemetry_sdk::metrics::{InMemoryMetricExporter, SdkMeterProvider};

/// Collects `OpenTelemetry` metrics in memory so tests can assert on what was recorded.
///
/// Only `u64` counters are inspected.
///
/// ```
/// use opentelemetry::KeyValue;
/// use opentelemetry::metrics::MeterProvider;
/// use testing_aids::MetricTester;
///
/// let tester = MetricTester::new();
/// let counter = tester.meter_provider().meter("demo").u64_counter("demo.count").build();
/// counter.add(1, &[KeyValue::new("demo.kind", "a")]);
///
/// tester.assert_attributes_contain(&[KeyValue::new("demo.kind", "a")]);
/// ```
#[derive(Debug)]
pub struct MetricTester {
    exporter: InMemoryMetricExporter,
    provider: SdkMeterProvider,
}

impl Default for MetricTester {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricTester {
    /// Creates a meter provider that exports into an in-memory buffer.
    #[must_use]
    pub fn new() -> Self {
        let exporter = InMemoryMetricExporter::default();
        let provider = SdkMeterProvider::builder().with_periodic_exporter(exporter.clone()).build();
        Self { exporter, provider }
    }

    /// The provider to create meters from.
    #[must_use]
    pub fn meter_provider(&self) -> &SdkMeterProvider {
        &self.provider
    }

    /// Flushes the provider and returns the attributes of every exported counter data point.
    ///
    /// # Panics
    ///
    /// Panics if the provider cannot be flushed or the exporter has no metrics to hand out.
    #[must_use]
    pub fn attributes(&self) -> Vec<KeyValue> {
        self.provider.force_flush().expect("meter provider should flush");
        self.exporter
            .get_finished_metrics()
            .expect("in-memory exporter should hold metrics")
            .iter()
            .flat_map(ResourceMetrics::scope_metrics)
            .flat_map(ScopeMetrics::metrics)
            .flat_map(counter_attributes)
            .collect()
    }

    /// Asserts that every given attribute was recorded on some counter data point.
    ///
    /// # Panics
    ///
    /// Panics if an attribute is missing.
    pub fn assert_attributes_contain(&self, expected: &[KeyValue]) {
        let attributes = self.attributes();
        for attribute in expected {
            assert!(
                attributes.contains(attribute),
                "attribute {attribute:?} was not recorded, got: {attributes:?}"
            );
        }
    }

    /// Asserts that none of the given attributes was recorded.
    ///
    /// # Panics
    ///
    /// Panics if an attribute is present.
    pub fn assert_attributes_absent(&self, unexpected: &[KeyValue]) {
        let attributes = self.attributes();
        for attribute in unexpected {
            assert!(
                !attributes.contains(attribute),
                "attribute {attribute:?} was recorded unexpectedly, got: {attributes:?}"
            );
        }
    }
}

fn counter_attributes(metric: &Metric) -> Vec<KeyValue> {
    match metric.data() {
        AggregatedMetrics::U64(MetricData::Sum(sum)) => sum.data_points().flat_map(|point| point.attributes().cloned()).collect(),
        _ => Vec::new(),
    }
}
