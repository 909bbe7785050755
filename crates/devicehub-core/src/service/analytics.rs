use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tracing::info;

use crate::cache::{AnalyticsCache, Lookup};
use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::model::{DeviceMetric, MetricResponse, NewMetric, RecordMetric};
use crate::store::MetricStore;
use crate::validate::to_storage_scale;

/// Metric type the performance summary aggregates.
pub const PERFORMANCE_METRIC_TYPE: &str = "CPU_USAGE";

/// `metricType` reported on a performance summary.
pub const PERFORMANCE_SUMMARY: &str = "PERFORMANCE_SUMMARY";

/// Trailing window for the performance summary.
pub fn performance_window() -> Duration {
    Duration::hours(24)
}

/// Metric ingestion and read-side analytics.
pub struct AnalyticsService {
    metrics: Arc<dyn MetricStore>,
    cache: Arc<AnalyticsCache>,
    clock: Arc<dyn Clock>,
}

impl AnalyticsService {
    pub fn new(metrics: Arc<dyn MetricStore>, cache: Arc<AnalyticsCache>) -> Self {
        Self::with_clock(metrics, cache, Arc::new(SystemClock))
    }

    pub fn with_clock(
        metrics: Arc<dyn MetricStore>,
        cache: Arc<AnalyticsCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { metrics, cache, clock }
    }

    /// Append one observation. The device id is not checked against the
    /// registry.
    pub async fn record_metric(&self, cmd: RecordMetric) -> Result<MetricResponse> {
        info!(device_id = %cmd.device_id, metric_type = %cmd.metric_type, "recording metric");

        let metric = self
            .metrics
            .insert(NewMetric {
                device_id: cmd.device_id,
                metric_type: cmd.metric_type,
                value: cmd.value,
                unit: cmd.unit,
                description: cmd.description,
                timestamp: self.clock.now(),
            })
            .await?;

        self.cache.on_metric_recorded(&metric.device_id);
        Ok(metric.into())
    }

    /// Newest first.
    pub async fn get_device_metrics(&self, device_id: &str) -> Result<Vec<MetricResponse>> {
        let ticket = match self.cache.device_metrics.lookup(device_id) {
            Lookup::Hit(hit) => return Ok(hit),
            Lookup::Miss(ticket) => ticket,
        };

        info!(device_id, "fetching metrics for device");
        let out: Vec<MetricResponse> = self
            .metrics
            .find_by_device(device_id)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();

        self.cache.device_metrics.insert(device_id, ticket, out.clone());
        Ok(out)
    }

    /// Newest first. Not cached.
    pub async fn get_device_metrics_by_type(
        &self,
        device_id: &str,
        metric_type: &str,
    ) -> Result<Vec<MetricResponse>> {
        info!(device_id, metric_type, "fetching metrics for device by type");
        let rows = self.metrics.find_by_device_and_type(device_id, metric_type).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Metrics of every device registered under `oem_id`, newest first.
    pub async fn get_oem_analytics(&self, oem_id: &str) -> Result<Vec<MetricResponse>> {
        let ticket = match self.cache.oem_analytics.lookup(oem_id) {
            Lookup::Hit(hit) => return Ok(hit),
            Lookup::Miss(ticket) => ticket,
        };

        info!(oem_id, "fetching analytics for oem");
        let out: Vec<MetricResponse> = self
            .metrics
            .find_by_oem(oem_id)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();

        self.cache.oem_analytics.insert(oem_id, ticket, out.clone());
        Ok(out)
    }

    /// CPU usage summary over the trailing window.
    pub async fn get_performance_metrics(&self, device_id: &str) -> Result<MetricResponse> {
        let ticket = match self.cache.performance.lookup(device_id) {
            Lookup::Hit(hit) => return Ok(hit),
            Lookup::Miss(ticket) => ticket,
        };

        info!(device_id, "calculating performance metrics");
        let now = self.clock.now();
        let recent = self
            .metrics
            .find_since(device_id, now - performance_window())
            .await?;

        let summary = summarize(device_id, &recent, now);
        self.cache.performance.insert(device_id, ticket, summary.clone());
        Ok(summary)
    }
}

/// Build a performance summary from the metrics inside the window.
///
/// `totalCount` counts every row in the window; average/max/min cover only
/// the `CPU_USAGE` rows in that same window and are zero when there are none.
/// An empty window yields a bare `totalCount: 0` summary.
pub fn summarize(device_id: &str, window: &[DeviceMetric], now: DateTime<Utc>) -> MetricResponse {
    let mut summary = MetricResponse {
        device_id: device_id.to_string(),
        metric_type: PERFORMANCE_SUMMARY.to_string(),
        total_count: Some(0),
        ..MetricResponse::default()
    };
    if window.is_empty() {
        return summary;
    }

    let cpu: Vec<Decimal> = window
        .iter()
        .filter(|m| m.metric_type == PERFORMANCE_METRIC_TYPE)
        .map(|m| m.value)
        .collect();

    let (avg, max, min) = match (cpu.iter().max(), cpu.iter().min()) {
        (Some(max), Some(min)) => {
            let sum: Decimal = cpu.iter().sum();
            let avg = to_storage_scale(sum / Decimal::from(cpu.len()));
            (avg, *max, *min)
        }
        _ => (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
    };

    summary.average_value = Some(avg);
    summary.max_value = Some(max);
    summary.min_value = Some(min);
    summary.total_count = Some(window.len() as i64);
    summary.timestamp = Some(now);
    summary
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::str::FromStr;

    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::TimeZone;
    use tokio::sync::Notify;

    use super::*;
    use crate::cache::CacheSettings;
    use crate::clock::ManualClock;
    use crate::store::MockMetricStore;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn row(id: i64, metric_type: &str, value: &str, minutes_ago: i64) -> DeviceMetric {
        DeviceMetric {
            id,
            device_id: "DEV001".into(),
            metric_type: metric_type.into(),
            value: dec(value),
            unit: None,
            description: None,
            timestamp: t0() - Duration::minutes(minutes_ago),
        }
    }

    fn service(store: MockMetricStore) -> AnalyticsService {
        AnalyticsService::with_clock(
            Arc::new(store),
            Arc::new(AnalyticsCache::new(CacheSettings::default())),
            Arc::new(ManualClock::new(t0())),
        )
    }

    #[test]
    fn empty_window_yields_bare_summary() {
        let s = summarize("DEV001", &[], t0());
        assert_eq!(s.metric_type, "PERFORMANCE_SUMMARY");
        assert_eq!(s.total_count, Some(0));
        assert!(s.average_value.is_none() && s.max_value.is_none() && s.min_value.is_none());
        assert!(s.timestamp.is_none());
    }

    #[test]
    fn cpu_aggregates_over_window() {
        let window = [row(2, "CPU_USAGE", "10.00", 5), row(1, "CPU_USAGE", "42.50", 10)];
        let s = summarize("DEV001", &window, t0());
        assert_eq!(s.average_value, Some(dec("26.25")));
        assert_eq!(s.max_value, Some(dec("42.50")));
        assert_eq!(s.min_value, Some(dec("10.00")));
        assert_eq!(s.total_count, Some(2));
        assert_eq!(s.timestamp, Some(t0()));
    }

    #[test]
    fn non_cpu_window_reports_zero_aggregates() {
        let window = [row(1, "MEMORY_USAGE", "70.00", 5), row(2, "TEMPERATURE", "40.10", 6)];
        let s = summarize("DEV001", &window, t0());
        assert_eq!(s.average_value, Some(Decimal::ZERO));
        assert_eq!(s.max_value, Some(Decimal::ZERO));
        assert_eq!(s.min_value, Some(Decimal::ZERO));
        assert_eq!(s.total_count, Some(2));
    }

    #[test]
    fn total_count_includes_every_type() {
        let window = [
            row(3, "CPU_USAGE", "10.00", 1),
            row(2, "MEMORY_USAGE", "99.00", 2),
            row(1, "CPU_USAGE", "11.00", 3),
        ];
        let s = summarize("DEV001", &window, t0());
        assert_eq!(s.total_count, Some(3));
        assert_eq!(s.average_value, Some(dec("10.50")));
        assert_eq!(s.max_value, Some(dec("11.00")));
    }

    #[test]
    fn average_rounds_to_two_places() {
        let window = [
            row(1, "CPU_USAGE", "10.00", 1),
            row(2, "CPU_USAGE", "10.00", 2),
            row(3, "CPU_USAGE", "11.00", 3),
        ];
        let s = summarize("DEV001", &window, t0());
        assert_eq!(s.average_value, Some(dec("10.33")));
    }

    #[tokio::test]
    async fn performance_queries_trailing_day() {
        let mut store = MockMetricStore::new();
        store
            .expect_find_since()
            .withf(|id: &str, since: &DateTime<Utc>| {
                id == "DEV001" && *since == t0() - Duration::hours(24)
            })
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let svc = service(store);
        let s = svc.get_performance_metrics("DEV001").await.unwrap();
        assert_eq!(s.total_count, Some(0));

        // Second read is served from cache: the mock allows one call only.
        let again = svc.get_performance_metrics("DEV001").await.unwrap();
        assert_eq!(again, s);
    }

    #[tokio::test]
    async fn record_metric_stamps_clock_time_and_invalidates() {
        let mut store = MockMetricStore::new();
        store
            .expect_find_by_device()
            .times(2)
            .returning(|_| Ok(vec![row(1, "CPU_USAGE", "42.50", 0)]));
        store
            .expect_insert()
            .withf(|m: &NewMetric| m.timestamp == t0() && m.value == dec("10.00"))
            .times(1)
            .returning(|m| {
                Ok(DeviceMetric {
                    id: 2,
                    device_id: m.device_id,
                    metric_type: m.metric_type,
                    value: m.value,
                    unit: m.unit,
                    description: m.description,
                    timestamp: m.timestamp,
                })
            });

        let svc = service(store);
        svc.get_device_metrics("DEV001").await.unwrap();
        svc.get_device_metrics("DEV001").await.unwrap();

        let recorded = svc
            .record_metric(RecordMetric {
                device_id: "DEV001".into(),
                metric_type: "CPU_USAGE".into(),
                value: dec("10.00"),
                unit: Some("%".into()),
                description: None,
            })
            .await
            .unwrap();
        assert_eq!(recorded.id, Some(2));
        assert_eq!(recorded.timestamp, Some(t0()));

        // Cache was dropped by the write, so this read hits the store again.
        svc.get_device_metrics("DEV001").await.unwrap();
    }

    #[tokio::test]
    async fn oem_analytics_are_cached_per_oem() {
        let mut store = MockMetricStore::new();
        store
            .expect_find_by_oem()
            .withf(|oem: &str| oem == "OEM001")
            .times(1)
            .returning(|_| Ok(vec![row(2, "CPU_USAGE", "1.00", 1), row(1, "CPU_USAGE", "2.00", 2)]));

        let svc = service(store);
        let first = svc.get_oem_analytics("OEM001").await.unwrap();
        let second = svc.get_oem_analytics("OEM001").await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn metrics_by_type_bypass_cache() {
        let mut store = MockMetricStore::new();
        store
            .expect_find_by_device_and_type()
            .withf(|id: &str, ty: &str| id == "DEV001" && ty == "CPU_USAGE")
            .times(2)
            .returning(|_, _| Ok(vec![]));

        let svc = service(store);
        svc.get_device_metrics_by_type("DEV001", "CPU_USAGE").await.unwrap();
        svc.get_device_metrics_by_type("DEV001", "CPU_USAGE").await.unwrap();
    }

    /// Metric store whose first `find_by_device` takes its snapshot, then
    /// parks until released.
    #[derive(Default)]
    struct ParkedReadStore {
        rows: Mutex<Vec<DeviceMetric>>,
        parked: AtomicBool,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl MetricStore for ParkedReadStore {
        async fn insert(&self, m: NewMetric) -> Result<DeviceMetric> {
            let mut rows = self.rows.lock().unwrap();
            let row = DeviceMetric {
                id: rows.len() as i64 + 1,
                device_id: m.device_id,
                metric_type: m.metric_type,
                value: m.value,
                unit: m.unit,
                description: m.description,
                timestamp: m.timestamp,
            };
            rows.push(row.clone());
            Ok(row)
        }

        async fn find_by_device(&self, device_id: &str) -> Result<Vec<DeviceMetric>> {
            let snapshot: Vec<DeviceMetric> = self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|m| m.device_id == device_id)
                .cloned()
                .collect();
            if !self.parked.swap(true, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            Ok(snapshot)
        }

        async fn find_by_device_and_type(&self, _: &str, _: &str) -> Result<Vec<DeviceMetric>> {
            Ok(vec![])
        }

        async fn find_by_oem(&self, _: &str) -> Result<Vec<DeviceMetric>> {
            Ok(vec![])
        }

        async fn find_since(&self, _: &str, _: DateTime<Utc>) -> Result<Vec<DeviceMetric>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn read_racing_a_write_does_not_cache_its_old_snapshot() {
        let store = Arc::new(ParkedReadStore::default());
        let svc = Arc::new(AnalyticsService::with_clock(
            store.clone(),
            Arc::new(AnalyticsCache::new(CacheSettings::default())),
            Arc::new(ManualClock::new(t0())),
        ));

        let reader = {
            let svc = Arc::clone(&svc);
            tokio::spawn(async move { svc.get_device_metrics("DEV001").await })
        };
        store.entered.notified().await;

        svc.record_metric(RecordMetric {
            device_id: "DEV001".into(),
            metric_type: "CPU_USAGE".into(),
            value: dec("42.50"),
            unit: None,
            description: None,
        })
        .await
        .unwrap();

        store.release.notify_one();
        let before_write = reader.await.unwrap().unwrap();
        assert!(before_write.is_empty());

        let after_write = svc.get_device_metrics("DEV001").await.unwrap();
        assert_eq!(after_write.len(), 1);
        assert_eq!(after_write[0].value, Some(dec("42.50")));
    }
}
