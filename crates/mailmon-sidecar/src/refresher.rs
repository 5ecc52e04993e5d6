//! Synthetic gauge refresher.
//!
//! Every tick samples each gauge in the plan and writes it to the store.
//! Values are placeholders; only the ranges matter to downstream dashboards.
//!
//! If the refresher task dies, the store keeps its last values and the HTTP
//! surface keeps serving them. Stale metrics are the only consequence.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use mailmon_core::error::{MailmonError, Result};
use mailmon_core::gauge::{self, GaugeStore};

/// How one gauge is sampled. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sampler {
    /// Uniform integer in `[lo, hi]`.
    Int { lo: i64, hi: i64 },
    /// Uniform real in `[lo, hi]`, rounded to 2 decimals.
    Real { lo: f64, hi: f64 },
}

impl Sampler {
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        match *self {
            Sampler::Int { lo, hi } => rng.gen_range(lo..=hi) as f64,
            Sampler::Real { lo, hi } => {
                let v = (rng.gen_range(lo..=hi) * 100.0).round() / 100.0;
                // Bounds with more than 2 decimals can round outside the range.
                v.clamp(lo, hi)
            }
        }
    }

    /// Non-empty range with finite bounds.
    fn is_valid(&self) -> bool {
        match *self {
            Sampler::Int { lo, hi } => lo <= hi,
            Sampler::Real { lo, hi } => lo.is_finite() && hi.is_finite() && lo <= hi,
        }
    }

    pub fn contains(&self, v: f64) -> bool {
        match *self {
            Sampler::Int { lo, hi } => v.fract() == 0.0 && (lo as f64..=hi as f64).contains(&v),
            Sampler::Real { lo, hi } => (lo..=hi).contains(&v),
        }
    }
}

/// Gauge name paired with its sampler.
pub type PlanEntry = (&'static str, Sampler);

/// Ranges dashboards are built against.
pub const STANDARD_PLAN: [PlanEntry; 10] = [
    (gauge::EMAILS_SENT, Sampler::Int { lo: 1000, hi: 5000 }),
    (gauge::EMAILS_FAILED, Sampler::Int { lo: 0, hi: 50 }),
    (gauge::APPS_ACCESS, Sampler::Int { lo: 500, hi: 2000 }),
    (gauge::APPS_ERRORS, Sampler::Int { lo: 0, hi: 20 }),
    (gauge::USERS_ONLINE, Sampler::Int { lo: 10, hi: 100 }),
    (gauge::CPU_USAGE, Sampler::Real { lo: 10.0, hi: 90.0 }),
    (gauge::MEMORY_USAGE, Sampler::Real { lo: 20.0, hi: 95.0 }),
    (gauge::DISK_USAGE, Sampler::Real { lo: 30.0, hi: 85.0 }),
    (gauge::BANDWIDTH_IN, Sampler::Real { lo: 50.0, hi: 500.0 }),
    (gauge::BANDWIDTH_OUT, Sampler::Real { lo: 50.0, hi: 500.0 }),
];

pub struct Refresher {
    store: Arc<GaugeStore>,
    plan: Vec<PlanEntry>,
    interval: Duration,
}

impl Refresher {
    /// Build a refresher. Every plan entry must name a gauge in `store` and
    /// carry a non-empty range.
    pub fn new(store: Arc<GaugeStore>, plan: &[PlanEntry], interval: Duration) -> Result<Self> {
        if let Some((name, _)) = plan.iter().find(|(name, _)| !store.contains(name)) {
            return Err(MailmonError::UnknownGauge((*name).to_string()));
        }
        if let Some((name, sampler)) = plan.iter().find(|(_, sampler)| !sampler.is_valid()) {
            return Err(MailmonError::Config(format!("empty sampling range for {name}: {sampler:?}")));
        }
        if interval.is_zero() {
            return Err(MailmonError::Config("refresh interval must be non-zero".into()));
        }
        Ok(Self { store, plan: plan.to_vec(), interval })
    }

    pub fn standard(store: Arc<GaugeStore>, interval: Duration) -> Result<Self> {
        Self::new(store, &STANDARD_PLAN, interval)
    }

    /// One tick: sample and write every gauge in the plan.
    pub fn refresh_once<R: Rng>(&self, rng: &mut R) {
        for (name, sampler) in &self.plan {
            let v = sampler.sample(rng);
            if let Err(e) = self.store.set(name, v) {
                // Unreachable after construction checks; keep going for the rest.
                tracing::error!(gauge = %name, error = %e, "gauge refresh failed");
            }
        }
    }

    /// Tick until `shutdown` flips to `true` or its sender is dropped.
    /// The first tick fires immediately.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut rng = StdRng::from_entropy();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval_ms = self.interval.as_millis() as u64, gauges = self.plan.len(), "refresher started");
        let mut ticks: u64 = 0;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.refresh_once(&mut rng);
                    ticks += 1;
                    tracing::debug!(ticks, "gauges refreshed");
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!(ticks, "refresher stopped");
    }

    /// Run on a dedicated task, supervised so a panic is logged instead of
    /// propagated. The returned handle belongs to the supervisor.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let worker = tokio::spawn(self.run(shutdown));
        tokio::spawn(async move {
            if let Err(e) = worker.await {
                if e.is_panic() {
                    tracing::error!(error = %e, "refresher panicked; metrics will go stale");
                } else {
                    tracing::warn!(error = %e, "refresher task cancelled");
                }
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use mailmon_core::gauge::{GaugeDef, GaugeKind, DEFAULT_VALUE, STANDARD_GAUGES};

    fn assert_in_plan(store: &GaugeStore) {
        for (name, sampler) in STANDARD_PLAN {
            let v = store.get(name).unwrap();
            assert!(sampler.contains(v), "{name}={v} outside {sampler:?}");
            if let Sampler::Real { .. } = sampler {
                assert!(((v * 100.0).round() - v * 100.0).abs() < 1e-6, "{name}={v} has more than 2 decimals");
            }
        }
    }

    #[test]
    fn plan_covers_every_standard_gauge_with_matching_kind() {
        assert_eq!(STANDARD_PLAN.len(), STANDARD_GAUGES.len());
        for (def, (name, sampler)) in STANDARD_GAUGES.iter().zip(STANDARD_PLAN) {
            assert_eq!(def.name, name);
            let int = matches!(sampler, Sampler::Int { .. });
            assert_eq!(int, def.kind == GaugeKind::Integer, "{name}");
        }
    }

    #[test]
    fn every_tick_stays_in_range() {
        let store = Arc::new(GaugeStore::standard());
        let r = Refresher::standard(Arc::clone(&store), Duration::from_secs(5)).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            r.refresh_once(&mut rng);
            assert_in_plan(&store);
        }
    }

    #[test]
    fn unknown_gauge_fails_at_construction() {
        let store = Arc::new(GaugeStore::new(&[GaugeDef::new("users_online", "u", GaugeKind::Integer)]).unwrap());
        let err = Refresher::standard(store, Duration::from_secs(5)).err().expect("must fail");
        assert_eq!(err.code().as_str(), "UNKNOWN_GAUGE");
    }

    #[test]
    fn zero_interval_is_rejected() {
        let store = Arc::new(GaugeStore::standard());
        assert!(Refresher::standard(store, Duration::ZERO).is_err());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let store = Arc::new(GaugeStore::standard());
        let plan = [(gauge::EMAILS_SENT, Sampler::Int { lo: 5, hi: 1 })];
        let err = Refresher::new(Arc::clone(&store), &plan, Duration::from_secs(5)).err().expect("must fail");
        assert_eq!(err.code().as_str(), "CONFIG");

        let plan = [(gauge::CPU_USAGE, Sampler::Real { lo: 90.0, hi: f64::NAN })];
        let err = Refresher::new(store, &plan, Duration::from_secs(5)).err().expect("must fail");
        assert_eq!(err.code().as_str(), "CONFIG");
    }

    #[tokio::test]
    async fn panicking_refresher_leaves_store_and_http_intact() {
        use axum::body::Body;
        use axum::http::{Request, StatusCode};
        use tower::ServiceExt;

        use crate::app_state::AppState;
        use crate::obs::Telemetry;
        use crate::router;

        let store = Arc::new(GaugeStore::standard());
        store.set(gauge::EMAILS_SENT, 1234.0).unwrap();
        store.set(gauge::CPU_USAGE, 42.5).unwrap();

        // `new` rejects this plan; build it directly so the first tick panics.
        let r = Refresher {
            store: Arc::clone(&store),
            plan: vec![(gauge::EMAILS_SENT, Sampler::Int { lo: 5, hi: 1 })],
            interval: Duration::from_secs(5),
        };
        let (_stop_tx, stop_rx) = watch::channel(false);
        r.spawn(stop_rx).await.expect("supervisor absorbs the panic");

        assert_eq!(store.get(gauge::EMAILS_SENT), Some(1234.0));
        assert_eq!(store.get(gauge::CPU_USAGE), Some(42.5));

        let app = router::build_router(AppState::new(store, Telemetry::disabled()), Duration::from_secs(5));
        let resp = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_ticks_immediately_and_stops_on_shutdown() {
        let store = Arc::new(GaugeStore::standard());
        let r = Refresher::standard(Arc::clone(&store), Duration::from_secs(5)).unwrap();
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(r.run(stop_rx));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_in_plan(&store);
        assert_ne!(store.get(gauge::EMAILS_SENT), Some(DEFAULT_VALUE));

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_in_plan(&store);

        stop_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
