//! Closed-set gauge store.
//!
//! Every gauge is registered once at construction and lives for the lifetime
//! of the store. Values are `f64` stored as raw bits in an `AtomicU64`, so a
//! single gauge is never observed half-written. There is no cross-gauge
//! consistency: a snapshot may mix values from two refresh ticks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{MailmonError, Result};

/// Value written to every gauge before the first refresh.
pub const DEFAULT_VALUE: f64 = 0.0;

/// How a gauge value is sampled and rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaugeKind {
    /// Whole numbers (counts).
    Integer,
    /// Real numbers (percentages, rates).
    Real,
}

/// Static description of one gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GaugeDef {
    pub name: &'static str,
    pub help: &'static str,
    pub kind: GaugeKind,
}

impl GaugeDef {
    pub const fn new(name: &'static str, help: &'static str, kind: GaugeKind) -> Self {
        Self { name, help, kind }
    }
}

pub const EMAILS_SENT: &str = "emails_sent_total";
pub const EMAILS_FAILED: &str = "emails_failed_total";
pub const APPS_ACCESS: &str = "apps_access_total";
pub const APPS_ERRORS: &str = "apps_errors_total";
pub const USERS_ONLINE: &str = "users_online";
pub const CPU_USAGE: &str = "server_cpu_usage_percent";
pub const MEMORY_USAGE: &str = "server_memory_usage_percent";
pub const DISK_USAGE: &str = "server_disk_usage_percent";
pub const BANDWIDTH_IN: &str = "bandwidth_in_mbps";
pub const BANDWIDTH_OUT: &str = "bandwidth_out_mbps";

/// The ten gauges exposed by the sidecar, in exposition order.
pub const STANDARD_GAUGES: [GaugeDef; 10] = [
    GaugeDef::new(EMAILS_SENT, "Total de correos enviados", GaugeKind::Integer),
    GaugeDef::new(EMAILS_FAILED, "Total de correos fallidos", GaugeKind::Integer),
    GaugeDef::new(APPS_ACCESS, "Total de accesos a aplicaciones", GaugeKind::Integer),
    GaugeDef::new(APPS_ERRORS, "Total de errores en aplicaciones", GaugeKind::Integer),
    GaugeDef::new(USERS_ONLINE, "Usuarios conectados en tiempo real", GaugeKind::Integer),
    GaugeDef::new(CPU_USAGE, "Uso de CPU del servidor (%)", GaugeKind::Real),
    GaugeDef::new(MEMORY_USAGE, "Uso de memoria del servidor (%)", GaugeKind::Real),
    GaugeDef::new(DISK_USAGE, "Uso de disco del servidor (%)", GaugeKind::Real),
    GaugeDef::new(BANDWIDTH_IN, "Ancho de banda entrante (Mbps)", GaugeKind::Real),
    GaugeDef::new(BANDWIDTH_OUT, "Ancho de banda saliente (Mbps)", GaugeKind::Real),
];

/// Point-in-time view of one gauge.
#[derive(Debug, Clone, PartialEq)]
pub struct GaugeSample {
    pub name: &'static str,
    pub help: &'static str,
    pub kind: GaugeKind,
    pub value: f64,
}

struct Gauge {
    def: GaugeDef,
    bits: AtomicU64,
}

impl Gauge {
    fn new(def: GaugeDef) -> Self {
        Self { def, bits: AtomicU64::new(DEFAULT_VALUE.to_bits()) }
    }

    fn load(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    fn store(&self, v: f64) {
        self.bits.store(v.to_bits(), Ordering::Relaxed);
    }
}

/// Fixed collection of named gauges, safe to share behind an `Arc`.
pub struct GaugeStore {
    gauges: Vec<Gauge>,
    index: HashMap<&'static str, usize>,
}

impl GaugeStore {
    /// Build a store from explicit definitions. Names must be unique.
    pub fn new(defs: &[GaugeDef]) -> Result<Self> {
        let mut gauges = Vec::with_capacity(defs.len());
        let mut index = HashMap::with_capacity(defs.len());
        for def in defs {
            if index.insert(def.name, gauges.len()).is_some() {
                return Err(MailmonError::DuplicateGauge(def.name.to_string()));
            }
            gauges.push(Gauge::new(*def));
        }
        Ok(Self { gauges, index })
    }

    /// The ten-gauge set served by the sidecar.
    pub fn standard() -> Self {
        Self {
            gauges: STANDARD_GAUGES.iter().copied().map(Gauge::new).collect(),
            index: STANDARD_GAUGES.iter().enumerate().map(|(i, d)| (d.name, i)).collect(),
        }
    }

    /// Overwrite the current value of `name`.
    pub fn set(&self, name: &str, value: f64) -> Result<()> {
        let idx = self
            .index
            .get(name)
            .ok_or_else(|| MailmonError::UnknownGauge(name.to_string()))?;
        self.gauges[*idx].store(value);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.index.get(name).map(|&i| self.gauges[i].load())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Snapshot of every gauge, in registration order.
    pub fn read_all(&self) -> Vec<GaugeSample> {
        self.gauges
            .iter()
            .map(|g| GaugeSample {
                name: g.def.name,
                help: g.def.help,
                kind: g.def.kind,
                value: g.load(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.gauges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gauges.is_empty()
    }
}

impl Default for GaugeStore {
    fn default() -> Self {
        Self::standard()
    }
}
