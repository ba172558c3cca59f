//! Top-level cooling driver
//!
//! The controller owns the zones, measures the time elapsed between ticks
//! on a monotonic clock and hands every zone's latest samples to the export
//! sink after each tick. It never decides when to run; the caller ticks it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::constants::cooling::SYSTEM_ZONE;
use crate::data::CoolingConfig;
use crate::engine::clock::{Clock, MonotonicRawClock};
use crate::engine::export::{CsvExportSink, ExportSink};
use crate::engine::history::Timestamp;
use crate::engine::zone::{CoolingZone, Tick, ZoneMembers, ZoneReport};
use crate::error::Result;

/// Per-tick inputs
#[derive(Debug, Default)]
pub struct RunOptions {
    members: HashMap<String, ZoneMembers>,
    refresh: bool,
    elapsed: Option<Duration>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Members for a zone; only used the first time that zone runs
    pub fn members(mut self, zone: impl Into<String>, members: ZoneMembers) -> Self {
        self.members.insert(zone.into(), members);
        self
    }

    /// Re-read every fan and sensor before evaluating
    pub fn refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    /// Use this elapsed time instead of the one measured on the clock
    pub fn elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = Some(elapsed);
        self
    }
}

/// Outcome of one controller tick
#[derive(Debug, Clone)]
pub struct TickReport {
    pub now: Timestamp,
    pub elapsed: Duration,
    pub zones: Vec<ZoneReport>,
}

impl TickReport {
    pub fn zone(&self, name: &str) -> Option<&ZoneReport> {
        self.zones.iter().find(|z| z.zone == name)
    }
}

pub struct CoolingController<C: Clock = MonotonicRawClock> {
    config: Arc<CoolingConfig>,
    clock: C,
    previous: Option<Timestamp>,
    now: Option<Timestamp>,
    elapsed: Duration,
    zones: Vec<CoolingZone>,
    exporter: Option<Box<dyn ExportSink>>,
    // Exporter built from `export_path`, replaced on reconfigure
    owns_exporter: bool,
}

impl CoolingController<MonotonicRawClock> {
    /// Controller on the raw monotonic clock
    pub fn with_config(config: CoolingConfig) -> Result<Self> {
        Self::new(config, MonotonicRawClock)
    }
}

impl<C: Clock> CoolingController<C> {
    /// Validate `config` and create the `System` zone
    ///
    /// A CSV exporter is attached when `export_path` is set.
    pub fn new(config: CoolingConfig, clock: C) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let exporter = csv_exporter(&config);
        let owns_exporter = exporter.is_some();

        Ok(Self {
            zones: vec![CoolingZone::new(SYSTEM_ZONE, Arc::clone(&config))],
            elapsed: config.interval(),
            config,
            clock,
            previous: None,
            now: None,
            exporter,
            owns_exporter,
        })
    }

    /// Route exports to `sink` instead of the configured CSV directory
    pub fn with_export_sink(mut self, sink: Box<dyn ExportSink>) -> Self {
        self.exporter = Some(sink);
        self.owns_exporter = false;
        self
    }

    pub fn config(&self) -> &CoolingConfig {
        &self.config
    }

    pub fn zones(&self) -> &[CoolingZone] {
        &self.zones
    }

    pub fn zone(&self, name: &str) -> Option<&CoolingZone> {
        self.zones.iter().find(|z| z.name() == name)
    }

    pub fn zone_mut(&mut self, name: &str) -> Option<&mut CoolingZone> {
        self.zones.iter_mut().find(|z| z.name() == name)
    }

    /// Timestamp of the last tick
    pub fn now(&self) -> Option<Timestamp> {
        self.now
    }

    pub fn previous(&self) -> Option<Timestamp> {
        self.previous
    }

    /// Elapsed time used by the last tick
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Bind members to a zone ahead of its first run
    pub fn load(&mut self, zone: &str, members: ZoneMembers) -> bool {
        match self.zone_mut(zone) {
            Some(z) => {
                z.load(members);
                true
            }
            None => {
                warn!(zone, "Unknown cooling zone, members not bound");
                false
            }
        }
    }

    /// Swap in a new configuration for every zone
    ///
    /// Membership and histories are kept. An invalid config leaves the
    /// current one in place.
    pub fn reconfigure(&mut self, config: CoolingConfig) -> Result<()> {
        config.validate()?;
        let config = Arc::new(config);

        if self.owns_exporter || self.exporter.is_none() {
            self.exporter = csv_exporter(&config);
            self.owns_exporter = self.exporter.is_some();
        }
        for zone in &mut self.zones {
            zone.reconfigure(Arc::clone(&config));
        }
        self.config = config;
        info!("Cooling configuration updated");
        Ok(())
    }

    /// Run every zone once, then export
    pub fn tick(&mut self, mut opts: RunOptions) -> TickReport {
        let started = Instant::now();
        let now = self.clock.now();
        let previous = self
            .previous
            .unwrap_or(now - self.config.interval_secs);

        let elapsed = opts.elapsed.unwrap_or_else(|| {
            Duration::try_from_secs_f64((now - previous).max(0.0)).unwrap_or_default()
        });
        debug!(now, elapsed = elapsed.as_secs_f64(), "Cooling tick");

        self.previous = Some(now);
        self.now = Some(now);
        self.elapsed = elapsed;

        let tick = Tick { now, elapsed };
        let zones = self
            .zones
            .iter_mut()
            .map(|zone| {
                let members = opts.members.remove(zone.name());
                zone.run(&tick, members, opts.refresh)
            })
            .collect();

        for zone in opts.members.keys() {
            warn!(zone = %zone, "Members supplied for unknown cooling zone");
        }

        self.export();
        debug!(duration = ?started.elapsed(), "Cooling tick done");

        TickReport { now, elapsed, zones }
    }

    /// Hand the latest samples of every zone to the export sink
    ///
    /// Skipped in simulation mode. Sink errors are logged, never returned.
    pub fn export(&mut self) {
        if self.config.simulation {
            debug!("Simulation mode, skipping export");
            return;
        }
        let Some(sink) = self.exporter.as_mut() else {
            return;
        };

        for zone in &self.zones {
            let rows = zone.export_rows();
            if let Err(e) = sink.append(zone.name(), &rows) {
                warn!(zone = %zone.name(), error = %e, "Failed to export cooling history");
            }
        }
    }
}

fn csv_exporter(config: &CoolingConfig) -> Option<Box<dyn ExportSink>> {
    if !config.export_enabled() {
        return None;
    }
    config
        .export_path
        .as_ref()
        .map(|dir| Box::new(CsvExportSink::new(dir.clone())) as Box<dyn ExportSink>)
}
