//! Process-wide state shared by every activity: the sensor cache, the view
//! state and the statistics register.
//!
//! All activities run on one thread and only yield at `.await` points, so the
//! state lives behind `Rc` + `RefCell`/`Cell` instead of locks. Every access
//! goes through a synchronous closure or a copy-out accessor; a borrow can
//! therefore never be held across a suspension point, which keeps each
//! mutation a single uninterruptible step.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use serde::Serialize;
use tokio::time::Instant;

use crate::sensors::{SensorDescriptor, SensorValue};

pub const PAGE_SIZES: [usize; 3] = [1, 2, 3];
pub const DEFAULT_ITEMS_PER_PAGE: usize = 3;

/// Latest value of one sensor; replaced wholesale on each successful read.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub value: SensorValue,
    pub last_updated: Instant,
}

/// One slot per descriptor, indexed by the descriptor's position.
#[derive(Debug, Clone, Default)]
pub struct SensorCache {
    readings: Vec<Option<Reading>>,
}

impl SensorCache {
    pub fn new(sensor_count: usize) -> Self {
        Self {
            readings: vec![None; sensor_count],
        }
    }

    /// Overwrite the reading for `idx`. Out-of-range indices are ignored.
    pub fn update(&mut self, idx: usize, value: SensorValue, at: Instant) {
        if let Some(slot) = self.readings.get_mut(idx) {
            *slot = Some(Reading {
                value,
                last_updated: at,
            });
        }
    }

    pub fn read(&self, idx: usize) -> Option<&Reading> {
        self.readings.get(idx).and_then(Option::as_ref)
    }

    pub fn value(&self, idx: usize) -> Option<&SensorValue> {
        self.read(idx).map(|r| &r.value)
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

/// What the display is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewState {
    items_per_page: usize,
    scroll_position: usize,
    autoscroll: bool,
    sensor_count: usize,
}

impl ViewState {
    /// `sensor_count` must be non-zero; config validation guarantees it.
    pub fn new(sensor_count: usize, items_per_page: usize) -> Self {
        let items_per_page = if PAGE_SIZES.contains(&items_per_page) {
            items_per_page
        } else {
            DEFAULT_ITEMS_PER_PAGE
        };
        Self {
            items_per_page,
            scroll_position: 0,
            autoscroll: false,
            sensor_count: sensor_count.max(1),
        }
    }

    pub fn items_per_page(&self) -> usize {
        self.items_per_page
    }

    pub fn scroll_position(&self) -> usize {
        self.scroll_position
    }

    pub fn autoscroll(&self) -> bool {
        self.autoscroll
    }

    pub fn sensor_count(&self) -> usize {
        self.sensor_count
    }

    /// Move by `delta` positions, wrapping around the sensor count.
    pub fn scroll_by(&mut self, delta: isize) {
        let count = self.sensor_count as isize;
        self.scroll_position = (self.scroll_position as isize + delta).rem_euclid(count) as usize;
    }

    pub fn toggle_autoscroll(&mut self) {
        self.autoscroll = !self.autoscroll;
    }

    pub fn set_autoscroll(&mut self, enabled: bool) {
        self.autoscroll = enabled;
    }

    /// Advance through 1 -> 2 -> 3 -> 1.
    pub fn cycle_page_size(&mut self) {
        let max = PAGE_SIZES[PAGE_SIZES.len() - 1];
        self.items_per_page = 1 + (self.items_per_page % max);
    }

    /// Sensor indices on screen, starting at the scroll position and wrapping.
    /// Always exactly `items_per_page` long, even with fewer sensors than slots.
    pub fn visible_indices(&self) -> Vec<usize> {
        (self.scroll_position..self.scroll_position + self.items_per_page)
            .map(|i| i % self.sensor_count)
            .collect()
    }
}

/// Counters bumped by the activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    RemoteRequests,
    RemoteErrors,
    RequestsReceived,
    RequestErrors,
    ScreenRefreshes,
}

/// Aggregate counters exposed over HTTP. Field order is the rendering order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub requests_sent_to_ha: u64,
    pub errors_in_requests_sent_to_ha: u64,
    pub requests_received: u64,
    pub errors_in_requests_received: u64,
    pub screen_refreshes: u64,
    pub uptime_seconds: u64,
    pub local_sensor_count: u64,
    pub ha_sensor_count: u64,
    pub total_sensor_count: u64,
}

impl Statistics {
    pub fn record(&mut self, counter: Counter) {
        let slot = match counter {
            Counter::RemoteRequests => &mut self.requests_sent_to_ha,
            Counter::RemoteErrors => &mut self.errors_in_requests_sent_to_ha,
            Counter::RequestsReceived => &mut self.requests_received,
            Counter::RequestErrors => &mut self.errors_in_requests_received,
            Counter::ScreenRefreshes => &mut self.screen_refreshes,
        };
        *slot = slot.saturating_add(1);
    }

    pub fn entries(&self) -> [(&'static str, u64); 9] {
        [
            ("requests_sent_to_ha", self.requests_sent_to_ha),
            ("errors_in_requests_sent_to_ha", self.errors_in_requests_sent_to_ha),
            ("requests_received", self.requests_received),
            ("errors_in_requests_received", self.errors_in_requests_received),
            ("screen_refreshes", self.screen_refreshes),
            ("uptime_seconds", self.uptime_seconds),
            ("local_sensor_count", self.local_sensor_count),
            ("ha_sensor_count", self.ha_sensor_count),
            ("total_sensor_count", self.total_sensor_count),
        ]
    }
}

struct Inner {
    sensors: Vec<SensorDescriptor>,
    cache: RefCell<SensorCache>,
    view: Cell<ViewState>,
    stats: RefCell<Statistics>,
    started_at: Instant,
}

/// Cheap-to-clone handle given to every activity at construction.
#[derive(Clone)]
pub struct SharedState {
    inner: Rc<Inner>,
}

impl SharedState {
    pub fn new(sensors: Vec<SensorDescriptor>, items_per_page: usize) -> Self {
        let local = sensors.iter().filter(|s| s.is_local()).count() as u64;
        let total = sensors.len() as u64;
        let stats = Statistics {
            local_sensor_count: local,
            ha_sensor_count: total - local,
            total_sensor_count: total,
            ..Statistics::default()
        };
        Self {
            inner: Rc::new(Inner {
                cache: RefCell::new(SensorCache::new(sensors.len())),
                view: Cell::new(ViewState::new(sensors.len(), items_per_page)),
                stats: RefCell::new(stats),
                started_at: Instant::now(),
                sensors,
            }),
        }
    }

    pub fn sensors(&self) -> &[SensorDescriptor] {
        &self.inner.sensors
    }

    /// Run `f` against the cache as one step.
    pub fn with_cache<R>(&self, f: impl FnOnce(&mut SensorCache) -> R) -> R {
        f(&mut self.inner.cache.borrow_mut())
    }

    pub fn reading(&self, idx: usize) -> Option<Reading> {
        self.inner.cache.borrow().read(idx).cloned()
    }

    pub fn view(&self) -> ViewState {
        self.inner.view.get()
    }

    /// Apply `f` to the view state as one step and return the result.
    pub fn update_view(&self, f: impl FnOnce(&mut ViewState)) -> ViewState {
        let mut view = self.inner.view.get();
        f(&mut view);
        self.inner.view.set(view);
        view
    }

    pub fn record(&self, counter: Counter) {
        self.inner.stats.borrow_mut().record(counter);
    }

    pub fn statistics(&self) -> Statistics {
        self.inner.stats.borrow().clone()
    }

    /// Recompute (not accumulate) uptime from the start instant.
    pub fn refresh_uptime(&self, now: Instant) {
        let uptime = now.saturating_duration_since(self.inner.started_at).as_secs();
        self.inner.stats.borrow_mut().uptime_seconds = uptime;
    }
}
