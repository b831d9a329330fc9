//! Presence signal debouncing.
//!
//! A raw comparator output chatters while a vehicle edges into the beam. The
//! [`Debouncer`] only commits a new stable value once the raw value has held
//! for the whole window, so each physical transition yields at most one
//! logical edge and noise narrower than the window yields none.
//!
//! ```text
//! raw     ‾‾‾|_|‾|____________________|‾|_|‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾
//! stable  ‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾|___________________________|‾‾‾‾‾‾‾
//!                  window^                     window^
//! ```

use std::time::Duration;

use gatekeeper_core::PresenceEdge;
use gatekeeper_hardware::PresenceInput;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Pure debounce filter over a boolean signal.
///
/// Time is passed in explicitly so the filter can be driven from a property
/// test as easily as from the polling loop.
///
/// # Examples
///
/// ```
/// use gatekeeper_controller::Debouncer;
/// use std::time::Duration;
/// use tokio::time::Instant;
///
/// let t0 = Instant::now();
/// let mut debouncer = Debouncer::new(Duration::from_millis(50));
/// debouncer.seed(true, t0);
///
/// assert_eq!(debouncer.update(false, t0 + Duration::from_millis(10)), None);
/// assert_eq!(debouncer.update(false, t0 + Duration::from_millis(60)), Some(false));
/// assert_eq!(debouncer.update(false, t0 + Duration::from_millis(70)), None);
/// ```
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last_raw: bool,
    last_bounce: Instant,
    stable: bool,
    seeded: bool,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_raw: false,
            last_bounce: Instant::now(),
            stable: false,
            seeded: false,
        }
    }

    /// Establish raw and stable value from a first reading. No edge.
    pub fn seed(&mut self, raw: bool, now: Instant) {
        self.last_raw = raw;
        self.stable = raw;
        self.last_bounce = now;
        self.seeded = true;
    }

    /// Feed one raw sample. Returns the new stable value when it changes.
    ///
    /// An unseeded filter treats the first sample as its seed.
    pub fn update(&mut self, raw: bool, now: Instant) -> Option<bool> {
        if !self.seeded {
            self.seed(raw, now);
            return None;
        }

        if raw != self.last_raw {
            self.last_raw = raw;
            self.last_bounce = now;
        }

        if raw != self.stable && now.saturating_duration_since(self.last_bounce) >= self.window {
            self.stable = raw;
            return Some(raw);
        }
        None
    }

    pub fn stable(&self) -> bool {
        self.stable
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

/// A [`PresenceInput`] behind a [`Debouncer`], with polarity applied.
///
/// Read failures are logged (once per failure streak) and treated as "no
/// new sample"; the stable value is kept.
#[derive(Debug)]
pub struct DebouncedSensor<S> {
    input: S,
    debouncer: Debouncer,
    active_low: bool,
    read_failing: bool,
}

impl<S: PresenceInput> DebouncedSensor<S> {
    /// Wrap `input`. With `active_low`, a low raw level means "present".
    pub fn new(input: S, window: Duration, active_low: bool) -> Self {
        Self {
            input,
            debouncer: Debouncer::new(window),
            active_low,
            read_failing: false,
        }
    }

    /// Take the first reading. Establishes the stable value without an edge.
    pub async fn initialize(&mut self) {
        if let Some(raw) = self.read().await {
            self.debouncer.seed(raw, Instant::now());
            info!(raw, present = self.is_present(), "Presence sensor seeded");
        }
    }

    /// Sample once. Returns the presence edge if the stable value changed.
    pub async fn poll(&mut self) -> Option<PresenceEdge> {
        let raw = self.read().await?;
        let stable = self.debouncer.update(raw, Instant::now())?;
        let edge = PresenceEdge::from_presence(self.to_presence(stable));
        debug!(%edge, raw = stable, "Presence changed");
        Some(edge)
    }

    /// Current stable raw level.
    pub fn stable_value(&self) -> bool {
        self.debouncer.stable()
    }

    /// Current stable presence, polarity applied.
    pub fn is_present(&self) -> bool {
        self.to_presence(self.debouncer.stable())
    }

    pub fn input(&self) -> &S {
        &self.input
    }

    fn to_presence(&self, level: bool) -> bool {
        level != self.active_low
    }

    async fn read(&mut self) -> Option<bool> {
        match self.input.read_raw().await {
            Ok(raw) => {
                if self.read_failing {
                    info!("Presence sensor readable again");
                    self.read_failing = false;
                }
                Some(raw)
            }
            Err(e) => {
                if !self.read_failing {
                    warn!(error = %e, "Presence sensor read failed");
                    self.read_failing = true;
                }
                None
            }
        }
    }
}
