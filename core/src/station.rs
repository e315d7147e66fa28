//! Top-level control loop
//!
//! ## Flow
//! - [`Station::start`] loads the persisted rules and, when they are
//!   missing or the hardware clock is not trustworthy, blocks in the
//!   clock-set flow
//! - [`Station::tick`] is called from the board's main loop as often as it
//!   likes; it never blocks
//! - When the operator sends `SET`, `tick` returns
//!   [`Step::ClockSetRequested`] and the board calls
//!   [`Station::await_clock_set`]
//!
//! ## Faults
//! None of them stop the loop. A failed sensor read shows a placeholder, a
//! failed log append blinks the fault indicator and shows `LOG!` until an
//! append succeeds again, and a hardware clock fault shows `SYNC?` while
//! the software clock keeps running.

use core::fmt::{self, Write as _};

use hal_abstractions::{
    AppendLog, CharDisplay, Console, FaultIndicator, NonVolatileStore, RealTimeCounter, Uptime,
};
use heapless::String;

use crate::config::StationConfig;
use crate::console::{parse_clock_line, Command, LineBuffer, LINE_CAP};
use crate::display::{Screen, Status, View};
use crate::fmt::Debug2Format;
use crate::format;
use crate::persist::PersistentConfig;
use crate::schedule::SampleScheduler;
use crate::sensor::{Sampler, SensorReading};
use crate::time::{ClockAuthority, Instant, Timezone};

/// Longest console message, line ending excluded
const MESSAGE_CAP: usize = 96;

/// Half period of the fault blink (1 Hz)
const BLINK_HALF_PERIOD_MS: u64 = 500;

/// Collaborators handed over by the board
pub struct Parts<R, U, N, S, D, L, C, F> {
    pub rtc: R,
    pub uptime: U,
    pub store: N,
    pub sensors: S,
    pub display: D,
    pub log: L,
    pub console: C,
    pub fault: F,
}

/// Outcome of one [`Station::tick`]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Idle,
    /// A sample was taken and logged (or the log attempt failed)
    Sampled,
    /// Operator sent `SET`; call [`Station::await_clock_set`]
    ClockSetRequested,
}

/// Errors that end the clock-set flow
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationError<E> {
    /// Console read returned end of stream
    ConsoleClosed,
    Console(E),
}

impl<E: fmt::Debug> fmt::Display for StationError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConsoleClosed => write!(f, "console closed"),
            Self::Console(e) => write!(f, "console error: {:?}", e),
        }
    }
}

impl<E: fmt::Debug> core::error::Error for StationError<E> {}

pub struct Station<R, U, N, S, D, L, C, F> {
    clock: ClockAuthority<R, U>,
    config: PersistentConfig<N>,
    default_tz: Timezone,
    tz: Timezone,
    scheduler: SampleScheduler,
    sensors: S,
    screen: Screen<D>,
    log: L,
    console: C,
    fault: F,
    line: LineBuffer<LINE_CAP>,
    last_reading: SensorReading,
    log_fault: bool,
    sync_warned: bool,
}

impl<R, U, N, S, D, L, C, F> Station<R, U, N, S, D, L, C, F>
where
    R: RealTimeCounter,
    U: Uptime,
    N: NonVolatileStore,
    S: Sampler,
    D: CharDisplay,
    L: AppendLog,
    C: Console,
    F: FaultIndicator,
{
    pub fn new(parts: Parts<R, U, N, S, D, L, C, F>, config: &StationConfig) -> Self {
        let default_tz = Timezone::new(config.default_rules);
        Self {
            clock: ClockAuthority::with_sync_interval(
                parts.rtc,
                parts.uptime,
                config.sync_interval_secs,
            ),
            config: PersistentConfig::new(parts.store),
            default_tz,
            tz: default_tz,
            scheduler: SampleScheduler::new(),
            sensors: parts.sensors,
            screen: Screen::new(parts.display, config.layout),
            log: parts.log,
            console: parts.console,
            fault: parts.fault,
            line: LineBuffer::new(),
            last_reading: SensorReading::default(),
            log_fault: false,
            sync_warned: false,
        }
    }

    /// Load persisted rules and make sure the clock can be trusted
    pub fn start(&mut self) -> Result<(), StationError<C::Error>> {
        let configured = match self.config.load() {
            Ok(rules) => {
                self.tz = Timezone::new(rules);
                true
            }
            Err(e) => {
                warn!("No usable configuration ({}), using defaults", Debug2Format(&e));
                self.tz = self.default_tz;
                false
            }
        };
        self.set_fault(false);

        let now = self.clock.now();
        if !configured || !self.clock.hardware_healthy() {
            self.await_clock_set()?;
        } else {
            let (local, rule) = self.tz.to_local(now);
            let (dt, zone) = (local.to_datetime(), rule.abbrev);
            self.say(format_args!(
                "Clock {} {} {}",
                format::date(&dt),
                format::time(&dt),
                zone
            ));
        }
        info!("Station started");
        Ok(())
    }

    /// One non-blocking pass of the control loop
    pub fn tick(&mut self) -> Step {
        let now = self.clock.now();
        let mut step = Step::Idle;

        if self.poll_console() {
            step = Step::ClockSetRequested;
        }

        if self.clock.hardware_healthy() {
            self.sync_warned = false;
        } else if !self.sync_warned {
            self.sync_warned = true;
            self.say(format_args!("Clock not synchronized. Send SET to set it."));
        }

        if let Some(due) = self.scheduler.poll(now) {
            self.sample_cycle(now);
            self.scheduler.acknowledge(due);
            if step == Step::Idle {
                step = Step::Sampled;
            }
        }

        self.refresh_display(now);

        let blink_on = (self.clock.uptime_millis() / BLINK_HALF_PERIOD_MS) % 2 == 0;
        self.set_fault(self.log_fault && blink_on);

        step
    }

    /// Blocking clock-set flow
    ///
    /// Prompts for local time and keeps reading until a valid line has
    /// been converted to UTC and written to the hardware clock. The rule
    /// pair in use is persisted along with it.
    pub fn await_clock_set(&mut self) -> Result<Instant, StationError<C::Error>> {
        info!("Waiting for operator clock set");
        self.line.clear();
        self.prompt();

        loop {
            let mut byte = [0u8; 1];
            let n = self
                .console
                .read(&mut byte)
                .map_err(StationError::Console)?;
            if n == 0 {
                warn!("Console closed during clock set");
                return Err(StationError::ConsoleClosed);
            }

            let Some(line) = self.line.push(byte[0]) else {
                continue;
            };
            let local = match line.and_then(|line| parse_clock_line(&line)) {
                Ok(dt) => dt.to_instant(),
                Err(e) => {
                    debug!("Rejected clock line: {}", e);
                    self.say(format_args!("Invalid input: {}", e));
                    self.prompt();
                    continue;
                }
            };

            let utc = match self.clock.set_from_local(local, &self.tz) {
                Ok(utc) => utc,
                Err(e) => {
                    self.say(format_args!("Clock not set: {}", e));
                    self.prompt();
                    continue;
                }
            };

            if let Err(e) = self.config.save(self.tz.rules()) {
                error!("Saving rules failed: {}", Debug2Format(&e));
                self.say(format_args!("Warning: rules not saved: {}", e));
            }

            let (local, rule) = self.tz.to_local(utc);
            let (dt, zone) = (local.to_datetime(), rule.abbrev);
            self.say(format_args!(
                "Clock set to {} {} {}",
                format::date(&dt),
                format::time(&dt),
                zone
            ));
            self.sync_warned = false;
            self.screen.invalidate();
            return Ok(utc);
        }
    }

    pub fn timezone(&self) -> &Timezone {
        &self.tz
    }

    pub fn clock_healthy(&self) -> bool {
        self.clock.hardware_healthy()
    }

    pub fn log_fault(&self) -> bool {
        self.log_fault
    }

    fn sample_cycle(&mut self, now: Instant) {
        let reading = self.sensors.sample();
        self.last_reading = reading;

        let (local, rule) = self.tz.to_local(now);
        let status = format::status_line(local, rule, &reading);
        self.say(format_args!("{}", status));

        let record = format::log_record(now, &reading);
        match self.log.append(record.as_bytes()) {
            Ok(()) => {
                if self.log_fault {
                    info!("Sample log recovered");
                }
                self.log_fault = false;
            }
            Err(e) => {
                if !self.log_fault {
                    error!("Sample log append failed: {}", Debug2Format(&e));
                }
                self.log_fault = true;
            }
        }
    }

    /// Returns true when the operator asked for the clock-set flow
    fn poll_console(&mut self) -> bool {
        let mut requested = false;
        loop {
            match self.console.read_ready() {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    warn!("Console poll failed: {}", Debug2Format(&e));
                    break;
                }
            }

            let mut byte = [0u8; 1];
            match self.console.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("Console read failed: {}", Debug2Format(&e));
                    break;
                }
            }

            match self.line.push(byte[0]) {
                None => {}
                Some(Ok(line)) => match Command::parse(&line) {
                    Command::Set => requested = true,
                    Command::Unknown => {
                        self.say(format_args!("Unknown command. Send SET to set the clock."))
                    }
                },
                Some(Err(e)) => self.say(format_args!("Invalid input: {}", e)),
            }
        }
        requested
    }

    fn refresh_display(&mut self, now: Instant) {
        let status = if self.log_fault {
            Status::LogFault
        } else if !self.clock.hardware_healthy() {
            Status::Unsynced
        } else {
            Status::Ok
        };

        let (local, rule) = self.tz.to_local(now);
        self.screen.show(&View {
            local,
            zone: &rule.abbrev,
            reading: &self.last_reading,
            status,
        });
    }

    fn set_fault(&mut self, on: bool) {
        let result = if on {
            self.fault.set_high()
        } else {
            self.fault.set_low()
        };
        if let Err(e) = result {
            warn!("Fault indicator failed: {}", Debug2Format(&e));
        }
    }

    fn prompt(&mut self) {
        let rules = *self.tz.rules();
        self.say(format_args!(
            "Set clock: enter local time ({}/{}) as YY,MM,DD,hh,mm,ss",
            rules.standard().abbrev,
            rules.daylight().abbrev
        ));
    }

    fn say(&mut self, args: fmt::Arguments<'_>) {
        let mut text: String<{ MESSAGE_CAP + 2 }> = String::new();
        // Overlong messages are cut, not dropped
        let _ = text.write_fmt(args);
        let _ = text.push_str("\r\n");
        if let Err(e) = self.console.write_all(text.as_bytes()) {
            warn!("Console write failed: {}", Debug2Format(&e));
        }
    }
}
