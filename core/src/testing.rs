//! In-memory collaborators for host tests
//!
//! Every fake is a cheap handle around shared state, so a test can keep a
//! clone and inspect or steer the collaborator after moving the original
//! into the component under test.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::string::String;
use std::vec::Vec;

use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin};
use embedded_io::{ErrorKind, ErrorType, Read, ReadReady, Write};
use hal_abstractions::{
    AppendLog, CharDisplay, HumiditySensor, NonVolatileStore, RealTimeCounter, TemperatureSensor,
    Uptime,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fault;

#[derive(Default)]
struct RtcState {
    value: Option<u64>,
    reads: usize,
    fail_writes: bool,
}

/// Hardware counter; `None` makes reads fault
#[derive(Clone, Default)]
pub struct FakeRtc(Rc<RefCell<RtcState>>);

impl FakeRtc {
    pub fn new(value: Option<u64>) -> Self {
        let rtc = Self::default();
        rtc.set(value);
        rtc
    }

    pub fn set(&self, value: Option<u64>) {
        self.0.borrow_mut().value = value;
    }

    pub fn value(&self) -> Option<u64> {
        self.0.borrow().value
    }

    pub fn reads(&self) -> usize {
        self.0.borrow().reads
    }

    pub fn fail_writes(&self, fail: bool) {
        self.0.borrow_mut().fail_writes = fail;
    }
}

impl RealTimeCounter for FakeRtc {
    type Error = Fault;

    fn read(&mut self) -> Result<u64, Fault> {
        let mut state = self.0.borrow_mut();
        state.reads += 1;
        state.value.ok_or(Fault)
    }

    fn write(&mut self, unix_secs: u64) -> Result<(), Fault> {
        let mut state = self.0.borrow_mut();
        if state.fail_writes {
            return Err(Fault);
        }
        state.value = Some(unix_secs);
        Ok(())
    }
}

/// Uptime timer advanced by hand
#[derive(Clone, Default)]
pub struct FakeUptime(Rc<Cell<u64>>);

impl FakeUptime {
    pub fn new(ms: u64) -> Self {
        Self(Rc::new(Cell::new(ms)))
    }

    pub fn advance_ms(&self, ms: u64) {
        self.0.set(self.0.get() + ms);
    }
}

impl Uptime for FakeUptime {
    fn uptime_millis(&self) -> u64 {
        self.0.get()
    }
}

/// Non-volatile memory, initially erased to 0xFF
#[derive(Clone)]
pub struct MemStore {
    bytes: Rc<RefCell<Vec<u8>>>,
    writes: Rc<Cell<usize>>,
}

impl MemStore {
    pub fn new(len: usize) -> Self {
        Self {
            bytes: Rc::new(RefCell::new(std::vec![0xFF; len])),
            writes: Rc::new(Cell::new(0)),
        }
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.borrow().clone()
    }

    pub fn poke(&self, offset: usize, value: u8) {
        self.bytes.borrow_mut()[offset] = value;
    }

    pub fn writes(&self) -> usize {
        self.writes.get()
    }
}

impl NonVolatileStore for MemStore {
    type Error = Fault;

    fn read_bytes(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), Fault> {
        let bytes = self.bytes.borrow();
        let src = bytes.get(offset..offset + buf.len()).ok_or(Fault)?;
        buf.copy_from_slice(src);
        Ok(())
    }

    fn write_bytes(&mut self, offset: usize, data: &[u8]) -> Result<(), Fault> {
        let mut bytes = self.bytes.borrow_mut();
        let dst = bytes.get_mut(offset..offset + data.len()).ok_or(Fault)?;
        dst.copy_from_slice(data);
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

/// Sensor returning programmed values; `None` makes reads fault
#[derive(Clone, Default)]
pub struct FakeSensor {
    temperature: Rc<Cell<Option<f32>>>,
    humidity: Rc<Cell<Option<f32>>>,
    reads: Rc<Cell<usize>>,
}

impl FakeSensor {
    pub fn new(temperature: Option<f32>, humidity: Option<f32>) -> Self {
        let sensor = Self::default();
        sensor.set(temperature, humidity);
        sensor
    }

    pub fn set(&self, temperature: Option<f32>, humidity: Option<f32>) {
        self.temperature.set(temperature);
        self.humidity.set(humidity);
    }

    pub fn reads(&self) -> usize {
        self.reads.get()
    }
}

impl TemperatureSensor for FakeSensor {
    type Error = Fault;

    fn read_temperature(&mut self) -> Result<f32, Fault> {
        self.reads.set(self.reads.get() + 1);
        self.temperature.get().ok_or(Fault)
    }
}

impl HumiditySensor for FakeSensor {
    type Error = Fault;

    fn read_humidity(&mut self) -> Result<f32, Fault> {
        self.reads.set(self.reads.get() + 1);
        self.humidity.get().ok_or(Fault)
    }
}

/// Character grid that remembers its contents and counts writes
#[derive(Clone)]
pub struct FakeDisplay {
    grid: Rc<RefCell<Vec<Vec<char>>>>,
    writes: Rc<Cell<usize>>,
}

impl FakeDisplay {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            grid: Rc::new(RefCell::new(std::vec![std::vec![' '; cols]; rows])),
            writes: Rc::new(Cell::new(0)),
        }
    }

    pub fn row(&self, row: usize) -> String {
        self.grid.borrow()[row].iter().collect()
    }

    pub fn writes(&self) -> usize {
        self.writes.get()
    }
}

impl CharDisplay for FakeDisplay {
    type Error = Fault;

    fn write_at(&mut self, row: u8, col: u8, text: &str) -> Result<(), Fault> {
        let mut grid = self.grid.borrow_mut();
        let line = grid.get_mut(row as usize).ok_or(Fault)?;
        for (i, c) in text.chars().enumerate() {
            let cell = line.get_mut(col as usize + i).ok_or(Fault)?;
            *cell = c;
        }
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

/// Append log collecting records as strings
#[derive(Clone, Default)]
pub struct MemLog {
    records: Rc<RefCell<Vec<String>>>,
    fail: Rc<Cell<bool>>,
}

impl MemLog {
    pub fn records(&self) -> Vec<String> {
        self.records.borrow().clone()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.set(fail);
    }
}

impl AppendLog for MemLog {
    type Error = Fault;

    fn append(&mut self, bytes: &[u8]) -> Result<(), Fault> {
        if self.fail.get() {
            return Err(Fault);
        }
        self.records
            .borrow_mut()
            .push(String::from_utf8_lossy(bytes).into_owned());
        Ok(())
    }
}

/// Serial console with scripted input; reads return 0 once input runs out
#[derive(Clone, Default)]
pub struct FakeConsole {
    input: Rc<RefCell<VecDeque<u8>>>,
    output: Rc<RefCell<Vec<u8>>>,
}

impl FakeConsole {
    pub fn type_line(&self, line: &str) {
        let mut input = self.input.borrow_mut();
        input.extend(line.bytes());
        input.push_back(b'\n');
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.output.borrow()).into_owned()
    }

    pub fn clear_output(&self) {
        self.output.borrow_mut().clear();
    }
}

impl ErrorType for FakeConsole {
    type Error = ErrorKind;
}

impl Read for FakeConsole {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ErrorKind> {
        let mut input = self.input.borrow_mut();
        let mut n = 0;
        while n < buf.len() {
            match input.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl ReadReady for FakeConsole {
    fn read_ready(&mut self) -> Result<bool, ErrorKind> {
        Ok(!self.input.borrow().is_empty())
    }
}

impl Write for FakeConsole {
    fn write(&mut self, buf: &[u8]) -> Result<usize, ErrorKind> {
        self.output.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), ErrorKind> {
        Ok(())
    }
}

/// Output pin recording its level and the number of level changes
#[derive(Clone, Default)]
pub struct FakePin {
    high: Rc<Cell<bool>>,
    toggles: Rc<Cell<usize>>,
}

impl FakePin {
    pub fn is_high(&self) -> bool {
        self.high.get()
    }

    pub fn toggles(&self) -> usize {
        self.toggles.get()
    }

    fn drive(&self, high: bool) {
        if self.high.get() != high {
            self.toggles.set(self.toggles.get() + 1);
        }
        self.high.set(high);
    }
}

impl PinErrorType for FakePin {
    type Error = core::convert::Infallible;
}

impl OutputPin for FakePin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true);
        Ok(())
    }
}
