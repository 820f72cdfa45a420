//! Test utilities for renogysrv
//!
//! An in-memory `RegisterTransport` that replays register blocks and can be
//! told to fail, plus fixtures for a healthy charge controller.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use renogy_comlink::{ConnectionState, DeviceType, RegisterTransport, TransportError};

use super::coordinator::DeviceIdentity;

// ==================== Fixtures ====================

/// Identity of a controller on `port`, named after the port
pub fn controller_identity(port: &str) -> DeviceIdentity {
    DeviceIdentity {
        port: port.to_string(),
        device_type: DeviceType::Controller,
        name: port.to_string(),
    }
}

fn ascii_words(text: &str, words: usize) -> Vec<u16> {
    let mut bytes = text.as_bytes().to_vec();
    bytes.resize(words * 2, 0);
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect()
}

/// Register blocks of a charging controller: 12.6 V battery, 18.3 V panel
pub fn controller_blocks() -> HashMap<u16, Vec<u16>> {
    let mut pv = vec![0u16; 34];
    pv[0] = 87; // battery_percentage
    pv[1] = 126; // battery_voltage
    pv[2] = 245; // battery_current
    pv[3] = u16::from_be_bytes([25, 22]); // controller / battery temperature
    pv[4] = 126; // load_voltage
    pv[5] = 50; // load_current
    pv[6] = 6; // load_power
    pv[7] = 183; // pv_voltage
    pv[8] = 312; // pv_current
    pv[9] = 57; // pv_power
    pv[15] = 120; // max_charging_power_today
    pv[16] = 30; // max_discharging_power_today
    pv[17] = 11; // charging_amp_hours_today
    pv[18] = 4; // discharging_amp_hours_today
    pv[19] = 140; // power_generation_today
    pv[20] = 52; // power_consumption_today
    pv[29] = 48_213; // power_generation_total (low word)
    pv[32] = 0x8002; // load on, charging mppt

    let mut blocks = HashMap::new();
    blocks.insert(12, ascii_words("RNG-CTRL-RVR40", 8));
    blocks.insert(26, vec![0x0010]);
    blocks.insert(57348, vec![4]);
    blocks.insert(256, pv);
    blocks
}

// ==================== Scripted Transport ====================

#[derive(Debug, Default)]
struct Script {
    blocks: HashMap<u16, Vec<u16>>,
    connect_error: Option<TransportError>,
    read_errors: VecDeque<TransportError>,
    stall_reads: bool,
    read_delay: Option<Duration>,
    connects: usize,
    reads: Vec<u16>,
    read_started: Vec<Instant>,
    in_flight: usize,
    max_in_flight: usize,
    closes: usize,
}

/// Shared handle to a `ScriptedTransport`'s script and counters
///
/// Stays usable after the transport has been boxed into a coordinator.
#[derive(Debug, Clone, Default)]
pub struct TransportScript {
    inner: Arc<Mutex<Script>>,
}

impl TransportScript {
    fn lock(&self) -> MutexGuard<'_, Script> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Words returned for reads starting at `register`
    pub fn set_block(&self, register: u16, words: Vec<u16>) {
        self.lock().blocks.insert(register, words);
    }

    /// Fail every connect with `error` until cleared with `None`
    pub fn fail_connect(&self, error: Option<TransportError>) {
        self.lock().connect_error = error;
    }

    /// Fail the next `count` reads with `error`
    pub fn fail_reads(&self, count: usize, error: TransportError) {
        let mut script = self.lock();
        for _ in 0..count {
            script.read_errors.push_back(error.clone());
        }
    }

    /// Make reads hang until the caller gives up
    pub fn stall_reads(&self, stall: bool) {
        self.lock().stall_reads = stall;
    }

    /// Make every read take `delay` before answering
    pub fn delay_reads(&self, delay: Option<Duration>) {
        self.lock().read_delay = delay;
    }

    pub fn connects(&self) -> usize {
        self.lock().connects
    }

    pub fn reads(&self) -> usize {
        self.lock().reads.len()
    }

    /// Start registers of every read, in order
    pub fn read_registers(&self) -> Vec<u16> {
        self.lock().reads.clone()
    }

    /// Clock time at which each read started, in order
    pub fn read_times(&self) -> Vec<Instant> {
        self.lock().read_started.clone()
    }

    /// Highest number of reads that were in progress at once
    pub fn max_concurrent_reads(&self) -> usize {
        self.lock().max_in_flight
    }

    pub fn closes(&self) -> usize {
        self.lock().closes
    }

    /// Connects, reads and closes combined
    pub fn operations(&self) -> usize {
        let script = self.lock();
        script.connects + script.reads.len() + script.closes
    }
}

/// In-memory register transport driven by a `TransportScript`
#[derive(Debug)]
pub struct ScriptedTransport {
    name: String,
    state: ConnectionState,
    script: TransportScript,
}

impl ScriptedTransport {
    /// Transport with no register blocks
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: ConnectionState::Disconnected,
            script: TransportScript::default(),
        }
    }

    /// Transport preloaded with `controller_blocks`
    pub fn controller(name: impl Into<String>) -> Self {
        let transport = Self::new(name);
        for (register, words) in controller_blocks() {
            transport.script.set_block(register, words);
        }
        transport
    }

    pub fn script(&self) -> TransportScript {
        self.script.clone()
    }
}

#[async_trait]
impl RegisterTransport for ScriptedTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.state.is_connected() {
            return Ok(());
        }

        let result = {
            let mut script = self.script.lock();
            script.connects += 1;
            script.connect_error.clone()
        };

        match result {
            Some(error) => {
                self.state = ConnectionState::Failed;
                Err(error)
            },
            None => {
                self.state = ConnectionState::Connected;
                Ok(())
            },
        }
    }

    async fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
        _unit_id: u8,
    ) -> Result<Vec<u16>, TransportError> {
        if !self.state.is_connected() {
            return Err(TransportError::connect(format!("{} not open", self.name)));
        }

        let (stall, delay, result) = {
            let mut script = self.script.lock();
            script.reads.push(address);
            script.read_started.push(Instant::now());
            script.in_flight += 1;
            script.max_in_flight = script.max_in_flight.max(script.in_flight);
            let result = match script.read_errors.pop_front() {
                Some(error) => Err(error),
                None => script
                    .blocks
                    .get(&address)
                    .map(|words| {
                        let mut words = words.clone();
                        words.resize(count as usize, 0);
                        words
                    })
                    .ok_or_else(|| {
                        TransportError::protocol(format!(
                            "Modbus exception 0x02: Illegal Data Address ({})",
                            address
                        ))
                    }),
            };
            (script.stall_reads, script.read_delay, result)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if stall {
            std::future::pending::<()>().await;
        }
        self.script.lock().in_flight -= 1;
        result
    }

    async fn close(&mut self) {
        self.script.lock().closes += 1;
        self.state = ConnectionState::Disconnected;
    }
}
