//! Serial RTU connection
//!
//! `SerialTransport` owns one serial port and implements `RegisterTransport`
//! on top of the RTU frame processor. It never retries; callers decide.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;
use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialStream};
use tracing::{debug, error, info, warn};

use renogy_comlink::{ConnectionState, RegisterTransport, TransportError};

use super::pdu::{parse_read_response, PduBuilder};
use super::transport::RtuFrameProcessor;

/// Serial line settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialParams {
    pub port: String,
    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    /// "None", "Even" or "Odd"
    pub parity: String,
    /// Applies to opening the port and to each request/response exchange
    pub timeout: Duration,
}

impl SerialParams {
    /// Renogy defaults: 9600 8N1, 3 second timeout
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: 9600,
            data_bits: 8,
            stop_bits: 1,
            parity: "None".to_string(),
            timeout: Duration::from_secs(3),
        }
    }

    fn builder(&self) -> tokio_serial::SerialPortBuilder {
        let parity = match self.parity.as_str() {
            "Even" => tokio_serial::Parity::Even,
            "Odd" => tokio_serial::Parity::Odd,
            _ => tokio_serial::Parity::None,
        };

        let data_bits = match self.data_bits {
            5 => tokio_serial::DataBits::Five,
            6 => tokio_serial::DataBits::Six,
            7 => tokio_serial::DataBits::Seven,
            _ => tokio_serial::DataBits::Eight,
        };

        let stop_bits = match self.stop_bits {
            2 => tokio_serial::StopBits::Two,
            _ => tokio_serial::StopBits::One,
        };

        tokio_serial::new(&self.port, self.baud_rate)
            .data_bits(data_bits)
            .parity(parity)
            .stop_bits(stop_bits)
            .timeout(self.timeout)
    }
}

/// Modbus RTU client over a serial port
pub struct SerialTransport {
    params: SerialParams,
    stream: Option<SerialStream>,
    processor: RtuFrameProcessor,
    state: ConnectionState,
}

impl SerialTransport {
    pub fn new(params: SerialParams) -> Self {
        Self {
            params,
            stream: None,
            processor: RtuFrameProcessor::new(),
            state: ConnectionState::Disconnected,
        }
    }

    pub fn params(&self) -> &SerialParams {
        &self.params
    }

    async fn open(&self) -> Result<SerialStream, TransportError> {
        let builder = self.params.builder();
        let port = self.params.port.clone();

        // Opening a tty can block in the driver; keep it off the runtime threads
        let open = tokio::task::spawn_blocking(move || builder.open_native_async());

        match timeout(self.params.timeout, open).await {
            Ok(Ok(Ok(stream))) => Ok(stream),
            Ok(Ok(Err(e))) => Err(TransportError::connect(format!(
                "Failed to open serial port {port}: {e}"
            ))),
            Ok(Err(e)) => Err(TransportError::io(format!(
                "Serial open task failed for {port}: {e}"
            ))),
            Err(_) => Err(TransportError::timeout(format!(
                "Opening serial port {port} timed out"
            ))),
        }
    }

    async fn exchange(
        stream: &mut SerialStream,
        request: &[u8],
    ) -> Result<Vec<u8>, TransportError> {
        // Drop stale bytes from an earlier timed-out exchange
        if let Err(e) = stream.clear(tokio_serial::ClearBuffer::Input) {
            debug!("RTU clear: {}", e);
        }

        stream.write_all(request).await.map_err(|e| {
            error!("RTU TX: {}", e);
            TransportError::io(format!("Serial send error: {e}"))
        })?;
        stream.flush().await.map_err(|e| {
            error!("RTU flush: {}", e);
            TransportError::io(format!("Serial flush error: {e}"))
        })?;

        let mut header = [0u8; 3];
        stream
            .read_exact(&mut header)
            .await
            .map_err(TransportError::from)?;

        let total = RtuFrameProcessor::expected_response_len(&header);
        let mut frame = Vec::with_capacity(total);
        frame.extend_from_slice(&header);
        frame.resize(total, 0);
        stream
            .read_exact(&mut frame[header.len()..])
            .await
            .map_err(TransportError::from)?;

        debug!("RTU RX: {}B {:02X?}", frame.len(), frame);
        Ok(frame)
    }
}

#[async_trait]
impl RegisterTransport for SerialTransport {
    fn name(&self) -> &str {
        &self.params.port
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.stream.is_some() {
            return Ok(());
        }

        debug!("RTU: {} @{}baud", self.params.port, self.params.baud_rate);
        match self.open().await {
            Ok(stream) => {
                info!("RTU opened: {}", self.params.port);
                self.stream = Some(stream);
                self.processor.clear_pending();
                self.state = ConnectionState::Connected;
                Ok(())
            },
            Err(e) => {
                warn!("RTU open failed: {}", e);
                self.state = ConnectionState::Failed;
                Err(e)
            },
        }
    }

    async fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
        unit_id: u8,
    ) -> Result<Vec<u16>, TransportError> {
        let pdu = PduBuilder::read_holding_registers(address, count)?;
        let request = self.processor.build_frame(unit_id, &pdu);

        let Some(stream) = self.stream.as_mut() else {
            self.processor.clear_pending();
            return Err(TransportError::connect(format!(
                "Serial port {} not open",
                self.params.port
            )));
        };

        debug!(
            "RTU TX: unit={} addr={} qty={} {:02X?}",
            unit_id, address, count, request
        );

        let frame = match timeout(self.params.timeout, Self::exchange(stream, &request)).await {
            Ok(Ok(frame)) => frame,
            Ok(Err(e)) => {
                self.processor.clear_pending();
                return Err(e);
            },
            Err(_) => {
                self.processor.clear_pending();
                warn!(
                    "RTU timeout: {} addr={} after {:?}",
                    self.params.port, address, self.params.timeout
                );
                return Err(TransportError::timeout(format!(
                    "No response for register {} within {:?}",
                    address, self.params.timeout
                )));
            },
        };

        let (_, response) = self.processor.parse_frame(&frame)?;
        parse_read_response(&response, count)
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                debug!("RTU close: {} - {}", self.params.port, e);
            }
            info!("RTU closed: {}", self.params.port);
        }
        self.processor.clear_pending();
        self.state = ConnectionState::Disconnected;
    }
}
