//! UART adapter for serial-attached receivers.
//!
//! Wraps an ESP-IDF `UartDriver` as a non-blocking [`SerialSource`] and a
//! [`SerialWrite`] sink. The rate can be changed on the fly, which
//! receiver discovery relies on.

use esp_idf_hal::delay::{BLOCK, NON_BLOCK};
use esp_idf_hal::uart::UartDriver;
use esp_idf_hal::units::Hertz;
use log::warn;

use crate::adapters::ubx::SerialWrite;
use crate::error::ReceiverError;
use crate::gnss::SerialSource;

pub struct UartPort<'d> {
    uart: UartDriver<'d>,
}

impl<'d> UartPort<'d> {
    pub fn new(uart: UartDriver<'d>) -> Self {
        Self { uart }
    }

    pub fn set_baud(&mut self, baud: u32) {
        if let Err(e) = self.uart.change_baudrate(Hertz(baud)) {
            warn!("UART: rate change to {} failed: {}", baud, e);
        }
        // Anything buffered was framed at the old rate.
        let _ = self.uart.clear_rx();
    }
}

impl SerialSource for UartPort<'_> {
    fn read_byte(&mut self) -> Option<u8> {
        let mut b = [0u8; 1];
        match self.uart.read(&mut b, NON_BLOCK) {
            Ok(1) => Some(b[0]),
            _ => None,
        }
    }
}

impl SerialWrite for UartPort<'_> {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), ReceiverError> {
        let mut sent = 0;
        while sent < bytes.len() {
            sent += self
                .uart
                .write(&bytes[sent..])
                .map_err(|_| ReceiverError::Io)?;
        }
        self.uart
            .wait_tx_done(BLOCK)
            .map_err(|_| ReceiverError::Io)
    }
}
