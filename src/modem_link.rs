//! UARTE wiring between the nRF52840 and the ESP-01.
//!
//! A task drains the UART into [`RX_PIPE`] as bytes arrive; the engine reads
//! the pipe without blocking through [`PipeTransport`](crate::esp01::PipeTransport).

use embassy_nrf::peripherals::{TIMER0, UARTE1};
use embassy_nrf::uarte::{UarteRxWithIdle, UarteTx};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pipe::Pipe;
use embedded_io_async::{ErrorKind, ErrorType, Write};

pub const RX_PIPE_SIZE: usize = 256;

pub static RX_PIPE: Pipe<CriticalSectionRawMutex, RX_PIPE_SIZE> = Pipe::new();

/// ESP-01 default baud rate
pub const MODEM_BAUDRATE: embassy_nrf::uarte::Baudrate = embassy_nrf::uarte::Baudrate::BAUD115200;

#[embassy_executor::task]
pub async fn modem_rx_task(mut rx: UarteRxWithIdle<'static, UARTE1, TIMER0>) {
    info!("Starting modem RX task");
    let mut buf = [0u8; 64];
    loop {
        match rx.read_until_idle(&mut buf).await {
            Ok(count) => {
                let stored = RX_PIPE.try_write(&buf[..count]).unwrap_or(0);
                if stored < count {
                    warn!("Modem RX: pipe full, dropped {} bytes", count - stored);
                }
            }
            Err(e) => warn!("Modem RX: {}", e),
        }
    }
}

/// Transmit half of the modem UART.
///
/// Commands often live in flash; the driver copies them into RAM for
/// EasyDMA before transmitting.
pub struct ModemTx {
    tx: UarteTx<'static, UARTE1>,
}

impl ModemTx {
    pub fn new(tx: UarteTx<'static, UARTE1>) -> Self {
        Self { tx }
    }
}

impl ErrorType for ModemTx {
    type Error = ErrorKind;
}

impl Write for ModemTx {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.tx.write(buf).await.map_err(|e| {
            warn!("Modem TX: {}", e);
            ErrorKind::Other
        })?;
        Ok(buf.len())
    }
}
