use super::error::{AtError, AtResult};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::pipe::Pipe;

/// Byte link to the modem.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn write(&mut self, bytes: &[u8]) -> AtResult<()>;

    /// Copy whatever has already arrived into `buf` without waiting.
    /// Returns 0 when nothing is pending.
    fn read_available(&mut self, buf: &mut [u8]) -> usize;
}

/// Transport whose receive side is a [`Pipe`] filled by a UART task or
/// interrupt handler, and whose transmit side is any async writer.
pub struct PipeTransport<'p, M: RawMutex, W, const N: usize> {
    rx: &'p Pipe<M, N>,
    tx: W,
}

impl<'p, M: RawMutex, W, const N: usize> PipeTransport<'p, M, W, N> {
    pub fn new(rx: &'p Pipe<M, N>, tx: W) -> Self {
        Self { rx, tx }
    }
}

impl<M, W, const N: usize> Transport for PipeTransport<'_, M, W, N>
where
    M: RawMutex,
    W: embedded_io_async::Write,
{
    async fn write(&mut self, bytes: &[u8]) -> AtResult<()> {
        self.tx.write_all(bytes).await.map_err(|_| {
            warn!("Transport: write of {} bytes failed", bytes.len());
            AtError::Transport
        })
    }

    fn read_available(&mut self, buf: &mut [u8]) -> usize {
        self.rx.try_read(buf).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

    struct Sink(std::vec::Vec<u8>);

    impl embedded_io_async::ErrorType for Sink {
        type Error = core::convert::Infallible;
    }

    impl embedded_io_async::Write for Sink {
        async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }
    }

    #[test]
    fn reads_what_the_feeder_pushed_and_never_blocks() {
        let pipe: Pipe<CriticalSectionRawMutex, 32> = Pipe::new();
        let mut transport = PipeTransport::new(&pipe, Sink(std::vec::Vec::new()));

        let mut buf = [0u8; 8];
        assert_eq!(transport.read_available(&mut buf), 0);

        assert_eq!(pipe.try_write(b"OK\r\n").ok(), Some(4));
        assert_eq!(transport.read_available(&mut buf), 4);
        assert_eq!(&buf[..4], b"OK\r\n");
        assert_eq!(transport.read_available(&mut buf), 0);
    }

    #[test]
    fn writes_go_to_the_sink() {
        let pipe: Pipe<CriticalSectionRawMutex, 8> = Pipe::new();
        let mut transport = PipeTransport::new(&pipe, Sink(std::vec::Vec::new()));
        block_on(transport.write(b"AT\r\n")).unwrap();
        assert_eq!(transport.tx.0, b"AT\r\n");
    }
}
