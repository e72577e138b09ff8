use super::buffer::{RollingBuffer, DEFAULT_CAPACITY};
use super::cancel::CancelToken;
use super::clock::Clock;
use super::config::EngineConfig;
use super::error::{AtError, AtResult};
use super::matcher::{scan, Marker, MarkerKind, Match, COMMAND_MARKERS};
use super::state::ConnectionState;
use super::transport::Transport;
use core::fmt::Write;
use embassy_time::{Duration, Instant};
use heapless::{String, Vec};

/// Line terminator the modem expects after every command and payload.
pub const CRLF: &[u8] = b"\r\n";

pub const COMMAND_CAPACITY: usize = 128;

/// Bytes pulled from the transport per read; kept well under the window so a
/// marker is scanned before the next chunk can evict it.
const READ_CHUNK: usize = 64;

pub type Command = String<COMMAND_CAPACITY>;

/// Format an AT command into a fixed-capacity string.
pub fn command(args: core::fmt::Arguments<'_>) -> AtResult<Command> {
    let mut out = Command::new();
    out.write_fmt(args).map_err(|_| AtError::CommandTooLong)?;
    Ok(out)
}

pub(crate) fn as_text(bytes: &[u8]) -> &str {
    core::str::from_utf8(bytes).unwrap_or("<binary>")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reply {
    /// The modem confirmed the command.
    Success,
    /// Written with a zero timeout; nobody waited for the reply.
    Dispatched,
}

/// The one command in flight.
#[derive(Debug, Clone, Copy)]
pub struct PendingCommand<'a> {
    pub command: &'a [u8],
    pub deadline: Instant,
    pub markers: &'static [Marker],
}

/// Serialized AT-command transactions over a [`Transport`].
///
/// Owns the receive window and the connection state. `&mut self` on every
/// transaction keeps exactly one command outstanding at a time.
pub struct CommandEngine<'c, T, C, const N: usize = DEFAULT_CAPACITY> {
    pub(crate) transport: T,
    pub(crate) clock: C,
    pub(crate) buffer: RollingBuffer<N>,
    pub(crate) state: ConnectionState,
    pub(crate) config: EngineConfig,
    cancel: &'c CancelToken,
}

impl<'c, T: Transport, C: Clock, const N: usize> CommandEngine<'c, T, C, N> {
    pub fn new(transport: T, clock: C, config: EngineConfig, cancel: &'c CancelToken) -> Self {
        Self {
            transport,
            clock,
            buffer: RollingBuffer::new(),
            state: ConnectionState::new(),
            config,
            cancel,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ConnectionState {
        &mut self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn buffer(&self) -> &RollingBuffer<N> {
        &self.buffer
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Send `command` and wait up to `timeout` for `OK`, `ERROR` or `FAIL`.
    ///
    /// A zero timeout writes the command and returns [`Reply::Dispatched`]
    /// straight away.
    pub async fn send(&mut self, command: &str, timeout: Duration) -> AtResult<Reply> {
        self.send_expecting(command.as_bytes(), timeout, COMMAND_MARKERS)
            .await
    }

    pub async fn send_expecting(
        &mut self,
        command: &[u8],
        timeout: Duration,
        markers: &'static [Marker],
    ) -> AtResult<Reply> {
        if timeout.as_ticks() == 0 {
            self.write_line(command).await?;
            debug!("AT: {} (not awaited)", as_text(command));
            return Ok(Reply::Dispatched);
        }

        let found = self.transact(command, timeout, markers).await?;
        self.buffer.consume(found.end);
        Ok(Reply::Success)
    }

    /// Send `command` and return what the modem printed before `OK`.
    pub async fn send_capture(&mut self, command: &str, timeout: Duration) -> AtResult<Vec<u8, N>> {
        let found = self
            .transact(command.as_bytes(), timeout, COMMAND_MARKERS)
            .await?;
        let mut reply = Vec::new();
        // The window never holds more than N bytes
        let _ = reply.extend_from_slice(&self.buffer.as_bytes()[..found.offset]);
        self.buffer.consume(found.end);
        Ok(reply)
    }

    async fn transact(
        &mut self,
        command: &[u8],
        timeout: Duration,
        markers: &'static [Marker],
    ) -> AtResult<Match> {
        // Anything already in the window belongs to an earlier transaction
        self.buffer.clear();
        self.write_line(command).await?;
        debug!("AT: {}", as_text(command));

        let pending = PendingCommand {
            command,
            deadline: self.clock.now() + timeout,
            markers,
        };
        let found = match self.poll_until(pending.deadline, pending.markers).await {
            Ok(found) => found,
            Err(AtError::Timeout) => {
                warn!(
                    "AT: {} timed out after {} ms",
                    as_text(pending.command),
                    timeout.as_millis()
                );
                return Err(AtError::Timeout);
            }
            Err(e) => return Err(e),
        };

        if found.kind == MarkerKind::Failure {
            warn!("AT: {} rejected by modem", as_text(pending.command));
            return Err(AtError::ModemFailure);
        }
        Ok(found)
    }

    /// Read, append and scan until a marker shows up or `deadline` passes.
    ///
    /// Bytes already in the window are scanned first, then each chunk read is
    /// scanned before the next one is appended. The cancel token is checked
    /// once per iteration and the engine pauses for `poll_interval` whenever
    /// the transport has nothing more to give.
    pub async fn poll_until(&mut self, deadline: Instant, markers: &[Marker]) -> AtResult<Match> {
        if let Some(found) = scan(self.buffer.as_bytes(), markers) {
            return Ok(found);
        }

        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if self.cancel.is_cancelled() {
                info!("AT: wait cancelled");
                return Err(AtError::Cancelled);
            }

            loop {
                let count = self.transport.read_available(&mut chunk);
                if count == 0 {
                    break;
                }
                self.buffer.append(&chunk[..count]);
                if let Some(found) = scan(self.buffer.as_bytes(), markers) {
                    trace!("AT: marker {} at {}", found.index, found.offset);
                    return Ok(found);
                }
            }

            if self.clock.now() >= deadline {
                return Err(AtError::Timeout);
            }
            self.clock.pause(self.config.poll_interval).await;
        }
    }

    pub async fn write_line(&mut self, line: &[u8]) -> AtResult<()> {
        self.transport.write(line).await?;
        self.transport.write(CRLF).await
    }

    pub async fn pause(&mut self, duration: Duration) {
        self.clock.pause(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{ManualClock, ScriptedModem};
    use embassy_futures::block_on;

    fn engine(modem: ScriptedModem, cancel: &CancelToken) -> CommandEngine<'_, ScriptedModem, ManualClock> {
        CommandEngine::new(modem, ManualClock::new(), EngineConfig::default(), cancel)
    }

    #[test]
    fn zero_timeout_returns_without_reading() {
        let cancel = CancelToken::new();
        let mut modem = ScriptedModem::new();
        modem.push(b"ERROR\r\n");
        let mut engine = engine(modem, &cancel);

        let reply = block_on(engine.send("AT+RST", Duration::from_millis(0))).unwrap();
        assert_eq!(reply, Reply::Dispatched);
        assert_eq!(engine.transport().reads, 0);
        assert_eq!(engine.transport().line_strs(), ["AT+RST"]);
        assert_eq!(engine.clock().now(), Instant::from_millis(0));
    }

    #[test]
    fn ok_before_deadline_is_success() {
        let cancel = CancelToken::new();
        let mut modem = ScriptedModem::new();
        modem.idle(3).push(b"AT+RST\r\n\r\nOK\r\n");
        let mut engine = engine(modem, &cancel);

        let reply = block_on(engine.send("AT+RST", Duration::from_millis(2000))).unwrap();
        assert_eq!(reply, Reply::Success);
        assert_eq!(engine.clock().now(), Instant::from_millis(30));
    }

    #[test]
    fn silence_times_out_at_the_deadline() {
        let cancel = CancelToken::new();
        let mut engine = engine(ScriptedModem::new(), &cancel);

        let result = block_on(engine.send("AT+RST", Duration::from_millis(2000)));
        assert_eq!(result, Err(AtError::Timeout));
        assert_eq!(engine.clock().now(), Instant::from_millis(2000));
    }

    #[test]
    fn error_marker_is_a_modem_failure() {
        let cancel = CancelToken::new();
        let modem = ScriptedModem::new().reply("AT+CIPMUX", "\r\nERROR\r\n");
        let mut engine = engine(modem, &cancel);

        let result = block_on(engine.send("AT+CIPMUX=1", Duration::from_millis(1000)));
        assert_eq!(result, Err(AtError::ModemFailure));
    }

    #[test]
    fn stale_ok_does_not_satisfy_the_next_command() {
        let cancel = CancelToken::new();
        let mut modem = ScriptedModem::new();
        modem.push(b"OK\r\n");
        let mut engine = engine(modem, &cancel);

        // Leave the early OK sitting in the window
        let deadline = engine.clock().now() + Duration::from_millis(100);
        block_on(engine.poll_until(deadline, &[Marker::success(&[b"never"])])).unwrap_err();
        assert!(engine.buffer().contains(b"OK"));

        let result = block_on(engine.send("AT+CWQAP", Duration::from_millis(500)));
        assert_eq!(result, Err(AtError::Timeout));
    }

    #[test]
    fn cancel_aborts_a_wait() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut engine = engine(ScriptedModem::new(), &cancel);

        let result = block_on(engine.send("AT", Duration::from_millis(300_000)));
        assert_eq!(result, Err(AtError::Cancelled));
        assert_eq!(engine.clock().now(), Instant::from_millis(0));

        cancel.reset();
        engine.transport_mut().push(b"OK");
        assert_eq!(block_on(engine.send("AT", Duration::from_millis(100))), Ok(Reply::Success));
    }

    #[test]
    fn marker_found_inside_a_long_burst() {
        let cancel = CancelToken::new();
        let mut modem = ScriptedModem::new();
        let mut burst = std::vec![b'.'; 500];
        burst.extend_from_slice(b"\r\nOK\r\n");
        burst.extend(std::iter::repeat(b'.').take(500));
        modem.push(&burst);
        let mut engine = engine(modem, &cancel);

        assert_eq!(
            block_on(engine.send("AT", Duration::from_millis(100))),
            Ok(Reply::Success)
        );
    }

    #[test]
    fn capture_returns_text_before_ok() {
        let cancel = CancelToken::new();
        let modem = ScriptedModem::new().reply("AT+GMR", "AT version:1.2.0.0\r\nOK\r\n");
        let mut engine = engine(modem, &cancel);

        let reply = block_on(engine.send_capture("AT+GMR", Duration::from_millis(1000))).unwrap();
        assert_eq!(reply.as_slice(), b"AT version:1.2.0.0\r\n");
        assert_eq!(engine.buffer().as_bytes(), b"\r\n");
    }

    #[test]
    fn command_formatting_is_bounded() {
        let long = "x".repeat(COMMAND_CAPACITY);
        assert_eq!(
            command(format_args!("AT+CWJAP=\"{}\"", long)).unwrap_err(),
            AtError::CommandTooLong
        );
        assert_eq!(
            command(format_args!("AT+CIPSEND={},{}", 0, 12)).unwrap().as_str(),
            "AT+CIPSEND=0,12"
        );
    }
}
