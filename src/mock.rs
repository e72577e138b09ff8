//! Host-side stand-ins for the modem link and the time driver.

use crate::esp01::{AtResult, Clock, Transport};
use embassy_time::{Duration, Instant};
use std::collections::VecDeque;
use std::vec::Vec;

/// Transport that plays back scripted modem output.
///
/// The engine writes a line as the text followed by a separate `\r\n`
/// write; the two are recorded as one line. A reply rule fires when a line
/// starting with its prefix is completed and queues the reply for reading.
/// An echoing modem queues the completed line itself ahead of the reply, as
/// the ESP-01 does out of the box (`ATE1`).
#[derive(Default)]
pub struct ScriptedModem {
    inbound: VecDeque<Vec<u8>>,
    rules: Vec<(Vec<u8>, Vec<u8>)>,
    frames: Vec<Vec<u8>>,
    open: bool,
    echo: bool,
    pub reads: usize,
}

impl ScriptedModem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes that arrive on a later read.
    pub fn push(&mut self, bytes: &[u8]) -> &mut Self {
        self.inbound.push_back(bytes.to_vec());
        self
    }

    /// Queue `count` reads that find nothing.
    pub fn idle(&mut self, count: usize) -> &mut Self {
        for _ in 0..count {
            self.inbound.push_back(Vec::new());
        }
        self
    }

    pub fn echoing(mut self) -> Self {
        self.echo = true;
        self
    }

    pub fn reply(mut self, prefix: &str, reply: &str) -> Self {
        self.rules.push((prefix.as_bytes().to_vec(), reply.as_bytes().to_vec()));
        self
    }

    /// Completed lines without their terminator.
    pub fn lines(&self) -> Vec<&[u8]> {
        self.frames
            .iter()
            .map(|frame| frame.strip_suffix(b"\r\n").unwrap_or(frame))
            .collect()
    }

    pub fn line_strs(&self) -> Vec<&str> {
        self.lines()
            .into_iter()
            .map(|line| std::str::from_utf8(line).unwrap())
            .collect()
    }

    fn fire_rules(&mut self) {
        let Some(frame) = self.frames.last() else {
            return;
        };
        if self.echo {
            self.inbound.push_back(frame.clone());
        }
        let line = frame.strip_suffix(b"\r\n").unwrap_or(frame);
        if let Some((_, reply)) = self.rules.iter().find(|(prefix, _)| line.starts_with(prefix)) {
            self.inbound.push_back(reply.clone());
        }
    }
}

impl Transport for ScriptedModem {
    async fn write(&mut self, bytes: &[u8]) -> AtResult<()> {
        if bytes == b"\r\n" && self.open {
            if let Some(frame) = self.frames.last_mut() {
                frame.extend_from_slice(bytes);
            }
            self.open = false;
            self.fire_rules();
        } else {
            self.frames.push(bytes.to_vec());
            self.open = true;
        }
        Ok(())
    }

    fn read_available(&mut self, buf: &mut [u8]) -> usize {
        self.reads += 1;
        let Some(mut chunk) = self.inbound.pop_front() else {
            return 0;
        };
        let count = chunk.len().min(buf.len());
        buf[..count].copy_from_slice(&chunk[..count]);
        if count < chunk.len() {
            self.inbound.push_front(chunk.split_off(count));
        }
        count
    }
}

/// Clock that only moves when the engine pauses.
pub struct ManualClock {
    now: Instant,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Instant::from_millis(0),
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now
    }

    async fn pause(&mut self, duration: Duration) {
        self.now += duration;
    }
}
