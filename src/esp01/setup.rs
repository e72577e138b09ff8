//! Mode setup as data: each [`WifiMode`] maps to an ordered list of
//! [`SetupStep`]s that [`CommandEngine::apply_mode`] runs in sequence.
//!
//! Only steps marked `required` stop the sequence; any other failure is
//! logged and the next step runs, as the modem often answers late while it
//! is still settling.

use super::clock::Clock;
use super::config::JoinFailurePolicy;
use super::engine::{command, CommandEngine};
use super::error::{AtError, AtResult};
use super::state::WifiMode;
use super::transport::Transport;
use embassy_time::Duration;

/// Join attempts routinely take several seconds on a busy network.
pub const JOIN_TIMEOUT_MS: u64 = 20_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Credentials<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
}

impl<'a> Credentials<'a> {
    pub fn new(ssid: &'a str, password: &'a str) -> Self {
        Self { ssid, password }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ModeRequest<'a> {
    Station {
        router: Credentials<'a>,
    },
    AccessPoint {
        access_point: Credentials<'a>,
    },
    AccessPointStation {
        router: Credentials<'a>,
        access_point: Credentials<'a>,
    },
}

impl<'a> ModeRequest<'a> {
    pub fn mode(&self) -> WifiMode {
        match self {
            ModeRequest::Station { .. } => WifiMode::Station,
            ModeRequest::AccessPoint { .. } => WifiMode::AccessPoint,
            ModeRequest::AccessPointStation { .. } => WifiMode::AccessPointStation,
        }
    }

    fn router(&self) -> Option<Credentials<'a>> {
        match *self {
            ModeRequest::Station { router } | ModeRequest::AccessPointStation { router, .. } => {
                Some(router)
            }
            ModeRequest::AccessPoint { .. } => None,
        }
    }

    fn access_point(&self) -> Option<Credentials<'a>> {
        match *self {
            ModeRequest::AccessPoint { access_point }
            | ModeRequest::AccessPointStation { access_point, .. } => Some(access_point),
            ModeRequest::Station { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StepCommand {
    /// `AT+RST`
    Restart,
    /// `AT+CWMODE=<n>`
    SetMode,
    /// `AT+CWJAP="<ssid>","<password>"`
    JoinRouter,
    /// `AT+CWSAP="<ssid>","<password>",1,4`
    ConfigureAccessPoint,
    /// `AT+CIPMUX=1`
    EnableMultiplexing,
    /// `AT+CIPSERVER=1,<port>`
    StartServer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupStep {
    pub command: StepCommand,
    pub timeout_ms: u64,
    /// Pause after the step, whatever its outcome
    pub settle_ms: u64,
    pub required: bool,
}

const fn step(command: StepCommand, timeout_ms: u64, settle_ms: u64, required: bool) -> SetupStep {
    SetupStep {
        command,
        timeout_ms,
        settle_ms,
        required,
    }
}

const RESTART: SetupStep = step(StepCommand::Restart, 1000, 2000, false);
const SET_MODE: SetupStep = step(StepCommand::SetMode, 5000, 0, false);
const JOIN_ROUTER: SetupStep = step(StepCommand::JoinRouter, JOIN_TIMEOUT_MS, 0, true);
const CONFIGURE_AP: SetupStep = step(StepCommand::ConfigureAccessPoint, 6000, 0, false);
const MULTIPLEX: SetupStep = step(StepCommand::EnableMultiplexing, 1000, 0, false);
const START_SERVER: SetupStep = step(StepCommand::StartServer, 1000, 0, false);

pub const STATION_STEPS: &[SetupStep] = &[RESTART, SET_MODE, JOIN_ROUTER];

pub const ACCESS_POINT_STEPS: &[SetupStep] =
    &[RESTART, SET_MODE, CONFIGURE_AP, MULTIPLEX, START_SERVER];

pub const ACCESS_POINT_STATION_STEPS: &[SetupStep] = &[
    RESTART,
    SET_MODE,
    JOIN_ROUTER,
    CONFIGURE_AP,
    MULTIPLEX,
    START_SERVER,
];

pub fn steps_for(mode: WifiMode) -> &'static [SetupStep] {
    match mode {
        WifiMode::Disconnected => &[],
        WifiMode::Station => STATION_STEPS,
        WifiMode::AccessPoint => ACCESS_POINT_STEPS,
        WifiMode::AccessPointStation => ACCESS_POINT_STATION_STEPS,
    }
}

impl<T: Transport, C: Clock, const N: usize> CommandEngine<'_, T, C, N> {
    /// Run the step table for the requested mode, strictly in order.
    pub async fn apply_mode(&mut self, request: &ModeRequest<'_>) -> AtResult<()> {
        let mode = request.mode();
        info!("Setup: applying {}", mode);

        for (index, step) in steps_for(mode).iter().enumerate() {
            match self.run_step(step, request).await {
                Ok(()) => debug!("Setup: step {} ({}) done", index, step.command),
                Err(e @ (AtError::Cancelled | AtError::Transport)) => return Err(e),
                Err(e) if step.required => {
                    error!("Setup: required step {} ({}) failed: {}", index, step.command, e);
                    return Err(e);
                }
                Err(e) => warn!("Setup: step {} ({}) failed: {}, continuing", index, step.command, e),
            }
            if step.settle_ms > 0 {
                self.clock.pause(Duration::from_millis(step.settle_ms)).await;
            }
        }

        info!("Setup: now {}", self.state.mode);
        Ok(())
    }

    async fn run_step(&mut self, step: &SetupStep, request: &ModeRequest<'_>) -> AtResult<()> {
        let timeout = Duration::from_millis(step.timeout_ms);
        match step.command {
            StepCommand::Restart => self.restart(timeout).await,
            StepCommand::SetMode => self.switch_mode(request.mode(), timeout).await,
            StepCommand::JoinRouter => {
                let router = request.router().ok_or(AtError::InvalidMode)?;
                self.join_with(router, timeout).await
            }
            StepCommand::ConfigureAccessPoint => {
                let access_point = request.access_point().ok_or(AtError::InvalidMode)?;
                self.configure_access_point(access_point, timeout).await
            }
            StepCommand::EnableMultiplexing => self.enable_multiplexing(timeout).await,
            StepCommand::StartServer => self.start_server(timeout).await,
        }
    }

    /// `AT+RST` followed by the restart settle time.
    pub async fn reset_modem(&mut self) -> AtResult<()> {
        let result = self.restart(Duration::from_millis(RESTART.timeout_ms)).await;
        self.clock.pause(Duration::from_millis(RESTART.settle_ms)).await;
        result
    }

    pub async fn set_wifi_mode(&mut self, mode: WifiMode) -> AtResult<()> {
        self.switch_mode(mode, Duration::from_millis(SET_MODE.timeout_ms))
            .await
    }

    /// Join a router. A failure here is fatal to the caller; the configured
    /// [`JoinFailurePolicy`] runs before the error is returned.
    pub async fn join(&mut self, ssid: &str, password: &str) -> AtResult<()> {
        self.join_with(
            Credentials::new(ssid, password),
            Duration::from_millis(JOIN_TIMEOUT_MS),
        )
        .await
    }

    pub async fn leave(&mut self) -> AtResult<()> {
        self.send("AT+CWQAP", Duration::from_millis(6000)).await?;
        self.state.left();
        info!("Setup: left router, now {}", self.state.mode);
        Ok(())
    }

    /// Bring up the soft AP and the web server on it.
    ///
    /// The modem must already be in a mode with an access point.
    pub async fn start_access_point(&mut self, ssid: &str, password: &str) -> AtResult<()> {
        if !self.state.mode.has_access_point() {
            return Err(AtError::InvalidMode);
        }
        self.configure_access_point(
            Credentials::new(ssid, password),
            Duration::from_millis(CONFIGURE_AP.timeout_ms),
        )
        .await?;
        self.enable_multiplexing(Duration::from_millis(MULTIPLEX.timeout_ms))
            .await?;
        self.start_server(Duration::from_millis(START_SERVER.timeout_ms))
            .await
    }

    /// Firmware version text reported by `AT+GMR`.
    pub async fn query_version(&mut self) -> AtResult<heapless::Vec<u8, N>> {
        let timeout = self.config.command_timeout;
        self.send_capture("AT+GMR", timeout).await
    }

    async fn restart(&mut self, timeout: Duration) -> AtResult<()> {
        let result = self.send("AT+RST", timeout).await;
        // Whatever it answered, the modem reboots and forgets run-time setup
        self.state.reset();
        result.map(|_| ())
    }

    async fn switch_mode(&mut self, mode: WifiMode, timeout: Duration) -> AtResult<()> {
        let code = mode.cwmode().ok_or(AtError::InvalidMode)?;
        let cwmode = command(format_args!("AT+CWMODE={}", code))?;
        self.send(&cwmode, timeout).await?;

        let keeps_station = mode.has_station() && self.state.mode.has_station();
        self.state.mode = match (mode.has_access_point(), keeps_station) {
            (true, true) => WifiMode::AccessPointStation,
            (true, false) => WifiMode::AccessPoint,
            (false, true) => WifiMode::Station,
            (false, false) => WifiMode::Disconnected,
        };
        Ok(())
    }

    async fn join_with(&mut self, router: Credentials<'_>, timeout: Duration) -> AtResult<()> {
        let cwjap = command(format_args!(
            "AT+CWJAP=\"{}\",\"{}\"",
            router.ssid, router.password
        ))?;
        info!("Setup: joining {}", router.ssid);

        match self.send(&cwjap, timeout).await {
            Ok(_) => {
                self.state.joined();
                info!("Setup: joined {}, now {}", router.ssid, self.state.mode);
                Ok(())
            }
            Err(e) => {
                error!("Setup: join {} failed: {}", router.ssid, e);
                if self.config.join_failure == JoinFailurePolicy::ResetModem {
                    warn!("Setup: resetting modem after failed join");
                    if let Err(reset) = self.reset_modem().await {
                        warn!("Setup: reset after failed join: {}", reset);
                    }
                }
                Err(e)
            }
        }
    }

    async fn configure_access_point(&mut self, access_point: Credentials<'_>, timeout: Duration) -> AtResult<()> {
        // channel 1, WPA_WPA2_PSK
        let cwsap = command(format_args!(
            "AT+CWSAP=\"{}\",\"{}\",1,4",
            access_point.ssid, access_point.password
        ))?;
        self.send(&cwsap, timeout).await?;
        Ok(())
    }

    async fn enable_multiplexing(&mut self, timeout: Duration) -> AtResult<()> {
        self.send("AT+CIPMUX=1", timeout).await?;
        self.state.multiplexed = true;
        Ok(())
    }

    async fn start_server(&mut self, timeout: Duration) -> AtResult<()> {
        let port = self.config.server_port;
        let cipserver = command(format_args!("AT+CIPSERVER=1,{}", port))?;
        self.send(&cipserver, timeout).await?;
        self.state.server_port = Some(port);
        info!("Setup: serving on port {}", port);
        Ok(())
    }
}
