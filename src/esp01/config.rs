use embassy_time::Duration;

/// What to do after the modem failed to join a router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum JoinFailurePolicy {
    /// Return the error and leave the modem as it is.
    Report,
    /// Send `AT+RST` to the modem, then return the error.
    ResetModem,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Pause between two empty polls of the transport
    pub poll_interval: Duration,

    /// Default reply timeout for simple commands
    pub command_timeout: Duration,

    /// How long `await_request` waits for an inbound HTTP request
    pub request_wait: Duration,

    /// Outbound `AT+CIPSTART` reply timeout
    pub connect_timeout: Duration,

    /// `AT+CIPSEND` prompt timeout
    pub send_timeout: Duration,

    /// Timeout for the modem to confirm a payload (`SEND OK`)
    pub payload_timeout: Duration,

    /// `AT+CIPCLOSE` reply timeout
    pub close_timeout: Duration,

    /// How long `fetch` waits for the remote to close the connection
    pub response_timeout: Duration,

    /// Policy applied when joining a router fails
    pub join_failure: JoinFailurePolicy,

    /// TCP port of the built-in web server
    pub server_port: u16,

    /// Link id used for outbound connections while the modem is multiplexed
    pub outbound_link: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
            command_timeout: Duration::from_millis(1000),
            request_wait: Duration::from_millis(300_000),
            connect_timeout: Duration::from_millis(6000),
            send_timeout: Duration::from_millis(3000),
            payload_timeout: Duration::from_millis(6000),
            close_timeout: Duration::from_millis(3000),
            response_timeout: Duration::from_millis(10_000),
            join_failure: JoinFailurePolicy::Report,
            server_port: 80,
            outbound_link: 4,
        }
    }
}
