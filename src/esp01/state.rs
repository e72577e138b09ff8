use core::fmt;

/// Wi-Fi role of the modem as far as the driver knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WifiMode {
    #[default]
    Disconnected,
    /// Joined to a router
    Station,
    /// Running its own access point
    AccessPoint,
    /// Both at once
    AccessPointStation,
}

impl WifiMode {
    /// Argument of `AT+CWMODE`.
    pub fn cwmode(self) -> Option<u8> {
        match self {
            WifiMode::Disconnected => None,
            WifiMode::Station => Some(1),
            WifiMode::AccessPoint => Some(2),
            WifiMode::AccessPointStation => Some(3),
        }
    }

    pub fn has_access_point(self) -> bool {
        matches!(self, WifiMode::AccessPoint | WifiMode::AccessPointStation)
    }

    pub fn has_station(self) -> bool {
        matches!(self, WifiMode::Station | WifiMode::AccessPointStation)
    }
}

/// Modem-assigned connection slot, `0`..=`9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClientId(u8);

impl ClientId {
    pub fn new(slot: u8) -> Option<Self> {
        (slot <= 9).then_some(Self(slot))
    }

    pub fn from_ascii(digit: u8) -> Option<Self> {
        digit.is_ascii_digit().then(|| Self(digit - b'0'))
    }

    pub fn slot(self) -> u8 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionState {
    pub mode: WifiMode,
    /// Client of the inbound request currently being answered
    pub client: Option<ClientId>,
    /// `AT+CIPMUX=1` is active; link ids are required on every IP command
    pub multiplexed: bool,
    /// Port the built-in server listens on, once started
    pub server_port: Option<u16>,
    /// One bit per output toggled from the web page
    pub toggles: u16,
}

impl ConnectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn joined(&mut self) {
        self.mode = match self.mode {
            WifiMode::AccessPoint | WifiMode::AccessPointStation => WifiMode::AccessPointStation,
            _ => WifiMode::Station,
        };
    }

    pub fn left(&mut self) {
        self.mode = match self.mode {
            WifiMode::AccessPoint | WifiMode::AccessPointStation => WifiMode::AccessPoint,
            _ => WifiMode::Disconnected,
        };
    }

    /// A modem reset forgets everything configured at run time.
    pub fn reset(&mut self) {
        let toggles = self.toggles;
        *self = Self { toggles, ..Self::default() };
    }

    pub fn toggle(&mut self, index: u8) -> bool {
        if index >= 16 {
            return false;
        }
        self.toggles ^= 1 << index;
        self.is_on(index)
    }

    pub fn is_on(&self, index: u8) -> bool {
        index < 16 && self.toggles & (1 << index) != 0
    }
}
