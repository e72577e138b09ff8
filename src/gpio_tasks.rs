use embedded_hal::digital::OutputPin;

/// Board LEDs driven from the web panel's toggle bitmask.
///
/// The DK's LEDs are active low: bit set means pin low.
pub struct LedBank<P, const N: usize> {
    pins: [P; N],
}

impl<P: OutputPin, const N: usize> LedBank<P, N> {
    pub fn new(pins: [P; N]) -> Self {
        Self { pins }
    }

    pub const fn len(&self) -> u8 {
        N as u8
    }

    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// Mirror `toggles` onto the pins, bit 0 on the first LED.
    pub fn apply(&mut self, toggles: u16) -> Result<(), P::Error> {
        for (index, pin) in self.pins.iter_mut().enumerate() {
            if index < 16 && toggles & (1 << index) != 0 {
                pin.set_low()?;
            } else {
                pin.set_high()?;
            }
        }
        Ok(())
    }
}

#[cfg(feature = "nrf")]
#[embassy_executor::task]
pub async fn heartbeat_task(mut led: embassy_nrf::gpio::Output<'static>) {
    use embassy_time::{Duration, Timer};

    info!("Starting heartbeat task");
    loop {
        led.set_low();
        Timer::after(Duration::from_millis(100)).await;
        led.set_high();
        Timer::after(Duration::from_millis(900)).await;
    }
}
