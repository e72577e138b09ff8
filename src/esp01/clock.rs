use embassy_time::{Duration, Instant, Timer};

/// Time source for the engine's deadlines and settle pauses.
#[allow(async_fn_in_trait)]
pub trait Clock {
    fn now(&self) -> Instant;

    async fn pause(&mut self, duration: Duration);
}

/// Clock backed by the Embassy time driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn pause(&mut self, duration: Duration) {
        Timer::after(duration).await;
    }
}
