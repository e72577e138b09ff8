#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_nrf::{
    bind_interrupts,
    gpio::{Level, Output, OutputDrive},
    peripherals,
    uarte::{self, Uarte},
};
use esp01_at::esp01::{
    AtError, CancelToken, CommandEngine, Credentials, EmbassyClock, EngineConfig, ModeRequest,
    PipeTransport,
};
use esp01_at::gpio_tasks::{heartbeat_task, LedBank};
use esp01_at::modem_link::{modem_rx_task, ModemTx, MODEM_BAUDRATE, RX_PIPE};
use esp01_at::web::{render_page, Route, PAGE_CAPACITY};
use {defmt_rtt as _, panic_halt as _};

defmt::timestamp!("{=u64:us}", { embassy_time::Instant::now().as_micros() });

bind_interrupts!(struct Irqs {
    UARTE1 => uarte::InterruptHandler<peripherals::UARTE1>;
});

const ROUTER: Credentials<'static> = Credentials {
    ssid: "home-network",
    password: "change-me",
};

const ACCESS_POINT: Credentials<'static> = Credentials {
    ssid: "nRF52840-ESP01",
    password: "12345678",
};

const SERVER_ERROR: &[u8] = b"HTTP/1.1 500 Internal Server Error\r\nConnection: close\r\n\r\n";

/// Never raised by this firmware; a supervisor task could stop the server through it.
static SHUTDOWN: CancelToken = CancelToken::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("=== nRF52840-DK ESP-01 Web Server ===");
    let p = embassy_nrf::init(Default::default());

    // LED1 heartbeat, LED2..LED4 on the web panel
    let heartbeat = Output::new(p.P0_13, Level::High, OutputDrive::Standard);
    let mut leds = LedBank::new([
        Output::new(p.P0_14, Level::High, OutputDrive::Standard),
        Output::new(p.P0_15, Level::High, OutputDrive::Standard),
        Output::new(p.P0_16, Level::High, OutputDrive::Standard),
    ]);
    unwrap!(spawner.spawn(heartbeat_task(heartbeat)));

    // ESP-01 on P1.01 (RX) / P1.02 (TX)
    let mut uart_config = uarte::Config::default();
    uart_config.parity = uarte::Parity::EXCLUDED;
    uart_config.baudrate = MODEM_BAUDRATE;
    let uart = Uarte::new(p.UARTE1, Irqs, p.P1_01, p.P1_02, uart_config);
    let (tx, rx) = uart.split_with_idle(p.TIMER0, p.PPI_CH0, p.PPI_CH1);
    unwrap!(spawner.spawn(modem_rx_task(rx)));

    let transport = PipeTransport::new(&RX_PIPE, ModemTx::new(tx));
    let mut modem: CommandEngine<'_, _, _> =
        CommandEngine::new(transport, EmbassyClock, EngineConfig::default(), &SHUTDOWN);

    let setup = ModeRequest::AccessPointStation {
        router: ROUTER,
        access_point: ACCESS_POINT,
    };
    if let Err(e) = modem.apply_mode(&setup).await {
        error!("Modem setup failed: {}, restarting", e);
        cortex_m::peripheral::SCB::sys_reset();
    }

    match modem.query_version().await {
        Ok(version) => info!("Modem firmware: {=[u8]:a}", version.as_slice()),
        Err(e) => warn!("Modem version unavailable: {}", e),
    }

    let led_count = leds.len();
    loop {
        let request = match modem.await_request().await {
            Ok(Some(request)) => request,
            Ok(None) => continue,
            Err(e) if e.is_poll_miss() => continue,
            Err(AtError::Cancelled) => break,
            Err(e) => {
                warn!("Server: {}", e);
                continue;
            }
        };

        let found = match Route::resolve(&request, led_count) {
            Route::Home => true,
            Route::Toggle(index) => {
                let on = modem.state_mut().toggle(index);
                info!("LED{} -> {}", index + 1, if on { "on" } else { "off" });
                true
            }
            Route::NotFound => false,
        };

        let toggles = modem.state().toggles;
        let _ = leds.apply(toggles);
        let result = match render_page::<PAGE_CAPACITY>(toggles, led_count, found) {
            Ok(page) => modem.respond(page.as_bytes()).await,
            Err(e) => modem.respond(SERVER_ERROR).await.and(Err(e)),
        };
        if let Err(e) = result {
            warn!("Server: reply failed: {}", e);
        }
    }

    info!("Server stopped");
}
