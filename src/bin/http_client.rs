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
use embassy_time::{Duration, Timer};
use esp01_at::esp01::{
    CancelToken, CommandEngine, EmbassyClock, EngineConfig, HttpRequest, JoinFailurePolicy,
    Method, PipeTransport, WifiMode,
};
use esp01_at::gpio_tasks::heartbeat_task;
use esp01_at::modem_link::{modem_rx_task, ModemTx, MODEM_BAUDRATE, RX_PIPE};
use {defmt_rtt as _, panic_halt as _};

defmt::timestamp!("{=u64:us}", { embassy_time::Instant::now().as_micros() });

bind_interrupts!(struct Irqs {
    UARTE1 => uarte::InterruptHandler<peripherals::UARTE1>;
});

const SSID: &str = "home-network";
const PASSWORD: &str = "change-me";

const SERVER: &str = "192.168.1.10";
const PORT: u16 = 8080;

static SHUTDOWN: CancelToken = CancelToken::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("=== nRF52840-DK ESP-01 HTTP Client ===");
    let p = embassy_nrf::init(Default::default());

    let heartbeat = Output::new(p.P0_13, Level::High, OutputDrive::Standard);
    unwrap!(spawner.spawn(heartbeat_task(heartbeat)));

    let mut uart_config = uarte::Config::default();
    uart_config.parity = uarte::Parity::EXCLUDED;
    uart_config.baudrate = MODEM_BAUDRATE;
    let uart = Uarte::new(p.UARTE1, Irqs, p.P1_01, p.P1_02, uart_config);
    let (tx, rx) = uart.split_with_idle(p.TIMER0, p.PPI_CH0, p.PPI_CH1);
    unwrap!(spawner.spawn(modem_rx_task(rx)));

    let config = EngineConfig {
        join_failure: JoinFailurePolicy::ResetModem,
        ..EngineConfig::default()
    };
    let transport = PipeTransport::new(&RX_PIPE, ModemTx::new(tx));
    let mut modem: CommandEngine<'_, _, _> =
        CommandEngine::new(transport, EmbassyClock, config, &SHUTDOWN);

    let _ = modem.reset_modem().await;
    if let Err(e) = modem.set_wifi_mode(WifiMode::Station).await {
        warn!("CWMODE failed: {}", e);
    }
    while let Err(e) = modem.join(SSID, PASSWORD).await {
        warn!("Join failed: {}, retrying in 5 s", e);
        Timer::after(Duration::from_secs(5)).await;
        let _ = modem.set_wifi_mode(WifiMode::Station).await;
    }

    let mut count: u32 = 0;
    loop {
        count = count.wrapping_add(1);

        let mut body: heapless::String<32> = heapless::String::new();
        let _ = core::fmt::write(&mut body, format_args!("count={}", count));
        let report = HttpRequest::new(Method::Post, SERVER, PORT, "/report")
            .with_headers("Content-Type: application/x-www-form-urlencoded")
            .with_body(body.as_str());
        match modem.send_http(&report).await {
            Ok(()) => info!("Report {} sent", count),
            Err(e) => warn!("Report {} failed: {}", count, e),
        }

        let status = HttpRequest::new(Method::Get, SERVER, PORT, "/status");
        match modem.fetch(&status).await {
            Ok(reply) => info!("Status: {=[u8]:a}", reply.as_slice()),
            Err(e) => warn!("Status fetch failed: {}", e),
        }

        Timer::after(Duration::from_secs(30)).await;
    }
}
