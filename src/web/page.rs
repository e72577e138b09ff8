use crate::esp01::{AtError, AtResult, CRLF, MAX_SEND_LENGTH, RESPONSE_HEAD};
use core::fmt::Write;
use heapless::String;

/// Largest page that still goes out in a single `AT+CIPSEND`.
pub const PAGE_CAPACITY: usize = MAX_SEND_LENGTH - CRLF.len();

const MAX_LEDS: u8 = 16;

const STYLE: &str = "<style>body{font-family:Arial,sans-serif;text-align:center;}\
button{width:8rem;padding:0.6rem;margin:0.3rem;}.on{color:#16a34a;}.off{color:#555;}</style>";

/// Full HTTP reply for the LED panel.
///
/// `found` is false when the request did not match a route; the panel is
/// still drawn so the user can carry on from there. A page that does not fit
/// in `N` bytes is [`AtError::CommandTooLong`], never a truncated page.
pub fn render_page<const N: usize>(toggles: u16, led_count: u8, found: bool) -> AtResult<String<N>> {
    let mut page = String::new();
    write_page(&mut page, toggles, led_count, found).map_err(|_| AtError::CommandTooLong)?;
    Ok(page)
}

fn write_page(page: &mut impl Write, toggles: u16, led_count: u8, found: bool) -> core::fmt::Result {
    page.write_str(RESPONSE_HEAD)?;
    page.write_str("<!DOCTYPE html><html><head><meta charset=\"utf-8\">")?;
    page.write_str("<meta name=\"viewport\" content=\"width=device-width,initial-scale=1\">")?;
    page.write_str("<title>ESP-01 LED panel</title>")?;
    page.write_str(STYLE)?;
    page.write_str("</head><body><h1>LED panel</h1>")?;

    if !found {
        page.write_str("<p><strong>Unknown request</strong></p>")?;
    }

    for index in 0..led_count.min(MAX_LEDS) {
        let on = toggles & (1 << index) != 0;
        let (class, label) = if on { ("on", "ON") } else { ("off", "OFF") };
        write!(
            page,
            "<p class=\"{}\">LED{} is {}</p><a href=\"/LED{}\"><button>Toggle LED{}</button></a>",
            class,
            index + 1,
            label,
            index + 1,
            index + 1
        )?;
    }

    page.write_str("</body></html>")
}
