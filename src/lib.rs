#![cfg_attr(not(test), no_std)]

//! ESP-01 AT-command Wi-Fi driver for Embassy targets
//!
//! The library talks to an ESP8266 running the stock AT firmware over a
//! serial link. It joins routers, runs a soft access point, serves one
//! HTTP request at a time and sends outbound HTTP requests. The nRF52840-DK
//! binaries under `src/bin` show it driving the board LEDs from a web page.

// Must come first so the logging macros are visible to every module below
mod fmt;

pub mod esp01;
pub mod gpio_tasks;
pub mod web;

#[cfg(feature = "nrf")]
pub mod modem_link;

#[cfg(test)]
mod mock;
