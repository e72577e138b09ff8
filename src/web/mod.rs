//! Demo web panel served from the modem's access point: one page with a
//! toggle button per LED.

pub mod page;
pub mod routes;

pub use page::{render_page, PAGE_CAPACITY};
pub use routes::Route;
