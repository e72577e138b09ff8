use crate::esp01::{Method, ParsedRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Route {
    /// `GET /`
    Home,
    /// `GET /LEDn`, zero-based LED index
    Toggle(u8),
    NotFound,
}

impl Route {
    pub fn resolve(request: &ParsedRequest, led_count: u8) -> Route {
        if request.method != Method::Get {
            return Route::NotFound;
        }

        let path = request.path.as_str();
        if path == "/" {
            return Route::Home;
        }

        // Panel buttons are numbered from 1
        match path.strip_prefix("/LED").and_then(|n| n.parse::<u8>().ok()) {
            Some(number) if number >= 1 && number <= led_count => Route::Toggle(number - 1),
            _ => Route::NotFound,
        }
    }
}
