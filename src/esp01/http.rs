use super::error::{AtError, AtResult};
use core::fmt::Write;
use heapless::String;

/// Largest outbound request the driver will format.
pub const REQUEST_CAPACITY: usize = 512;

/// Head of the single response the built-in server knows how to send.
pub const RESPONSE_HEAD: &str =
    "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Method {
    Get,
    Post,
    Put,
    Head,
    Delete,
    Patch,
    Options,
    Connect,
    Trace,
}

impl Method {
    pub const ALL: [Method; 9] = [
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Head,
        Method::Delete,
        Method::Patch,
        Method::Options,
        Method::Connect,
        Method::Trace,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Head => "HEAD",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Options => "OPTIONS",
            Method::Connect => "CONNECT",
            Method::Trace => "TRACE",
        }
    }

    pub fn from_token(token: &[u8]) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|method| method.as_str().as_bytes() == token)
    }
}

/// An HTTP/1.1 request sent over a fresh modem TCP connection.
#[derive(Debug, Clone, Copy)]
pub struct HttpRequest<'a> {
    pub method: Method,
    pub host: &'a str,
    pub port: u16,
    pub path: &'a str,
    /// Extra header lines, CRLF separated, without the trailing CRLF
    pub headers: Option<&'a str>,
    pub body: Option<&'a str>,
}

impl<'a> HttpRequest<'a> {
    pub fn new(method: Method, host: &'a str, port: u16, path: &'a str) -> Self {
        Self {
            method,
            host,
            port,
            path,
            headers: None,
            body: None,
        }
    }

    pub fn with_headers(mut self, headers: &'a str) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn with_body(mut self, body: &'a str) -> Self {
        self.body = Some(body);
        self
    }

    /// Render request line, headers and body.
    pub fn render(&self) -> AtResult<String<REQUEST_CAPACITY>> {
        let mut out = String::new();
        self.write_into(&mut out)
            .map_err(|_| AtError::CommandTooLong)?;
        Ok(out)
    }

    fn write_into(&self, out: &mut String<REQUEST_CAPACITY>) -> core::fmt::Result {
        write!(out, "{} {} HTTP/1.1\r\n", self.method.as_str(), self.path)?;
        write!(out, "Host: {}\r\n", self.host)?;
        if let Some(headers) = self.headers.filter(|h| !h.is_empty()) {
            write!(out, "{}\r\n", headers)?;
        }
        match self.body {
            Some(body) => write!(out, "Content-Length: {}\r\n\r\n{}", body.len(), body),
            None => out.write_str("\r\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_tokens() {
        assert_eq!(Method::from_token(b"GET"), Some(Method::Get));
        assert_eq!(Method::from_token(b"OPTIONS"), Some(Method::Options));
        assert_eq!(Method::from_token(b"get"), None);
        assert_eq!(Method::from_token(b"GETX"), None);
    }

    #[test]
    fn renders_a_bare_get() {
        let request = HttpRequest::new(Method::Get, "www.example.com", 80, "/s?wd=esp");
        assert_eq!(
            request.render().unwrap().as_str(),
            "GET /s?wd=esp HTTP/1.1\r\nHost: www.example.com\r\n\r\n"
        );
    }

    #[test]
    fn renders_headers_and_body() {
        let request = HttpRequest::new(Method::Post, "api.local", 8080, "/log")
            .with_headers("Content-Type: text/plain\r\nX-Id: 7")
            .with_body("t=21");
        assert_eq!(
            request.render().unwrap().as_str(),
            "POST /log HTTP/1.1\r\nHost: api.local\r\nContent-Type: text/plain\r\nX-Id: 7\r\n\
             Content-Length: 4\r\n\r\nt=21"
        );
    }

    #[test]
    fn oversized_request_is_rejected() {
        let body = "x".repeat(REQUEST_CAPACITY);
        let request = HttpRequest::new(Method::Put, "h", 80, "/").with_body(&body);
        assert_eq!(request.render().unwrap_err(), AtError::CommandTooLong);
    }
}
