use super::clock::Clock;
use super::engine::{command, CommandEngine};
use super::error::{AtError, AtResult};
use super::http::HttpRequest;
use super::matcher::{MarkerKind, CLOSED_MARKERS, COMMAND_MARKERS};
use super::state::ClientId;
use super::transport::Transport;
use heapless::Vec;

impl<T: Transport, C: Clock, const N: usize> CommandEngine<'_, T, C, N> {
    /// Open a TCP connection, send `request`, close the connection.
    pub async fn send_http(&mut self, request: &HttpRequest<'_>) -> AtResult<()> {
        let payload = request.render()?;
        let link = self.outbound_link()?;

        self.open_link(link, request).await?;
        let sent = self.transmit(link, payload.as_bytes()).await;
        let closed = self.close_link(link).await;
        sent.and(closed)
    }

    /// Like [`send_http`](Self::send_http) but waits for the remote to close
    /// the connection and returns the reply bytes still in the window.
    ///
    /// Only the newest `N` bytes of the reply survive, `+IPD` headers
    /// included.
    pub async fn fetch(&mut self, request: &HttpRequest<'_>) -> AtResult<Vec<u8, N>> {
        let payload = request.render()?;
        let link = self.outbound_link()?;

        self.open_link(link, request).await?;
        if let Err(e) = self.transmit(link, payload.as_bytes()).await {
            let _ = self.close_link(link).await;
            return Err(e);
        }

        let deadline = self.clock.now() + self.config.response_timeout;
        match self.poll_until(deadline, CLOSED_MARKERS).await {
            Ok(found) if found.kind == MarkerKind::Success => {
                let mut reply = Vec::new();
                let _ = reply.extend_from_slice(&self.buffer.as_bytes()[..found.offset]);
                self.buffer.consume(found.end);
                info!("Client: {} reply bytes from {}", reply.len(), request.host);
                Ok(reply)
            }
            Ok(_) => {
                let _ = self.close_link(link).await;
                Err(AtError::ModemFailure)
            }
            Err(e) => {
                warn!("Client: no close from {}", request.host);
                let _ = self.close_link(link).await;
                Err(e)
            }
        }
    }

    /// Link id for outbound connections: required once the modem is
    /// multiplexed for the server, absent otherwise.
    fn outbound_link(&self) -> AtResult<Option<ClientId>> {
        if !self.state.multiplexed {
            return Ok(None);
        }
        ClientId::new(self.config.outbound_link)
            .map(Some)
            .ok_or(AtError::InvalidMode)
    }

    async fn open_link(&mut self, link: Option<ClientId>, request: &HttpRequest<'_>) -> AtResult<()> {
        let cipstart = match link {
            Some(id) => command(format_args!(
                "AT+CIPSTART={},\"TCP\",\"{}\",{}",
                id, request.host, request.port
            ))?,
            None => command(format_args!(
                "AT+CIPSTART=\"TCP\",\"{}\",{}",
                request.host, request.port
            ))?,
        };
        info!("Client: {} {}:{}", request.method.as_str(), request.host, request.port);
        self.send_expecting(cipstart.as_bytes(), self.config.connect_timeout, COMMAND_MARKERS)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::esp01::{AtError, CancelToken, CommandEngine, EngineConfig, HttpRequest, Method};
    use crate::mock::{ManualClock, ScriptedModem};
    use embassy_futures::block_on;

    fn modem() -> ScriptedModem {
        ScriptedModem::new()
            .reply("AT+CIPSTART=", "CONNECT\r\n\r\nOK\r\n")
            .reply("AT+CIPSEND=", "\r\nOK\r\n> ")
            .reply("GET ", "\r\nSEND OK\r\n")
            .reply("POST ", "\r\nSEND OK\r\n")
            .reply("AT+CIPCLOSE", "CLOSED\r\n\r\nOK\r\n")
    }

    #[test]
    fn single_link_request_sequence() {
        let cancel = CancelToken::new();
        let mut engine: CommandEngine<'_, _, _> =
            CommandEngine::new(modem(), ManualClock::new(), EngineConfig::default(), &cancel);
        let request = HttpRequest::new(Method::Get, "www.example.com", 80, "/s?wd=esp");

        block_on(engine.send_http(&request)).unwrap();

        let payload = "GET /s?wd=esp HTTP/1.1\r\nHost: www.example.com\r\n\r\n";
        let lines = engine.transport().line_strs();
        assert_eq!(lines[0], "AT+CIPSTART=\"TCP\",\"www.example.com\",80");
        assert_eq!(lines[1], format!("AT+CIPSEND={}", payload.len() + 2));
        assert_eq!(lines[2], payload);
        assert_eq!(lines[3], "AT+CIPCLOSE");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn multiplexed_modem_uses_the_outbound_link() {
        let cancel = CancelToken::new();
        let mut engine: CommandEngine<'_, _, _> =
            CommandEngine::new(modem(), ManualClock::new(), EngineConfig::default(), &cancel);
        engine.state_mut().multiplexed = true;
        let request = HttpRequest::new(Method::Post, "10.0.0.2", 8080, "/log").with_body("t=21");

        block_on(engine.send_http(&request)).unwrap();

        let lines = engine.transport().line_strs();
        assert_eq!(lines[0], "AT+CIPSTART=4,\"TCP\",\"10.0.0.2\",8080");
        assert!(lines[1].starts_with("AT+CIPSEND=4,"));
        assert_eq!(lines[3], "AT+CIPCLOSE=4");
    }

    #[test]
    fn failed_connect_sends_nothing_else() {
        let cancel = CancelToken::new();
        let modem = ScriptedModem::new().reply("AT+CIPSTART=", "DNS Fail\r\n\r\nERROR\r\n");
        let mut engine: CommandEngine<'_, _, _> =
            CommandEngine::new(modem, ManualClock::new(), EngineConfig::default(), &cancel);
        let request = HttpRequest::new(Method::Get, "nowhere.invalid", 80, "/");

        assert_eq!(block_on(engine.send_http(&request)), Err(AtError::ModemFailure));
        assert_eq!(engine.transport().lines().len(), 1);
    }

    #[test]
    fn fetch_returns_the_reply_window() {
        let cancel = CancelToken::new();
        let modem = ScriptedModem::new()
            .reply("AT+CIPSTART=", "CONNECT\r\n\r\nOK\r\n")
            .reply("AT+CIPSEND=", "\r\nOK\r\n> ")
            .reply(
                "GET ",
                "\r\nSEND OK\r\n\r\n+IPD,17:HTTP/1.1 200 OK\r\nCLOSED\r\n",
            );
        let mut engine: CommandEngine<'_, _, _> =
            CommandEngine::new(modem, ManualClock::new(), EngineConfig::default(), &cancel);
        let request = HttpRequest::new(Method::Get, "api.local", 80, "/state");

        let reply = block_on(engine.fetch(&request)).unwrap();
        assert_eq!(reply.as_slice(), b"\r\n\r\n+IPD,17:HTTP/1.1 200 OK\r\n");
        // the remote closed; no CIPCLOSE needed
        assert_eq!(engine.transport().lines().len(), 3);
    }

    #[test]
    fn fetch_times_out_and_closes() {
        let cancel = CancelToken::new();
        let mut engine: CommandEngine<'_, _, _> =
            CommandEngine::new(modem(), ManualClock::new(), EngineConfig::default(), &cancel);
        let request = HttpRequest::new(Method::Get, "api.local", 80, "/slow");

        assert_eq!(block_on(engine.fetch(&request)), Err(AtError::Timeout));
        assert_eq!(engine.transport().line_strs().last(), Some(&"AT+CIPCLOSE"));
    }
}
