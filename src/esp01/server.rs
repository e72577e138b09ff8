use super::clock::Clock;
use super::engine::{command, CommandEngine, CRLF};
use super::error::{AtError, AtResult};
use super::matcher::{COMMAND_MARKERS, PAYLOAD_MARKERS, PROMPT_MARKERS, REQUEST_MARKERS};
use super::request::{parse_request, ParsedRequest};
use super::state::ClientId;
use super::transport::Transport;

/// Largest length `AT+CIPSEND` accepts in one go.
pub const MAX_SEND_LENGTH: usize = 2048;

impl<T: Transport, C: Clock, const N: usize> CommandEngine<'_, T, C, N> {
    /// Wait up to `request_wait` for an inbound HTTP request.
    ///
    /// `Ok(None)` is an ordinary poll miss: nothing arrived in time. A request
    /// that matched but could not be parsed is consumed and reported as
    /// [`AtError::MalformedRequest`], which callers treat the same way.
    pub async fn await_request(&mut self) -> AtResult<Option<ParsedRequest>> {
        let deadline = self.clock.now() + self.config.request_wait;
        let found = match self.poll_until(deadline, REQUEST_MARKERS).await {
            Ok(found) => found,
            Err(AtError::Timeout) => {
                trace!("Server: no request");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let parsed = parse_request(&self.buffer.as_bytes()[found.offset..found.end]);
        // Never match the same request line twice
        self.buffer.consume(found.end);

        match parsed {
            Ok(request) => {
                info!(
                    "Server: {} {} from client {}",
                    request.method.as_str(),
                    request.path.as_str(),
                    request.client.slot()
                );
                self.state.client = Some(request.client);
                Ok(Some(request))
            }
            Err(e) => {
                warn!("Server: dropped malformed request");
                Err(e)
            }
        }
    }

    /// Send `body` to the client of the last request, then close its link.
    pub async fn respond(&mut self, body: &[u8]) -> AtResult<()> {
        let client = self.state.client.take().ok_or(AtError::NoClient)?;
        let sent = self.transmit(Some(client), body).await;
        let closed = self.close_link(Some(client)).await;
        sent.and(closed)
    }

    /// `AT+CIPSEND`, wait for the prompt, then the payload line.
    pub(crate) async fn transmit(&mut self, link: Option<ClientId>, payload: &[u8]) -> AtResult<()> {
        // The modem counts the CRLF written after the payload
        let length = payload.len() + CRLF.len();
        if length > MAX_SEND_LENGTH {
            warn!("Server: {} bytes exceed one CIPSEND", length);
            return Err(AtError::CommandTooLong);
        }
        let cipsend = match link {
            Some(id) => command(format_args!("AT+CIPSEND={},{}", id, length))?,
            None => command(format_args!("AT+CIPSEND={}", length))?,
        };
        self.send_expecting(cipsend.as_bytes(), self.config.send_timeout, PROMPT_MARKERS)
            .await?;
        self.send_expecting(payload, self.config.payload_timeout, PAYLOAD_MARKERS)
            .await?;
        debug!("Server: sent {} bytes", length);
        Ok(())
    }

    pub(crate) async fn close_link(&mut self, link: Option<ClientId>) -> AtResult<()> {
        let cipclose = match link {
            Some(id) => command(format_args!("AT+CIPCLOSE={}", id))?,
            None => command(format_args!("AT+CIPCLOSE"))?,
        };
        self.send_expecting(cipclose.as_bytes(), self.config.close_timeout, COMMAND_MARKERS)
            .await?;
        Ok(())
    }
}
