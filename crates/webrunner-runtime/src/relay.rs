//! Classification of inbound envelopes.

use tokio::time::Instant;
use webrunner_core::{ConsoleLevel, ConsoleLine, CorrelatedEnvelope, Inbound, Platform, RunnerInfo, RunnerStatus};

use crate::host::{UpdateNotice, WEBVIEW_STORE_URL};
use crate::runner::WebRunner;

impl WebRunner {
    pub(crate) fn on_inbound(&mut self, raw: &str) {
        let inbound = match Inbound::decode(raw) {
            Ok(inbound) => inbound,
            Err(e) => {
                tracing::debug!(error = %e, "Dropping malformed envelope");
                return;
            }
        };

        match inbound {
            Inbound::StatusUpdate(status) => self.on_status(status),
            Inbound::HandshakeInfo(info) => self.on_handshake(&info),
            Inbound::ConsoleLog(line) => log_console(&line),
            Inbound::Correlated(envelope) => self.on_correlated(&envelope),
        }
    }

    fn on_status(&mut self, status: RunnerStatus) {
        self.state.status = status;
        self.publish_status(status);
        tracing::info!(status = %status, "Web runner status");

        if status.is_ready() {
            self.services
                .schedule(&self.config.services, &self.host.messaging, &self.sink);
            self.start_probing();
        } else {
            self.stop_probing();
        }
    }

    fn on_handshake(&mut self, info: &RunnerInfo) {
        tracing::info!(
            url = %info.url,
            version = ?info.version,
            user_agent = %info.user_agent,
            "Web runner info"
        );
        self.state.apply_info(info);

        if self.config.host.platform != Platform::Android {
            return;
        }
        let minimum = self.config.host.min_webview_major;
        if let Some(detected) = webview_major(&info.user_agent)
            && detected < minimum
        {
            tracing::warn!(detected, minimum, "System web view is outdated");
            self.host.prompter.prompt_update(&UpdateNotice {
                detected_major: detected,
                minimum_major: minimum,
                store_url: WEBVIEW_STORE_URL,
            });
        }
    }

    fn on_correlated(&mut self, envelope: &CorrelatedEnvelope) {
        if envelope.is_liveness_signal() {
            self.note_liveness();
        }

        if envelope.is_ping_reply() {
            tracing::debug!(
                last_response = ?self.prober.ticket().last_response,
                "Web runner ping"
            );
            return;
        }
        self.host.messaging.dispatch(envelope);
    }

    fn note_liveness(&mut self) {
        self.overdue.clear();
        self.prober.record_response(Instant::now());
        if self.reactor.is_foreground() {
            self.overdue
                .arm(self.config.lifecycle.response_overdue(), &self.sink);
        }
    }
}

fn log_console(line: &ConsoleLine) {
    let text = line.text();
    match line.level {
        ConsoleLevel::Error => tracing::error!(target: "webrunner::console", "{text}"),
        ConsoleLevel::Warn => tracing::warn!(target: "webrunner::console", "{text}"),
        ConsoleLevel::Debug => tracing::debug!(target: "webrunner::console", "{text}"),
        ConsoleLevel::Log | ConsoleLevel::Info => {
            tracing::info!(target: "webrunner::console", "{text}")
        }
    }
}

/// Chrome major version from a web view user agent.
///
/// `"... Chrome/96.0.4664.104 Mobile Safari/537.36"` gives `Some(96)`.
pub fn webview_major(user_agent: &str) -> Option<u32> {
    user_agent
        .split(' ')
        .find(|token| token.starts_with("Chrome"))?
        .split('/')
        .nth(1)?
        .split('.')
        .next()?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chrome_major() {
        let ua = "Mozilla/5.0 (Linux; Android 10; K; wv) AppleWebKit/537.36 (KHTML, like Gecko) \
                  Version/4.0 Chrome/73.0.3683.90 Mobile Safari/537.36";
        assert_eq!(webview_major(ua), Some(73));
    }

    #[test]
    fn no_chrome_token_yields_none() {
        let ua = "Mozilla/5.0 (iPhone; CPU iPhone OS 16_0 like Mac OS X) AppleWebKit/605.1.15";
        assert_eq!(webview_major(ua), None);
        assert_eq!(webview_major("Chrome"), None);
        assert_eq!(webview_major("Chrome/beta"), None);
    }
}
