//! Scripts injected into the embedded page when it is mounted.

/// Delay before the page reports its handshake info, in milliseconds.
pub const INFO_REPORT_DELAY_MS: u64 = 300;

const INFO_REPORT: &str = r#"
setTimeout(() => {
  var info = {
    url: window.location.href,
    version: JSON.parse(localStorage.getItem('application') || '{}').version,
    userAgent: navigator.userAgent
  };
  window.ReactNativeWebView.postMessage(JSON.stringify({id: '-1', response: info}));
}, __DELAY__);
"#;

const CONSOLE_SHIM: &str = r#"
const consoleLog = (type, args) => window.ReactNativeWebView.postMessage(JSON.stringify({id: '-2', response: [type, ...args]}));
console = {
  log: (...args) => consoleLog('log', [...args]),
  debug: (...args) => consoleLog('debug', [...args]),
  info: (...args) => consoleLog('info', [...args]),
  warn: (...args) => consoleLog('warn', [...args]),
  error: (...args) => consoleLog('error', [...args]),
};
"#;

/// Build the script run by the view after every page load.
///
/// The page always reports `{url, version, userAgent}` under id `-1`. With
/// `show_console` it also forwards its console under id `-2`.
pub fn bootstrap_script(show_console: bool) -> String {
    let mut script = INFO_REPORT.replace("__DELAY__", &INFO_REPORT_DELAY_MS.to_string());
    if show_console {
        script.push_str(CONSOLE_SHIM);
    }
    script
}
