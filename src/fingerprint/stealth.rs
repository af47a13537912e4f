//! Init script neutralizing the most common automation-detection probes.
//!
//! Only first-order markers are covered: `navigator.webdriver`, empty plugin
//! and language lists, the missing `window.chrome` object and leftover driver
//! globals. Behavioral detection is out of reach by construction.

/// Builds the script injected before navigation.
///
/// `languages` and `platform` must agree with the headers sent by the same
/// profile, otherwise the override itself becomes a detection signal.
pub fn build_init_script(languages: &[String], platform: &str) -> String {
    let languages_json =
        serde_json::to_string(languages).unwrap_or_else(|_| "[\"en-US\",\"en\"]".to_string());
    let platform_json = serde_json::to_string(platform).unwrap_or_else(|_| "\"Win32\"".to_string());

    format!(
        r#"(() => {{
Object.defineProperty(navigator, 'webdriver', {{ get: () => undefined, configurable: true }});
Object.defineProperty(navigator, 'languages', {{ get: () => {languages_json}, configurable: true }});
Object.defineProperty(navigator, 'platform', {{ get: () => {platform_json}, configurable: true }});
Object.defineProperty(navigator, 'plugins', {{
  get: () => [
    {{ name: 'PDF Viewer', filename: 'internal-pdf-viewer' }},
    {{ name: 'Chrome PDF Viewer', filename: 'internal-pdf-viewer' }},
    {{ name: 'Chromium PDF Viewer', filename: 'internal-pdf-viewer' }}
  ],
  configurable: true
}});
if (!window.chrome) {{
  window.chrome = {{ runtime: {{}}, loadTimes: function () {{}}, csi: function () {{}} }};
}}
const originalQuery = window.navigator.permissions && window.navigator.permissions.query;
if (originalQuery) {{
  window.navigator.permissions.query = (parameters) =>
    parameters && parameters.name === 'notifications'
      ? Promise.resolve({{ state: Notification.permission }})
      : originalQuery(parameters);
}}
delete window.__webdriver_script_fn;
delete document.__webdriver_evaluate;
delete document.__selenium_unwrapped;
delete document.__driver_evaluate;
}})();"#
    )
}
