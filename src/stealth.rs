//! Identity spoofing for the browser fetch phase.
//!
//! Injected via `Page.addScriptToEvaluateOnNewDocument` so the patches are
//! in place before any page script runs, rather than applied reactively
//! after navigation.

use crate::config::ScrapeConfig;
use anyhow::{Context, Result};
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;

const WEBDRIVER_JS: &str = r"
    Object.defineProperty(navigator, 'webdriver', { get: () => false });
";

const LANGUAGES_JS: &str = r"
    Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en'] });
";

const PLUGINS_JS: &str = r"
    const mockPlugins = [
        { name: 'Chrome PDF Plugin', description: 'Portable Document Format', filename: 'internal-pdf-viewer', mimeTypes: [{ type: 'application/pdf', description: 'Portable Document Format' }] },
        { name: 'Chrome PDF Viewer', description: '', filename: 'mhjfbmdgcfjbbpaeojofohoefgiehjai', mimeTypes: [{ type: 'application/pdf', description: 'Portable Document Format' }] },
        { name: 'Native Client', description: '', filename: 'internal-nacl-plugin', mimeTypes: [] },
    ];
    const pluginsProto = Object.getPrototypeOf(navigator.plugins);
    Object.defineProperty(navigator, 'plugins', {
        get: () => {
            const plugins = {};
            mockPlugins.forEach((plugin, i) => {
                plugins[i] = plugin;
                plugins[plugin.name] = plugin;
            });
            Object.setPrototypeOf(plugins, pluginsProto);
            Object.defineProperty(plugins, 'length', { value: mockPlugins.length });
            return plugins;
        }
    });
";

const CHROME_RUNTIME_JS: &str = r"
    if (!window.chrome) { window.chrome = {}; }
    if (!window.chrome.runtime) {
        window.chrome.runtime = {
            connect: () => ({
                onMessage: { addListener: () => {}, removeListener: () => {} },
                postMessage: () => {}
            })
        };
    }
";

const WEBGL_VENDOR_JS: &str = r"
    const getParameterProxyHandler = {
        apply: function(target, ctx, args) {
            const param = (args && args[0]) || null;
            if (param === 37445) { return 'Intel Inc.'; }
            if (param === 37446) { return 'Intel Iris OpenGL Engine'; }
            return Reflect.apply(target, ctx, args);
        }
    };
    if (window.WebGLRenderingContext) {
        const getParameter = WebGLRenderingContext.prototype.getParameter;
        WebGLRenderingContext.prototype.getParameter = new Proxy(getParameter, getParameterProxyHandler);
    }
";

fn sec_ch_ua_js(chrome_major: &str) -> String {
    format!(
        r#"
        Object.defineProperty(navigator, 'userAgentData', {{
            get: () => ({{
                brands: [
                    {{ brand: 'Not(A:Brand', version: '24' }},
                    {{ brand: 'Chromium', version: '{chrome_major}' }},
                    {{ brand: 'Google Chrome', version: '{chrome_major}' }},
                ],
                mobile: false,
                platform: 'Windows',
                getHighEntropyValues: () => Promise.resolve({{
                    architecture: 'x86',
                    bitness: '64',
                    platform: 'Windows',
                    platformVersion: '10.0.0',
                }}),
            }}),
        }});
        "#
    )
}

const TIMEZONE_JS: &str = r"
    const originalResolvedOptions = Intl.DateTimeFormat.prototype.resolvedOptions;
    Intl.DateTimeFormat.prototype.resolvedOptions = function(...args) {
        const options = originalResolvedOptions.apply(this, args);
        options.timeZone = 'America/New_York';
        return options;
    };
";

/// Derive the Chrome major version number from a full UA string, falling
/// back to `132` (this crate's default UA's major) if parsing fails.
fn chrome_major_version(user_agent: &str) -> String {
    user_agent
        .split("Chrome/")
        .nth(1)
        .and_then(|rest| rest.split('.').next())
        .unwrap_or("132")
        .to_string()
}

/// Inject all identity-spoofing scripts into `page` before navigation.
/// Every script is best-effort: a single failure is logged and does not
/// abort the others, since partial stealth is still better than none.
pub async fn apply(page: &Page, config: &ScrapeConfig) -> Result<()> {
    let chrome_major = chrome_major_version(&config.user_agent);
    let scripts = [
        WEBDRIVER_JS.to_string(),
        LANGUAGES_JS.to_string(),
        PLUGINS_JS.to_string(),
        CHROME_RUNTIME_JS.to_string(),
        WEBGL_VENDOR_JS.to_string(),
        sec_ch_ua_js(&chrome_major),
        TIMEZONE_JS.to_string(),
    ];

    for source in scripts {
        if let Err(err) = page
            .execute(AddScriptToEvaluateOnNewDocumentParams {
                source,
                include_command_line_api: None,
                world_name: None,
                run_immediately: None,
            })
            .await
        {
            tracing::warn!(%err, "stealth script injection failed, continuing with remaining scripts");
        }
    }

    page.execute(SetUserAgentOverrideParams {
        user_agent: config.user_agent.clone(),
        accept_language: Some("en-US,en;q=0.9".to_string()),
        platform: Some("Win32".to_string()),
        user_agent_metadata: None,
    })
    .await
    .context("failed to override user agent")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_chrome_major_version() {
        assert_eq!(
            chrome_major_version("Mozilla/5.0 Chrome/132.0.0.0 Safari/537.36"),
            "132"
        );
    }

    #[test]
    fn falls_back_when_chrome_token_missing() {
        assert_eq!(chrome_major_version("Mozilla/5.0 Safari/537.36"), "132");
    }
}
