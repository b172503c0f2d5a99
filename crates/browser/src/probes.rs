//! Embedded driver script and in-page probe snippets
//!
//! The probes run inside the monitored page via `page.evaluate`. Their
//! selectors target the Tag Assistant debug panel and may need adjustment
//! when the panel markup changes; they are data here, not design.

/// Node driver: reads one JSON command per stdin line, writes one JSON
/// response per stdout line. Announces readiness before accepting commands.
pub const DRIVER_JS: &str = r#"
const { chromium } = require('playwright');
const readline = require('readline');

(async () => {
  const headless = process.env.TAGWATCH_HEADLESS !== '0';
  const [width, height] = (process.env.TAGWATCH_VIEWPORT || '1280x720')
    .split('x')
    .map(Number);

  const browser = await chromium.launch({ headless });
  const context = await browser.newContext({ viewport: { width, height } });
  let page = await context.newPage();

  // Tag Assistant opens the debug target in a new tab; follow it.
  context.on('page', (p) => { page = p; });

  const reply = (obj) => process.stdout.write(JSON.stringify(obj) + '\n');
  const rl = readline.createInterface({ input: process.stdin });

  reply({ ok: true, event: 'ready' });

  for await (const line of rl) {
    if (!line.trim()) continue;

    let msg;
    try {
      msg = JSON.parse(line);
    } catch (e) {
      reply({ ok: false, error: 'bad command line: ' + e.message });
      continue;
    }

    try {
      switch (msg.cmd) {
        case 'goto':
          await page.goto(msg.url, { waitUntil: 'networkidle' });
          reply({ ok: true });
          break;
        case 'click':
          await page.waitForSelector(msg.selector, { timeout: msg.timeout_ms });
          await page.click(msg.selector);
          reply({ ok: true });
          break;
        case 'fill':
          await page.waitForSelector(msg.selector, { timeout: msg.timeout_ms });
          await page.fill(msg.selector, msg.value);
          reply({ ok: true });
          break;
        case 'scroll':
          await page.evaluate((target) => {
            if (target === 'bottom') {
              window.scrollTo(0, document.body.scrollHeight);
            } else if (target === 'top') {
              window.scrollTo(0, 0);
            } else {
              window.scrollTo(0, target);
            }
          }, msg.target);
          reply({ ok: true });
          break;
        case 'wait':
          if (msg.selector) {
            await page.waitForSelector(msg.selector, { timeout: msg.ms || 5000 });
          } else {
            await page.waitForTimeout(msg.ms || 1000);
          }
          reply({ ok: true });
          break;
        case 'evaluate': {
          const result = await page.evaluate(msg.script);
          reply({ ok: true, result });
          break;
        }
        case 'screenshot':
          await page.screenshot({ path: msg.path, fullPage: false });
          reply({ ok: true });
          break;
        case 'close':
          reply({ ok: true });
          await browser.close();
          process.exit(0);
        default:
          reply({ ok: false, error: 'unknown command: ' + msg.cmd });
      }
    } catch (e) {
      reply({ ok: false, error: e.message });
    }
  }
})();
"#;

/// Tag firing status from the Tag Assistant debug panel.
pub const TAG_PROBE: &str = r#"
() => {
  const result = { fired: [], notFired: [] };

  const box = (el) => {
    const r = el.getBoundingClientRect();
    return { x: r.x, y: r.y, width: r.width, height: r.height };
  };

  document.querySelectorAll('[data-tag-status="fired"]').forEach((el) => {
    result.fired.push({
      name: el.querySelector('.tag-name')?.textContent?.trim(),
      type: el.querySelector('.tag-type')?.textContent?.trim(),
      trigger: el.querySelector('.trigger-name')?.textContent?.trim(),
      boundingBox: box(el)
    });
  });

  document.querySelectorAll('[data-tag-status="not-fired"]').forEach((el) => {
    result.notFired.push({
      name: el.querySelector('.tag-name')?.textContent?.trim(),
      reason: el.querySelector('.blocking-reason')?.textContent?.trim(),
      boundingBox: box(el)
    });
  });

  return result;
}
"#;

/// Resolved variable values from the panel's variables tab.
pub const VARIABLE_PROBE: &str = r#"
() => {
  const variables = {};

  document.querySelectorAll('.variable-item').forEach((el) => {
    const name = el.querySelector('.variable-name')?.textContent?.trim();
    const value = el.querySelector('.variable-value')?.textContent?.trim();
    if (name) {
      const r = el.getBoundingClientRect();
      variables[name] = {
        value: value,
        boundingBox: { x: r.x, y: r.y, width: r.width, height: r.height }
      };
    }
  });

  return variables;
}
"#;

/// Consent state, resolved from dataLayer consent commands and, when
/// available, the in-page consent registry. Always reports the full known
/// signal set, defaulting to unknown.
pub const CONSENT_PROBE: &str = r#"
() => {
  const consent = {
    analytics_storage: 'unknown',
    ad_storage: 'unknown',
    ad_user_data: 'unknown',
    ad_personalization: 'unknown',
    functionality_storage: 'unknown',
    personalization_storage: 'unknown',
    security_storage: 'unknown'
  };

  if (window.dataLayer) {
    window.dataLayer.forEach((item) => {
      if (Array.isArray(item) && item[0] === 'consent' && item[1] === 'update') {
        Object.assign(consent, item[2]);
      }
    });
  }

  if (window.google_tag_data?.ics?.entries) {
    const entries = window.google_tag_data.ics.entries;
    Object.keys(consent).forEach((key) => {
      if (entries[key]) {
        consent[key] = entries[key].granted ? 'granted' : 'denied';
      }
    });
  }

  return consent;
}
"#;

/// Full dataLayer snapshot with stable indices.
pub const DATALAYER_PROBE: &str = r#"
() => {
  if (!window.dataLayer) return [];

  return window.dataLayer.map((item, index) => ({
    index: index,
    event: item.event || null,
    data: JSON.parse(JSON.stringify(item)),
    timestamp: new Date().toISOString()
  }));
}
"#;

/// Tag Assistant preview URL for a container and debug target.
pub fn preview_url(container_id: &str, target_url: &str) -> String {
    format!(
        "https://tagassistant.google.com/#/?id={}&url={}",
        container_id,
        urlencoding::encode(target_url)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_url_encodes_the_target() {
        let url = preview_url("GTM-ABC1234", "https://shop.example.com/a b?x=1&y=2");
        assert!(url.starts_with("https://tagassistant.google.com/#/?id=GTM-ABC1234&url="));
        assert!(url.contains("https%3A%2F%2Fshop.example.com%2Fa%20b%3Fx%3D1%26y%3D2"));
    }

    #[test]
    fn driver_script_handles_every_protocol_command() {
        for cmd in ["goto", "click", "fill", "scroll", "wait", "evaluate", "screenshot", "close"]
        {
            assert!(DRIVER_JS.contains(&format!("case '{cmd}'")), "missing {cmd}");
        }
    }

    #[test]
    fn probes_project_bounding_boxes() {
        assert!(TAG_PROBE.contains("data-tag-status"));
        assert!(TAG_PROBE.contains("boundingBox"));
        assert!(VARIABLE_PROBE.contains(".variable-item"));
        assert!(CONSENT_PROBE.contains("analytics_storage"));
        assert!(DATALAYER_PROBE.contains("window.dataLayer"));
    }
}
