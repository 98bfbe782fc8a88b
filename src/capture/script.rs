//! In-page script that serializes a [`PageSnapshot`](crate::snapshot::PageSnapshot).

use crate::locator::StateProbe;
use serde_json::Value;

/// Wraps each read in try/catch and tags it `{value}` or `{error}`.
const PRELUDE: &str = r#"(() => {
  const attempt = (read) => {
    try {
      const v = read();
      if (v === undefined || v === null) return { value: null };
      if (typeof v === 'object' && !Array.isArray(v)) return { value: String(v) };
      return { value: v };
    } catch (e) {
      return { error: String(e) };
    }
  };
  const entries = (store) => {
    const out = [];
    for (let i = 0; i < store.length; i++) {
      const key = store.key(i);
      out.push([key, String(store.getItem(key))]);
    }
    return out;
  };
  const evaluations = {};
"#;

const EPILOGUE: &str = r#"
  return JSON.stringify({
    url: String(location.href),
    local_storage: attempt(() => entries(window.localStorage)),
    session_storage: attempt(() => entries(window.sessionStorage)),
    cookie: attempt(() => String(document.cookie)),
    html: attempt(() => document.documentElement.outerHTML),
    scripts: attempt(() => Array.from(document.querySelectorAll('script')).map((s) => s.textContent || '')),
    evaluations,
  });
})()"#;

/// Build the capture script for a set of probes.
///
/// The script evaluates to a JSON string in the snapshot format.
pub fn capture_script(probes: &[Box<dyn StateProbe>]) -> String {
    let mut script = String::from(PRELUDE);
    for probe in probes {
        let key = Value::String(probe.expression().to_string());
        script.push_str(&format!(
            "  evaluations[{}] = attempt(() => ({}));\n",
            key,
            probe.expression()
        ));
    }
    script.push_str(EPILOGUE);
    script
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::default_probes;
    use crate::locator::probes::VuexStoreProbe;

    #[test]
    fn test_script_evaluates_every_probe() {
        let probes = default_probes();
        let script = capture_script(&probes);

        for probe in &probes {
            assert!(script.contains(&format!("attempt(() => ({}))", probe.expression())));
        }
        assert!(script.contains(r#"evaluations["window.$store.state.auth.token"]"#));
        assert!(script.contains(VuexStoreProbe::EXPRESSION));
    }

    #[test]
    fn test_global_probe_keys_are_escaped() {
        let script = capture_script(&default_probes());
        assert!(script.contains(r#"evaluations["window[\"accessToken\"]"] = attempt(() => (window["accessToken"]));"#));
    }

    #[test]
    fn test_script_is_an_expression() {
        let script = capture_script(&[]);
        assert!(script.starts_with("(() => {"));
        assert!(script.ends_with("})()"));
    }
}
