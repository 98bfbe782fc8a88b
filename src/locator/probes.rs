//! Global-scope and framework-state probes.
//!
//! Each probe names one script expression. The capture script evaluates
//! every probe expression inside its own try/catch, so a missing global or
//! an absent framework method shows up as [`ProbeOutcome::Errored`] for that
//! probe only.

use crate::snapshot::PageContext;
use crate::types::SourceLocation;
use serde_json::Value;

/// Result of running one probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The expression resolved to a string.
    Found(String),
    /// The expression resolved to nothing, or to a non-string value.
    Absent,
    /// Evaluating the expression threw. Ignored by the locator.
    Errored(String),
}

/// A single place on the global scope where a token may live.
pub trait StateProbe: Send + Sync {
    /// Script expression evaluated in the page.
    fn expression(&self) -> &str;

    /// Location reported when this probe yields the candidate.
    fn location(&self) -> SourceLocation;

    /// Resolve the probe against a page.
    fn probe(&self, page: &dyn PageContext) -> ProbeOutcome {
        match page.evaluate(self.expression()) {
            Ok(Some(Value::String(s))) => ProbeOutcome::Found(s),
            Ok(_) => ProbeOutcome::Absent,
            Err(e) => ProbeOutcome::Errored(e.to_string()),
        }
    }
}

/// Global variable names conventionally used for bearer tokens, in probe order.
pub const GLOBAL_TOKEN_NAMES: &[&str] = &["accessToken", "token", "bearerToken"];

/// A named property on `window`.
#[derive(Debug, Clone)]
pub struct GlobalVariableProbe {
    name: String,
    expression: String,
}

impl GlobalVariableProbe {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            expression: format!("window[{}]", Value::String(name.to_string())),
        }
    }
}

impl StateProbe for GlobalVariableProbe {
    fn expression(&self) -> &str {
        &self.expression
    }

    fn location(&self) -> SourceLocation {
        SourceLocation::Global {
            name: self.name.clone(),
        }
    }
}

/// `accessToken` on an AngularJS application's root scope.
#[derive(Debug, Clone, Default)]
pub struct AngularRootScopeProbe;

impl AngularRootScopeProbe {
    pub const EXPRESSION: &'static str =
        "window.angular.element(document.body).scope().$root.accessToken";
}

impl StateProbe for AngularRootScopeProbe {
    fn expression(&self) -> &str {
        Self::EXPRESSION
    }

    fn location(&self) -> SourceLocation {
        SourceLocation::Framework {
            path: "angular.$rootScope.accessToken".to_string(),
        }
    }
}

/// `state.auth.token` on a globally exposed Vuex store.
#[derive(Debug, Clone, Default)]
pub struct VuexStoreProbe;

impl VuexStoreProbe {
    pub const EXPRESSION: &'static str = "window.$store.state.auth.token";
}

impl StateProbe for VuexStoreProbe {
    fn expression(&self) -> &str {
        Self::EXPRESSION
    }

    fn location(&self) -> SourceLocation {
        SourceLocation::Framework {
            path: "$store.state.auth.token".to_string(),
        }
    }
}

/// Global-variable probes followed by framework probes.
pub fn default_probes() -> Vec<Box<dyn StateProbe>> {
    let mut probes: Vec<Box<dyn StateProbe>> = GLOBAL_TOKEN_NAMES
        .iter()
        .map(|name| Box::new(GlobalVariableProbe::new(name)) as Box<dyn StateProbe>)
        .collect();
    probes.push(Box::new(AngularRootScopeProbe));
    probes.push(Box::new(VuexStoreProbe));
    probes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{Captured, PageSnapshot};
    use serde_json::json;

    #[test]
    fn test_global_expression_is_quoted() {
        let probe = GlobalVariableProbe::new("accessToken");
        assert_eq!(probe.expression(), r#"window["accessToken"]"#);
    }

    #[test]
    fn test_probe_outcomes() {
        let page = PageSnapshot::new("about:blank")
            .with_evaluation(r#"window["token"]"#, Captured::Value(json!("abc")))
            .with_evaluation(r#"window["bearerToken"]"#, Captured::Value(json!(42)))
            .with_evaluation(
                VuexStoreProbe::EXPRESSION,
                Captured::Error("TypeError: Cannot read properties of undefined".to_string()),
            );

        assert_eq!(
            GlobalVariableProbe::new("token").probe(&page),
            ProbeOutcome::Found("abc".to_string())
        );
        assert_eq!(
            GlobalVariableProbe::new("bearerToken").probe(&page),
            ProbeOutcome::Absent
        );
        assert_eq!(
            GlobalVariableProbe::new("accessToken").probe(&page),
            ProbeOutcome::Absent
        );
        assert!(matches!(VuexStoreProbe.probe(&page), ProbeOutcome::Errored(_)));
    }

    #[test]
    fn test_default_probe_order() {
        let locations: Vec<SourceLocation> =
            default_probes().iter().map(|p| p.location()).collect();
        assert_eq!(
            locations,
            vec![
                SourceLocation::Global { name: "accessToken".to_string() },
                SourceLocation::Global { name: "token".to_string() },
                SourceLocation::Global { name: "bearerToken".to_string() },
                SourceLocation::Framework { path: "angular.$rootScope.accessToken".to_string() },
                SourceLocation::Framework { path: "$store.state.auth.token".to_string() },
            ]
        );
    }
}
