//! Page driver abstraction
//!
//! The UI flows (`billing`, `calendar`, `auth`) only need a handful of page
//! operations. [`PageDriver`] names them so a browser automation backend can
//! be plugged in, and [`MockDriver`] scripts them for unit tests.
//!
//! One flow owns the page for its whole duration, so every method takes
//! `&mut self`.

use crate::result::{SalonError, SalonResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::Duration;

// =============================================================================
// SELECTOR
// =============================================================================

/// Element selector, rendered in Playwright's selector syntax
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// CSS selector (e.g. `button.primary`)
    Css(String),
    /// XPath expression
    XPath(String),
    /// `data-testid` attribute
    TestId(String),
    /// ARIA role with accessible name
    Role {
        /// Role (`button`, `link`...)
        role: String,
        /// Accessible name
        name: String,
    },
    /// The `index`-th match of `base`
    Nth {
        /// Base selector
        base: Box<Selector>,
        /// 0-based index
        index: usize,
    },
    /// `child` searched inside `parent`
    Within {
        /// Outer element
        parent: Box<Selector>,
        /// Inner element
        child: Box<Selector>,
    },
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create an XPath selector
    #[must_use]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    /// Create a test id selector
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    /// Create a role selector
    #[must_use]
    pub fn role(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Role {
            role: role.into(),
            name: name.into(),
        }
    }

    /// Button with accessible name
    #[must_use]
    pub fn button(name: impl Into<String>) -> Self {
        Self::role("button", name)
    }

    /// Link with accessible name
    #[must_use]
    pub fn link(name: impl Into<String>) -> Self {
        Self::role("link", name)
    }

    /// The `index`-th match of this selector
    #[must_use]
    pub fn nth(self, index: usize) -> Self {
        Self::Nth {
            base: Box::new(self),
            index,
        }
    }

    /// First match of this selector
    #[must_use]
    pub fn first(self) -> Self {
        self.nth(0)
    }

    /// `child` inside this selector
    #[must_use]
    pub fn within(self, child: Self) -> Self {
        Self::Within {
            parent: Box::new(self),
            child: Box::new(child),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(s) => write!(f, "css={s}"),
            Self::XPath(s) => write!(f, "xpath={s}"),
            Self::TestId(id) => write!(f, "internal:testid=[data-testid=\"{id}\"s]"),
            Self::Role { role, name } => write!(f, "internal:role={role}[name=\"{name}\"i]"),
            Self::Nth { base, index } => write!(f, "{base} >> nth={index}"),
            Self::Within { parent, child } => write!(f, "{parent} >> {child}"),
        }
    }
}

/// Quote `text` as an XPath string literal.
///
/// XPath 1.0 has no escape sequences, so text holding both quote kinds is
/// spliced together with `concat()`.
#[must_use]
pub fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        return format!("'{text}'");
    }
    if !text.contains('"') {
        return format!("\"{text}\"");
    }
    let parts: Vec<String> = text.split('\'').map(|part| format!("'{part}'")).collect();
    format!("concat({})", parts.join(", \"'\", "))
}

// =============================================================================
// DRIVER TRAIT
// =============================================================================

/// Page operations used by the UI flows
///
/// # Implementations
///
/// - a browser backend, supplied by the suite
/// - [`MockDriver`] for unit tests
#[async_trait]
pub trait PageDriver: Send {
    /// Navigate to URL
    async fn navigate(&mut self, url: &str) -> SalonResult<()>;

    /// Wait up to `timeout` for the element to be visible.
    ///
    /// Returns `Ok(false)` when it did not become visible in time; only
    /// driver failures are errors.
    async fn is_visible(&mut self, selector: &Selector, timeout: Duration) -> SalonResult<bool>;

    /// Number of elements currently matching
    async fn count(&mut self, selector: &Selector) -> SalonResult<usize>;

    /// Click element
    async fn click(&mut self, selector: &Selector) -> SalonResult<()>;

    /// Rendered text of element
    async fn inner_text(&mut self, selector: &Selector) -> SalonResult<String>;

    /// Reload page
    async fn reload(&mut self) -> SalonResult<()>;

    /// Evaluate JavaScript in page context
    async fn evaluate(&mut self, script: &str) -> SalonResult<Value>;
}

// =============================================================================
// MOCK DRIVER
// =============================================================================

/// Mock driver for unit testing
///
/// Visibility is scripted per selector as a queue: each `is_visible` call
/// pops the next answer, and the last answer repeats. Unscripted selectors
/// are invisible.
#[derive(Debug, Default)]
pub struct MockDriver {
    /// Current URL
    pub current_url: String,
    /// Scripted visibility answers, keyed by rendered selector
    pub visibility: HashMap<String, VecDeque<bool>>,
    /// Element counts, keyed by rendered selector
    pub counts: HashMap<String, usize>,
    /// Element texts, keyed by rendered selector
    pub texts: HashMap<String, String>,
    /// JS evaluation results, returned in order (last one repeats)
    pub js_results: VecDeque<Value>,
    /// Calls that fail, matched by prefix against the history entry
    pub failures: Vec<String>,
    /// Call history for verification
    pub call_history: Vec<String>,
}

impl MockDriver {
    /// Create new mock driver
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script successive visibility answers for `selector`
    pub fn script_visibility(&mut self, selector: &Selector, answers: impl IntoIterator<Item = bool>) {
        self.visibility
            .entry(selector.to_string())
            .or_default()
            .extend(answers);
    }

    /// Make `selector` permanently visible
    pub fn show(&mut self, selector: &Selector) {
        self.visibility
            .insert(selector.to_string(), VecDeque::from([true]));
    }

    /// Set the element count for `selector`
    pub fn set_count(&mut self, selector: &Selector, count: usize) {
        self.counts.insert(selector.to_string(), count);
    }

    /// Set the text of `selector`
    pub fn set_text(&mut self, selector: &Selector, text: impl Into<String>) {
        self.texts.insert(selector.to_string(), text.into());
    }

    /// Set mock JS result
    pub fn set_js_result(&mut self, result: Value) {
        self.js_results.push_back(result);
    }

    /// Fail every call whose history entry starts with `prefix`
    pub fn fail_on(&mut self, prefix: impl Into<String>) {
        self.failures.push(prefix.into());
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.call_history
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.call_history.iter().any(|c| c.starts_with(method))
    }

    /// Number of history entries starting with `prefix`
    #[must_use]
    pub fn call_count(&self, prefix: &str) -> usize {
        self.call_history
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&mut self, action: &str, entry: String) -> SalonResult<()> {
        let failing = self.failures.iter().any(|prefix| entry.starts_with(prefix));
        self.call_history.push(entry.clone());
        if failing {
            return Err(SalonError::driver(action, format!("scripted failure: {entry}")));
        }
        Ok(())
    }
}

fn next_answer<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

#[async_trait]
impl PageDriver for MockDriver {
    async fn navigate(&mut self, url: &str) -> SalonResult<()> {
        self.record("navigate", format!("navigate:{url}"))?;
        self.current_url = url.to_string();
        Ok(())
    }

    async fn is_visible(&mut self, selector: &Selector, timeout: Duration) -> SalonResult<bool> {
        let _ = timeout;
        let key = selector.to_string();
        self.record("is_visible", format!("is_visible:{key}"))?;
        Ok(self
            .visibility
            .get_mut(&key)
            .and_then(next_answer)
            .unwrap_or(false))
    }

    async fn count(&mut self, selector: &Selector) -> SalonResult<usize> {
        let key = selector.to_string();
        self.record("count", format!("count:{key}"))?;
        Ok(self.counts.get(&key).copied().unwrap_or(0))
    }

    async fn click(&mut self, selector: &Selector) -> SalonResult<()> {
        self.record("click", format!("click:{selector}"))
    }

    async fn inner_text(&mut self, selector: &Selector) -> SalonResult<String> {
        let key = selector.to_string();
        self.record("inner_text", format!("inner_text:{key}"))?;
        self.texts
            .get(&key)
            .cloned()
            .ok_or_else(|| SalonError::driver("inner_text", format!("no element for {key}")))
    }

    async fn reload(&mut self) -> SalonResult<()> {
        self.record("reload", "reload".to_string())
    }

    async fn evaluate(&mut self, script: &str) -> SalonResult<Value> {
        self.record("evaluate", format!("evaluate:{script}"))?;
        next_answer(&mut self.js_results)
            .ok_or_else(|| SalonError::driver("evaluate", "no mock JS result set"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    mod selector_tests {
        use super::*;

        #[test]
        fn test_role_display() {
            assert_eq!(
                Selector::button("Next day Day").to_string(),
                "internal:role=button[name=\"Next day Day\"i]"
            );
        }

        #[test]
        fn test_nested_display() {
            let sel = Selector::test_id("availabilityCellButton")
                .nth(2)
                .within(Selector::test_id("branchTime"));
            assert_eq!(
                sel.to_string(),
                "internal:testid=[data-testid=\"availabilityCellButton\"s] >> nth=2 >> internal:testid=[data-testid=\"branchTime\"s]"
            );
        }

        #[test]
        fn test_xpath_literal() {
            assert_eq!(xpath_literal("Gold Plan"), "'Gold Plan'");
            assert_eq!(xpath_literal("O'Brien"), "\"O'Brien\"");
            assert_eq!(
                xpath_literal("O'Brien \"VIP\""),
                "concat('O', \"'\", 'Brien \"VIP\"')"
            );
        }

        #[test]
        fn test_first_is_nth_zero() {
            assert_eq!(Selector::css("tr").first(), Selector::css("tr").nth(0));
        }
    }

    mod mock_driver_tests {
        use super::*;

        #[tokio::test]
        async fn test_visibility_queue_repeats_last() {
            let sel = Selector::css("row");
            let mut driver = MockDriver::new();
            driver.script_visibility(&sel, [false, true]);

            let t = Duration::from_millis(10);
            assert!(!driver.is_visible(&sel, t).await.unwrap());
            assert!(driver.is_visible(&sel, t).await.unwrap());
            assert!(driver.is_visible(&sel, t).await.unwrap());
            assert_eq!(driver.call_count("is_visible"), 3);
        }

        #[tokio::test]
        async fn test_unscripted_is_invisible() {
            let mut driver = MockDriver::new();
            let visible = driver
                .is_visible(&Selector::css("nope"), Duration::ZERO)
                .await
                .unwrap();
            assert!(!visible);
        }

        #[tokio::test]
        async fn test_scripted_failure() {
            let mut driver = MockDriver::new();
            driver.fail_on("reload");
            let err = driver.reload().await.unwrap_err();
            assert!(matches!(err, SalonError::Driver { ref action, .. } if action == "reload"));
            assert!(driver.was_called("reload"));
        }

        #[tokio::test]
        async fn test_evaluate_and_text() {
            let mut driver = MockDriver::new();
            driver.set_js_result(json!("tok"));
            driver.set_text(&Selector::test_id("branchTime"), "10:30");

            assert_eq!(driver.evaluate("1").await.unwrap(), json!("tok"));
            assert_eq!(
                driver
                    .inner_text(&Selector::test_id("branchTime"))
                    .await
                    .unwrap(),
                "10:30"
            );
            assert!(driver.inner_text(&Selector::css("x")).await.is_err());
        }

        #[tokio::test]
        async fn test_navigate_tracks_url() {
            let mut driver = MockDriver::new();
            driver.navigate("https://app-dev.phorest.com/a").await.unwrap();
            assert_eq!(driver.current_url, "https://app-dev.phorest.com/a");
            assert_eq!(driver.history(), ["navigate:https://app-dev.phorest.com/a"]);
        }
    }
}
