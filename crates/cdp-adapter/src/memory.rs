//! Scripted in-memory page.
//!
//! Elements carry a small timeline (attach, reveal, detach offsets measured
//! from page creation on the tokio clock) so waits and polls can be
//! exercised deterministically under a paused runtime. Fault injection
//! covers transient actuation failures and methods an overlay blocks.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;
use twizz_core_types::{
    matches_text, Action, ActionKind, ActionValue, ActuationMethod, BrowserPort, ElementLocator,
    ElementSnapshot, ProviderError, ProviderErrorKind, SelectorStrategy,
};

/// Side effect applied when an element is clicked.
#[derive(Clone, Debug)]
pub enum ClickEffect {
    /// Detach the element with this key after a delay
    Remove { key: String, after: Duration },

    /// Make the element with this key visible
    Reveal { key: String },

    /// Change the page URL
    Navigate { url: String },
}

/// One element of the in-memory document.
#[derive(Clone, Debug)]
pub struct FakeElement {
    key: String,
    role: Option<String>,
    name: Option<String>,
    text: String,
    css: Vec<String>,
    xpaths: Vec<String>,
    parent: Option<String>,
    attributes: HashMap<String, String>,
    value: String,
    files: Vec<PathBuf>,
    attached_at: Duration,
    detached_at: Option<Duration>,
    visible_at: Duration,
    hidden: bool,
    enabled: bool,
    transient_failures: u32,
    blocked_methods: Vec<ActuationMethod>,
    blocker: Option<String>,
    on_click: Vec<ClickEffect>,
}

impl FakeElement {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            role: None,
            name: None,
            text: String::new(),
            css: Vec::new(),
            xpaths: Vec::new(),
            parent: None,
            attributes: HashMap::new(),
            value: String::new(),
            files: Vec::new(),
            attached_at: Duration::ZERO,
            detached_at: None,
            visible_at: Duration::ZERO,
            hidden: false,
            enabled: true,
            transient_failures: 0,
            blocked_methods: Vec::new(),
            blocker: None,
            on_click: Vec::new(),
        }
    }

    pub fn role(mut self, role: impl Into<String>, name: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self.name = Some(name.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn css(mut self, selector: impl Into<String>) -> Self {
        self.css.push(selector.into());
        self
    }

    pub fn xpath(mut self, expression: impl Into<String>) -> Self {
        self.xpaths.push(expression.into());
        self
    }

    pub fn child_of(mut self, parent_key: impl Into<String>) -> Self {
        self.parent = Some(parent_key.into());
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Attach the element `offset` after page creation.
    pub fn attached_after(mut self, offset: Duration) -> Self {
        self.attached_at = offset;
        self
    }

    /// Become visible `offset` after page creation.
    pub fn visible_after(mut self, offset: Duration) -> Self {
        self.visible_at = offset;
        self
    }

    /// Detach the element `offset` after page creation.
    pub fn detached_after(mut self, offset: Duration) -> Self {
        self.detached_at = Some(offset);
        self
    }

    /// Fail the next `count` actuations regardless of method.
    pub fn failing(mut self, count: u32) -> Self {
        self.transient_failures = count;
        self
    }

    /// Simulate an overlay that intercepts standard pointer input.
    pub fn covered_by(mut self, blocker: impl Into<String>) -> Self {
        self.blocker = Some(blocker.into());
        self.blocked_methods.push(ActuationMethod::Standard);
        self
    }

    /// Reject every actuation performed with `method`.
    pub fn rejecting(mut self, method: ActuationMethod) -> Self {
        self.blocked_methods.push(method);
        self
    }

    pub fn on_click(mut self, effect: ClickEffect) -> Self {
        self.on_click.push(effect);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn is_attached(&self, now: Duration) -> bool {
        now >= self.attached_at && self.detached_at.map_or(true, |at| now < at)
    }

    fn is_visible(&self, now: Duration) -> bool {
        self.is_attached(now) && !self.hidden && now >= self.visible_at
    }

    fn accessible_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.text)
    }
}

/// Record of one actuation attempt against the in-memory page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActuationRecord {
    pub key: String,
    pub kind: ActionKind,
    pub method: ActuationMethod,
    pub ok: bool,
}

#[derive(Default)]
struct PageState {
    elements: Vec<FakeElement>,
    url: String,
    actuations: Vec<ActuationRecord>,
    keys: Vec<String>,
    wheel: Vec<(f64, f64)>,
    hovered: Vec<String>,
    scrolled: Vec<String>,
    queries: usize,
}

/// In-memory [`BrowserPort`] for tests and dry runs.
pub struct InMemoryPage {
    origin: Instant,
    state: Mutex<PageState>,
}

impl InMemoryPage {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            state: Mutex::new(PageState {
                url: "about:blank".to_string(),
                ..PageState::default()
            }),
        }
    }

    /// Builder-style insert.
    pub fn with(self, element: FakeElement) -> Self {
        self.insert(element);
        self
    }

    pub fn insert(&self, element: FakeElement) {
        self.state.lock().elements.push(element);
    }

    /// Detach the element immediately.
    pub fn remove(&self, key: &str) {
        let now = self.elapsed();
        let mut state = self.state.lock();
        if let Some(element) = state.elements.iter_mut().find(|e| e.key == key) {
            element.detached_at = Some(now);
        }
    }

    pub fn set_hidden(&self, key: &str, hidden: bool) {
        let mut state = self.state.lock();
        if let Some(element) = state.elements.iter_mut().find(|e| e.key == key) {
            element.hidden = hidden;
        }
    }

    pub fn set_enabled(&self, key: &str, enabled: bool) {
        let mut state = self.state.lock();
        if let Some(element) = state.elements.iter_mut().find(|e| e.key == key) {
            element.enabled = enabled;
        }
    }

    pub fn value_of(&self, key: &str) -> Option<String> {
        let state = self.state.lock();
        state
            .elements
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.clone())
    }

    pub fn files_of(&self, key: &str) -> Vec<PathBuf> {
        let state = self.state.lock();
        state
            .elements
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.files.clone())
            .unwrap_or_default()
    }

    pub fn actuations(&self) -> Vec<ActuationRecord> {
        self.state.lock().actuations.clone()
    }

    pub fn pressed_keys(&self) -> Vec<String> {
        self.state.lock().keys.clone()
    }

    pub fn wheel_events(&self) -> Vec<(f64, f64)> {
        self.state.lock().wheel.clone()
    }

    pub fn hovered(&self) -> Vec<String> {
        self.state.lock().hovered.clone()
    }

    pub fn scrolled(&self) -> Vec<String> {
        self.state.lock().scrolled.clone()
    }

    /// Number of `count` queries served so far.
    pub fn query_count(&self) -> usize {
        self.state.lock().queries
    }

    /// Time since page creation on the tokio clock.
    pub fn elapsed(&self) -> Duration {
        Instant::now().saturating_duration_since(self.origin)
    }

    fn locate(
        state: &PageState,
        locator: &ElementLocator,
        now: Duration,
    ) -> Result<Option<usize>, ProviderError> {
        let matches = query(state, &locator.strategy, now)?;
        Ok(matches.get(locator.index).copied())
    }

    fn locate_or_fail(
        state: &PageState,
        locator: &ElementLocator,
        now: Duration,
    ) -> Result<usize, ProviderError> {
        Self::locate(state, locator, now)?
            .ok_or_else(|| ProviderError::target_not_found(locator.to_string()))
    }
}

impl Default for InMemoryPage {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_xpath(expression: &str) -> Result<(), ProviderError> {
    let trimmed = expression.trim_start();
    if trimmed.starts_with('/') || trimmed.starts_with('(') || trimmed.starts_with('.') {
        Ok(())
    } else {
        Err(ProviderError::new(ProviderErrorKind::InvalidSelector)
            .with_hint(format!("not a valid xpath expression: {}", expression)))
    }
}

fn matches(
    state: &PageState,
    element: &FakeElement,
    strategy: &SelectorStrategy,
    now: Duration,
) -> Result<bool, ProviderError> {
    let hit = match strategy {
        SelectorStrategy::Role { role, name, exact } => {
            element
                .role
                .as_deref()
                .map_or(false, |r| r.eq_ignore_ascii_case(role))
                && name
                    .as_deref()
                    .map_or(true, |wanted| matches_text(element.accessible_name(), wanted, *exact))
        }
        SelectorStrategy::Text { text, exact } => {
            !element.text.trim().is_empty() && matches_text(&element.text, text, *exact)
        }
        SelectorStrategy::Css(selector) => element.css.iter().any(|s| s == selector),
        SelectorStrategy::XPath(expression) => {
            validate_xpath(expression)?;
            element.xpaths.iter().any(|x| x == expression)
        }
        SelectorStrategy::Relative { parent, child } => {
            if !matches(state, element, child, now)? {
                return Ok(false);
            }
            let mut cursor = element.parent.clone();
            let mut found = false;
            while let Some(key) = cursor {
                let Some(ancestor) = state.elements.iter().find(|e| e.key == key) else {
                    break;
                };
                if ancestor.is_attached(now) && matches(state, ancestor, parent, now)? {
                    found = true;
                    break;
                }
                cursor = ancestor.parent.clone();
            }
            found
        }
    };
    Ok(hit)
}

fn query(
    state: &PageState,
    strategy: &SelectorStrategy,
    now: Duration,
) -> Result<Vec<usize>, ProviderError> {
    let mut hits = Vec::new();
    for (idx, element) in state.elements.iter().enumerate() {
        if element.is_attached(now) && matches(state, element, strategy, now)? {
            hits.push(idx);
        }
    }
    Ok(hits)
}

#[async_trait]
impl BrowserPort for InMemoryPage {
    async fn count(&self, strategy: &SelectorStrategy) -> Result<usize, ProviderError> {
        let now = self.elapsed();
        let mut state = self.state.lock();
        state.queries += 1;
        Ok(query(&state, strategy, now)?.len())
    }

    async fn snapshot(
        &self,
        locator: &ElementLocator,
    ) -> Result<Option<ElementSnapshot>, ProviderError> {
        let now = self.elapsed();
        let state = self.state.lock();
        Ok(Self::locate(&state, locator, now)?.map(|idx| {
            let element = &state.elements[idx];
            ElementSnapshot::new(element.is_visible(now), element.enabled)
        }))
    }

    async fn actuate(
        &self,
        locator: &ElementLocator,
        action: &Action,
        method: ActuationMethod,
    ) -> Result<ActionValue, ProviderError> {
        let now = self.elapsed();
        let mut state = self.state.lock();
        let idx = Self::locate_or_fail(&state, locator, now)?;
        let result = perform(&mut state.elements[idx], action, method, now);
        let key = state.elements[idx].key.clone();
        debug!(key = %key, action = %action, method = %method, ok = result.is_ok(), "in-memory actuation");
        state.actuations.push(ActuationRecord {
            key,
            kind: action.kind(),
            method,
            ok: result.is_ok(),
        });

        if result.is_ok() && matches!(action, Action::Click) {
            let effects = state.elements[idx].on_click.clone();
            for effect in effects {
                apply_effect(&mut state, effect, now);
            }
        }
        result
    }

    async fn scroll_into_view(&self, locator: &ElementLocator) -> Result<(), ProviderError> {
        let now = self.elapsed();
        let mut state = self.state.lock();
        let idx = Self::locate_or_fail(&state, locator, now)?;
        let key = state.elements[idx].key.clone();
        state.scrolled.push(key);
        Ok(())
    }

    async fn hover(&self, locator: &ElementLocator) -> Result<(), ProviderError> {
        let now = self.elapsed();
        let mut state = self.state.lock();
        let idx = Self::locate_or_fail(&state, locator, now)?;
        if !state.elements[idx].is_visible(now) {
            return Err(ProviderError::not_actionable("cannot hover a hidden element"));
        }
        let key = state.elements[idx].key.clone();
        state.hovered.push(key);
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<(), ProviderError> {
        if url.trim().is_empty() {
            return Err(ProviderError::new(ProviderErrorKind::Navigation).with_hint("empty url"));
        }
        self.state.lock().url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> Result<String, ProviderError> {
        Ok(self.state.lock().url.clone())
    }

    async fn mouse_wheel(&self, delta_x: f64, delta_y: f64) -> Result<(), ProviderError> {
        self.state.lock().wheel.push((delta_x, delta_y));
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), ProviderError> {
        self.state.lock().keys.push(key.to_string());
        Ok(())
    }
}

fn perform(
    element: &mut FakeElement,
    action: &Action,
    method: ActuationMethod,
    now: Duration,
) -> Result<ActionValue, ProviderError> {
    if !action.supports(method) {
        return Err(ProviderError::new(ProviderErrorKind::Unsupported)
            .with_hint(format!("{} cannot use {} actuation", action.kind().name(), method)));
    }
    if element.transient_failures > 0 {
        element.transient_failures -= 1;
        return Err(ProviderError::not_actionable(format!(
            "transient failure on '{}'",
            element.key
        )));
    }
    if element.blocked_methods.contains(&method) {
        let reason = match &element.blocker {
            Some(blocker) if method == ActuationMethod::Standard => {
                format!("'{}' intercepts pointer events", blocker)
            }
            _ => format!("{} actuation rejected", method),
        };
        return Err(ProviderError::not_actionable(reason));
    }
    if method == ActuationMethod::Standard && !matches!(action, Action::ReadAttribute(_)) {
        if !element.is_visible(now) {
            return Err(ProviderError::not_actionable("element is not visible"));
        }
        if !element.enabled {
            return Err(ProviderError::not_actionable("element is disabled"));
        }
    }

    match action {
        Action::Click => Ok(ActionValue::None),
        Action::Fill(text) => {
            element.value = text.clone();
            Ok(ActionValue::None)
        }
        Action::SetFiles(paths) => {
            element.files = paths.clone();
            Ok(ActionValue::None)
        }
        Action::ReadAttribute(name) => Ok(ActionValue::Attribute(
            element.attributes.get(name).cloned(),
        )),
    }
}

fn apply_effect(state: &mut PageState, effect: ClickEffect, now: Duration) {
    match effect {
        ClickEffect::Remove { key, after } => {
            if let Some(element) = state.elements.iter_mut().find(|e| e.key == key) {
                element.detached_at = Some(now + after);
            }
        }
        ClickEffect::Reveal { key } => {
            if let Some(element) = state.elements.iter_mut().find(|e| e.key == key) {
                element.hidden = false;
                element.visible_at = element.visible_at.min(now);
            }
        }
        ClickEffect::Navigate { url } => state.url = url,
    }
}
