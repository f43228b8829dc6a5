//! Chromium provider backed by chromiumoxide.

use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType,
};
use chromiumoxide::layout::Point;
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use twizz_core_types::{
    Action, ActionValue, ActuationMethod, BrowserPort, ElementLocator, ElementSnapshot,
    ProviderError, ProviderErrorKind, SelectorStrategy,
};
use uuid::Uuid;

use crate::scripts;

/// Browser launch options.
#[derive(Clone, Debug)]
pub struct LaunchOptions {
    pub headless: bool,
    pub sandbox: bool,
    pub executable: Option<PathBuf>,
    pub viewport: (u32, u32),
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            sandbox: true,
            executable: None,
            viewport: (1280, 800),
        }
    }
}

fn io_error(err: impl Display) -> ProviderError {
    ProviderError::io(err.to_string())
}

/// One browser tab driven over CDP.
pub struct ChromiumPage {
    page: Page,
    _browser: Option<Arc<Browser>>,
    _handler: Option<JoinHandle<()>>,
}

impl ChromiumPage {
    /// Wrap a page owned by an existing browser session.
    pub fn new(page: Page) -> Self {
        Self {
            page,
            _browser: None,
            _handler: None,
        }
    }

    /// Launch a browser and open a blank tab.
    pub async fn launch(options: &LaunchOptions) -> Result<Self, ProviderError> {
        let mut builder = BrowserConfig::builder().window_size(options.viewport.0, options.viewport.1);
        if !options.headless {
            builder = builder.with_head();
        }
        if !options.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = &options.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(io_error)?;
        let (browser, mut handler) = Browser::launch(config).await.map_err(io_error)?;
        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    warn!(error = %err, "cdp handler error");
                }
            }
        });
        let page = browser.new_page("about:blank").await.map_err(io_error)?;
        Ok(Self {
            page,
            _browser: Some(Arc::new(browser)),
            _handler: Some(handle),
        })
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    async fn run(&self, script: String) -> Result<Value, ProviderError> {
        let result = self.page.evaluate(script).await.map_err(io_error)?;
        let value: Value = result.into_value().map_err(|err| {
            ProviderError::new(ProviderErrorKind::Internal).with_hint(err.to_string())
        })?;
        scripts::interpret(value)
    }

    async fn pointer_click(&self, locator: &ElementLocator, force: bool) -> Result<(), ProviderError> {
        let target = self.run(scripts::pointer_target(locator, force)).await?;
        let point = point_of(&target)?;
        self.page.move_mouse(point).await.map_err(io_error)?;
        self.page.click(point).await.map_err(io_error)?;
        Ok(())
    }

    async fn set_files(
        &self,
        locator: &ElementLocator,
        files: &[PathBuf],
        method: ActuationMethod,
    ) -> Result<(), ProviderError> {
        if method == ActuationMethod::Standard {
            let snapshot = self.snapshot(locator).await?;
            match snapshot {
                None => return Err(ProviderError::target_not_found(locator.to_string())),
                Some(state) if !state.enabled => {
                    return Err(ProviderError::not_actionable("file input is disabled"))
                }
                Some(_) => {}
            }
        }
        let token = Uuid::new_v4().to_string();
        self.run(scripts::mark(locator, &token)).await?;
        let selector = format!("[{}=\"{}\"]", scripts::MARK_ATTRIBUTE, token);
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|err| ProviderError::target_not_found(err.to_string()))?;
        let files = files
            .iter()
            .map(|path| path.to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        let mut params = SetFileInputFilesParams::new(files);
        params.backend_node_id = Some(element.backend_node_id);
        self.page.execute(params).await.map_err(io_error)?;
        Ok(())
    }
}

fn point_of(value: &Value) -> Result<Point, ProviderError> {
    let x = value.get("x").and_then(Value::as_f64);
    let y = value.get("y").and_then(Value::as_f64);
    match (x, y) {
        (Some(x), Some(y)) => Ok(Point::new(x, y)),
        _ => Err(ProviderError::new(ProviderErrorKind::Internal)
            .with_hint("pointer target script returned no coordinates")),
    }
}

#[async_trait]
impl BrowserPort for ChromiumPage {
    async fn count(&self, strategy: &SelectorStrategy) -> Result<usize, ProviderError> {
        let value = self.run(scripts::count(strategy)).await?;
        Ok(value.get("count").and_then(Value::as_u64).unwrap_or(0) as usize)
    }

    async fn snapshot(
        &self,
        locator: &ElementLocator,
    ) -> Result<Option<ElementSnapshot>, ProviderError> {
        let value = self.run(scripts::snapshot(locator)).await?;
        if !value.get("attached").and_then(Value::as_bool).unwrap_or(false) {
            return Ok(None);
        }
        let flag = |name: &str| value.get(name).and_then(Value::as_bool).unwrap_or(false);
        Ok(Some(ElementSnapshot::new(flag("visible"), flag("enabled"))))
    }

    async fn actuate(
        &self,
        locator: &ElementLocator,
        action: &Action,
        method: ActuationMethod,
    ) -> Result<ActionValue, ProviderError> {
        if !action.supports(method) {
            return Err(ProviderError::new(ProviderErrorKind::Unsupported)
                .with_hint(format!("{} cannot use {} actuation", action.kind().name(), method)));
        }
        debug!(locator = %locator, action = %action, method = %method, "chromium actuation");
        match (action, method) {
            (Action::Click, ActuationMethod::Standard) => self.pointer_click(locator, false).await?,
            (Action::Click, ActuationMethod::Force) => self.pointer_click(locator, true).await?,
            (Action::Click, ActuationMethod::Script) => {
                self.run(scripts::dispatch_click(locator)).await?;
            }
            (Action::Fill(text), ActuationMethod::Standard) => {
                self.run(scripts::pointer_target(locator, false)).await?;
                self.run(scripts::fill(locator, text, false)).await?;
            }
            (Action::Fill(text), _) => {
                self.run(scripts::fill(locator, text, true)).await?;
            }
            (Action::SetFiles(files), method) => self.set_files(locator, files, method).await?,
            (Action::ReadAttribute(name), _) => {
                let value = self.run(scripts::read_attribute(locator, name)).await?;
                let attribute = value.get("value").and_then(Value::as_str).map(str::to_string);
                return Ok(ActionValue::Attribute(attribute));
            }
        }
        Ok(ActionValue::None)
    }

    async fn scroll_into_view(&self, locator: &ElementLocator) -> Result<(), ProviderError> {
        self.run(scripts::scroll_into_view(locator)).await?;
        Ok(())
    }

    async fn hover(&self, locator: &ElementLocator) -> Result<(), ProviderError> {
        let target = self.run(scripts::pointer_target(locator, false)).await?;
        self.page
            .move_mouse(point_of(&target)?)
            .await
            .map_err(io_error)?;
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<(), ProviderError> {
        self.page.goto(url).await.map_err(|err| {
            ProviderError::new(ProviderErrorKind::Navigation).with_hint(err.to_string())
        })?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, ProviderError> {
        Ok(self
            .page
            .url()
            .await
            .map_err(io_error)?
            .unwrap_or_default())
    }

    async fn mouse_wheel(&self, delta_x: f64, delta_y: f64) -> Result<(), ProviderError> {
        let params = DispatchMouseEventParams::builder()
            .r#type(DispatchMouseEventType::MouseWheel)
            .x(0.0)
            .y(0.0)
            .delta_x(delta_x)
            .delta_y(delta_y)
            .build()
            .map_err(|err| ProviderError::new(ProviderErrorKind::Internal).with_hint(err))?;
        self.page.execute(params).await.map_err(io_error)?;
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), ProviderError> {
        let body = self.page.find_element("body").await.map_err(io_error)?;
        body.press_key(key).await.map_err(io_error)?;
        Ok(())
    }
}
