use async_trait::async_trait;

use crate::action::{Action, ActionValue, ActuationMethod};
use crate::errors::ProviderError;
use crate::selector::{ElementLocator, SelectorStrategy};
use crate::state::ElementSnapshot;

/// Capability surface the interaction layer needs from a browser provider.
///
/// Every element operation receives an [`ElementLocator`] and must re-run
/// its query; implementations never hand out cached nodes.
#[async_trait]
pub trait BrowserPort: Send + Sync {
    /// Number of elements currently matching `strategy`, in document order.
    async fn count(&self, strategy: &SelectorStrategy) -> Result<usize, ProviderError>;

    /// State of the located element, or `None` when it is not attached.
    async fn snapshot(
        &self,
        locator: &ElementLocator,
    ) -> Result<Option<ElementSnapshot>, ProviderError>;

    /// Perform `action` on the located element using `method`.
    async fn actuate(
        &self,
        locator: &ElementLocator,
        action: &Action,
        method: ActuationMethod,
    ) -> Result<ActionValue, ProviderError>;

    async fn scroll_into_view(&self, locator: &ElementLocator) -> Result<(), ProviderError>;

    async fn hover(&self, locator: &ElementLocator) -> Result<(), ProviderError>;

    async fn navigate(&self, url: &str) -> Result<(), ProviderError>;

    async fn current_url(&self) -> Result<String, ProviderError>;

    async fn mouse_wheel(&self, delta_x: f64, delta_y: f64) -> Result<(), ProviderError>;

    async fn press_key(&self, key: &str) -> Result<(), ProviderError>;
}
