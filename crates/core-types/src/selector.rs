//! Selector strategies, interaction targets and lazy element locators

use std::fmt;

use crate::errors::TargetError;

/// One way of finding an element.
///
/// Role and text matching follow the usual accessibility-query rules: an
/// exact match compares the whitespace-normalised strings case-sensitively,
/// a non-exact match is a case-insensitive substring test.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "snake_case"))]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SelectorStrategy {
    /// ARIA role plus optional accessible name
    Role {
        role: String,
        name: Option<String>,
        exact: bool,
    },

    /// Visible text content
    Text { text: String, exact: bool },

    /// CSS selector
    Css(String),

    /// XPath expression
    XPath(String),

    /// Child strategy evaluated inside every match of the parent strategy
    Relative {
        parent: Box<SelectorStrategy>,
        child: Box<SelectorStrategy>,
    },
}

impl SelectorStrategy {
    pub fn role(role: impl Into<String>, name: impl Into<String>) -> Self {
        SelectorStrategy::Role {
            role: role.into(),
            name: Some(name.into()),
            exact: false,
        }
    }

    pub fn role_exact(role: impl Into<String>, name: impl Into<String>) -> Self {
        SelectorStrategy::Role {
            role: role.into(),
            name: Some(name.into()),
            exact: true,
        }
    }

    /// Any element with the given role, regardless of its name.
    pub fn any_role(role: impl Into<String>) -> Self {
        SelectorStrategy::Role {
            role: role.into(),
            name: None,
            exact: false,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        SelectorStrategy::Text {
            text: text.into(),
            exact: false,
        }
    }

    pub fn text_exact(text: impl Into<String>) -> Self {
        SelectorStrategy::Text {
            text: text.into(),
            exact: true,
        }
    }

    pub fn css(selector: impl Into<String>) -> Self {
        SelectorStrategy::Css(selector.into())
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        SelectorStrategy::XPath(expression.into())
    }

    /// Scope this strategy to descendants of `parent`.
    pub fn within(self, parent: SelectorStrategy) -> Self {
        SelectorStrategy::Relative {
            parent: Box::new(parent),
            child: Box::new(self),
        }
    }

    /// Short kind name used in logs and diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            SelectorStrategy::Role { .. } => "role",
            SelectorStrategy::Text { .. } => "text",
            SelectorStrategy::Css(_) => "css",
            SelectorStrategy::XPath(_) => "xpath",
            SelectorStrategy::Relative { .. } => "relative",
        }
    }
}

impl fmt::Display for SelectorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectorStrategy::Role { role, name, exact } => match name {
                Some(name) if *exact => write!(f, "role={}[name=\"{}\"s]", role, name),
                Some(name) => write!(f, "role={}[name=\"{}\"i]", role, name),
                None => write!(f, "role={}", role),
            },
            SelectorStrategy::Text { text, exact } => {
                if *exact {
                    write!(f, "text=\"{}\"", text)
                } else {
                    write!(f, "text={}", text)
                }
            }
            SelectorStrategy::Css(selector) => write!(f, "css={}", selector),
            SelectorStrategy::XPath(expression) => write!(f, "xpath={}", expression),
            SelectorStrategy::Relative { parent, child } => write!(f, "{} >> {}", parent, child),
        }
    }
}

/// Which match to use when a strategy finds several elements.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ElementIndex {
    /// First match in document order
    #[default]
    First,

    /// Zero-based position in document order
    Nth(usize),

    /// Last match in document order
    Last,
}

impl ElementIndex {
    /// Concrete position for a strategy that matched `count` elements.
    pub fn pick(&self, count: usize) -> Option<usize> {
        if count == 0 {
            return None;
        }
        match self {
            ElementIndex::First => Some(0),
            ElementIndex::Nth(n) if *n < count => Some(*n),
            ElementIndex::Nth(_) => None,
            ElementIndex::Last => Some(count - 1),
        }
    }
}

impl fmt::Display for ElementIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementIndex::First => f.write_str("first"),
            ElementIndex::Nth(n) => write!(f, "nth={}", n),
            ElementIndex::Last => f.write_str("last"),
        }
    }
}

/// Ordered, non-empty list of strategies that all denote the same logical
/// element in different render states.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(try_from = "RawInteractionTarget"))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InteractionTarget {
    label: Option<String>,
    strategies: Vec<SelectorStrategy>,
    index: ElementIndex,
}

/// Unchecked wire form of [`InteractionTarget`].
#[cfg(feature = "serde-full")]
#[derive(serde::Deserialize)]
struct RawInteractionTarget {
    #[serde(default)]
    label: Option<String>,
    strategies: Vec<SelectorStrategy>,
    #[serde(default)]
    index: ElementIndex,
}

#[cfg(feature = "serde-full")]
impl TryFrom<RawInteractionTarget> for InteractionTarget {
    type Error = TargetError;

    fn try_from(raw: RawInteractionTarget) -> Result<Self, Self::Error> {
        let mut target = InteractionTarget::try_from_strategies(raw.strategies)?;
        target.label = raw.label;
        target.index = raw.index;
        Ok(target)
    }
}

impl InteractionTarget {
    pub fn new(first: SelectorStrategy) -> Self {
        Self {
            label: None,
            strategies: vec![first],
            index: ElementIndex::First,
        }
    }

    /// Build a target from a list, rejecting an empty one.
    pub fn try_from_strategies(
        strategies: impl IntoIterator<Item = SelectorStrategy>,
    ) -> Result<Self, TargetError> {
        let strategies: Vec<SelectorStrategy> = strategies.into_iter().collect();
        if strategies.is_empty() {
            return Err(TargetError::Empty);
        }
        Ok(Self {
            label: None,
            strategies,
            index: ElementIndex::First,
        })
    }

    /// Append a lower-priority fallback strategy.
    pub fn or(mut self, fallback: SelectorStrategy) -> Self {
        self.strategies.push(fallback);
        self
    }

    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn nth(mut self, index: usize) -> Self {
        self.index = ElementIndex::Nth(index);
        self
    }

    pub fn first(mut self) -> Self {
        self.index = ElementIndex::First;
        self
    }

    pub fn last(mut self) -> Self {
        self.index = ElementIndex::Last;
        self
    }

    pub fn strategies(&self) -> &[SelectorStrategy] {
        &self.strategies
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn index(&self) -> ElementIndex {
        self.index
    }

    /// Human-readable name: the explicit label or the primary strategy.
    pub fn label(&self) -> String {
        match (&self.label, self.strategies.first()) {
            (Some(label), _) => label.clone(),
            (None, Some(primary)) => primary.to_string(),
            (None, None) => String::new(),
        }
    }

    /// Locator for the element at `element_index` of strategy `strategy_index`.
    pub fn locator(&self, strategy_index: usize, element_index: usize) -> Option<ElementLocator> {
        self.strategies
            .get(strategy_index)
            .map(|strategy| ElementLocator::new(strategy.clone(), element_index))
    }
}

impl From<SelectorStrategy> for InteractionTarget {
    fn from(strategy: SelectorStrategy) -> Self {
        InteractionTarget::new(strategy)
    }
}

impl fmt::Display for InteractionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chain = self
            .strategies
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(" | ");
        match &self.label {
            Some(label) => write!(f, "{} [{}] ({})", label, chain, self.index),
            None => write!(f, "[{}] ({})", chain, self.index),
        }
    }
}

/// Lazy handle to the `index`-th match of one strategy.
///
/// Providers re-run the query on every operation; a locator never pins a
/// live node.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ElementLocator {
    pub strategy: SelectorStrategy,
    pub index: usize,
}

impl ElementLocator {
    pub fn new(strategy: SelectorStrategy, index: usize) -> Self {
        Self { strategy, index }
    }
}

impl fmt::Display for ElementLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} >> nth={}", self.strategy, self.index)
    }
}

/// Collapse runs of whitespace and trim both ends.
pub fn normalize_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text/name comparison shared by every provider.
pub fn matches_text(candidate: &str, wanted: &str, exact: bool) -> bool {
    let candidate = normalize_whitespace(candidate);
    let wanted = normalize_whitespace(wanted);
    if exact {
        candidate == wanted
    } else {
        candidate.to_lowercase().contains(&wanted.to_lowercase())
    }
}
