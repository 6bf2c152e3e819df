//! Port to the browser that renders the translation site.
//!
//! The translation core only talks to [`UiSession`]; [`WebDriverSession`] is the
//! production binding over the W3C WebDriver HTTP protocol.

pub mod webdriver;

pub use webdriver::WebDriverSession;

use crate::utils::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// How an element is located on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "value")]
pub enum Locator {
    #[serde(rename = "css")]
    Css(String),
    #[serde(rename = "tag_name")]
    TagName(String),
    #[serde(rename = "xpath")]
    XPath(String),
}

impl Locator {
    /// Strategy name used on the WebDriver wire.
    pub fn strategy(&self) -> &'static str {
        match self {
            Locator::Css(_) => "css selector",
            Locator::TagName(_) => "tag name",
            Locator::XPath(_) => "xpath",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Locator::Css(v) | Locator::TagName(v) | Locator::XPath(v) => v,
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.strategy(), self.value())
    }
}

/// Opaque handle to an element found by a [`UiSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef(pub String);

/// A live browser session.
///
/// Errors are classified through [`crate::utils::TranslatorError::is_transient`] and
/// [`crate::utils::TranslatorError::is_session_fatal`].
#[async_trait]
pub trait UiSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<()>;

    async fn find(&mut self, locator: &Locator) -> Result<ElementRef>;

    async fn clear(&mut self, element: &ElementRef) -> Result<()>;

    async fn type_text(&mut self, element: &ElementRef, text: &str) -> Result<()>;

    /// Text of every element matching `locator`, joined by a space.
    /// `None` when nothing matches yet.
    async fn read_text(&mut self, locator: &Locator) -> Result<Option<String>>;

    async fn close(&mut self) -> Result<()>;
}
