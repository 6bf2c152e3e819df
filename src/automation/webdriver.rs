use crate::automation::{ElementRef, Locator, UiSession};
use crate::utils::config::{BrowserConfig, BrowserKind};
use crate::utils::{Result, TranslatorError};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Key under which W3C WebDriver returns element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a986-4a8fc3c4a6dc";

/// Browser session driven through a chromedriver/geckodriver HTTP endpoint.
pub struct WebDriverSession {
    client: Client,
    base_url: String,
    session_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct FindElementRequest<'a> {
    using: &'a str,
    value: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorValue {
    error: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct NewSessionValue {
    #[serde(rename = "sessionId")]
    session_id: String,
}

impl WebDriverSession {
    pub async fn connect(config: &BrowserConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        let mut session = Self {
            client,
            base_url: config.webdriver_url.trim_end_matches('/').to_string(),
            session_id: None,
        };

        let value = session
            .command(Method::POST, "/session", Some(capabilities(config)))
            .await
            .map_err(|e| match e {
                TranslatorError::HttpError(e) => TranslatorError::SessionFatal(format!(
                    "cannot reach WebDriver at {}: {}",
                    session.base_url, e
                )),
                other => other,
            })?;
        let created: NewSessionValue = serde_json::from_value(value)?;

        debug!(session_id = %created.session_id, "WebDriver session created");
        session.session_id = Some(created.session_id);
        Ok(session)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    fn session_path(&self, suffix: &str) -> Result<String> {
        let id = self
            .session_id
            .as_deref()
            .ok_or_else(|| TranslatorError::SessionFatal("session already closed".to_string()))?;
        Ok(format!("/session/{}{}", id, suffix))
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        let mut payload: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|_| TranslatorError::WebDriver {
                error: "unknown error".to_string(),
                message: format!("HTTP {}: {}", status, text),
            })?
        };
        let value = payload.get_mut("value").map(Value::take).unwrap_or(Value::Null);

        if let Ok(err) = serde_json::from_value::<ErrorValue>(value.clone()) {
            return Err(TranslatorError::WebDriver {
                error: err.error,
                message: err.message,
            });
        }
        if !status.is_success() {
            return Err(TranslatorError::WebDriver {
                error: "unknown error".to_string(),
                message: format!("HTTP {}", status),
            });
        }

        Ok(value)
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<ElementRef>> {
        let path = self.session_path("/elements")?;
        let request = FindElementRequest {
            using: locator.strategy(),
            value: locator.value(),
        };
        let value = self
            .command(Method::POST, &path, Some(serde_json::to_value(request)?))
            .await?;

        Ok(value
            .as_array()
            .map(|items| items.iter().filter_map(element_ref).collect())
            .unwrap_or_default())
    }

    async fn element_text(&self, element: &ElementRef) -> Result<String> {
        let path = self.session_path(&format!("/element/{}/text", element.0))?;
        let value = self.command(Method::GET, &path, None).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }
}

#[async_trait]
impl UiSession for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        let path = self.session_path("/url")?;
        self.command(Method::POST, &path, Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn find(&mut self, locator: &Locator) -> Result<ElementRef> {
        let path = self.session_path("/element")?;
        let request = FindElementRequest {
            using: locator.strategy(),
            value: locator.value(),
        };
        let value = self
            .command(Method::POST, &path, Some(serde_json::to_value(request)?))
            .await?;

        element_ref(&value).ok_or_else(|| TranslatorError::WebDriver {
            error: "no such element".to_string(),
            message: format!("no element reference returned for {}", locator),
        })
    }

    async fn clear(&mut self, element: &ElementRef) -> Result<()> {
        let path = self.session_path(&format!("/element/{}/clear", element.0))?;
        self.command(Method::POST, &path, Some(json!({}))).await?;
        Ok(())
    }

    async fn type_text(&mut self, element: &ElementRef, text: &str) -> Result<()> {
        let path = self.session_path(&format!("/element/{}/value", element.0))?;
        self.command(Method::POST, &path, Some(json!({ "text": text })))
            .await?;
        Ok(())
    }

    async fn read_text(&mut self, locator: &Locator) -> Result<Option<String>> {
        let elements = self.find_all(locator).await?;
        if elements.is_empty() {
            return Ok(None);
        }

        let mut parts = Vec::with_capacity(elements.len());
        for element in &elements {
            let text = self.element_text(element).await?;
            if !text.trim().is_empty() {
                parts.push(text);
            }
        }
        Ok(Some(parts.join(" ")))
    }

    async fn close(&mut self) -> Result<()> {
        let Some(id) = self.session_id.take() else {
            return Ok(());
        };
        let path = format!("/session/{}", id);
        if let Err(e) = self.command(Method::DELETE, &path, None).await {
            warn!(session_id = %id, error = %e, "Failed to close WebDriver session");
            return Err(e);
        }
        debug!(session_id = %id, "WebDriver session closed");
        Ok(())
    }
}

fn element_ref(value: &Value) -> Option<ElementRef> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(|id| ElementRef(id.to_string()))
}

fn capabilities(config: &BrowserConfig) -> Value {
    match config.browser {
        BrowserKind::Chrome => {
            let mut args = Vec::new();
            if config.start_maximized {
                args.push("--start-maximized");
            }
            if config.headless {
                args.push("--headless=new");
            }
            json!({
                "capabilities": {
                    "alwaysMatch": {
                        "browserName": "chrome",
                        "goog:chromeOptions": { "args": args }
                    }
                }
            })
        }
        BrowserKind::Firefox => {
            let mut args = Vec::new();
            if config.headless {
                args.push("-headless");
            }
            json!({
                "capabilities": {
                    "alwaysMatch": {
                        "browserName": "firefox",
                        "moz:firefoxOptions": { "args": args }
                    }
                }
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn connected(server: &MockServer) -> WebDriverSession {
        Mock::given(method("POST"))
            .and(path("/session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": { "sessionId": "abc", "capabilities": {} }
            })))
            .mount(server)
            .await;

        let config = BrowserConfig {
            webdriver_url: server.uri(),
            ..BrowserConfig::default()
        };
        WebDriverSession::connect(&config).await.unwrap()
    }

    #[tokio::test]
    async fn connect_creates_session() {
        let server = MockServer::start().await;
        let session = connected(&server).await;
        assert_eq!(session.session_id(), Some("abc"));
    }

    #[tokio::test]
    async fn unreachable_driver_is_fatal() {
        let config = BrowserConfig {
            webdriver_url: "http://127.0.0.1:1".to_string(),
            request_timeout_seconds: 2,
            ..BrowserConfig::default()
        };
        let err = WebDriverSession::connect(&config).await.err().unwrap();
        assert!(err.is_session_fatal());
    }

    #[tokio::test]
    async fn find_and_type_use_element_reference() {
        let server = MockServer::start().await;
        let mut session = connected(&server).await;

        Mock::given(method("POST"))
            .and(path("/session/abc/element"))
            .and(body_json(json!({ "using": "tag name", "value": "textarea" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": { ELEMENT_KEY: "el-1" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/session/abc/element/el-1/value"))
            .and(body_json(json!({ "text": "Hello" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": null })))
            .expect(1)
            .mount(&server)
            .await;

        let element = session
            .find(&Locator::TagName("textarea".to_string()))
            .await
            .unwrap();
        assert_eq!(element, ElementRef("el-1".to_string()));
        session.type_text(&element, "Hello").await.unwrap();
    }

    #[tokio::test]
    async fn read_text_joins_all_matches() {
        let server = MockServer::start().await;
        let mut session = connected(&server).await;

        Mock::given(method("POST"))
            .and(path("/session/abc/elements"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [ { ELEMENT_KEY: "a" }, { ELEMENT_KEY: "b" } ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/session/abc/element/a/text"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": "Hallo." })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/session/abc/element/b/text"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": "Welt." })))
            .mount(&server)
            .await;

        let text = session
            .read_text(&Locator::Css("span".to_string()))
            .await
            .unwrap();
        assert_eq!(text.as_deref(), Some("Hallo. Welt."));
    }

    #[tokio::test]
    async fn read_text_is_none_without_matches() {
        let server = MockServer::start().await;
        let mut session = connected(&server).await;

        Mock::given(method("POST"))
            .and(path("/session/abc/elements"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": [] })))
            .mount(&server)
            .await;

        let text = session
            .read_text(&Locator::Css("span".to_string()))
            .await
            .unwrap();
        assert!(text.is_none());
    }

    #[tokio::test]
    async fn maps_webdriver_error_codes() {
        let server = MockServer::start().await;
        let mut session = connected(&server).await;

        Mock::given(method("POST"))
            .and(path("/session/abc/element/stale/clear"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "value": { "error": "stale element reference", "message": "gone", "stacktrace": "" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/session/abc/url"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "value": { "error": "invalid session id", "message": "closed", "stacktrace": "" }
            })))
            .mount(&server)
            .await;

        let stale = session
            .clear(&ElementRef("stale".to_string()))
            .await
            .err()
            .unwrap();
        assert!(stale.is_transient());

        let fatal = session.navigate("https://example.com").await.err().unwrap();
        assert!(fatal.is_session_fatal());
    }

    #[tokio::test]
    async fn close_deletes_session_once() {
        let server = MockServer::start().await;
        let mut session = connected(&server).await;

        Mock::given(method("DELETE"))
            .and(path("/session/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": null })))
            .expect(1)
            .mount(&server)
            .await;

        session.close().await.unwrap();
        session.close().await.unwrap();
        assert!(session.session_id().is_none());
    }
}
