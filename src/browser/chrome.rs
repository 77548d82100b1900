use std::ffi::OsStr;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use tracing::{debug, info};

use super::{BrowserPage, BrowserSession, WaitCondition};
use crate::error::BrowserError;

/// Launch settings for the shared Chrome process
#[derive(Debug, Clone)]
pub struct ChromeOptions {
    pub headless: bool,
    /// Default timeout for element waits and navigations
    pub navigation_timeout: Duration,
    /// Extra pause after the load event for [`WaitCondition::NetworkIdle`]
    pub settle: Duration,
}

impl Default for ChromeOptions {
    fn default() -> Self {
        Self {
            headless: true,
            navigation_timeout: Duration::from_secs(30),
            settle: Duration::from_millis(1500),
        }
    }
}

/// Headless Chrome shared by all source tasks
pub struct ChromeSession {
    browser: Browser,
    options: ChromeOptions,
}

impl ChromeSession {
    pub fn launch(options: ChromeOptions) -> Result<Self, BrowserError> {
        info!("Launching Chrome (headless: {})...", options.headless);

        let launch_options = LaunchOptions::default_builder()
            .headless(options.headless)
            .idle_browser_timeout(Duration::from_secs(600))
            .args(vec![OsStr::new("--disable-features=site-per-process")])
            .build()
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let browser = Browser::new(launch_options).map_err(|e| BrowserError::Launch(e.to_string()))?;

        Ok(Self { browser, options })
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>, BrowserError> {
        let browser = self.browser.clone();
        let timeout = self.options.navigation_timeout;

        let tab = tokio::task::spawn_blocking(move || {
            let tab = browser.new_tab()?;
            tab.set_default_timeout(timeout);
            Ok::<_, anyhow::Error>(tab)
        })
        .await
        .map_err(|e| BrowserError::Task(e.to_string()))?
        .map_err(|e| BrowserError::NewPage(e.to_string()))?;

        Ok(Box::new(ChromePage {
            tab,
            timeout,
            settle: self.options.settle,
        }))
    }
}

/// One Chrome tab. Every CDP call blocks, so each runs on the blocking pool.
pub struct ChromePage {
    tab: Arc<Tab>,
    timeout: Duration,
    settle: Duration,
}

impl ChromePage {
    async fn blocking<T, F>(&self, call: F) -> Result<T, BrowserError>
    where
        T: Send + 'static,
        F: FnOnce(&Tab) -> Result<T, BrowserError> + Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || call(&tab))
            .await
            .map_err(|e| BrowserError::Task(e.to_string()))?
    }
}

fn settle_after(wait: WaitCondition, settle: Duration) {
    if wait == WaitCondition::NetworkIdle {
        thread::sleep(settle);
    }
}

#[async_trait]
impl BrowserPage for ChromePage {
    async fn goto(&self, url: &str, wait: WaitCondition) -> Result<(), BrowserError> {
        debug!("Navigating to {}", url);
        let url = url.to_string();
        let settle = self.settle;

        self.blocking(move |tab| {
            tab.navigate_to(&url)
                .and_then(|tab| tab.wait_until_navigated())
                .map_err(|e| BrowserError::Navigation {
                    url: url.clone(),
                    message: e.to_string(),
                })?;
            settle_after(wait, settle);
            Ok(())
        })
        .await
    }

    async fn content(&self) -> Result<String, BrowserError> {
        self.blocking(|tab| {
            tab.get_content()
                .map_err(|e| BrowserError::Content(e.to_string()))
        })
        .await
    }

    async fn wait_for(&self, selector: &str) -> Result<(), BrowserError> {
        let selector = selector.to_string();

        self.blocking(move |tab| {
            tab.wait_for_element(&selector)
                .map(|_| ())
                .map_err(|e| BrowserError::ElementNotFound {
                    selector: selector.clone(),
                    message: e.to_string(),
                })
        })
        .await
    }

    async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        let selector = selector.to_string();

        self.blocking(move |tab| {
            tab.find_element(&selector)
                .and_then(|element| element.click().map(|_| ()))
                .map_err(|e| BrowserError::Click {
                    selector: selector.clone(),
                    message: e.to_string(),
                })
        })
        .await
    }

    async fn evaluate(&self, expression: &str) -> Result<serde_json::Value, BrowserError> {
        let expression = expression.to_string();

        self.blocking(move |tab| {
            let result = tab
                .evaluate(&expression, false)
                .map_err(|e| BrowserError::Script(e.to_string()))?;
            Ok(result.value.unwrap_or(serde_json::Value::Null))
        })
        .await
    }

    async fn wait_for_navigation(&self, wait: WaitCondition) -> Result<(), BrowserError> {
        let settle = self.settle;

        self.blocking(move |tab| {
            tab.wait_until_navigated()
                .map_err(|e| BrowserError::Navigation {
                    url: tab.get_url(),
                    message: e.to_string(),
                })?;
            settle_after(wait, settle);
            Ok(())
        })
        .await
    }

    fn navigation_timeout(&self) -> Duration {
        self.timeout
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.blocking(|tab| {
            tab.close(true)
                .map(|_| ())
                .map_err(|e| BrowserError::Task(e.to_string()))
        })
        .await
    }
}
