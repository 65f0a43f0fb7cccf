//! Chrome DevTools Protocol engine (feature `browser`).
//!
//! Wraps chromiumoxide behind the synchronous driver traits. The engine owns a
//! tokio runtime; every trait call blocks on it. Contexts are CDP browser
//! contexts, so cookies and storage are isolated per attempt.
//!
//! CDP has no built-in video recording: contexts opened with a video
//! directory log that no video will be produced and leave the directory
//! empty. Traces are recorded by [`TraceRecorder`] from the actions the
//! pages perform.

use super::trace::TraceRecorder;
use super::{
    check_url, Browser, BrowserContext, BrowserEngine, ConsoleListener, ConsoleMessage,
    ContextOptions, Cookie, LaunchOptions, Page, PageId, StorageState, TraceOptions,
};
use crate::result::{SwagError, SwagResult};
use base64::Engine as _;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, CaptureScreenshotParams};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::cdp::js_protocol::runtime::{ConsoleApiCalledType, EventConsoleApiCalled};
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use regex::Regex;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;
use tokio::sync::Mutex as AsyncMutex;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn page_err(e: impl std::fmt::Display) -> SwagError {
    SwagError::page(e.to_string())
}

fn context_err(e: impl std::fmt::Display) -> SwagError {
    SwagError::context(e.to_string())
}

type SharedTrace = Arc<Mutex<Option<TraceRecorder>>>;
type SharedBrowser = Arc<AsyncMutex<CdpBrowser>>;

/// Engine launching Chromium over CDP
#[derive(Debug, Clone)]
pub struct CdpEngine {
    runtime: Arc<Runtime>,
}

impl CdpEngine {
    /// Create an engine with its own multi-threaded runtime
    pub fn new() -> SwagResult<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| SwagError::BrowserLaunch {
                message: format!("tokio runtime: {e}"),
            })?;
        Ok(Self {
            runtime: Arc::new(runtime),
        })
    }
}

impl BrowserEngine for CdpEngine {
    fn name(&self) -> &str {
        "chromium-cdp"
    }

    fn launch(&self, options: &LaunchOptions) -> SwagResult<Box<dyn Browser>> {
        let mut builder = CdpConfig::builder();
        if !options.headless {
            builder = builder.with_head();
        }
        if !options.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = &options.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|message| SwagError::BrowserLaunch { message })?;

        let (browser, mut handler) = self
            .runtime
            .block_on(CdpBrowser::launch(config))
            .map_err(|e| SwagError::BrowserLaunch {
                message: e.to_string(),
            })?;
        let handle = self.runtime.spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });
        tracing::info!(headless = options.headless, "chromium launched");
        Ok(Box::new(CdpSession {
            runtime: Arc::clone(&self.runtime),
            browser: Arc::new(AsyncMutex::new(browser)),
            handle: Some(handle),
            pages: Arc::new(AtomicU64::new(0)),
        }))
    }
}

struct CdpSession {
    runtime: Arc<Runtime>,
    browser: SharedBrowser,
    handle: Option<tokio::task::JoinHandle<()>>,
    pages: Arc<AtomicU64>,
}

impl Browser for CdpSession {
    fn new_context(&mut self, options: &ContextOptions) -> SwagResult<Box<dyn BrowserContext>> {
        let browser = Arc::clone(&self.browser);
        let id = self
            .runtime
            .block_on(async move {
                browser
                    .lock()
                    .await
                    .execute(CreateBrowserContextParams::default())
                    .await
            })
            .map_err(context_err)?
            .result
            .browser_context_id;
        if let Some(dir) = &options.record_video_dir {
            tracing::info!(dir = %dir.display(), "video recording is not available over CDP");
        }
        let storage = match &options.storage_state {
            Some(path) => Some(StorageState::load(path)?),
            None => None,
        };
        Ok(Box::new(CdpContext {
            runtime: Arc::clone(&self.runtime),
            browser: Arc::clone(&self.browser),
            id: Some(id),
            storage,
            pages: Arc::clone(&self.pages),
            open_pages: Vec::new(),
            trace: Arc::new(Mutex::new(None)),
        }))
    }

    fn close(&mut self) -> SwagResult<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        let browser = Arc::clone(&self.browser);
        let closed = self.runtime.block_on(async move {
            let mut browser = browser.lock().await;
            browser
                .close()
                .await
                .map(|_| ())
                .map_err(|e| SwagError::BrowserLaunch {
                    message: e.to_string(),
                })
        });
        handle.abort();
        closed
    }
}

struct CdpContext {
    runtime: Arc<Runtime>,
    browser: SharedBrowser,
    id: Option<BrowserContextId>,
    storage: Option<StorageState>,
    pages: Arc<AtomicU64>,
    open_pages: Vec<CdpPage>,
    trace: SharedTrace,
}

impl CdpContext {
    async fn restore_storage(page: &CdpPage, storage: &StorageState) -> SwagResult<()> {
        let mut cookies = Vec::with_capacity(storage.cookies.len());
        for cookie in &storage.cookies {
            let mut param = CookieParam::new(cookie.name.clone(), cookie.value.clone());
            param.domain = Some(cookie.domain.clone());
            param.path = Some(cookie.path.clone());
            param.secure = Some(cookie.secure);
            param.http_only = Some(cookie.http_only);
            cookies.push(param);
        }
        if !cookies.is_empty() {
            page.set_cookies(cookies).await.map_err(context_err)?;
        }
        for origin in &storage.origins {
            let entries = serde_json::to_string(&origin.local_storage)?;
            page.goto(origin.origin.as_str()).await.map_err(context_err)?;
            page.evaluate(format!(
                "(() => {{ for (const e of {entries}) localStorage.setItem(e.name, e.value); }})()"
            ))
            .await
            .map_err(context_err)?;
        }
        Ok(())
    }
}

impl BrowserContext for CdpContext {
    fn new_page(&mut self) -> SwagResult<Box<dyn Page>> {
        let Some(id) = self.id.clone() else {
            return Err(SwagError::invalid_state("context already closed"));
        };
        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(id)
            .build()
            .map_err(context_err)?;
        let browser = Arc::clone(&self.browser);
        let storage = self.storage.take();
        let page = self.runtime.block_on(async move {
            let page = browser.lock().await.new_page(params).await.map_err(context_err)?;
            if let Some(storage) = &storage {
                Self::restore_storage(&page, storage).await?;
            }
            Ok::<CdpPage, SwagError>(page)
        })?;
        self.open_pages.push(page.clone());
        let id = PageId(self.pages.fetch_add(1, Ordering::Relaxed) + 1);
        Ok(Box::new(CdpTab {
            id,
            runtime: Arc::clone(&self.runtime),
            page: Some(page),
            trace: Arc::clone(&self.trace),
            console: None,
        }))
    }

    fn start_tracing(&mut self, options: &TraceOptions) -> SwagResult<()> {
        let mut trace = lock(&self.trace);
        if trace.is_some() {
            return Err(SwagError::tracing("tracing already started"));
        }
        *trace = Some(TraceRecorder::start(options.clone()));
        Ok(())
    }

    fn stop_tracing(&mut self, path: &Path) -> SwagResult<()> {
        let recorder = lock(&self.trace)
            .take()
            .ok_or_else(|| SwagError::tracing("tracing was not started"))?;
        recorder.finish(path)
    }

    fn save_storage_state(&mut self, path: &Path) -> SwagResult<()> {
        let Some(page) = self.open_pages.first().cloned() else {
            return Err(SwagError::context("no page to read storage state from"));
        };
        let state = self.runtime.block_on(async move {
            let mut state = StorageState::new();
            for c in page.get_cookies().await.map_err(context_err)? {
                let mut cookie = Cookie::new(&c.name, &c.value, &c.domain);
                cookie.path = c.path;
                cookie.expires = c.expires;
                cookie.http_only = c.http_only;
                cookie.secure = c.secure;
                state = state.with_cookie(cookie);
            }
            let origin: String = page
                .evaluate("location.origin")
                .await
                .map_err(context_err)?
                .into_value()
                .map_err(context_err)?;
            let items: Vec<(String, String)> = page
                .evaluate("Object.entries(localStorage)")
                .await
                .map_err(context_err)?
                .into_value()
                .map_err(context_err)?;
            for (name, value) in items {
                state = state.with_local_storage(&origin, &name, &value);
            }
            Ok::<StorageState, SwagError>(state)
        })?;
        state.save(path)
    }

    fn close(&mut self) -> SwagResult<()> {
        let Some(id) = self.id.take() else {
            return Ok(());
        };
        let pages = std::mem::take(&mut self.open_pages);
        let browser = Arc::clone(&self.browser);
        self.runtime.block_on(async move {
            for page in pages {
                let _ = page.close().await;
            }
            browser
                .lock()
                .await
                .execute(DisposeBrowserContextParams::new(id))
                .await
                .map(|_| ())
                .map_err(context_err)
        })
    }
}

impl Drop for CdpContext {
    fn drop(&mut self) {
        if self.id.is_some() {
            if let Err(e) = self.close() {
                tracing::warn!(error = %e, "closing CDP context during drop failed");
            }
        }
    }
}

struct CdpTab {
    id: PageId,
    runtime: Arc<Runtime>,
    page: Option<CdpPage>,
    trace: SharedTrace,
    console: Option<tokio::task::JoinHandle<()>>,
}

impl CdpTab {
    fn page(&self) -> SwagResult<&CdpPage> {
        self.page
            .as_ref()
            .ok_or_else(|| SwagError::page(format!("{} is closed", self.id)))
    }

    fn current_url(&self) -> SwagResult<String> {
        let page = self.page()?;
        Ok(self
            .runtime
            .block_on(page.url())
            .map_err(page_err)?
            .unwrap_or_default())
    }

    fn capture(&self, full_page: bool) -> SwagResult<Vec<u8>> {
        let page = self.page()?;
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .capture_beyond_viewport(full_page)
            .build();
        let shot = self
            .runtime
            .block_on(page.execute(params))
            .map_err(|e| SwagError::Screenshot {
                message: e.to_string(),
            })?;
        base64::engine::general_purpose::STANDARD
            .decode(&shot.result.data)
            .map_err(|e| SwagError::Screenshot {
                message: e.to_string(),
            })
    }

    fn traced<T>(
        &mut self,
        action: &str,
        target: &str,
        op: impl FnOnce(&mut Self) -> SwagResult<T>,
    ) -> SwagResult<T> {
        let result = op(self);
        let wants_screenshot = lock(&self.trace)
            .as_ref()
            .is_some_and(|t| t.options().screenshots);
        if lock(&self.trace).is_some() {
            let url = self.current_url().unwrap_or_default();
            let screenshot = if wants_screenshot {
                self.capture(false).ok()
            } else {
                None
            };
            let error = result.as_ref().err().map(ToString::to_string);
            if let Some(recorder) = lock(&self.trace).as_mut() {
                recorder.record(action, target, &url, error, screenshot);
            }
        }
        result
    }
}

impl Page for CdpTab {
    fn id(&self) -> PageId {
        self.id
    }

    fn goto(&mut self, url: &str) -> SwagResult<()> {
        self.traced("goto", url, |tab| {
            let page = tab.page()?;
            tab.runtime
                .block_on(page.goto(url))
                .map(|_| ())
                .map_err(|e| SwagError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })
        })
    }

    fn url(&self) -> SwagResult<String> {
        self.current_url()
    }

    fn fill(&mut self, selector: &str, value: &str) -> SwagResult<()> {
        self.traced("fill", selector, |tab| {
            let page = tab.page()?;
            tab.runtime.block_on(async {
                let element = page.find_element(selector).await.map_err(page_err)?;
                element.click().await.map_err(page_err)?;
                element.type_str(value).await.map_err(page_err)?;
                Ok(())
            })
        })
    }

    fn click(&mut self, selector: &str) -> SwagResult<()> {
        self.traced("click", selector, |tab| {
            let page = tab.page()?;
            tab.runtime.block_on(async {
                let element = page.find_element(selector).await.map_err(page_err)?;
                element.click().await.map_err(page_err)?;
                Ok(())
            })
        })
    }

    fn text_content(&self, selector: &str) -> SwagResult<Option<String>> {
        let page = self.page()?;
        self.runtime.block_on(async {
            match page.find_element(selector).await {
                Ok(element) => element.inner_text().await.map_err(page_err),
                Err(_) => Ok(None),
            }
        })
    }

    fn wait_for_url(&mut self, pattern: &Regex, timeout: Duration) -> SwagResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            let url = self.current_url()?;
            if pattern.is_match(&url) || Instant::now() >= deadline {
                return check_url(&url, pattern, timeout);
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    fn screenshot(&mut self, path: &Path, full_page: bool) -> SwagResult<()> {
        let bytes = self.capture(full_page)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, bytes)?;
        Ok(())
    }

    fn on_console(&mut self, listener: ConsoleListener) {
        let Ok(page) = self.page().cloned() else {
            return;
        };
        let events = match self
            .runtime
            .block_on(page.event_listener::<EventConsoleApiCalled>())
        {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(page = %self.id, error = %e, "console subscription failed");
                return;
            }
        };
        self.console = Some(self.runtime.spawn(async move {
            let mut events = events;
            while let Some(event) = events.next().await {
                listener(&console_message(&event));
            }
        }));
    }

    fn close(&mut self) -> SwagResult<()> {
        if let Some(handle) = self.console.take() {
            handle.abort();
        }
        let Some(page) = self.page.take() else {
            return Ok(());
        };
        self.runtime.block_on(page.close()).map_err(page_err)
    }
}

fn console_message(event: &EventConsoleApiCalled) -> ConsoleMessage {
    let kind = match event.r#type {
        ConsoleApiCalledType::Error | ConsoleApiCalledType::Assert => "error",
        ConsoleApiCalledType::Warning => "warning",
        ConsoleApiCalledType::Debug => "debug",
        ConsoleApiCalledType::Info => "info",
        _ => "log",
    };
    let text = event
        .args
        .iter()
        .map(|arg| match &arg.value {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(value) => value.to_string(),
            None => arg.description.clone().unwrap_or_default(),
        })
        .collect::<Vec<_>>()
        .join(" ");
    let message = ConsoleMessage::new(kind, text);
    match event
        .stack_trace
        .as_ref()
        .and_then(|stack| stack.call_frames.first())
    {
        Some(frame) => message.at(
            frame.url.clone(),
            u32::try_from(frame.line_number).unwrap_or(0),
            u32::try_from(frame.column_number).unwrap_or(0),
        ),
        None => message,
    }
}
