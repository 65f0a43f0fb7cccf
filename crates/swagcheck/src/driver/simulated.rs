//! Simulated browser engine.
//!
//! A deterministic in-process model of the shop under test: login form,
//! inventory with add-to-cart buttons, cart and checkout links. Contexts write
//! a video file per page on close and trace archives on `stop_tracing`, so the
//! whole evidence pipeline runs without a real browser.
//!
//! ## Toyota Way Application
//!
//! - **Genchi Genbutsu**: the same artifacts land on disk as with a real browser
//! - **Poka-Yoke**: fault switches reproduce teardown hazards on demand

use super::{
    check_url, Browser, BrowserContext, BrowserEngine, ConsoleListener, ConsoleMessage,
    ContextOptions, Cookie, LaunchOptions, Page, PageId, StorageState, TraceOptions,
};
use crate::config::{Credentials, VideoSize};
use crate::driver::trace::TraceRecorder;
use crate::page_object::locators::{
    CART_BADGE, ERROR as LOGIN_ERROR, LOGIN_BUTTON, PASSWORD, USERNAME,
};
use crate::result::{SwagError, SwagResult};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Cookie carrying the logged-in user
pub const SESSION_COOKIE: &str = "session-username";
/// Local-storage key holding the cart contents
pub const CART_STORAGE_KEY: &str = "cart-contents";

const ADD_TO_CART_PREFIX: &str = "[data-test='add-to-cart-";
const VIDEO_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Model of the application under test
#[derive(Debug, Clone)]
pub struct SiteModel {
    base_url: String,
    login_path: String,
    landing_path: String,
    credentials: Credentials,
    protected: Vec<String>,
    links: HashMap<String, String>,
    console_errors: HashMap<String, Vec<String>>,
}

impl SiteModel {
    /// The demo shop: `/` login, `/inventory.html`, `/cart.html`, checkout pages
    #[must_use]
    pub fn saucedemo(base_url: impl Into<String>, credentials: Credentials) -> Self {
        let links = [
            ("[data-test='shopping-cart-link']", "/cart.html"),
            ("[data-test='checkout']", "/checkout-step-one.html"),
            ("[data-test='continue-shopping']", "/inventory.html"),
            ("[data-test='continue']", "/checkout-step-two.html"),
            ("[data-test='finish']", "/checkout-complete.html"),
        ]
        .into_iter()
        .map(|(s, p)| (s.to_string(), p.to_string()))
        .collect();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            login_path: "/".to_string(),
            landing_path: "/inventory.html".to_string(),
            credentials,
            protected: [
                "/inventory.html",
                "/cart.html",
                "/checkout-step-one.html",
                "/checkout-step-two.html",
                "/checkout-complete.html",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            links,
            console_errors: HashMap::new(),
        }
    }

    /// Emit a console error whenever `path` is loaded
    #[must_use]
    pub fn with_console_error(mut self, path: &str, text: &str) -> Self {
        self.console_errors
            .entry(path.to_string())
            .or_default()
            .push(text.to_string());
        self
    }

    /// Base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn path_of<'a>(&self, url: &'a str) -> &'a str {
        match url.strip_prefix(self.base_url.as_str()) {
            Some("") => "/",
            Some(rest) if rest.starts_with('/') => rest.split(['?', '#']).next().unwrap_or(rest),
            _ => url,
        }
    }

    fn domain(&self) -> String {
        let without_scheme = self
            .base_url
            .split_once("://")
            .map_or(self.base_url.as_str(), |(_, rest)| rest);
        without_scheme
            .split(['/', ':'])
            .next()
            .unwrap_or(without_scheme)
            .to_string()
    }
}

/// Failure switches for teardown and evidence hazards
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Faults {
    /// `launch` fails
    pub launch: bool,
    /// `new_context` fails
    pub new_context: bool,
    /// `stop_tracing` fails
    pub stop_tracing: bool,
    /// `screenshot` fails
    pub screenshot: bool,
    /// Contexts never produce a video
    pub no_video: bool,
    /// Browser `close` fails after closing its contexts
    pub browser_close: bool,
}

/// Counters for leak checks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Browsers launched
    pub browsers_launched: usize,
    /// Browsers closed
    pub browsers_closed: usize,
    /// Contexts opened
    pub contexts_opened: usize,
    /// Contexts closed
    pub contexts_closed: usize,
    /// Pages opened
    pub pages_opened: usize,
}

impl EngineStats {
    /// Contexts opened but not yet closed
    #[must_use]
    pub const fn open_contexts(&self) -> usize {
        self.contexts_opened - self.contexts_closed
    }
}

#[derive(Debug, Default)]
struct EngineShared {
    stats: EngineStats,
    next_page: u64,
}

/// Deterministic engine backed by a [`SiteModel`]
#[derive(Debug, Clone)]
pub struct SimulatedEngine {
    site: Arc<SiteModel>,
    faults: Arc<Mutex<Faults>>,
    shared: Arc<Mutex<EngineShared>>,
}

impl SimulatedEngine {
    /// Engine serving `site`
    #[must_use]
    pub fn new(site: SiteModel) -> Self {
        Self {
            site: Arc::new(site),
            faults: Arc::new(Mutex::new(Faults::default())),
            shared: Arc::new(Mutex::new(EngineShared::default())),
        }
    }

    /// Engine serving the demo shop
    #[must_use]
    pub fn saucedemo(base_url: impl Into<String>, credentials: Credentials) -> Self {
        Self::new(SiteModel::saucedemo(base_url, credentials))
    }

    /// Set failure switches
    #[must_use]
    pub fn with_faults(self, faults: Faults) -> Self {
        self.set_faults(faults);
        self
    }

    /// Change failure switches; applies to browsers already launched
    pub fn set_faults(&self, faults: Faults) {
        *lock(&self.faults) = faults;
    }

    /// Current failure switches
    #[must_use]
    pub fn faults(&self) -> Faults {
        *lock(&self.faults)
    }

    /// Snapshot of the leak counters
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        lock(&self.shared).stats
    }
}

impl BrowserEngine for SimulatedEngine {
    fn name(&self) -> &str {
        "simulated"
    }

    fn launch(&self, _options: &LaunchOptions) -> SwagResult<Box<dyn Browser>> {
        if self.faults().launch {
            return Err(SwagError::BrowserLaunch {
                message: "simulated launch failure".to_string(),
            });
        }
        lock(&self.shared).stats.browsers_launched += 1;
        Ok(Box::new(SimulatedBrowser {
            engine: self.clone(),
            contexts: Vec::new(),
            closed: false,
        }))
    }
}

struct SimulatedBrowser {
    engine: SimulatedEngine,
    contexts: Vec<Arc<Mutex<ContextState>>>,
    closed: bool,
}

impl Browser for SimulatedBrowser {
    fn new_context(&mut self, options: &ContextOptions) -> SwagResult<Box<dyn BrowserContext>> {
        if self.closed {
            return Err(SwagError::context("browser is closed"));
        }
        if self.engine.faults().new_context {
            return Err(SwagError::context("simulated context creation failure"));
        }
        let storage = match &options.storage_state {
            Some(path) => StorageState::load(path).map_err(|e| {
                SwagError::context(format!("cannot load storage state {}: {e}", path.display()))
            })?,
            None => StorageState::new(),
        };
        let record_video_dir = if self.engine.faults().no_video {
            None
        } else {
            options.record_video_dir.clone()
        };
        if let Some(dir) = &record_video_dir {
            fs::create_dir_all(dir)?;
        }
        let state = Arc::new(Mutex::new(ContextState {
            storage,
            trace: None,
            page_logs: Vec::new(),
            record_video_dir,
            video_size: options.video_size,
            closed: false,
        }));
        self.contexts.push(Arc::clone(&state));
        lock(&self.engine.shared).stats.contexts_opened += 1;
        Ok(Box::new(SimulatedContext {
            engine: self.engine.clone(),
            state,
        }))
    }

    fn close(&mut self) -> SwagResult<()> {
        if self.closed {
            return Ok(());
        }
        for context in self.contexts.drain(..) {
            close_context(&self.engine, &context)?;
        }
        if self.engine.faults().browser_close {
            return Err(SwagError::BrowserLaunch {
                message: "simulated browser close failure".to_string(),
            });
        }
        self.closed = true;
        lock(&self.engine.shared).stats.browsers_closed += 1;
        Ok(())
    }
}

#[derive(Debug)]
struct PageLog {
    id: PageId,
    visited: Vec<String>,
}

struct ContextState {
    storage: StorageState,
    trace: Option<TraceRecorder>,
    page_logs: Vec<PageLog>,
    record_video_dir: Option<PathBuf>,
    video_size: VideoSize,
    closed: bool,
}

impl ContextState {
    fn logged_in(&self) -> bool {
        self.storage.cookie(SESSION_COOKIE).is_some()
    }

    fn cart_count(&self) -> usize {
        self.storage
            .origins
            .iter()
            .flat_map(|o| o.local_storage.iter())
            .find(|e| e.name == CART_STORAGE_KEY)
            .and_then(|e| e.value.parse().ok())
            .unwrap_or(0)
    }

    fn set_cart_count(&mut self, origin: &str, count: usize) {
        for state in &mut self.storage.origins {
            state.local_storage.retain(|e| e.name != CART_STORAGE_KEY);
        }
        self.storage.origins.retain(|o| !o.local_storage.is_empty());
        self.storage = std::mem::take(&mut self.storage).with_local_storage(
            origin,
            CART_STORAGE_KEY,
            &count.to_string(),
        );
    }

    fn log_visit(&mut self, id: PageId, url: &str) {
        if let Some(log) = self.page_logs.iter_mut().find(|l| l.id == id) {
            log.visited.push(url.to_string());
        }
    }
}

fn close_context(engine: &SimulatedEngine, state: &Arc<Mutex<ContextState>>) -> SwagResult<()> {
    let mut state = lock(state);
    if state.closed {
        return Ok(());
    }
    state.closed = true;
    state.trace = None;
    if let Some(dir) = state.record_video_dir.clone() {
        for log in &state.page_logs {
            let mut bytes = VIDEO_MAGIC.to_vec();
            bytes.extend_from_slice(
                format!(
                    "{}x{} {}\n{}",
                    state.video_size.width,
                    state.video_size.height,
                    log.id,
                    log.visited.join("\n")
                )
                .as_bytes(),
            );
            fs::write(dir.join(format!("{}.webm", log.id)), bytes)?;
        }
    }
    lock(&engine.shared).stats.contexts_closed += 1;
    Ok(())
}

struct SimulatedContext {
    engine: SimulatedEngine,
    state: Arc<Mutex<ContextState>>,
}

impl BrowserContext for SimulatedContext {
    fn new_page(&mut self) -> SwagResult<Box<dyn Page>> {
        let id = {
            let mut shared = lock(&self.engine.shared);
            shared.next_page += 1;
            shared.stats.pages_opened += 1;
            PageId(shared.next_page)
        };
        let mut state = lock(&self.state);
        if state.closed {
            return Err(SwagError::context("context is closed"));
        }
        state.page_logs.push(PageLog {
            id,
            visited: Vec::new(),
        });
        drop(state);
        Ok(Box::new(SimulatedPage {
            id,
            site: Arc::clone(&self.engine.site),
            faults: Arc::clone(&self.engine.faults),
            context: Arc::clone(&self.state),
            url: "about:blank".to_string(),
            form: HashMap::new(),
            login_error: None,
            listeners: Vec::new(),
            closed: false,
        }))
    }

    fn start_tracing(&mut self, options: &TraceOptions) -> SwagResult<()> {
        let mut state = lock(&self.state);
        if state.trace.is_some() {
            return Err(SwagError::tracing("tracing already started"));
        }
        state.trace = Some(TraceRecorder::start(options.clone()));
        Ok(())
    }

    fn stop_tracing(&mut self, path: &Path) -> SwagResult<()> {
        let recorder = lock(&self.state)
            .trace
            .take()
            .ok_or_else(|| SwagError::tracing("tracing was not started"))?;
        if self.engine.faults().stop_tracing {
            return Err(SwagError::tracing("simulated failure while stopping tracing"));
        }
        recorder.finish(path)
    }

    fn save_storage_state(&mut self, path: &Path) -> SwagResult<()> {
        lock(&self.state).storage.save(path)
    }

    fn close(&mut self) -> SwagResult<()> {
        close_context(&self.engine, &self.state)
    }
}

struct SimulatedPage {
    id: PageId,
    site: Arc<SiteModel>,
    faults: Arc<Mutex<Faults>>,
    context: Arc<Mutex<ContextState>>,
    url: String,
    form: HashMap<String, String>,
    login_error: Option<String>,
    listeners: Vec<ConsoleListener>,
    closed: bool,
}

impl SimulatedPage {
    fn ensure_open(&self) -> SwagResult<()> {
        if self.closed {
            Err(SwagError::page("page is closed"))
        } else {
            Ok(())
        }
    }

    fn path(&self) -> &str {
        self.site.path_of(&self.url)
    }

    fn on_login_page(&self) -> bool {
        self.path() == self.site.login_path
    }

    fn navigate(&mut self, url: String) {
        let path = self.site.path_of(&url).to_string();
        let logged_in = lock(&self.context).logged_in();
        self.url = if self.site.protected.contains(&path) && !logged_in {
            self.login_error = Some(format!(
                "Epic sadface: You can only access '{path}' when you are logged in."
            ));
            self.site.url(&self.site.login_path)
        } else {
            self.login_error = None;
            url
        };
        self.form.clear();
        lock(&self.context).log_visit(self.id, &self.url);
        let errors = self
            .site
            .console_errors
            .get(self.path())
            .cloned()
            .unwrap_or_default();
        for text in errors {
            let message = ConsoleMessage::new("error", text).at(self.url.clone(), 0, 0);
            for listener in &self.listeners {
                listener(&message);
            }
        }
    }

    fn record(&self, action: &str, target: &str, error: Option<String>) {
        let mut state = lock(&self.context);
        if let Some(trace) = state.trace.as_mut() {
            let shot = trace
                .options()
                .screenshots
                .then(|| render_png(&self.url, 16, 9).ok())
                .flatten();
            trace.record(action, target, &self.url, error, shot);
        }
    }

    fn traced<T>(
        &mut self,
        action: &str,
        target: &str,
        op: impl FnOnce(&mut Self) -> SwagResult<T>,
    ) -> SwagResult<T> {
        let result = op(self);
        let error = result.as_ref().err().map(ToString::to_string);
        self.record(action, target, error);
        result
    }

    fn submit_login(&mut self) {
        let username = self.form.get(USERNAME).cloned().unwrap_or_default();
        let password = self.form.get(PASSWORD).cloned().unwrap_or_default();
        let creds = &self.site.credentials;
        let error = if username.is_empty() {
            Some("Epic sadface: Username is required")
        } else if password.is_empty() {
            Some("Epic sadface: Password is required")
        } else if username != creds.username || password != creds.password {
            Some("Epic sadface: Username and password do not match any user in this service")
        } else {
            None
        };
        if let Some(error) = error {
            self.login_error = Some(error.to_string());
            return;
        }
        let domain = self.site.domain();
        lock(&self.context)
            .storage
            .cookies
            .push(Cookie::new(SESSION_COOKIE, &username, &domain));
        let landing = self.site.url(&self.site.landing_path);
        self.navigate(landing);
    }
}

impl Page for SimulatedPage {
    fn id(&self) -> PageId {
        self.id
    }

    fn goto(&mut self, url: &str) -> SwagResult<()> {
        self.traced("goto", url, |page| {
            page.ensure_open()?;
            if !url.starts_with(page.site.base_url.as_str()) {
                return Err(SwagError::Navigation {
                    url: url.to_string(),
                    message: "net::ERR_NAME_NOT_RESOLVED".to_string(),
                });
            }
            page.navigate(url.to_string());
            Ok(())
        })
    }

    fn url(&self) -> SwagResult<String> {
        self.ensure_open()?;
        Ok(self.url.clone())
    }

    fn fill(&mut self, selector: &str, value: &str) -> SwagResult<()> {
        self.traced("fill", selector, |page| {
            page.ensure_open()?;
            if !(page.on_login_page() && (selector == USERNAME || selector == PASSWORD)) {
                return Err(SwagError::page(format!("no input matches {selector}")));
            }
            page.form.insert(selector.to_string(), value.to_string());
            Ok(())
        })
    }

    fn click(&mut self, selector: &str) -> SwagResult<()> {
        self.traced("click", selector, |page| {
            page.ensure_open()?;
            if selector == LOGIN_BUTTON && page.on_login_page() {
                page.submit_login();
                return Ok(());
            }
            let logged_in = lock(&page.context).logged_in();
            if logged_in && !page.on_login_page() {
                if let Some(path) = page.site.links.get(selector).cloned() {
                    let url = page.site.url(&path);
                    page.navigate(url);
                    return Ok(());
                }
                if selector.starts_with(ADD_TO_CART_PREFIX) && page.path() == page.site.landing_path {
                    let origin = page.site.base_url.clone();
                    let mut state = lock(&page.context);
                    let count = state.cart_count() + 1;
                    state.set_cart_count(&origin, count);
                    return Ok(());
                }
            }
            Err(SwagError::page(format!("no element matches {selector}")))
        })
    }

    fn text_content(&self, selector: &str) -> SwagResult<Option<String>> {
        self.ensure_open()?;
        Ok(match selector {
            LOGIN_ERROR if self.on_login_page() => self.login_error.clone(),
            CART_BADGE if !self.on_login_page() => {
                let count = lock(&self.context).cart_count();
                (count > 0).then(|| count.to_string())
            }
            _ => None,
        })
    }

    fn wait_for_url(&mut self, pattern: &Regex, timeout: Duration) -> SwagResult<()> {
        self.ensure_open()?;
        check_url(&self.url, pattern, timeout)
    }

    fn screenshot(&mut self, path: &Path, full_page: bool) -> SwagResult<()> {
        self.ensure_open()?;
        if lock(&self.faults).screenshot {
            return Err(SwagError::Screenshot {
                message: "simulated capture failure".to_string(),
            });
        }
        let size = lock(&self.context).video_size;
        let height = if full_page { size.height / 8 * 2 } else { size.height / 8 };
        let bytes = render_png(&self.url, (size.width / 8).max(1), height.max(1))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)?;
        Ok(())
    }

    fn on_console(&mut self, listener: ConsoleListener) {
        self.listeners.push(listener);
    }

    fn close(&mut self) -> SwagResult<()> {
        self.closed = true;
        self.listeners.clear();
        Ok(())
    }
}

/// Solid-color PNG whose color is derived from `seed`
fn render_png(seed: &str, width: u32, height: u32) -> SwagResult<Vec<u8>> {
    let hash = seed
        .bytes()
        .fold(0x811c_9dc5_u32, |h, b| (h ^ u32::from(b)).wrapping_mul(0x0100_0193));
    let [r, g, b, _] = hash.to_le_bytes();
    let pixels: Vec<u8> = (0..width * height).flat_map(|_| [r, g, b]).collect();

    let encode_err = |e: png::EncodingError| SwagError::Screenshot {
        message: e.to_string(),
    };
    let mut out = Vec::new();
    let mut encoder = png::Encoder::new(&mut out, width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header().map_err(encode_err)?;
    writer.write_image_data(&pixels).map_err(encode_err)?;
    writer.finish().map_err(encode_err)?;
    Ok(out)
}
