//! Swagcheck: retry-aware failure evidence for browser end-to-end suites
//!
//! Drives a browser through an e-commerce flow (login, inventory, cart,
//! checkout), and when a test body fails captures a screenshot, the page URL,
//! console errors, the attempt's video and its trace. Every attempt lands in a
//! ledger; the final attempt renders one self-contained HTML summary that
//! compares all attempts of the test.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      SWAGCHECK Pipeline                              │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────┐   ┌──────────────┐   ┌──────────┐   ┌───────────────┐  │
//! │  │ Session │──►│ AttemptScope │──►│ Evidence │──►│ AttemptLedger │  │
//! │  │ (once)  │   │ (per attempt)│   │ Collector│   │ append/enrich │  │
//! │  └─────────┘   └──────┬───────┘   └──────────┘   └───────┬───────┘  │
//! │                       │ teardown: video + trace           │          │
//! │                       ▼                                   ▼          │
//! │               ┌──────────────┐                   ┌───────────────┐  │
//! │               │ArtifactStore │                   │ReportRenderer │  │
//! │               │ attempt_<N>/ │                   │ summary HTML  │  │
//! │               └──────────────┘                   └───────────────┘  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use swagcheck::driver::simulated::SimulatedEngine;
//! use swagcheck::{scenario, RetryRunner, Session, SuiteConfig};
//!
//! # fn main() -> swagcheck::SwagResult<()> {
//! let config = SuiteConfig::default().with_root("run").with_max_retries(1);
//! let engine = SimulatedEngine::new(scenario::shop_site(&config.base_url, config.credentials.clone()));
//! let mut session = Session::start(&engine, config)?;
//! let outcome = RetryRunner::new().run(&mut session, scenario::cart_badge_item(), scenario::flaky_cart_body(1))?;
//! println!("{:?} after {} attempts", outcome.status, outcome.attempts());
//! session.end()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

#[allow(clippy::missing_errors_doc)]
pub mod artifacts;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod attachment;
#[allow(clippy::missing_errors_doc)]
pub mod config;
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn
)]
pub mod driver;
#[allow(clippy::missing_errors_doc)]
pub mod evidence;
#[allow(clippy::missing_errors_doc)]
pub mod ledger;
#[allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]
pub mod lifecycle;
pub mod logging;
#[allow(clippy::missing_errors_doc)]
pub mod login;
#[allow(clippy::missing_errors_doc)]
pub mod page_object;
#[allow(clippy::missing_errors_doc, clippy::doc_markdown)]
pub mod report;
mod result;
#[allow(clippy::missing_errors_doc)]
pub mod runner;
#[allow(clippy::missing_errors_doc)]
pub mod scenario;
#[allow(clippy::missing_errors_doc)]
pub mod session;

pub use artifacts::{ArtifactBundle, ArtifactFlags, RunLayout, TestId};
pub use attachment::{Attachment, AttachmentKind, ResultFile, ResultSink, TestStatus};
pub use config::{Credentials, SuiteConfig, VideoSize};
pub use driver::{Browser, BrowserContext, BrowserEngine, Page, PageId, StorageState};
pub use evidence::{ConsoleLog, ConsoleRegistry, EvidenceCollector, FailureEvidence};
pub use ledger::{AttemptLedger, AttemptRecord, AttemptStatus, Enrichment};
pub use lifecycle::{
    ensure, ensure_eq, run_attempt, AttemptPhase, AttemptScope, BodyContext, BodyError, BodyResult,
    TestItem, NEED_LOGIN,
};
pub use login::LoginStateBootstrapper;
pub use page_object::{LoginPage, PageObject};
pub use report::{render_attempt_summary, ReportDocument, ReportOptions};
pub use result::{SwagError, SwagResult};
pub use runner::{RetryRunner, TestOutcome};
pub use session::Session;

#[cfg(feature = "browser")]
pub use driver::cdp::CdpEngine;
