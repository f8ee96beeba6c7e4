//! Shared application state handed to every handler.

use std::path::PathBuf;
use std::sync::Arc;

use inspection_core::service::InspectionService;

use crate::mailer::Mailer;
use crate::storage::FileStore;

pub struct AppState {
    pub service: InspectionService,
    pub storage: FileStore,
    /// None when SMTP is unconfigured — notifications are skipped silently.
    pub mailer: Option<Mailer>,
    pub template_path: PathBuf,
    pub report_image_box: (u32, u32),
}

pub type SharedState = Arc<AppState>;
