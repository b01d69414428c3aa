//! Admin and user dashboards: user listing, file listing and tagged uploads.

use crate::api::{Backend, FileScope};
use crate::attachment::Attachment;
use crate::notice::Notifier;
use parking_lot::Mutex;
use ragchat_shared::{FileRecord, UserRecord};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardView {
    Dashboard,
    Users,
    Files,
    Logs,
    Settings,
}

impl DashboardView {
    const ADMIN_MENU: &'static [DashboardView] = &[
        DashboardView::Dashboard,
        DashboardView::Users,
        DashboardView::Files,
        DashboardView::Logs,
        DashboardView::Settings,
    ];
    const USER_MENU: &'static [DashboardView] = &[DashboardView::Files];

    pub fn menu(scope: FileScope) -> &'static [DashboardView] {
        match scope {
            FileScope::Admin => Self::ADMIN_MENU,
            FileScope::User => Self::USER_MENU,
        }
    }

    pub fn landing(scope: FileScope) -> Self {
        match scope {
            FileScope::Admin => DashboardView::Dashboard,
            FileScope::User => DashboardView::Files,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            DashboardView::Dashboard => "Dashboard",
            DashboardView::Users => "Manage Users",
            DashboardView::Files => "Manage Files",
            DashboardView::Logs => "Logs",
            DashboardView::Settings => "Settings",
        }
    }
}

/// A file waiting for upload together with the tags typed when it was added.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedFile {
    pub file: Attachment,
    pub tags: String,
}

#[derive(Debug, Clone)]
pub struct DashboardState {
    pub view: DashboardView,
    pub users: Vec<UserRecord>,
    pub files: Vec<FileRecord>,
    pub staged: Vec<StagedFile>,
    pub tags: String,
    pub uploading: bool,
}

#[derive(Clone)]
pub struct Dashboard {
    backend: Arc<dyn Backend>,
    notifier: Arc<Notifier>,
    scope: FileScope,
    state: Arc<Mutex<DashboardState>>,
}

impl Dashboard {
    pub fn new(backend: Arc<dyn Backend>, notifier: Arc<Notifier>, scope: FileScope) -> Self {
        let state = DashboardState {
            view: DashboardView::landing(scope),
            users: Vec::new(),
            files: Vec::new(),
            staged: Vec::new(),
            tags: String::new(),
            uploading: false,
        };
        Self {
            backend,
            notifier,
            scope,
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn scope(&self) -> FileScope {
        self.scope
    }

    pub fn menu(&self) -> &'static [DashboardView] {
        DashboardView::menu(self.scope)
    }

    pub fn snapshot(&self) -> DashboardState {
        self.state.lock().clone()
    }

    /// Returns false for views the current role has no menu entry for.
    pub fn select(&self, view: DashboardView) -> bool {
        if !self.menu().contains(&view) {
            return false;
        }
        self.state.lock().view = view;
        true
    }

    pub fn edit_tags(&self, f: impl FnOnce(&mut String)) {
        f(&mut self.state.lock().tags);
    }

    pub async fn load_users(&self) -> bool {
        match self.backend.list_users().await {
            Ok(users) => {
                self.state.lock().users = users;
                true
            }
            Err(e) => {
                self.notifier.report("list_users", &e);
                false
            }
        }
    }

    pub async fn load_files(&self) -> bool {
        match self.backend.list_files(self.scope).await {
            Ok(files) => {
                self.state.lock().files = files;
                true
            }
            Err(e) => {
                self.notifier.report("list_files", &e);
                false
            }
        }
    }

    /// Stages files under the tags currently typed, then clears the tags.
    pub fn stage(&self, files: Vec<Attachment>) {
        let mut state = self.state.lock();
        let tags = std::mem::take(&mut state.tags);
        state.staged.extend(files.into_iter().map(|file| StagedFile {
            file,
            tags: tags.clone(),
        }));
    }

    pub fn unstage_all(&self) {
        self.state.lock().staged.clear();
    }

    /// Uploads everything staged in one request. Tags are joined with `,` in
    /// staging order.
    pub async fn upload(&self) -> bool {
        let (files, tags) = {
            let mut state = self.state.lock();
            if state.uploading || state.staged.is_empty() {
                return false;
            }
            state.uploading = true;
            let files: Vec<Attachment> = state.staged.iter().map(|s| s.file.clone()).collect();
            let tags = state
                .staged
                .iter()
                .map(|s| s.tags.as_str())
                .collect::<Vec<_>>()
                .join(",");
            (files, tags)
        };

        tracing::info!(count = files.len(), scope = ?self.scope, "uploading files");
        let result = self.backend.upload_files(self.scope, files, tags).await;

        let uploaded = match result {
            Ok(reply) => {
                tracing::info!("upload accepted: {}", reply.message);
                {
                    let mut state = self.state.lock();
                    state.staged.clear();
                    state.tags.clear();
                }
                self.notifier.succeed("Files uploaded successfully!");
                true
            }
            Err(e) => {
                self.notifier.report_as("upload_files", &e, "File upload failed!");
                false
            }
        };
        self.state.lock().uploading = false;

        if uploaded {
            self.load_files().await;
        }
        uploaded
    }
}
