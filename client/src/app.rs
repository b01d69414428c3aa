//! Screen routing and key handling for the terminal front end.
//!
//! Network work is spawned onto the runtime so the draw loop never waits on
//! the backend; spawned tasks write their results into the shared chat and
//! dashboard state.

use crate::api::{Backend, FileScope};
use crate::attachment::{Attachment, IMAGE_EXTENSIONS, UPLOAD_EXTENSIONS};
use crate::auth::Auth;
use crate::chat::ChatClient;
use crate::dashboard::{Dashboard, DashboardView};
use crate::notice::Notifier;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ragchat_shared::RagMode;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Register,
    Chat,
    Dashboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Input,
    Attach,
    Sidebar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilesField {
    Tags,
    Path,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    Dashboard,
    Chat,
    Logout,
}

#[derive(Debug, Default, Clone)]
pub struct Form {
    pub username: String,
    pub password: String,
    pub on_password: bool,
}

impl Form {
    fn field(&mut self) -> &mut String {
        if self.on_password {
            &mut self.password
        } else {
            &mut self.username
        }
    }
}

pub struct App {
    pub screen: Screen,
    pub form: Form,
    pub chat: ChatClient,
    pub dashboard: Option<Dashboard>,
    pub notifier: Arc<Notifier>,
    pub base_url: String,
    pub focus: Focus,
    pub cursor: usize,
    pub confirm_delete: Option<String>,
    pub sidebar_collapsed: bool,
    /// Profile dropdown; closed by Esc or by picking an entry.
    pub menu: Option<usize>,
    pub files_field: FilesField,
    pub path_input: String,
    auth: Auth,
    backend: Arc<dyn Backend>,
    running: bool,
}

impl App {
    pub fn new(backend: Arc<dyn Backend>, notifier: Arc<Notifier>, base_url: String) -> Self {
        let mut app = Self {
            screen: Screen::Login,
            form: Form::default(),
            chat: ChatClient::new(backend.clone(), notifier.clone()),
            dashboard: None,
            notifier: notifier.clone(),
            base_url,
            focus: Focus::Input,
            cursor: 0,
            confirm_delete: None,
            sidebar_collapsed: false,
            menu: None,
            files_field: FilesField::Tags,
            path_input: String::new(),
            auth: Auth::new(backend.clone(), notifier),
            backend,
            running: true,
        };
        let start = if app.notifier.context().is_authenticated() {
            Screen::Chat
        } else {
            Screen::Login
        };
        app.go(start);
        app
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn username(&self) -> String {
        self.notifier.context().username()
    }

    pub fn menu_items(&self) -> &'static [MenuItem] {
        match self.screen {
            Screen::Dashboard => &[MenuItem::Chat, MenuItem::Logout],
            _ => &[MenuItem::Dashboard, MenuItem::Logout],
        }
    }

    pub fn tick(&mut self, now: Instant) {
        if let Some(screen) = self.notifier.tick(now) {
            self.go(screen);
        }
    }

    /// Switches screens. Protected screens bounce to login without a token.
    pub fn go(&mut self, screen: Screen) {
        let authenticated = self.notifier.context().is_authenticated();
        let screen = match screen {
            Screen::Chat | Screen::Dashboard if !authenticated => Screen::Login,
            other => other,
        };
        tracing::debug!(?screen, "screen change");
        self.menu = None;
        self.confirm_delete = None;

        match screen {
            Screen::Login | Screen::Register => {
                self.form = Form::default();
                self.chat.reset();
                self.dashboard = None;
                self.cursor = 0;
            }
            Screen::Chat => {
                self.focus = Focus::Input;
                let chat = self.chat.clone();
                spawn(async move {
                    chat.list_sessions().await;
                });
            }
            Screen::Dashboard => {
                let scope = FileScope::for_admin(self.notifier.context().is_admin());
                let dashboard = Dashboard::new(self.backend.clone(), self.notifier.clone(), scope);
                self.files_field = FilesField::Tags;
                self.path_input.clear();
                self.load_view(&dashboard, DashboardView::landing(scope));
                self.dashboard = Some(dashboard);
            }
        }
        self.screen = screen;
    }

    fn logout(&mut self) {
        self.auth.logout();
        self.go(Screen::Login);
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q')) {
            self.running = false;
            return;
        }
        if key.code == KeyCode::Esc && self.notifier.current().is_some() {
            self.notifier.dismiss();
            return;
        }
        if self.menu.is_some() {
            self.on_menu_key(key);
            return;
        }
        if ctrl && key.code == KeyCode::Char('p') && self.screen_is_protected() {
            self.menu = Some(0);
            return;
        }

        match self.screen {
            Screen::Login | Screen::Register => self.on_form_key(key),
            Screen::Chat => self.on_chat_key(key, ctrl),
            Screen::Dashboard => self.on_dashboard_key(key, ctrl),
        }
    }

    fn screen_is_protected(&self) -> bool {
        matches!(self.screen, Screen::Chat | Screen::Dashboard)
    }

    fn on_menu_key(&mut self, key: KeyEvent) {
        let items = self.menu_items();
        let Some(selected) = self.menu else { return };
        match key.code {
            KeyCode::Esc => self.menu = None,
            KeyCode::Up => self.menu = Some(selected.saturating_sub(1)),
            KeyCode::Down => self.menu = Some((selected + 1).min(items.len() - 1)),
            KeyCode::Enter => {
                self.menu = None;
                match items[selected] {
                    MenuItem::Dashboard => self.go(Screen::Dashboard),
                    MenuItem::Chat => self.go(Screen::Chat),
                    MenuItem::Logout => self.logout(),
                }
            }
            _ => {}
        }
    }

    fn on_form_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.running = false,
            KeyCode::Tab | KeyCode::Up | KeyCode::Down => {
                self.form.on_password = !self.form.on_password;
            }
            KeyCode::F(2) => {
                let next = if self.screen == Screen::Login {
                    Screen::Register
                } else {
                    Screen::Login
                };
                self.go(next);
            }
            KeyCode::Backspace => {
                self.form.field().pop();
            }
            KeyCode::Char(c) => self.form.field().push(c),
            KeyCode::Enter => {
                let auth = self.auth.clone();
                let Form {
                    username, password, ..
                } = self.form.clone();
                let registering = self.screen == Screen::Register;
                spawn(async move {
                    if registering {
                        auth.register(&username, &password).await;
                    } else {
                        auth.login(&username, &password).await;
                    }
                });
            }
            _ => {}
        }
    }

    fn on_chat_key(&mut self, key: KeyEvent, ctrl: bool) {
        if let Some(id) = self.confirm_delete.take() {
            if key.code == KeyCode::Char('y') {
                let chat = self.chat.clone();
                spawn(async move {
                    chat.delete_session(&id).await;
                });
            }
            return;
        }

        if ctrl {
            match key.code {
                KeyCode::Char('n') => {
                    let chat = self.chat.clone();
                    spawn(async move {
                        chat.create_session().await;
                    });
                }
                KeyCode::Char('r') => {
                    let current = self.chat.view(|s| s.draft.rag_mode);
                    self.chat.set_rag_mode(next_rag_mode(current));
                }
                KeyCode::Char('b') => self.sidebar_collapsed = !self.sidebar_collapsed,
                KeyCode::Char('d') => self.go(Screen::Dashboard),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Esc => self.running = false,
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Input => Focus::Attach,
                    Focus::Attach if self.sidebar_collapsed => Focus::Input,
                    Focus::Attach => Focus::Sidebar,
                    Focus::Sidebar => Focus::Input,
                };
            }
            _ => match self.focus {
                Focus::Input => self.on_input_key(key),
                Focus::Attach => self.on_attach_key(key),
                Focus::Sidebar => self.on_sidebar_key(key),
            },
        }
    }

    fn on_input_key(&mut self, key: KeyEvent) {
        // Input is disabled while a send is in flight.
        if self.chat.view(|s| s.busy) {
            return;
        }
        match key.code {
            KeyCode::Char(c) => self.chat.edit_text(|t| t.push(c)),
            KeyCode::Backspace => self.chat.edit_text(|t| {
                t.pop();
            }),
            KeyCode::Enter => {
                let chat = self.chat.clone();
                spawn(async move {
                    chat.send().await;
                });
            }
            _ => {}
        }
    }

    fn on_attach_key(&mut self, key: KeyEvent) {
        if self.chat.view(|s| s.busy) {
            return;
        }
        match key.code {
            KeyCode::Char(c) => self.chat.edit_file_input(|p| p.push(c)),
            KeyCode::Backspace => self.chat.edit_file_input(|p| {
                p.pop();
            }),
            KeyCode::Delete => self.chat.detach(),
            KeyCode::Enter => {
                let path = PathBuf::from(self.chat.view(|s| s.file_input.trim().to_string()));
                if path.as_os_str().is_empty() {
                    return;
                }
                let chat = self.chat.clone();
                spawn(async move {
                    match Attachment::load(&path, IMAGE_EXTENSIONS).await {
                        Ok(image) => chat.attach(image),
                        Err(e) => {
                            tracing::warn!("attachment rejected: {e}");
                            chat.notifier().fail(e.to_string());
                        }
                    }
                });
            }
            _ => {}
        }
    }

    fn on_sidebar_key(&mut self, key: KeyEvent) {
        let ids: Vec<String> = self
            .chat
            .view(|s| s.sessions.iter().map(|session| session.id.clone()).collect());
        if ids.is_empty() {
            return;
        }
        self.cursor = self.cursor.min(ids.len() - 1);
        match key.code {
            KeyCode::Up => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Down => self.cursor = (self.cursor + 1).min(ids.len() - 1),
            KeyCode::Enter => {
                let chat = self.chat.clone();
                let id = ids[self.cursor].clone();
                spawn(async move {
                    chat.set_active(&id).await;
                });
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                self.confirm_delete = Some(ids[self.cursor].clone());
            }
            _ => {}
        }
    }

    fn on_dashboard_key(&mut self, key: KeyEvent, ctrl: bool) {
        let Some(dashboard) = self.dashboard.clone() else {
            return;
        };
        let view = dashboard.snapshot().view;

        if ctrl {
            match key.code {
                KeyCode::Char('r') => self.load_view(&dashboard, view),
                KeyCode::Char('u') if view == DashboardView::Files => {
                    spawn(async move {
                        dashboard.upload().await;
                    });
                }
                KeyCode::Char('x') if view == DashboardView::Files => dashboard.unstage_all(),
                _ => {}
            }
            return;
        }

        let menu = dashboard.menu();
        let position = menu.iter().position(|v| *v == view).unwrap_or(0);
        match key.code {
            KeyCode::Esc => self.go(Screen::Chat),
            KeyCode::Left | KeyCode::Up if position > 0 => {
                self.load_view(&dashboard, menu[position - 1]);
            }
            KeyCode::Right | KeyCode::Down if position + 1 < menu.len() => {
                self.load_view(&dashboard, menu[position + 1]);
            }
            _ if view == DashboardView::Files => self.on_files_key(&dashboard, key),
            _ => {}
        }
    }

    fn on_files_key(&mut self, dashboard: &Dashboard, key: KeyEvent) {
        if dashboard.snapshot().uploading {
            return;
        }
        match (key.code, self.files_field) {
            (KeyCode::Tab, FilesField::Tags) => self.files_field = FilesField::Path,
            (KeyCode::Tab, FilesField::Path) => self.files_field = FilesField::Tags,
            (KeyCode::Char(c), FilesField::Tags) => dashboard.edit_tags(|t| t.push(c)),
            (KeyCode::Backspace, FilesField::Tags) => dashboard.edit_tags(|t| {
                t.pop();
            }),
            (KeyCode::Char(c), FilesField::Path) => self.path_input.push(c),
            (KeyCode::Backspace, FilesField::Path) => {
                self.path_input.pop();
            }
            (KeyCode::Enter, FilesField::Path) => {
                let paths: Vec<PathBuf> = self
                    .path_input
                    .split_whitespace()
                    .map(PathBuf::from)
                    .collect();
                self.path_input.clear();
                if paths.is_empty() {
                    return;
                }
                let dashboard = dashboard.clone();
                let notifier = self.notifier.clone();
                spawn(async move {
                    let mut loaded = Vec::with_capacity(paths.len());
                    for path in &paths {
                        match Attachment::load(path, UPLOAD_EXTENSIONS).await {
                            Ok(file) => loaded.push(file),
                            Err(e) => {
                                tracing::warn!("file not staged: {e}");
                                notifier.fail(e.to_string());
                            }
                        }
                    }
                    if !loaded.is_empty() {
                        dashboard.stage(loaded);
                    }
                });
            }
            _ => {}
        }
    }

    fn load_view(&self, dashboard: &Dashboard, view: DashboardView) {
        if !dashboard.select(view) {
            return;
        }
        let dashboard = dashboard.clone();
        match view {
            DashboardView::Users => spawn(async move {
                dashboard.load_users().await;
            }),
            DashboardView::Files => spawn(async move {
                dashboard.load_files().await;
            }),
            _ => {}
        }
    }
}

pub fn next_rag_mode(current: RagMode) -> RagMode {
    let modes = RagMode::ALL;
    let index = modes.iter().position(|m| *m == current).unwrap_or(0);
    modes[(index + 1) % modes.len()]
}

fn spawn<F>(future: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(future);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::HttpBackend;
    use crate::credentials::{MemoryStore, SessionContext};
    use std::time::Duration;

    fn signed_out_app() -> App {
        let context = Arc::new(SessionContext::init(Box::new(MemoryStore::new())));
        let backend: Arc<dyn Backend> = Arc::new(
            HttpBackend::new("http://127.0.0.1:9", Duration::from_secs(1), context.clone())
                .unwrap(),
        );
        let notifier = Arc::new(Notifier::new(context, Duration::from_millis(2000)));
        App::new(backend, notifier, "http://127.0.0.1:9".into())
    }

    #[test]
    fn rag_mode_cycles_through_all_modes() {
        assert_eq!(next_rag_mode(RagMode::User), RagMode::All);
        assert_eq!(next_rag_mode(RagMode::All), RagMode::NoRag);
        assert_eq!(next_rag_mode(RagMode::NoRag), RagMode::User);
    }

    #[test]
    fn protected_screens_bounce_to_login() {
        let mut app = signed_out_app();
        assert_eq!(app.screen, Screen::Login);

        app.go(Screen::Chat);
        assert_eq!(app.screen, Screen::Login);
        app.go(Screen::Dashboard);
        assert_eq!(app.screen, Screen::Login);
        assert!(app.dashboard.is_none());
    }

    #[test]
    fn form_typing_switches_fields() {
        let mut app = signed_out_app();
        for c in "ada".chars() {
            app.on_key(KeyEvent::from(KeyCode::Char(c)));
        }
        app.on_key(KeyEvent::from(KeyCode::Tab));
        app.on_key(KeyEvent::from(KeyCode::Char('x')));

        assert_eq!(app.form.username, "ada");
        assert_eq!(app.form.password, "x");

        app.on_key(KeyEvent::from(KeyCode::F(2)));
        assert_eq!(app.screen, Screen::Register);
        assert!(app.form.username.is_empty());
    }

    #[test]
    fn ctrl_c_stops_the_app() {
        let mut app = signed_out_app();
        app.on_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(!app.is_running());
    }
}
