use crate::app::{App, FilesField, Focus, MenuItem, Screen};
use crate::chat::ChatState;
use crate::dashboard::{DashboardState, DashboardView};
use crate::notice::{Notice, NoticeKind};
use crate::transform::{DisplayMessage, DisplayRole};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, Wrap},
};

pub fn draw(f: &mut Frame, app: &App) {
    match app.screen {
        Screen::Login | Screen::Register => draw_form(f, app),
        Screen::Chat => draw_chat(f, app),
        Screen::Dashboard => draw_dashboard(f, app),
    }
    if let Some(selected) = app.menu {
        draw_menu(f, app.menu_items(), selected);
    }
    if let Some(notice) = app.notifier.current() {
        draw_notice(f, &notice);
    }
}

fn titled(title: &str) -> Block<'_> {
    Block::default().borders(Borders::ALL).title(title)
}

fn focused(block: Block<'_>, is_focused: bool) -> Block<'_> {
    if is_focused {
        block.border_style(Style::default().fg(Color::Cyan))
    } else {
        block
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn draw_form(f: &mut Frame, app: &App) {
    let registering = app.screen == Screen::Register;
    let area = centered(f.area(), 50, 12);
    let title = if registering { "Register" } else { "Login" };
    f.render_widget(Clear, area);
    f.render_widget(titled(title), area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
        ])
        .split(area);

    let username = Paragraph::new(app.form.username.as_str())
        .block(focused(titled("Username"), !app.form.on_password));
    let masked = "*".repeat(app.form.password.chars().count());
    let password =
        Paragraph::new(masked).block(focused(titled("Password"), app.form.on_password));
    f.render_widget(username, rows[0]);
    f.render_widget(password, rows[1]);

    let hint = if registering {
        "Enter: register   F2: go to login   Tab: switch field   Esc: quit"
    } else {
        "Enter: login   F2: register now   Tab: switch field   Esc: quit"
    };
    f.render_widget(
        Paragraph::new(hint)
            .style(Style::default().fg(Color::DarkGray))
            .wrap(Wrap { trim: true }),
        rows[2],
    );
}

fn draw_chat(f: &mut Frame, app: &App) {
    let state = app.chat.snapshot();
    let columns = if app.sidebar_collapsed {
        vec![Constraint::Length(0), Constraint::Min(1)]
    } else {
        vec![Constraint::Length(30), Constraint::Min(1)]
    };
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(columns)
        .split(f.area());

    if !app.sidebar_collapsed {
        draw_sidebar(f, app, &state, chunks[0]);
    }

    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(chunks[1]);

    let mut status = vec![
        Span::styled(app.username(), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!("  rag: {}", state.draft.rag_mode.label())),
    ];
    if state.busy {
        status.push(Span::styled("  sending...", Style::default().fg(Color::Yellow)));
    }
    if state.loading {
        status.push(Span::styled("  loading...", Style::default().fg(Color::Yellow)));
    }
    status.push(Span::styled(
        "  ^N new  ^R rag  ^B sidebar  ^D dashboard  ^P menu",
        Style::default().fg(Color::DarkGray),
    ));
    f.render_widget(Paragraph::new(Line::from(status)), main[0]);

    let title = match &state.active {
        Some(id) => format!("Chat {id}"),
        None => "Chat".to_string(),
    };
    let items: Vec<ListItem> = state.messages.iter().map(message_item).collect();
    f.render_widget(List::new(items).block(titled(&title)), main[1]);

    let attach_title = match &state.draft.image {
        Some(image) => format!("Image: {} ({} bytes)  Del: remove", image.name, image.size()),
        None => "Attach image (.png .jpg .jpeg)".to_string(),
    };
    let attach = Paragraph::new(state.file_input.as_str())
        .block(focused(titled(&attach_title), app.focus == Focus::Attach));
    f.render_widget(attach, main[2]);

    let input = Paragraph::new(state.draft.text.as_str())
        .block(focused(
            titled("Type a message..."),
            app.focus == Focus::Input && !state.busy,
        ))
        .wrap(Wrap { trim: true });
    f.render_widget(input, main[3]);
}

fn draw_sidebar(f: &mut Frame, app: &App, state: &ChatState, area: Rect) {
    let block = focused(titled("Sessions"), app.focus == Focus::Sidebar);
    if state.sessions.is_empty() {
        f.render_widget(Paragraph::new("No sessions available.").block(block), area);
        return;
    }

    let items: Vec<ListItem> = state
        .sessions
        .iter()
        .map(|session| {
            let style = if state.is_active(&session.id) {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let marker = if app.confirm_delete.as_deref() == Some(session.id.as_str()) {
                " delete? y/n"
            } else {
                ""
            };
            ListItem::new(Line::from(vec![
                Span::styled(session.id.clone(), style),
                Span::styled(marker, Style::default().fg(Color::Red)),
            ]))
        })
        .collect();

    let mut list_state = ListState::default();
    if app.focus == Focus::Sidebar {
        list_state.select(Some(app.cursor.min(state.sessions.len() - 1)));
    }
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, area, &mut list_state);
}

fn message_item(message: &DisplayMessage) -> ListItem<'_> {
    let (label, color) = match &message.role {
        DisplayRole::User => ("You", Color::Green),
        DisplayRole::Bot => ("Bot", Color::Blue),
        DisplayRole::Other(name) => (name.as_str(), Color::Gray),
    };
    let mut lines = vec![Line::from(vec![
        Span::styled(format!("{label}: "), Style::default().fg(color).add_modifier(Modifier::BOLD)),
        Span::raw(message.text.as_str()),
    ])];
    if let Some(image) = &message.image {
        lines.push(Line::from(Span::styled(
            format!("  [image] {image}"),
            Style::default().fg(Color::DarkGray),
        )));
    }
    ListItem::new(lines)
}

fn draw_dashboard(f: &mut Frame, app: &App) {
    let Some(dashboard) = &app.dashboard else {
        return;
    };
    let state = dashboard.snapshot();
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(20), Constraint::Min(1)])
        .split(f.area());

    let items: Vec<ListItem> = dashboard
        .menu()
        .iter()
        .map(|view| ListItem::new(view.title()))
        .collect();
    let mut list_state = ListState::default();
    list_state.select(dashboard.menu().iter().position(|v| *v == state.view));
    let panel = if dashboard.scope() == crate::api::FileScope::Admin {
        "Admin Panel"
    } else {
        "User Panel"
    };
    let menu = List::new(items)
        .block(titled(panel))
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
    f.render_stateful_widget(menu, chunks[0], &mut list_state);

    let content = chunks[1];
    match state.view {
        DashboardView::Dashboard => {
            let text = format!(
                "Welcome to the Admin Dashboard, {}.\n\nEsc: back to chat   ^P: menu",
                app.username()
            );
            f.render_widget(Paragraph::new(text).block(titled("Dashboard")), content);
        }
        DashboardView::Users => draw_users(f, &state, content),
        DashboardView::Files => draw_files(f, app, &state, content),
        DashboardView::Logs => draw_logs(f, app, content),
        DashboardView::Settings => {
            let text = format!("Backend: {}\nSigned in as: {}", app.base_url, app.username());
            f.render_widget(Paragraph::new(text).block(titled("Settings")), content);
        }
    }
}

fn draw_users(f: &mut Frame, state: &DashboardState, area: Rect) {
    let rows = state.users.iter().map(|user| {
        Row::new(vec![
            Cell::from(user.id.to_string()),
            Cell::from(user.username.clone()),
            Cell::from(if user.is_admin { "Admin" } else { "User" }),
        ])
    });
    let table = Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Min(12),
            Constraint::Length(8),
        ],
    )
    .header(
        Row::new(vec!["ID", "Username", "Role"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(titled("Users  ^R reload"));
    f.render_widget(table, area);
}

fn draw_files(f: &mut Frame, app: &App, state: &DashboardState, area: Rect) {
    let admin = app
        .dashboard
        .as_ref()
        .is_some_and(|d| d.scope() == crate::api::FileScope::Admin);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length((state.staged.len() as u16).saturating_add(2).min(8)),
            Constraint::Min(3),
        ])
        .split(area);

    let tags = Paragraph::new(state.tags.as_str()).block(focused(
        titled("Add tags (comma-separated)"),
        app.files_field == FilesField::Tags,
    ));
    f.render_widget(tags, chunks[0]);

    let path_title = if state.uploading {
        "Uploading..."
    } else {
        "Files to stage (.png .jpg .jpeg .pdf .txt)  ^U upload  ^X clear"
    };
    let path = Paragraph::new(app.path_input.as_str())
        .block(focused(titled(path_title), app.files_field == FilesField::Path));
    f.render_widget(path, chunks[1]);

    let staged: Vec<ListItem> = state
        .staged
        .iter()
        .map(|s| {
            let tags = if s.tags.is_empty() { "None" } else { s.tags.as_str() };
            ListItem::new(format!("{} - {} bytes  Tags: {}", s.file.name, s.file.size(), tags))
        })
        .collect();
    f.render_widget(List::new(staged).block(titled("Staged")), chunks[2]);

    let mut header = vec!["Filename"];
    if admin {
        header.extend(["Uploader", "Role"]);
    }
    header.push("Upload Time");
    if admin {
        header.push("Collection");
    }
    header.push("Tags");

    let rows = state.files.iter().map(|file| {
        let mut cells = vec![file.filename.clone()];
        if admin {
            cells.push(file.uploader.clone().unwrap_or_default());
            cells.push(file.role.clone().unwrap_or_default());
        }
        cells.push(file.upload_time.clone());
        if admin {
            cells.push(file.collection_name.clone().unwrap_or_default());
        }
        cells.push(file.tags.to_string());
        Row::new(cells)
    });
    let widths = vec![Constraint::Min(10); header.len()];
    let table = Table::new(rows, widths)
        .header(Row::new(header).style(Style::default().add_modifier(Modifier::BOLD)))
        .block(titled("Files List"));
    f.render_widget(table, chunks[3]);
}

fn draw_logs(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .notifier
        .history()
        .iter()
        .rev()
        .map(|notice| {
            let color = notice_color(notice.kind);
            let age = notice.raised_at.elapsed().as_secs();
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<8}", notice.kind.title()), Style::default().fg(color)),
                Span::raw(notice.text.clone()),
                Span::styled(format!("  {age}s ago"), Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();
    f.render_widget(List::new(items).block(titled("Logs")), area);
}

fn draw_menu(f: &mut Frame, items: &[MenuItem], selected: usize) {
    let area = f.area();
    let rect = Rect {
        x: area.width.saturating_sub(22),
        y: 1,
        width: 20u16.min(area.width),
        height: (items.len() as u16 + 2).min(area.height),
    };
    let entries: Vec<ListItem> = items
        .iter()
        .map(|item| {
            ListItem::new(match item {
                MenuItem::Dashboard => "Dashboard",
                MenuItem::Chat => "Chat",
                MenuItem::Logout => "Logout",
            })
        })
        .collect();
    let mut state = ListState::default();
    state.select(Some(selected));
    f.render_widget(Clear, rect);
    f.render_stateful_widget(
        List::new(entries)
            .block(titled("Menu"))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED)),
        rect,
        &mut state,
    );
}

fn notice_color(kind: NoticeKind) -> Color {
    match kind {
        NoticeKind::Success => Color::Green,
        NoticeKind::Error => Color::Red,
    }
}

fn draw_notice(f: &mut Frame, notice: &Notice) {
    let area = centered(f.area(), 50, 7);
    let color = notice_color(notice.kind);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(Span::styled(
            notice.kind.title(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
    let body = Paragraph::new(vec![
        Line::from(notice.text.as_str()),
        Line::from(""),
        Line::from(Span::styled("Esc: OK", Style::default().fg(Color::DarkGray))),
    ])
    .block(block)
    .wrap(Wrap { trim: true });
    f.render_widget(Clear, area);
    f.render_widget(body, area);
}
