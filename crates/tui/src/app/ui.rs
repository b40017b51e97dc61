use std::time::Instant;

use campus_core::{
    models::{Entity, EntityKind},
    notifications::NoticeKind,
    routes::Route,
    views::{LoadState, TextField},
};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use super::{
    screens::{
        each_list, DetailPane, EntityFormKind, EntityList, FormPane, FormSlot, ListPane,
        LoginScreen, Screen,
    },
    CampusApp,
};

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    selection_bg: Color,
    selection_fg: Color,
    success: Color,
    danger: Color,
    on_accent: Color,
}

const THEME: Theme = Theme {
    primary_fg: Color::White,
    accent: Color::Cyan,
    muted: Color::DarkGray,
    selection_bg: Color::DarkGray,
    selection_fg: Color::White,
    success: Color::Green,
    danger: Color::Red,
    on_accent: Color::Black,
};

impl CampusApp {
    pub(super) fn draw(&self, frame: &mut Frame) {
        let size = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(5),
                Constraint::Length(3),
            ])
            .split(size);

        self.render_tabs(frame, chunks[0]);
        match &self.screen {
            Screen::Login(login) => render_login(frame, chunks[1], login),
            Screen::List(pane) => render_list(frame, chunks[1], pane),
            Screen::Detail(pane) => render_detail(frame, chunks[1], pane),
            Screen::Form(pane) => render_form(frame, chunks[1], pane),
        }
        self.render_status(frame, chunks[2]);
        self.render_toast(frame, chunks[1]);
        self.render_confirm(frame);
    }

    fn render_tabs(&self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![Span::styled(
            " Campus Records ",
            Style::default()
                .fg(THEME.on_accent)
                .bg(THEME.accent)
                .add_modifier(Modifier::BOLD),
        )];
        if self.route != Route::Login {
            let active = self.route.kind();
            for (idx, kind) in EntityKind::ALL.iter().enumerate() {
                let label = format!("  {} {}", idx + 1, kind.title());
                let style = if active == Some(*kind) {
                    Style::default()
                        .fg(THEME.accent)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(THEME.muted)
                };
                spans.push(Span::styled(label, style));
            }
            spans.push(Span::styled("   L logout", Style::default().fg(THEME.muted)));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("Status • {}", self.route));
        let paragraph = Paragraph::new(Line::from(self.status.clone()))
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_toast(&self, frame: &mut Frame, area: Rect) {
        let Some(notice) = self.toast.visible(Instant::now()) else {
            return;
        };
        let color = match notice.kind {
            NoticeKind::Success => THEME.success,
            NoticeKind::Error => THEME.danger,
            NoticeKind::Info => THEME.accent,
        };
        let width = toast_width(&notice.text, area.width);
        let toast_area = Rect::new(
            area.x + area.width.saturating_sub(width),
            area.y,
            width,
            3.min(area.height),
        );
        frame.render_widget(Clear, toast_area);
        let paragraph = Paragraph::new(notice.text.clone())
            .style(Style::default().fg(color))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(color)),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, toast_area);
    }

    fn render_confirm(&self, frame: &mut Frame) {
        let Some(request) = self.pending_confirms.front() else {
            return;
        };
        let area = centered_rect(60, 7, frame.size());
        frame.render_widget(Clear, area);

        let mut lines = vec![
            Line::from(request.message().to_string()),
            Line::from(""),
            Line::from(vec![
                Span::styled("y", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" confirm  "),
                Span::styled("n", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" cancel"),
            ]),
        ];
        let queued = self.pending_confirms.len() - 1;
        if queued > 0 {
            lines.push(Line::from(Span::styled(
                format!("{queued} more waiting"),
                Style::default().fg(THEME.muted),
            )));
        }
        let paragraph = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Confirm")
                    .border_style(Style::default().fg(THEME.danger)),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

fn render_login(frame: &mut Frame, area: Rect, login: &LoginScreen) {
    let box_area = centered_rect(50, 10, area);
    let mut lines: Vec<Line> = login
        .form
        .text_fields()
        .into_iter()
        .enumerate()
        .map(|(idx, field)| field_line(field, login.focus == idx))
        .collect();
    lines.push(Line::from(""));
    if login.busy {
        lines.push(Line::from(Span::styled(
            "Signing in…",
            Style::default().fg(THEME.muted),
        )));
    } else if let Some(error) = &login.error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(THEME.danger),
        )));
    }
    lines.push(Line::from(Span::styled(
        "Tab switch field • Enter sign in • Esc quit",
        Style::default().fg(THEME.muted),
    )));

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Sign in"))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, box_area);
}

fn render_list(frame: &mut Frame, area: Rect, pane: &ListPane) {
    let kind = pane.kind();
    let (rows, state, page, pages, search, matches) = each_list!(&pane.list, view => (
        view.page_items()
            .iter()
            .map(|item| item.columns())
            .collect::<Vec<_>>(),
        view.state().clone(),
        view.page(),
        view.page_count(),
        view.search().to_string(),
        view.filtered().len(),
    ));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    let search_style = if pane.searching {
        Style::default().fg(THEME.accent)
    } else {
        Style::default().fg(THEME.primary_fg)
    };
    let cursor = if pane.searching { "▏" } else { "" };
    let search_line = Paragraph::new(Line::from(vec![
        Span::styled("/ ", Style::default().fg(THEME.muted)),
        Span::styled(format!("{search}{cursor}"), search_style),
    ]))
    .block(Block::default().borders(Borders::ALL).title(format!(
        "Search {} • {matches} match{}",
        kind.title().to_lowercase(),
        if matches == 1 { "" } else { "es" }
    )));
    frame.render_widget(search_line, chunks[0]);

    let title = format!("{} • page {page}/{pages}", kind.title());
    let block = Block::default().borders(Borders::ALL).title(title);
    match state {
        LoadState::Loading => {
            frame.render_widget(Paragraph::new("Loading…").block(block), chunks[1]);
        }
        LoadState::Failed(message) => {
            let text = Paragraph::new(Span::styled(message, Style::default().fg(THEME.danger)))
                .block(block)
                .wrap(Wrap { trim: true });
            frame.render_widget(text, chunks[1]);
        }
        LoadState::Ready if rows.is_empty() => {
            let empty = if search.trim().is_empty() {
                format!("No {} yet. Press n to add one.", kind.title().to_lowercase())
            } else {
                "Nothing matches the search.".to_string()
            };
            frame.render_widget(
                Paragraph::new(Span::styled(empty, Style::default().fg(THEME.muted))).block(block),
                chunks[1],
            );
        }
        LoadState::Ready => {
            let headers = column_headers(kind);
            let widths: Vec<Constraint> = headers
                .iter()
                .map(|_| Constraint::Ratio(1, headers.len() as u32))
                .collect();
            let header = Row::new(headers.iter().map(|title| Cell::from(*title))).style(
                Style::default()
                    .fg(THEME.accent)
                    .add_modifier(Modifier::BOLD),
            );
            let body = rows
                .into_iter()
                .map(|cells| Row::new(cells.into_iter().map(Cell::from)));
            let table = Table::new(body, widths)
                .header(header)
                .block(block)
                .highlight_style(
                    Style::default()
                        .bg(THEME.selection_bg)
                        .fg(THEME.selection_fg)
                        .add_modifier(Modifier::BOLD),
                )
                .highlight_symbol("▶ ");
            let mut table_state = TableState::default();
            table_state.select(Some(pane.cursor));
            frame.render_stateful_widget(table, chunks[1], &mut table_state);
        }
    }
}

fn column_headers(kind: EntityKind) -> &'static [&'static str] {
    match kind {
        EntityKind::Student => &["Name", "Email", "Date of birth"],
        EntityKind::Course => &["Name", "Description"],
        EntityKind::Lecturer => &["Name", "Email"],
        EntityKind::Subject => &["Name", "Description"],
    }
}

fn render_detail(frame: &mut Frame, area: Rect, pane: &DetailPane) {
    let (kind, id) = pane.kind_and_id();
    let (state, lines) = match pane {
        DetailPane::Student(view) => (
            view.state(),
            view.detail().map(|student| {
                let mut lines = vec![
                    heading(format!("{} {}", student.first_name, student.last_name)),
                    labelled("Email", &student.email),
                    labelled("Date of birth", &student.date_of_birth.format("%Y-%m-%d").to_string()),
                    labelled("Course", &student.course.name),
                    Line::from(""),
                    heading("Subjects".to_string()),
                ];
                lines.extend(bullets(student.subjects.iter().map(|subject| subject.name.clone())));
                lines
            }),
        ),
        DetailPane::Course(view) => (
            view.state(),
            view.detail().map(|course| {
                let mut lines = vec![
                    heading(course.name.clone()),
                    labelled("Description", &course.description),
                    Line::from(""),
                    heading(format!("Students ({})", course.students.len())),
                ];
                lines.extend(bullets(course.students.iter().map(|student| {
                    format!("{} {} <{}>", student.first_name, student.last_name, student.email)
                })));
                lines.push(Line::from(""));
                lines.push(heading(format!("Subjects ({})", course.subjects.len())));
                lines.extend(bullets(course.subjects.iter().map(|subject| subject.name.clone())));
                lines
            }),
        ),
        DetailPane::Lecturer(view) => (
            view.state(),
            view.detail().map(|lecturer| {
                let mut lines = vec![
                    heading(format!("{} {}", lecturer.first_name, lecturer.last_name)),
                    labelled("Email", &lecturer.email),
                    Line::from(""),
                    heading("Subjects".to_string()),
                ];
                lines.extend(bullets(lecturer.subjects.iter().map(|subject| {
                    match &subject.course {
                        Some(course) => format!("{} ({})", subject.name, course.name),
                        None => subject.name.clone(),
                    }
                })));
                lines.push(Line::from(""));
                lines.push(heading("Courses".to_string()));
                lines.extend(bullets(lecturer.courses.iter().map(|course| course.name.clone())));
                lines
            }),
        ),
        DetailPane::Subject(view) => (
            view.state(),
            view.detail().map(|subject| {
                let mut lines = vec![
                    heading(subject.name.clone()),
                    labelled("Description", &subject.description),
                    labelled("Course", &subject.course.name),
                    labelled(
                        "Lecturer",
                        &format!(
                            "{} {}",
                            subject.lecturer.first_name, subject.lecturer.last_name
                        ),
                    ),
                    Line::from(""),
                    heading(format!("Students ({})", subject.students.len())),
                ];
                lines.extend(bullets(subject.students.iter().map(|student| {
                    format!("{} {}", student.first_name, student.last_name)
                })));
                lines
            }),
        ),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("{} #{id}", kind.name()));
    let body = match (state, lines) {
        (LoadState::Failed(message), _) => vec![Line::from(Span::styled(
            message.clone(),
            Style::default().fg(THEME.danger),
        ))],
        (_, Some(lines)) => lines,
        (_, None) => vec![Line::from("Loading…")],
    };
    frame.render_widget(
        Paragraph::new(body).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn render_form(frame: &mut Frame, area: Rect, pane: &FormPane) {
    let kind = pane.kind();
    let focused = pane.focused();
    let verb = if pane.mode().is_edit() { "Edit" } else { "New" };

    let mut lines: Vec<Line> = pane
        .text_fields()
        .into_iter()
        .enumerate()
        .map(|(idx, field)| field_line(field, focused == FormSlot::Text(idx)))
        .collect();

    let mut picker: Vec<(i64, String, bool)> = Vec::new();
    match &pane.form {
        EntityFormKind::Student(form) => {
            lines.push(selector_line(
                "Course",
                form.course().and_then(|id| {
                    form.courses()
                        .iter()
                        .find(|course| course.id == id)
                        .map(|course| course.name.clone())
                }),
                focused == FormSlot::Course,
            ));
            picker = form
                .subjects
                .filtered()
                .iter()
                .map(|subject| {
                    (subject.id, subject.name.clone(), form.subjects.is_selected(subject.id))
                })
                .collect();
        }
        EntityFormKind::Subject(form) => {
            lines.push(selector_line(
                "Course",
                form.course().and_then(|id| {
                    form.courses()
                        .iter()
                        .find(|course| course.id == id)
                        .map(|course| course.name.clone())
                }),
                focused == FormSlot::Course,
            ));
            lines.push(selector_line(
                "Lecturer",
                form.lecturer().and_then(|id| {
                    form.lecturers()
                        .iter()
                        .find(|lecturer| lecturer.id == id)
                        .map(|lecturer| lecturer.full_name())
                }),
                focused == FormSlot::Lecturer,
            ));
            picker = form
                .students
                .filtered()
                .iter()
                .map(|student| {
                    (student.id, student.full_name(), form.students.is_selected(student.id))
                })
                .collect();
        }
        EntityFormKind::Course(_) | EntityFormKind::Lecturer(_) => {}
    }

    if matches!(kind, EntityKind::Student | EntityKind::Subject) {
        let title = if kind == EntityKind::Student {
            "Subjects in course"
        } else {
            "Students in course"
        };
        let title_style = if focused == FormSlot::Picker {
            Style::default().fg(THEME.accent).add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(title, title_style)));
        if picker.is_empty() {
            lines.push(Line::from(Span::styled(
                "  (none available for the chosen course)",
                Style::default().fg(THEME.muted),
            )));
        }
        for (idx, (_, name, selected)) in picker.into_iter().enumerate() {
            let mark = if selected { "[x]" } else { "[ ]" };
            let pointer = if focused == FormSlot::Picker && idx == pane.picker_cursor {
                "▶"
            } else {
                " "
            };
            lines.push(Line::from(format!(" {pointer} {mark} {name}")));
        }
    }

    lines.push(Line::from(""));
    let footer = if pane.gate.in_flight() {
        "Saving…"
    } else {
        "Tab/Shift-Tab move • ←/→ choose • Space toggle • Ctrl-S save • Esc cancel"
    };
    lines.push(Line::from(Span::styled(footer, Style::default().fg(THEME.muted))));

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("{verb} {}", kind.label()));
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn field_line(field: &TextField, focused: bool) -> Line<'static> {
    let value = if field.secret {
        "•".repeat(field.value.chars().count())
    } else {
        field.value.clone()
    };
    let label_style = if focused {
        Style::default().fg(THEME.accent).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(THEME.muted)
    };
    let cursor = if focused { "▏" } else { "" };
    Line::from(vec![
        Span::styled(format!("{:>14}: ", field.label), label_style),
        Span::raw(format!("{value}{cursor}")),
    ])
}

fn selector_line(label: &str, value: Option<String>, focused: bool) -> Line<'static> {
    let label_style = if focused {
        Style::default().fg(THEME.accent).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(THEME.muted)
    };
    let value = value.unwrap_or_else(|| "(choose)".to_string());
    Line::from(vec![
        Span::styled(format!("{label:>14}: "), label_style),
        Span::raw(format!("◀ {value} ▶")),
    ])
}

fn heading(text: String) -> Line<'static> {
    Line::from(Span::styled(
        text,
        Style::default()
            .fg(THEME.accent)
            .add_modifier(Modifier::BOLD),
    ))
}

fn labelled(label: &str, value: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label}: "), Style::default().fg(THEME.muted)),
        Span::raw(value.to_string()),
    ])
}

fn bullets(items: impl Iterator<Item = String>) -> Vec<Line<'static>> {
    let lines: Vec<Line<'static>> = items.map(|item| Line::from(format!("  • {item}"))).collect();
    if lines.is_empty() {
        return vec![Line::from(Span::styled(
            "  none",
            Style::default().fg(THEME.muted),
        ))];
    }
    lines
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

/// Banner width for `text` plus borders and padding, kept within `available`.
fn toast_width(text: &str, available: u16) -> u16 {
    u16::try_from(text.chars().count())
        .unwrap_or(u16::MAX)
        .saturating_add(4)
        .min(available)
        .max(12.min(available))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toast_width_fits_short_and_huge_notices() {
        assert_eq!(toast_width("Saved", 80), 12);
        assert_eq!(toast_width("Course deleted successfully", 80), 31);
        let page = "x".repeat(usize::from(u16::MAX) + 10);
        assert_eq!(toast_width(&page, 80), 80);
        assert_eq!(toast_width("", 8), 8);
    }

    #[test]
    fn centered_rect_clamps_to_area() {
        let area = Rect::new(0, 0, 40, 10);
        assert_eq!(centered_rect(20, 4, area), Rect::new(10, 3, 20, 4));
        assert_eq!(centered_rect(100, 100, area), area);
    }
}
