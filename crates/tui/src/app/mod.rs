mod input;
mod screens;
mod ui;

use std::{
    collections::VecDeque,
    future::Future,
    io, thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use campus_core::{
    api::{CourseRequest, LecturerRequest, StudentRequest, SubjectRequest},
    config::AppConfig,
    error::ApiError,
    models::{Course, EntityId, EntityKind, Lecturer, Student, Subject},
    notifications::{ConfirmListener, ConfirmRequest, Notice, NotificationBus, Toast},
    routes::{guard, Route},
    views::{
        delete_with_confirmation, submit_form, DeleteOutcome, EntityForm, FormMode, ListView,
        ViewLifecycle, ViewTicket, LOGIN_FALLBACK,
    },
    ApiClient,
};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use screens::{
    selected_record, DetailPane, EntityFormKind, FormPane, ListPane, Listed, LoginScreen, Screen,
};

const TICK_RATE: Duration = Duration::from_millis(250);

type Update = Box<dyn FnOnce(&mut CampusApp) + Send>;

enum AppEvent {
    Input(Event),
    Tick,
    /// Result of background work, applied only if its view is still active.
    Update(ViewTicket, Update),
}

/// High-level application state for the records console.
pub struct CampusApp {
    api: ApiClient,
    bus: NotificationBus,
    confirms: ConfirmListener,
    notices: broadcast::Receiver<Notice>,
    page_size: usize,
    home: Route,
    lifecycle: ViewLifecycle,
    ticket: ViewTicket,
    route: Route,
    screen: Screen,
    toast: Toast,
    pending_confirms: VecDeque<ConfirmRequest>,
    status: String,
    event_tx: Option<mpsc::Sender<AppEvent>>,
    should_quit: bool,
}

impl CampusApp {
    pub fn new(
        config: &AppConfig,
        api: ApiClient,
        bus: NotificationBus,
        confirms: ConfirmListener,
    ) -> Self {
        let notices = bus.subscribe();
        let home = match Route::parse(&config.start_page) {
            Some(route) if route.requires_session() => route,
            _ => {
                warn!(start_page = %config.start_page, "Unusable start page; using the dashboard");
                Route::DASHBOARD
            }
        };
        let lifecycle = ViewLifecycle::new();
        let ticket = lifecycle.activate();
        Self {
            api,
            bus,
            confirms,
            notices,
            page_size: config.page_size,
            home,
            lifecycle,
            ticket,
            route: Route::Login,
            screen: Screen::Login(LoginScreen::default()),
            toast: Toast::new(config.toast_duration()),
            pending_confirms: VecDeque::new(),
            status: "Ready".to_string(),
            event_tx: None,
            should_quit: false,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx.clone());
        self.event_tx = Some(event_tx);

        self.navigate(self.home);

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.should_quit {
                break;
            }

            tokio::select! {
                maybe_event = event_rx.recv() => {
                    if !self.process_app_event(maybe_event) {
                        break;
                    }
                }
                notice = self.notices.recv() => self.handle_notice(notice),
                Some(request) = self.confirms.recv() => {
                    debug!(id = request.id(), "Confirmation queued");
                    self.pending_confirms.push_back(request);
                }
            }

            self.enforce_guard();
        }

        // Unanswered questions resolve to "no" so their tasks can finish.
        self.pending_confirms.clear();
        restore_terminal(&mut terminal)?;
        self.event_tx = None;
        Ok(())
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(event)) => {
                if let Err(err) = self.handle_input(event) {
                    self.set_status(format!("Error: {err}"));
                }
                true
            }
            Some(AppEvent::Tick) => {
                self.toast.expire(Instant::now());
                true
            }
            Some(AppEvent::Update(ticket, update)) => {
                if ticket.is_current() {
                    update(self);
                } else {
                    debug!("Dropping result for a view that is no longer active");
                }
                true
            }
            None => false,
        }
    }

    fn handle_notice(&mut self, notice: Result<Notice, broadcast::error::RecvError>) {
        match notice {
            Ok(notice) => self.toast.show(notice, Instant::now()),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Notice subscriber lagged");
            }
            Err(broadcast::error::RecvError::Closed) => {}
        }
    }

    fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    /// Re-check the current route against the session; a 401 anywhere lands here.
    fn enforce_guard(&mut self) {
        let target = guard(self.route, self.api.session());
        if target != self.route {
            info!(from = %self.route, to = %target, "Route guard redirect");
            self.navigate(target);
        }
    }

    /// Tear down the current view and activate the one for `route`.
    fn navigate(&mut self, route: Route) {
        let route = guard(route, self.api.session());
        self.route = route;
        self.ticket = self.lifecycle.activate();
        let ticket = self.ticket.clone();
        info!(route = %route, "Navigate");

        match route {
            Route::Login => {
                self.screen = Screen::Login(LoginScreen::default());
                self.set_status("Sign in to continue");
            }
            Route::List(kind) => {
                self.screen = Screen::List(ListPane::new(kind, self.page_size));
                self.set_status(format!("{} • / search • n new • Enter open", kind.title()));
                self.load_list(kind, ticket);
            }
            Route::Detail(kind, id) => {
                self.screen = Screen::Detail(DetailPane::new(kind, id));
                self.set_status("e edit • Esc back");
                self.load_detail(kind, id, ticket);
            }
            Route::New(kind) => {
                self.screen = Screen::Form(FormPane::new(kind, FormMode::New));
                self.set_status("Tab next field • Ctrl-S save • Esc cancel");
                self.load_form(kind, FormMode::New, ticket);
            }
            Route::Edit(kind, id) => {
                self.screen = Screen::Form(FormPane::new(kind, FormMode::Edit(id)));
                self.set_status("Tab next field • Ctrl-S save • Esc cancel");
                self.load_form(kind, FormMode::Edit(id), ticket);
            }
        }
    }

    /// Run `work` in the background and apply its output with `apply` if the
    /// issuing view is still active when it finishes.
    fn spawn_fetch<T, F, A>(&self, ticket: ViewTicket, work: F, apply: A)
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
        A: FnOnce(&mut CampusApp, T) + Send + 'static,
    {
        let Some(sender) = self.event_tx.clone() else {
            warn!("Background work requested before the event loop started");
            return;
        };
        tokio::spawn(async move {
            let value = work.await;
            let update: Update = Box::new(move |app: &mut CampusApp| apply(app, value));
            if sender.send(AppEvent::Update(ticket, update)).await.is_err() {
                debug!("Event loop closed before background work finished");
            }
        });
    }

    fn load_list(&self, kind: EntityKind, ticket: ViewTicket) {
        match kind {
            EntityKind::Student => self.load_list_of::<Student>(ticket),
            EntityKind::Course => self.load_list_of::<Course>(ticket),
            EntityKind::Lecturer => self.load_list_of::<Lecturer>(ticket),
            EntityKind::Subject => self.load_list_of::<Subject>(ticket),
        }
    }

    fn load_list_of<R: Listed>(&self, ticket: ViewTicket) {
        let client = self.api.resource::<R>();
        self.spawn_fetch(ticket, async move { client.list().await }, |app, result| {
            if let Some(view) = app.list_view_mut::<R>() {
                view.apply_loaded(result);
            }
            app.after_list_change();
        });
    }

    fn list_view_mut<R: Listed>(&mut self) -> Option<&mut ListView<R>> {
        match &mut self.screen {
            Screen::List(pane) => R::view_mut(&mut pane.list),
            _ => None,
        }
    }

    fn after_list_change(&mut self) {
        if let Screen::List(pane) = &mut self.screen {
            pane.clamp_cursor();
        }
    }

    fn load_detail(&self, kind: EntityKind, id: EntityId, ticket: ViewTicket) {
        let api = self.api.clone();
        match kind {
            EntityKind::Student => self.spawn_fetch(
                ticket,
                async move { api.students().get(id).await },
                |app, result| {
                    if let Screen::Detail(DetailPane::Student(view)) = &mut app.screen {
                        view.apply_loaded(result);
                    }
                },
            ),
            EntityKind::Course => self.spawn_fetch(
                ticket,
                async move { api.courses().get(id).await },
                |app, result| {
                    if let Screen::Detail(DetailPane::Course(view)) = &mut app.screen {
                        view.apply_loaded(result);
                    }
                },
            ),
            EntityKind::Lecturer => self.spawn_fetch(
                ticket,
                async move { api.lecturers().get(id).await },
                |app, result| {
                    if let Screen::Detail(DetailPane::Lecturer(view)) = &mut app.screen {
                        view.apply_loaded(result);
                    }
                },
            ),
            EntityKind::Subject => self.spawn_fetch(
                ticket,
                async move { api.subjects().get(id).await },
                |app, result| {
                    if let Screen::Detail(DetailPane::Subject(view)) = &mut app.screen {
                        view.apply_loaded(result);
                    }
                },
            ),
        }
    }

    fn form_mut(&mut self) -> Option<&mut EntityFormKind> {
        match &mut self.screen {
            Screen::Form(pane) => Some(&mut pane.form),
            _ => None,
        }
    }

    /// Issue the parallel fetches a form needs. Each writes a disjoint part
    /// of the form, so they may complete in any order.
    fn load_form(&self, kind: EntityKind, mode: FormMode, ticket: ViewTicket) {
        let api = self.api.clone();
        match kind {
            EntityKind::Student => {
                let courses = api.courses();
                self.spawn_fetch(
                    ticket.clone(),
                    async move { courses.list().await },
                    |app, result| {
                        if let Some(courses) = app.loaded("courses", result) {
                            if let Some(EntityFormKind::Student(form)) = app.form_mut() {
                                form.set_courses(courses);
                            }
                        }
                    },
                );
                let subjects = api.subjects();
                self.spawn_fetch(
                    ticket.clone(),
                    async move { subjects.list().await },
                    |app, result| {
                        if let Some(subjects) = app.loaded("subjects", result) {
                            if let Some(EntityFormKind::Student(form)) = app.form_mut() {
                                form.subjects.set_candidates(subjects);
                            }
                        }
                    },
                );
                if let FormMode::Edit(id) = mode {
                    let students = api.students();
                    self.spawn_fetch(ticket, async move { students.get(id).await }, |app, result| {
                        if let Some(detail) = app.loaded("student", result) {
                            if let Some(EntityFormKind::Student(form)) = app.form_mut() {
                                form.apply_detail(&detail);
                            }
                        }
                    });
                }
            }
            EntityKind::Subject => {
                let courses = api.courses();
                self.spawn_fetch(
                    ticket.clone(),
                    async move { courses.list().await },
                    |app, result| {
                        if let Some(courses) = app.loaded("courses", result) {
                            if let Some(EntityFormKind::Subject(form)) = app.form_mut() {
                                form.set_courses(courses);
                            }
                        }
                    },
                );
                let lecturers = api.lecturers();
                self.spawn_fetch(
                    ticket.clone(),
                    async move { lecturers.list().await },
                    |app, result| {
                        if let Some(lecturers) = app.loaded("lecturers", result) {
                            if let Some(EntityFormKind::Subject(form)) = app.form_mut() {
                                form.set_lecturers(lecturers);
                            }
                        }
                    },
                );
                let students = api.students();
                self.spawn_fetch(
                    ticket.clone(),
                    async move { students.list().await },
                    |app, result| {
                        if let Some(students) = app.loaded("students", result) {
                            if let Some(EntityFormKind::Subject(form)) = app.form_mut() {
                                form.students.set_candidates(students);
                            }
                        }
                    },
                );
                if let FormMode::Edit(id) = mode {
                    let subjects = api.subjects();
                    self.spawn_fetch(ticket, async move { subjects.get(id).await }, |app, result| {
                        if let Some(detail) = app.loaded("subject", result) {
                            if let Some(EntityFormKind::Subject(form)) = app.form_mut() {
                                form.apply_detail(&detail);
                            }
                        }
                    });
                }
            }
            EntityKind::Course => {
                if let FormMode::Edit(id) = mode {
                    let courses = api.courses();
                    self.spawn_fetch(ticket, async move { courses.get(id).await }, |app, result| {
                        if let Some(detail) = app.loaded("course", result) {
                            if let Some(EntityFormKind::Course(form)) = app.form_mut() {
                                form.apply_detail(&detail);
                            }
                        }
                    });
                }
            }
            EntityKind::Lecturer => {
                if let FormMode::Edit(id) = mode {
                    let lecturers = api.lecturers();
                    self.spawn_fetch(ticket, async move { lecturers.get(id).await }, |app, result| {
                        if let Some(detail) = app.loaded("lecturer", result) {
                            if let Some(EntityFormKind::Lecturer(form)) = app.form_mut() {
                                form.apply_detail(&detail);
                            }
                        }
                    });
                }
            }
        }
    }

    /// Unwrap a form prerequisite, reporting failures on the status line.
    fn loaded<T>(&mut self, what: &str, result: Result<T, ApiError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                error!(what, ?err, "Failed to load form data");
                if !err.is_unauthorized() {
                    self.set_status(err.user_message(&format!("Failed to load {what}.")));
                }
                None
            }
        }
    }

    fn submit_login(&mut self) {
        let Screen::Login(login) = &mut self.screen else {
            return;
        };
        if login.busy {
            return;
        }
        let (email, password) = match login.form.credentials() {
            Ok(credentials) => credentials,
            Err(err) => {
                login.error = Some(err.to_string());
                return;
            }
        };
        login.busy = true;
        login.error = None;

        let api = self.api.clone();
        self.spawn_fetch(
            self.ticket.clone(),
            async move { api.login(&email, &password).await },
            |app, result| match result {
                Ok(()) => app.navigate(app.home),
                Err(err) => {
                    warn!(?err, "Login failed");
                    if let Screen::Login(login) = &mut app.screen {
                        login.busy = false;
                        login.error = Some(err.user_message(LOGIN_FALLBACK));
                    }
                }
            },
        );
    }

    fn logout(&mut self) {
        self.api.logout();
        self.bus.info("Signed out");
        self.navigate(Route::Login);
    }

    fn delete_selected(&mut self) {
        let Screen::List(pane) = &mut self.screen else {
            return;
        };
        match pane.kind() {
            EntityKind::Student => {
                let item = selected_record::<Student>(pane);
                self.spawn_delete(item);
            }
            EntityKind::Course => {
                let item = selected_record::<Course>(pane);
                self.spawn_delete(item);
            }
            EntityKind::Lecturer => {
                let item = selected_record::<Lecturer>(pane);
                self.spawn_delete(item);
            }
            EntityKind::Subject => {
                let item = selected_record::<Subject>(pane);
                self.spawn_delete(item);
            }
        }
    }

    fn spawn_delete<R: Listed>(&self, item: Option<R>) {
        let Some(item) = item else {
            return;
        };
        let bus = self.bus.clone();
        let client = self.api.resource::<R>();
        self.spawn_fetch(
            self.ticket.clone(),
            async move { delete_with_confirmation(&bus, &client, &item).await },
            |app, outcome| match outcome {
                DeleteOutcome::Cancelled => app.set_status("Delete cancelled"),
                DeleteOutcome::Deleted(refreshed) => {
                    if let Some(view) = app.list_view_mut::<R>() {
                        view.apply_loaded(refreshed);
                    }
                    app.after_list_change();
                }
                DeleteOutcome::Failed(_) => {}
            },
        );
    }

    fn submit_current_form(&mut self) {
        let Screen::Form(pane) = &mut self.screen else {
            return;
        };
        let mode = pane.mode();
        let kind = pane.kind();
        let prepared = match &pane.form {
            EntityFormKind::Student(form) => form.build_request().map(Prepared::Student),
            EntityFormKind::Course(form) => form.build_request().map(Prepared::Course),
            EntityFormKind::Lecturer(form) => form.build_request().map(Prepared::Lecturer),
            EntityFormKind::Subject(form) => form.build_request().map(Prepared::Subject),
        };
        let prepared = match prepared.and_then(|request| pane.gate.begin().map(|()| request)) {
            Ok(request) => request,
            Err(err) => {
                self.set_status(err.to_string());
                return;
            }
        };
        self.set_status("Saving…");

        match prepared {
            Prepared::Student(request) => self.spawn_submit::<Student>(kind, mode, request),
            Prepared::Course(request) => {
                self.spawn_submit::<Course>(kind, mode, request)
            }
            Prepared::Lecturer(request) => {
                self.spawn_submit::<Lecturer>(kind, mode, request)
            }
            Prepared::Subject(request) => self.spawn_submit::<Subject>(kind, mode, request),
        }
    }

    fn spawn_submit<R: Listed>(
        &self,
        kind: EntityKind,
        mode: FormMode,
        request: R::Request,
    ) {
        let bus = self.bus.clone();
        let client = self.api.resource::<R>();
        self.spawn_fetch(
            self.ticket.clone(),
            async move { submit_form(&bus, &client, mode, &request).await },
            move |app, result| {
                if let Screen::Form(pane) = &mut app.screen {
                    pane.gate.finish();
                }
                match result {
                    Ok(_) => app.navigate(Route::List(kind)),
                    Err(_) => app.set_status("Save failed; fix the form and press Ctrl-S again"),
                }
            },
        );
    }
}

/// A validated request body, tagged by collection.
enum Prepared {
    Student(StudentRequest),
    Course(CourseRequest),
    Lecturer(LecturerRequest),
    Subject(SubjectRequest),
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_core::SessionStore;

    fn app(session: SessionStore, start_page: &str) -> CampusApp {
        let config = AppConfig {
            api_base_url: "http://127.0.0.1:9/api".to_string(),
            session_file: "unused.json".into(),
            page_size: 10,
            toast_seconds: 4,
            request_timeout_secs: 1,
            start_page: start_page.to_string(),
        };
        let api = ApiClient::new(&config.api_base_url, config.request_timeout(), session).unwrap();
        let (bus, confirms) = NotificationBus::new();
        CampusApp::new(&config, api, bus, confirms)
    }

    fn signed_in() -> SessionStore {
        let session = SessionStore::in_memory();
        session.set_token("token").unwrap();
        session
    }

    fn set_status(text: &'static str) -> Update {
        Box::new(move |app: &mut CampusApp| app.set_status(text))
    }

    #[test]
    fn results_for_a_closed_view_are_dropped() {
        let mut app = app(signed_in(), "/dashboard/courses");
        app.navigate(Route::List(EntityKind::Course));
        let stale = app.ticket.clone();

        app.navigate(Route::List(EntityKind::Student));
        assert!(app.process_app_event(Some(AppEvent::Update(stale, set_status("stale")))));
        assert_ne!(app.status, "stale");

        let current = app.ticket.clone();
        assert!(app.process_app_event(Some(AppEvent::Update(current, set_status("fresh")))));
        assert_eq!(app.status, "fresh");

        assert!(!app.process_app_event(None));
    }

    #[test]
    fn lost_session_lands_on_login() {
        let session = signed_in();
        let mut app = app(session.clone(), "/dashboard/courses");
        app.navigate(app.home);
        assert_eq!(app.route, Route::List(EntityKind::Course));

        session.clear().unwrap();
        app.enforce_guard();
        assert_eq!(app.route, Route::Login);
        assert!(matches!(app.screen, Screen::Login(_)));
    }

    #[test]
    fn signed_out_navigation_is_redirected() {
        let mut app = app(SessionStore::in_memory(), "/dashboard");
        app.navigate(Route::Edit(EntityKind::Subject, 3));
        assert_eq!(app.route, Route::Login);
    }

    #[test]
    fn start_page_must_require_a_session() {
        assert_eq!(app(signed_in(), "/login").home, Route::DASHBOARD);
        assert_eq!(app(signed_in(), "/nowhere/else").home, Route::DASHBOARD);
        assert_eq!(
            app(signed_in(), "/dashboard/lecturers").home,
            Route::List(EntityKind::Lecturer)
        );
    }
}
