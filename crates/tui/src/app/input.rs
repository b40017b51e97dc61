use anyhow::Result;
use campus_core::{models::EntityKind, routes::Route};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::{
    screens::{each_list, EntityList, FormSlot, Screen},
    CampusApp,
};

impl CampusApp {
    pub(super) fn handle_input(&mut self, event: Event) -> Result<()> {
        let Event::Key(key) = event else {
            return Ok(());
        };
        if key.kind == KeyEventKind::Release {
            return Ok(());
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return Ok(());
        }
        if !self.pending_confirms.is_empty() {
            self.handle_confirm_key(key);
            return Ok(());
        }
        match self.screen {
            Screen::Login(_) => self.handle_login_key(key),
            Screen::List(_) => self.handle_list_key(key),
            Screen::Detail(_) => self.handle_detail_key(key),
            Screen::Form(_) => self.handle_form_key(key),
        }
        Ok(())
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        let answer = match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => true,
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => false,
            _ => return,
        };
        if let Some(request) = self.pending_confirms.pop_front() {
            request.resolve(answer);
        }
    }

    /// Keys shared by the list and detail screens. Returns true if consumed.
    fn handle_navigation_key(&mut self, key: KeyEvent) -> bool {
        if !(key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT) {
            return false;
        }
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('L') => self.logout(),
            KeyCode::Char(digit @ '1'..='4') => {
                let index = digit as usize - '1' as usize;
                self.navigate(Route::List(EntityKind::ALL[index]));
            }
            _ => return false,
        }
        true
    }

    fn handle_login_key(&mut self, key: KeyEvent) {
        let Screen::Login(login) = &mut self.screen else {
            return;
        };
        match key.code {
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Down | KeyCode::Up => {
                login.focus = 1 - login.focus;
            }
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Enter => {
                if login.focus == 0 {
                    login.focus = 1;
                } else {
                    self.submit_login();
                }
            }
            KeyCode::Backspace => {
                if let Some(field) = login.form.text_fields_mut().into_iter().nth(login.focus) {
                    field.pop();
                }
            }
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                if let Some(field) = login.form.text_fields_mut().into_iter().nth(login.focus) {
                    field.push(ch);
                }
            }
            _ => {}
        }
    }

    fn handle_list_key(&mut self, key: KeyEvent) {
        let Screen::List(pane) = &mut self.screen else {
            return;
        };

        if pane.searching {
            match key.code {
                KeyCode::Esc | KeyCode::Enter => pane.searching = false,
                KeyCode::Backspace => {
                    each_list!(&mut pane.list, view => {
                        let mut term = view.search().to_string();
                        term.pop();
                        view.set_search(term);
                    });
                    pane.cursor = 0;
                }
                KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                    each_list!(&mut pane.list, view => {
                        let term = format!("{}{ch}", view.search());
                        view.set_search(term);
                    });
                    pane.cursor = 0;
                }
                _ => {}
            }
            return;
        }

        let kind = pane.kind();
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => pane.move_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => pane.move_cursor(-1),
            KeyCode::Right | KeyCode::PageDown | KeyCode::Char(']') => {
                each_list!(&mut pane.list, view => view.next_page());
                pane.cursor = 0;
            }
            KeyCode::Left | KeyCode::PageUp | KeyCode::Char('[') => {
                each_list!(&mut pane.list, view => view.prev_page());
                pane.cursor = 0;
            }
            KeyCode::Char('/') => {
                pane.searching = true;
                self.set_status("Type to search • Enter done");
            }
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.navigate(Route::List(kind));
            }
            KeyCode::Char('n') => self.navigate(Route::New(kind)),
            KeyCode::Char('e') => {
                if let Some(id) = pane.selected_id() {
                    self.navigate(Route::Edit(kind, id));
                }
            }
            KeyCode::Enter => {
                if let Some(id) = pane.selected_id() {
                    self.navigate(Route::Detail(kind, id));
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => self.delete_selected(),
            _ => {
                self.handle_navigation_key(key);
            }
        }
    }

    fn handle_detail_key(&mut self, key: KeyEvent) {
        let Screen::Detail(pane) = &self.screen else {
            return;
        };
        let (kind, id) = pane.kind_and_id();
        match key.code {
            KeyCode::Esc | KeyCode::Backspace => self.navigate(Route::List(kind)),
            KeyCode::Char('e') => self.navigate(Route::Edit(kind, id)),
            _ => {
                self.handle_navigation_key(key);
            }
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        let Screen::Form(pane) = &mut self.screen else {
            return;
        };
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if key.code == KeyCode::Char('s') {
                self.submit_current_form();
            }
            return;
        }

        match key.code {
            KeyCode::Esc => {
                let kind = pane.kind();
                let back = match pane.mode().id() {
                    Some(id) => Route::Detail(kind, id),
                    None => Route::List(kind),
                };
                self.navigate(back);
            }
            KeyCode::Tab => pane.cycle_focus(true),
            KeyCode::BackTab => pane.cycle_focus(false),
            code => match (pane.focused(), code) {
                (FormSlot::Text(index), KeyCode::Backspace) => {
                    if let Some(field) = pane.text_field_mut(index) {
                        field.pop();
                    }
                }
                (FormSlot::Text(index), KeyCode::Char(ch)) => {
                    if let Some(field) = pane.text_field_mut(index) {
                        field.push(ch);
                    }
                }
                (FormSlot::Text(_), KeyCode::Enter) => pane.cycle_focus(true),
                (FormSlot::Course, KeyCode::Right | KeyCode::Char(' ')) => pane.cycle_course(true),
                (FormSlot::Course, KeyCode::Left) => pane.cycle_course(false),
                (FormSlot::Lecturer, KeyCode::Right | KeyCode::Char(' ')) => {
                    pane.cycle_lecturer(true)
                }
                (FormSlot::Lecturer, KeyCode::Left) => pane.cycle_lecturer(false),
                (FormSlot::Picker, KeyCode::Down | KeyCode::Char('j')) => pane.move_picker(1),
                (FormSlot::Picker, KeyCode::Up | KeyCode::Char('k')) => pane.move_picker(-1),
                (FormSlot::Picker, KeyCode::Char(' ') | KeyCode::Enter) => pane.toggle_picker(),
                _ => {}
            },
        }
    }
}
