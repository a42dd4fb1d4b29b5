use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use tracing::debug;

use crate::app::App;
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Answer(result) => app.on_answer(result),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        // Quit
        KeyCode::Char('c') if ctrl => app.should_quit = true,
        KeyCode::Esc => app.should_quit = true,

        // Send
        KeyCode::Enter => {
            let shift = key.modifiers.contains(KeyModifiers::SHIFT);
            if !app.submit(shift) {
                debug!(shift, "enter ignored");
            }
        }

        // Half-page scroll
        KeyCode::Char('u') if ctrl => app.scroll_half_page_up(),
        KeyCode::Char('d') if ctrl => app.scroll_half_page_down(),

        // Chat scrolling
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.scroll_up(app.chat_height.max(1)),
        KeyCode::PageDown => app.scroll_down(app.chat_height.max(1)),

        // Input editing
        KeyCode::Backspace => app.conversation.input_mut().backspace(),
        KeyCode::Delete => app.conversation.input_mut().delete(),
        KeyCode::Left => app.conversation.input_mut().move_left(),
        KeyCode::Right => app.conversation.input_mut().move_right(),
        KeyCode::Home => app.conversation.input_mut().move_home(),
        KeyCode::End => app.conversation.input_mut().move_end(),
        KeyCode::Char(c) if !ctrl && !key.modifiers.contains(KeyModifiers::ALT) => {
            app.conversation.input_mut().insert(c);
        }

        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|area| {
            mouse.column >= area.x
                && mouse.column < area.x + area.width
                && mouse.row >= area.y
                && mouse.row < area.y + area.height
        })
        .unwrap_or(false);

    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollUp => app.scroll_up(3),
        MouseEventKind::ScrollDown => app.scroll_down(3),
        _ => {}
    }
}
