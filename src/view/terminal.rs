use crossterm::cursor::{Hide, Show};
use crossterm::event::{
    DisableBracketedPaste, EnableBracketedPaste, Event, EventStream, KeyCode, KeyEvent,
    KeyEventKind, KeyModifiers,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, Clear as TermClear, ClearType, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use futures_util::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout, Write};
use std::sync::{Arc, Mutex};

use crate::channel::Channel;
use crate::view::binding::ViewBinding;
use crate::view::render::draw;
use crate::view::state::ViewIntent;

pub struct TerminalGuard {
    cleanup: Arc<Mutex<Option<Box<dyn FnOnce() + Send + 'static>>>>,
}

impl TerminalGuard {
    fn new() -> Self {
        Self {
            cleanup: Arc::new(Mutex::new(None)),
        }
    }

    fn set_cleanup<F: FnOnce() + Send + 'static>(&self, cleanup: F) {
        if let Ok(mut slot) = self.cleanup.lock() {
            *slot = Some(Box::new(cleanup));
        }
    }

    fn install_panic_hook(&self) {
        let cleanup = Arc::clone(&self.cleanup);
        let default_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if let Ok(mut slot) = cleanup.lock() {
                if let Some(cleanup) = slot.take() {
                    cleanup();
                }
            }
            default_hook(info);
        }));
    }

    fn restore(&self) {
        if let Ok(mut slot) = self.cleanup.lock() {
            if let Some(cleanup) = slot.take() {
                cleanup();
            }
        }
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

pub fn setup_terminal() -> io::Result<(Terminal<CrosstermBackend<Stdout>>, TerminalGuard)> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    stdout.execute(EnableBracketedPaste)?;
    stdout.execute(TermClear(ClearType::All))?;
    stdout.flush()?;
    stdout.execute(Hide)?;

    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    let guard = TerminalGuard::new();
    guard.set_cleanup(|| {
        let _ = disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = stdout.execute(DisableBracketedPaste);
        let _ = stdout.execute(LeaveAlternateScreen);
        let _ = stdout.execute(Show);
    });
    guard.install_panic_hook();

    Ok((terminal, guard))
}

/// Map one key press to a view intent.
pub fn key_intent(key: KeyEvent) -> Option<ViewIntent> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') | KeyCode::Char('q') if ctrl => Some(ViewIntent::Quit),
        KeyCode::Esc => Some(ViewIntent::Quit),
        KeyCode::Enter => Some(ViewIntent::Submit),
        KeyCode::Backspace => Some(ViewIntent::Backspace),
        KeyCode::Char(c) if !ctrl => Some(ViewIntent::Input(c)),
        _ => None,
    }
}

fn event_intents(event: Event) -> Vec<ViewIntent> {
    match event {
        Event::Key(key) => key_intent(key).into_iter().collect(),
        Event::Paste(text) => text
            .chars()
            .filter(|c| !c.is_control())
            .map(ViewIntent::Input)
            .collect(),
        _ => Vec::new(),
    }
}

/// Run the interactive form until the user quits.
///
/// Redraws after every keyboard event, broadcast and status change.
pub async fn run(channel: &Channel, mut binding: ViewBinding) -> io::Result<()> {
    let (mut terminal, guard) = setup_terminal()?;
    let mut events = EventStream::new();
    let mut status = channel.status_receiver();

    loop {
        terminal.draw(|frame| draw(frame, binding.state()))?;
        if binding.state().quit {
            break;
        }

        let intents = tokio::select! {
            event = events.next() => match event {
                Some(Ok(event)) => event_intents(event),
                Some(Err(e)) => {
                    tracing::error!(error = %e, "Terminal event stream failed");
                    return Err(e);
                }
                None => break,
            },
            intent = binding.next_intent() => intent.into_iter().collect(),
            changed = status.changed() => match changed {
                Ok(()) => vec![ViewIntent::Connection(*status.borrow_and_update())],
                Err(_) => break,
            },
        };

        for intent in intents {
            binding.apply(intent);
        }
    }

    binding.unbind(channel);
    drop(guard);
    Ok(())
}
