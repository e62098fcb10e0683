//! Plain line output for non-interactive use.

use std::future::Future;
use std::io::{self, Write};

use tokio::sync::mpsc;

use crate::channel::{Channel, Update};
use crate::view::state::display_value;

/// Writes the displayed value of each update as one line.
pub struct LinePrinter<W: Write> {
    out: W,
    field: String,
}

impl<W: Write> LinePrinter<W> {
    pub fn new(out: W, field: impl Into<String>) -> Self {
        Self {
            out,
            field: field.into(),
        }
    }

    /// Print `update`. Returns false when it has nothing to display.
    pub fn print(&mut self, update: &Update) -> io::Result<bool> {
        let Some(text) = display_value(&update.value, &self.field) else {
            return Ok(false);
        };
        writeln!(self.out, "{text}")?;
        self.out.flush()?;
        Ok(true)
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

enum Feed {
    Update(Update),
    Reset,
}

/// Print every update for `event` until `shutdown` resolves or the
/// channel closes.
pub async fn watch<W, S>(
    channel: &Channel,
    event: &str,
    printer: &mut LinePrinter<W>,
    shutdown: S,
) -> io::Result<()>
where
    W: Write,
    S: Future<Output = ()>,
{
    let (tx, mut rx) = mpsc::unbounded_channel();
    // Register before seeding; anything queued up to the seed is skipped.
    let mut listeners = Vec::new();
    let updates = tx.clone();
    if let Some(id) = channel.on_update(event, move |update| {
        let _ = updates.send(Feed::Update(update.clone()));
    }) {
        listeners.push(id);
    }
    if let Some(id) = channel.on_reset(move || {
        let _ = tx.send(Feed::Reset);
    }) {
        listeners.push(id);
    }

    let result = print_feed(channel, event, printer, &mut rx, shutdown).await;
    for id in listeners {
        channel.remove_listener(id);
    }
    result
}

async fn print_feed<W, S>(
    channel: &Channel,
    event: &str,
    printer: &mut LinePrinter<W>,
    rx: &mut mpsc::UnboundedReceiver<Feed>,
    shutdown: S,
) -> io::Result<()>
where
    W: Write,
    S: Future<Output = ()>,
{
    let mut seen = 0;
    if let Some(current) = channel.current(event) {
        seen = current.sequence;
        printer.print(&current)?;
    }

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            feed = rx.recv() => match feed {
                Some(Feed::Reset) => seen = 0,
                Some(Feed::Update(update)) if update.sequence <= seen => {}
                Some(Feed::Update(update)) => {
                    seen = update.sequence;
                    printer.print(&update)?;
                }
                None => return Ok(()),
            },
            _ = &mut shutdown => return Ok(()),
        }
    }
}
