// src/watch/event.rs

use std::path::PathBuf;

use notify::EventKind;
use notify::event::{ModifyKind, RenameMode};

/// What happened to a watched path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchEventKind {
    /// Created or modified.
    Changed,
    /// Removed or renamed away.
    Deleted,
}

/// A single filesystem change, as seen by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    pub path: PathBuf,
}

impl WatchEvent {
    pub fn changed(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: WatchEventKind::Changed,
            path: path.into(),
        }
    }

    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: WatchEventKind::Deleted,
            path: path.into(),
        }
    }
}

/// Translate a `notify` event. Access and unknown events yield nothing.
pub fn from_notify(event: &notify::Event) -> Vec<WatchEvent> {
    let paths = event.paths.iter().cloned();
    match event.kind {
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            paths.map(WatchEvent::deleted).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            // paths = [from, to]
            let mut out = Vec::new();
            if let Some(from) = event.paths.first() {
                out.push(WatchEvent::deleted(from.clone()));
            }
            if let Some(to) = event.paths.get(1) {
                out.push(WatchEvent::changed(to.clone()));
            }
            out
        }
        EventKind::Create(_) | EventKind::Modify(_) => paths.map(WatchEvent::changed).collect(),
        EventKind::Remove(_) => paths.map(WatchEvent::deleted).collect(),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, RemoveKind};

    #[test]
    fn maps_notify_kinds() {
        let created = notify::Event::new(EventKind::Create(CreateKind::File)).add_path("/p/a.js".into());
        assert_eq!(from_notify(&created), vec![WatchEvent::changed("/p/a.js")]);

        let removed = notify::Event::new(EventKind::Remove(RemoveKind::File)).add_path("/p/a.js".into());
        assert_eq!(from_notify(&removed), vec![WatchEvent::deleted("/p/a.js")]);

        let renamed = notify::Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path("/p/a.js".into())
            .add_path("/p/b.js".into());
        assert_eq!(
            from_notify(&renamed),
            vec![WatchEvent::deleted("/p/a.js"), WatchEvent::changed("/p/b.js")]
        );
    }
}
