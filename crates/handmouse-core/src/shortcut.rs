//! Keyboard chord recognition and command dispatch.
//!
//! Each key press is handled on its own: the active modifiers and the primary
//! key are folded into one canonical chord string (`Ctrl`, `Shift`, `Alt`, in
//! that order, then the key name exactly as reported) and looked up in the
//! shortcut table. A hit suppresses the key's default behaviour and runs the
//! command; a miss leaves the key alone so ordinary typing keeps working.

use std::collections::HashMap;
use std::sync::mpsc::Sender;

use log::debug;
use serde::{Deserialize, Serialize};

/// A zero-argument command bound to a chord.
pub type Command = Box<dyn FnMut()>;

// ---------------------------------------------------------------------------
// KeyChord
// ---------------------------------------------------------------------------

/// A simultaneous key combination: modifier flags plus one primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct KeyChord {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub key: String,
}

impl KeyChord {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt = true;
        self
    }

    /// `"Ctrl+Shift+Alt+<Key>"` with only the active modifiers present.
    pub fn canonical(&self) -> String {
        let mut out = String::with_capacity(self.key.len() + 15);
        if self.ctrl {
            out.push_str("Ctrl+");
        }
        if self.shift {
            out.push_str("Shift+");
        }
        if self.alt {
            out.push_str("Alt+");
        }
        out.push_str(&self.key);
        out
    }
}

impl std::fmt::Display for KeyChord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseChordError {
    #[error("chord '{0}' has no key")]
    EmptyKey(String),
    #[error("unknown modifier '{modifier}' in chord '{chord}'")]
    UnknownModifier { chord: String, modifier: String },
}

impl std::str::FromStr for KeyChord {
    type Err = ParseChordError;

    /// Parse a chord written with `+` separators. Modifiers may appear in any
    /// order and case (`"shift+ctrl+R"`); the key name is kept verbatim.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (mods, key) = if s == "+" {
            ("", "+")
        } else if let Some(mods) = s.strip_suffix("++") {
            (mods, "+")
        } else {
            match s.rsplit_once('+') {
                Some((mods, key)) => (mods, key),
                None => ("", s),
            }
        };

        if key.is_empty() {
            return Err(ParseChordError::EmptyKey(s.to_string()));
        }

        let mut chord = KeyChord::new(key);
        for modifier in mods.split('+').filter(|m| !m.is_empty()) {
            match modifier.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => chord.ctrl = true,
                "shift" => chord.shift = true,
                "alt" | "option" => chord.alt = true,
                _ => {
                    return Err(ParseChordError::UnknownModifier {
                        chord: s.to_string(),
                        modifier: modifier.to_string(),
                    });
                }
            }
        }
        Ok(chord)
    }
}

// ---------------------------------------------------------------------------
// KeyPress
// ---------------------------------------------------------------------------

/// One key-press event as delivered by the input subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyPress {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    /// Key name as reported (`"r"`, `"R"`, `"Escape"`, `"Space"`, ...).
    pub key: String,
    default_prevented: bool,
}

impl KeyPress {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn with_modifiers(mut self, ctrl: bool, shift: bool, alt: bool) -> Self {
        self.ctrl = ctrl;
        self.shift = shift;
        self.alt = alt;
        self
    }

    pub fn chord(&self) -> KeyChord {
        KeyChord {
            ctrl: self.ctrl,
            shift: self.shift,
            alt: self.alt,
            key: self.key.clone(),
        }
    }

    /// Stop the host from applying the key's default behaviour.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }
}

// ---------------------------------------------------------------------------
// EngineCommand
// ---------------------------------------------------------------------------

/// Commands the dashboard can send to the tracking engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineCommand {
    ToggleTracking,
    Recalibrate,
    SaveSettings,
    StopEngine,
}

impl EngineCommand {
    pub const ALL: [EngineCommand; 4] = [
        EngineCommand::ToggleTracking,
        EngineCommand::Recalibrate,
        EngineCommand::SaveSettings,
        EngineCommand::StopEngine,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::ToggleTracking => "toggle_tracking",
            Self::Recalibrate => "recalibrate",
            Self::SaveSettings => "save_settings",
            Self::StopEngine => "stop_engine",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::ToggleTracking => "toggle tracking",
            Self::Recalibrate => "recalibrate",
            Self::SaveSettings => "save settings",
            Self::StopEngine => "stop engine",
        }
    }

    /// The chord this command is bound to out of the box.
    pub fn default_chord(self) -> &'static str {
        match self {
            Self::ToggleTracking => "Ctrl+Space",
            Self::Recalibrate => "Ctrl+R",
            Self::SaveSettings => "Ctrl+S",
            Self::StopEngine => "Escape",
        }
    }
}

impl std::fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// ShortcutDispatcher
// ---------------------------------------------------------------------------

/// Outcome of [`ShortcutDispatcher::handle_key_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A command ran and the key's default behaviour was suppressed.
    Handled,
    /// No chord matched; the key is the host's to handle.
    PassThrough,
}

/// Maps canonical chord strings to commands.
#[derive(Default)]
pub struct ShortcutDispatcher {
    table: HashMap<String, Command>,
}

impl ShortcutDispatcher {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The default engine bindings, each forwarding its [`EngineCommand`]
    /// over `commands`.
    pub fn with_engine_commands(commands: Sender<EngineCommand>) -> Self {
        let mut dispatcher = Self::new();
        for command in EngineCommand::ALL {
            dispatcher.register_engine_command(command.default_chord(), command, commands.clone());
        }
        dispatcher
    }

    /// Bind `chord` to sending `command` over `sink`.
    pub fn register_engine_command(
        &mut self,
        chord: impl Into<String>,
        command: EngineCommand,
        sink: Sender<EngineCommand>,
    ) -> Option<Command> {
        self.register_shortcut(chord, move || {
            if sink.send(command).is_err() {
                debug!("engine command '{command}' dropped: receiver gone");
            }
        })
    }

    /// Insert or overwrite the command for `chord`. The chord string must
    /// already be canonical; see [`register`](Self::register) otherwise.
    ///
    /// Returns the command previously bound to the chord.
    pub fn register_shortcut(
        &mut self,
        chord: impl Into<String>,
        command: impl FnMut() + 'static,
    ) -> Option<Command> {
        self.table.insert(chord.into(), Box::new(command))
    }

    /// Insert or overwrite the command for a structured chord.
    pub fn register(&mut self, chord: &KeyChord, command: impl FnMut() + 'static) -> Option<Command> {
        self.register_shortcut(chord.canonical(), command)
    }

    pub fn unregister(&mut self, chord: &str) -> Option<Command> {
        self.table.remove(chord)
    }

    pub fn contains(&self, chord: &str) -> bool {
        self.table.contains_key(chord)
    }

    /// Registered chords, in no particular order.
    pub fn chords(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Run the command bound to `event`'s chord, if any.
    ///
    /// On a hit the event's default behaviour is suppressed before the command
    /// runs, exactly once, before this returns. On a miss the event is not
    /// touched.
    pub fn handle_key_event(&mut self, event: &mut KeyPress) -> Dispatch {
        let chord = event.chord().canonical();
        match self.table.get_mut(&chord) {
            Some(command) => {
                event.prevent_default();
                debug!("shortcut {chord}");
                command();
                Dispatch::Handled
            }
            None => Dispatch::PassThrough,
        }
    }
}

impl std::fmt::Debug for ShortcutDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut chords: Vec<&str> = self.chords().collect();
        chords.sort_unstable();
        f.debug_struct("ShortcutDispatcher")
            .field("chords", &chords)
            .finish()
    }
}
