use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Currently selected tool, shared by every page of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    None,
    Stamp,
    Erase,
}

impl Mode {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "none" => Some(Self::None),
            "stamp" => Some(Self::Stamp),
            "erase" => Some(Self::Erase),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Stamp => "stamp",
            Self::Erase => "erase",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owner of the session-wide mode. Pointer controllers receive a read-only
/// [`ModeHandle`] when they are bound.
#[derive(Debug, Default)]
pub struct ModeController {
    current: Rc<Cell<Mode>>,
}

impl ModeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_mode(&self, mode: Mode) -> Mode {
        self.current.replace(mode)
    }

    pub fn mode(&self) -> Mode {
        self.current.get()
    }

    pub fn handle(&self) -> ModeHandle {
        ModeHandle {
            current: Rc::clone(&self.current),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModeHandle {
    current: Rc<Cell<Mode>>,
}

impl ModeHandle {
    pub fn get(&self) -> Mode {
        self.current.get()
    }
}
