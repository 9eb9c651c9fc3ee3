//! Terminal-level view state: enumerated flags, integers, and strings.

/// Boolean view modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewFlag {
    ShowCursor,
    BlinkCursor,
    ReportFocus,
    BracketedPaste,
    AppCursorKeys,
    AppKeypad,
}

impl ViewFlag {
    pub(crate) const COUNT: usize = 6;

    fn index(self) -> usize {
        match self {
            ViewFlag::ShowCursor => 0,
            ViewFlag::BlinkCursor => 1,
            ViewFlag::ReportFocus => 2,
            ViewFlag::BracketedPaste => 3,
            ViewFlag::AppCursorKeys => 4,
            ViewFlag::AppKeypad => 5,
        }
    }
}

/// Integer view modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewInt {
    MouseMode,
    MouseEncoding,
    ModifyOtherKeys,
}

impl ViewInt {
    pub(crate) const COUNT: usize = 3;

    fn index(self) -> usize {
        match self {
            ViewInt::MouseMode => 0,
            ViewInt::MouseEncoding => 1,
            ViewInt::ModifyOtherKeys => 2,
        }
    }
}

/// String view values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewString {
    WindowTitle,
    CurrentDirectory,
    CurrentFile,
}

impl ViewString {
    pub(crate) const COUNT: usize = 3;

    fn index(self) -> usize {
        match self {
            ViewString::WindowTitle => 0,
            ViewString::CurrentDirectory => 1,
            ViewString::CurrentFile => 2,
        }
    }
}

/// Mouse reporting modes, ordered by how much they report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum MouseMode {
    #[default]
    None,
    Press,
    PressRelease,
    PressReleaseMove,
    PressReleaseMoveAll,
}

impl MouseMode {
    pub(crate) fn from_int(v: i32) -> Self {
        match v {
            1 => MouseMode::Press,
            2 => MouseMode::PressRelease,
            3 => MouseMode::PressReleaseMove,
            4 => MouseMode::PressReleaseMoveAll,
            _ => MouseMode::None,
        }
    }

    pub(crate) fn as_int(self) -> i32 {
        match self {
            MouseMode::None => 0,
            MouseMode::Press => 1,
            MouseMode::PressRelease => 2,
            MouseMode::PressReleaseMove => 3,
            MouseMode::PressReleaseMoveAll => 4,
        }
    }
}

/// Outbound mouse report encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseEncoding {
    #[default]
    X10,
    Utf8,
    Sgr,
}

impl MouseEncoding {
    pub(crate) fn from_int(v: i32) -> Self {
        match v {
            1 => MouseEncoding::Utf8,
            2 => MouseEncoding::Sgr,
            _ => MouseEncoding::X10,
        }
    }

    pub(crate) fn as_int(self) -> i32 {
        match self {
            MouseEncoding::X10 => 0,
            MouseEncoding::Utf8 => 1,
            MouseEncoding::Sgr => 2,
        }
    }
}

/// Plain storage for the view state. Change notification is the owner's
/// concern; setters report whether the value actually changed.
#[derive(Debug, Clone, Default)]
pub(crate) struct ViewState {
    flags: [bool; ViewFlag::COUNT],
    ints: [i32; ViewInt::COUNT],
    strings: [String; ViewString::COUNT],
}

impl ViewState {
    pub(crate) fn flag(&self, flag: ViewFlag) -> bool {
        self.flags[flag.index()]
    }

    pub(crate) fn set_flag(&mut self, flag: ViewFlag, value: bool) {
        self.flags[flag.index()] = value;
    }

    pub(crate) fn int(&self, flag: ViewInt) -> i32 {
        self.ints[flag.index()]
    }

    pub(crate) fn set_int(&mut self, flag: ViewInt, value: i32) {
        self.ints[flag.index()] = value;
    }

    pub(crate) fn string(&self, flag: ViewString) -> &str {
        &self.strings[flag.index()]
    }

    pub(crate) fn set_string(&mut self, flag: ViewString, value: String) {
        self.strings[flag.index()] = value;
    }
}
