//! AppleScript sources and output parsing for Terminal and iTerm2.
//!
//! Everything here is plain text in and out, so it builds and tests on any
//! platform; only the macOS backend actually runs the scripts.

use ar_core::{CandidateSource, FocusHandle};

/// Bundle ids of terminal emulators worth monitoring.
pub const TERMINAL_BUNDLE_IDS: &[&str] = &[
    "com.apple.Terminal",
    "com.googlecode.iterm2",
    "dev.warp.Warp-Stable",
    "co.zeit.hyper",
    "com.github.wez.wezterm",
    "net.kovidgoyal.kitty",
    "io.alacritty",
    "com.tabby.app",
    "com.termius-dmg",
    "com.mitchellh.ghostty",
];

pub fn is_terminal_bundle(bundle_id: &str) -> bool {
    TERMINAL_BUNDLE_IDS.contains(&bundle_id)
}

/// Text of the selected tab/session of the frontmost terminal.
pub const FOCUSED_TEXT_SCRIPT: &str = r#"
tell application "System Events"
    set appName to name of first application process whose frontmost is true
end tell
if appName is "Terminal" then
    tell application "Terminal"
        return contents of selected tab of front window
    end tell
else if appName is "iTerm2" then
    tell application "iTerm2"
        return contents of current session of current tab of current window
    end tell
end if
error "frontmost application is not a scriptable terminal"
"#;

/// One line per tab (Terminal) or session (iTerm2), tab separated.
pub const LIST_TARGETS_SCRIPT: &str = r#"
set sep to character id 9
set nl to character id 10
set output to ""
if application "Terminal" is running then
    tell application "Terminal"
        repeat with w in windows
            set wid to id of w
            set tabIndex to 0
            repeat with t in tabs of w
                set tabIndex to tabIndex + 1
                set output to output & "terminal" & sep & wid & sep & tabIndex & sep & (name of w) & nl
            end repeat
        end repeat
    end tell
end if
if application "iTerm2" is running then
    tell application "iTerm2"
        repeat with w in windows
            set wid to id of w
            repeat with t in tabs of w
                repeat with s in sessions of t
                    set output to output & "iterm" & sep & wid & sep & (id of s) & sep & (name of s) & nl
                end repeat
            end repeat
        end repeat
    end tell
end if
return output
"#;

/// Describes whatever currently has focus in the same line format as
/// [`LIST_TARGETS_SCRIPT`], or `other<TAB>app name`.
pub const FRONT_TARGET_SCRIPT: &str = r#"
set sep to character id 9
tell application "System Events"
    set appName to name of first application process whose frontmost is true
end tell
if appName is "Terminal" then
    tell application "Terminal"
        set w to front window
        set tabIndex to 0
        set i to 0
        repeat with t in tabs of w
            set i to i + 1
            if selected of t then set tabIndex to i
        end repeat
        return "terminal" & sep & (id of w) & sep & tabIndex & sep & (name of w)
    end tell
else if appName is "iTerm2" then
    tell application "iTerm2"
        set w to current window
        set s to current session of current tab of w
        return "iterm" & sep & (id of w) & sep & (id of s) & sep & (name of s)
    end tell
end if
return "other" & sep & appName
"#;

/// A tab or session a script can address directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalTarget {
    Terminal { window_id: String, tab: u32 },
    ITerm { window_id: String, session_id: String },
}

impl TerminalTarget {
    pub fn token(&self) -> String {
        match self {
            TerminalTarget::Terminal { window_id, tab } => format!("terminal:{}:{}", window_id, tab),
            TerminalTarget::ITerm {
                window_id,
                session_id,
            } => format!("iterm:{}:{}", window_id, session_id),
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        let mut parts = token.splitn(3, ':');
        let kind = parts.next()?;
        let window_id = parts.next()?.to_string();
        let rest = parts.next()?;
        match kind {
            "terminal" => Some(TerminalTarget::Terminal {
                window_id,
                tab: rest.parse().ok()?,
            }),
            "iterm" => Some(TerminalTarget::ITerm {
                window_id,
                session_id: rest.to_string(),
            }),
            _ => None,
        }
    }

    pub fn app_name(&self) -> &'static str {
        match self {
            TerminalTarget::Terminal { .. } => "Terminal",
            TerminalTarget::ITerm { .. } => "iTerm2",
        }
    }

    pub fn fetch_script(&self) -> String {
        match self {
            TerminalTarget::Terminal { window_id, tab } => format!(
                "tell application \"Terminal\" to return contents of tab {} of window id {}",
                tab, window_id
            ),
            TerminalTarget::ITerm { session_id, .. } => {
                iterm_session_script(session_id, "return contents of s")
            }
        }
    }

    pub fn select_script(&self) -> String {
        match self {
            TerminalTarget::Terminal { window_id, tab } => format!(
                "tell application \"Terminal\"\n\
                 activate\n\
                 set index of window id {w} to 1\n\
                 set selected of tab {t} of window id {w} to true\n\
                 end tell",
                w = window_id,
                t = tab
            ),
            TerminalTarget::ITerm { session_id, .. } => iterm_session_script(
                session_id,
                "activate\nselect w\ntell t to select\ntell s to select\nreturn",
            ),
        }
    }
}

fn iterm_session_script(session_id: &str, body: &str) -> String {
    format!(
        "tell application \"iTerm2\"\n\
         repeat with w in windows\n\
         repeat with t in tabs of w\n\
         repeat with s in sessions of t\n\
         if id of s is \"{}\" then\n\
         {}\n\
         end if\n\
         end repeat\n\
         end repeat\n\
         end repeat\n\
         end tell\n\
         error \"session not found\"",
        escape(session_id),
        body
    )
}

/// Activates an application by name.
pub fn activate_script(app_name: &str) -> String {
    format!("tell application \"{}\" to activate", escape(app_name))
}

/// Escapes a value for use inside an AppleScript string literal.
pub fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// A parsed line of [`LIST_TARGETS_SCRIPT`] or [`FRONT_TARGET_SCRIPT`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetLine {
    pub target: TerminalTarget,
    pub name: String,
}

impl TargetLine {
    pub fn to_candidate(&self) -> CandidateSource {
        let token = self.target.token();
        CandidateSource {
            source_id: token.clone(),
            display_name: format!("{}: {}", self.target.app_name(), self.name),
            origin_token: token,
        }
    }
}

pub fn parse_target_line(line: &str) -> Option<TargetLine> {
    let mut fields = line.splitn(4, '\t');
    let kind = fields.next()?.trim();
    let window_id = fields.next()?.trim().to_string();
    let third = fields.next()?.trim();
    let name = fields.next().unwrap_or("").trim().to_string();
    if window_id.is_empty() {
        return None;
    }
    let target = match kind {
        "terminal" => TerminalTarget::Terminal {
            window_id,
            tab: third.parse().ok().filter(|t| *t > 0)?,
        },
        "iterm" if !third.is_empty() => TerminalTarget::ITerm {
            window_id,
            session_id: third.to_string(),
        },
        _ => return None,
    };
    Some(TargetLine { target, name })
}

pub fn parse_target_list(output: &str) -> Vec<TargetLine> {
    output.lines().filter_map(parse_target_line).collect()
}

pub fn parse_front_target(output: &str) -> Option<FocusHandle> {
    let line = output.trim_end_matches('\n');
    if let Some(app_name) = line.strip_prefix("other\t") {
        let app_name = app_name.trim();
        if app_name.is_empty() {
            return None;
        }
        return Some(FocusHandle::Other {
            app_name: app_name.to_string(),
        });
    }
    let parsed = parse_target_line(line)?;
    let candidate = parsed.to_candidate();
    Some(FocusHandle::Terminal {
        source_id: candidate.source_id,
        display_name: candidate.display_name,
    })
}
