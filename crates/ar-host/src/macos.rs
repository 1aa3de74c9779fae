//! macOS backend: NSWorkspace for focus, AppleScript for terminal text and
//! window selection, CoreGraphics events for keys.

use std::time::Duration;

use anyhow::{Context, Result};
use ar_core::{CandidateSource, FocusHandle, Host};
use ar_detection::window::tail_lines;
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::applescript::{
    activate_script, is_terminal_bundle, parse_front_target, parse_target_list, TerminalTarget,
    FOCUSED_TEXT_SCRIPT, FRONT_TARGET_SCRIPT, LIST_TARGETS_SCRIPT,
};
use crate::script::ScriptRunner;

pub struct MacOsHost {
    runner: ScriptRunner,
    key_pause: Duration,
}

impl MacOsHost {
    pub fn new(runner: ScriptRunner, key_pause: Duration) -> Self {
        Self { runner, key_pause }
    }

    async fn script(&self, source: &str) -> Option<String> {
        match self.runner.osascript(source).await {
            Ok(out) => Some(out),
            Err(e) => {
                debug!("AppleScript failed: {}", e);
                None
            }
        }
    }

    async fn select(&self, target: &TerminalTarget) -> bool {
        self.script(&target.select_script()).await.is_some()
    }

    async fn send_key(&self, key: &'static str) -> bool {
        match tokio::task::spawn_blocking(move || press_key(key)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!("Key '{}' failed: {}", key, e);
                false
            }
            Err(e) => {
                warn!("Key task for '{}' panicked: {}", key, e);
                false
            }
        }
    }
}

#[async_trait]
impl Host for MacOsHost {
    fn name(&self) -> &str {
        "macos"
    }

    async fn fetch_text(&self, max_lines: usize) -> Option<String> {
        let text = self.script(FOCUSED_TEXT_SCRIPT).await?;
        Some(tail_lines(&text, max_lines).to_string())
    }

    async fn fetch_frontmost_identity(&self) -> Option<String> {
        if let Some(bundle_id) = frontmost_bundle_id() {
            return Some(bundle_id);
        }
        // NSWorkspace occasionally reports nothing mid-switch.
        tokio::time::sleep(Duration::from_millis(50)).await;
        frontmost_bundle_id()
    }

    fn is_monitorable_identity(&self, identity: &str) -> bool {
        is_terminal_bundle(identity)
    }

    async fn enumerate_candidates(&self) -> Vec<CandidateSource> {
        match self.script(LIST_TARGETS_SCRIPT).await {
            Some(out) => parse_target_list(&out)
                .iter()
                .map(|line| line.to_candidate())
                .collect(),
            None => Vec::new(),
        }
    }

    async fn fetch_text_for(&self, source: &CandidateSource, max_lines: usize) -> Option<String> {
        let target = TerminalTarget::from_token(&source.origin_token)?;
        let text = self.script(&target.fetch_script()).await?;
        Some(tail_lines(&text, max_lines).to_string())
    }

    async fn current_focus(&self) -> Option<FocusHandle> {
        let out = self.script(FRONT_TARGET_SCRIPT).await?;
        parse_front_target(&out)
    }

    async fn switch_focus_to(&self, source: &CandidateSource) -> bool {
        match TerminalTarget::from_token(&source.origin_token) {
            Some(target) => self.select(&target).await,
            None => false,
        }
    }

    async fn restore_focus(&self, handle: &FocusHandle) -> bool {
        match handle {
            FocusHandle::Terminal { source_id, .. } => match TerminalTarget::from_token(source_id) {
                Some(target) => self.select(&target).await,
                None => false,
            },
            FocusHandle::Other { app_name } => {
                if activate_app(app_name).is_ok() {
                    return true;
                }
                self.script(&activate_script(app_name)).await.is_some()
            }
        }
    }

    async fn dispatch(&self, option: &str) -> bool {
        if option == "2" {
            if !self.send_key("2").await {
                warn!("Sending '2' failed, trying Down instead");
                if !self.send_key("down").await {
                    return false;
                }
            }
            tokio::time::sleep(self.key_pause).await;
        }

        tokio::time::sleep(self.key_pause).await;
        self.send_key("return").await
    }
}

fn ns_string(value: cocoa::base::id) -> Option<String> {
    use cocoa::base::nil;
    use objc::{msg_send, sel, sel_impl};

    if value == nil {
        return None;
    }
    unsafe {
        let ptr: *const i8 = msg_send![value, UTF8String];
        if ptr.is_null() {
            return None;
        }
        Some(std::ffi::CStr::from_ptr(ptr).to_string_lossy().to_string())
    }
}

/// Bundle id of the frontmost application.
fn frontmost_bundle_id() -> Option<String> {
    use cocoa::base::{id, nil};
    use objc::{class, msg_send, sel, sel_impl};

    unsafe {
        let workspace: id = msg_send![class!(NSWorkspace), sharedWorkspace];
        let frontmost_app: id = msg_send![workspace, frontmostApplication];
        if frontmost_app == nil {
            return None;
        }
        let bundle_id: id = msg_send![frontmost_app, bundleIdentifier];
        ns_string(bundle_id)
    }
}

/// Brings a running application to the front by its localized name.
fn activate_app(app_name: &str) -> Result<()> {
    use cocoa::base::id;
    use objc::{class, msg_send, sel, sel_impl};

    unsafe {
        let workspace: id = msg_send![class!(NSWorkspace), sharedWorkspace];
        let running_apps: id = msg_send![workspace, runningApplications];
        let count: usize = msg_send![running_apps, count];

        for i in 0..count {
            let running_app: id = msg_send![running_apps, objectAtIndex: i];
            let name: id = msg_send![running_app, localizedName];
            if ns_string(name).as_deref() == Some(app_name) {
                let _: bool = msg_send![running_app, activateWithOptions: 0];
                return Ok(());
            }
        }
    }

    anyhow::bail!("Application '{}' is not running", app_name)
}

fn press_key(key: &str) -> Result<()> {
    use core_graphics::event::{CGEvent, CGEventTapLocation};
    use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};

    let key_code = key_to_keycode(key).ok_or_else(|| anyhow::anyhow!("Unknown key: {}", key))?;

    let source = CGEventSource::new(CGEventSourceStateID::HIDSystemState)
        .ok()
        .context("Failed to create event source")?;

    let key_down = CGEvent::new_keyboard_event(source.clone(), key_code, true)
        .ok()
        .context("Failed to create key down event")?;
    let key_up = CGEvent::new_keyboard_event(source, key_code, false)
        .ok()
        .context("Failed to create key up event")?;

    key_down.post(CGEventTapLocation::HID);
    std::thread::sleep(Duration::from_millis(50));
    key_up.post(CGEventTapLocation::HID);

    Ok(())
}

fn key_to_keycode(key: &str) -> Option<u16> {
    match key.to_lowercase().as_str() {
        "1" => Some(0x12),
        "2" => Some(0x13),
        "return" | "enter" => Some(0x24),
        "escape" | "esc" => Some(0x35),
        "down" => Some(0x7D),
        "up" => Some(0x7E),
        _ => None,
    }
}
