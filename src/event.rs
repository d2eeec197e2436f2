//! Normalized event taxonomy
//!
//! Every notification source maps its native payload into a [`NormalizedEvent`].
//! The category is derived from the detail, so an event can never pair a detail
//! with a different category.

#![allow(dead_code)] // category()/detail()/code() - for consumers matching on the taxonomy

use std::fmt;

/// Power mode reported by the power-notification subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerMode {
    Resume,
    StatusChange,
    Suspend,
}

/// Why a user session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEndReason {
    Logoff,
    SystemShutdown,
}

/// Why the active session changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionSwitchReason {
    ConsoleConnect,
    ConsoleDisconnect,
    RemoteConnect,
    RemoteDisconnect,
    SessionLogon,
    SessionLogoff,
    SessionLock,
    SessionUnlock,
    SessionRemoteControl,
}

/// Kind of a management-layer power event, keyed by its `EventType` code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerManagementKind {
    EnteringSuspend,
    ResumeFromSuspend,
    PowerStatusChange,
    OemEvent,
    ResumeAutomatic,
    /// A code outside the known set, kept verbatim
    Unrecognized(i32),
}

impl PowerManagementKind {
    pub const ENTERING_SUSPEND: i32 = 4;
    pub const RESUME_FROM_SUSPEND: i32 = 7;
    pub const POWER_STATUS_CHANGE: i32 = 10;
    pub const OEM_EVENT: i32 = 11;
    pub const RESUME_AUTOMATIC: i32 = 18;

    /// Map an `EventType` code. Never fails: unknown codes become `Unrecognized`.
    pub fn from_code(code: i32) -> Self {
        match code {
            Self::ENTERING_SUSPEND => Self::EnteringSuspend,
            Self::RESUME_FROM_SUSPEND => Self::ResumeFromSuspend,
            Self::POWER_STATUS_CHANGE => Self::PowerStatusChange,
            Self::OEM_EVENT => Self::OemEvent,
            Self::RESUME_AUTOMATIC => Self::ResumeAutomatic,
            other => Self::Unrecognized(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::EnteringSuspend => Self::ENTERING_SUSPEND,
            Self::ResumeFromSuspend => Self::RESUME_FROM_SUSPEND,
            Self::PowerStatusChange => Self::POWER_STATUS_CHANGE,
            Self::OemEvent => Self::OEM_EVENT,
            Self::ResumeAutomatic => Self::RESUME_AUTOMATIC,
            Self::Unrecognized(code) => *code,
        }
    }
}

impl fmt::Display for PowerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for SessionEndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for SessionSwitchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for PowerManagementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnteringSuspend => f.write_str("Entering Suspend"),
            Self::ResumeFromSuspend => f.write_str("Resume From Suspend"),
            Self::PowerStatusChange => f.write_str("Power Status Change"),
            Self::OemEvent => f.write_str("OEM Event"),
            Self::ResumeAutomatic => f.write_str("Resume Automatic"),
            Self::Unrecognized(code) => write!(f, "{}", code),
        }
    }
}

/// Event category tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    PowerModeChanged,
    SessionEnded,
    SessionSwitch,
    EventsThreadShutdown,
    PowerManagementNotification,
}

/// Category-specific payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detail {
    PowerMode(PowerMode),
    SessionEnd(SessionEndReason),
    SessionSwitch(SessionSwitchReason),
    ThreadShutdown,
    PowerManagement(PowerManagementKind),
}

/// The common representation every source maps into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedEvent {
    detail: Detail,
}

impl NormalizedEvent {
    pub fn power_mode_changed(mode: PowerMode) -> Self {
        Self { detail: Detail::PowerMode(mode) }
    }

    pub fn events_thread_shutdown() -> Self {
        Self { detail: Detail::ThreadShutdown }
    }

    pub fn session_ended(reason: SessionEndReason) -> Self {
        Self { detail: Detail::SessionEnd(reason) }
    }

    pub fn session_switch(reason: SessionSwitchReason) -> Self {
        Self { detail: Detail::SessionSwitch(reason) }
    }

    pub fn power_management(kind: PowerManagementKind) -> Self {
        Self { detail: Detail::PowerManagement(kind) }
    }

    pub fn category(&self) -> Category {
        match self.detail {
            Detail::PowerMode(_) => Category::PowerModeChanged,
            Detail::SessionEnd(_) => Category::SessionEnded,
            Detail::SessionSwitch(_) => Category::SessionSwitch,
            Detail::ThreadShutdown => Category::EventsThreadShutdown,
            Detail::PowerManagement(_) => Category::PowerManagementNotification,
        }
    }

    pub fn detail(&self) -> Detail {
        self.detail
    }
}

impl fmt::Display for NormalizedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.detail {
            Detail::PowerMode(mode) => write!(f, "SystemEvents.PowerModeChanged: {}", mode),
            Detail::ThreadShutdown => f.write_str("SystemEvents.EventsThreadShutdown"),
            Detail::SessionEnd(reason) => write!(f, "SystemEvents.SessionEnded: {}", reason),
            Detail::SessionSwitch(reason) => write!(f, "SystemEvents.SessionSwitch: {}", reason),
            Detail::PowerManagement(kind) => write!(f, "Win32_PowerManagementEvent: {}", kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_render_fixed_strings() {
        let cases = [
            (4, "Win32_PowerManagementEvent: Entering Suspend"),
            (7, "Win32_PowerManagementEvent: Resume From Suspend"),
            (10, "Win32_PowerManagementEvent: Power Status Change"),
            (11, "Win32_PowerManagementEvent: OEM Event"),
            (18, "Win32_PowerManagementEvent: Resume Automatic"),
        ];

        for (code, expected) in cases {
            let event = NormalizedEvent::power_management(PowerManagementKind::from_code(code));
            assert_eq!(event.to_string(), expected);
        }
    }

    #[test]
    fn test_unknown_codes_render_raw_integer() {
        for code in [0, 1, 5, 9, 12, 99, -3, i32::MAX] {
            let kind = PowerManagementKind::from_code(code);
            assert_eq!(kind, PowerManagementKind::Unrecognized(code));
            let event = NormalizedEvent::power_management(kind);
            assert_eq!(event.to_string(), format!("Win32_PowerManagementEvent: {}", code));
        }
    }

    #[test]
    fn test_code_preserved() {
        assert_eq!(PowerManagementKind::from_code(18).code(), 18);
        assert_eq!(PowerManagementKind::from_code(42).code(), 42);
    }

    #[test]
    fn test_system_events_rendering() {
        assert_eq!(
            NormalizedEvent::power_mode_changed(PowerMode::Suspend).to_string(),
            "SystemEvents.PowerModeChanged: Suspend"
        );
        assert_eq!(
            NormalizedEvent::power_mode_changed(PowerMode::StatusChange).to_string(),
            "SystemEvents.PowerModeChanged: StatusChange"
        );
        assert_eq!(
            NormalizedEvent::events_thread_shutdown().to_string(),
            "SystemEvents.EventsThreadShutdown"
        );
        assert_eq!(
            NormalizedEvent::session_ended(SessionEndReason::SystemShutdown).to_string(),
            "SystemEvents.SessionEnded: SystemShutdown"
        );
        assert_eq!(
            NormalizedEvent::session_switch(SessionSwitchReason::SessionLock).to_string(),
            "SystemEvents.SessionSwitch: SessionLock"
        );
    }

    #[test]
    fn test_category_matches_detail() {
        let event = NormalizedEvent::session_switch(SessionSwitchReason::RemoteConnect);
        assert_eq!(event.category(), Category::SessionSwitch);
        assert_eq!(event.detail(), Detail::SessionSwitch(SessionSwitchReason::RemoteConnect));

        let event = NormalizedEvent::events_thread_shutdown();
        assert_eq!(event.category(), Category::EventsThreadShutdown);
        assert_eq!(event.detail(), Detail::ThreadShutdown);

        let event = NormalizedEvent::power_management(PowerManagementKind::from_code(12));
        assert_eq!(event.category(), Category::PowerManagementNotification);
        assert_eq!(NormalizedEvent::power_mode_changed(PowerMode::Resume).category(), Category::PowerModeChanged);
        assert_eq!(
            NormalizedEvent::session_ended(SessionEndReason::Logoff).category(),
            Category::SessionEnded
        );
    }
}
