//! Journal message classification
//!
//! Maps systemd-journald entries to power/session notifications and kernel
//! power-management messages to management `EventType` codes.
//!
//! Lock/unlock and AC status changes are not written to the journal, so no rule
//! yields `SessionLock`, `SessionUnlock` or `PowerMode::StatusChange`.

use once_cell::sync::Lazy;
use regex::Regex;

use super::SystemNotification;
use super::journal::JournalEntry;
use crate::event::{PowerManagementKind, PowerMode, SessionEndReason, SessionSwitchReason};

struct SystemRule {
    identifier: &'static str,
    pattern: Regex,
    notification: SystemNotification,
}

struct KernelRule {
    pattern: Regex,
    event_type: i32,
}

static SYSTEM_RULES: Lazy<Vec<SystemRule>> = Lazy::new(|| {
    vec![
        SystemRule {
            identifier: "systemd-logind",
            pattern: Regex::new(r"^The system will (suspend|hibernate|suspend and hibernate) now").unwrap(),
            notification: SystemNotification::PowerModeChanged(PowerMode::Suspend),
        },
        SystemRule {
            identifier: "systemd-sleep",
            pattern: Regex::new(r"^System (returned from sleep|resumed)").unwrap(),
            notification: SystemNotification::PowerModeChanged(PowerMode::Resume),
        },
        SystemRule {
            identifier: "systemd-logind",
            pattern: Regex::new(r"^(System is (powering down|rebooting)|The system will (power off|reboot) now)").unwrap(),
            notification: SystemNotification::SessionEnded(SessionEndReason::SystemShutdown),
        },
        SystemRule {
            identifier: "systemd-logind",
            pattern: Regex::new(r"^Session \S+ logged out\.").unwrap(),
            notification: SystemNotification::SessionEnded(SessionEndReason::Logoff),
        },
        SystemRule {
            identifier: "systemd-logind",
            pattern: Regex::new(r"^New session \S+ of user \S+").unwrap(),
            notification: SystemNotification::SessionSwitch(SessionSwitchReason::SessionLogon),
        },
        SystemRule {
            identifier: "systemd-logind",
            pattern: Regex::new(r"^Removed session \S+\.").unwrap(),
            notification: SystemNotification::SessionSwitch(SessionSwitchReason::SessionLogoff),
        },
        SystemRule {
            identifier: "sshd",
            pattern: Regex::new(r"^Accepted \S+ for \S+ from").unwrap(),
            notification: SystemNotification::SessionSwitch(SessionSwitchReason::RemoteConnect),
        },
        SystemRule {
            identifier: "sshd",
            pattern: Regex::new(r"^Disconnected from user \S+").unwrap(),
            notification: SystemNotification::SessionSwitch(SessionSwitchReason::RemoteDisconnect),
        },
    ]
});

static KERNEL_RULES: Lazy<Vec<KernelRule>> = Lazy::new(|| {
    vec![
        KernelRule {
            pattern: Regex::new(r"^PM: (hibernation: )?(suspend|hibernation) entry").unwrap(),
            event_type: PowerManagementKind::ENTERING_SUSPEND,
        },
        KernelRule {
            pattern: Regex::new(r"^ACPI: PM: Waking up from system sleep state").unwrap(),
            event_type: PowerManagementKind::RESUME_AUTOMATIC,
        },
        KernelRule {
            pattern: Regex::new(r"^PM: (hibernation: )?(suspend|hibernation) exit").unwrap(),
            event_type: PowerManagementKind::RESUME_FROM_SUSPEND,
        },
    ]
});

/// Classify an entry from the full journal
pub fn classify_system(entry: &JournalEntry) -> Option<SystemNotification> {
    let identifier = entry.identifier.as_deref()?;
    SYSTEM_RULES
        .iter()
        .find(|rule| rule.identifier == identifier && rule.pattern.is_match(&entry.message))
        .map(|rule| rule.notification)
}

/// Classify a kernel message, returning its `EventType` code
pub fn classify_kernel(message: &str) -> Option<i32> {
    KERNEL_RULES
        .iter()
        .find(|rule| rule.pattern.is_match(message))
        .map(|rule| rule.event_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(identifier: &str, message: &str) -> JournalEntry {
        JournalEntry {
            message: message.to_string(),
            identifier: Some(identifier.to_string()),
        }
    }

    #[test]
    fn test_suspend_and_resume() {
        assert_eq!(
            classify_system(&entry("systemd-logind", "The system will suspend now!")),
            Some(SystemNotification::PowerModeChanged(PowerMode::Suspend))
        );
        assert_eq!(
            classify_system(&entry("systemd-sleep", "System returned from sleep state.")),
            Some(SystemNotification::PowerModeChanged(PowerMode::Resume))
        );
    }

    #[test]
    fn test_session_transitions() {
        assert_eq!(
            classify_system(&entry("systemd-logind", "New session 12 of user alice.")),
            Some(SystemNotification::SessionSwitch(SessionSwitchReason::SessionLogon))
        );
        assert_eq!(
            classify_system(&entry("systemd-logind", "Removed session 12.")),
            Some(SystemNotification::SessionSwitch(SessionSwitchReason::SessionLogoff))
        );
        assert_eq!(
            classify_system(&entry("systemd-logind", "Session 12 logged out. Waiting for processes to exit.")),
            Some(SystemNotification::SessionEnded(SessionEndReason::Logoff))
        );
        assert_eq!(
            classify_system(&entry("systemd-logind", "System is powering down.")),
            Some(SystemNotification::SessionEnded(SessionEndReason::SystemShutdown))
        );
    }

    #[test]
    fn test_identifier_must_match() {
        assert_eq!(classify_system(&entry("bash", "The system will suspend now!")), None);

        let anonymous = JournalEntry {
            message: "Removed session 3.".to_string(),
            identifier: None,
        };
        assert_eq!(classify_system(&anonymous), None);
    }

    #[test]
    fn test_unrelated_message() {
        assert_eq!(classify_system(&entry("systemd-logind", "Watching system buttons on /dev/input/event0")), None);
    }

    #[test]
    fn test_kernel_codes() {
        assert_eq!(classify_kernel("PM: suspend entry (deep)"), Some(4));
        assert_eq!(classify_kernel("PM: hibernation: hibernation entry"), Some(4));
        assert_eq!(classify_kernel("ACPI: PM: Waking up from system sleep state S3"), Some(18));
        assert_eq!(classify_kernel("PM: suspend exit"), Some(7));
        assert_eq!(classify_kernel("usb 1-1: new high-speed USB device"), None);
    }

    #[test]
    fn test_rules_cover_only_journaled_transitions() {
        let produced: Vec<SystemNotification> = SYSTEM_RULES.iter().map(|rule| rule.notification).collect();
        assert_eq!(produced.len(), 8);
        for unjournaled in [
            SystemNotification::PowerModeChanged(PowerMode::StatusChange),
            SystemNotification::SessionSwitch(SessionSwitchReason::SessionLock),
            SystemNotification::SessionSwitch(SessionSwitchReason::SessionUnlock),
        ] {
            assert!(!produced.contains(&unjournaled), "{:?}", unjournaled);
        }

        assert_eq!(
            classify_system(&entry("sshd", "Accepted publickey for alice from 10.0.0.2 port 50022 ssh2")),
            Some(SystemNotification::SessionSwitch(SessionSwitchReason::RemoteConnect))
        );
        assert_eq!(
            classify_system(&entry("sshd", "Disconnected from user alice 10.0.0.2 port 50022")),
            Some(SystemNotification::SessionSwitch(SessionSwitchReason::RemoteDisconnect))
        );
    }
}
