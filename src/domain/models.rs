use crate::domain::ble::BleState;
use crate::domain::session::Session;

/// Events flowing from the worker threads back to the UI thread.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Fresh copy of the orchestrator state, published after every change.
    Ble(BleState),
    Auth(AuthEvent),
    /// Message for the modal alert.
    Alert(StatusMessage),
}

#[derive(Debug, Clone)]
pub enum AuthEvent {
    /// Startup restore finished. `None` means not authenticated.
    Restored(Option<Session>),
    SignedIn(Session),
    SignInFailed,
    SignedOut,
    SignOutFailed,
}

/// Commands accepted by the Bluetooth worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BluetoothCommand {
    StartScan,
    Connect(String),
    Disconnect,
    Trigger,
}

/// Commands accepted by the auth worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthCommand {
    Restore,
    SignIn,
    SignOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub message: String,
    pub severity: MessageSeverity,
}

impl StatusMessage {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: MessageSeverity::Info,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: MessageSeverity::Success,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: MessageSeverity::Warning,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: MessageSeverity::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Info,
    Success,
    Warning,
    Error,
}
