use std::fmt;

/// Errors raised by the retargeting engine, its channels and the actuator boundary.
#[derive(Debug, thiserror::Error)]
pub enum TeleopError {
    #[error("Malformed geometry: {0}")]
    MalformedGeometry(String),

    #[error("Invalid hand frame: expected 12 values, got {0}")]
    InvalidFrame(usize),

    #[error("Invalid hand keypoints: need index {index}, got {len} points")]
    InvalidKeypoints { index: usize, len: usize },

    #[error("Unrecognized resolution mode value {0}")]
    InvalidResolution(f64),

    #[error("Actuator call failed: {0}")]
    Actuator(String),

    #[error("Channel disconnected: {0}")]
    ChannelDisconnected(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Malformed keypoint token: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to spawn operator thread: {0}")]
    Spawn(String),
}

impl TeleopError {
    /// Errors after which the control loop cannot make progress.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TeleopError::ChannelDisconnected(_))
    }
}

/// Thread-safe last-error storage for the C FFI layer.
pub(crate) struct LastError {
    message: std::sync::Mutex<String>,
}

impl LastError {
    pub const fn new() -> Self {
        Self {
            message: std::sync::Mutex::new(String::new()),
        }
    }

    pub fn set(&self, err: &TeleopError) {
        if let Ok(mut msg) = self.message.lock() {
            *msg = fmt::format(format_args!("{}\0", err));
        }
    }

    pub fn clear(&self) {
        if let Ok(mut msg) = self.message.lock() {
            msg.clear();
        }
    }

    pub fn as_ptr(&self) -> *const std::ffi::c_char {
        match self.message.lock() {
            Ok(msg) if !msg.is_empty() => msg.as_ptr() as *const std::ffi::c_char,
            _ => std::ptr::null(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_disconnect_is_fatal() {
        assert!(TeleopError::ChannelDisconnected("button".into()).is_fatal());
        assert!(!TeleopError::MalformedGeometry("det=0".into()).is_fatal());
        assert!(!TeleopError::Actuator("timeout".into()).is_fatal());
        assert!(!TeleopError::InvalidResolution(3.0).is_fatal());
    }

    #[test]
    fn test_last_error_roundtrip() {
        let store = LastError::new();
        assert!(store.as_ptr().is_null());
        store.set(&TeleopError::InvalidFrame(7));
        let msg = unsafe { std::ffi::CStr::from_ptr(store.as_ptr()) };
        assert_eq!(msg.to_str().unwrap(), "Invalid hand frame: expected 12 values, got 7");
        store.clear();
        assert!(store.as_ptr().is_null());
    }
}
