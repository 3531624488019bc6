//! Caller-facing call outcome.

/// Error codes carried in [`Response::error_code`].
pub mod codes {
    pub const SUCCESS: i32 = 0;
    pub const NODES_UNREACHABLE: i32 = 99;
    pub const MESSAGE_SEND_EXCEPTION: i32 = 100;
    pub const MESSAGE_DECODE_ERROR: i32 = 101;
    /// Synthesized locally when no response arrives in time.
    pub const TIMEOUT: i32 = 102;
    /// Sent by the routing node when it throttles AMOP traffic.
    pub const REJECTED_OVER_BANDWIDTH_LIMIT: i32 = 103;
    pub const NO_AVAILABLE_SESSION: i32 = 104;
    /// Delivered to every outstanding call on shutdown.
    pub const SHUTDOWN: i32 = 105;
}

/// Outcome of a publish or verification call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub error_code: i32,
    pub error_message: String,
    pub content: Vec<u8>,
}

impl Response {
    pub fn success(content: Vec<u8>) -> Self {
        Self {
            error_code: codes::SUCCESS,
            error_message: String::new(),
            content,
        }
    }

    pub fn error(error_code: i32, message: impl Into<String>) -> Self {
        Self {
            error_code,
            error_message: message.into(),
            content: Vec::new(),
        }
    }

    pub fn timeout() -> Self {
        Self::error(codes::TIMEOUT, "Timeout waiting for response")
    }

    pub fn shutdown() -> Self {
        Self::error(codes::SHUTDOWN, "AMOP shut down")
    }

    pub fn is_success(&self) -> bool {
        self.error_code == codes::SUCCESS
    }

    /// Content as UTF-8, lossy.
    pub fn content_str(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

/// One-shot response continuation.
pub type ResponseCallback = Box<dyn FnOnce(Response) + Send + 'static>;
