//! Numeric error codes embedded in svn client messages (`svn: E155007: ...`).

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static CODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| {
        Regex::new(r"\b[EW](\d{6})\b").unwrap_or_else(|e| panic!("invalid error code regex: {e}"))
    });

/// An svn error or warning code such as `E155007`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ErrorCode(u32);

impl ErrorCode {
    pub const ENTRY_NOT_FOUND: ErrorCode = ErrorCode(150000);
    pub const WC_LOCKED: ErrorCode = ErrorCode(155004);
    pub const WC_NOT_WORKING_COPY: ErrorCode = ErrorCode(155007);
    pub const WC_PATH_NOT_FOUND: ErrorCode = ErrorCode(155010);
    pub const WC_UPGRADE_REQUIRED: ErrorCode = ErrorCode(155036);
    pub const WC_CLEANUP_REQUIRED: ErrorCode = ErrorCode(155037);
    pub const FS_NOT_FOUND: ErrorCode = ErrorCode(160013);
    pub const RA_ILLEGAL_URL: ErrorCode = ErrorCode(170000);
    pub const RA_NOT_AUTHORIZED: ErrorCode = ErrorCode(170001);
    pub const RA_CANNOT_CREATE_SESSION: ErrorCode = ErrorCode(170013);
    pub const RA_DAV_REQUEST_FAILED: ErrorCode = ErrorCode(175002);
    pub const RA_DAV_FORBIDDEN: ErrorCode = ErrorCode(175013);
    pub const ILLEGAL_TARGET: ErrorCode = ErrorCode(200009);
    pub const CANCELLED: ErrorCode = ErrorCode(200015);
    pub const AUTHN_CREDS_UNAVAILABLE: ErrorCode = ErrorCode(215000);
    pub const AUTHN_FAILED: ErrorCode = ErrorCode(215004);
    pub const SSL_CERT_UNTRUSTED: ErrorCode = ErrorCode(230001);

    pub const fn new(code: u32) -> Self {
        ErrorCode(code)
    }

    pub const fn code(self) -> u32 {
        self.0
    }

    /// Every distinct code in `text`, in order of first appearance.
    pub fn parse_all(text: &str) -> Vec<ErrorCode> {
        let mut codes = Vec::new();
        for captures in CODE_PATTERN.captures_iter(text) {
            let Some(code) = captures.get(1).and_then(|m| m.as_str().parse::<u32>().ok()) else {
                continue;
            };
            let code = ErrorCode(code);
            if !codes.contains(&code) {
                codes.push(code);
            }
        }
        codes
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:06}", self.0)
    }
}
