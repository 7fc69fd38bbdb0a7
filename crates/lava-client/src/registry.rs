//! Last-result register.
//!
//! Each [`Session`](crate::Session) and [`EventLogReader`](crate::EventLogReader)
//! owns one of these. Every operation overwrites it on return, so callers
//! that want the outcome of a call must read it before issuing the next one.

use crate::error::{ErrorKind, LavaResult};

/// Holds the outcome kind of the most recently completed call.
#[derive(Debug, Clone, Copy, Default)]
pub struct LastResult {
    kind: ErrorKind,
}

impl LastResult {
    /// Create a register holding `NoError`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value.
    pub fn get(&self) -> ErrorKind {
        self.kind
    }

    /// Overwrite the register.
    pub fn set(&mut self, kind: ErrorKind) {
        self.kind = kind;
    }

    /// Record the outcome of `result` and pass it through unchanged.
    pub fn record<T>(&mut self, result: LavaResult<T>) -> LavaResult<T> {
        self.kind = match &result {
            Ok(_) => ErrorKind::NoError,
            Err(e) => e.kind(),
        };
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LavaError;

    #[test]
    fn test_record_overwrites() {
        let mut last = LastResult::new();
        assert_eq!(last.get(), ErrorKind::NoError);

        let failed: LavaResult<()> = Err(LavaError::NotFound("queue night".into()));
        assert!(last.record(failed).is_err());
        assert_eq!(last.get(), ErrorKind::NotFound);

        assert_eq!(last.record(Ok(3)).unwrap(), 3);
        assert_eq!(last.get(), ErrorKind::NoError);
    }
}
