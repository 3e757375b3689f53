//! Overflow policies for the channel writer queue
//!
//! When the writer's queue is full, the policy decides whether a producer
//! waits for space or has its write refused.

use std::fmt;
use std::time::Duration;

/// Policy for handling a full channel writer queue
///
/// # Example
///
/// ```
/// use repo_logger::OverflowPolicy;
/// use std::time::Duration;
///
/// // Default behavior: wait for space, lose nothing
/// let policy = OverflowPolicy::default();
/// assert_eq!(policy, OverflowPolicy::Block);
///
/// // Wait a bounded time, then refuse the write
/// let policy = OverflowPolicy::BlockWithTimeout(Duration::from_millis(100));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Block until space is available
    ///
    /// Producers slow down to the sink's pace; no buffer is lost and
    /// FIFO order is kept.
    #[default]
    Block,

    /// Block with timeout, then refuse the write with `QueueFull`
    BlockWithTimeout(Duration),

    /// Refuse the write with `QueueFull` immediately
    ///
    /// Refused buffers are counted in the writer metrics.
    DropNewest,
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::Block => write!(f, "Block"),
            OverflowPolicy::BlockWithTimeout(d) => write!(f, "BlockWithTimeout({:?})", d),
            OverflowPolicy::DropNewest => write!(f, "DropNewest"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_policy_default() {
        assert_eq!(OverflowPolicy::default(), OverflowPolicy::Block);
    }

    #[test]
    fn test_overflow_policy_display() {
        assert_eq!(OverflowPolicy::DropNewest.to_string(), "DropNewest");
        assert_eq!(OverflowPolicy::Block.to_string(), "Block");
        assert_eq!(
            OverflowPolicy::BlockWithTimeout(Duration::from_millis(100)).to_string(),
            "BlockWithTimeout(100ms)"
        );
    }
}
