//! Engine configuration
//!
//! The quorum rule is data, not code: swapping the approval policy
//! means constructing a different [`QuorumPolicy`] table, never
//! touching the aggregation algorithm.

use changeflow_model::RiskLevel;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Required `approved` votes per risk level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumPolicy {
    /// Quorum for low-risk changes
    pub low: u32,
    /// Quorum for medium-risk changes
    pub medium: u32,
    /// Quorum for high-risk changes
    pub high: u32,
    /// Quorum for very-high-risk changes
    pub very_high: u32,
}

impl QuorumPolicy {
    /// Look up the quorum for a risk level
    #[inline]
    #[must_use]
    pub fn required(&self, risk: RiskLevel) -> u32 {
        match risk {
            RiskLevel::Low => self.low,
            RiskLevel::Medium => self.medium,
            RiskLevel::High => self.high,
            RiskLevel::VeryHigh => self.very_high,
        }
    }

    /// Override the quorum for one risk level
    #[must_use]
    pub fn with_required(mut self, risk: RiskLevel, count: u32) -> Self {
        match risk {
            RiskLevel::Low => self.low = count,
            RiskLevel::Medium => self.medium = count,
            RiskLevel::High => self.high = count,
            RiskLevel::VeryHigh => self.very_high = count,
        }
        self
    }
}

impl Default for QuorumPolicy {
    /// Two approvers for high and very-high risk, one otherwise
    fn default() -> Self {
        Self {
            low: 1,
            medium: 1,
            high: 2,
            very_high: 2,
        }
    }
}

/// Bounded retry/backoff for outbound collaborator calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry; doubles per attempt
    pub base_delay: Duration,
    /// Cap on the computed delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries (single attempt)
    #[inline]
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Approval quorum table
    pub quorum: QuorumPolicy,
    /// Retry policy for cross-entity history mirroring
    pub retry: RetryPolicy,
}

impl WorkflowConfig {
    /// Default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a quorum table
    #[inline]
    #[must_use]
    pub fn with_quorum(mut self, quorum: QuorumPolicy) -> Self {
        self.quorum = quorum;
        self
    }

    /// With a retry policy
    #[inline]
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
