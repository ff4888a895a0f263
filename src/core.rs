//! Core domain types and service traits for polydns
//!
//! This module defines the result types produced by queries and the trait
//! contract every wire transport implements.

use crate::dns::{context::QueryContext, DnsError};
use async_trait::async_trait;
use hickory_resolver::proto::{op::Message, rr::RecordType};
use serde::Serialize;
use serde_with::{serde_as, DisplayFromStr};
use std::net::IpAddr;

/// One resolved resource record.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Record {
    /// Owner name, fully-qualified
    pub name: String,
    /// Numeric record type code
    pub record_type: u16,
    pub ttl: u32,
    /// Address, target name, or other type-specific text
    pub value: String,
}

impl Record {
    /// Parses the value as an IP address, if it is one.
    pub fn ip(&self) -> Option<IpAddr> {
        self.value.parse().ok()
    }
}

/// The outcome of a query against a single server.
///
/// A result with an error carries no records.
#[serde_as]
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QueryResult {
    pub domain: String,
    pub record_type: u16,
    pub server: String,
    /// Records in answer order
    pub records: Vec<Record>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<DnsError>,
}

impl QueryResult {
    pub fn success(domain: &str, record_type: RecordType, server: &str, records: Vec<Record>) -> Self {
        Self {
            domain: domain.to_string(),
            record_type: u16::from(record_type),
            server: server.to_string(),
            records,
            error: None,
        }
    }

    pub fn failure(domain: &str, record_type: RecordType, server: &str, error: DnsError) -> Self {
        Self {
            domain: domain.to_string(),
            record_type: u16::from(record_type),
            server: server.to_string(),
            records: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn query_type(&self) -> RecordType {
        RecordType::from(self.record_type)
    }
}

/// The merged outcome of a fan-out query.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MultiQueryResult {
    pub domain: String,
    pub record_type: u16,
    /// One result per configured server, in configuration order
    pub results: Vec<QueryResult>,
    /// Unique addresses from A/AAAA answers, in order of server completion
    pub all_ips: Vec<String>,
}

impl MultiQueryResult {
    pub fn query_type(&self) -> RecordType {
        RecordType::from(self.record_type)
    }

    /// Returns `true` if no server produced an answer. A fan-out never fails
    /// as a whole for network reasons, so callers check this explicitly.
    pub fn all_failed(&self) -> bool {
        self.results.iter().all(|r| !r.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &QueryResult> {
        self.results.iter().filter(|r| !r.is_success())
    }
}

// =============================================================================
// Service Traits
// =============================================================================

/// Sends a query to one server and receives its answer over a wire protocol.
#[async_trait]
pub trait Transport: Send + Sync {
    /// A short, descriptive name used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Performs a single exchange with `server`.
    ///
    /// # Arguments
    /// * `ctx` - Deadline and cancellation signal for the whole query
    /// * `query` - The encoded-ready query message
    /// * `server` - The server address as configured
    ///
    /// # Returns
    /// * `Ok(Message)` with the server's answer
    /// * `Err` for configuration, transport, application-layer or
    ///   cancellation errors
    async fn exchange(&self, ctx: &QueryContext, query: &Message, server: &str) -> Result<Message, DnsError>;
}
