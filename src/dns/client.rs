//! The DNS client: single-server queries and their convenience forms.

use crate::core::{QueryResult, Transport};
use crate::dns::{
    context::QueryContext, message, retry::RetryPolicy, transport::transport_for, ClientConfig, DnsError,
};
use hickory_resolver::proto::rr::RecordType;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// A client that sends queries to its configured servers.
///
/// Cloning is cheap: clones share the same configuration and transport.
#[derive(Clone)]
pub struct DnsClient {
    pub(crate) config: Arc<ClientConfig>,
    pub(crate) transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for DnsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsClient")
            .field("config", &self.config)
            .field("transport", &self.transport.name())
            .finish()
    }
}

impl Default for DnsClient {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl DnsClient {
    /// Creates a client using the transport matching `config.protocol`.
    pub fn new(config: ClientConfig) -> Self {
        let config = Arc::new(config);
        let transport = transport_for(config.clone());
        Self { config, transport }
    }

    /// Creates a client that sends every exchange through `transport`.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: Arc::new(config),
            transport,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Queries the first configured server.
    ///
    /// # Returns
    /// * `Ok(QueryResult)` with the answer records on success
    /// * `Err(DnsError::NoServers)` if no server is configured
    /// * `Err` with the final attempt's error if the query failed
    pub async fn query(&self, ctx: &QueryContext, domain: &str, record_type: RecordType) -> Result<QueryResult, DnsError> {
        let server = self.config.servers.first().ok_or(DnsError::NoServers)?;
        let mut result = self.query_server(ctx, domain, record_type, server).await;
        match result.error.take() {
            Some(err) => Err(err),
            None => Ok(result),
        }
    }

    pub async fn query_a(&self, ctx: &QueryContext, domain: &str) -> Result<QueryResult, DnsError> {
        self.query(ctx, domain, RecordType::A).await
    }

    pub async fn query_aaaa(&self, ctx: &QueryContext, domain: &str) -> Result<QueryResult, DnsError> {
        self.query(ctx, domain, RecordType::AAAA).await
    }

    pub async fn query_cname(&self, ctx: &QueryContext, domain: &str) -> Result<QueryResult, DnsError> {
        self.query(ctx, domain, RecordType::CNAME).await
    }

    pub async fn query_mx(&self, ctx: &QueryContext, domain: &str) -> Result<QueryResult, DnsError> {
        self.query(ctx, domain, RecordType::MX).await
    }

    pub async fn query_txt(&self, ctx: &QueryContext, domain: &str) -> Result<QueryResult, DnsError> {
        self.query(ctx, domain, RecordType::TXT).await
    }

    /// Queries one specific server, retrying per the configured policy.
    ///
    /// Never fails as a call: any error is carried in the returned result.
    #[instrument(skip(self, ctx), fields(protocol = %self.config.protocol))]
    pub async fn query_server(
        &self,
        ctx: &QueryContext,
        domain: &str,
        record_type: RecordType,
        server: &str,
    ) -> QueryResult {
        let query = match message::build_query(domain, record_type) {
            Ok(query) => query,
            Err(e) => return QueryResult::failure(domain, record_type, server, e),
        };

        let start = Instant::now();
        let transport = self.transport.as_ref();
        let query_ref = &query;
        let outcome = RetryPolicy::new(self.config.retries)
            .run(ctx, move |attempt| {
                debug!(attempt, "Sending query");
                transport.exchange(ctx, query_ref, server)
            })
            .await;

        let protocol = self.config.protocol.as_str();
        metrics::histogram!("dns_query_duration_seconds", "protocol" => protocol)
            .record(start.elapsed().as_secs_f64());

        match outcome {
            Ok(response) => {
                metrics::counter!("dns_queries_total", "protocol" => protocol, "status" => "success").increment(1);
                let records = message::answer_records(&response);
                debug!(records = records.len(), "Query answered");
                QueryResult::success(domain, record_type, server, records)
            }
            Err(e) => {
                let status = if e.is_cancellation() {
                    "cancelled"
                } else if e.is_config_error() {
                    "config_error"
                } else {
                    "failure"
                };
                metrics::counter!("dns_queries_total", "protocol" => protocol, "status" => status).increment(1);
                warn!(error = %e, "Query failed");
                QueryResult::failure(domain, record_type, server, e)
            }
        }
    }
}
