//! Concurrent fan-out of one query to every configured server.

use crate::core::{MultiQueryResult, QueryResult};
use crate::dns::{context::QueryContext, DnsClient, DnsError};
use hickory_resolver::proto::rr::RecordType;
use std::collections::HashSet;
use std::net::IpAddr;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

impl DnsClient {
    /// Sends the same query to every configured server concurrently.
    ///
    /// Each server gets its own retry budget, and one server failing never
    /// affects another. `results` follows the configured server order;
    /// `all_ips` holds the unique A/AAAA addresses in the order the servers
    /// completed. Only an empty server list fails the call as a whole.
    #[instrument(skip(self, ctx), fields(servers = self.config.servers.len()))]
    pub async fn multi_query(
        &self,
        ctx: &QueryContext,
        domain: &str,
        record_type: RecordType,
    ) -> Result<MultiQueryResult, DnsError> {
        let servers = &self.config.servers;
        if servers.is_empty() {
            return Err(DnsError::NoServers);
        }

        let (result_tx, mut result_rx) = mpsc::channel::<(usize, QueryResult)>(servers.len());
        for (index, server) in servers.iter().enumerate() {
            let client = self.clone();
            let ctx = ctx.clone();
            let domain = domain.to_string();
            let server = server.clone();
            let result_tx = result_tx.clone();
            tokio::spawn(async move {
                let result = client.query_server(&ctx, &domain, record_type, &server).await;
                // Capacity equals the number of senders, so this never waits.
                let _ = result_tx.send((index, result)).await;
            });
        }
        drop(result_tx);

        let collect_ips = matches!(record_type, RecordType::A | RecordType::AAAA);
        let mut slots: Vec<Option<QueryResult>> = vec![None; servers.len()];
        let mut seen = HashSet::new();
        let mut all_ips = Vec::new();

        while let Some((index, result)) = result_rx.recv().await {
            debug!(server = %result.server, success = result.is_success(), "Server completed");
            if collect_ips {
                for record in &result.records {
                    if record.value.parse::<IpAddr>().is_ok() && seen.insert(record.value.clone()) {
                        all_ips.push(record.value.clone());
                    }
                }
            }
            slots[index] = Some(result);
        }

        let results: Vec<QueryResult> = slots
            .into_iter()
            .zip(servers)
            .map(|(slot, server)| {
                slot.unwrap_or_else(|| {
                    warn!(server = %server, "Query task ended without a result");
                    QueryResult::failure(
                        domain,
                        record_type,
                        server,
                        DnsError::Transport("query task ended without a result".to_string()),
                    )
                })
            })
            .collect();

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        info!(succeeded, total = results.len(), unique_ips = all_ips.len(), "Fan-out complete");

        Ok(MultiQueryResult {
            domain: domain.to_string(),
            record_type: u16::from(record_type),
            results,
            all_ips,
        })
    }

    pub async fn multi_query_a(&self, ctx: &QueryContext, domain: &str) -> Result<MultiQueryResult, DnsError> {
        self.multi_query(ctx, domain, RecordType::A).await
    }

    pub async fn multi_query_aaaa(&self, ctx: &QueryContext, domain: &str) -> Result<MultiQueryResult, DnsError> {
        self.multi_query(ctx, domain, RecordType::AAAA).await
    }
}
