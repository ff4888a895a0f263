use crate::{
    core::Transport,
    dns::{context::QueryContext, DnsError},
};
use async_trait::async_trait;
use hickory_resolver::proto::{
    op::{Message, MessageType},
    rr::{
        rdata::{A, AAAA, CNAME},
        Name, RData, Record,
    },
};
use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Fake transport for testing.
///
/// Responses are scripted per server and consumed in order. Answers are
/// built from the query itself, so the response always echoes the query id
/// and name.
pub struct FakeTransport {
    // The front of each queue is the next response for that server.
    responses: Arc<Mutex<HashMap<String, VecDeque<Result<Vec<String>, DnsError>>>>>,
    call_count: Arc<Mutex<HashMap<String, u32>>>,
    delays: Arc<Mutex<HashMap<String, Duration>>>,
    default_delay: Duration,
}

impl Default for FakeTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            call_count: Arc::new(Mutex::new(HashMap::new())),
            delays: Arc::new(Mutex::new(HashMap::new())),
            default_delay: Duration::ZERO,
        }
    }

    /// Delays every exchange by `delay` unless a server has its own delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn set_server_delay(&self, server: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(server.to_string(), delay);
    }

    /// Queue an answer for a server. IP values become A/AAAA records, any
    /// other value a CNAME.
    pub fn add_answer(&self, server: &str, values: &[&str]) {
        let values = values.iter().map(|v| v.to_string()).collect();
        self.responses
            .lock()
            .unwrap()
            .entry(server.to_string())
            .or_default()
            .push_back(Ok(values));
    }

    /// Queue a failed exchange for a server
    pub fn add_failure(&self, server: &str, error: DnsError) {
        self.responses
            .lock()
            .unwrap()
            .entry(server.to_string())
            .or_default()
            .push_back(Err(error));
    }

    /// Get the number of exchanges attempted with a server
    pub fn get_call_count(&self, server: &str) -> u32 {
        self.call_count.lock().unwrap().get(server).copied().unwrap_or(0)
    }

    fn next_response(&self, server: &str) -> Result<Vec<String>, DnsError> {
        self.responses
            .lock()
            .unwrap()
            .get_mut(server)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| {
                Err(DnsError::Transport(format!(
                    "No more responses configured for {}",
                    server
                )))
            })
    }
}

fn answer_message(query: &Message, values: &[String]) -> Message {
    let mut response = Message::new();
    response
        .set_id(query.id())
        .set_message_type(MessageType::Response)
        .set_recursion_desired(query.recursion_desired())
        .set_recursion_available(true);
    response.add_queries(query.queries().to_vec());

    let owner = query
        .queries()
        .first()
        .map(|q| q.name().clone())
        .unwrap_or_else(Name::root);
    for value in values {
        let rdata = match value.parse::<IpAddr>() {
            Ok(IpAddr::V4(v4)) => RData::A(A(v4)),
            Ok(IpAddr::V6(v6)) => RData::AAAA(AAAA(v6)),
            Err(_) => RData::CNAME(CNAME(Name::from_ascii(value).unwrap())),
        };
        response.add_answer(Record::from_rdata(owner.clone(), 300, rdata));
    }
    response
}

#[async_trait]
impl Transport for FakeTransport {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn exchange(&self, ctx: &QueryContext, query: &Message, server: &str) -> Result<Message, DnsError> {
        *self
            .call_count
            .lock()
            .unwrap()
            .entry(server.to_string())
            .or_insert(0) += 1;

        let delay = self
            .delays
            .lock()
            .unwrap()
            .get(server)
            .copied()
            .unwrap_or(self.default_delay);

        ctx.run(async {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let values = self.next_response(server)?;
            Ok(answer_message(query, &values))
        })
        .await
    }
}
