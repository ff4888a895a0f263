//! Query construction and answer mapping on top of the hickory wire codec.

use crate::core::Record;
use crate::dns::DnsError;
use hickory_resolver::proto::{
    op::{Message, MessageType, OpCode, Query},
    rr::{Name, RData, Record as WireRecord, RecordType},
};

/// Builds a recursive query for `domain`, made fully-qualified.
pub fn build_query(domain: &str, record_type: RecordType) -> Result<Message, DnsError> {
    let fqdn = if domain.ends_with('.') {
        domain.to_string()
    } else {
        format!("{}.", domain)
    };
    let name = Name::from_ascii(&fqdn)
        .map_err(|e| DnsError::Encode(format!("invalid domain name '{}': {}", domain, e)))?;

    let mut message = Message::new();
    message
        .set_id(rand::random::<u16>())
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true);
    message.add_query(Query::query(name, record_type));
    Ok(message)
}

pub fn encode(message: &Message) -> Result<Vec<u8>, DnsError> {
    message.to_vec().map_err(|e| DnsError::Encode(e.to_string()))
}

pub fn decode(bytes: &[u8]) -> Result<Message, DnsError> {
    Message::from_vec(bytes).map_err(|e| DnsError::Decode(e.to_string()))
}

/// Maps the answer section of `response`, in answer order.
pub fn answer_records(response: &Message) -> Vec<Record> {
    response.answers().iter().map(to_record).collect()
}

fn to_record(record: &WireRecord) -> Record {
    let value = match record.data() {
        RData::A(a) => a.0.to_string(),
        RData::AAAA(aaaa) => aaaa.0.to_string(),
        RData::CNAME(cname) => cname.0.to_string(),
        RData::MX(mx) => format!("{} {}", mx.preference(), mx.exchange()),
        RData::TXT(txt) => txt
            .txt_data()
            .iter()
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect::<Vec<_>>()
            .join(" "),
        other => other.to_string(),
    };

    Record {
        name: record.name().to_string(),
        record_type: u16::from(record.record_type()),
        ttl: record.ttl(),
        value,
    }
}
