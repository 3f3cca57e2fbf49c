//! Shared test infrastructure for resolver integration tests.

use std::collections::HashMap;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hickory_proto::op::{Header, Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{DNSClass, Name, RData, RecordType};
use hickory_proto::serialize::binary::{BinDecodable, BinDecoder, BinEncoder};
use hickory_server::authority::{MessageRequest, MessageResponse, MessageResponseBuilder};
use hickory_server::proto::rr::Record;
use hickory_server::proto::xfer::Protocol;
use hickory_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};

use nomad_dns::config::DnsConfig;
use nomad_dns::error::DnsError;
use nomad_dns::pool::EndpointPool;
use nomad_dns::registry::{RegistryEndpoint, ServiceInstance};
use nomad_dns::resolver::{NomadResolver, NotAuthoritative};

// --- Constants ---

pub const ZONE: &str = "service.nomad";
pub const TTL: u32 = 30;

// --- TestResponseHandler ---

/// Captures the serialized DNS response for inspection in tests.
///
/// Implements `ResponseHandler` so it can be passed to
/// `RequestHandler::handle_request()`. The response is serialized via
/// `MessageResponse::destructive_emit()` and stored as raw wire-format
/// bytes, which can then be parsed with `Message::from_vec()`.
#[derive(Clone)]
pub struct TestResponseHandler {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl TestResponseHandler {
    pub fn new() -> Self {
        Self {
            buf: Arc::new(Mutex::new(Vec::with_capacity(512))),
        }
    }

    /// Parse the captured wire bytes into a `Message` for assertions.
    pub fn into_message(self) -> Message {
        let buf = self.buf.lock().unwrap();
        assert!(!buf.is_empty(), "no response was captured");
        Message::from_vec(&buf).expect("failed to parse captured DNS response")
    }
}

#[async_trait]
impl ResponseHandler for TestResponseHandler {
    async fn send_response<'a>(
        &mut self,
        response: MessageResponse<
            '_,
            'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
        >,
    ) -> io::Result<ResponseInfo> {
        let mut buf = self.buf.lock().unwrap();
        buf.clear();
        let mut encoder = BinEncoder::new(&mut *buf);
        encoder.set_max_size(u16::MAX);
        let info = response
            .destructive_emit(&mut encoder)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(info)
    }
}

// --- Mock registry endpoint ---

/// In-memory registry endpoint with togglable health and call counters.
pub struct MockEndpoint {
    address: String,
    healthy: AtomicBool,
    fail_fetch: AtomicBool,
    services: HashMap<(String, String), Vec<ServiceInstance>>,
    probe_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl MockEndpoint {
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            healthy: AtomicBool::new(true),
            fail_fetch: AtomicBool::new(false),
            services: HashMap::new(),
            probe_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    /// Register instances for `<service>.<namespace>`.
    pub fn with_service(
        mut self,
        service: &str,
        namespace: &str,
        instances: Vec<ServiceInstance>,
    ) -> Self {
        self.services
            .insert((service.to_string(), namespace.to_string()), instances);
        self
    }

    pub fn unhealthy(self) -> Self {
        self.healthy.store(false, Ordering::SeqCst);
        self
    }

    /// Make every fetch fail even though probes succeed.
    pub fn failing_fetch(self) -> Self {
        self.fail_fetch.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegistryEndpoint for MockEndpoint {
    fn address(&self) -> &str {
        &self.address
    }

    async fn probe(&self) -> Result<(), DnsError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DnsError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "probe refused",
            )))
        }
    }

    async fn fetch_instances(
        &self,
        service: &str,
        namespace: &str,
    ) -> Result<Vec<ServiceInstance>, DnsError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(DnsError::Io(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "fetch failed",
            )));
        }
        Ok(self
            .services
            .get(&(service.to_string(), namespace.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

/// A chain terminal that counts how often it is reached.
pub struct CountingNext {
    hits: Arc<AtomicUsize>,
}

impl CountingNext {
    pub fn new() -> (Self, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        (
            Self {
                hits: Arc::clone(&hits),
            },
            hits,
        )
    }
}

#[async_trait]
impl RequestHandler for CountingNext {
    async fn handle_request<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
    ) -> ResponseInfo {
        self.hits.fetch_add(1, Ordering::SeqCst);
        let mut header = Header::response_from_request(request.header());
        header.set_response_code(ResponseCode::Refused);
        let response =
            MessageResponseBuilder::from_message_request(request).build_no_records(header);
        response_handle
            .send_response(response)
            .await
            .unwrap_or_else(|_| header.into())
    }
}

// --- Builders ---

pub fn instance(address: &str, port: u16) -> ServiceInstance {
    ServiceInstance {
        service_name: "svc".to_string(),
        namespace: "default".to_string(),
        address: address.to_string(),
        port,
    }
}

pub fn test_dns_config() -> DnsConfig {
    DnsConfig {
        listen_addr: "127.0.0.1:5353".parse().unwrap(),
        zone: ZONE.to_string(),
        ttl: TTL,
        endpoints: vec!["mock://registry".to_string()],
        token: None,
    }
}

/// Build a resolver with `NotAuthoritative` at the end of the chain.
pub fn build_resolver(
    endpoints: Vec<Arc<dyn RegistryEndpoint>>,
) -> NomadResolver<NotAuthoritative> {
    let pool = Arc::new(EndpointPool::new(endpoints));
    NomadResolver::new(test_dns_config(), pool, NotAuthoritative)
}

/// Build a resolver with a custom next handler.
pub fn build_resolver_with_next<N: RequestHandler>(
    endpoints: Vec<Arc<dyn RegistryEndpoint>>,
    next: N,
) -> NomadResolver<N> {
    let pool = Arc::new(EndpointPool::new(endpoints));
    NomadResolver::new(test_dns_config(), pool, next)
}

pub fn as_endpoints(mocks: &[Arc<MockEndpoint>]) -> Vec<Arc<dyn RegistryEndpoint>> {
    mocks
        .iter()
        .map(|m| Arc::clone(m) as Arc<dyn RegistryEndpoint>)
        .collect()
}

// --- Query/Request construction ---

pub fn make_src() -> SocketAddr {
    "127.0.0.1:53531".parse().unwrap()
}

/// Build wire-format bytes for a DNS query.
pub fn build_query_bytes(
    name: &str,
    record_type: RecordType,
    query_class: DNSClass,
    id: u16,
) -> Vec<u8> {
    let mut msg = Message::new();
    msg.set_id(id);
    msg.set_message_type(MessageType::Query);
    msg.set_op_code(OpCode::Query);
    msg.set_recursion_desired(true);
    let mut query = Query::new();
    query.set_name(Name::from_ascii(name).unwrap());
    query.set_query_type(record_type);
    query.set_query_class(query_class);
    msg.add_query(query);
    msg.to_vec().unwrap()
}

/// Parse wire bytes into a MessageRequest.
pub fn parse_message_request(bytes: &[u8]) -> MessageRequest {
    let mut decoder = BinDecoder::new(bytes);
    MessageRequest::read(&mut decoder).expect("failed to parse MessageRequest")
}

/// Build a full `Request` for the given name and type.
pub fn build_request(name: &str, record_type: RecordType, query_class: DNSClass) -> Request {
    let bytes = build_query_bytes(name, record_type, query_class, 4321);
    let msg = parse_message_request(&bytes);
    Request::new(msg, make_src(), Protocol::Udp)
}

// --- Response helpers ---

/// Execute a query through the handler and return the parsed response.
pub async fn execute_query<H: RequestHandler>(
    handler: &H,
    name: &str,
    record_type: RecordType,
) -> Message {
    execute_query_class(handler, name, record_type, DNSClass::IN).await
}

/// Execute a query with an explicit class.
pub async fn execute_query_class<H: RequestHandler>(
    handler: &H,
    name: &str,
    record_type: RecordType,
    query_class: DNSClass,
) -> Message {
    let request = build_request(name, record_type, query_class);
    let response_handler = TestResponseHandler::new();
    handler.handle_request(&request, response_handler.clone()).await;
    response_handler.into_message()
}

/// Extract A addresses from the answer section, in answer order.
pub fn extract_a_ips(msg: &Message) -> Vec<Ipv4Addr> {
    msg.answers()
        .iter()
        .filter_map(|r| match r.data() {
            RData::A(a) => Some(Ipv4Addr::from(*a)),
            _ => None,
        })
        .collect()
}

/// Extract AAAA addresses from the answer section.
pub fn extract_aaaa_ips(msg: &Message) -> Vec<Ipv6Addr> {
    msg.answers()
        .iter()
        .filter_map(|r| match r.data() {
            RData::AAAA(aaaa) => Some(Ipv6Addr::from(*aaaa)),
            _ => None,
        })
        .collect()
}

/// Extract (priority, weight, port, target) from SRV answers.
pub fn extract_srv(msg: &Message) -> Vec<(u16, u16, u16, String)> {
    msg.answers()
        .iter()
        .filter_map(|r| match r.data() {
            RData::SRV(srv) => Some((
                srv.priority(),
                srv.weight(),
                srv.port(),
                srv.target().to_string(),
            )),
            _ => None,
        })
        .collect()
}

/// Assert response code.
pub fn assert_response_code(msg: &Message, expected: ResponseCode) {
    assert_eq!(
        msg.response_code(),
        expected,
        "expected {:?}, got {:?}",
        expected,
        msg.response_code()
    );
}
