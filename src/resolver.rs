//! Resolution orchestrator: a hickory `RequestHandler` that answers service
//! queries from live registry data.
//!
//! Each request runs the same pipeline: parse the query name against the
//! zone, select a healthy registry endpoint, fetch the service's instances,
//! synthesize records for the query type, and map every outcome to a
//! response code. Names outside the zone are handed to the `next` handler
//! in the chain unmodified.

use async_trait::async_trait;
use hickory_proto::op::{Header, ResponseCode};
use hickory_proto::rr::{DNSClass, Record};
use hickory_server::authority::MessageResponseBuilder;
use hickory_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

use crate::config::DnsConfig;
use crate::metrics::{self, RequestResult, Timer};
use crate::pool::EndpointPool;
use crate::query;
use crate::records::{self, ServiceRecordType};

/// Authoritative resolver for services registered in the cluster registry.
///
/// `N` is the next handler in the chain, invoked for every query name that
/// does not fall inside the configured zone. Use [`NotAuthoritative`] when
/// this resolver is the end of the chain.
pub struct NomadResolver<N> {
    config: Arc<DnsConfig>,
    pool: Arc<EndpointPool>,
    server_label: String,
    next: N,
}

impl<N> NomadResolver<N> {
    /// Create a resolver over the given endpoint pool.
    pub fn new(config: DnsConfig, pool: Arc<EndpointPool>, next: N) -> Self {
        let server_label = config.listen_addr.to_string();
        Self {
            config: Arc::new(config),
            pool,
            server_label,
            next,
        }
    }

    /// Write an authoritative response with the given sections.
    async fn respond<R: ResponseHandler>(
        &self,
        request: &Request,
        response_handle: &mut R,
        code: ResponseCode,
        answers: &[Record],
        additionals: &[Record],
    ) -> ResponseInfo {
        let mut header = Header::response_from_request(request.header());
        header.set_authoritative(true);
        header.set_response_code(code);

        let response = MessageResponseBuilder::from_message_request(request).build(
            header,
            answers.iter(),
            [],
            [],
            additionals.iter(),
        );

        match response_handle.send_response(response).await {
            Ok(info) => info,
            Err(e) => {
                error!(error = %e, "failed to write DNS response");
                serve_failed(request)
            }
        }
    }

    /// Write a bare, non-authoritative response carrying only a code.
    async fn refuse<R: ResponseHandler>(
        &self,
        request: &Request,
        response_handle: &mut R,
        code: ResponseCode,
    ) -> ResponseInfo {
        let mut header = Header::response_from_request(request.header());
        header.set_response_code(code);

        let response =
            MessageResponseBuilder::from_message_request(request).build_no_records(header);

        match response_handle.send_response(response).await {
            Ok(info) => info,
            Err(e) => {
                error!(error = %e, "failed to write DNS response");
                serve_failed(request)
            }
        }
    }
}

#[async_trait]
impl<N: RequestHandler> RequestHandler for NomadResolver<N> {
    async fn handle_request<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
    ) -> ResponseInfo {
        let request_info = match request.request_info() {
            Ok(info) => info,
            Err(e) => {
                warn!(src = %request.src(), error = %e, "malformed DNS request");
                return self
                    .refuse(request, &mut response_handle, ResponseCode::FormErr)
                    .await;
            }
        };
        let query = request_info.query;

        if query.query_class() != DNSClass::IN {
            return self
                .refuse(request, &mut response_handle, ResponseCode::Refused)
                .await;
        }

        let qname = query.original().name().clone();
        let qtype = query.query_type();

        let Some(parsed) = query::parse(&query.name().to_string(), &self.config.zone) else {
            trace!(name = %qname, "query outside zone, delegating");
            return self.next.handle_request(request, response_handle).await;
        };

        let timer = Timer::start();
        debug!(
            service = %parsed.service,
            namespace = %parsed.namespace,
            qtype = ?qtype,
            "looking up service"
        );

        let Some(endpoint) = self.pool.select_healthy().await else {
            warn!(service = %parsed.service, "no healthy registry endpoint");
            metrics::record_request(&self.server_label, &parsed.namespace, RequestResult::Failure);
            return self
                .respond(request, &mut response_handle, ResponseCode::ServFail, &[], &[])
                .await;
        };

        let instances = match endpoint
            .fetch_instances(&parsed.service, &parsed.namespace)
            .await
        {
            Ok(instances) => instances,
            Err(e) => {
                error!(endpoint = endpoint.address(), error = %e, "service lookup failed");
                metrics::record_request(
                    &self.server_label,
                    &parsed.namespace,
                    RequestResult::Failure,
                );
                return self
                    .respond(request, &mut response_handle, ResponseCode::ServFail, &[], &[])
                    .await;
            }
        };

        if instances.is_empty() {
            debug!(service = %parsed.service, namespace = %parsed.namespace, "no instances registered");
            metrics::record_request(&self.server_label, &parsed.namespace, RequestResult::Failure);
            let soa = match records::negative_soa(&qname, &self.config.zone, self.config.ttl) {
                Ok(soa) => soa,
                Err(e) => {
                    error!(name = %qname, error = %e, "failed to build SOA record");
                    return self
                        .respond(request, &mut response_handle, ResponseCode::ServFail, &[], &[])
                        .await;
                }
            };
            return self
                .respond(
                    request,
                    &mut response_handle,
                    ResponseCode::NXDomain,
                    &[soa],
                    &[],
                )
                .await;
        }

        let Some(rtype) = ServiceRecordType::from_query_type(qtype) else {
            debug!(qtype = ?qtype, "unsupported query type");
            metrics::record_request(&self.server_label, &parsed.namespace, RequestResult::Failure);
            return self
                .respond(request, &mut response_handle, ResponseCode::NotImp, &[], &[])
                .await;
        };

        let synthesized = match records::synthesize(rtype, &instances, &qname, self.config.ttl) {
            Ok(synthesized) => synthesized,
            Err(e) => {
                error!(service = %parsed.service, error = %e, "record synthesis failed");
                metrics::record_request(
                    &self.server_label,
                    &parsed.namespace,
                    RequestResult::Failure,
                );
                return self
                    .respond(request, &mut response_handle, ResponseCode::ServFail, &[], &[])
                    .await;
            }
        };

        debug!(
            service = %parsed.service,
            answers = synthesized.answers.len(),
            extras = synthesized.additionals.len(),
            "answering"
        );
        metrics::record_request(&self.server_label, &parsed.namespace, RequestResult::Success);
        metrics::record_request_duration(&format!("{:?}", qtype), timer.elapsed());

        self.respond(
            request,
            &mut response_handle,
            ResponseCode::NoError,
            &synthesized.answers,
            &synthesized.additionals,
        )
        .await
    }
}

/// Terminal handler for the end of the chain: refuses every query.
pub struct NotAuthoritative;

#[async_trait]
impl RequestHandler for NotAuthoritative {
    async fn handle_request<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
    ) -> ResponseInfo {
        let mut header = Header::response_from_request(request.header());
        header.set_response_code(ResponseCode::Refused);

        let response =
            MessageResponseBuilder::from_message_request(request).build_no_records(header);

        match response_handle.send_response(response).await {
            Ok(info) => info,
            Err(e) => {
                error!(error = %e, "failed to write refusal");
                serve_failed(request)
            }
        }
    }
}

/// `ResponseInfo` reported to the server loop when a response could not be
/// written to the transport.
fn serve_failed(request: &Request) -> ResponseInfo {
    let mut header = Header::response_from_request(request.header());
    header.set_response_code(ResponseCode::ServFail);
    header.into()
}
