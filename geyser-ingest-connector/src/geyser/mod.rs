//! # Geyser Stream Source
//!
//! The live [`StreamSource`] backed by a Yellowstone gRPC endpoint. Each call to
//! `subscribe` opens a fresh channel, writes the subscribe request on the
//! bidirectional stream and hands the inbound side to the subscription manager as
//! an [`UpdateStream`].
//!
//! Keep-alive pings sent by the server are answered on the same request stream and
//! never reach the dispatcher.

pub mod conversions;

use crate::{
    config::{Commitment, StreamConfig},
    error::StreamError,
    filters::FilterSpec,
    subscription::{StreamSource, UpdateStream},
    update::UpdateEnvelope,
};
use async_trait::async_trait;
use futures::{stream, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{
    metadata::AsciiMetadataValue,
    service::{interceptor::InterceptedService, Interceptor},
    transport::{Channel, ClientTlsConfig, Endpoint},
    Request, Status, Streaming,
};
use yellowstone_grpc_proto::{
    geyser::geyser_client::GeyserClient,
    prelude::{
        subscribe_update::UpdateOneof, GetSlotRequest, GetVersionRequest, SubscribeRequest,
        SubscribeUpdate,
    },
};

const HTTP2_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);
const HTTP2_KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(10);
/// Only the initial request and keep-alive replies are ever queued.
const REQUEST_BUFFER: usize = 8;

type Client = GeyserClient<InterceptedService<Channel, XTokenInterceptor>>;

/// Attaches the `x-token` header to every call when a token is configured.
#[derive(Debug, Clone, Default)]
pub struct XTokenInterceptor {
    x_token: Option<AsciiMetadataValue>,
}

impl XTokenInterceptor {
    pub fn new(x_token: Option<&str>) -> Result<Self, StreamError> {
        let x_token = x_token
            .filter(|token| !token.is_empty())
            .map(AsciiMetadataValue::try_from)
            .transpose()
            .map_err(|_| StreamError::InvalidToken)?;
        Ok(Self { x_token })
    }
}

impl Interceptor for XTokenInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        if let Some(x_token) = self.x_token.clone() {
            request.metadata_mut().insert("x-token", x_token);
        }
        Ok(request)
    }
}

/// What the endpoint reported during a connectivity check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub version: String,
    pub slot: u64,
}

/// A `StreamSource` connected to a Yellowstone Geyser gRPC endpoint.
#[derive(Debug, Clone)]
pub struct GeyserSource {
    endpoint: Endpoint,
    interceptor: XTokenInterceptor,
    commitment: Commitment,
    max_decoding_message_size: usize,
}

impl GeyserSource {
    /// Validates the endpoint and token of `config`. No connection is made yet.
    pub fn new(config: &StreamConfig) -> Result<Self, StreamError> {
        let invalid = |reason: String| StreamError::InvalidEndpoint {
            endpoint: config.endpoint.clone(),
            reason,
        };

        let mut endpoint = Endpoint::from_shared(config.endpoint.clone())
            .map_err(|e| invalid(e.to_string()))?
            .connect_timeout(config.connect_timeout())
            .tcp_nodelay(true)
            .http2_keep_alive_interval(HTTP2_KEEPALIVE_INTERVAL)
            .keep_alive_timeout(HTTP2_KEEPALIVE_TIMEOUT)
            .keep_alive_while_idle(true);

        if config.endpoint.starts_with("https://") {
            endpoint = endpoint
                .tls_config(ClientTlsConfig::new().with_native_roots())
                .map_err(|e| invalid(e.to_string()))?;
        }

        Ok(Self {
            endpoint,
            interceptor: XTokenInterceptor::new(config.x_token.as_deref())?,
            commitment: config.commitment,
            max_decoding_message_size: config.max_decoding_message_size,
        })
    }

    async fn connect(&self) -> Result<Client, StreamError> {
        let channel = self.endpoint.connect().await?;
        Ok(
            GeyserClient::with_interceptor(channel, self.interceptor.clone())
                .max_decoding_message_size(self.max_decoding_message_size),
        )
    }

    /// Connects and queries the server version and current slot.
    pub async fn check(&self) -> Result<ServerInfo, StreamError> {
        let mut client = self.connect().await?;
        let version = client
            .get_version(GetVersionRequest {})
            .await?
            .into_inner()
            .version;
        let slot = client
            .get_slot(GetSlotRequest {
                commitment: Some(conversions::commitment_level(self.commitment) as i32),
            })
            .await?
            .into_inner()
            .slot;
        Ok(ServerInfo { version, slot })
    }
}

/// The live half of an open subscription.
struct Session {
    inbound: Streaming<SubscribeUpdate>,
    requests: mpsc::Sender<SubscribeRequest>,
    keepalive: SubscribeRequest,
}

impl Session {
    /// Reads until the next envelope worth dispatching. `None` means the server
    /// closed the stream.
    async fn next_envelope(&mut self) -> Option<Result<UpdateEnvelope, StreamError>> {
        loop {
            let update = match self.inbound.message().await {
                Ok(Some(update)) => update,
                Ok(None) => return None,
                Err(status) => return Some(Err(status.into())),
            };

            if let Some(UpdateOneof::Ping(_)) = update.update_oneof {
                tracing::trace!("Ping received, answering keep-alive");
                if self.requests.send(self.keepalive.clone()).await.is_err() {
                    return Some(Err(StreamError::WriteFailed));
                }
                continue;
            }

            if let Some(envelope) = conversions::envelope_from_update(update) {
                return Some(Ok(envelope));
            }
        }
    }
}

#[async_trait]
impl StreamSource for GeyserSource {
    async fn subscribe(&self, filter: &FilterSpec) -> Result<UpdateStream, StreamError> {
        let mut client = self.connect().await?;

        let request = conversions::subscribe_request(filter, self.commitment);
        let keepalive = conversions::keepalive_request(&request);

        let (requests, rx) = mpsc::channel(REQUEST_BUFFER);
        requests
            .send(request)
            .await
            .map_err(|_| StreamError::WriteFailed)?;

        let inbound = client.subscribe(ReceiverStream::new(rx)).await?.into_inner();
        tracing::debug!(
            transactions = filter.transactions.len(),
            accounts = filter.accounts.len(),
            slots = filter.slots.len(),
            blocks = filter.blocks.len(),
            "Subscribe request written"
        );

        let session = Session {
            inbound,
            requests,
            keepalive,
        };

        // A failed read ends the stream after yielding its error.
        let updates = stream::unfold(Some(session), |state| async move {
            let mut session = state?;
            match session.next_envelope().await? {
                Ok(envelope) => Some((Ok(envelope), Some(session))),
                Err(e) => Some((Err(e), None)),
            }
        });
        Ok(updates.boxed())
    }
}
