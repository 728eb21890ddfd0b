use crate::config::MediaConfig;
use crate::media::media_engine::{
    ConnectionStateHandler, LocalCandidateHandler, MediaConnectionState, MediaEngine,
    MediaEngineFactory,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use rendezvous_core::{CandidateRecord, NegotiationRecord, SdpKind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine as RtcMediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::policy::bundle_policy::RTCBundlePolicy;
use webrtc::peer_connection::policy::rtcp_mux_policy::RTCRtcpMuxPolicy;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::{RTCRtpTransceiver, RTCRtpTransceiverInit};
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::track::track_remote::TrackRemote;

/// `MediaEngine` backed by a webrtc-rs peer connection.
pub struct WebRtcMediaEngine {
    peer_connection: Arc<RTCPeerConnection>,
    /// Remote candidates received before the remote description; `None` once it is applied.
    pending_candidates: Mutex<Option<Vec<RTCIceCandidateInit>>>,
    receivers_added: AtomicBool,
}

impl WebRtcMediaEngine {
    pub async fn new(config: &MediaConfig) -> Result<Self> {
        let mut m = RtcMediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let ice_servers = config
            .ice_servers
            .iter()
            .map(|server| RTCIceServer {
                urls: server.urls.clone(),
                username: server.username.clone().unwrap_or_default(),
                credential: server.credential.clone().unwrap_or_default(),
                ..Default::default()
            })
            .collect();

        let rtc_config = RTCConfiguration {
            ice_servers,
            bundle_policy: RTCBundlePolicy::MaxBundle,
            rtcp_mux_policy: RTCRtcpMuxPolicy::Require,
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                Box::pin(async move {
                    info!(kind = ?track.kind(), id = %track.id(), "remote track received");
                })
            },
        ));

        Ok(Self {
            peer_connection,
            pending_candidates: Mutex::new(Some(Vec::new())),
            receivers_added: AtomicBool::new(false),
        })
    }

    /// Ask to receive one audio and one video stream from the peer.
    async fn add_receivers(&self) -> Result<()> {
        if self.receivers_added.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        for kind in [RTPCodecType::Audio, RTPCodecType::Video] {
            self.peer_connection
                .add_transceiver_from_kind(
                    kind,
                    Some(RTCRtpTransceiverInit {
                        direction: RTCRtpTransceiverDirection::Recvonly,
                        send_encodings: vec![],
                    }),
                )
                .await
                .with_context(|| format!("Failed to add {kind:?} transceiver"))?;
        }
        Ok(())
    }

    fn to_description(record: &NegotiationRecord) -> Result<RTCSessionDescription> {
        let desc = match record.kind {
            SdpKind::Offer => RTCSessionDescription::offer(record.payload.clone())?,
            SdpKind::Answer => RTCSessionDescription::answer(record.payload.clone())?,
        };
        Ok(desc)
    }

    fn to_init(record: &CandidateRecord) -> RTCIceCandidateInit {
        RTCIceCandidateInit {
            candidate: record.payload.clone(),
            sdp_mid: record.media_line_id.clone(),
            sdp_mline_index: Some(record.media_line_index),
            username_fragment: None,
        }
    }
}

fn map_state(state: RTCPeerConnectionState) -> MediaConnectionState {
    match state {
        RTCPeerConnectionState::Unspecified | RTCPeerConnectionState::New => {
            MediaConnectionState::New
        }
        RTCPeerConnectionState::Connecting => MediaConnectionState::Connecting,
        RTCPeerConnectionState::Connected => MediaConnectionState::Connected,
        RTCPeerConnectionState::Disconnected => MediaConnectionState::Disconnected,
        RTCPeerConnectionState::Failed => MediaConnectionState::Failed,
        RTCPeerConnectionState::Closed => MediaConnectionState::Closed,
    }
}

#[async_trait]
impl MediaEngine for WebRtcMediaEngine {
    async fn create_offer(&self) -> Result<String> {
        self.add_receivers().await?;
        let offer = self
            .peer_connection
            .create_offer(None)
            .await
            .context("Failed to create offer")?;
        Ok(offer.sdp)
    }

    async fn create_answer(&self) -> Result<String> {
        let answer = self
            .peer_connection
            .create_answer(None)
            .await
            .context("Failed to create answer")?;
        Ok(answer.sdp)
    }

    async fn set_local_description(&self, record: &NegotiationRecord) -> Result<()> {
        let desc = Self::to_description(record)?;
        self.peer_connection
            .set_local_description(desc)
            .await
            .context("Failed to set local description")?;
        Ok(())
    }

    async fn set_remote_description(&self, record: &NegotiationRecord) -> Result<()> {
        let desc = Self::to_description(record)?;
        self.peer_connection
            .set_remote_description(desc)
            .await
            .context("Failed to set remote description")?;

        let mut pending = self.pending_candidates.lock().await;
        let buffered = pending.take().unwrap_or_default();
        if !buffered.is_empty() {
            debug!(count = buffered.len(), "applying buffered remote candidates");
        }
        for candidate in buffered {
            if let Err(e) = self.peer_connection.add_ice_candidate(candidate).await {
                warn!("Failed to add buffered ICE candidate: {:?}", e);
            }
        }
        Ok(())
    }

    async fn add_candidate(&self, record: &CandidateRecord) -> Result<()> {
        let init = Self::to_init(record);
        let mut pending = self.pending_candidates.lock().await;
        if let Some(buffer) = pending.as_mut() {
            buffer.push(init);
            return Ok(());
        }
        self.peer_connection
            .add_ice_candidate(init)
            .await
            .context("Failed to add ICE candidate")?;
        Ok(())
    }

    fn on_local_candidate(&self, handler: LocalCandidateHandler) {
        let handler: Arc<dyn Fn(CandidateRecord) + Send + Sync> = Arc::from(handler);
        self.peer_connection
            .on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
                let handler = Arc::clone(&handler);
                Box::pin(async move {
                    let Some(candidate) = c else { return };
                    let Ok(init) = candidate.to_json() else {
                        return;
                    };
                    handler(CandidateRecord {
                        media_line_id: init.sdp_mid,
                        media_line_index: init.sdp_mline_index.unwrap_or(0),
                        payload: init.candidate,
                    });
                })
            }));
    }

    fn on_connection_state_change(&self, handler: ConnectionStateHandler) {
        let handler: Arc<dyn Fn(MediaConnectionState) + Send + Sync> = Arc::from(handler);
        self.peer_connection
            .on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
                let handler = Arc::clone(&handler);
                Box::pin(async move {
                    info!("Peer Connection State changed: {:?}", s);
                    handler(map_state(s));
                })
            }));
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}

/// Creates a fresh `WebRtcMediaEngine` for every call.
#[derive(Clone, Default)]
pub struct WebRtcEngineFactory {
    config: MediaConfig,
}

impl WebRtcEngineFactory {
    pub fn new(config: MediaConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl MediaEngineFactory for WebRtcEngineFactory {
    async fn create(&self) -> Result<Arc<dyn MediaEngine>> {
        let engine = WebRtcMediaEngine::new(&self.config).await?;
        Ok(Arc::new(engine))
    }
}
