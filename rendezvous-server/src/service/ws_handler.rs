use crate::service::store_service::StoreService;
use crate::service::subscription_set::SubscriptionSet;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use rendezvous_core::{StoreRequest, StoreResponse};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(service): State<StoreService>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, service))
}

async fn handle_socket(socket: WebSocket, service: StoreService) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let conn = service.add_connection(tx);
    info!("New WebSocket connection: {}", conn);

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let service = service.clone();

        async move {
            let mut subscriptions = SubscriptionSet::default();

            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<StoreRequest>(&text) {
                        Ok(request) => service.execute(conn, request, &mut subscriptions).await,
                        Err(e) => {
                            warn!("Invalid StoreRequest from {}: {:?}", conn, e);
                            service.send_frame(
                                conn,
                                StoreResponse::Error {
                                    id: 0,
                                    message: format!("malformed request: {e}"),
                                },
                            );
                        }
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }

            debug!(conn, open = subscriptions.len(), "dropping subscriptions");
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    service.remove_connection(conn);
    info!("WebSocket disconnected: {}", conn);
}
