use crate::api::{ApiHandler, ApiRequest, ApiResponse};
use crate::error::{AppError, AppResult};
use crate::services::UserScoreUpdate;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::RwLock;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Subscription control sent by clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "subscribe")]
    Subscribe {
        channel: String, // "event:{id}", "match:{id}", "user:{uid}"
    },
    #[serde(rename = "unsubscribe")]
    Unsubscribe { channel: String },
}

/// Change notifications pushed to subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WsMessage {
    #[serde(rename = "match_created")]
    MatchCreated {
        event_id: String,
        match_id: String,
        game_number: u32,
    },
    #[serde(rename = "match_resolved")]
    MatchResolved {
        event_id: String,
        match_id: String,
        bets_scored: usize,
        next_match_id: Option<String>,
    },
    #[serde(rename = "match_deleted")]
    MatchDeleted { event_id: String, match_id: String },
    #[serde(rename = "event_deleted")]
    EventDeleted { event_id: String },
    #[serde(rename = "score_updated")]
    ScoreUpdated {
        user_id: String,
        points_added: i64,
        total_score: i64,
        new_badges: Vec<String>,
    },
}

/// A notification addressed to one channel
#[derive(Debug, Clone)]
struct Envelope {
    channel: String,
    message: WsMessage,
}

/// WebSocket server for the JSON API and change notifications
pub struct WebSocketServer {
    tx: broadcast::Sender<Envelope>,
    /// Active subscriptions: channel -> client IDs
    subscriptions: Arc<RwLock<HashMap<String, Vec<Uuid>>>>,
    /// Client subscriptions: client_id -> channels
    client_channels: Arc<RwLock<HashMap<Uuid, Vec<String>>>>,
}

impl WebSocketServer {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1000);

        Self {
            tx,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            client_channels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Send a message to everyone subscribed to `channel`
    pub async fn broadcast_to_channel(&self, channel: &str, message: WsMessage) {
        let subscriptions = self.subscriptions.read().await;

        let count = subscriptions.get(channel).map_or(0, |s| s.len());
        if count == 0 {
            return;
        }

        info!("Broadcasting to {} subscribers on channel {}", count, channel);
        let envelope = Envelope {
            channel: channel.to_string(),
            message,
        };
        if let Err(e) = self.tx.send(envelope) {
            warn!("Failed to broadcast message: {}", e);
        }
    }

    pub async fn subscribe(&self, client_id: Uuid, channel: String) {
        let mut subscriptions = self.subscriptions.write().await;
        let mut client_channels = self.client_channels.write().await;

        let subscribers = subscriptions.entry(channel.clone()).or_default();
        if !subscribers.contains(&client_id) {
            subscribers.push(client_id);
        }

        let channels = client_channels.entry(client_id).or_default();
        if !channels.contains(&channel) {
            channels.push(channel.clone());
        }

        info!("Client {} subscribed to {}", client_id, channel);
    }

    pub async fn unsubscribe(&self, client_id: Uuid, channel: &str) {
        let mut subscriptions = self.subscriptions.write().await;
        let mut client_channels = self.client_channels.write().await;

        if let Some(subscribers) = subscriptions.get_mut(channel) {
            subscribers.retain(|&id| id != client_id);
            if subscribers.is_empty() {
                subscriptions.remove(channel);
            }
        }

        if let Some(channels) = client_channels.get_mut(&client_id) {
            channels.retain(|c| c != channel);
        }

        info!("Client {} unsubscribed from {}", client_id, channel);
    }

    /// Drop every subscription of a disconnected client
    pub async fn disconnect(&self, client_id: Uuid) {
        let channels = self
            .client_channels
            .write()
            .await
            .remove(&client_id)
            .unwrap_or_default();

        let mut subscriptions = self.subscriptions.write().await;
        for channel in channels {
            if let Some(subscribers) = subscriptions.get_mut(&channel) {
                subscribers.retain(|&id| id != client_id);
                if subscribers.is_empty() {
                    subscriptions.remove(&channel);
                }
            }
        }
    }

    pub async fn is_client_subscribed(&self, client_id: Uuid, channel: &str) -> bool {
        let subscriptions = self.subscriptions.read().await;
        subscriptions
            .get(channel)
            .map_or(false, |subscribers| subscribers.contains(&client_id))
    }

    /// Serve one client: API requests are answered in order, notifications
    /// for subscribed channels are forwarded as they happen
    pub async fn handle_connection(
        &self,
        stream: tokio::net::TcpStream,
        handler: Arc<ApiHandler>,
    ) -> AppResult<()> {
        let ws_stream = accept_async(stream)
            .await
            .map_err(|e| AppError::Message(format!("WebSocket handshake failed: {}", e)))?;

        let (ws_sender, mut ws_receiver) = ws_stream.split();
        let ws_sender = Arc::new(tokio::sync::Mutex::new(ws_sender));
        let mut rx = self.tx.subscribe();
        let client_id = Uuid::new_v4();

        info!("New WebSocket connection: {}", client_id);

        let welcome = serde_json::json!({
            "type": "connected",
            "client_id": client_id.to_string(),
        });
        if let Err(e) = ws_sender.lock().await.send(Message::Text(welcome.to_string())).await {
            warn!("Failed to send welcome message: {}", e);
        }

        let server = self.clone();
        let sender = ws_sender.clone();
        let forwarder = tokio::spawn(async move {
            loop {
                let envelope = match rx.recv().await {
                    Ok(envelope) => envelope,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Client {} lagged, {} notifications dropped", client_id, skipped);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };

                if !server.is_client_subscribed(client_id, &envelope.channel).await {
                    continue;
                }

                let json = match serde_json::to_string(&envelope.message) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize message: {}", e);
                        continue;
                    }
                };

                if let Err(e) = sender.lock().await.send(Message::Text(json)).await {
                    error!("Failed to send message to client {}: {}", client_id, e);
                    break;
                }
            }
        });

        while let Some(msg) = ws_receiver.next().await {
            let text = match msg {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => {
                    info!("WebSocket connection closed: {}", client_id);
                    break;
                }
                Ok(_) => continue,
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
            };

            let reply = self.handle_text(client_id, &text, &handler).await;
            if let Err(e) = ws_sender.lock().await.send(Message::Text(reply)).await {
                warn!("Failed to reply to client {}: {}", client_id, e);
                break;
            }
        }

        forwarder.abort();
        self.disconnect(client_id).await;
        Ok(())
    }

    async fn handle_text(&self, client_id: Uuid, text: &str, handler: &ApiHandler) -> String {
        if let Ok(control) = serde_json::from_str::<ClientMessage>(text) {
            let ack = match control {
                ClientMessage::Subscribe { channel } => {
                    self.subscribe(client_id, channel.clone()).await;
                    serde_json::json!({ "type": "subscribed", "channel": channel })
                }
                ClientMessage::Unsubscribe { channel } => {
                    self.unsubscribe(client_id, &channel).await;
                    serde_json::json!({ "type": "unsubscribed", "channel": channel })
                }
            };
            return ack.to_string();
        }

        let response = match serde_json::from_str::<ApiRequest>(text) {
            Ok(request) => handler.handle(request).await,
            Err(e) => {
                warn!("Failed to parse message from client {}: {}", client_id, e);
                ApiResponse::failure(
                    String::new(),
                    &AppError::InvalidArgument(format!("Invalid message format: {}", e)),
                )
            }
        };

        serde_json::to_string(&response).unwrap_or_else(|e| {
            error!("Failed to serialize response: {}", e);
            r#"{"ok":false,"error":{"kind":"internal","message":"serialization failed"}}"#.to_string()
        })
    }

    pub async fn broadcast_match_created(&self, event_id: Uuid, match_id: Uuid, game_number: u32) {
        let message = WsMessage::MatchCreated {
            event_id: event_id.to_string(),
            match_id: match_id.to_string(),
            game_number,
        };
        self.broadcast_to_channel(&format!("event:{}", event_id), message)
            .await;
    }

    pub async fn broadcast_match_resolved(
        &self,
        event_id: Uuid,
        match_id: Uuid,
        bets_scored: usize,
        next_match_id: Option<Uuid>,
    ) {
        let message = WsMessage::MatchResolved {
            event_id: event_id.to_string(),
            match_id: match_id.to_string(),
            bets_scored,
            next_match_id: next_match_id.map(|id| id.to_string()),
        };

        self.broadcast_to_channel(&format!("event:{}", event_id), message.clone())
            .await;
        self.broadcast_to_channel(&format!("match:{}", match_id), message)
            .await;
    }

    pub async fn broadcast_match_deleted(&self, event_id: Uuid, match_id: Uuid) {
        let message = WsMessage::MatchDeleted {
            event_id: event_id.to_string(),
            match_id: match_id.to_string(),
        };

        self.broadcast_to_channel(&format!("event:{}", event_id), message.clone())
            .await;
        self.broadcast_to_channel(&format!("match:{}", match_id), message)
            .await;
    }

    /// Tell a user their totals moved after a resolution
    pub async fn broadcast_score_updated(&self, update: &UserScoreUpdate) {
        let message = WsMessage::ScoreUpdated {
            user_id: update.user_id.clone(),
            points_added: update.points_added,
            total_score: update.total_score,
            new_badges: update.new_badges.clone(),
        };
        self.broadcast_to_channel(&format!("user:{}", update.user_id), message)
            .await;
    }

    pub async fn broadcast_event_deleted(&self, event_id: Uuid) {
        let message = WsMessage::EventDeleted {
            event_id: event_id.to_string(),
        };
        self.broadcast_to_channel(&format!("event:{}", event_id), message)
            .await;
    }
}

impl Clone for WebSocketServer {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            subscriptions: Arc::clone(&self.subscriptions),
            client_channels: Arc::clone(&self.client_channels),
        }
    }
}

impl Default for WebSocketServer {
    fn default() -> Self {
        Self::new()
    }
}
