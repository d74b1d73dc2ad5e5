//! Drives one [`LockSession`] over a live connection.
//!
//! The runtime task owns the socket, the heartbeat timer, the session
//! state machine, and a [`LockObserver`] for the same kind. Callers steer
//! it through a [`SessionHandle`] and learn about denials, lost locks and
//! state changes from a [`SessionEvent`] stream. Commands keep flowing
//! while the runtime is reconnecting; the session decides what to
//! re-request once the channel is back.

use std::marker::PhantomData;
use std::sync::Arc;

use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use pedidos_core::locking::ResourceKind;
use pedidos_core::observer::{LockInfo, LockObserver};
use pedidos_core::protocol::{ClientMessage, ServerMessage};
use pedidos_core::session::{LockSession, SessionEffect, SessionState};
use pedidos_core::types::ResourceId;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Interval;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::client::{send_frame, ClientError, LockClient, LockConnection, LockStream};
use crate::reconnect::reconnect_loop;

const COMMAND_BUFFER: usize = 64;

type LockSink = SplitSink<LockStream, Message>;

/// Something the user interface should react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session moved to a new state.
    StateChanged(SessionState),
    /// The record is being edited by someone else.
    LockDenied { holder_display_name: String },
    /// A lock this session held was reclaimed; unsaved edits may be lost.
    LockLost,
    /// The channel dropped. The runtime is reconnecting.
    Disconnected,
    /// The channel is back and the session is re-confirming.
    Reconnected,
}

#[derive(Debug)]
enum SessionCommand {
    Open(ResourceId),
    Close,
    Retry,
    Visibility(bool),
    LockInfo {
        resource_id: ResourceId,
        reply: oneshot::Sender<LockInfo>,
    },
}

/// Handle to a running session of kind `K`.
pub struct SessionHandle<K: ResourceKind> {
    tx: mpsc::Sender<SessionCommand>,
    cancel: CancellationToken,
    _kind: PhantomData<K>,
}

impl<K: ResourceKind> Clone for SessionHandle<K> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            cancel: self.cancel.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K: ResourceKind> SessionHandle<K> {
    /// Open (or switch to) a record for editing.
    pub async fn open(&self, resource_id: impl Into<ResourceId>) -> Result<(), ClientError> {
        self.send(SessionCommand::Open(resource_id.into())).await
    }

    /// Close the open record, releasing its lock.
    pub async fn close(&self) -> Result<(), ClientError> {
        self.send(SessionCommand::Close).await
    }

    /// Ask again after a denial or after the lock went away.
    pub async fn retry(&self) -> Result<(), ClientError> {
        self.send(SessionCommand::Retry).await
    }

    /// Report whether the editing view is in the foreground.
    pub async fn set_visible(&self, visible: bool) -> Result<(), ClientError> {
        self.send(SessionCommand::Visibility(visible)).await
    }

    /// Indicator state of any record of this kind, as seen by this user.
    pub async fn lock_info(&self, resource_id: impl Into<ResourceId>) -> Result<LockInfo, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::LockInfo {
            resource_id: resource_id.into(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| ClientError::Closed)
    }

    /// Release whatever is held and stop the runtime.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    async fn send(&self, cmd: SessionCommand) -> Result<(), ClientError> {
        self.tx.send(cmd).await.map_err(|_| ClientError::Closed)
    }
}

/// Start a session runtime for kind `K` on its own task.
///
/// The task connects, then keeps the session alive across transport loss
/// until `cancel` fires or every handle is dropped.
pub fn spawn_session<K: ResourceKind>(
    client: LockClient,
    cancel: CancellationToken,
) -> (
    SessionHandle<K>,
    mpsc::UnboundedReceiver<SessionEvent>,
    JoinHandle<()>,
) {
    let (tx, commands) = mpsc::channel(COMMAND_BUFFER);
    let (events, events_rx) = mpsc::unbounded_channel();
    let runtime = SessionRuntime::<K> {
        session: LockSession::new(client.identity().clone()),
        observer: LockObserver::new(),
        client: Arc::new(client),
        events,
        heartbeat_active: false,
    };
    let join = tokio::spawn(runtime.run(commands, cancel.clone()));
    let handle = SessionHandle {
        tx,
        cancel,
        _kind: PhantomData,
    };
    (handle, events_rx, join)
}

enum DriveOutcome {
    Lost,
    Shutdown,
}

struct SessionRuntime<K: ResourceKind> {
    client: Arc<LockClient>,
    session: LockSession<K>,
    observer: LockObserver<K>,
    events: mpsc::UnboundedSender<SessionEvent>,
    heartbeat_active: bool,
}

impl<K: ResourceKind> SessionRuntime<K> {
    async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>, cancel: CancellationToken) {
        let mut pending = match self.client.connect().await {
            Ok(conn) => Some(conn),
            Err(e) => {
                tracing::warn!(error = %e, "Initial connection failed");
                self.go_offline();
                None
            }
        };
        let mut reconnected = false;

        loop {
            let conn = match pending.take() {
                Some(conn) => conn,
                None => match self.reconnect(&mut commands, &cancel).await {
                    Some(conn) => conn,
                    None => return,
                },
            };
            if reconnected {
                self.emit(SessionEvent::Reconnected);
            }

            match self.drive(conn, &mut commands, &cancel).await {
                DriveOutcome::Shutdown => return,
                DriveOutcome::Lost => {
                    self.go_offline();
                    self.emit(SessionEvent::Disconnected);
                    reconnected = true;
                }
            }
        }
    }

    /// Nothing held is assumed to survive a dropped channel.
    fn go_offline(&mut self) {
        let before = self.session.state().clone();
        let effects = self.session.transport_lost();
        for effect in effects {
            self.apply_local(effect);
        }
        self.observer.clear();
        self.emit_if_changed(&before);
    }

    /// Back off until a connection is up, feeding commands to the offline
    /// session meanwhile. `None` on cancel or when every handle is gone.
    async fn reconnect(
        &mut self,
        commands: &mut mpsc::Receiver<SessionCommand>,
        cancel: &CancellationToken,
    ) -> Option<LockConnection> {
        let client = Arc::clone(&self.client);
        let cancel = cancel.clone();
        let attempt = async move {
            let config = client.config().reconnect.clone();
            reconnect_loop(&client, &config, &cancel).await
        };
        tokio::pin!(attempt);

        loop {
            tokio::select! {
                conn = &mut attempt => return conn,
                cmd = commands.recv() => {
                    let Some(cmd) = cmd else {
                        return None;
                    };
                    let before = self.session.state().clone();
                    let effects = self.command(cmd);
                    for effect in effects {
                        if let Some(frame) = self.apply_local(effect) {
                            tracing::debug!(?frame, "Frame dropped while offline");
                        }
                    }
                    self.emit_if_changed(&before);
                }
            }
        }
    }

    async fn drive(
        &mut self,
        conn: LockConnection,
        commands: &mut mpsc::Receiver<SessionCommand>,
        cancel: &CancellationToken,
    ) -> DriveOutcome {
        let (mut sink, mut stream) = conn.ws_stream.split();
        let mut heartbeat = tokio::time::interval(self.client.config().heartbeat_interval);
        heartbeat.reset();

        let effects = self.session.transport_restored();
        if self.apply(effects, &mut sink, &mut heartbeat).await.is_err() {
            return DriveOutcome::Lost;
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.finish(&mut sink, &mut heartbeat).await;
                    return DriveOutcome::Shutdown;
                }
                cmd = commands.recv() => {
                    let Some(cmd) = cmd else {
                        self.finish(&mut sink, &mut heartbeat).await;
                        return DriveOutcome::Shutdown;
                    };
                    let before = self.session.state().clone();
                    let effects = self.command(cmd);
                    if self.apply(effects, &mut sink, &mut heartbeat).await.is_err() {
                        return DriveOutcome::Lost;
                    }
                    self.emit_if_changed(&before);
                }
                _ = heartbeat.tick(), if self.heartbeat_active => {
                    let effects = self.session.heartbeat_tick();
                    if self.apply(effects, &mut sink, &mut heartbeat).await.is_err() {
                        return DriveOutcome::Lost;
                    }
                }
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        let message = match ServerMessage::parse(&text) {
                            Ok(message) => message,
                            Err(e) => {
                                tracing::warn!(error = %e, "Unparsable server frame");
                                continue;
                            }
                        };
                        if let ServerMessage::Error { code, message } = &message {
                            tracing::warn!(%code, %message, "Server rejected a frame");
                        }
                        self.observer.apply(&message);
                        let before = self.session.state().clone();
                        let effects = self.session.handle(&message);
                        if self.apply(effects, &mut sink, &mut heartbeat).await.is_err() {
                            return DriveOutcome::Lost;
                        }
                        self.emit_if_changed(&before);
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!("Lock server closed the connection");
                        return DriveOutcome::Lost;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "WebSocket receive error");
                        return DriveOutcome::Lost;
                    }
                },
            }
        }
    }

    fn command(&mut self, cmd: SessionCommand) -> Vec<SessionEffect> {
        match cmd {
            SessionCommand::Open(resource_id) => self.session.open(resource_id),
            SessionCommand::Close => self.session.close(),
            SessionCommand::Retry => self.session.retry(),
            SessionCommand::Visibility(visible) => self.session.visibility_changed(visible),
            SessionCommand::LockInfo { resource_id, reply } => {
                let me = self.session.identity().user_id.as_str();
                let _ = reply.send(self.observer.lock_info(&resource_id, Some(me)));
                Vec::new()
            }
        }
    }

    /// Best-effort release before the socket goes away.
    async fn finish(&mut self, sink: &mut LockSink, heartbeat: &mut Interval) {
        let effects = self.session.teardown();
        let _ = self.apply(effects, sink, heartbeat).await;
        let _ = sink.close().await;
    }

    async fn apply(
        &mut self,
        effects: Vec<SessionEffect>,
        sink: &mut LockSink,
        heartbeat: &mut Interval,
    ) -> Result<(), ClientError> {
        for effect in effects {
            if matches!(effect, SessionEffect::StartHeartbeat) {
                heartbeat.reset();
            }
            if let Some(frame) = self.apply_local(effect) {
                send_frame(sink, &frame).await?;
            }
        }
        Ok(())
    }

    /// Carry out an effect that needs no socket; hand back frames to send.
    fn apply_local(&mut self, effect: SessionEffect) -> Option<ClientMessage> {
        match effect {
            SessionEffect::Send(frame) => return Some(frame),
            SessionEffect::StartHeartbeat => self.heartbeat_active = true,
            SessionEffect::StopHeartbeat => self.heartbeat_active = false,
            SessionEffect::LockDenied {
                holder_display_name,
            } => self.emit(SessionEvent::LockDenied {
                holder_display_name,
            }),
            SessionEffect::LockLost => {
                tracing::warn!(
                    resource_kind = K::NAME,
                    resource_id = self.session.resource_id(),
                    "Edit lock lost"
                );
                self.emit(SessionEvent::LockLost);
            }
        }
        None
    }

    fn emit_if_changed(&self, before: &SessionState) {
        if self.session.state() != before {
            self.emit(SessionEvent::StateChanged(self.session.state().clone()));
        }
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}
