//! The spectator broadcaster: one actor per session, pacing patches or
//! snapshots out to every attached viewer at their own quality tier.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use liku_patch::{diff_with, should_send_full_snapshot};
use liku_registry::AgentId;
use liku_session::{SessionEvent, SessionId};
use liku_tick::{TickConfig, TickScheduler};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::config::SpectatorConfig;
use crate::error::SpectatorError;
use crate::frame::{BroadcastFrame, SpectatorSender};
use crate::record::SpectatorRecord;
use crate::tier::QualityTier;

enum Command {
    Attach { agent_id: AgentId, sender: SpectatorSender, reply: oneshot::Sender<Result<(), SpectatorError>> },
    Detach { agent_id: AgentId },
    RecordLatency { agent_id: AgentId, rtt: Duration },
    SetTierOverride { agent_id: AgentId, tier: Option<QualityTier> },
    SpectatorCount { reply: oneshot::Sender<usize> },
    Shutdown,
}

#[derive(Clone)]
pub struct SpectatorHandle {
    session_id: SessionId,
    sender: mpsc::Sender<Command>,
}

impl SpectatorHandle {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub async fn attach(&self, agent_id: AgentId, sender: SpectatorSender) -> Result<(), SpectatorError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(Command::Attach { agent_id, sender, reply: reply_tx })
            .await
            .map_err(|_| SpectatorError::Unavailable(self.session_id))?;
        reply_rx.await.map_err(|_| SpectatorError::Unavailable(self.session_id))?
    }

    pub async fn detach(&self, agent_id: AgentId) {
        let _ = self.sender.send(Command::Detach { agent_id }).await;
    }

    pub async fn record_latency(&self, agent_id: AgentId, rtt: Duration) {
        let _ = self.sender.send(Command::RecordLatency { agent_id, rtt }).await;
    }

    pub async fn set_tier_override(&self, agent_id: AgentId, tier: Option<QualityTier>) {
        let _ = self.sender.send(Command::SetTierOverride { agent_id, tier }).await;
    }

    pub async fn spectator_count(&self) -> Result<usize, SpectatorError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(Command::SpectatorCount { reply: reply_tx })
            .await
            .map_err(|_| SpectatorError::Unavailable(self.session_id))?;
        reply_rx.await.map_err(|_| SpectatorError::Unavailable(self.session_id))
    }

    pub async fn shutdown(&self) {
        let _ = self.sender.send(Command::Shutdown).await;
    }
}

struct Attached {
    record: SpectatorRecord,
    sender: SpectatorSender,
}

struct SpectatorBroadcaster {
    session_id: SessionId,
    config: SpectatorConfig,
    latest_state: Value,
    spectators: HashMap<AgentId, Attached>,
    session_events: mpsc::UnboundedReceiver<SessionEvent>,
    commands: mpsc::Receiver<Command>,
    scheduler: TickScheduler,
    ping_nonce: u64,
}

impl SpectatorBroadcaster {
    async fn run(mut self) {
        tracing::info!(session_id = %self.session_id, "spectator broadcaster started");
        loop {
            let has_spectators = !self.spectators.is_empty();
            tokio::select! {
                cmd = self.commands.recv() => {
                    match cmd {
                        Some(cmd) => if self.handle_command(cmd) { break },
                        None => break,
                    }
                }
                event = self.session_events.recv() => {
                    match event {
                        Some(event) => self.handle_session_event(event),
                        None => break,
                    }
                }
                tick = self.scheduler.wait_for_tick(), if has_spectators => {
                    self.on_tick(tick.tick);
                }
            }
        }
        tracing::info!(session_id = %self.session_id, "spectator broadcaster stopped");
    }

    fn handle_command(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Attach { agent_id, sender, reply } => {
                let result = self.attach(agent_id, sender);
                let _ = reply.send(result);
            }
            Command::Detach { agent_id } => {
                self.spectators.remove(&agent_id);
            }
            Command::RecordLatency { agent_id, rtt } => {
                if let Some(attached) = self.spectators.get_mut(&agent_id) {
                    let smoothed = attached.record.latency.record(rtt);
                    if attached.record.tier_override.is_none() {
                        attached.record.tier = QualityTier::from_latency(smoothed);
                    }
                }
            }
            Command::SetTierOverride { agent_id, tier } => {
                if let Some(attached) = self.spectators.get_mut(&agent_id) {
                    attached.record.tier_override = tier;
                }
            }
            Command::SpectatorCount { reply } => {
                let _ = reply.send(self.spectators.len());
            }
            Command::Shutdown => return true,
        }
        false
    }

    fn attach(&mut self, agent_id: AgentId, sender: SpectatorSender) -> Result<(), SpectatorError> {
        if self.spectators.len() >= self.config.max_spectators {
            return Err(SpectatorError::CapacityExceeded);
        }
        let mut record = SpectatorRecord::new();
        let snapshot = self.latest_state.clone();
        let sent = sender.send(BroadcastFrame::Snapshot(snapshot.clone())).is_ok();
        if sent {
            record.bytes_sent += serde_json::to_string(&snapshot).map(|s| s.len() as u64).unwrap_or(0);
            record.last_sent_state = Some(snapshot);
            record.last_sent_at = Some(Instant::now());
        } else {
            record.consecutive_failures = 1;
        }
        self.spectators.insert(agent_id, Attached { record, sender });
        Ok(())
    }

    fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::GameStarted { state, .. } | SessionEvent::MoveMade { state, .. } | SessionEvent::Rematch { state } => {
                self.latest_state = state;
            }
            _ => {}
        }
    }

    fn on_tick(&mut self, tick: u64) {
        if self.config.ping_interval_ticks > 0 && tick % self.config.ping_interval_ticks as u64 == 0 {
            self.ping_nonce += 1;
            let nonce = self.ping_nonce;
            for attached in self.spectators.values() {
                let _ = attached.sender.send(BroadcastFrame::Ping { nonce });
            }
        }

        let now = Instant::now();
        let due: Vec<AgentId> = self
            .spectators
            .iter()
            .filter(|(_, attached)| attached.record.is_due(now))
            .map(|(id, _)| *id)
            .collect();

        let mut to_drop = Vec::new();
        for agent_id in due {
            let frame = self.frame_for(&agent_id);
            let size = frame_byte_size(&frame);
            let attached = self.spectators.get_mut(&agent_id).expect("just filtered from self.spectators");
            match attached.sender.send(frame) {
                Ok(()) => {
                    attached.record.bytes_sent += size;
                    attached.record.last_sent_state = Some(self.latest_state.clone());
                    attached.record.last_sent_at = Some(now);
                    attached.record.consecutive_failures = 0;
                }
                Err(_) => {
                    attached.record.consecutive_failures += 1;
                    if attached.record.consecutive_failures >= self.config.max_consecutive_failures {
                        to_drop.push(agent_id);
                    }
                }
            }
        }
        for agent_id in to_drop {
            self.spectators.remove(&agent_id);
        }
    }

    fn frame_for(&self, agent_id: &AgentId) -> BroadcastFrame {
        let attached = &self.spectators[agent_id];
        if self.config.patch_enabled {
            if let Some(prev) = &attached.record.last_sent_state {
                let ops = diff_with(prev, &self.latest_state, self.config.diff_options);
                let patch_size = serde_json::to_string(&ops).map(|s| s.len()).unwrap_or(usize::MAX);
                let full_size = serde_json::to_string(&self.latest_state).map(|s| s.len()).unwrap_or(0);
                if !should_send_full_snapshot(patch_size, full_size, ops.len(), self.config.fallback) {
                    return BroadcastFrame::Patch(ops);
                }
            }
        }
        BroadcastFrame::Snapshot(self.latest_state.clone())
    }
}

fn frame_byte_size(frame: &BroadcastFrame) -> u64 {
    let serialized = match frame {
        BroadcastFrame::Snapshot(state) => serde_json::to_string(state),
        BroadcastFrame::Patch(ops) => serde_json::to_string(ops),
        BroadcastFrame::Ping { nonce } => serde_json::to_string(nonce),
    };
    serialized.map(|s| s.len() as u64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn broadcaster_with_state(state: Value) -> SpectatorBroadcaster {
        let (_cmd_tx, cmd_rx) = mpsc::channel(1);
        let (_ev_tx, ev_rx) = mpsc::unbounded_channel();
        SpectatorBroadcaster {
            session_id: SessionId::new(),
            config: SpectatorConfig::tic_tac_toe(),
            latest_state: state,
            spectators: HashMap::new(),
            session_events: ev_rx,
            commands: cmd_rx,
            scheduler: TickScheduler::new(TickConfig::with_rate(10)),
            ping_nonce: 0,
        }
    }

    #[test]
    fn test_spectator_joining_mid_game_gets_a_full_snapshot() {
        let state = json!({ "board": [["X", null, null], [null, null, null], [null, null, null]] });
        let mut broadcaster = broadcaster_with_state(state.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();
        broadcaster.attach(AgentId::new(), tx).unwrap();
        assert!(matches!(rx.try_recv().unwrap(), BroadcastFrame::Snapshot(s) if s == state));
    }

    #[test]
    fn test_move_after_attach_sends_a_patch_matching_the_cached_state() {
        let before = json!({
            "board": [["X", null, null], [null, null, null], [null, null, null]],
            "currentPlayer": "O",
            "moveCount": 1,
            "lastMove": { "row": 0, "col": 0, "player": "X" },
        });
        let mut broadcaster = broadcaster_with_state(before.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let agent_id = AgentId::new();
        broadcaster.attach(agent_id, tx).unwrap();
        let _ = rx.try_recv().unwrap();

        let after = json!({
            "board": [["X", null, null], [null, "O", null], [null, null, null]],
            "currentPlayer": "X",
            "moveCount": 2,
            "lastMove": { "row": 1, "col": 1, "player": "O" },
        });
        broadcaster.latest_state = after.clone();
        let frame = broadcaster.frame_for(&agent_id);
        let ops = match frame {
            BroadcastFrame::Patch(ops) => ops,
            other => panic!("expected a patch, got {other:?}"),
        };

        let cached = liku_patch::apply(&before, &ops).expect("patch should apply");
        assert_eq!(cached, after);
    }
}

const COMMAND_CHANNEL_SIZE: usize = 64;

/// Spawns a broadcaster for `session_id`. `session_events` should be the
/// receiving half of a channel attached to that session's
/// [`liku_session::SessionHandle::join`] call as a spectator.
pub fn spawn_broadcaster(
    session_id: SessionId,
    config: SpectatorConfig,
    initial_state: Value,
    session_events: mpsc::UnboundedReceiver<SessionEvent>,
) -> SpectatorHandle {
    let hz = (1.0 / config.broadcast_interval.as_secs_f64()).round().max(1.0) as u32;
    let scheduler = TickScheduler::new(TickConfig::with_rate(hz));
    let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

    let actor = SpectatorBroadcaster {
        session_id,
        config,
        latest_state: initial_state,
        spectators: HashMap::new(),
        session_events,
        commands: rx,
        scheduler,
        ping_nonce: 0,
    };

    tokio::spawn(actor.run());

    SpectatorHandle { session_id, sender: tx }
}
