use crate::config::ServerConfig;
use crate::engine::{GameEngine, TickEvents, SKY_DROP_MESSAGE};
use crate::player::PlayerId;
use crate::protocol::{
    winner_wire, GameOverMsg, GameStateMsg, HammerDropMsg, InputCommand, MapSizeWire, PlayerDiedMsg,
    PlayerLeftMsg, PowerupCollectedMsg, PowerupSpawnedMsg, ServerMsg, WelcomeMsg, PROTOCOL_VERSION,
};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("match is full")]
    MatchFull,
}

pub type JoinResult = Result<(PlayerId, WelcomeMsg), JoinError>;

/// Commands from client connections to the game loop
pub enum GameCommand {
    PlayerJoin {
        name: String,
        response: oneshot::Sender<JoinResult>,
    },
    PlayerLeave {
        id: PlayerId,
    },
    PlayerInput {
        id: PlayerId,
        input: InputCommand,
    },
}

/// Broadcasts from game loop to all clients
#[derive(Debug, Clone)]
pub enum GameBroadcast {
    State(GameStateMsg),
    Event(ServerMsg),
    /// Only delivered to the connection of `player_id`
    Direct { player_id: PlayerId, msg: ServerMsg },
}

struct Match {
    engine: GameEngine,
    bots_wanted: usize,
    bots_spawned: usize,
    last_bot_spawn_ms: f64,
}

/// Connected humans and the match they play in, if any.
pub struct Lobby {
    config: ServerConfig,
    humans: BTreeMap<PlayerId, String>,
    next_player_id: PlayerId,
    matches_started: u64,
    current: Option<Match>,
}

impl Lobby {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            humans: BTreeMap::new(),
            next_player_id: 1,
            matches_started: 0,
            current: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.current.is_some()
    }

    pub fn engine(&self) -> Option<&GameEngine> {
        self.current.as_ref().map(|m| &m.engine)
    }

    pub fn engine_mut(&mut self) -> Option<&mut GameEngine> {
        self.current.as_mut().map(|m| &mut m.engine)
    }

    fn allocate_id(&mut self) -> PlayerId {
        let id = self.next_player_id;
        self.next_player_id += 1;
        id
    }

    /// New engine with every connected human and the first bot.
    fn start_match(&mut self) {
        let seed = self.config.rng_seed.wrapping_add(self.matches_started);
        self.matches_started += 1;
        let mut engine = GameEngine::new(self.config.game, seed);
        for (&id, name) in &self.humans {
            engine.create_player(id, name.clone());
        }
        let mut current = Match {
            engine,
            bots_wanted: self.config.bot_fill_target.saturating_sub(self.humans.len()),
            bots_spawned: 0,
            last_bot_spawn_ms: 0.0,
        };
        tracing::info!(
            humans = self.humans.len(),
            bots = current.bots_wanted,
            "Match started"
        );
        if current.bots_wanted > 0 {
            let id = self.allocate_id();
            current.engine.create_bot(id);
            current.bots_spawned = 1;
        }
        self.current = Some(current);
    }

    pub fn join(&mut self, name: String) -> Result<(PlayerId, WelcomeMsg), JoinError> {
        if self.humans.len() >= self.config.max_humans {
            return Err(JoinError::MatchFull);
        }
        let id = self.allocate_id();
        self.humans.insert(id, name.clone());
        tracing::info!(player = id, %name, "Player joined");

        if let Some(current) = self.current.as_mut() {
            current.engine.create_player(id, name);
        } else {
            self.start_match();
        }

        let welcome = WelcomeMsg {
            protocol_version: PROTOCOL_VERSION,
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            self_id: id,
            config: self.config.game,
            map_size: MapSizeWire {
                width: self.config.game.map_width,
                height: self.config.game.map_depth,
            },
        };
        Ok((id, welcome))
    }

    /// Returns the messages to broadcast. Unknown ids are ignored.
    pub fn leave(&mut self, id: PlayerId) -> Vec<GameBroadcast> {
        if self.humans.remove(&id).is_none() {
            return Vec::new();
        }
        tracing::info!(player = id, "Player left");
        if let Some(current) = &mut self.current {
            current.engine.disconnect_player(id);
        }
        if self.humans.is_empty() && self.current.take().is_some() {
            tracing::info!("Last human left, match discarded");
        }
        vec![GameBroadcast::Event(ServerMsg::PlayerLeft(PlayerLeftMsg {
            player_id: id,
        }))]
    }

    pub fn input(&mut self, id: PlayerId, input: &InputCommand) {
        if let Some(engine) = self.engine_mut() {
            engine.submit_input(id, input);
        }
    }

    pub fn snapshot(&self) -> Option<GameStateMsg> {
        self.engine().map(GameEngine::snapshot)
    }

    /// Advance the running match, if any. Returns the events to broadcast.
    pub fn tick(&mut self, dt_ms: f64) -> Vec<GameBroadcast> {
        let interval = self.config.bot_spawn_interval_ms;
        let next_id = self.next_player_id;
        let Some(current) = &mut self.current else {
            return Vec::new();
        };

        let mut spawned_bot = false;
        let now = current.engine.now_ms();
        if current.bots_spawned < current.bots_wanted && now - current.last_bot_spawn_ms >= interval {
            current.engine.create_bot(next_id);
            current.bots_spawned += 1;
            current.last_bot_spawn_ms = now;
            spawned_bot = true;
        }

        let events = current.engine.tick(dt_ms);
        let mut out = event_broadcasts(events);

        let all_bots_in = current.bots_spawned >= current.bots_wanted;
        let over = if all_bots_in { current.engine.match_over() } else { None };

        if spawned_bot {
            self.next_player_id += 1;
        }
        if let Some(over) = over {
            let winner = over
                .winner
                .and_then(|id| self.engine().and_then(|e| e.player(id)))
                .map(winner_wire);
            tracing::info!(winner = ?winner.as_ref().map(|w| &w.name), "Match over");
            out.push(GameBroadcast::Event(ServerMsg::GameOver(GameOverMsg { winner })));
            self.current = None;
            if !self.humans.is_empty() {
                self.start_match();
            }
        }
        out
    }
}

fn event_broadcasts(events: TickEvents) -> Vec<GameBroadcast> {
    let mut out = Vec::new();
    if let Some(count) = events.hammer_drop {
        out.push(GameBroadcast::Event(ServerMsg::HammerDrop(HammerDropMsg {
            message: SKY_DROP_MESSAGE.to_string(),
            count,
        })));
    }
    if !events.powerups_spawned.is_empty() {
        out.push(GameBroadcast::Event(ServerMsg::PowerupSpawned(PowerupSpawnedMsg {
            powerups: events.powerups_spawned,
        })));
    }
    for pickup in events.powerups_collected {
        out.push(GameBroadcast::Direct {
            player_id: pickup.player,
            msg: ServerMsg::PowerupCollected(PowerupCollectedMsg {
                player_id: pickup.player,
                powerup_type: pickup.kind,
            }),
        });
    }
    for death in events.deaths {
        out.push(GameBroadcast::Event(ServerMsg::PlayerDied(PlayerDiedMsg {
            player_id: death.victim,
            killer_id: death.killer,
        })));
    }
    out
}

/// Run the main game loop. Owns the lobby and its match.
pub async fn run_game_loop(
    mut cmd_rx: mpsc::Receiver<GameCommand>,
    broadcast_tx: broadcast::Sender<GameBroadcast>,
    server_config: ServerConfig,
) {
    let tick_rate = server_config.tick_rate_hz;
    let broadcast_every_n = u64::from((tick_rate / server_config.broadcast_rate_hz).max(1));
    let dt_ms = 1000.0 / f64::from(tick_rate);
    let mut lobby = Lobby::new(server_config);
    let mut tick_count: u64 = 0;

    let mut tick_interval = tokio::time::interval(Duration::from_secs_f64(1.0 / f64::from(tick_rate)));
    tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                for msg in lobby.tick(dt_ms) {
                    let _ = broadcast_tx.send(msg);
                }

                // Snapshots may go out at a lower rate than the simulation
                tick_count += 1;
                if tick_count % broadcast_every_n == 0 {
                    if let Some(state) = lobby.snapshot() {
                        let _ = broadcast_tx.send(GameBroadcast::State(state));
                    }
                }
            }

            Some(cmd) = cmd_rx.recv() => {
                match cmd {
                    GameCommand::PlayerJoin { name, response } => {
                        let result = lobby.join(name);
                        if let Err(reason) = &result {
                            tracing::warn!(%reason, "Join refused");
                        }
                        let _ = response.send(result);
                    }
                    GameCommand::PlayerLeave { id } => {
                        for msg in lobby.leave(id) {
                            let _ = broadcast_tx.send(msg);
                        }
                    }
                    GameCommand::PlayerInput { id, input } => {
                        lobby.input(id, &input);
                    }
                }
            }

            else => break,
        }
    }

    tracing::info!("Game loop ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT_MS: f64 = 1000.0 / 60.0;

    fn config(bots: usize) -> ServerConfig {
        ServerConfig {
            bot_fill_target: bots,
            max_humans: 2,
            ..ServerConfig::default()
        }
    }

    #[test]
    fn first_join_starts_match_with_one_bot() {
        let mut lobby = Lobby::new(config(4));
        assert!(!lobby.is_playing());
        let (id, welcome) = lobby.join("Ann".to_string()).unwrap();
        assert_eq!(id, 1);
        assert_eq!(welcome.self_id, 1);
        assert_eq!(welcome.protocol_version, PROTOCOL_VERSION);
        assert_eq!(welcome.map_size.width, 160.0);
        let engine = lobby.engine().unwrap();
        assert_eq!(engine.players().len(), 2);
        assert!(engine.player(2).unwrap().is_bot());
    }

    #[test]
    fn bots_are_staggered_up_to_target() {
        let mut lobby = Lobby::new(config(4));
        lobby.join("Ann".to_string()).unwrap();
        lobby.tick(DT_MS);
        assert_eq!(lobby.engine().unwrap().players().len(), 2);
        for _ in 0..60 {
            lobby.tick(DT_MS);
        }
        let engine = lobby.engine().unwrap();
        assert_eq!(engine.players().len(), 4);
        assert_eq!(engine.players().iter().filter(|p| p.is_bot()).count(), 3);
    }

    #[test]
    fn join_beyond_capacity_is_refused() {
        let mut lobby = Lobby::new(config(4));
        lobby.join("Ann".to_string()).unwrap();
        let (bob, _) = lobby.join("Bob".to_string()).unwrap();
        assert!(lobby.engine().unwrap().player(bob).is_some());
        assert_eq!(lobby.join("Cid".to_string()).unwrap_err(), JoinError::MatchFull);
    }

    #[test]
    fn last_human_leaving_discards_match() {
        let mut lobby = Lobby::new(config(4));
        let (id, _) = lobby.join("Ann".to_string()).unwrap();
        let out = lobby.leave(id);
        assert!(matches!(
            out.as_slice(),
            [GameBroadcast::Event(ServerMsg::PlayerLeft(PlayerLeftMsg { player_id }))] if *player_id == id
        ));
        assert!(!lobby.is_playing());
        assert!(lobby.tick(DT_MS).is_empty());
        assert!(lobby.leave(id).is_empty());
    }

    #[test]
    fn leaving_marks_player_disconnected() {
        let mut lobby = Lobby::new(config(4));
        let (ann, _) = lobby.join("Ann".to_string()).unwrap();
        let (bob, _) = lobby.join("Bob".to_string()).unwrap();
        lobby.leave(bob);
        let engine = lobby.engine().unwrap();
        let gone = engine.player(bob).unwrap();
        assert!(gone.disconnected);
        assert!(!gone.is_alive);
        assert!(engine.player(ann).unwrap().is_alive);
    }

    #[test]
    fn game_over_restarts_with_connected_humans() {
        let mut lobby = Lobby::new(config(2));
        let (ann, _) = lobby.join("Ann".to_string()).unwrap();
        let bot = lobby
            .engine()
            .unwrap()
            .players()
            .iter()
            .find(|p| p.is_bot())
            .map(|p| p.id)
            .unwrap();
        lobby.engine_mut().unwrap().handle_player_death(bot, Some(ann));
        let out = lobby.tick(DT_MS);
        let winner = out.iter().find_map(|b| match b {
            GameBroadcast::Event(ServerMsg::GameOver(msg)) => Some(msg.winner.clone()),
            _ => None,
        });
        let winner = winner.unwrap().unwrap();
        assert_eq!(winner.id, ann);
        assert!(!winner.is_bot);

        let engine = lobby.engine().unwrap();
        assert_eq!(engine.players().len(), 2);
        assert!(engine.player(ann).unwrap().is_alive);
        assert!(engine.player(bot).is_none());
        assert_eq!(engine.now_ms(), 0.0);
    }

    #[test]
    fn inputs_reach_the_engine() {
        let mut lobby = Lobby::new(config(1));
        let (ann, _) = lobby.join("Ann".to_string()).unwrap();
        let input = InputCommand {
            jump: true,
            ..Default::default()
        };
        lobby.input(ann, &input);
        lobby.tick(DT_MS);
        assert!(lobby.engine().unwrap().player(ann).unwrap().is_jumping);
    }

    #[test]
    fn tick_events_become_messages() {
        let events = TickEvents {
            hammer_drop: Some(2),
            powerups_collected: vec![crate::powerup::Pickup {
                player: 7,
                powerup: 1,
                kind: hammer_shared::protocol::PowerupKind::Speed,
            }],
            deaths: vec![crate::combat::Death {
                victim: 3,
                killer: None,
            }],
            ..Default::default()
        };
        let out = event_broadcasts(events);
        assert_eq!(out.len(), 3);
        assert!(matches!(
            &out[0],
            GameBroadcast::Event(ServerMsg::HammerDrop(HammerDropMsg { count: 2, .. }))
        ));
        assert!(matches!(&out[1], GameBroadcast::Direct { player_id: 7, .. }));
        assert!(matches!(
            &out[2],
            GameBroadcast::Event(ServerMsg::PlayerDied(PlayerDiedMsg {
                player_id: 3,
                killer_id: None
            }))
        ));
    }

    #[tokio::test]
    async fn loop_answers_join_and_broadcasts_state() {
        let (game_tx, game_rx) = mpsc::channel(16);
        let (broadcast_tx, mut broadcast_rx) = broadcast::channel(256);
        tokio::spawn(run_game_loop(game_rx, broadcast_tx, config(2)));

        let (response, reply) = oneshot::channel();
        game_tx
            .send(GameCommand::PlayerJoin {
                name: "Ann".to_string(),
                response,
            })
            .await
            .unwrap();
        let (id, _) = reply.await.unwrap().unwrap();

        let state = loop {
            match broadcast_rx.recv().await.unwrap() {
                GameBroadcast::State(state) => break state,
                _ => continue,
            }
        };
        assert!(state.players.contains_key(&id));
    }
}
