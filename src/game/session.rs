use futures::future::BoxFuture;
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::state::{progress_percent, GameView, Phase, RoundView};
use crate::config::GameConfig;
use crate::player::Player;
use crate::quiz::{QuizProvider, Round};
use crate::stats::StatsSink;
use crate::websockets::{ConnectionManager, WebSocketMessage};

/// Whether the round clock keeps running after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClockControl {
    Continue,
    Stop,
}

#[derive(Default)]
struct SessionState {
    /// Bumped on every start and on end; tasks holding an older value stand down
    generation: u64,
    phase: Phase,
    started: bool,
    topic_id: Option<String>,
    rounds: Vec<Round>,
    rounds_total: usize,
    rounds_left: usize,
    current_round: Option<Round>,
    time_left: u32,
    reveal_elapsed: u32,
    show_correct_answer: bool,
    show_result: bool,
    players: Vec<Player>,
    waiting: Vec<Player>,
    clock: Option<JoinHandle<()>>,
    restart: Option<JoinHandle<()>>,
}

impl SessionState {
    fn clear_selections(&mut self) {
        for player in self.players.iter_mut() {
            player.selected_choice = None;
        }
    }

    fn knows(&self, player: &Player) -> bool {
        let Some(connection_id) = player.connection_id.as_deref() else {
            return false;
        };
        self.players
            .iter()
            .chain(self.waiting.iter())
            .any(|p| p.has_connection(connection_id))
    }
}

/// One quiz game bound to a room, or to a single connection in single player mode.
///
/// All mutation happens under one async lock. Broadcasts are issued while that lock
/// is held, which keeps snapshots in order and guarantees nothing is sent after `end`.
pub struct GameSession {
    room_id: String,
    instance_id: String,
    config: GameConfig,
    quiz_provider: Arc<dyn QuizProvider>,
    stats_sink: Arc<dyn StatsSink>,
    connection_manager: Arc<dyn ConnectionManager>,
    state: Mutex<SessionState>,
    on_end: Mutex<Option<BoxFuture<'static, ()>>>,
}

impl GameSession {
    pub fn new(
        room_id: impl Into<String>,
        config: GameConfig,
        quiz_provider: Arc<dyn QuizProvider>,
        stats_sink: Arc<dyn StatsSink>,
        connection_manager: Arc<dyn ConnectionManager>,
    ) -> Self {
        Self {
            room_id: room_id.into(),
            instance_id: Uuid::new_v4().to_string(),
            config,
            quiz_provider,
            stats_sink,
            connection_manager,
            state: Mutex::new(SessionState::default()),
            on_end: Mutex::new(None),
        }
    }

    /// Registers a hook that runs once, after the session has ended
    pub fn with_end_hook(self, hook: BoxFuture<'static, ()>) -> Self {
        Self {
            on_end: Mutex::new(Some(hook)),
            ..self
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub async fn is_started(&self) -> bool {
        self.state.lock().await.started
    }

    pub async fn phase(&self) -> Phase {
        self.state.lock().await.phase
    }

    /// Participants followed by members waiting for the next game
    pub async fn roster(&self) -> Vec<Player> {
        let state = self.state.lock().await;
        state
            .players
            .iter()
            .chain(state.waiting.iter())
            .cloned()
            .collect()
    }

    pub async fn snapshot(&self) -> GameView {
        let state = self.state.lock().await;
        self.live_view(&state)
    }

    /// Starts a game for `players` on `topic_id`.
    ///
    /// On a session that is already running the call only admits latecomers.
    /// Returns whether a game is running afterwards.
    #[instrument(skip(self, players), fields(room_id = %self.room_id, players = players.len()))]
    pub async fn start(self: &Arc<Self>, players: Vec<Player>, topic_id: &str) -> bool {
        let mut state = self.state.lock().await;
        match state.phase {
            Phase::Ended => {
                debug!("Ignoring start on an ended session");
                return false;
            }
            _ if state.started => {
                drop(state);
                self.add_latecomers(players).await;
                return true;
            }
            _ => {}
        }

        let rounds = self.playable_rounds(topic_id).await;
        if rounds.is_empty() {
            info!(topic_id = %topic_id, "No playable rounds for topic, game not started");
            return false;
        }

        self.begin_game(&mut state, players, topic_id.to_string(), rounds)
            .await;
        true
    }

    async fn begin_game(
        self: &Arc<Self>,
        state: &mut SessionState,
        mut players: Vec<Player>,
        topic_id: String,
        rounds: Vec<Round>,
    ) {
        for player in players.iter_mut() {
            player.reset_progress();
        }

        if let Some(clock) = state.clock.take() {
            clock.abort();
        }
        if let Some(restart) = state.restart.take() {
            restart.abort();
        }

        state.generation += 1;
        state.topic_id = Some(topic_id);
        state.rounds_total = rounds.len();
        state.rounds_left = rounds.len();
        state.rounds = rounds;
        state.players = players;
        state.waiting.clear();
        state.started = true;
        state.show_result = false;
        Self::load_next_round(state, self.config.seconds_to_answer);

        info!(
            generation = state.generation,
            rounds = state.rounds_total,
            players = state.players.len(),
            "Game started"
        );

        state.clock = Some(self.spawn_clock(state.generation));
        self.publish(state).await;
    }

    /// Rounds of `topic_id` capped at the game length; empty means the game cannot start
    async fn playable_rounds(&self, topic_id: &str) -> Vec<Round> {
        let mut rounds = self.quiz_provider.rounds_for_topic(topic_id).await;
        rounds.truncate(self.config.rounds_per_game);
        rounds
    }

    fn load_next_round(state: &mut SessionState, seconds_to_answer: u32) {
        let index = state.rounds_total - state.rounds_left;
        state.current_round = state.rounds.get(index).cloned();
        state.rounds_left = state.rounds_left.saturating_sub(1);
        state.time_left = seconds_to_answer;
        state.reveal_elapsed = 0;
        state.show_correct_answer = false;
        state.phase = Phase::Counting;
    }

    fn spawn_clock(self: &Arc<Self>, generation: u64) -> JoinHandle<()> {
        let session: Weak<Self> = Arc::downgrade(self);
        let period = self.config.tick_interval;

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let Some(session) = session.upgrade() else {
                    break;
                };
                if session.tick(generation).await == ClockControl::Stop {
                    break;
                }
            }
        })
    }

    /// Advances the round cycle by one clock period
    pub(crate) async fn tick(self: &Arc<Self>, generation: u64) -> ClockControl {
        let mut state = self.state.lock().await;
        if state.generation != generation || !state.phase.is_ticking() {
            return ClockControl::Stop;
        }

        let control = match state.phase {
            Phase::Counting => {
                state.time_left = state.time_left.saturating_sub(1);
                if state.time_left == 0 {
                    self.score_round(&mut state);
                    state.show_correct_answer = true;
                    state.reveal_elapsed = 0;
                    state.phase = Phase::Revealing;
                }
                ClockControl::Continue
            }
            Phase::Revealing => {
                state.reveal_elapsed += 1;
                if state.reveal_elapsed == 1 {
                    state.clear_selections();
                }
                if state.reveal_elapsed >= self.config.reveal_ticks {
                    self.transition(&mut state).await
                } else {
                    ClockControl::Continue
                }
            }
            _ => ClockControl::Stop,
        };

        self.publish(&state).await;
        control
    }

    async fn transition(self: &Arc<Self>, state: &mut SessionState) -> ClockControl {
        state.phase = Phase::Transitioning;
        state.show_correct_answer = false;
        state.clear_selections();
        self.publish(state).await;

        if state.rounds_left > 0 {
            Self::load_next_round(state, self.config.seconds_to_answer);
            return ClockControl::Continue;
        }

        state.phase = Phase::Summarizing;
        state.current_round = None;
        state.show_result = true;
        // the clock task is the caller and exits on Stop
        state.clock.take();
        state.restart = Some(self.spawn_restart(state.generation));
        info!(
            room_id = %self.room_id,
            generation = state.generation,
            "Game finished, showing results"
        );
        ClockControl::Stop
    }

    fn score_round(&self, state: &mut SessionState) {
        let Some(round) = state.current_round.clone() else {
            return;
        };

        for player in state.players.iter_mut() {
            let was_correct = player
                .selected_choice
                .is_some_and(|choice| round.is_correct(choice));
            if was_correct {
                player.score += 1;
            }

            if let Some(user_id) = player.user_id.clone() {
                if round.has_valid_id() {
                    self.record_outcome(user_id, round.question_id(), was_correct);
                }
            }
        }

        debug!(
            room_id = %self.room_id,
            question_id = round.question_id(),
            "Round scored"
        );
    }

    fn record_outcome(&self, user_id: String, question_id: u32, was_correct: bool) {
        let stats_sink = Arc::clone(&self.stats_sink);
        let room_id = self.room_id.clone();

        tokio::spawn(async move {
            if let Err(e) = stats_sink
                .record_outcome(&user_id, question_id, was_correct)
                .await
            {
                warn!(
                    room_id = %room_id,
                    user_id = %user_id,
                    question_id = question_id,
                    error = %e,
                    "Failed to record answer outcome"
                );
            }
        });
    }

    fn spawn_restart(self: &Arc<Self>, generation: u64) -> JoinHandle<()> {
        let session: Weak<Self> = Arc::downgrade(self);
        let delay = self.config.summary_duration;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(session) = session.upgrade() {
                session.restart(generation).await;
            }
        })
    }

    /// Starts the next game with the same topic, scores reset and waiting members admitted
    async fn restart(self: &Arc<Self>, generation: u64) {
        let mut state = self.state.lock().await;
        if state.generation != generation || state.phase != Phase::Summarizing {
            return;
        }
        state.restart = None;

        let Some(topic_id) = state.topic_id.clone() else {
            return;
        };

        let mut players = std::mem::take(&mut state.players);
        players.append(&mut state.waiting);

        let rounds = self.playable_rounds(&topic_id).await;
        if rounds.is_empty() {
            warn!(
                room_id = %self.room_id,
                topic_id = %topic_id,
                "Topic has no playable rounds anymore, not restarting"
            );
            state.players = players;
            state.started = false;
            state.show_result = false;
            state.phase = Phase::NotStarted;
            self.publish(&state).await;
            return;
        }

        self.begin_game(&mut state, players, topic_id, rounds).await;
    }

    /// Admits players that arrived while a game is running.
    ///
    /// Newcomers wait for the next game and receive the waiting view; participants
    /// receive the live view. Players already known to the session are left untouched.
    #[instrument(skip(self, players), fields(room_id = %self.room_id))]
    pub async fn add_latecomers(&self, players: Vec<Player>) {
        let mut state = self.state.lock().await;
        if !state.started {
            return;
        }

        let newcomers: Vec<Player> = players
            .into_iter()
            .filter(|p| p.connection_id.is_some() && !state.knows(p))
            .map(|mut p| {
                p.reset_progress();
                p
            })
            .collect();

        if !newcomers.is_empty() {
            debug!(count = newcomers.len(), "Players queued for the next game");
            state.waiting.extend(newcomers);
        }

        let waiting_view = GameView::waiting(
            &self.room_id,
            self.config.seconds_to_answer,
            state.waiting.clone(),
        );
        self.send_view(&state.waiting, &waiting_view).await;
        self.publish(&state).await;
    }

    /// Records a selection for the current round. Returns whether it was accepted.
    pub async fn submit_answer(&self, connection_id: &str, choice_id: u32) -> bool {
        let mut state = self.state.lock().await;
        if !state.phase.accepts_answers() {
            return false;
        }

        let offered = state
            .current_round
            .as_ref()
            .is_some_and(|round| round.has_choice(choice_id));
        if !offered {
            return false;
        }

        match state
            .players
            .iter_mut()
            .find(|p| p.has_connection(connection_id))
        {
            Some(player) => {
                player.selected_choice = Some(choice_id);
                true
            }
            None => false,
        }
    }

    /// Drops a player from the roster and the waiting queue
    pub async fn remove_player(&self, connection_id: &str) -> bool {
        let mut state = self.state.lock().await;
        let before = state.players.len() + state.waiting.len();
        state.players.retain(|p| !p.has_connection(connection_id));
        state.waiting.retain(|p| !p.has_connection(connection_id));
        let removed = state.players.len() + state.waiting.len() != before;

        if removed && state.started {
            self.publish(&state).await;
        }
        removed
    }

    /// Stops the session for good and runs the end hook. Safe to call more than once.
    #[instrument(skip(self), fields(room_id = %self.room_id))]
    pub async fn end(&self) {
        let hook = {
            let mut state = self.state.lock().await;
            if state.phase == Phase::Ended {
                return;
            }

            state.phase = Phase::Ended;
            state.started = false;
            state.generation += 1;
            if let Some(clock) = state.clock.take() {
                clock.abort();
            }
            if let Some(restart) = state.restart.take() {
                restart.abort();
            }
            state.rounds.clear();
            state.current_round = None;
            state.players.clear();
            state.waiting.clear();

            self.on_end.lock().await.take()
        };

        info!("Game session ended");
        if let Some(hook) = hook {
            hook.await;
        }
    }

    fn live_view(&self, state: &SessionState) -> GameView {
        let round_number = match state.current_round {
            Some(_) => state.rounds_total - state.rounds_left,
            None => 0,
        };

        GameView {
            room_id: self.room_id.clone(),
            topic_id: state.topic_id.clone(),
            game_started: state.started,
            phase: state.phase,
            rounds: state.rounds_total,
            rounds_left: state.rounds_left,
            round_number,
            seconds_to_answer: self.config.seconds_to_answer,
            time_left_to_answer: state.time_left,
            progress: progress_percent(self.config.seconds_to_answer, state.time_left),
            show_correct_answer: state.show_correct_answer,
            show_result: state.show_result,
            current_round: state
                .current_round
                .as_ref()
                .map(|round| RoundView::from_round(round, state.show_correct_answer)),
            players: state.players.clone(),
        }
    }

    async fn publish(&self, state: &SessionState) {
        let view = self.live_view(state);
        self.send_view(&state.players, &view).await;
    }

    async fn send_view(&self, recipients: &[Player], view: &GameView) {
        let Some(message) = WebSocketMessage::update_game(view).to_json() else {
            return;
        };

        for connection_id in recipients.iter().filter_map(|p| p.connection_id.as_deref()) {
            self.connection_manager
                .send_to_connection(connection_id, &message)
                .await;
        }
    }
}
