/// Per-session round state. Exclusively owned by one player session; all
/// mutation goes through the transition methods below.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct SessionProgress {
    phase: RoundPhase,
    player: Option<PlayerInfo>,
    started_at: Option<Instant>,
    found: Vec<FoundLabel>,
    click_log: Vec<LoggedClick>,
    last_click_by_side: [Option<Vec2>; 2],
    recorded: bool,
}

impl SessionProgress {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub(crate) fn player(&self) -> Option<&PlayerInfo> {
        self.player.as_ref()
    }

    pub(crate) fn found(&self) -> &[FoundLabel] {
        &self.found
    }

    pub(crate) fn click_log(&self) -> &[LoggedClick] {
        &self.click_log
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.phase == RoundPhase::Finished
    }

    pub(crate) fn elapsed_seconds(&self, now: Instant) -> Option<f32> {
        self.started_at
            .map(|started_at| now.duration_since(started_at).as_secs_f32())
    }

    /// Starts (or restarts) a round: clears all round state and enters
    /// Playing with a fresh start time.
    pub(crate) fn start(&mut self, player: PlayerInfo, now: Instant) {
        self.phase = RoundPhase::Playing;
        self.player = Some(player);
        self.started_at = Some(now);
        self.found.clear();
        self.click_log.clear();
        self.last_click_by_side = [None, None];
        self.recorded = false;
    }

    /// Back to NotStarted, dropping round state. Used by the restart button
    /// and by scene changes.
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn handle_click(
        &mut self,
        scene: &Scene,
        side: ImageSide,
        display_position: Vec2,
        display_size: (u32, u32),
        now: Instant,
    ) -> ClickResponse {
        match self.phase {
            RoundPhase::NotStarted => {
                warn!(side = side.as_token(), "click_ignored_round_not_started");
                return ClickResponse::NotStarted;
            }
            RoundPhase::Finished => return ClickResponse::RoundOver,
            RoundPhase::Playing => {}
        }
        let Some(started_at) = self.started_at else {
            // Unreachable through the transitions above; never crash on it.
            debug_assert!(false, "playing round without a start time");
            warn!(side = side.as_token(), "click_ignored_missing_start_time");
            return ClickResponse::NotStarted;
        };

        let result = resolve_click(display_position, display_size, scene);

        // Redundant re-delivery of the same click (the surrounding UI may
        // re-fire events on every re-render): same converted coordinate as
        // the previous click on the same image side is a no-op.
        if self.last_click_by_side[side.index()] == Some(result.point) {
            debug!(
                side = side.as_token(),
                x = result.point.x,
                y = result.point.y,
                "duplicate_click_ignored"
            );
            return ClickResponse::DuplicateIgnored;
        }
        self.last_click_by_side[side.index()] = Some(result.point);

        let hit = result.is_hit();
        self.click_log.push(LoggedClick {
            side,
            point: result.point,
            hit,
        });

        let Some(label) = result.label else {
            return ClickResponse::Miss { side };
        };

        let newly_found = !self.found.iter().any(|entry| entry.label == label);
        if newly_found {
            let seconds_since_start = now.duration_since(started_at).as_secs_f32();
            self.found.push(FoundLabel {
                label: label.clone(),
                seconds_since_start,
            });
        }

        let finished = self.found.len() == scene.region_count();
        if finished {
            self.phase = RoundPhase::Finished;
            info!(
                scene = scene.name.as_str(),
                found = self.found.len(),
                clicks = self.click_log.len(),
                "round_finished"
            );
        }

        ClickResponse::Hit {
            learning_text: scene.learning_text(&label).map(str::to_string),
            label,
            newly_found,
            finished,
        }
    }

    /// Serializes the finished round into its worksheet row and appends it.
    /// Runs at most once per round; on failure the in-memory state stays
    /// untouched so the caller can warn and retry later.
    pub(crate) fn try_record(
        &mut self,
        scene: &Scene,
        store: &ResultsStore,
    ) -> Result<bool, StoreError> {
        if !self.is_finished() || self.recorded {
            return Ok(false);
        }
        let Some(player) = self.player.clone() else {
            debug_assert!(false, "finished round without a player");
            warn!("round_record_skipped_missing_player");
            return Ok(false);
        };

        let record = RoundRecord {
            timestamp: now_timestamp(),
            scene: scene.name.clone(),
            player: player.name,
            age: player.age,
            found_seconds: self
                .found
                .iter()
                .map(|entry| (entry.label.clone(), entry.seconds_since_start))
                .collect(),
            click_log: self
                .click_log
                .iter()
                .map(|click| ClickCell {
                    point: click.point,
                    hit: click.hit,
                })
                .collect(),
        };
        store.append_round(&record)?;
        self.recorded = true;
        Ok(true)
    }
}

/// Sessions keyed by an external session identifier. Each progress value is
/// owned by exactly one logical session; the registry only hands out
/// exclusive references.
#[derive(Debug, Default)]
pub(crate) struct SessionRegistry {
    sessions: HashMap<String, SessionProgress>,
}

impl SessionRegistry {
    pub(crate) fn session_mut(&mut self, session_id: &str) -> &mut SessionProgress {
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(SessionProgress::new)
    }

    pub(crate) fn remove(&mut self, session_id: &str) -> Option<SessionProgress> {
        self.sessions.remove(session_id)
    }
}
