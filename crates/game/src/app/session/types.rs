#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ImageSide {
    Before,
    After,
}

impl ImageSide {
    pub(crate) fn as_token(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Before => 0,
            Self::After => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum RoundPhase {
    #[default]
    NotStarted,
    Playing,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlayerInfo {
    pub(crate) name: String,
    pub(crate) age: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FoundLabel {
    pub(crate) label: String,
    pub(crate) seconds_since_start: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct LoggedClick {
    pub(crate) side: ImageSide,
    pub(crate) point: Vec2,
    pub(crate) hit: bool,
}

/// What one click event meant, for the surrounding UI layer to render.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ClickResponse {
    /// Click arrived outside a running round; ignored defensively.
    NotStarted,
    /// The round is already finished; only reset leaves this state.
    RoundOver,
    /// Same converted coordinate as the previous click on this side;
    /// redundant re-delivery, not logged.
    DuplicateIgnored,
    Miss {
        side: ImageSide,
    },
    Hit {
        label: String,
        learning_text: Option<String>,
        newly_found: bool,
        finished: bool,
    },
}
