use std::collections::HashMap;
use std::time::Instant;

use engine::{
    now_timestamp, resolve_click, ClickCell, ResultsStore, RoundRecord, Scene, StoreError, Vec2,
};
use tracing::{debug, info, warn};

include!("types.rs");
include!("progress.rs");
