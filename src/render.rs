use std::time::Duration;

pub mod counter;
pub mod driver;
pub mod shade;

/// Framebuffer dimensions; both are multiples of the tile edge.
pub const SCR_WIDTH: usize = 1024;
pub const SCR_HEIGHT: usize = 640;

/// Edge length of the square pixel tile that is the unit of parallel work.
pub const TILE_SIZE: usize = 8;

/// How many instances the demo scene places on its grid.
pub const NUM_MESHES: usize = 9;

/// Animate the instance grid between frames.
pub const SHOULD_MOVE: bool = false;

/// Render a part of the instances as perfect mirrors.
pub const HALF_MIRRORED: bool = true;

/// Recursion cap for mirror bounces.
pub const MAX_RAY_DEPTH: u32 = 10;

/// Capacity of the tile-counter ring; once full, further counters are
/// silently dropped.
pub const COUNTER_CAPACITY: usize = 1 << 19;

/// How often the collected counters are summarized to the log.
pub const STATS_INTERVAL: Duration = Duration::from_secs(60);
