/// What a walker is doing, shown as the color of its progress bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BarColor {
    /// Walking events
    #[default]
    CYAN,
    /// Building the scan table
    MAGENTA,
    /// Following a live feed; progress is unknown
    GREEN,
}

impl BarColor {
    pub fn task(&self) -> &'static str {
        match self {
            Self::CYAN => "Walking",
            Self::MAGENTA => "Scanning",
            Self::GREEN => "Following",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorkerStatus {
    /// Fraction of the run done, in [0, 1]
    pub progress: f32,
    /// Run being read. Live feeds have none.
    pub run_number: Option<i32>,
    pub events: u64,
    pub color: BarColor,
}

impl WorkerStatus {
    pub fn new(progress: f32, run_number: Option<i32>, events: u64, color: BarColor) -> Self {
        Self {
            progress,
            run_number,
            events,
            color,
        }
    }
}
