//! Session statistics, combo and score multiplier.

use serde::{Deserialize, Serialize};

/// Ceiling of the score multiplier.
pub const MAX_MULTIPLIER: f64 = 5.0;

/// Points awarded for a hit before the multiplier is applied.
pub const POINTS_PER_HIT: f64 = 100.0;

/// Returns the score multiplier for a combo.
///
/// Grows by 0.1 per combo step from 1.0 and saturates at `MAX_MULTIPLIER`.
///
/// # Examples
///
/// ```
/// use midifall::play::score_multiplier;
///
/// assert_eq!(score_multiplier(0), 1.0);
/// assert_eq!(score_multiplier(10), 2.0);
/// assert_eq!(score_multiplier(1000), 5.0);
/// ```
pub fn score_multiplier(combo: u32) -> f64 {
    let multiplier = 1.0 + combo as f64 / 10.0;
    multiplier.min(MAX_MULTIPLIER)
}

/// Cumulative counters for one play-through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SongStatistics {
    /// Notes in the working set at reset, across all tracks.
    pub total_note_count: usize,
    /// Notes the player was judged on (hit or missed).
    pub notes_user_could_have_played: u32,
    /// Notes the player hit.
    pub notes_user_actually_played: u32,
    /// Sum of the playback speed at every judgment, for averaging.
    pub speed_integral: u64,
    pub score: f64,
    /// Presses that matched no note.
    pub stray_notes: u32,
    pub total_notes_user_pressed: u32,
    pub longest_combo: u32,
}

/// Statistics plus the running combo.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scoring {
    pub stats: SongStatistics,
    combo: u32,
}

impl Scoring {
    /// Fresh counters for a song with `total_note_count` notes.
    pub fn new(total_note_count: usize) -> Self {
        Self {
            stats: SongStatistics {
                total_note_count,
                ..Default::default()
            },
            combo: 0,
        }
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn multiplier(&self) -> f64 {
        score_multiplier(self.combo)
    }

    /// Applies the effect of a finalized miss: the combo breaks and the note
    /// counts as one the player could have played at `speed` percent.
    pub fn apply_miss(&mut self, speed: u32) {
        self.combo = 0;
        self.stats.notes_user_could_have_played += 1;
        self.stats.speed_integral += speed as u64;
    }

    /// Applies the effect of a hit. Points use the multiplier earned before
    /// this hit.
    pub fn apply_hit(&mut self, speed: u32) {
        self.stats.score += POINTS_PER_HIT * self.multiplier();
        self.combo += 1;
        self.stats.longest_combo = self.stats.longest_combo.max(self.combo);
        self.stats.notes_user_could_have_played += 1;
        self.stats.notes_user_actually_played += 1;
        self.stats.speed_integral += speed as u64;
    }

    /// Records a live key press; `matched` tells whether it hit a note.
    pub fn record_press(&mut self, matched: bool) {
        self.stats.total_notes_user_pressed += 1;
        if !matched {
            self.stats.stray_notes += 1;
        }
    }
}

/// Figures shown once a song with user-played tracks ends.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSummary {
    pub title: String,
    pub stats: SongStatistics,
    /// Hits over judged notes, in percent.
    pub hit_percent: f64,
    /// Mean playback speed over judged notes, in percent.
    pub average_speed: f64,
    pub grade: &'static str,
}

impl StatsSummary {
    pub fn new(title: impl Into<String>, stats: SongStatistics) -> Self {
        let judged = stats.notes_user_could_have_played;
        let (hit_percent, average_speed) = if judged == 0 {
            (0.0, 0.0)
        } else {
            (
                stats.notes_user_actually_played as f64 * 100.0 / judged as f64,
                stats.speed_integral as f64 / judged as f64,
            )
        };

        Self {
            title: title.into(),
            grade: grade_for(hit_percent, average_speed),
            stats,
            hit_percent,
            average_speed,
        }
    }
}

/// Letter grade from accuracy, lowered by one step for practice below full speed.
fn grade_for(hit_percent: f64, average_speed: f64) -> &'static str {
    const GRADES: [&str; 6] = ["A+", "A", "B", "C", "D", "F"];
    let mut step = match hit_percent {
        p if p >= 97.0 => 0,
        p if p >= 90.0 => 1,
        p if p >= 80.0 => 2,
        p if p >= 70.0 => 3,
        p if p >= 60.0 => 4,
        _ => 5,
    };
    if average_speed < 100.0 {
        step = (step + 1).min(GRADES.len() - 1);
    }
    GRADES[step]
}
