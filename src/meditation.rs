use std::time::Duration;

use crate::speech::{Narrator, SpeechError};

#[derive(Debug, Clone, Copy)]
pub struct Segment {
    pub text: &'static str,
    pub pause_secs: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct Meditation {
    pub slug: &'static str,
    pub title: &'static str,
    pub segments: &'static [Segment],
}

impl Meditation {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.segments.iter().map(|segment| segment.pause_secs).sum())
    }
}

const fn segment(text: &'static str, pause_secs: u64) -> Segment {
    Segment { text, pause_secs }
}

pub const CATALOG: &[Meditation] = &[
    Meditation {
        slug: "body-scan",
        title: "Gentle body scan",
        segments: &[
            segment("Find a comfortable position and let your eyes close.", 10),
            segment("Bring your attention to the top of your head.", 15),
            segment("Let it move slowly down across your forehead, your jaw and your shoulders.", 20),
            segment("Notice your chest rising and falling without changing anything.", 20),
            segment("Soften your hands, your hips and your legs.", 20),
            segment("Rest here for a few breaths, then open your eyes when you are ready.", 10),
        ],
    },
    Meditation {
        slug: "self-compassion",
        title: "Kindness toward your skin",
        segments: &[
            segment("Take a slow breath in, and a longer breath out.", 10),
            segment("Picture your face as you would a friend's, with warmth.", 20),
            segment("Silently repeat: my skin is doing its best, and so am I.", 20),
            segment("Let any judgement pass like a cloud.", 20),
            segment("Return to your breath, and carry this kindness into your day.", 10),
        ],
    },
    Meditation {
        slug: "sleep-wind-down",
        title: "Evening wind-down",
        segments: &[
            segment("Dim the lights and let your body grow heavy.", 15),
            segment("Breathe in for four counts, and out for six.", 30),
            segment("With each exhale, let the day's tension melt away.", 30),
            segment("Rest in the quiet. Sleep well.", 10),
        ],
    },
];

pub fn find(slug: &str) -> Option<&'static Meditation> {
    CATALOG
        .iter()
        .find(|meditation| meditation.slug.eq_ignore_ascii_case(slug))
}

/// Narrates a meditation, pausing after each segment.
pub async fn play<N: Narrator>(
    meditation: &Meditation,
    narrator: &mut N,
    speedup: u32,
) -> Result<(), SpeechError> {
    let speedup = speedup.max(1);
    tracing::info!(slug = meditation.slug, "playing meditation");

    narrator.speak(meditation.title)?;
    for segment in meditation.segments {
        narrator.speak(segment.text)?;
        let pause = narrator.pace(Duration::from_secs(segment.pause_secs));
        tokio::time::sleep(pause / speedup).await;
    }

    tracing::debug!(slug = meditation.slug, "meditation finished");
    Ok(())
}
