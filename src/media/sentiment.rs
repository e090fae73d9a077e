use vader_sentiment::SentimentIntensityAnalyzer;

/// Scores text polarity in `[-1.0, 1.0]`; negative means negative tone.
pub trait SentimentScorer: Send + Sync {
    fn polarity(&self, text: &str) -> f64;
}

/// VADER compound score. One analyzer is built up front and shared by
/// every call.
pub struct VaderScorer {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl VaderScorer {
    pub fn new() -> Self {
        Self {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }
}

impl Default for VaderScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentScorer for VaderScorer {
    fn polarity(&self, text: &str) -> f64 {
        self.analyzer
            .polarity_scores(text)
            .get("compound")
            .copied()
            .unwrap_or(0.0)
    }
}

/// Gate applied before a post is stored. Empty text is never scored.
pub fn allows(scorer: &dyn SentimentScorer, text: &str, threshold: f64) -> bool {
    if text.trim().is_empty() {
        return true;
    }
    let polarity = scorer.polarity(text);
    tracing::debug!(polarity, threshold, "Scored post text");
    polarity >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(f64);

    impl SentimentScorer for Fixed {
        fn polarity(&self, _text: &str) -> f64 {
            self.0
        }
    }

    struct Unreachable;

    impl SentimentScorer for Unreachable {
        fn polarity(&self, _text: &str) -> f64 {
            panic!("empty text must not be scored");
        }
    }

    #[test]
    fn threshold_is_exclusive() {
        assert!(allows(&Fixed(-0.1), "meh", -0.1));
        assert!(!allows(&Fixed(-0.11), "meh", -0.1));
        assert!(allows(&Fixed(0.5), "yay", -0.1));
    }

    #[test]
    fn empty_text_bypasses_scorer() {
        assert!(allows(&Unreachable, "", -0.1));
        assert!(allows(&Unreachable, "   ", -0.1));
    }

    #[test]
    fn vader_separates_obvious_cases() {
        let scorer = VaderScorer::new();
        assert!(scorer.polarity("Great day! I love this.") > 0.1);
        assert!(scorer.polarity("I hate this, it is awful and terrible.") < -0.1);
    }

    #[test]
    fn one_vader_scorer_serves_many_threads() {
        let scorer = std::sync::Arc::new(VaderScorer::new());
        let first = scorer.polarity("What a lovely morning");
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let scorer = std::sync::Arc::clone(&scorer);
                std::thread::spawn(move || scorer.polarity("What a lovely morning"))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), first);
        }
    }
}
