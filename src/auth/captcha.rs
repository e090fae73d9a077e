use rand::Rng;
use std::collections::HashMap;
use std::time::{Duration, Instant};

const CHALLENGE_TTL: Duration = Duration::from_secs(600);

/// An arithmetic question shown on the registration form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Challenge {
    pub a: u32,
    pub b: u32,
}

impl Challenge {
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            a: rng.gen_range(1..=9),
            b: rng.gen_range(1..=9),
        }
    }

    pub fn answer(&self) -> u32 {
        self.a + self.b
    }
}

/// Ephemeral store of outstanding captcha answers, keyed by a random id
/// carried in a cookie. Each id can be checked once.
pub struct CaptchaStore {
    answers: HashMap<String, (Instant, u32)>,
}

impl CaptchaStore {
    pub fn new() -> Self {
        Self {
            answers: HashMap::new(),
        }
    }

    /// Remember the answer to `challenge` and return its id.
    pub fn issue(&mut self, challenge: Challenge) -> String {
        self.clear_stale();
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.answers
            .insert(id.clone(), (Instant::now(), challenge.answer()));
        id
    }

    /// Consume the challenge `id` and report whether `submitted` answers it.
    pub fn verify(&mut self, id: &str, submitted: &str) -> bool {
        let Some((issued, answer)) = self.answers.remove(id) else {
            return false;
        };
        if issued.elapsed() > CHALLENGE_TTL {
            return false;
        }
        submitted.trim().parse::<u32>().ok() == Some(answer)
    }

    fn clear_stale(&mut self) {
        self.answers.retain(|_, (t, _)| t.elapsed() <= CHALLENGE_TTL);
    }
}

impl Default for CaptchaStore {
    fn default() -> Self {
        Self::new()
    }
}
