use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tokio::sync::Mutex;

use crate::auth::captcha::CaptchaStore;
use crate::config::Config;
use crate::media::preview::LinkPreviewer;
use crate::media::sentiment::SentimentScorer;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub captchas: Arc<Mutex<CaptchaStore>>,
    pub scorer: Arc<dyn SentimentScorer>,
    pub previewer: Arc<dyn LinkPreviewer>,
}

impl AppState {
    pub fn new(
        db: DbPool,
        config: Config,
        scorer: Arc<dyn SentimentScorer>,
        previewer: Arc<dyn LinkPreviewer>,
    ) -> Self {
        Self {
            db,
            config,
            captchas: Arc::new(Mutex::new(CaptchaStore::new())),
            scorer,
            previewer,
        }
    }
}
