use std::sync::Arc;

use link_auth::TokenKeys;
use link_db::Database;

use crate::email::Mailer;
use crate::images::ImageStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub keys: TokenKeys,
    pub mailer: Mailer,
    pub images: ImageStore,
    /// Base URL of the web client, used in emailed verification/reset links.
    pub client_url: String,
}
