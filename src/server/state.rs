use std::sync::Arc;

use crate::settings;
use crate::thumbnail::FontProvider;

#[derive(Clone)]
pub(crate) struct ServerState {
    pub(crate) settings: settings::Settings,
    pub(crate) fonts: Arc<dyn FontProvider>,
}
