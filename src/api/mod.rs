pub mod handlers;
pub mod routes;

pub use routes::create_router;

use crate::database::Database;
use std::sync::Arc;

#[derive(Clone)]
pub struct ApiState {
    pub database: Arc<Database>,
}

impl ApiState {
    pub fn new(database: Arc<Database>) -> Self {
        Self { database }
    }
}
