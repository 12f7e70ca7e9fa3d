//! Business logic services

pub mod delivery_slots;

use std::sync::Arc;

use crate::{repository::Repository, timeutil::Clock};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub delivery_slots: delivery_slots::DeliverySlotsService,
}

impl Services {
    /// Create all services with the given repository and clock
    pub fn new(repository: Repository, clock: Arc<dyn Clock>) -> Self {
        Self {
            delivery_slots: delivery_slots::DeliverySlotsService::new(repository, clock),
        }
    }
}
