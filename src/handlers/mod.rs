pub mod health_handlers;
pub mod picture_handlers;
pub mod spot_handlers;
