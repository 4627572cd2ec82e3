pub mod picture_store;
pub mod spot_service;
