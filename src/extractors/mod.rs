pub mod auth;
pub mod spot_form;
