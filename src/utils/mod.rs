pub mod logging;
pub mod redirect_validator;
pub mod response_builder;
