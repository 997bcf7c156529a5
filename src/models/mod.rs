pub mod courier;
pub mod route;
pub mod zone;
