pub mod intake;
pub mod link;
pub mod location;
pub mod logging;
pub mod sms;
pub mod weather;
