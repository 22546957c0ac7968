pub mod combine;
pub mod historical;
pub mod intraday;
pub mod remap;
