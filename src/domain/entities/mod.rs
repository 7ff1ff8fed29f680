pub mod inbound_event;
pub mod plan;
pub mod subscription;
