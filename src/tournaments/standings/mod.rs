pub mod compute;
pub mod tab;
