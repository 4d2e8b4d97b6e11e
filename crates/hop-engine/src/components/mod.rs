pub mod behavior;
pub mod entity;
