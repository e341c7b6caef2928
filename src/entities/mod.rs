pub mod assignment;
pub mod resource;
pub mod stock_movement;
