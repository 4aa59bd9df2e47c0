pub mod light;
pub mod sensor;
pub mod switch;
