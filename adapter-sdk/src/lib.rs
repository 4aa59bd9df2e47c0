pub mod light;
pub mod meta;
pub mod runtime;
pub mod sensor;
pub mod switch;
