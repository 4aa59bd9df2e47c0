pub mod bus;
pub mod bus_contract;
pub mod cap;
pub mod model;
