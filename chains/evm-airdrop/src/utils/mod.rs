pub mod gas;

pub use gas::GasManager;
